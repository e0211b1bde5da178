// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Directory Storage
//!
//! Persistent storage for accounts, wallets, and identities, backed by
//! **redb** (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `accounts_by_email`: normalized email → account_id
//! - `accounts_by_username`: normalized username → account_id
//! - `accounts_by_wallet`: wallet address → account_id
//! - `wallets`: account_id → serialized Wallet
//! - `identities`: account_id → serialized Identity
//! - `identities_by_address`: identity contract address → account_id
//!
//! ## Uniqueness
//!
//! The index tables double as unique constraints: every insert goes through
//! the index table inside the same write transaction as the record, and redb
//! serializes writers, so a concurrent duplicate registration loses the race
//! at the index insert and the whole transaction aborts. Application-level
//! existence checks are an optimization; the index insert is the arbiter.

pub mod directory;
pub mod entities;

pub use directory::{AccountDirectory, DirectoryError, NewAccount};
pub use entities::{Account, Identity, ValidationError, Wallet};
