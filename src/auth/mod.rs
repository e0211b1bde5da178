// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication & Key Custody
//!
//! This module holds the credential core of the service:
//!
//! - `password` - salted PBKDF2 password hashing and verification
//! - `vault` - key derivation and AES-256-GCM encryption of wallet
//!   private keys at rest
//! - `tokens` - issuance and verification of signed bearer tokens
//! - `extractor` - Axum extractor that authenticates requests
//!
//! ## Security Model
//!
//! - Passwords are stored only as salted PBKDF2 hashes
//! - Wallet private keys are stored only as AEAD ciphertext under a
//!   password-derived key; decryption failures propagate, never fall back
//! - Bearer tokens are HS256 JWTs; validation is pinned to HS256 so a
//!   token signed with any other algorithm is rejected

pub mod error;
pub mod extractor;
pub mod password;
pub mod tokens;
pub mod vault;

pub use error::AuthError;
pub use extractor::Auth;
pub use tokens::{TokenError, TokenService};
pub use vault::{EncryptedSecret, VaultError};
