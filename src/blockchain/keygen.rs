// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet key generation.
//!
//! Generates a cryptographically random secp256k1 key and derives the
//! matching EVM address. The private key is returned to the caller exactly
//! once for immediate encryption; it is never persisted or logged here.

use alloy::signers::local::PrivateKeySigner;

/// A freshly generated wallet.
pub struct GeneratedWallet {
    /// Lowercase 0x-prefixed address
    pub address: String,
    /// Hex private key (0x + 64 characters)
    pub private_key: String,
}

/// Generate a new wallet keypair.
pub fn generate() -> GeneratedWallet {
    let signer = PrivateKeySigner::random();

    GeneratedWallet {
        address: format!("0x{}", alloy::hex::encode(signer.address().as_slice())),
        private_key: format!("0x{}", alloy::hex::encode(signer.to_bytes())),
    }
}
