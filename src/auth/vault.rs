// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret vault: password-derived key encryption for wallet private keys.
//!
//! ## Format
//!
//! Each secret is stored as two base64 strings:
//!
//! - `salt`: 16 random bytes fed to the KDF
//! - `ciphertext`: 12-byte AES-GCM nonce followed by ciphertext and tag
//!
//! The encryption key is derived per secret with PBKDF2-HMAC-SHA256
//! (100,000 iterations) from the owner's password and the stored salt, so
//! the same password always re-derives the same key for decryption.
//!
//! Decryption authenticates the ciphertext; a wrong password or a tampered
//! blob fails with [`VaultError::Decryption`]. There is no fallback value.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN},
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// KDF salt length in bytes.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count for key derivation.
pub const KDF_ITERATIONS: NonZeroU32 = NonZeroU32::new(100_000).unwrap();

static KDF_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Errors from vault operations.
///
/// Messages carry no key or password material.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("system randomness unavailable")]
    Rng,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed: wrong password or corrupted ciphertext")]
    Decryption,
}

/// An encrypted secret as persisted in the account directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    /// Base64 of nonce || ciphertext || tag.
    pub ciphertext: String,
    /// Base64 of the KDF salt.
    pub salt: String,
}

/// Generate a fresh random KDF salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], VaultError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| VaultError::Rng)?;
    Ok(salt)
}

/// Derive a symmetric key from a password and salt.
///
/// Deterministic: the same `(password, salt)` pair always yields the same
/// key, which is what allows later decryption.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        KDF_ALGORITHM,
        KDF_ITERATIONS,
        salt,
        password.as_bytes(),
        &mut key,
    );
    key
}

/// Encrypt a secret under a password-derived key.
///
/// A fresh salt and nonce are generated per call, so encrypting the same
/// secret twice yields different blobs.
pub fn encrypt_secret(plaintext: &[u8], password: &str) -> Result<EncryptedSecret, VaultError> {
    let salt = generate_salt()?;
    let key = derive_key(password, &salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| VaultError::Rng)?;

    let unbound = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| VaultError::Encryption)?;
    let sealing = LessSafeKey::new(unbound);

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| VaultError::Encryption)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);

    Ok(EncryptedSecret {
        ciphertext: Base64::encode_string(&blob),
        salt: Base64::encode_string(&salt),
    })
}

/// Decrypt a secret previously produced by [`encrypt_secret`].
///
/// Fails closed: any wrong password, truncated blob, or tampered byte is
/// [`VaultError::Decryption`].
pub fn decrypt_secret(
    ciphertext: &str,
    salt: &str,
    password: &str,
) -> Result<Vec<u8>, VaultError> {
    let blob = Base64::decode_vec(ciphertext).map_err(|_| VaultError::Decryption)?;
    let salt = Base64::decode_vec(salt).map_err(|_| VaultError::Decryption)?;

    if blob.len() < NONCE_LEN {
        return Err(VaultError::Decryption);
    }
    let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| VaultError::Decryption)?;

    let key = derive_key(password, &salt);
    let unbound = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| VaultError::Decryption)?;
    let opening = LessSafeKey::new(unbound);

    let mut in_out = sealed.to_vec();
    let plaintext = opening
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::Decryption)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("correct horse", &salt);
        let b = derive_key("correct horse", &salt);
        assert_eq!(a, b);

        let c = derive_key("battery staple", &salt);
        assert_ne!(a, c);

        let d = derive_key("correct horse", &[8u8; SALT_LEN]);
        assert_ne!(a, d);
    }

    #[test]
    fn generate_salt_is_random() {
        let a = generate_salt().unwrap();
        let b = generate_salt().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let secret = b"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let encrypted = encrypt_secret(secret, "Abc12345!").unwrap();

        let decrypted = decrypt_secret(&encrypted.ciphertext, &encrypted.salt, "Abc12345!").unwrap();
        assert_eq!(decrypted, secret);
    }

    #[test]
    fn fresh_salt_and_nonce_per_encryption() {
        let a = encrypt_secret(b"secret", "pw").unwrap();
        let b = encrypt_secret(b"secret", "pw").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn wrong_password_fails_closed() {
        let encrypted = encrypt_secret(b"secret", "right").unwrap();
        let result = decrypt_secret(&encrypted.ciphertext, &encrypted.salt, "wrong");
        assert_eq!(result, Err(VaultError::Decryption));
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let encrypted = encrypt_secret(b"secret", "pw").unwrap();
        let mut blob = Base64::decode_vec(&encrypted.ciphertext).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = Base64::encode_string(&blob);

        let result = decrypt_secret(&tampered, &encrypted.salt, "pw");
        assert_eq!(result, Err(VaultError::Decryption));
    }

    #[test]
    fn truncated_blob_fails_closed() {
        let encrypted = encrypt_secret(b"secret", "pw").unwrap();
        let result = decrypt_secret("AAAA", &encrypted.salt, "pw");
        assert_eq!(result, Err(VaultError::Decryption));

        let result = decrypt_secret("not base64!!!", &encrypted.salt, "pw");
        assert_eq!(result, Err(VaultError::Decryption));
    }
}
