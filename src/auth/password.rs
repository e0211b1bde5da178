// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and verification.
//!
//! Hashes are salted PBKDF2-HMAC-SHA256 with 100,000 iterations, encoded as
//! a single string so the parameters travel with the hash:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt base64>$<hash base64>
//! ```
//!
//! Verification re-derives with the stored parameters and compares in
//! constant time (ring's `pbkdf2::verify`). Malformed input or a mismatch
//! returns `false`; this function never errors.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::{
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

use super::vault::VaultError;

/// Scheme tag carried in the encoded hash.
const SCHEME: &str = "pbkdf2-sha256";

/// PBKDF2 iteration count for password hashing.
///
/// Tuned so a single verification costs tens of milliseconds.
pub const HASH_ITERATIONS: NonZeroU32 = NonZeroU32::new(100_000).unwrap();

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Hash output length in bytes.
const HASH_LEN: usize = 32;

static HASH_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| VaultError::Rng)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        HASH_ALGORITHM,
        HASH_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{SCHEME}${}${}${}",
        HASH_ITERATIONS,
        Base64::encode_string(&salt),
        Base64::encode_string(&hash),
    ))
}

/// Verify a password against an encoded hash.
///
/// Returns `false` for a mismatch or for any malformed encoded hash.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');

    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Some(iterations) = NonZeroU32::new(iterations) else {
        return false;
    };
    let Ok(salt) = Base64::decode_vec(salt) else {
        return false;
    };
    let Ok(hash) = Base64::decode_vec(hash) else {
        return false;
    };

    pbkdf2::verify(HASH_ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_succeeds() {
        let hash = hash_password("Abc12345!").unwrap();
        assert!(verify_password("Abc12345!", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("Abc12345!").unwrap();
        assert!(!verify_password("Abc12345?", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("Abc12345!").unwrap();
        let b = hash_password("Abc12345!").unwrap();
        assert_ne!(a, b);

        // Both still verify
        assert!(verify_password("Abc12345!", &a));
        assert!(verify_password("Abc12345!", &b));
    }

    #[test]
    fn encoded_format_carries_parameters() {
        let hash = hash_password("pw").unwrap();
        let parts: Vec<&str> = hash.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2-sha256");
        assert_eq!(parts[1], "100000");
    }

    #[test]
    fn malformed_hash_returns_false() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "not-a-hash"));
        assert!(!verify_password("pw", "bcrypt$12$abc$def"));
        assert!(!verify_password("pw", "pbkdf2-sha256$zero$AA$AA"));
        assert!(!verify_password("pw", "pbkdf2-sha256$0$AA$AA"));
        assert!(!verify_password("pw", "pbkdf2-sha256$100000$!!$!!"));
    }
}
