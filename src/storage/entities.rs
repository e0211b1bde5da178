// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stored records and their validation/normalization rules.
//!
//! All emails, usernames, and addresses are normalized (lowercased,
//! shape-checked) before they are stored or used for lookup, keeping
//! comparisons case-insensitive and consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// The offending field.
    pub field: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// A registered user account.
///
/// The `identity_address` / `identity_created_at` pair caches the account's
/// Identity record for fast lookup; both are written in the same transaction
/// as the Identity itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Unique account identifier (UUID)
    pub id: String,
    /// Normalized email (unique)
    pub email: String,
    /// Normalized username (unique when present)
    pub username: Option<String>,
    /// Encoded password hash (never plaintext)
    pub password_hash: String,
    /// Wallet address (unique, set at creation, immutable)
    pub wallet_address: String,
    /// Whether the account is active
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
    /// Cached identity contract address (unique when present)
    pub identity_address: Option<String>,
    /// When the identity was recorded
    pub identity_created_at: Option<DateTime<Utc>>,
}

/// A custodial wallet owned by exactly one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    /// Unique wallet identifier (UUID)
    pub id: String,
    /// Wallet address (unique, lowercase)
    pub address: String,
    /// Encrypted private key: base64 nonce || ciphertext || tag
    pub encrypted_key: String,
    /// Base64 KDF salt for the encrypted key
    pub key_salt: String,
    /// Owning account
    pub account_id: String,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
    /// Last time the key was used
    pub last_used: Option<DateTime<Utc>>,
}

/// An on-chain identity contract owned by exactly one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Unique identity identifier (UUID)
    pub id: String,
    /// Identity contract address (unique, lowercase)
    pub address: String,
    /// Human-readable name
    pub name: String,
    /// Short symbol
    pub symbol: String,
    /// Owning account
    pub account_id: String,
    /// When the identity was recorded
    pub created_at: DateTime<Utc>,
    /// Last metadata update
    pub last_updated: Option<DateTime<Utc>>,
}

// =============================================================================
// Normalization & Validation
// =============================================================================

/// Normalize and validate an email address.
///
/// Structural check only (local@domain.tld with sane characters); the
/// storage layer treats the normalized form as the unique key.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", "missing '@'"));
    };
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return Err(ValidationError::new("email", "invalid local part"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2
        || labels.iter().any(|l| {
            l.is_empty() || !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
    {
        return Err(ValidationError::new("email", "invalid domain"));
    }
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new("email", "invalid top-level domain"));
    }

    Ok(email)
}

/// Normalize and validate a username.
///
/// 3-20 characters, starts with a letter, letters/digits/underscore only.
pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim();

    if username.len() < 3 || username.len() > 20 {
        return Err(ValidationError::new(
            "username",
            "must be 3-20 characters",
        ));
    }
    let mut chars = username.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(
            "username",
            "must start with a letter",
        ));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::new(
            "username",
            "may contain only letters, numbers, and underscores",
        ));
    }

    Ok(username.to_lowercase())
}

/// Normalize and validate an EVM address (`0x` + 40 hex characters).
pub fn normalize_address(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let address = raw.trim();

    let Some(hex) = address.strip_prefix("0x") else {
        return Err(ValidationError::new(field, "must start with 0x"));
    };
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(field, "must be 0x + 40 hex characters"));
    }

    Ok(address.to_lowercase())
}

/// Password strength characters accepted as "special".
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validate password strength.
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit, and a special character. The password itself is never stored or
/// logged; only the result of this check matters.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new(
            "password",
            "must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "password",
            "must contain an uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new(
            "password",
            "must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password", "must contain a number"));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(ValidationError::new(
            "password",
            "must contain a special character",
        ));
    }
    Ok(())
}
