// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`/`Deserialize` and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! Responses never carry password hashes or key material; the single
//! exception is [`RevealKeyResponse`], which exists for the deliberate
//! high-risk key-reveal operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::IdentityGrant;
use crate::storage::{Account, Identity};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// EVM address wrapper (`0x` + 40 hex characters, stored lowercase).
///
/// Provides type safety for addresses throughout the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(pub String);

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// Registration & Login
// =============================================================================

/// Request to register a new account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (stored lowercase, globally unique).
    pub email: String,
    /// Username: 3-20 characters, starts with a letter, `[A-Za-z0-9_]`.
    pub username: String,
    /// Password: at least 8 characters with upper, lower, digit, special.
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccountResponse {
    /// Unique account identifier.
    pub id: String,
    /// Normalized email address.
    pub email: String,
    /// Normalized username, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// The account's wallet address.
    pub wallet_address: WalletAddress,
    /// The account's identity contract address, once provisioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_address: Option<WalletAddress>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            username: account.username,
            wallet_address: account.wallet_address.into(),
            identity_address: account.identity_address.map(WalletAddress),
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}

/// Request to log in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: a bearer token plus an account summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed bearer token (valid for 30 minutes by default).
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// The authenticated account.
    pub account: AccountResponse,
}

/// Result of a token validation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenValidationResponse {
    /// The token subject (username).
    pub subject: String,
}

// =============================================================================
// Identity
// =============================================================================

/// Request to provision an on-chain identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueIdentityRequest {
    /// Human-readable identity name.
    pub name: String,
    /// Short symbol.
    pub symbol: String,
}

/// Result of an identity issuance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityGrantResponse {
    /// The identity contract address bound to the account.
    pub identity_address: WalletAddress,
    /// Creation transaction hash; absent when the identity already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Whether this request created the identity.
    pub newly_created: bool,
}

impl From<IdentityGrant> for IdentityGrantResponse {
    fn from(grant: IdentityGrant) -> Self {
        Self {
            identity_address: grant.identity_address.into(),
            tx_hash: grant.tx_hash,
            newly_created: grant.newly_created,
        }
    }
}

/// A recorded identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    /// Identity contract address.
    pub address: WalletAddress,
    /// Human-readable name.
    pub name: String,
    /// Short symbol.
    pub symbol: String,
    /// When the identity was recorded.
    pub created_at: DateTime<Utc>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            address: identity.address.into(),
            name: identity.name,
            symbol: identity.symbol,
            created_at: identity.created_at,
        }
    }
}

// =============================================================================
// Key Reveal
// =============================================================================

/// Request to reveal the wallet private key.
///
/// Requires the account password on top of the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevealKeyRequest {
    pub password: String,
}

/// The decrypted wallet private key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevealKeyResponse {
    /// Hex private key (0x + 64 characters).
    pub private_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_address_from_and_into_string() {
        let from_str: WalletAddress = "abc".into();
        assert_eq!(from_str.0, "abc");

        let from_string: WalletAddress = String::from("def").into();
        assert_eq!(from_string.0, "def");

        let to_string: String = WalletAddress("ghi".into()).into();
        assert_eq!(to_string, "ghi");
    }

    #[test]
    fn account_response_omits_secrets() {
        let account = Account {
            id: "id-1".into(),
            email: "a@x.com".into(),
            username: Some("alice123".into()),
            password_hash: "pbkdf2-sha256$100000$AA$AA".into(),
            wallet_address: "0xab5801a7d398351b8be11c439e05c5b3259aec9b".into(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
            identity_address: None,
            identity_created_at: None,
        };

        let response: AccountResponse = account.into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("pbkdf2"));
        assert!(json.contains("alice123"));
    }
}
