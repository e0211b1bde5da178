// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account service: the operations exposed to the HTTP layer.
//!
//! One explicitly constructed service object owns its dependencies (account
//! directory, token service, identity provisioner) and is shared through
//! Axum state. There is no process-wide mutable state; every operation is an
//! independent unit of work over the directory.

use tokio_util::sync::CancellationToken;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::{TokenError, TokenService};
use crate::auth::vault::{decrypt_secret, encrypt_secret, VaultError};
use crate::blockchain::{
    keygen, FactoryClient, IdentityChain, IdentityProvisioner, ProvisionError,
};
use crate::storage::{
    entities::{validate_password, ValidationError},
    Account, AccountDirectory, DirectoryError, Identity, NewAccount,
};

/// Service-level errors, mapped to HTTP statuses once at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Uniform credential failure: never reveals whether the username exists.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("account not found")]
    AccountNotFound,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("identity provisioning is not configured")]
    ProvisioningDisabled,
}

/// Result of an identity issuance.
#[derive(Debug, Clone)]
pub struct IdentityGrant {
    pub identity_address: String,
    /// Creation transaction hash; None when the identity already existed.
    pub tx_hash: Option<String>,
    pub newly_created: bool,
}

/// The account service.
///
/// Generic over the chain client so tests can substitute a mock; production
/// code uses the default [`FactoryClient`].
pub struct AccountService<C: IdentityChain = FactoryClient> {
    directory: AccountDirectory,
    tokens: TokenService,
    provisioner: Option<IdentityProvisioner<C>>,
    /// Burned-in hash verified for unknown usernames, so a login attempt
    /// costs the same whether or not the account exists.
    dummy_hash: String,
}

impl<C: IdentityChain> AccountService<C> {
    pub fn new(
        directory: AccountDirectory,
        tokens: TokenService,
        provisioner: Option<IdentityProvisioner<C>>,
    ) -> Result<Self, VaultError> {
        let dummy_hash = hash_password("equal-cost-login-placeholder")?;
        Ok(Self {
            directory,
            tokens,
            provisioner,
            dummy_hash,
        })
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new account: validate, generate a wallet, hash the
    /// password, encrypt the private key under it, persist.
    ///
    /// The duplicate pre-checks here are an optimization for friendly
    /// errors; the directory's index inserts are the authoritative check
    /// under concurrent registration and surface the same errors.
    pub fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Account, ServiceError> {
        validate_password(password)?;

        if self.directory.find_by_email(email)?.is_some() {
            return Err(DirectoryError::DuplicateEmail.into());
        }
        if self.directory.find_by_username(username)?.is_some() {
            return Err(DirectoryError::DuplicateUsername.into());
        }

        let wallet = keygen::generate();
        let password_hash = hash_password(password)?;
        let encrypted = encrypt_secret(wallet.private_key.as_bytes(), password)?;

        let account = self.directory.create_account(NewAccount {
            email: email.to_string(),
            username: Some(username.to_string()),
            password_hash,
            wallet_address: wallet.address,
            encrypted_key: encrypted.ciphertext,
            key_salt: encrypted.salt,
        })?;

        tracing::info!(
            account_id = %account.id,
            wallet = %account.wallet_address,
            "account registered"
        );
        Ok(account)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Authenticate and issue a bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, Account), ServiceError> {
        let Some(account) = self.directory.find_by_username(username)? else {
            // Unknown username: burn the same verification cost, same error.
            let _ = verify_password(password, &self.dummy_hash);
            return Err(ServiceError::InvalidCredentials);
        };

        if !account.is_active || !verify_password(password, &account.password_hash) {
            return Err(ServiceError::InvalidCredentials);
        }

        self.directory.touch_last_login(&account.id)?;

        let subject = account
            .username
            .clone()
            .unwrap_or_else(|| account.email.clone());
        let token = self.tokens.issue(&subject)?;

        tracing::info!(account_id = %account.id, "login succeeded");

        let account = self
            .directory
            .find_by_id(&account.id)?
            .ok_or(ServiceError::AccountNotFound)?;
        Ok((token, account))
    }

    /// Verify a bearer token and return its subject.
    pub fn validate_token(&self, token: &str) -> Result<String, TokenError> {
        self.tokens.verify(token)
    }

    /// Look up an account by token subject.
    pub fn account_by_username(&self, username: &str) -> Result<Option<Account>, ServiceError> {
        Ok(self.directory.find_by_username(username)?)
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Get the recorded identity for an account, if any.
    pub fn identity_for_account(&self, account_id: &str) -> Result<Option<Identity>, ServiceError> {
        Ok(self.directory.find_identity_by_account(account_id)?)
    }

    /// Issue an on-chain identity for an account.
    ///
    /// Idempotent per account: a recorded identity is returned without
    /// touching the chain, and the provisioner's own existing-identity check
    /// covers the window where a previous run confirmed but was never
    /// recorded. The identity is recorded only after confirmation.
    pub async fn issue_identity(
        &self,
        account_id: &str,
        name: &str,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<IdentityGrant, ServiceError> {
        if name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty").into());
        }
        if symbol.trim().is_empty() {
            return Err(ValidationError::new("symbol", "must not be empty").into());
        }

        let account = self
            .directory
            .find_by_id(account_id)?
            .ok_or(ServiceError::AccountNotFound)?;

        if let Some(identity) = self.directory.find_identity_by_account(&account.id)? {
            return Ok(IdentityGrant {
                identity_address: identity.address,
                tx_hash: None,
                newly_created: false,
            });
        }

        let provisioner = self
            .provisioner
            .as_ref()
            .ok_or(ServiceError::ProvisioningDisabled)?;

        let outcome = provisioner
            .provision(&account.wallet_address, name, symbol, cancel)
            .await?;

        let identity =
            self.directory
                .record_identity(&account.id, &outcome.identity_address, name, symbol)?;

        Ok(IdentityGrant {
            identity_address: identity.address,
            tx_hash: outcome.tx_hash,
            newly_created: outcome.newly_created,
        })
    }

    // =========================================================================
    // Key reveal
    // =========================================================================

    /// Decrypt and return an account's wallet private key.
    ///
    /// High-risk by design: requires the account password on top of the
    /// caller's bearer token, and fails closed on any decryption error.
    pub fn reveal_private_key(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<String, ServiceError> {
        let account = self
            .directory
            .find_by_id(account_id)?
            .ok_or(ServiceError::AccountNotFound)?;
        let wallet = self
            .directory
            .wallet_for_account(&account.id)?
            .ok_or(ServiceError::WalletNotFound)?;

        let plaintext = decrypt_secret(&wallet.encrypted_key, &wallet.key_salt, password)?;
        let private_key = String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)?;

        self.directory.touch_wallet_last_used(&account.id)?;
        tracing::warn!(account_id = %account.id, "wallet private key revealed to account holder");

        Ok(private_key)
    }
}
