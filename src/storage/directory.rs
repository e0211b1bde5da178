// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account directory backed by redb.
//!
//! All mutations run inside a single write transaction, so a registration
//! either lands completely (account + wallet + all three unique indexes) or
//! not at all. Duplicate detection rides on the index-table inserts: redb's
//! `insert` returns the previous value, and a previous value means another
//! account already owns the key.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::entities::{
    normalize_address, normalize_email, normalize_username, Account, Identity, ValidationError,
    Wallet,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: account_id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Unique index: normalized email → account_id.
const ACCOUNTS_BY_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("accounts_by_email");

/// Unique index: normalized username → account_id.
const ACCOUNTS_BY_USERNAME: TableDefinition<&str, &str> =
    TableDefinition::new("accounts_by_username");

/// Unique index: wallet address → account_id.
const ACCOUNTS_BY_WALLET: TableDefinition<&str, &str> = TableDefinition::new("accounts_by_wallet");

/// Wallet records: account_id → serialized Wallet (one wallet per account).
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Identity records: account_id → serialized Identity (at most one per account).
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Unique index: identity contract address → account_id.
const IDENTITIES_BY_ADDRESS: TableDefinition<&str, &str> =
    TableDefinition::new("identities_by_address");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("username already registered")]
    DuplicateUsername,

    #[error("wallet address already registered")]
    DuplicateWalletAddress,

    #[error("account already has an identity")]
    DuplicateIdentity,

    #[error("account not found")]
    AccountNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

// =============================================================================
// New-account input
// =============================================================================

/// Input for account creation. Fields are normalized by the directory.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: Option<String>,
    /// Encoded password hash produced by `auth::password::hash_password`.
    pub password_hash: String,
    pub wallet_address: String,
    /// Encrypted private key blob (base64 nonce || ciphertext || tag).
    pub encrypted_key: String,
    /// Base64 KDF salt for the encrypted key.
    pub key_salt: String,
}

// =============================================================================
// AccountDirectory
// =============================================================================

/// Embedded ACID account directory.
pub struct AccountDirectory {
    db: Database,
}

impl AccountDirectory {
    /// Open (or create) the directory database at the given path.
    pub fn open(path: &Path) -> DirectoryResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNTS_BY_EMAIL)?;
            let _ = write_txn.open_table(ACCOUNTS_BY_USERNAME)?;
            let _ = write_txn.open_table(ACCOUNTS_BY_WALLET)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(IDENTITIES_BY_ADDRESS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Account creation
    // =========================================================================

    /// Create an account and its wallet in one transaction.
    ///
    /// The index-table inserts are the authoritative uniqueness check: if a
    /// concurrent registration got there first, the insert reports a previous
    /// owner and the transaction is dropped without committing.
    pub fn create_account(&self, new: NewAccount) -> DirectoryResult<Account> {
        let email = normalize_email(&new.email)?;
        let username = new
            .username
            .as_deref()
            .map(normalize_username)
            .transpose()?;
        let wallet_address = normalize_address(&new.wallet_address, "wallet_address")?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            username: username.clone(),
            password_hash: new.password_hash,
            wallet_address: wallet_address.clone(),
            is_active: true,
            created_at: now,
            last_login: None,
            identity_address: None,
            identity_created_at: None,
        };
        let wallet = Wallet {
            id: Uuid::new_v4().to_string(),
            address: wallet_address.clone(),
            encrypted_key: new.encrypted_key,
            key_salt: new.key_salt,
            account_id: account.id.clone(),
            created_at: now,
            last_used: None,
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut by_email = write_txn.open_table(ACCOUNTS_BY_EMAIL)?;
            if by_email.insert(email.as_str(), account.id.as_str())?.is_some() {
                return Err(DirectoryError::DuplicateEmail);
            }

            if let Some(ref username) = username {
                let mut by_username = write_txn.open_table(ACCOUNTS_BY_USERNAME)?;
                if by_username
                    .insert(username.as_str(), account.id.as_str())?
                    .is_some()
                {
                    return Err(DirectoryError::DuplicateUsername);
                }
            }

            let mut by_wallet = write_txn.open_table(ACCOUNTS_BY_WALLET)?;
            if by_wallet
                .insert(wallet_address.as_str(), account.id.as_str())?
                .is_some()
            {
                return Err(DirectoryError::DuplicateWalletAddress);
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            accounts.insert(account.id.as_str(), serde_json::to_vec(&account)?.as_slice())?;

            let mut wallets = write_txn.open_table(WALLETS)?;
            wallets.insert(account.id.as_str(), serde_json::to_vec(&wallet)?.as_slice())?;
        }
        write_txn.commit()?;

        Ok(account)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Get an account by id.
    pub fn find_by_id(&self, account_id: &str) -> DirectoryResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get an account by email. Inputs that can't be a stored email resolve
    /// to `None` rather than an error.
    pub fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Account>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        self.find_via_index(ACCOUNTS_BY_EMAIL, &email)
    }

    /// Get an account by username.
    pub fn find_by_username(&self, username: &str) -> DirectoryResult<Option<Account>> {
        let Ok(username) = normalize_username(username) else {
            return Ok(None);
        };
        self.find_via_index(ACCOUNTS_BY_USERNAME, &username)
    }

    /// Get an account by wallet address.
    pub fn find_by_wallet_address(&self, address: &str) -> DirectoryResult<Option<Account>> {
        let Ok(address) = normalize_address(address, "wallet_address") else {
            return Ok(None);
        };
        self.find_via_index(ACCOUNTS_BY_WALLET, &address)
    }

    fn find_via_index(
        &self,
        index: TableDefinition<&'static str, &'static str>,
        key: &str,
    ) -> DirectoryResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index)?;
        let Some(id_guard) = index.get(key)? else {
            return Ok(None);
        };
        let account_id = id_guard.value().to_string();
        drop(id_guard);

        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get the wallet owned by an account.
    pub fn wallet_for_account(&self, account_id: &str) -> DirectoryResult<Option<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let wallets = read_txn.open_table(WALLETS)?;
        match wallets.get(account_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get the identity owned by an account.
    pub fn find_identity_by_account(&self, account_id: &str) -> DirectoryResult<Option<Identity>> {
        let read_txn = self.db.begin_read()?;
        let identities = read_txn.open_table(IDENTITIES)?;
        match identities.get(account_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Identity recording
    // =========================================================================

    /// Record a confirmed identity and update the account's cached identity
    /// fields, all in one transaction.
    ///
    /// Re-recording the same address for the same account is a no-op that
    /// returns the existing record, so a provisioning retry after a
    /// confirmation timeout converges instead of failing.
    pub fn record_identity(
        &self,
        account_id: &str,
        address: &str,
        name: &str,
        symbol: &str,
    ) -> DirectoryResult<Identity> {
        let address = normalize_address(address, "identity_address")?;

        let write_txn = self.db.begin_write()?;
        let identity = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let account_bytes = accounts.get(account_id)?.map(|g| g.value().to_vec());
            let Some(account_bytes) = account_bytes else {
                return Err(DirectoryError::AccountNotFound);
            };
            let mut account: Account = serde_json::from_slice(&account_bytes)?;

            let mut identities = write_txn.open_table(IDENTITIES)?;
            let existing = identities.get(account_id)?.map(|g| g.value().to_vec());
            if let Some(existing) = existing {
                let existing: Identity = serde_json::from_slice(&existing)?;
                if existing.address == address {
                    return Ok(existing);
                }
                return Err(DirectoryError::DuplicateIdentity);
            }

            let mut by_address = write_txn.open_table(IDENTITIES_BY_ADDRESS)?;
            if by_address.insert(address.as_str(), account_id)?.is_some() {
                return Err(DirectoryError::DuplicateIdentity);
            }

            let now = Utc::now();
            let identity = Identity {
                id: Uuid::new_v4().to_string(),
                address: address.clone(),
                name: name.to_string(),
                symbol: symbol.to_string(),
                account_id: account_id.to_string(),
                created_at: now,
                last_updated: None,
            };
            identities.insert(account_id, serde_json::to_vec(&identity)?.as_slice())?;

            // Keep the cached copy on the account consistent with the record.
            account.identity_address = Some(address);
            account.identity_created_at = Some(now);
            accounts.insert(account_id, serde_json::to_vec(&account)?.as_slice())?;

            identity
        };
        write_txn.commit()?;

        Ok(identity)
    }

    // =========================================================================
    // Timestamp touches
    // =========================================================================

    /// Record a successful login.
    pub fn touch_last_login(&self, account_id: &str) -> DirectoryResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let account_bytes = accounts.get(account_id)?.map(|g| g.value().to_vec());
            let Some(account_bytes) = account_bytes else {
                return Err(DirectoryError::AccountNotFound);
            };
            let mut account: Account = serde_json::from_slice(&account_bytes)?;
            account.last_login = Some(Utc::now());
            accounts.insert(account_id, serde_json::to_vec(&account)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record a use of the wallet key (e.g. a reveal).
    pub fn touch_wallet_last_used(&self, account_id: &str) -> DirectoryResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut wallets = write_txn.open_table(WALLETS)?;
            let wallet_bytes = wallets.get(account_id)?.map(|g| g.value().to_vec());
            let Some(wallet_bytes) = wallet_bytes else {
                return Err(DirectoryError::AccountNotFound);
            };
            let mut wallet: Wallet = serde_json::from_slice(&wallet_bytes)?;
            wallet.last_used = Some(Utc::now());
            wallets.insert(account_id, serde_json::to_vec(&wallet)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_directory() -> (AccountDirectory, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let directory =
            AccountDirectory::open(&dir.path().join("accounts.redb")).expect("open directory");
        (directory, dir)
    }

    fn new_account(email: &str, username: &str, address: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            username: Some(username.to_string()),
            password_hash: "pbkdf2-sha256$100000$AA$AA".to_string(),
            wallet_address: address.to_string(),
            encrypted_key: "ZW5jcnlwdGVk".to_string(),
            key_salt: "c2FsdA==".to_string(),
        }
    }

    const ADDR_A: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";
    const ADDR_B: &str = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12";

    #[test]
    fn create_and_find_account() {
        let (directory, _dir) = test_directory();

        let created = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let by_email = directory.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(by_email, created);

        let by_username = directory.find_by_username("alice123").unwrap().unwrap();
        assert_eq!(by_username.id, created.id);

        let by_wallet = directory.find_by_wallet_address(ADDR_A).unwrap().unwrap();
        assert_eq!(by_wallet.id, created.id);
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let (directory, _dir) = test_directory();
        directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        assert!(directory.find_by_email("A@X.COM").unwrap().is_some());
        assert!(directory.find_by_username("ALICE123").unwrap().is_some());
        assert!(directory
            .find_by_wallet_address(&ADDR_A.to_uppercase().replace("0X", "0x"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn absent_lookups_return_none() {
        let (directory, _dir) = test_directory();
        assert!(directory.find_by_email("a@x.com").unwrap().is_none());
        assert!(directory.find_by_username("nobody").unwrap().is_none());
        assert!(directory.find_by_wallet_address(ADDR_A).unwrap().is_none());
        assert!(directory.find_by_id("no-such-id").unwrap().is_none());
        // Shapes that can't be stored values resolve to None, not an error
        assert!(directory.find_by_email("not-an-email").unwrap().is_none());
        assert!(directory.find_by_wallet_address("0x12").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let (directory, _dir) = test_directory();
        directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let result = directory.create_account(new_account("A@x.com", "bob456", ADDR_B));
        assert!(matches!(result, Err(DirectoryError::DuplicateEmail)));

        // The losing registration must not leave partial state behind
        assert!(directory.find_by_username("bob456").unwrap().is_none());
        assert!(directory.find_by_wallet_address(ADDR_B).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let (directory, _dir) = test_directory();
        directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let result = directory.create_account(new_account("b@x.com", "Alice123", ADDR_B));
        assert!(matches!(result, Err(DirectoryError::DuplicateUsername)));
        assert!(directory.find_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_wallet_address_rejected() {
        let (directory, _dir) = test_directory();
        directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let result = directory.create_account(new_account("b@x.com", "bob456", ADDR_A));
        assert!(matches!(result, Err(DirectoryError::DuplicateWalletAddress)));
    }

    #[test]
    fn wallet_is_stored_with_account() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let wallet = directory.wallet_for_account(&account.id).unwrap().unwrap();
        assert_eq!(wallet.account_id, account.id);
        assert_eq!(wallet.address, ADDR_A);
        assert_eq!(wallet.encrypted_key, "ZW5jcnlwdGVk");
        assert!(wallet.last_used.is_none());
    }

    #[test]
    fn record_identity_updates_account_atomically() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let identity = directory
            .record_identity(&account.id, ADDR_B, "Alice", "ALC")
            .unwrap();
        assert_eq!(identity.address, ADDR_B);

        let reloaded = directory.find_by_id(&account.id).unwrap().unwrap();
        assert_eq!(reloaded.identity_address.as_deref(), Some(ADDR_B));
        assert!(reloaded.identity_created_at.is_some());

        let found = directory
            .find_identity_by_account(&account.id)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, identity.id);
    }

    #[test]
    fn record_identity_is_idempotent_for_same_address() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        let first = directory
            .record_identity(&account.id, ADDR_B, "Alice", "ALC")
            .unwrap();
        let second = directory
            .record_identity(&account.id, ADDR_B, "Alice", "ALC")
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn second_identity_for_account_rejected() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        directory
            .record_identity(&account.id, ADDR_B, "Alice", "ALC")
            .unwrap();
        let result = directory.record_identity(
            &account.id,
            "0x0000000000000000000000000000000000000001",
            "Alice2",
            "AL2",
        );
        assert!(matches!(result, Err(DirectoryError::DuplicateIdentity)));
    }

    #[test]
    fn identity_address_unique_across_accounts() {
        let (directory, _dir) = test_directory();
        let alice = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();
        let bob = directory
            .create_account(new_account("b@x.com", "bob456", ADDR_B))
            .unwrap();

        let shared = "0x0000000000000000000000000000000000000007";
        directory
            .record_identity(&alice.id, shared, "Alice", "ALC")
            .unwrap();
        let result = directory.record_identity(&bob.id, shared, "Bob", "BOB");
        assert!(matches!(result, Err(DirectoryError::DuplicateIdentity)));
    }

    #[test]
    fn record_identity_unknown_account_fails() {
        let (directory, _dir) = test_directory();
        let result = directory.record_identity("missing", ADDR_B, "X", "X");
        assert!(matches!(result, Err(DirectoryError::AccountNotFound)));
    }

    #[test]
    fn touch_last_login_sets_timestamp() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();
        assert!(account.last_login.is_none());

        directory.touch_last_login(&account.id).unwrap();
        let reloaded = directory.find_by_id(&account.id).unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
    }

    #[test]
    fn touch_wallet_last_used_sets_timestamp() {
        let (directory, _dir) = test_directory();
        let account = directory
            .create_account(new_account("a@x.com", "alice123", ADDR_A))
            .unwrap();

        directory.touch_wallet_last_used(&account.id).unwrap();
        let wallet = directory.wallet_for_account(&account.id).unwrap().unwrap();
        assert!(wallet.last_used.is_some());
    }

    #[test]
    fn account_without_username_allowed() {
        let (directory, _dir) = test_directory();
        let mut new = new_account("a@x.com", "unused", ADDR_A);
        new.username = None;

        let account = directory.create_account(new).unwrap();
        assert!(account.username.is_none());
    }
}
