// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared blockchain types and the chain-client abstraction.

use std::future::Future;

use alloy::{primitives::U256, rpc::types::TransactionRequest};

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("gas estimation failed: {0}")]
    Estimation(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction signing failed: {0}")]
    Signing(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("confirmation timed out: {0}")]
    ConfirmationTimeout(String),

    #[error("contract call failed: {0}")]
    Contract(String),
}

impl ChainError {
    /// Whether the failed operation can be retried blindly.
    ///
    /// Broadcast failures are not retryable as-is (a resend can reuse a
    /// consumed nonce); the caller must rebuild with a fresh nonce. A
    /// confirmation timeout is not retryable either: the transaction may
    /// still land, so the caller must re-query by hash before resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::Estimation(_) | ChainError::Rpc(_) | ChainError::Contract(_)
        )
    }
}

/// Gas estimation result.
#[derive(Debug, Clone)]
pub struct GasEstimate {
    /// Estimated gas limit
    pub gas_limit: u64,
    /// Current max fee per gas (base fee + priority fee)
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas (tip)
    pub max_priority_fee_per_gas: u128,
    /// Total estimated cost in wei
    pub estimated_cost_wei: U256,
}

/// A fully populated but unsigned transaction.
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    pub request: TransactionRequest,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTx {
    /// EIP-2718 encoded raw transaction
    pub raw: Vec<u8>,
    /// Transaction hash
    pub tx_hash: String,
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block number where the transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction succeeded
    pub success: bool,
}

/// Chain operations consumed by the identity provisioner.
///
/// The production implementation is [`crate::blockchain::FactoryClient`];
/// tests substitute a mock. Futures are `Send` so the provisioner can run
/// inside multi-threaded handlers.
pub trait IdentityChain: Send + Sync {
    /// Read-only lookup of an existing identity bound to `owner`.
    fn existing_identity(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<Option<String>, ChainError>> + Send;

    /// Estimate gas for the identity-creation call.
    fn estimate_create_identity(
        &self,
        owner: &str,
        name: &str,
        symbol: &str,
        salt: &[u8; 32],
    ) -> impl Future<Output = Result<GasEstimate, ChainError>> + Send;

    /// Current transaction count of the deployer account.
    fn deployer_nonce(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Construct the identity-creation transaction.
    fn build_create_identity(
        &self,
        owner: &str,
        name: &str,
        symbol: &str,
        salt: &[u8; 32],
        gas: &GasEstimate,
        nonce: u64,
    ) -> impl Future<Output = Result<UnsignedTx, ChainError>> + Send;

    /// Sign with the deployer key.
    fn sign(&self, tx: UnsignedTx) -> impl Future<Output = Result<SignedTx, ChainError>> + Send;

    /// Submit the raw transaction, returning its hash.
    fn broadcast(&self, tx: &SignedTx) -> impl Future<Output = Result<String, ChainError>> + Send;

    /// Block until the transaction is mined.
    fn wait_for_receipt(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_per_failure_kind() {
        assert!(ChainError::Estimation("revert".into()).is_retryable());
        assert!(ChainError::Rpc("timeout".into()).is_retryable());
        assert!(ChainError::Contract("revert".into()).is_retryable());

        assert!(!ChainError::Broadcast("nonce too low".into()).is_retryable());
        assert!(!ChainError::ConfirmationTimeout("deadline".into()).is_retryable());
        assert!(!ChainError::InvalidPrivateKey("bad".into()).is_retryable());
    }
}
