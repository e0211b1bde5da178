// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provisioning state machine.
//!
//! A provisioning run walks the phases
//!
//! ```text
//! CheckingExisting → EstimatingGas → BuildingTx → Signing
//!     → Broadcasting → Confirming → Recorded
//! ```
//!
//! and can fail from any phase. The failure carries the phase and whether a
//! blind retry is safe:
//!
//! - an existing identity short-circuits the run (idempotent, no duplicate
//!   creation);
//! - a broadcast failure must not be resent as-is — re-enter at
//!   `BuildingTx` with a fresh nonce;
//! - a confirmation timeout leaves the transaction possibly in flight —
//!   re-query by hash before resubmitting.
//!
//! The confirmation wait is bounded by a timeout and cancellable, so a
//! shutdown never leaves the directory half-written: the identity is only
//! recorded after a confirmed receipt.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::types::{ChainError, IdentityChain};

/// Phases of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPhase {
    CheckingExisting,
    EstimatingGas,
    BuildingTx,
    Signing,
    Broadcasting,
    Confirming,
    Recorded,
}

impl std::fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisionPhase::CheckingExisting => "checking_existing",
            ProvisionPhase::EstimatingGas => "estimating_gas",
            ProvisionPhase::BuildingTx => "building_tx",
            ProvisionPhase::Signing => "signing",
            ProvisionPhase::Broadcasting => "broadcasting",
            ProvisionPhase::Confirming => "confirming",
            ProvisionPhase::Recorded => "recorded",
        };
        write!(f, "{name}")
    }
}

/// A provisioning failure: which phase, and what went wrong.
#[derive(Debug, thiserror::Error)]
#[error("identity provisioning failed during {phase}: {source}")]
pub struct ProvisionError {
    pub phase: ProvisionPhase,
    #[source]
    pub source: ChainError,
}

impl ProvisionError {
    fn new(phase: ProvisionPhase, source: ChainError) -> Self {
        Self { phase, source }
    }

    /// Whether the caller may retry without re-checking chain state first.
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// The identity contract address bound to the owner.
    pub identity_address: String,
    /// Hash of the creation transaction (None when an existing identity was
    /// found and no transaction was submitted).
    pub tx_hash: Option<String>,
    /// Whether this run created the identity.
    pub newly_created: bool,
}

/// Drives identity creation against an [`IdentityChain`].
pub struct IdentityProvisioner<C> {
    chain: C,
    confirm_timeout: Duration,
}

impl<C: IdentityChain> IdentityProvisioner<C> {
    pub fn new(chain: C, confirm_timeout: Duration) -> Self {
        Self {
            chain,
            confirm_timeout,
        }
    }

    /// Run the state machine for `owner`.
    ///
    /// `cancel` aborts the confirmation wait (reported as a confirmation
    /// timeout); earlier phases are short RPC calls and run to completion.
    pub async fn provision(
        &self,
        owner: &str,
        name: &str,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        use ProvisionPhase::*;

        // CheckingExisting: idempotence guard, no duplicate creation.
        if let Some(existing) = self
            .chain
            .existing_identity(owner)
            .await
            .map_err(|e| ProvisionError::new(CheckingExisting, e))?
        {
            tracing::info!(owner, identity = %existing, "identity already on chain");
            return Ok(ProvisionOutcome {
                identity_address: existing,
                tx_hash: None,
                newly_created: false,
            });
        }

        // EstimatingGas
        let salt = naming_salt(name, Utc::now().timestamp_micros());
        let gas = self
            .chain
            .estimate_create_identity(owner, name, symbol, &salt)
            .await
            .map_err(|e| ProvisionError::new(EstimatingGas, e))?;

        // BuildingTx: fresh deployer nonce per run.
        let nonce = self
            .chain
            .deployer_nonce()
            .await
            .map_err(|e| ProvisionError::new(BuildingTx, e))?;
        let unsigned = self
            .chain
            .build_create_identity(owner, name, symbol, &salt, &gas, nonce)
            .await
            .map_err(|e| ProvisionError::new(BuildingTx, e))?;

        // Signing
        let signed = self
            .chain
            .sign(unsigned)
            .await
            .map_err(|e| ProvisionError::new(Signing, e))?;

        // Broadcasting
        let tx_hash = self
            .chain
            .broadcast(&signed)
            .await
            .map_err(|e| ProvisionError::new(Broadcasting, e))?;
        tracing::info!(owner, tx_hash = %tx_hash, "identity creation broadcast");

        // Confirming: bounded and cancellable.
        let receipt = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ProvisionError::new(
                    Confirming,
                    ChainError::ConfirmationTimeout("confirmation wait cancelled".to_string()),
                ));
            }
            result = tokio::time::timeout(self.confirm_timeout, self.chain.wait_for_receipt(&tx_hash)) => {
                match result {
                    Err(_) => {
                        return Err(ProvisionError::new(
                            Confirming,
                            ChainError::ConfirmationTimeout(format!(
                                "no receipt within {}s",
                                self.confirm_timeout.as_secs()
                            )),
                        ));
                    }
                    Ok(receipt) => receipt.map_err(|e| ProvisionError::new(Confirming, e))?,
                }
            }
        };

        if !receipt.success {
            return Err(ProvisionError::new(
                Confirming,
                ChainError::Contract("identity creation transaction reverted".to_string()),
            ));
        }

        // Recorded: resolve the address the factory bound to the owner.
        let identity_address = self
            .chain
            .existing_identity(owner)
            .await
            .map_err(|e| ProvisionError::new(Recorded, e))?
            .ok_or_else(|| {
                ProvisionError::new(
                    Recorded,
                    ChainError::Contract("identity not visible after confirmation".to_string()),
                )
            })?;

        tracing::info!(
            owner,
            identity = %identity_address,
            block = receipt.block_number,
            "identity provisioned"
        );

        Ok(ProvisionOutcome {
            identity_address,
            tx_hash: Some(tx_hash),
            newly_created: true,
        })
    }
}

/// Derive the on-chain naming salt for an identity.
///
/// The display name is sanitized to lowercase alphanumerics and mixed with a
/// unique timestamp component, so two users picking the same name cannot
/// collide. The factory re-checks uniqueness on chain; this salt just keeps
/// honest runs apart.
pub fn naming_salt(display_name: &str, timestamp_micros: i64) -> [u8; 32] {
    let sanitized: String = display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    let mut preimage = sanitized.into_bytes();
    preimage.extend_from_slice(&timestamp_micros.to_be_bytes());

    alloy::primitives::keccak256(&preimage).0
}

// =============================================================================
// Test support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable mock chain for provisioner and service tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use alloy::primitives::U256;
    use alloy::rpc::types::TransactionRequest;

    use crate::blockchain::types::{
        ChainError, GasEstimate, IdentityChain, SignedTx, TxReceipt, UnsignedTx,
    };

    pub(crate) const MOCK_IDENTITY: &str = "0x1111111111111111111111111111111111111111";

    pub(crate) struct MockChain {
        pub existing: Mutex<Option<String>>,
        pub submissions: AtomicUsize,
        pub fail_estimation: bool,
        pub fail_broadcast: bool,
        pub never_confirm: bool,
    }

    impl Default for MockChain {
        fn default() -> Self {
            Self {
                existing: Mutex::new(None),
                submissions: AtomicUsize::new(0),
                fail_estimation: false,
                fail_broadcast: false,
                never_confirm: false,
            }
        }
    }

    impl MockChain {
        pub fn with_existing(address: &str) -> Self {
            Self {
                existing: Mutex::new(Some(address.to_string())),
                ..Self::default()
            }
        }

        pub fn submission_count(&self) -> usize {
            self.submissions.load(Ordering::SeqCst)
        }
    }

    impl IdentityChain for MockChain {
        async fn existing_identity(&self, _owner: &str) -> Result<Option<String>, ChainError> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn estimate_create_identity(
            &self,
            _owner: &str,
            _name: &str,
            _symbol: &str,
            _salt: &[u8; 32],
        ) -> Result<GasEstimate, ChainError> {
            if self.fail_estimation {
                return Err(ChainError::Estimation("execution reverted".to_string()));
            }
            Ok(GasEstimate {
                gas_limit: 210_000,
                max_fee_per_gas: 50_000_000_000,
                max_priority_fee_per_gas: 1_500_000_000,
                estimated_cost_wei: U256::from(210_000u64) * U256::from(50_000_000_000u64),
            })
        }

        async fn deployer_nonce(&self) -> Result<u64, ChainError> {
            Ok(7)
        }

        async fn build_create_identity(
            &self,
            _owner: &str,
            _name: &str,
            _symbol: &str,
            _salt: &[u8; 32],
            gas: &GasEstimate,
            nonce: u64,
        ) -> Result<UnsignedTx, ChainError> {
            let mut request = TransactionRequest::default().gas_limit(gas.gas_limit);
            request.nonce = Some(nonce);
            Ok(UnsignedTx { request })
        }

        async fn sign(&self, _tx: UnsignedTx) -> Result<SignedTx, ChainError> {
            Ok(SignedTx {
                raw: vec![0x02, 0xaa],
                tx_hash: format!("0x{}", "ab".repeat(32)),
            })
        }

        async fn broadcast(&self, tx: &SignedTx) -> Result<String, ChainError> {
            if self.fail_broadcast {
                return Err(ChainError::Broadcast("nonce too low".to_string()));
            }
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(tx.tx_hash.clone())
        }

        async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, ChainError> {
            if self.never_confirm {
                return std::future::pending().await;
            }
            // Confirmation makes the identity visible on chain.
            *self.existing.lock().unwrap() = Some(MOCK_IDENTITY.to_string());
            Ok(TxReceipt {
                tx_hash: tx_hash.to_string(),
                block_number: 1234,
                gas_used: 180_000,
                success: true,
            })
        }
    }
}
