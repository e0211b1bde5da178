// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-factory contract integration over alloy.
//!
//! The factory deploys one identity contract per owner. All creation
//! transactions are sponsored by the deployer account: the deployer is the
//! sender and signer, the end user's wallet key is never involved.

use std::str::FromStr;
use std::time::Duration;

use alloy::{
    eips::eip2718::Encodable2718,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolCall,
};

use super::types::{ChainError, GasEstimate, IdentityChain, SignedTx, TxReceipt, UnsignedTx};

// Define the identity factory interface using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IIdentityFactory {
        function createIdentity(address owner, string name, string symbol, bytes32 salt) external returns (address);
        function identityOf(address owner) external view returns (address);
    }
}

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Receipt poll interval during confirmation wait.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Identity factory client holding the provider and deployer signer.
pub struct FactoryClient {
    provider: HttpProvider,
    factory: Address,
    deployer: PrivateKeySigner,
    chain_id: u64,
}

impl FactoryClient {
    /// Connect to the chain and resolve the chain id.
    pub async fn connect(
        rpc_url: &str,
        factory_address: &str,
        deployer_key: &str,
    ) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;
        let provider = ProviderBuilder::new().connect_http(url);

        let factory = Address::from_str(factory_address)
            .map_err(|e| ChainError::InvalidAddress(e.to_string()))?;
        let deployer = parse_deployer_key(deployer_key)?;

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(Self {
            provider,
            factory,
            deployer,
            chain_id,
        })
    }

    /// Address of the deployer account sponsoring identity creation.
    pub fn deployer_address(&self) -> Address {
        self.deployer.address()
    }

    fn parse_owner(owner: &str) -> Result<Address, ChainError> {
        Address::from_str(owner).map_err(|e| ChainError::InvalidAddress(e.to_string()))
    }

    fn create_calldata(
        owner: &str,
        name: &str,
        symbol: &str,
        salt: &[u8; 32],
    ) -> Result<Vec<u8>, ChainError> {
        let call = IIdentityFactory::createIdentityCall {
            owner: Self::parse_owner(owner)?,
            name: name.to_string(),
            symbol: symbol.to_string(),
            salt: B256::from(*salt),
        };
        Ok(call.abi_encode())
    }

    /// Get current gas prices from the network.
    async fn get_gas_prices(&self) -> Result<(u128, u128), ChainError> {
        // Base fee from the latest block
        let block = self
            .provider
            .get_block_by_number(alloy::eips::BlockNumberOrTag::Latest)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| ChainError::Rpc("No latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(25_000_000_000u128); // 25 gwei default

        let priority_fee: u128 = 1_500_000_000; // 1.5 gwei

        // Max fee = 2 * base_fee + priority_fee (allows for base fee increase)
        let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);

        Ok((max_fee, priority_fee))
    }
}

impl IdentityChain for FactoryClient {
    async fn existing_identity(&self, owner: &str) -> Result<Option<String>, ChainError> {
        let owner = Self::parse_owner(owner)?;
        let factory = IIdentityFactory::new(self.factory, self.provider.clone());

        let identity: Address = factory
            .identityOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        if identity == Address::ZERO {
            Ok(None)
        } else {
            Ok(Some(format!("0x{}", alloy::hex::encode(identity.as_slice()))))
        }
    }

    async fn estimate_create_identity(
        &self,
        owner: &str,
        name: &str,
        symbol: &str,
        salt: &[u8; 32],
    ) -> Result<GasEstimate, ChainError> {
        let data = Self::create_calldata(owner, name, symbol, salt)?;
        let tx = TransactionRequest::default()
            .from(self.deployer.address())
            .to(self.factory)
            .input(data.into());

        let gas_limit = self
            .provider
            .estimate_gas(tx)
            .await
            .map_err(|e| ChainError::Estimation(e.to_string()))?;

        let (max_fee_per_gas, max_priority_fee_per_gas) = self.get_gas_prices().await?;
        let estimated_cost_wei = U256::from(gas_limit) * U256::from(max_fee_per_gas);

        Ok(GasEstimate {
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            estimated_cost_wei,
        })
    }

    async fn deployer_nonce(&self) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(self.deployer.address())
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn build_create_identity(
        &self,
        owner: &str,
        name: &str,
        symbol: &str,
        salt: &[u8; 32],
        gas: &GasEstimate,
        nonce: u64,
    ) -> Result<UnsignedTx, ChainError> {
        let data = Self::create_calldata(owner, name, symbol, salt)?;

        let mut request = TransactionRequest::default()
            .to(self.factory)
            .input(data.into())
            .gas_limit(gas.gas_limit)
            .max_fee_per_gas(gas.max_fee_per_gas)
            .max_priority_fee_per_gas(gas.max_priority_fee_per_gas);
        request.nonce = Some(nonce);
        request.chain_id = Some(self.chain_id);

        Ok(UnsignedTx { request })
    }

    async fn sign(&self, tx: UnsignedTx) -> Result<SignedTx, ChainError> {
        let wallet = EthereumWallet::from(self.deployer.clone());
        let envelope = tx
            .request
            .build(&wallet)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        Ok(SignedTx {
            raw: envelope.encoded_2718(),
            tx_hash: format!("{:?}", envelope.tx_hash()),
        })
    }

    async fn broadcast(&self, tx: &SignedTx) -> Result<String, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(&tx.raw)
            .await
            .map_err(|e| ChainError::Broadcast(e.to_string()))?;

        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, ChainError> {
        let hash: alloy::primitives::TxHash = tx_hash
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid tx hash: {e}")))?;

        // The provisioner bounds this loop with its confirmation timeout.
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| ChainError::Rpc(format!("Failed to get receipt: {}", e)))?;

            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash: tx_hash.to_string(),
                    block_number: receipt.block_number.unwrap_or(0),
                    gas_used: receipt.gas_used as u64,
                    success: receipt.status(),
                });
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

fn parse_deployer_key(key: &str) -> Result<PrivateKeySigner, ChainError> {
    let trimmed = key.strip_prefix("0x").unwrap_or(key);
    let bytes =
        alloy::hex::decode(trimmed).map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
}
