//! Node-facing client seam.
//!
//! `ChainClient` is the capability surface the probe consumes: read-only
//! queries plus transfer submission and confirmation. The production
//! implementation wraps an ethers JSON-RPC provider with a local signer set;
//! tests substitute a stub.

use crate::config::{self, ProbeConfig, TRANSFER_GAS_LIMIT};
use crate::error::{classify_rpc_error, classify_submission_error, ProbeError};
use crate::signers;
use crate::types::{Confirmation, NetworkInfo};
use anyhow::Result;
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

const RECEIPT_POLL_INTERVAL_MS: u64 = 500;

#[async_trait]
pub trait ChainClient {
    /// Identity of the connected network.
    async fn network_info(&self) -> Result<NetworkInfo, ProbeError>;

    /// Current suggested gas price, in the node's smallest fee unit.
    async fn gas_price(&self) -> Result<U256, ProbeError>;

    /// The RPC endpoint this client talks to.
    fn endpoint_url(&self) -> &str;

    /// Ordered addresses of the configured signer set.
    async fn signer_addresses(&self) -> Result<Vec<Address>, ProbeError>;

    /// Balance of `address` in wei.
    async fn balance(&self, address: Address) -> Result<U256, ProbeError>;

    /// Sign and broadcast a value transfer from the signer at `signer_index`.
    async fn submit_transfer(
        &self,
        signer_index: usize,
        to: Address,
        value: U256,
    ) -> Result<TxHash, ProbeError>;

    /// Block until the transfer is mined. Unbounded; callers apply their own
    /// deadline.
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ProbeError>;
}

/// `ChainClient` over an ethers HTTP provider and env-configured local wallets.
pub struct RpcChainClient {
    provider: Arc<Provider<Http>>,
    wallets: Vec<LocalWallet>,
    rpc_url: String,
}

impl RpcChainClient {
    pub fn new(provider: Arc<Provider<Http>>, wallets: Vec<LocalWallet>, rpc_url: String) -> Self {
        Self {
            provider,
            wallets,
            rpc_url,
        }
    }

    /// Build a client for the configured endpoint, loading the signer set
    /// from the environment.
    pub async fn connect(config: &ProbeConfig) -> Result<Self> {
        let provider = config.get_provider().await?;
        let wallets = signers::load_signer_set(config.signer_index)?;
        Ok(Self::new(provider, wallets, config.rpc_url.clone()))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?
            .as_u64();

        Ok(NetworkInfo {
            name: config::network_name(chain_id).to_string(),
            chain_id,
        })
    }

    async fn gas_price(&self) -> Result<U256, ProbeError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))
    }

    fn endpoint_url(&self) -> &str {
        &self.rpc_url
    }

    async fn signer_addresses(&self) -> Result<Vec<Address>, ProbeError> {
        Ok(self.wallets.iter().map(|w| w.address()).collect())
    }

    async fn balance(&self, address: Address) -> Result<U256, ProbeError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))
    }

    async fn submit_transfer(
        &self,
        signer_index: usize,
        to: Address,
        value: U256,
    ) -> Result<TxHash, ProbeError> {
        let wallet = self
            .wallets
            .get(signer_index)
            .ok_or(ProbeError::SignerUnavailable {
                index: signer_index,
            })?;
        let from = wallet.address();

        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?
            .as_u64();
        let nonce = self
            .provider
            .get_transaction_count(from, None)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        let tx = TransactionRequest::new()
            .from(from)
            .to(to)
            .value(value)
            .gas(TRANSFER_GAS_LIMIT)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(chain_id);
        let tx = TypedTransaction::Legacy(tx);

        info!(
            "Transaction built: to={:?}, value={}, gas_price={}, nonce={}",
            to, value, gas_price, nonce
        );

        let signature = wallet
            .clone()
            .with_chain_id(chain_id)
            .sign_transaction(&tx)
            .await
            .map_err(|e| ProbeError::Submission(e.to_string()))?;

        let signed_tx = tx.rlp_signed(&signature);
        let pending_tx = self
            .provider
            .send_raw_transaction(signed_tx)
            .await
            .map_err(|e| classify_submission_error(&e.to_string()))?;

        let tx_hash = pending_tx.tx_hash();
        info!("Transaction sent: {:?}", tx_hash);
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ProbeError> {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Confirmation {
                        block_number: receipt.block_number.map(|n| n.as_u64()),
                        gas_used: receipt.gas_used.map(|g| g.as_u64()).unwrap_or(0),
                    });
                }
                Ok(None) => sleep(Duration::from_millis(RECEIPT_POLL_INTERVAL_MS)).await,
                Err(e) => return Err(classify_rpc_error(&e.to_string())),
            }
        }
    }
}
