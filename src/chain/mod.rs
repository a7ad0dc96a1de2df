pub mod pow;
pub mod signer;

use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::{dynamic::Value, PolkadotConfig};
use thiserror::Error;
use tracing::{debug, info};

pub use signer::{create_signer, signer_from_seed, BittensorSigner, PairSigner};

/// Default RPC endpoint (managed by Opentensor)
/// Same as Bittensor Python's DEFAULT_ENDPOINT
pub const DEFAULT_RPC_URL: &str = crate::core::constants::DEFAULT_ENDPOINT;

/// Error types for chain operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Subxt error: {0}")]
    Subxt(#[from] subxt::Error),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// Bittensor client for interacting with the chain
pub struct BittensorClient {
    pub api: subxt::OnlineClient<PolkadotConfig>,
    pub rpc: LegacyRpcMethods<PolkadotConfig>,
    pub rpc_url: String,
}

impl BittensorClient {
    /// Create a new Bittensor client connected to the specified RPC endpoint
    pub async fn new(rpc_url: impl Into<String>) -> Result<Self, Error> {
        let url = rpc_url.into();
        debug!(endpoint = %url, "Connecting");

        // One RPC client backs both the typed API and the legacy methods
        let rpc_client = RpcClient::from_url(&url)
            .await
            .map_err(|e| Error::Connection(format!("Failed to create RPC client: {}", e)))?;
        let rpc = LegacyRpcMethods::new(rpc_client.clone());
        let api = subxt::OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        info!(endpoint = %url, "Connected");
        Ok(Self {
            api,
            rpc,
            rpc_url: url,
        })
    }

    /// Connect to the default endpoint
    pub async fn with_default() -> Result<Self, Error> {
        Self::new(DEFAULT_RPC_URL).await
    }

    /// Get the underlying subxt API client
    pub fn api(&self) -> &subxt::OnlineClient<PolkadotConfig> {
        &self.api
    }

    /// Get the RPC URL
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Query a storage entry with multiple keys at the latest finalized block
    pub async fn storage_with_keys(
        &self,
        module: &str,
        entry: &str,
        keys: Vec<Value>,
    ) -> Result<Option<Value>, Error> {
        let storage_query = subxt::dynamic::storage(module, entry, keys);
        let storage = self.api.storage().at_latest().await?;
        let value = storage.fetch(&storage_query).await?;

        // Convert DecodedValueThunk to Value
        match value {
            Some(thunk) => match thunk.to_value() {
                Ok(v) => Ok(Some(v.remove_context())),
                Err(e) => Err(Error::Decoding(format!(
                    "Failed to decode storage value: {}",
                    e
                ))),
            },
            None => Ok(None),
        }
    }

    /// Submit an extrinsic using a dynamic call
    pub async fn submit_extrinsic(
        &self,
        module: &str,
        function: &str,
        args: Vec<Value>,
        signer: &BittensorSigner,
        wait_for: ExtrinsicWait,
    ) -> Result<String, Error> {
        let call = subxt::dynamic::tx(module, function, args);

        let mut tx_client = self
            .api
            .tx()
            .sign_and_submit_then_watch_default(&call, signer)
            .await?;

        match wait_for {
            ExtrinsicWait::Included => {
                let in_block = loop {
                    match tx_client.next().await {
                        Some(Ok(status)) => match status {
                            subxt::tx::TxStatus::InBestBlock(in_block)
                            | subxt::tx::TxStatus::InFinalizedBlock(in_block) => break in_block,
                            subxt::tx::TxStatus::Error { message } => {
                                return Err(Error::Transaction(format!(
                                    "Transaction error: {}",
                                    message
                                )))
                            }
                            subxt::tx::TxStatus::Invalid { message } => {
                                return Err(Error::Transaction(format!(
                                    "Invalid transaction: {}",
                                    message
                                )))
                            }
                            subxt::tx::TxStatus::Dropped { message } => {
                                return Err(Error::Transaction(format!(
                                    "Transaction dropped: {}",
                                    message
                                )))
                            }
                            _ => continue,
                        },
                        Some(Err(e)) => {
                            return Err(Error::Transaction(format!(
                                "Transaction status error: {}",
                                e
                            )))
                        }
                        None => {
                            return Err(Error::Transaction(
                                "Transaction stream ended unexpectedly".to_string(),
                            ))
                        }
                    }
                };
                // Dispatch errors (e.g. AlreadyRegistered) surface here
                let events = in_block
                    .wait_for_success()
                    .await
                    .map_err(|e| Error::Transaction(e.to_string()))?;
                Ok(format!("{:?}", events.extrinsic_hash()))
            }
            ExtrinsicWait::Finalized => {
                let finalized = tx_client
                    .wait_for_finalized_success()
                    .await
                    .map_err(|e| Error::Transaction(e.to_string()))?;
                Ok(format!("{:?}", finalized.extrinsic_hash()))
            }
            ExtrinsicWait::None => Ok(format!("{:?}", tx_client.extrinsic_hash())),
        }
    }

    /// Number of the best (not yet finalized) block
    pub async fn block_number(&self) -> Result<u64, Error> {
        let header = self
            .rpc
            .chain_get_header(None)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get best header: {}", e)))?
            .ok_or_else(|| Error::Rpc("Best header not found".to_string()))?;
        Ok(header.number as u64)
    }

    /// Get block hash for a given block number
    pub async fn block_hash(&self, block_number: u64) -> Result<Option<[u8; 32]>, Error> {
        let hash = self
            .rpc
            .chain_get_block_hash(Some(block_number.into()))
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get hash of block {}: {}", block_number, e)))?;
        Ok(hash.map(|h| h.0))
    }
}

/// Wait options for extrinsics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtrinsicWait {
    /// Don't wait
    None,
    /// Wait for inclusion in a block
    #[default]
    Included,
    /// Wait for finalization
    Finalized,
}
