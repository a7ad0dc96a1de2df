//! Registration queries against a live node

use async_trait::async_trait;
use parity_scale_codec::Encode;
use sp_core::crypto::AccountId32;
use subxt::dynamic::Value;

use super::BittensorClient;
use crate::core::constants::SUBTENSOR_MODULE;
use crate::error::{Error, Result};
use crate::pow::PowChain;
use crate::utils::decoders::{decode_bool, decode_u64};

#[async_trait]
impl PowChain for BittensorClient {
    async fn get_current_block(&self) -> Result<u64> {
        Ok(self.block_number().await?)
    }

    async fn get_difficulty(&self, netuid: u16) -> Result<u128> {
        let value = self
            .storage_with_keys(
                SUBTENSOR_MODULE,
                "Difficulty",
                vec![Value::u128(netuid as u128)],
            )
            .await?
            .ok_or(Error::SubnetNotFound(netuid))?;
        decode_u64(&value)
            .map(u128::from)
            .map_err(|e| Error::decode(format!("Failed to decode Difficulty: {}", e)))
    }

    async fn get_block_hash(&self, block_number: u64) -> Result<Option<[u8; 32]>> {
        Ok(self.block_hash(block_number).await?)
    }

    async fn is_hotkey_registered(&self, netuid: u16, hotkey: &[u8; 32]) -> Result<bool> {
        let account = AccountId32::from(*hotkey);
        let keys = vec![
            Value::u128(netuid as u128),
            Value::from_bytes(account.encode()),
        ];
        let uid = self
            .storage_with_keys(SUBTENSOR_MODULE, "Uids", keys)
            .await?;
        // A decodable UID means the hotkey holds a slot
        Ok(uid.map(|v| decode_u64(&v).is_ok()).unwrap_or(false))
    }

    async fn subnet_exists(&self, netuid: u16) -> Result<bool> {
        let value = self
            .storage_with_keys(
                SUBTENSOR_MODULE,
                "NetworksAdded",
                vec![Value::u128(netuid as u128)],
            )
            .await?;
        match value {
            Some(v) => decode_bool(&v).map_err(|e| {
                Error::decode(format!(
                    "Failed to decode NetworksAdded for subnet {}: {}",
                    netuid, e
                ))
            }),
            None => Ok(false),
        }
    }
}
