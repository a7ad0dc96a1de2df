//! SS58 address encoding/decoding utilities
//!
//! SS58 is the address format used by Substrate-based chains including Bittensor.

use crate::core::constants::SS58_FORMAT;
use crate::error::{Error, Result};
use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};

/// Encode a 32-byte public key to SS58 address
pub fn ss58_encode(public_key: &[u8; 32]) -> String {
    let account = AccountId32::from(*public_key);
    account.to_ss58check_with_version(Ss58AddressFormat::custom(SS58_FORMAT))
}

/// Decode an SS58 address to 32-byte public key
pub fn ss58_decode(address: &str) -> Result<[u8; 32]> {
    let account = AccountId32::from_ss58check(address)
        .map_err(|e| Error::InvalidParameter(format!("Invalid SS58 address: {}", e)))?;
    Ok(account.into())
}

/// Check if an address is a valid SS58 address
pub fn is_valid_ss58_address(address: &str) -> bool {
    AccountId32::from_ss58check(address).is_ok()
}

/// Resolve a CLI account argument: SS58 address or 0x-prefixed hex public key
pub fn parse_account(input: &str) -> Result<[u8; 32]> {
    let input = input.trim();
    if let Some(stripped) = input.strip_prefix("0x") {
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::InvalidParameter(format!("Invalid hex: {}", e)))?;
        return <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
            Error::InvalidParameter(format!(
                "Invalid public key length: expected 32, got {}",
                bytes.len()
            ))
        });
    }
    ss58_decode(input)
}
