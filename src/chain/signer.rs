use sp_core::{sr25519, Pair};
use sp_runtime::{
    traits::{IdentifyAccount, Verify},
    MultiSignature as SpMultiSignature,
};
use subxt::{
    config::substrate::{AccountId32, MultiSignature},
    tx::Signer,
    Config, PolkadotConfig,
};

/// sr25519 signer for subxt extrinsics
#[derive(Clone)]
pub struct PairSigner {
    account_id: <PolkadotConfig as Config>::AccountId,
    signer: sr25519::Pair,
}

impl PairSigner {
    pub fn new(signer: sr25519::Pair) -> Self {
        let account_id =
            <SpMultiSignature as Verify>::Signer::from(Pair::public(&signer)).into_account();
        Self {
            account_id: AccountId32(account_id.into()),
            signer,
        }
    }

    pub fn signer(&self) -> &sr25519::Pair {
        &self.signer
    }

    pub fn account_id(&self) -> &AccountId32 {
        &self.account_id
    }

    /// Raw sr25519 public key, the form the registration puzzle hashes
    pub fn public_key(&self) -> [u8; 32] {
        self.signer.public().0
    }
}

impl Signer<PolkadotConfig> for PairSigner {
    fn account_id(&self) -> <PolkadotConfig as Config>::AccountId {
        self.account_id.clone()
    }

    fn sign(&self, signer_payload: &[u8]) -> <PolkadotConfig as Config>::Signature {
        let signature = Pair::sign(&self.signer, signer_payload);
        MultiSignature::Sr25519(signature.0)
    }
}

pub type BittensorSigner = PairSigner;

pub fn create_signer(pair: sr25519::Pair) -> BittensorSigner {
    PairSigner::new(pair)
}

/// Build a signer from a secret URI: mnemonic, `0x` seed, or dev path like `//Alice`
pub fn signer_from_seed(seed: &str) -> anyhow::Result<BittensorSigner> {
    let pair = sr25519::Pair::from_string(seed, None)
        .map_err(|e| anyhow::anyhow!("Failed to create pair from seed: {:?}", e))?;
    Ok(create_signer(pair))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_uri_signer() {
        let signer = signer_from_seed("//Alice").unwrap();
        assert_eq!(signer.account_id().0, signer.public_key());
    }

    #[test]
    fn test_signer_is_deterministic() {
        let a = signer_from_seed("//Bob").unwrap();
        let b = signer_from_seed("//Bob").unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), signer_from_seed("//Alice").unwrap().public_key());
    }

    #[test]
    fn test_invalid_seed_rejected() {
        assert!(signer_from_seed("0xzz").is_err());
    }
}
