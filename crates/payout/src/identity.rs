//! The operator key used to sign every withdrawal transaction.

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use crate::error::PayoutError;

/// Where the signing key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    SeedPhrase,
    PrivateKey,
}

/// The dispatcher's signing key and its address. Loaded once at startup.
pub struct SigningIdentity {
    signer: PrivateKeySigner,
    source: IdentitySource,
}

impl SigningIdentity {
    /// Derive the first account (`m/44'/60'/0'/0/0`) of a BIP-39 phrase.
    pub fn from_seed_phrase(phrase: &str) -> Result<Self, PayoutError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(0)
            .map_err(|e| PayoutError::ConfigError(format!("invalid derivation index: {e}")))?
            .build()
            .map_err(|e| PayoutError::ConfigError(format!("invalid seed phrase: {e}")))?;
        Ok(Self {
            signer,
            source: IdentitySource::SeedPhrase,
        })
    }

    /// Load a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(key: &str) -> Result<Self, PayoutError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| PayoutError::ConfigError(format!("invalid private key: {e}")))?;
        Ok(Self {
            signer,
            source: IdentitySource::PrivateKey,
        })
    }

    /// Load from whichever source is configured. The seed phrase wins when
    /// both are present; blank values count as absent.
    pub fn load(seed_phrase: Option<&str>, private_key: Option<&str>) -> Result<Self, PayoutError> {
        let seed_phrase = seed_phrase.filter(|s| !s.trim().is_empty());
        let private_key = private_key.filter(|s| !s.trim().is_empty());

        match (seed_phrase, private_key) {
            (Some(phrase), key) => {
                if key.is_some() {
                    tracing::warn!("both seed phrase and private key configured; using seed phrase");
                }
                Self::from_seed_phrase(phrase)
            }
            (None, Some(key)) => Self::from_private_key(key),
            (None, None) => Err(PayoutError::ConfigError(
                "no signing identity configured (set a seed phrase or a private key)".to_string(),
            )),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn source(&self) -> IdentitySource {
        self.source
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
