use chrono::{DateTime, Utc};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::types::CompressionAlgorithm;

/// Tuning knobs for signing, encryption and key generation. A `None`
/// config anywhere means "all defaults".
pub struct Config {
    /// Hash for new signatures, and the `PreferredHash` of new entities.
    pub default_hash: Option<HashAlgorithm>,
    /// Cipher for new session keys, and the `PreferredSymmetric` of new
    /// entities.
    pub default_cipher: Option<SymmetricKeyAlgorithm>,
    /// Compression applied to new messages.
    pub default_compression: Option<CompressionAlgorithm>,
    /// The clock used for signature creation times and validity checks.
    pub time: Option<Box<dyn Fn() -> DateTime<Utc> + Send + Sync>>,
    /// Modulus size for generated RSA keys.
    pub rsa_bits: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_hash: None,
            default_cipher: None,
            default_compression: None,
            time: None,
            rsa_bits: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("default_hash", &self.default_hash)
            .field("default_cipher", &self.default_cipher)
            .field("default_compression", &self.default_compression)
            .field("time", &self.time.as_ref().map(|_| "fn"))
            .field("rsa_bits", &self.rsa_bits)
            .finish()
    }
}

impl Config {
    pub(crate) fn now(config: Option<&Config>) -> DateTime<Utc> {
        match config.and_then(|c| c.time.as_ref()) {
            Some(f) => f(),
            None => Utc::now(),
        }
    }

    pub(crate) fn hash(config: Option<&Config>) -> HashAlgorithm {
        config
            .and_then(|c| c.default_hash)
            .unwrap_or(HashAlgorithm::SHA2_256)
    }

    pub(crate) fn cipher(config: Option<&Config>) -> SymmetricKeyAlgorithm {
        config
            .and_then(|c| c.default_cipher)
            .unwrap_or(SymmetricKeyAlgorithm::AES128)
    }

    pub(crate) fn compression(config: Option<&Config>) -> CompressionAlgorithm {
        config
            .and_then(|c| c.default_compression)
            .unwrap_or(CompressionAlgorithm::Uncompressed)
    }

    pub(crate) fn rsa_bits(config: Option<&Config>) -> usize {
        config.and_then(|c| c.rsa_bits).unwrap_or(2048)
    }
}
