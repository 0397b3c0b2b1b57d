use std::fmt::Display;

use num_enum::{FromPrimitive, IntoPrimitive};

/// Available public key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-9.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// RSA Encrypt-Only (deprecated)
    RSAEncrypt = 2,
    /// RSA Sign-Only (deprecated)
    RSASign = 3,
    /// ElGamal (Encrypt-Only)
    ElGamal = 16,
    DSA = 17,
    ECDH = 18,
    ECDSA = 19,
    /// Deprecated ElGamal (Encrypt and Sign)
    ElGamalSign = 20,
    DiffieHellman = 21,
    EdDSA = 22,

    #[num_enum(catch_all)]
    Other(u8),
}

impl PublicKeyAlgorithm {
    pub fn can_sign(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSASign
                | PublicKeyAlgorithm::DSA
                | PublicKeyAlgorithm::ECDSA
                | PublicKeyAlgorithm::EdDSA
        )
    }

    pub fn can_encrypt(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSAEncrypt
                | PublicKeyAlgorithm::ElGamal
                | PublicKeyAlgorithm::ECDH
        )
    }
}

impl Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RSA => "RSA",
            Self::RSAEncrypt => "RSA (encrypt only)",
            Self::RSASign => "RSA (sign only)",
            Self::ElGamal => "ElGamal",
            Self::DSA => "DSA",
            Self::ECDH => "ECDH",
            Self::ECDSA => "ECDSA",
            Self::ElGamalSign => "ElGamal (sign)",
            Self::DiffieHellman => "Diffie-Hellman",
            Self::EdDSA => "EdDSA",
            Self::Other(v) => return write!(f, "Other({})", v),
        };
        write!(f, "{}", s)
    }
}
