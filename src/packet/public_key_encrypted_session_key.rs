use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Mpi};

/// The algorithm specific values of an encrypted session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EskValues {
    Rsa {
        mpi: Mpi,
    },
    Elgamal {
        first: Mpi,
        second: Mpi,
    },
    Ecdh {
        ephemeral: Mpi,
        wrapped: Bytes,
    },
    /// Preserved for reserialization of material we cannot decrypt.
    Other {
        body: Bytes,
    },
}

/// Public-Key Encrypted Session Key packet (tag 1).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    /// All zero when the recipient is anonymous ("wildcard").
    pub key_id: KeyId,
    pub algorithm: PublicKeyAlgorithm,
    pub values: EskValues,
}

impl PublicKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported pkesk version");

        let key_id = KeyId::from_slice(&i.read_array::<8>()?)?;
        let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);

        let values = match algorithm {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt => EskValues::Rsa {
                mpi: Mpi::from_buf(&mut i)?,
            },
            PublicKeyAlgorithm::ElGamal => EskValues::Elgamal {
                first: Mpi::from_buf(&mut i)?,
                second: Mpi::from_buf(&mut i)?,
            },
            PublicKeyAlgorithm::ECDH => {
                let ephemeral = Mpi::from_buf(&mut i)?;
                let len = i.read_u8()?;
                let wrapped = i.read_take(usize::from(len))?;
                EskValues::Ecdh { ephemeral, wrapped }
            }
            _ => EskValues::Other { body: i.rest() },
        };

        Ok(PublicKeyEncryptedSessionKey {
            key_id,
            algorithm,
            values,
        })
    }

    /// True when the recipient key id is the anonymous wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.key_id.as_ref().iter().all(|b| *b == 0)
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[3])?;
        w.write_all(self.key_id.as_ref())?;
        w.write_all(&[u8::from(self.algorithm)])?;

        match &self.values {
            EskValues::Rsa { mpi } => mpi.to_writer(w)?,
            EskValues::Elgamal { first, second } => {
                first.to_writer(w)?;
                second.to_writer(w)?;
            }
            EskValues::Ecdh { ephemeral, wrapped } => {
                ephemeral.to_writer(w)?;
                ensure!(wrapped.len() < 256, "wrapped key too long");
                w.write_all(&[wrapped.len() as u8])?;
                w.write_all(wrapped)?;
            }
            EskValues::Other { body } => w.write_all(body)?,
        }

        Ok(())
    }
}
