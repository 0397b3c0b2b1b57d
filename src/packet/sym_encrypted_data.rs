use std::io;

use bytes::{Buf, Bytes};
use log::debug;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Symmetrically Encrypted Data packet (tag 9), without integrity
/// protection. Decryption uses OpenPGP CFB with prefix resynchronization.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedData {
    data: Bytes,
}

impl SymEncryptedData {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(SymEncryptedData { data: i.rest() })
    }

    /// Decrypt to the nested packet stream.
    pub fn decrypt(&self, alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        debug!("decrypting tag 9 body ({} bytes) with {:?}", self.data.len(), alg);
        alg.decrypt(key, &self.data)
    }
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.data)?;
        Ok(())
    }
}
