use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::StringToKey;

/// Symmetric-Key Encrypted Session Key packet (tag 3).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymKeyEncryptedSessionKey {
    pub cipher: SymmetricKeyAlgorithm,
    pub s2k: StringToKey,
    /// When present, the session key encrypted with the derived key.
    /// When absent, the derived key is the session key itself.
    pub encrypted_key: Option<Bytes>,
}

impl SymKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 4, "unsupported skesk version");

        let cipher = SymmetricKeyAlgorithm::from(i.read_u8()?);
        let s2k = StringToKey::from_buf(&mut i)?;

        let encrypted_key = if i.has_remaining() {
            Some(i.rest())
        } else {
            None
        };

        Ok(SymKeyEncryptedSessionKey {
            cipher,
            s2k,
            encrypted_key,
        })
    }

    /// Derive the session key from `passphrase`.
    pub fn decrypt(&self, passphrase: &[u8]) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
        let derived = self.s2k.derive_key(passphrase, self.cipher.key_size())?;

        match &self.encrypted_key {
            None => Ok((self.cipher, derived)),
            Some(encrypted) => {
                let mut buf = encrypted.to_vec();
                let iv = vec![0u8; self.cipher.block_size()];
                self.cipher.decrypt_with_iv_regular(&derived, &iv, &mut buf)?;

                ensure!(buf.len() > 1, "invalid encrypted session key");
                let alg = SymmetricKeyAlgorithm::from(buf[0]);
                Ok((alg, buf[1..].to_vec()))
            }
        }
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[4, u8::from(self.cipher)])?;
        self.s2k.to_writer(w)?;
        if let Some(ref encrypted) = self.encrypted_key {
            w.write_all(encrypted)?;
        }

        Ok(())
    }
}
