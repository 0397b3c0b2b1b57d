use std::io;

use bytes::{Buf, Bytes};
use log::debug;
use sha1::{Digest, Sha1};

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Length of the Modification Detection Code trailer: packet tag, length
/// octet and a SHA-1 digest.
const MDC_TRAILER_LEN: usize = 22;

/// Symmetrically Encrypted Integrity Protected Data packet (tag 18).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.13>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedProtectedData {
    data: Bytes,
}

impl SymEncryptedProtectedData {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 1, "unsupported protected data version");
        Ok(SymEncryptedProtectedData { data: i.rest() })
    }

    /// Decrypt and verify the MDC. Returns the nested packet stream.
    ///
    /// A failing MDC is reported as `KeyIncorrect`: a session key that
    /// decrypts the prefix but not the trailer means tampered ciphertext,
    /// and callers must not fall through to other session keys.
    pub fn decrypt(&self, alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        debug!("decrypting tag 18 body ({} bytes) with {:?}", self.data.len(), alg);

        let full = alg.decrypt_protected(key, &self.data)?;
        let bs = alg.block_size();

        if full.len() < bs + 2 + MDC_TRAILER_LEN {
            return Err(Error::key_incorrect());
        }

        let hash_offset = full.len() - 20;
        let mdc_offset = full.len() - MDC_TRAILER_LEN;
        if full[mdc_offset] != 0xD3 || full[mdc_offset + 1] != 0x14 {
            return Err(Error::mdc_mismatch());
        }

        let expected = Sha1::digest(&full[..hash_offset]);
        if expected.as_slice() != &full[hash_offset..] {
            return Err(Error::mdc_mismatch());
        }

        Ok(full[bs + 2..mdc_offset].to_vec())
    }

    /// Build an encrypted packet body around `plaintext`.
    pub fn encrypt<R: rand::CryptoRng + rand::Rng>(
        rng: &mut R,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let mut body = alg.make_prefix(rng);
        body.extend_from_slice(plaintext);
        body.extend_from_slice(&[0xD3, 0x14]);

        let digest = Sha1::digest(&body);
        body.extend_from_slice(&digest);

        alg.encrypt_protected(key, &mut body)?;

        Ok(SymEncryptedProtectedData { data: body.into() })
    }
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[1])?;
        w.write_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_encrypt_decrypt_with_mdc() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(21);
        let alg = SymmetricKeyAlgorithm::AES256;
        let key = vec![9u8; alg.key_size()];

        let packet =
            SymEncryptedProtectedData::encrypt(&mut rng, alg, &key, b"nested packets").unwrap();
        assert_eq!(packet.decrypt(alg, &key).unwrap(), b"nested packets");

        let wrong = vec![8u8; alg.key_size()];
        assert!(packet.decrypt(alg, &wrong).unwrap_err().is_key_incorrect());
    }

    #[test]
    fn test_tampered_mdc() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(21);
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = vec![9u8; alg.key_size()];

        let packet =
            SymEncryptedProtectedData::encrypt(&mut rng, alg, &key, b"nested packets").unwrap();
        let mut raw = packet.data.to_vec();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = SymEncryptedProtectedData { data: raw.into() };

        assert!(tampered.decrypt(alg, &key).unwrap_err().is_mdc_mismatch());
    }
}
