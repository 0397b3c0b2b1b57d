use std::io;

use bytes::Buf;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// String-To-Key conversion of a passphrase into symmetric key material.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    typ: StringToKeyType,
    hash: HashAlgorithm,
    salt: Option<[u8; 8]>,
    count: Option<u8>,
    /// GNU extension mode (1001 = dummy), for `StringToKeyType::Gnu`.
    gnu_mode: Option<u8>,
}

/// Available String-To-Key types
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,
    /// GnuPG private area, used for the "dummy" marker of stripped secrets.
    Gnu = 101,

    #[num_enum(catch_all)]
    Other(u8),
}

const GNU_DUMMY_MODE: u8 = 1;

impl StringToKey {
    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; 8];
        rng.fill(&mut salt[..]);

        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
            gnu_mode: None,
        }
    }

    /// The legacy protection mode of pre-RFC 4880 secret keys.
    pub fn new_simple_md5() -> Self {
        StringToKey {
            typ: StringToKeyType::Simple,
            hash: HashAlgorithm::MD5,
            salt: None,
            count: None,
            gnu_mode: None,
        }
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let typ = StringToKeyType::from(i.read_u8()?);
        let hash = HashAlgorithm::from(i.read_u8()?);

        let mut salt = None;
        let mut count = None;
        let mut gnu_mode = None;
        match typ {
            StringToKeyType::Simple => {}
            StringToKeyType::Salted => {
                salt = Some(i.read_array::<8>()?);
            }
            StringToKeyType::IteratedAndSalted => {
                salt = Some(i.read_array::<8>()?);
                count = Some(i.read_u8()?);
            }
            StringToKeyType::Gnu => {
                let magic = i.read_array::<3>()?;
                ensure_eq!(&magic, b"GNU", "invalid gnu s2k magic");
                gnu_mode = Some(i.read_u8()?);
            }
            _ => unsupported_err!("S2K type {:?}", typ),
        }

        Ok(StringToKey {
            typ,
            hash,
            salt,
            count,
            gnu_mode,
        })
    }

    pub fn typ(&self) -> StringToKeyType {
        self.typ
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_ref().map(|s| &s[..])
    }

    /// True when this is the GNU extension marking the secret material as
    /// externally held.
    pub fn is_gnu_dummy(&self) -> bool {
        self.typ == StringToKeyType::Gnu && self.gnu_mode == Some(GNU_DUMMY_MODE)
    }

    /// Converts the coded count into the octet count.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize)
    }

    /// Derive `key_size` bytes of key material from `passphrase`.
    pub fn derive_key(&self, passphrase: &[u8], key_size: usize) -> Result<Vec<u8>> {
        ensure!(
            !matches!(self.typ, StringToKeyType::Gnu),
            "gnu-dummy s2k carries no key material"
        );

        // validates the hash algorithm up front
        self.hash.new_hasher()?;
        let digest_size = self.hash.digest_size();
        let rounds = key_size.div_ceil(digest_size);

        let mut key = Vec::with_capacity(key_size);

        for round in 0..rounds {
            let mut hasher = self.hash.new_hasher()?;

            // each additional round is prefixed with one more zero byte
            if round > 0 {
                hasher.update(&vec![0u8; round][..]);
            }

            match self.typ {
                StringToKeyType::Simple => {
                    hasher.update(passphrase);
                }
                StringToKeyType::Salted => {
                    hasher.update(self.salt().expect("salted s2k has salt"));
                    hasher.update(passphrase);
                }
                StringToKeyType::IteratedAndSalted => {
                    let salt = self.salt.as_ref().expect("iterated s2k has salt");
                    let data_size = salt.len() + passphrase.len();
                    let mut count = self.count().expect("iterated s2k has count");

                    if count < data_size {
                        count = data_size;
                    }

                    while count > data_size {
                        hasher.update(salt);
                        hasher.update(passphrase);
                        count -= data_size;
                    }

                    if count < salt.len() {
                        hasher.update(&salt[..count]);
                    } else {
                        hasher.update(salt);
                        count -= salt.len();
                        hasher.update(&passphrase[..count]);
                    }
                }
                _ => unsupported_err!("S2K type {:?}", self.typ),
            }

            let digest = hasher.finish();
            let needed = key_size - key.len();
            if needed < digest_size {
                key.extend_from_slice(&digest[..needed]);
            } else {
                key.extend_from_slice(&digest);
            }
        }

        Ok(key)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[u8::from(self.typ), u8::from(self.hash)])?;

        if let Some(ref salt) = self.salt {
            w.write_all(salt)?;
        }
        if let Some(count) = self.count {
            w.write_all(&[count])?;
        }
        if let Some(mode) = self.gnu_mode {
            w.write_all(b"GNU")?;
            w.write_all(&[mode])?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_s2k() {
        let s2k = StringToKey::from_buf(&mut &[0x00, 0x02][..]).unwrap();
        assert_eq!(s2k.typ(), StringToKeyType::Simple);
        assert_eq!(s2k.hash(), HashAlgorithm::SHA1);

        // SHA1("password"), truncated to 16 bytes
        let key = s2k.derive_key(b"password", 16).unwrap();
        assert_eq!(
            hex::encode(&key),
            "5baa61e4c9b93f3f0682250b6cf8331b"
        );
    }

    #[test]
    fn test_iterated_count_decode() {
        let raw = [0x03u8, 0x02, 1, 2, 3, 4, 5, 6, 7, 8, 0x60];
        let s2k = StringToKey::from_buf(&mut &raw[..]).unwrap();
        assert_eq!(s2k.count(), Some(65536));
        assert_eq!(s2k.to_bytes().unwrap(), raw.to_vec());
    }

    #[test]
    fn test_gnu_dummy() {
        let raw = [101u8, 0x02, b'G', b'N', b'U', 1];
        let s2k = StringToKey::from_buf(&mut &raw[..]).unwrap();
        assert!(s2k.is_gnu_dummy());
        assert!(s2k.derive_key(b"pw", 16).is_err());
        assert_eq!(s2k.to_bytes().unwrap(), raw.to_vec());
    }
}
