use std::io;

use bytes::Buf;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::signature::SignatureType;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::KeyId;

/// One-Pass Signature packet (tag 4): announces a trailing signature so
/// the literal body can be hashed while it streams by.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.4>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    pub typ: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    pub pub_algorithm: PublicKeyAlgorithm,
    pub key_id: KeyId,
    /// Zero when this signature wraps another one-pass signed message.
    pub last: u8,
}

impl OnePassSignature {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported one pass signature version");

        let typ = SignatureType::from(i.read_u8()?);
        let hash_algorithm = HashAlgorithm::from(i.read_u8()?);
        let pub_algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let key_id = KeyId::from_slice(&i.read_array::<8>()?)?;
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
        })
    }

    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
    ) -> Self {
        OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: 1,
        }
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[
            3,
            u8::from(self.typ),
            u8::from(self.hash_algorithm),
            u8::from(self.pub_algorithm),
        ])?;
        w.write_all(self.key_id.as_ref())?;
        w.write_all(&[self.last])?;

        Ok(())
    }
}
