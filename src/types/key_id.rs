use std::fmt;

use crate::errors::Result;

/// The low 64 bits of a key fingerprint, used for issuer lookups.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct KeyId([u8; 8]);

impl KeyId {
    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        ensure_eq!(input.len(), 8, "invalid key id length");
        let mut r = [0u8; 8];
        r.copy_from_slice(input);

        Ok(KeyId(r))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// The numeric value, as it appears in user facing tooling.
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Does the low 32 bit "short id" of `self` match the one of `other`?
    pub fn matches_short(&self, other: &KeyId) -> bool {
        self.0[4..] == other.0[4..]
    }
}

impl From<u64> for KeyId {
    fn from(id: u64) -> Self {
        KeyId(id.to_be_bytes())
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.as_ref()))
    }
}

impl fmt::LowerHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_ref()))
    }
}

impl fmt::UpperHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = hex::encode(self.as_ref());
        encoded.make_ascii_uppercase();
        write!(f, "{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_u64_roundtrip() {
        let id = KeyId::from(0xA34D7E18C20C31BBu64);
        assert_eq!(id.as_u64(), 0xA34D7E18C20C31BB);
        assert_eq!(format!("{:x}", id), "a34d7e18c20c31bb");
        assert_eq!(KeyId::from_slice(id.as_ref()).unwrap(), id);
    }
}
