use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};

/// The two octet checksum over secret key and session key material: the sum
/// of all octets mod 65536.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.3>
pub fn simple(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

pub fn simple_verify(data: &[u8], expected: u16) -> Result<()> {
    if simple(data) != expected {
        return Err(Error::key_incorrect());
    }
    Ok(())
}

/// SHA-1 checksum over decrypted secret key material (s2k usage 254).
pub fn sha1_verify(data: &[u8], expected: &[u8]) -> Result<()> {
    let digest = Sha1::digest(data);
    if digest.as_slice() != expected {
        return Err(Error::key_incorrect());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_checksum() {
        assert_eq!(simple(&[0xff, 0xff, 0x02]), 0x0200);
        assert!(simple_verify(&[1, 2, 3], 6).is_ok());
        assert!(simple_verify(&[1, 2, 3], 7).unwrap_err().is_key_incorrect());
    }
}
