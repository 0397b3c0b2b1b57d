use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// An owned multiprecision integer, stored with leading zeros stripped.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.2>
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Mpi(Bytes);

impl Mpi {
    /// Parses a length-prefixed MPI out of the given buffer.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;
        ensure!(len_bits <= MAX_EXTERN_MPI_BITS, "mpi too large: {} bits", len_bits);

        let len_bytes = usize::from((len_bits + 7) >> 3);
        let n = i.read_take(len_bytes)?;

        Ok(Mpi::from_slice(&n))
    }

    /// Wraps `raw` as an Mpi. `raw` is not length-prefixed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(Bytes::copy_from_slice(strip_leading_zeros(raw)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value left padded with zeros to `size` bytes. Fails when the
    /// value does not fit.
    pub fn to_padded(&self, size: usize) -> Result<Vec<u8>> {
        ensure!(self.0.len() <= size, "mpi of {} bytes exceeds {}", self.0.len(), size);
        let mut out = vec![0u8; size - self.0.len()];
        out.extend_from_slice(&self.0);
        Ok(out)
    }
}

/// Returns the bit length of a given slice.
#[inline]
fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| b != &0) {
        Some(offset) => &bytes[offset..],
        None => &[],
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for Mpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mpi({})", hex::encode(&self.0))
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<BigEndian>(bit_size(&self.0) as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpi_parse() {
        // Decode the number `511` (`0x1FF` in hex).
        assert_eq!(
            Mpi::from_buf(&mut &[0x00, 0x09, 0x01, 0xFF][..]).unwrap(),
            Mpi::from_slice(&[0x01, 0xFF][..])
        );
    }

    #[test]
    fn test_mpi_roundtrip() {
        let m = Mpi::from_slice(&[0x01, 0xFF]);
        let buf = m.to_bytes().unwrap();
        assert_eq!(buf, vec![0x00, 0x09, 0x01, 0xFF]);
        assert_eq!(Mpi::from_buf(&mut &buf[..]).unwrap(), m);
    }

    #[test]
    fn test_mpi_strips_leading_zeros() {
        let m = Mpi::from_slice(&[0x00, 0x00, 0x02]);
        assert_eq!(m.as_ref(), &[0x02]);
        assert_eq!(m.to_padded(3).unwrap(), vec![0x00, 0x00, 0x02]);
    }
}
