use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::Result;

/// Write a new-format packet length.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-4.2.2>
pub fn write_packet_length<W: io::Write>(w: &mut W, len: usize) -> Result<()> {
    if len < 192 {
        w.write_u8(len as u8)?;
    } else if len < 8384 {
        w.write_u8((((len - 192) >> 8) + 192) as u8)?;
        w.write_u8(((len - 192) & 0xFF) as u8)?;
    } else {
        w.write_u8(255)?;
        w.write_u32::<BigEndian>(len as u32)?;
    }

    Ok(())
}

/// Reads a UTF-8 string out of raw bytes, replacing invalid sequences.
pub fn read_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_packet_length() {
        let mut buf = Vec::new();
        write_packet_length(&mut buf, 100).unwrap();
        assert_eq!(buf, vec![100]);

        buf.clear();
        write_packet_length(&mut buf, 192).unwrap();
        assert_eq!(buf, vec![0xc0, 0x00]);

        buf.clear();
        write_packet_length(&mut buf, 8383).unwrap();
        assert_eq!(buf, vec![0xdf, 0xff]);

        buf.clear();
        write_packet_length(&mut buf, 8384).unwrap();
        assert_eq!(buf, vec![0xff, 0x00, 0x00, 0x20, 0xc0]);
    }
}
