use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::util::read_string;

/// Data format of a literal data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataFormat {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',
}

impl DataFormat {
    fn try_from_u8(v: u8) -> Result<Self> {
        match v {
            b'b' => Ok(DataFormat::Binary),
            b't' => Ok(DataFormat::Text),
            b'u' => Ok(DataFormat::Utf8),
            b'l' | b'1' => Ok(DataFormat::Binary), // MIME local, treated as binary
            _ => bail!("unknown literal data format 0x{:02x}", v),
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, DataFormat::Binary)
    }
}

/// Literal Data packet (tag 11).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.9>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralData {
    format: DataFormat,
    file_name: String,
    /// Modification or creation time of the file, seconds since the epoch.
    time: u32,
    data: Bytes,
}

impl LiteralData {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let format = DataFormat::try_from_u8(i.read_u8()?)?;
        let name_len = i.read_u8()?;
        let name_raw = i.read_take(usize::from(name_len))?;
        let time = i.read_be_u32()?;
        let data = i.rest();

        Ok(LiteralData {
            format,
            file_name: read_string(&name_raw),
            time,
            data,
        })
    }

    pub fn new_binary(file_name: &str, time: u32, data: Vec<u8>) -> Self {
        LiteralData {
            format: DataFormat::Binary,
            file_name: file_name.to_string(),
            time,
            data: data.into(),
        }
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[self.format as u8])?;
        ensure!(self.file_name.len() < 256, "file name too long");
        w.write_all(&[self.file_name.len() as u8])?;
        w.write_all(self.file_name.as_bytes())?;
        w.write_u32::<BigEndian>(self.time)?;
        w.write_all(&self.data)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_roundtrip() {
        let lit = LiteralData::new_binary("test.txt", 1295992998, b"hello\n".to_vec());
        let buf = lit.to_bytes().unwrap();
        let back = LiteralData::from_buf(&mut &buf[..]).unwrap();
        assert_eq!(back, lit);
        assert_eq!(back.file_name(), "test.txt");
        assert_eq!(back.time(), 1295992998);
        assert_eq!(back.data(), b"hello\n");
    }
}
