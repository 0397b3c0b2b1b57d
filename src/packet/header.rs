use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, PacketLength, Tag};
use crate::util::write_packet_length;

/// A parsed packet header: framing version, tag and leading length.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-4.2>
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    version: PacketHeaderVersion,
    tag: Tag,
    length: PacketLength,
}

impl PacketHeader {
    pub fn new(version: PacketHeaderVersion, tag: Tag, length: PacketLength) -> Self {
        PacketHeader {
            version,
            tag,
            length,
        }
    }

    /// Parse a single packet header. Returns `None` on a clean EOF before
    /// the first byte.
    pub fn try_from_reader<R: Read>(r: &mut R) -> Result<Option<Self>> {
        let mut first = [0u8; 1];
        if r.read(&mut first)? == 0 {
            return Ok(None);
        }
        let ctb = first[0];

        ensure!(ctb & 0x80 != 0, "invalid packet header 0x{:02x}", ctb);

        if ctb & 0x40 != 0 {
            // new format: tag in the low six bits
            let tag = Tag::from(ctb & 0x3F);
            let length = Self::read_new_length(r)?;
            Ok(Some(PacketHeader {
                version: PacketHeaderVersion::New,
                tag,
                length,
            }))
        } else {
            // old format: two bits of length type
            let tag = Tag::from((ctb & 0x3C) >> 2);
            let length = match ctb & 0x03 {
                0 => PacketLength::Fixed(r.read_u8()?.into()),
                1 => PacketLength::Fixed(r.read_u16::<BigEndian>()?.into()),
                2 => PacketLength::Fixed(r.read_u32::<BigEndian>()? as usize),
                3 => PacketLength::Indeterminate,
                _ => unreachable!("two bit length type"),
            };
            Ok(Some(PacketHeader {
                version: PacketHeaderVersion::Old,
                tag,
                length,
            }))
        }
    }

    /// Parse a new format length declaration. Also used for the chunk
    /// lengths following a partial body.
    pub(crate) fn read_new_length<R: Read>(r: &mut R) -> Result<PacketLength> {
        let olen = r.read_u8()?;
        let length = match olen {
            // One-Octet Lengths
            0..=191 => PacketLength::Fixed(olen.into()),
            // Two-Octet Lengths
            192..=223 => {
                let a = r.read_u8()?;
                PacketLength::Fixed(((olen as usize - 192) << 8) + 192 + a as usize)
            }
            // Partial Body Lengths
            224..=254 => PacketLength::Partial(1 << (olen as usize & 0x1F)),
            // Five-Octet Lengths
            255 => PacketLength::Fixed(r.read_u32::<BigEndian>()? as usize),
        };
        Ok(length)
    }

    pub fn version(&self) -> PacketHeaderVersion {
        self.version
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn packet_length(&self) -> PacketLength {
        self.length
    }
}

/// Write a new format header with a fixed length.
pub fn write_new_header<W: io::Write>(w: &mut W, tag: Tag, len: usize) -> Result<()> {
    w.write_u8(0b1100_0000 | u8::from(tag))?;
    write_packet_length(w, len)?;
    Ok(())
}

/// Write an old format header, used to round trip opaque packets that
/// arrived with legacy framing.
pub fn write_old_header<W: io::Write>(w: &mut W, tag: Tag, len: usize) -> Result<()> {
    let tag = u8::from(tag);
    ensure!(tag < 16, "tag {} does not fit an old style header", tag);

    if len < 256 {
        w.write_u8(0b1000_0000 | tag << 2)?;
        w.write_u8(len as u8)?;
    } else if len < 65536 {
        w.write_u8(0b1000_0000 | tag << 2 | 1)?;
        w.write_u16::<BigEndian>(len as u16)?;
    } else {
        w.write_u8(0b1000_0000 | tag << 2 | 2)?;
        w.write_u32::<BigEndian>(len as u32)?;
    }
    Ok(())
}

impl Serialize for PacketHeader {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match (self.version, self.length) {
            (PacketHeaderVersion::New, PacketLength::Fixed(len)) => {
                write_new_header(w, self.tag, len)
            }
            (PacketHeaderVersion::Old, PacketLength::Fixed(len)) => {
                write_old_header(w, self.tag, len)
            }
            (PacketHeaderVersion::Old, PacketLength::Indeterminate) => {
                let tag = u8::from(self.tag);
                ensure!(tag < 16, "tag {} does not fit an old style header", tag);
                w.write_u8(0b1000_0000 | tag << 2 | 3)?;
                Ok(())
            }
            _ => bail!("cannot serialize header {:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_format_one_octet() {
        let raw = [0xc2u8, 0x10];
        let header = PacketHeader::try_from_reader(&mut &raw[..])
            .unwrap()
            .unwrap();
        assert_eq!(header.version(), PacketHeaderVersion::New);
        assert_eq!(header.tag(), Tag::Signature);
        assert_eq!(header.packet_length(), PacketLength::Fixed(16));
    }

    #[test]
    fn test_new_format_five_octet() {
        // user attribute with a five octet length
        let raw = hex::decode("d1ff0000136d").unwrap();
        let header = PacketHeader::try_from_reader(&mut &raw[..])
            .unwrap()
            .unwrap();
        assert_eq!(header.version(), PacketHeaderVersion::New);
        assert_eq!(header.tag(), Tag::UserAttribute);
        assert_eq!(header.packet_length(), PacketLength::Fixed(4973));
    }

    #[test]
    fn test_new_format_partial() {
        let raw = [0xcbu8, 0xe9];
        let header = PacketHeader::try_from_reader(&mut &raw[..])
            .unwrap()
            .unwrap();
        assert_eq!(header.tag(), Tag::LiteralData);
        assert_eq!(header.packet_length(), PacketLength::Partial(512));
    }

    #[test]
    fn test_old_format() {
        // tag 8 (compressed), one octet length
        let raw = [0xa0u8, 0xb0];
        let header = PacketHeader::try_from_reader(&mut &raw[..])
            .unwrap()
            .unwrap();
        assert_eq!(header.version(), PacketHeaderVersion::Old);
        assert_eq!(header.tag(), Tag::CompressedData);
        assert_eq!(header.packet_length(), PacketLength::Fixed(176));
    }

    #[test]
    fn test_eof_is_none() {
        assert!(PacketHeader::try_from_reader(&mut &[][..])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(PacketHeader::try_from_reader(&mut &[0x10u8, 0x00][..]).is_err());
    }

    #[test]
    fn test_header_write_roundtrip() {
        for (tag, len) in [
            (Tag::Signature, 10usize),
            (Tag::PublicKey, 300),
            (Tag::LiteralData, 70000),
        ] {
            let header = PacketHeader::new(PacketHeaderVersion::New, tag, PacketLength::Fixed(len));
            let buf = header.to_bytes().unwrap();
            let back = PacketHeader::try_from_reader(&mut &buf[..]).unwrap().unwrap();
            assert_eq!(back, header);
        }
    }
}
