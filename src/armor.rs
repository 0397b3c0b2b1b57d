//! ASCII armor reading and writing.
//! Ref: <https://tools.ietf.org/html/rfc4880#section-6.2>

use std::fmt::Display;
use std::io::{BufRead, BufReader, Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;

use crate::errors::Result;

/// Type of an armored block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlockType {
    PublicKey,
    PrivateKey,
    Message,
    Signature,
    /// GnuPG extension
    File,
}

impl BlockType {
    fn as_str(self) -> &'static str {
        match self {
            BlockType::PublicKey => "PGP PUBLIC KEY BLOCK",
            BlockType::PrivateKey => "PGP PRIVATE KEY BLOCK",
            BlockType::Message => "PGP MESSAGE",
            BlockType::Signature => "PGP SIGNATURE",
            BlockType::File => "PGP ARMORED FILE",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "PGP PUBLIC KEY BLOCK" => Some(BlockType::PublicKey),
            "PGP PRIVATE KEY BLOCK" => Some(BlockType::PrivateKey),
            "PGP MESSAGE" => Some(BlockType::Message),
            "PGP SIGNATURE" => Some(BlockType::Signature),
            "PGP ARMORED FILE" => Some(BlockType::File),
            _ => None,
        }
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decoded armor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub typ: BlockType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// CRC-24 over the decoded body.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-6.1>
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for b in data {
        crc ^= u32::from(*b) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Decode the first armor block found in `input`. Anything before the
/// `BEGIN` line is skipped, as producers routinely prepend commentary.
pub fn decode<R: Read>(input: R) -> Result<Block> {
    let mut lines = BufReader::new(input).lines();

    // find the BEGIN line
    let typ = loop {
        let line = match lines.next() {
            Some(line) => line?,
            None => invalid_arg_err!("no armored data found"),
        };
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("-----BEGIN ") {
            if let Some(label) = rest.strip_suffix("-----") {
                match BlockType::from_label(label) {
                    Some(typ) => break typ,
                    None => invalid_arg_err!("unknown armor block type {:?}", label),
                }
            }
        }
    };

    // armor headers, up to the first empty line
    let mut headers = Vec::new();
    let mut first_body_line: Option<String> = None;
    loop {
        let line = match lines.next() {
            Some(line) => line?,
            None => invalid_arg_err!("truncated armor block"),
        };
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        match line.split_once(": ") {
            Some((k, v)) => headers.push((k.to_string(), v.to_string())),
            None => {
                // blocks without headers go straight into base64 data
                first_body_line = Some(line.to_string());
                break;
            }
        }
    }

    let mut b64 = String::new();
    if let Some(line) = first_body_line {
        b64.push_str(&line);
    }
    let mut declared_crc = None;
    loop {
        let line = match lines.next() {
            Some(line) => line?,
            None => invalid_arg_err!("truncated armor block"),
        };
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("-----END ") {
            debug!("armor end line {:?}", rest);
            break;
        }
        if let Some(crc_b64) = line.strip_prefix('=') {
            let raw = BASE64
                .decode(crc_b64)
                .map_err(|_| crate::errors::Error::InvalidArgument {
                    message: "invalid armor checksum encoding".into(),
                    backtrace: ::snafu::GenerateImplicitData::generate(),
                })?;
            if raw.len() != 3 {
                invalid_arg_err!("invalid armor checksum length");
            }
            declared_crc =
                Some(u32::from(raw[0]) << 16 | u32::from(raw[1]) << 8 | u32::from(raw[2]));
            continue;
        }
        b64.push_str(line);
    }

    let body = BASE64
        .decode(b64.as_bytes())
        .map_err(|_| crate::errors::Error::InvalidArgument {
            message: "invalid base64 in armor body".into(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })?;

    if let Some(declared) = declared_crc {
        if crc24(&body) != declared {
            invalid_arg_err!("armor checksum mismatch");
        }
    }

    Ok(Block { typ, headers, body })
}

const LINE_LENGTH: usize = 64;

/// Write `data` as an armored block.
pub fn encode<W: Write>(
    w: &mut W,
    typ: BlockType,
    headers: &[(String, String)],
    data: &[u8],
) -> Result<()> {
    writeln!(w, "-----BEGIN {}-----", typ)?;
    for (k, v) in headers {
        writeln!(w, "{}: {}", k, v)?;
    }
    writeln!(w)?;

    let b64 = BASE64.encode(data);
    for chunk in b64.as_bytes().chunks(LINE_LENGTH) {
        w.write_all(chunk)?;
        writeln!(w)?;
    }

    let crc = crc24(data);
    let crc_bytes = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
    writeln!(w, "={}", BASE64.encode(crc_bytes))?;
    writeln!(w, "-----END {}-----", typ)?;

    Ok(())
}

/// Convenience: maps a raw `io::Read` of armored text into the decoded body
/// after checking the block type against `expected`.
pub fn decode_expected<R: Read>(input: R, expected: &[BlockType]) -> Result<Block> {
    let block = decode(input)?;
    if !expected.contains(&block.typ) {
        invalid_arg_err!("unexpected armor block type {:?}", block.typ);
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc24() {
        assert_eq!(crc24(b""), CRC24_INIT);
        assert_ne!(crc24(b"hello world"), crc24(b"hello worle"));
        assert!(crc24(b"hello world") <= 0x00FF_FFFF);
    }

    #[test]
    fn test_roundtrip() {
        let data = b"some binary data \x00\x01\x02 that needs wrapping".repeat(5);
        let mut out = Vec::new();
        encode(
            &mut out,
            BlockType::Message,
            &[("Version".to_string(), "opgp".to_string())],
            &data,
        )
        .unwrap();

        let block = decode(&out[..]).unwrap();
        assert_eq!(block.typ, BlockType::Message);
        assert_eq!(block.headers, vec![("Version".to_string(), "opgp".to_string())]);
        assert_eq!(block.body, data);
    }

    #[test]
    fn test_not_armored() {
        let err = decode(&b"foo"[..]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_bad_checksum() {
        let mut out = Vec::new();
        encode(&mut out, BlockType::Message, &[], b"payload").unwrap();
        let text = String::from_utf8(out).unwrap();
        let broken: String = text
            .lines()
            .map(|l| {
                if l.starts_with('=') && l.len() == 5 {
                    "=AAAA"
                } else {
                    l
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let err = decode(broken.as_bytes()).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
