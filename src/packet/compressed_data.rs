use std::io::{self, Read};

use bytes::{Buf, Bytes};
use bzip2::read::BzDecoder;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use log::debug;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::CompressionAlgorithm;

/// Compressed Data packet (tag 8). The body is an algorithm octet followed
/// by the compressed inner packet stream.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.6>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedData {
    algorithm: CompressionAlgorithm,
    compressed_data: Bytes,
}

impl CompressedData {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let algorithm = CompressionAlgorithm::from(i.read_u8()?);
        let compressed_data = i.rest();

        Ok(CompressedData {
            algorithm,
            compressed_data,
        })
    }

    pub fn compress(algorithm: CompressionAlgorithm, data: &[u8]) -> Result<Self> {
        use flate2::write::{DeflateEncoder, ZlibEncoder};
        use flate2::Compression;
        use std::io::Write;

        let compressed = match algorithm {
            CompressionAlgorithm::Uncompressed => data.to_vec(),
            CompressionAlgorithm::ZIP => {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data)?;
                enc.finish()?
            }
            CompressionAlgorithm::ZLIB => {
                let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data)?;
                enc.finish()?
            }
            CompressionAlgorithm::BZip2 => {
                let mut enc =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(data)?;
                enc.finish()?
            }
            CompressionAlgorithm::Other(v) => {
                unsupported_err!("compression algorithm {}", v)
            }
        };

        Ok(CompressedData {
            algorithm,
            compressed_data: compressed.into(),
        })
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Decompress the nested packet stream into memory.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        debug!("decompressing {:?}", self.algorithm);

        let mut out = Vec::new();
        match self.algorithm {
            CompressionAlgorithm::Uncompressed => {
                out.extend_from_slice(&self.compressed_data);
            }
            CompressionAlgorithm::ZIP => {
                DeflateDecoder::new(&self.compressed_data[..])
                    .read_to_end(&mut out)
                    .map_err(|e| format_err!("zip decompression failed: {}", e))?;
            }
            CompressionAlgorithm::ZLIB => {
                ZlibDecoder::new(&self.compressed_data[..])
                    .read_to_end(&mut out)
                    .map_err(|e| format_err!("zlib decompression failed: {}", e))?;
            }
            CompressionAlgorithm::BZip2 => {
                BzDecoder::new(&self.compressed_data[..])
                    .read_to_end(&mut out)
                    .map_err(|e| format_err!("bzip2 decompression failed: {}", e))?;
            }
            CompressionAlgorithm::Other(v) => {
                unsupported_err!("compression algorithm {}", v)
            }
        }

        Ok(out)
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[u8::from(self.algorithm)])?;
        w.write_all(&self.compressed_data)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress() {
        for alg in [
            CompressionAlgorithm::Uncompressed,
            CompressionAlgorithm::ZIP,
            CompressionAlgorithm::ZLIB,
            CompressionAlgorithm::BZip2,
        ] {
            let data = b"a packet stream, repeated. ".repeat(20);
            let packet = CompressedData::compress(alg, &data).unwrap();
            assert_eq!(packet.decompress().unwrap(), data, "{:?}", alg);
        }
    }
}
