use std::io::{self, Read};

use crate::types::PacketLength;

use super::header::PacketHeader;

/// State of a partial length body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Between chunks, the next length declaration is pending.
    AtBoundary,
    /// Inside a chunk that is followed by another length declaration.
    ReadingChunk { remaining: usize },
    /// Inside the final, fixed length chunk.
    AtFinalChunk { remaining: usize },
    /// The body has been fully delivered.
    Exhausted,
    /// Old format indeterminate length: the body runs to the end of the
    /// underlying stream.
    Indeterminate,
}

/// Exposes a packet body as one continuous byte stream, concatenating the
/// chunks of partial length bodies transparently. Downstream consumers
/// never observe chunk boundaries.
#[derive(Debug)]
pub struct PacketBodyReader<R: Read> {
    source: R,
    state: ChunkState,
}

impl<R: Read> PacketBodyReader<R> {
    pub fn new(source: R, length: PacketLength) -> Self {
        let state = match length {
            PacketLength::Fixed(0) => ChunkState::Exhausted,
            PacketLength::Fixed(n) => ChunkState::AtFinalChunk { remaining: n },
            PacketLength::Partial(n) => ChunkState::ReadingChunk { remaining: n },
            PacketLength::Indeterminate => ChunkState::Indeterminate,
        };

        PacketBodyReader { source, state }
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        match PacketHeader::read_new_length(&mut self.source) {
            Ok(PacketLength::Partial(n)) => {
                self.state = ChunkState::ReadingChunk { remaining: n };
                Ok(())
            }
            Ok(PacketLength::Fixed(0)) => {
                self.state = ChunkState::Exhausted;
                Ok(())
            }
            Ok(PacketLength::Fixed(n)) => {
                self.state = ChunkState::AtFinalChunk { remaining: n };
                Ok(())
            }
            Ok(PacketLength::Indeterminate) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "indeterminate length inside a partial body",
            )),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated partial body length",
            )),
        }
    }
}

impl<R: Read> Read for PacketBodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            match self.state {
                ChunkState::Exhausted => return Ok(0),
                ChunkState::Indeterminate => return self.source.read(buf),
                ChunkState::AtBoundary => {
                    self.next_chunk()?;
                }
                ChunkState::ReadingChunk { remaining } => {
                    if remaining == 0 {
                        self.state = ChunkState::AtBoundary;
                        continue;
                    }
                    let want = remaining.min(buf.len());
                    let n = self.source.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "truncated packet body chunk",
                        ));
                    }
                    self.state = ChunkState::ReadingChunk { remaining: remaining - n };
                    return Ok(n);
                }
                ChunkState::AtFinalChunk { remaining } => {
                    if remaining == 0 {
                        self.state = ChunkState::Exhausted;
                        return Ok(0);
                    }
                    let want = remaining.min(buf.len());
                    let n = self.source.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "truncated packet body",
                        ));
                    }
                    self.state = ChunkState::AtFinalChunk { remaining: remaining - n };
                    return Ok(n);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_body() {
        let data = b"hello worldTRAILING";
        let mut r = PacketBodyReader::new(&data[..], PacketLength::Fixed(11));
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_partial_body() {
        // two byte partial chunk, then a three byte final chunk
        let mut data = Vec::new();
        data.extend_from_slice(b"ab"); // first chunk (declared by header)
        data.push(0xe1); // partial, 2 bytes
        data.extend_from_slice(b"cd");
        data.push(3); // final fixed chunk
        data.extend_from_slice(b"efg");
        data.extend_from_slice(b"NEXTPACKET");

        let mut r = PacketBodyReader::new(&data[..], PacketLength::Partial(2));
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefg");

        // the reader stops exactly at the end of the final chunk
        let mut rest = Vec::new();
        r.into_inner().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"NEXTPACKET");
    }

    #[test]
    fn test_partial_body_zero_final() {
        let mut data = Vec::new();
        data.extend_from_slice(b"ab");
        data.push(0); // empty final chunk
        let mut r = PacketBodyReader::new(&data[..], PacketLength::Partial(2));
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ab");
    }

    #[test]
    fn test_truncated_chunk_is_fatal() {
        let data = b"ab";
        let mut r = PacketBodyReader::new(&data[..], PacketLength::Fixed(5));
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_indeterminate_body() {
        let data = b"everything left";
        let mut r = PacketBodyReader::new(&data[..], PacketLength::Indeterminate);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, data.to_vec());
    }
}
