use std::io::{Cursor, Read};

use bytes::Bytes;
use log::debug;

use crate::errors::Result;
use crate::packet::body_reader::PacketBodyReader;
use crate::packet::header::PacketHeader;
use crate::packet::packet_sum::Packet;

/// How deep nested compression and encryption containers may stack while
/// reading one message. Compression quines expand into themselves forever;
/// this is the fuse.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Reads a stream of packets, transparently descending into nested
/// streams (decrypted or decompressed container bodies) pushed by the
/// caller.
pub struct PacketReader<R: Read> {
    source: R,
    layers: Vec<Cursor<Vec<u8>>>,
    unread: Vec<Packet>,
}

impl<R: Read> PacketReader<R> {
    pub fn new(source: R) -> Self {
        PacketReader {
            source,
            layers: Vec::new(),
            unread: Vec::new(),
        }
    }

    /// Push a packet back; it is returned by the next call to
    /// [`Self::next_packet`].
    pub fn unread(&mut self, packet: Packet) {
        self.unread.push(packet);
    }

    /// Enter a nested packet stream. Fails once the layer stack exceeds
    /// [`MAX_NESTING_DEPTH`].
    pub fn push_layer(&mut self, data: Vec<u8>) -> Result<()> {
        ensure!(
            self.layers.len() < MAX_NESTING_DEPTH,
            "too many layers of packets"
        );
        debug!("descending into nested stream of {} bytes", data.len());
        self.layers.push(Cursor::new(data));
        Ok(())
    }

    /// The next packet, or `None` at the end of the outermost stream.
    /// Exhausted nested streams are left transparently.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        if let Some(p) = self.unread.pop() {
            return Ok(Some(p));
        }

        loop {
            match self.layers.last_mut() {
                Some(layer) => {
                    if layer.position() as usize >= layer.get_ref().len() {
                        self.layers.pop();
                        continue;
                    }
                    return read_packet(layer);
                }
                None => return read_packet(&mut self.source),
            }
        }
    }
}

/// Read a single packet: header, body (with partial length chunks folded
/// away) and typed parse.
pub fn read_packet<R: Read>(r: &mut R) -> Result<Option<Packet>> {
    let Some(header) = PacketHeader::try_from_reader(r)? else {
        return Ok(None);
    };

    let mut body = Vec::new();
    PacketBodyReader::new(&mut *r, header.packet_length()).read_to_end(&mut body)?;

    debug!(
        "read packet {:?} ({} byte body)",
        header.tag(),
        body.len()
    );

    let packet = Packet::from_parts(header.version(), header.tag(), Bytes::from(body))?;
    Ok(Some(packet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tag;

    #[test]
    fn test_reads_fixture_keyring_packets() {
        // public keyring with two entities: primary, uid, sig, subkey,
        // sig, repeated
        let raw = hex::decode(concat!(
            "988d044d3c5c10010400b1d13382944bd5aba23a4312968b5095d14f947f600eb478e14a6fcb16b0",
            "e0cac764884909c020bc495cfcc39a935387c661507bdb236a0612fb582cac3af9b29cc2c8c70090",
            "616c41b662f4da4c1201e195472eb7f4ae1ccbcbf9940fe21d985e379a5563dde5b9a23d35f1cfaa",
            "5790da3b79db26f23695107bfaca8e7b5bcd0011010001b41054657374204b657920312028525341",
            "29"
        ))
        .unwrap();

        let mut reader = PacketReader::new(&raw[..]);
        let first = reader.next_packet().unwrap().unwrap();
        assert_eq!(first.tag(), Tag::PublicKey);
        let second = reader.next_packet().unwrap().unwrap();
        assert_eq!(second.tag(), Tag::UserId);
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_unread() {
        // "Test Key 1 (RSA)" user id packet
        let raw = hex::decode("b41054657374204b65792031202852534129").unwrap();
        let mut reader = PacketReader::new(&raw[..]);
        let uid = reader.next_packet().unwrap().unwrap();
        assert_eq!(uid.tag(), Tag::UserId);
        reader.unread(uid.clone());
        assert_eq!(reader.next_packet().unwrap().unwrap(), uid);
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_layer_cap() {
        let mut reader = PacketReader::new(&[][..]);
        for _ in 0..MAX_NESTING_DEPTH {
            reader.push_layer(vec![]).unwrap();
        }
        let err = reader.push_layer(vec![]).unwrap_err();
        assert!(err.to_string().contains("too many layers of packets"));
    }
}
