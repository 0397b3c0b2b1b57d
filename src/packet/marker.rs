use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Marker packet (tag 10), always the literal bytes `PGP`.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.8>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker;

impl Marker {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let body = i.rest();
        ensure_eq!(&body[..], b"PGP", "invalid marker packet");
        Ok(Marker)
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(b"PGP")?;
        Ok(())
    }
}
