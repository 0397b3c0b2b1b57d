use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Trust packet (tag 12). Implementation defined, skipped on read and
/// preserved only for reserialization of captured streams.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.10>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trust {
    data: Bytes,
}

impl Trust {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(Trust { data: i.rest() })
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.data)?;
        Ok(())
    }
}
