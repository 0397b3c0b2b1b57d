use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// User Attribute packet (tag 17). The contents are opaque to this
/// implementation and preserved for reserialization.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.12>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttribute {
    data: Bytes,
}

impl UserAttribute {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(UserAttribute { data: i.rest() })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.data)?;
        Ok(())
    }
}
