use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::util::read_string;

/// User ID packet (tag 13).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.11>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId {
    id: String,
}

impl UserId {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let raw = i.rest();
        Ok(UserId {
            id: read_string(&raw),
        })
    }

    pub fn from_str(id: &str) -> Self {
        UserId { id: id.to_string() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(self.id.as_bytes())?;
        Ok(())
    }
}

impl From<UserId> for Bytes {
    fn from(id: UserId) -> Self {
        Bytes::from(id.id.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::from_buf(&b"Alice <alice@example.com>"[..]).unwrap();
        assert_eq!(id.id(), "Alice <alice@example.com>");
        assert_eq!(id.to_bytes().unwrap(), b"Alice <alice@example.com>".to_vec());
    }
}
