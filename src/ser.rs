use std::io;

use crate::errors::Result;

/// Serialization into the OpenPGP wire format.
pub trait Serialize {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()>;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Serialize> Serialize for &T {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        (*self).to_writer(w)
    }
}
