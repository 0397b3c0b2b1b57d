mod compression;
mod key_id;
mod mpi;
mod packet;
mod revocation_key;
mod s2k;

pub use self::compression::CompressionAlgorithm;
pub use self::key_id::KeyId;
pub use self::mpi::Mpi;
pub use self::packet::{PacketHeaderVersion, PacketLength, Tag};
pub use self::revocation_key::{RevocationKey, RevocationKeyClass};
pub use self::s2k::{StringToKey, StringToKeyType};
