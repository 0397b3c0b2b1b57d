mod body_reader;
mod compressed_data;
mod header;
mod key;
mod literal_data;
mod marker;
mod one_pass_signature;
mod packet_sum;
mod public_key_encrypted_session_key;
mod reader;
mod signature;
mod sym_encrypted_data;
mod sym_encrypted_protected_data;
mod sym_key_encrypted_session_key;
mod trust;
mod user_attribute;
mod user_id;

pub use self::body_reader::PacketBodyReader;
pub use self::compressed_data::CompressedData;
pub use self::header::PacketHeader;
pub use self::key::{PlainSecretParams, PublicKey, PublicParams, SecretKey};
pub use self::literal_data::{DataFormat, LiteralData};
pub use self::marker::Marker;
pub use self::one_pass_signature::OnePassSignature;
pub use self::packet_sum::{write_packet, Packet};
pub use self::public_key_encrypted_session_key::{EskValues, PublicKeyEncryptedSessionKey};
pub use self::reader::{read_packet, PacketReader, MAX_NESTING_DEPTH};
pub use self::signature::{KeyFlags, Signature, SignatureType, SignatureV3};
pub use self::sym_encrypted_data::SymEncryptedData;
pub use self::sym_encrypted_protected_data::SymEncryptedProtectedData;
pub use self::sym_key_encrypted_session_key::SymKeyEncryptedSessionKey;
pub use self::trust::Trust;
pub use self::user_attribute::UserAttribute;
pub use self::user_id::UserId;

pub(crate) use self::signature::{hash_user_id, subpacket, write_subpacket};
