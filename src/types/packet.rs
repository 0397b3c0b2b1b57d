use num_enum::{FromPrimitive, IntoPrimitive};

/// Packet tags.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-4.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum Tag {
    Reserved = 0,
    PublicKeyEncryptedSessionKey = 1,
    Signature = 2,
    SymKeyEncryptedSessionKey = 3,
    OnePassSignature = 4,
    SecretKey = 5,
    PublicKey = 6,
    SecretSubkey = 7,
    CompressedData = 8,
    SymEncryptedData = 9,
    Marker = 10,
    LiteralData = 11,
    Trust = 12,
    UserId = 13,
    PublicSubkey = 14,
    UserAttribute = 17,
    SymEncryptedProtectedData = 18,
    ModDetectionCode = 19,

    #[num_enum(catch_all)]
    Other(u8),
}

/// The two header framings of the wire format.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketHeaderVersion {
    /// Old format ("legacy")
    Old,
    /// New format
    New,
}

/// Body length declaration of a packet.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketLength {
    Fixed(usize),
    /// First chunk of a partial length body; remaining lengths follow the chunk.
    Partial(usize),
    /// Old format, length type 3: the body extends to the end of the stream.
    Indeterminate,
}
