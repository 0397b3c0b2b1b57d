use std::io;

use bytes::Bytes;
use log::debug;

use crate::errors::Result;
use crate::packet::compressed_data::CompressedData;
use crate::packet::header::{write_new_header, write_old_header};
use crate::packet::key::{PublicKey, SecretKey};
use crate::packet::literal_data::LiteralData;
use crate::packet::marker::Marker;
use crate::packet::one_pass_signature::OnePassSignature;
use crate::packet::public_key_encrypted_session_key::PublicKeyEncryptedSessionKey;
use crate::packet::signature::{Signature, SignatureV3};
use crate::packet::sym_encrypted_data::SymEncryptedData;
use crate::packet::sym_encrypted_protected_data::SymEncryptedProtectedData;
use crate::packet::sym_key_encrypted_session_key::SymKeyEncryptedSessionKey;
use crate::packet::trust::Trust;
use crate::packet::user_attribute::UserAttribute;
use crate::packet::user_id::UserId;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// A decoded packet.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Packet {
    PublicKey(PublicKey),
    PublicSubkey(PublicKey),
    SecretKey(SecretKey),
    SecretSubkey(SecretKey),
    Signature(Signature),
    SignatureV3(SignatureV3),
    OnePassSignature(OnePassSignature),
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    CompressedData(CompressedData),
    LiteralData(LiteralData),
    Marker(Marker),
    Trust(Trust),
    UserId(UserId),
    UserAttribute(UserAttribute),
    /// A packet with an unrecognized tag, or a recognized tag whose body
    /// did not parse. The raw body and original framing style are
    /// preserved so the material round trips.
    Opaque {
        tag: Tag,
        header_version: PacketHeaderVersion,
        body: Bytes,
    },
}

impl Packet {
    /// Turn a packet header and its buffered body into a typed packet.
    pub fn from_parts(
        header_version: PacketHeaderVersion,
        tag: Tag,
        body: Bytes,
    ) -> Result<Packet> {
        let parsed = match tag {
            Tag::PublicKey => PublicKey::from_buf(body.clone()).map(Packet::PublicKey),
            Tag::PublicSubkey => PublicKey::from_buf(body.clone()).map(Packet::PublicSubkey),
            Tag::SecretKey => SecretKey::from_buf(body.clone()).map(Packet::SecretKey),
            Tag::SecretSubkey => SecretKey::from_buf(body.clone()).map(Packet::SecretSubkey),
            Tag::Signature => match body.first() {
                Some(2) | Some(3) => SignatureV3::from_buf(body.clone()).map(Packet::SignatureV3),
                Some(4) => Signature::from_buf(body.clone()).map(Packet::Signature),
                Some(v) => Err(unsupported_error!("signature version {}", v)),
                None => Err(format_err!("empty signature packet")),
            },
            Tag::OnePassSignature => {
                OnePassSignature::from_buf(body.clone()).map(Packet::OnePassSignature)
            }
            Tag::PublicKeyEncryptedSessionKey => PublicKeyEncryptedSessionKey::from_buf(body.clone())
                .map(Packet::PublicKeyEncryptedSessionKey),
            Tag::SymKeyEncryptedSessionKey => SymKeyEncryptedSessionKey::from_buf(body.clone())
                .map(Packet::SymKeyEncryptedSessionKey),
            Tag::SymEncryptedData => {
                SymEncryptedData::from_buf(body.clone()).map(Packet::SymEncryptedData)
            }
            Tag::SymEncryptedProtectedData => SymEncryptedProtectedData::from_buf(body.clone())
                .map(Packet::SymEncryptedProtectedData),
            Tag::CompressedData => CompressedData::from_buf(body.clone()).map(Packet::CompressedData),
            Tag::LiteralData => LiteralData::from_buf(body.clone()).map(Packet::LiteralData),
            Tag::Marker => Marker::from_buf(body.clone()).map(Packet::Marker),
            Tag::Trust => Trust::from_buf(body.clone()).map(Packet::Trust),
            Tag::UserId => UserId::from_buf(body.clone()).map(Packet::UserId),
            Tag::UserAttribute => UserAttribute::from_buf(body.clone()).map(Packet::UserAttribute),
            _ => {
                debug!("unrecognized packet tag {:?}", tag);
                return Ok(Packet::Opaque {
                    tag,
                    header_version,
                    body,
                });
            }
        };

        match parsed {
            Ok(p) => Ok(p),
            // unsupported algorithms and versions surface to the caller
            Err(err) if err.is_unsupported() => Err(err),
            Err(err) => {
                // a malformed body behind a valid header stays available as
                // raw material, except where later stages depend on its
                // structure
                match tag {
                    Tag::Signature
                    | Tag::UserId
                    | Tag::UserAttribute
                    | Tag::Marker
                    | Tag::Trust => {
                        debug!("keeping malformed {:?} packet as opaque: {:?}", tag, err);
                        Ok(Packet::Opaque {
                            tag,
                            header_version,
                            body,
                        })
                    }
                    _ => Err(err),
                }
            }
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Packet::PublicKey(_) => Tag::PublicKey,
            Packet::PublicSubkey(_) => Tag::PublicSubkey,
            Packet::SecretKey(_) => Tag::SecretKey,
            Packet::SecretSubkey(_) => Tag::SecretSubkey,
            Packet::Signature(_) | Packet::SignatureV3(_) => Tag::Signature,
            Packet::OnePassSignature(_) => Tag::OnePassSignature,
            Packet::PublicKeyEncryptedSessionKey(_) => Tag::PublicKeyEncryptedSessionKey,
            Packet::SymKeyEncryptedSessionKey(_) => Tag::SymKeyEncryptedSessionKey,
            Packet::SymEncryptedData(_) => Tag::SymEncryptedData,
            Packet::SymEncryptedProtectedData(_) => Tag::SymEncryptedProtectedData,
            Packet::CompressedData(_) => Tag::CompressedData,
            Packet::LiteralData(_) => Tag::LiteralData,
            Packet::Marker(_) => Tag::Marker,
            Packet::Trust(_) => Tag::Trust,
            Packet::UserId(_) => Tag::UserId,
            Packet::UserAttribute(_) => Tag::UserAttribute,
            Packet::Opaque { tag, .. } => *tag,
        }
    }
}

/// Frame and write a packet body under a new format header.
pub fn write_packet<W: io::Write>(w: &mut W, tag: Tag, body: &impl Serialize) -> Result<()> {
    let body = body.to_bytes()?;
    write_new_header(w, tag, body.len())?;
    w.write_all(&body)?;
    Ok(())
}

impl Serialize for Packet {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Packet::PublicKey(p) => write_packet(w, Tag::PublicKey, p),
            Packet::PublicSubkey(p) => write_packet(w, Tag::PublicSubkey, p),
            Packet::SecretKey(p) => write_packet(w, Tag::SecretKey, p),
            Packet::SecretSubkey(p) => write_packet(w, Tag::SecretSubkey, p),
            Packet::Signature(p) => write_packet(w, Tag::Signature, p),
            Packet::SignatureV3(p) => write_packet(w, Tag::Signature, p),
            Packet::OnePassSignature(p) => write_packet(w, Tag::OnePassSignature, p),
            Packet::PublicKeyEncryptedSessionKey(p) => {
                write_packet(w, Tag::PublicKeyEncryptedSessionKey, p)
            }
            Packet::SymKeyEncryptedSessionKey(p) => {
                write_packet(w, Tag::SymKeyEncryptedSessionKey, p)
            }
            Packet::SymEncryptedData(p) => write_packet(w, Tag::SymEncryptedData, p),
            Packet::SymEncryptedProtectedData(p) => {
                write_packet(w, Tag::SymEncryptedProtectedData, p)
            }
            Packet::CompressedData(p) => write_packet(w, Tag::CompressedData, p),
            Packet::LiteralData(p) => write_packet(w, Tag::LiteralData, p),
            Packet::Marker(p) => write_packet(w, Tag::Marker, p),
            Packet::Trust(p) => write_packet(w, Tag::Trust, p),
            Packet::UserId(p) => write_packet(w, Tag::UserId, p),
            Packet::UserAttribute(p) => write_packet(w, Tag::UserAttribute, p),
            Packet::Opaque {
                tag,
                header_version,
                body,
            } => {
                // opaque packets keep their original framing
                match header_version {
                    PacketHeaderVersion::Old => write_old_header(w, *tag, body.len())?,
                    PacketHeaderVersion::New => write_new_header(w, *tag, body.len())?,
                }
                w.write_all(body)?;
                Ok(())
            }
        }
    }
}
