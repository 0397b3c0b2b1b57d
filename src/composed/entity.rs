use std::io::{self, Read};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::armor;
use crate::errors::{Error, Result};
use crate::packet::{
    write_packet, Packet, PacketReader, PublicKey, SecretKey, Signature, SignatureType, UserId,
};
use crate::types::{KeyId, RevocationKey, Tag};

/// A user id attached to a primary key, together with its certifications.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub user_id: UserId,
    /// The most recent valid self certification.
    pub self_signature: Option<Signature>,
    /// Third party certifications, retained unverified.
    pub signatures: Vec<Signature>,
    /// A verified certification revocation of this user id.
    pub revocation: Option<Signature>,
}

/// A subkey with a valid binding signature.
#[derive(Debug, Clone)]
pub struct Subkey {
    pub public_key: PublicKey,
    pub secret_key: Option<SecretKey>,
    /// The most recent valid binding signature.
    pub sig: Signature,
    /// A verified revocation of this binding.
    pub revocation: Option<Signature>,
}

/// A subkey that failed validation. The packets are preserved so callers
/// can inspect or reserialize them.
#[derive(Debug)]
pub struct BadSubkey {
    pub public_key: PublicKey,
    pub secret_key: Option<SecretKey>,
    pub signatures: Vec<Signature>,
    pub err: Error,
}

/// A primary key with its identities, subkeys and self signatures.
#[derive(Debug)]
pub struct Entity {
    pub primary_key: PublicKey,
    pub private_key: Option<SecretKey>,
    /// Unique by name, insertion ordered.
    pub identities: Vec<Identity>,
    pub subkeys: Vec<Subkey>,
    /// Verified key revocations made with the primary key.
    pub revocations: Vec<Signature>,
    /// Third party revocations by a designated revoker, pending
    /// verification against the revoker's key.
    pub unverified_revocations: Vec<Signature>,
    pub bad_subkeys: Vec<BadSubkey>,
    /// Designated revoker assertions from verified direct key signatures.
    pub designated_revokers: Vec<RevocationKey>,
    /// Verified direct key signatures, kept for reserialization.
    pub direct_signatures: Vec<Signature>,
}

impl Entity {
    pub fn primary_key_id(&self) -> Result<KeyId> {
        self.primary_key.key_id()
    }

    pub fn identity(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.name == name)
    }

    /// The best self-certified identity: a primary-flagged one wins,
    /// otherwise the first with a self signature.
    pub fn primary_identity(&self) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| {
                i.self_signature
                    .as_ref()
                    .map(|s| s.is_primary_user_id == Some(true))
                    .unwrap_or(false)
            })
            .or_else(|| self.identities.iter().find(|i| i.self_signature.is_some()))
    }

    /// Is the primary key revoked or expired at `now`?
    pub fn is_invalid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.revocations.is_empty() {
            return true;
        }
        if let Some(identity) = self.primary_identity() {
            if let Some(sig) = &identity.self_signature {
                if sig.key_expired_at(self.primary_key.created_at(), now) {
                    return true;
                }
            }
        }
        false
    }

    /// Select an encryption capable subkey (or the primary itself) valid
    /// at `now`, preferring the newest usable key.
    pub fn encryption_key(&self, now: DateTime<Utc>) -> Option<super::keyring::Key<'_>> {
        if self.is_invalid_at(now) {
            return None;
        }

        let mut best: Option<&Subkey> = None;
        for subkey in &self.subkeys {
            let flags = subkey.sig.key_flags.unwrap_or_default();
            if !(flags.encrypt_communications() || flags.encrypt_storage()) {
                continue;
            }
            if subkey.revocation.is_some() {
                continue;
            }
            if subkey.sig.key_expired_at(subkey.public_key.created_at(), now) {
                continue;
            }
            if !subkey.public_key.algorithm().can_encrypt() {
                continue;
            }
            match best {
                Some(b) if b.public_key.created_at() >= subkey.public_key.created_at() => {}
                _ => best = Some(subkey),
            }
        }

        if let Some(subkey) = best {
            return Some(super::keyring::Key {
                entity: self,
                public_key: &subkey.public_key,
                secret_key: subkey.secret_key.as_ref(),
                self_signature: Some(&subkey.sig),
                revoked: false,
            });
        }

        // fall back to the primary when its self signature allows it
        let identity = self.primary_identity()?;
        let sig = identity.self_signature.as_ref()?;
        let flags = sig.key_flags.unwrap_or_default();
        if (flags.encrypt_communications() || flags.encrypt_storage())
            && self.primary_key.algorithm().can_encrypt()
        {
            return Some(super::keyring::Key {
                entity: self,
                public_key: &self.primary_key,
                secret_key: self.private_key.as_ref(),
                self_signature: Some(sig),
                revoked: false,
            });
        }
        None
    }

    /// Select a signing capable key valid at `now`.
    pub fn signing_key(&self, now: DateTime<Utc>) -> Option<super::keyring::Key<'_>> {
        if self.is_invalid_at(now) {
            return None;
        }

        let mut best: Option<&Subkey> = None;
        for subkey in &self.subkeys {
            let flags = subkey.sig.key_flags.unwrap_or_default();
            if !flags.sign() {
                continue;
            }
            if subkey.revocation.is_some()
                || subkey.sig.key_expired_at(subkey.public_key.created_at(), now)
                || !subkey.public_key.algorithm().can_sign()
            {
                continue;
            }
            match best {
                Some(b) if b.public_key.created_at() >= subkey.public_key.created_at() => {}
                _ => best = Some(subkey),
            }
        }

        if let Some(subkey) = best {
            return Some(super::keyring::Key {
                entity: self,
                public_key: &subkey.public_key,
                secret_key: subkey.secret_key.as_ref(),
                self_signature: Some(&subkey.sig),
                revoked: false,
            });
        }

        let identity = self.primary_identity()?;
        let sig = identity.self_signature.as_ref()?;
        let flags = sig.key_flags.unwrap_or_default();
        // an absent key flags subpacket leaves the primary usable
        if (sig.key_flags.is_none() || flags.sign()) && self.primary_key.algorithm().can_sign() {
            return Some(super::keyring::Key {
                entity: self,
                public_key: &self.primary_key,
                secret_key: self.private_key.as_ref(),
                self_signature: Some(sig),
                revoked: false,
            });
        }
        None
    }

    /// Serialize the public portions in canonical order.
    pub fn serialize<W: io::Write>(&self, w: &mut W) -> Result<()> {
        write_packet(w, Tag::PublicKey, &self.primary_key)?;
        for sig in &self.revocations {
            write_packet(w, Tag::Signature, sig)?;
        }
        for sig in &self.direct_signatures {
            write_packet(w, Tag::Signature, sig)?;
        }
        for sig in &self.unverified_revocations {
            write_packet(w, Tag::Signature, sig)?;
        }
        for identity in &self.identities {
            write_packet(w, Tag::UserId, &identity.user_id)?;
            if let Some(sig) = &identity.revocation {
                write_packet(w, Tag::Signature, sig)?;
            }
            if let Some(sig) = &identity.self_signature {
                write_packet(w, Tag::Signature, sig)?;
            }
            for sig in &identity.signatures {
                write_packet(w, Tag::Signature, sig)?;
            }
        }
        for subkey in &self.subkeys {
            write_packet(w, Tag::PublicSubkey, &subkey.public_key)?;
            write_packet(w, Tag::Signature, &subkey.sig)?;
            if let Some(sig) = &subkey.revocation {
                write_packet(w, Tag::Signature, sig)?;
            }
        }

        Ok(())
    }

    /// Serialize including secret key packets.
    pub fn serialize_private<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match &self.private_key {
            Some(secret) => write_packet(w, Tag::SecretKey, secret)?,
            None => bail!("entity has no private key"),
        }
        for sig in &self.revocations {
            write_packet(w, Tag::Signature, sig)?;
        }
        for sig in &self.direct_signatures {
            write_packet(w, Tag::Signature, sig)?;
        }
        for identity in &self.identities {
            write_packet(w, Tag::UserId, &identity.user_id)?;
            if let Some(sig) = &identity.revocation {
                write_packet(w, Tag::Signature, sig)?;
            }
            if let Some(sig) = &identity.self_signature {
                write_packet(w, Tag::Signature, sig)?;
            }
            for sig in &identity.signatures {
                write_packet(w, Tag::Signature, sig)?;
            }
        }
        for subkey in &self.subkeys {
            match &subkey.secret_key {
                Some(secret) => write_packet(w, Tag::SecretSubkey, secret)?,
                None => write_packet(w, Tag::PublicSubkey, &subkey.public_key)?,
            }
            write_packet(w, Tag::Signature, &subkey.sig)?;
            if let Some(sig) = &subkey.revocation {
                write_packet(w, Tag::Signature, sig)?;
            }
        }

        Ok(())
    }
}

/// Read a sequence of entities from a binary packet stream.
///
/// An empty stream is an empty keyring. A broken entity is skipped up to
/// the next primary key; when nothing could be read at all, the last
/// error is surfaced.
pub fn read_keyring<R: Read>(source: R) -> Result<Vec<Entity>> {
    let mut packets = PacketReader::new(source);
    let mut entities = Vec::new();
    let mut last_error: Option<Error> = None;

    loop {
        match read_entity(&mut packets) {
            Ok(Some(entity)) => entities.push(entity),
            Ok(None) => break,
            Err(err) if err.is_structural() || err.is_unsupported() => {
                warn!("skipping broken entity: {:?}", err);
                last_error = Some(err);
                if !skip_to_next_primary(&mut packets)? {
                    break;
                }
            }
            Err(err) => return Err(err),
        }
    }

    if entities.is_empty() {
        if let Some(err) = last_error {
            return Err(err);
        }
    }

    Ok(entities)
}

/// Read a keyring out of an armored stream.
pub fn read_armored_keyring<R: Read>(source: R) -> Result<Vec<Entity>> {
    let block = armor::decode_expected(
        source,
        &[
            armor::BlockType::PublicKey,
            armor::BlockType::PrivateKey,
            armor::BlockType::File,
        ],
    )?;
    read_keyring(&block.body[..])
}

fn skip_to_next_primary<R: Read>(packets: &mut PacketReader<R>) -> Result<bool> {
    loop {
        match packets.next_packet() {
            Ok(Some(p @ Packet::PublicKey(_))) | Ok(Some(p @ Packet::SecretKey(_))) => {
                packets.unread(p);
                return Ok(true);
            }
            Ok(Some(_)) => continue,
            Ok(None) => return Ok(false),
            Err(err) if err.is_structural() || err.is_unsupported() => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Read one entity. `Ok(None)` at a clean end of stream.
pub fn read_entity<R: Read>(packets: &mut PacketReader<R>) -> Result<Option<Entity>> {
    let Some(first) = packets.next_packet()? else {
        return Ok(None);
    };

    let (primary_key, private_key) = match first {
        Packet::PublicKey(k) => (k, None),
        Packet::SecretKey(k) => (k.public_key().clone(), Some(k)),
        p => {
            debug!("unexpected leading packet {:?}", p.tag());
            bail!("first packet was not a public/private key");
        }
    };

    let mut entity = Entity {
        primary_key,
        private_key,
        identities: Vec::new(),
        subkeys: Vec::new(),
        revocations: Vec::new(),
        unverified_revocations: Vec::new(),
        bad_subkeys: Vec::new(),
        designated_revokers: Vec::new(),
        direct_signatures: Vec::new(),
    };
    let mut current_identity: Option<usize> = None;

    loop {
        let packet = match packets.next_packet() {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(err) if err.is_unsupported() => {
                warn!("skipping unsupported packet: {:?}", err);
                continue;
            }
            Err(err) => return Err(err),
        };

        match packet {
            p @ Packet::PublicKey(_) | p @ Packet::SecretKey(_) => {
                packets.unread(p);
                break;
            }
            Packet::UserId(uid) => {
                let name = uid.id().to_string();
                // names are unique; a repeated user id replaces the earlier one
                if let Some(pos) = entity.identities.iter().position(|i| i.name == name) {
                    entity.identities.remove(pos);
                }
                entity.identities.push(Identity {
                    name,
                    user_id: uid,
                    self_signature: None,
                    signatures: Vec::new(),
                    revocation: None,
                });
                current_identity = Some(entity.identities.len() - 1);
            }
            Packet::Signature(sig) => {
                attach_signature(&mut entity, current_identity, sig)?;
            }
            Packet::PublicSubkey(k) => {
                add_subkey(packets, &mut entity, k, None)?;
                current_identity = None;
            }
            Packet::SecretSubkey(k) => {
                let public = k.public_key().clone();
                add_subkey(packets, &mut entity, public, Some(k))?;
                current_identity = None;
            }
            Packet::Marker(_)
            | Packet::Trust(_)
            | Packet::UserAttribute(_)
            | Packet::SignatureV3(_)
            | Packet::Opaque { .. } => continue,
            p => {
                debug!("ignoring packet {:?} inside entity", p.tag());
                continue;
            }
        }
    }

    if entity.identities.is_empty() {
        bail!("entity without any identities");
    }

    Ok(Some(entity))
}

/// Attach a signature found between the primary key and the subkey
/// section: certifications, revocations and direct key signatures.
fn attach_signature(
    entity: &mut Entity,
    current_identity: Option<usize>,
    sig: Signature,
) -> Result<()> {
    let primary_id = entity.primary_key.key_id()?;
    let is_self = sig.issuer.map(|id| id == primary_id).unwrap_or(false);

    match sig.typ {
        t if t.is_certification() => {
            let Some(idx) = current_identity else {
                debug!("certification without a user id, dropping");
                return Ok(());
            };
            let identity = &mut entity.identities[idx];

            if is_self {
                match sig.verify_user_id(&entity.primary_key, &entity.primary_key, &identity.name) {
                    Ok(()) => {
                        // most recent wins; on equal times the later packet wins
                        let newer = match (&identity.self_signature, sig.created) {
                            (Some(current), created) => created >= current.created,
                            (None, _) => true,
                        };
                        if newer {
                            identity.self_signature = Some(sig);
                        }
                    }
                    Err(err) => {
                        warn!("dropping invalid self signature: {:?}", err);
                    }
                }
            } else {
                identity.signatures.push(sig);
            }
        }
        SignatureType::CertRevocation => {
            let Some(idx) = current_identity else {
                return Ok(());
            };
            let identity = &mut entity.identities[idx];
            if is_self {
                match sig.verify_user_id(&entity.primary_key, &entity.primary_key, &identity.name) {
                    Ok(()) => identity.revocation = Some(sig),
                    Err(err) => warn!("dropping invalid certification revocation: {:?}", err),
                }
            } else {
                identity.signatures.push(sig);
            }
        }
        SignatureType::KeyRevocation => {
            match sig.verify_key(&entity.primary_key, &entity.primary_key) {
                Ok(()) => entity.revocations.push(sig),
                Err(_) => {
                    // honored later if a designated revoker vouches for it
                    let matches_revoker = match sig.issuer {
                        Some(issuer) => entity.designated_revokers.iter().any(|rk| {
                            KeyId::from_slice(&rk.fingerprint[12..])
                                .map(|id| id == issuer)
                                .unwrap_or(false)
                        }),
                        None => false,
                    };
                    if matches_revoker {
                        entity.unverified_revocations.push(sig);
                    } else {
                        warn!("dropping unverifiable key revocation");
                    }
                }
            }
        }
        SignatureType::DirectKey => {
            match sig.verify_key(&entity.primary_key, &entity.primary_key) {
                Ok(()) => {
                    if let Some(revoker) = sig.revocation_key {
                        entity.designated_revokers.push(revoker);
                    }
                    entity.direct_signatures.push(sig);
                }
                Err(err) => warn!("dropping invalid direct key signature: {:?}", err),
            }
        }
        _ => {
            debug!("ignoring signature of type {:?}", sig.typ);
        }
    }

    Ok(())
}

/// Collect the signatures that follow a subkey packet and validate the
/// binding. Failures demote the subkey to `BadSubkeys` without failing
/// the entity.
fn add_subkey<R: Read>(
    packets: &mut PacketReader<R>,
    entity: &mut Entity,
    public_key: PublicKey,
    secret_key: Option<SecretKey>,
) -> Result<()> {
    let mut signatures: Vec<Signature> = Vec::new();
    loop {
        match packets.next_packet() {
            Ok(Some(Packet::Signature(sig))) => signatures.push(sig),
            Ok(Some(Packet::Trust(_))) | Ok(Some(Packet::Opaque { .. })) => continue,
            Ok(Some(p)) => {
                packets.unread(p);
                break;
            }
            Ok(None) => break,
            Err(err) if err.is_unsupported() => {
                warn!("skipping unsupported packet after subkey: {:?}", err);
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    let mut best: Option<Signature> = None;
    let mut revocation: Option<Signature> = None;
    let mut last_err: Option<Error> = None;

    for sig in &signatures {
        match sig.typ {
            SignatureType::SubkeyBinding => {
                match check_subkey_binding(entity, &public_key, sig) {
                    Ok(()) => {
                        let newer = match (&best, sig.created) {
                            (Some(current), created) => created >= current.created,
                            (None, _) => true,
                        };
                        if newer {
                            best = Some(sig.clone());
                        }
                    }
                    Err(err) => {
                        debug!("subkey binding rejected: {:?}", err);
                        last_err = Some(err);
                    }
                }
            }
            SignatureType::SubkeyRevocation => {
                match sig.verify_key_binding(&entity.primary_key, &entity.primary_key, &public_key)
                {
                    Ok(()) => revocation = Some(sig.clone()),
                    Err(err) => {
                        debug!("subkey revocation rejected: {:?}", err);
                    }
                }
            }
            _ => {
                debug!("ignoring signature {:?} after subkey", sig.typ);
            }
        }
    }

    match best {
        Some(sig) => entity.subkeys.push(Subkey {
            public_key,
            secret_key,
            sig,
            revocation,
        }),
        None => entity.bad_subkeys.push(BadSubkey {
            public_key,
            secret_key,
            signatures,
            err: last_err.unwrap_or_else(|| format_err!("subkey without a binding signature")),
        }),
    }

    Ok(())
}

fn check_subkey_binding(entity: &Entity, subkey: &PublicKey, sig: &Signature) -> Result<()> {
    sig.verify_key_binding(&entity.primary_key, &entity.primary_key, subkey)?;

    // a signing capable subkey must prove possession with an embedded
    // cross signature over (primary, subkey)
    let signing_capable = sig.key_flags.map(|f| f.sign()).unwrap_or(false);
    if signing_capable {
        let Some(embedded) = &sig.embedded_signature else {
            bail!("signing subkey is missing cross-signature");
        };
        ensure!(
            embedded.typ == SignatureType::KeyBinding,
            "signing subkey has an invalid cross-signature type"
        );
        embedded
            .verify_primary_key_binding(&entity.primary_key, subkey)
            .map_err(|_| format_err!("signing subkey has an invalid cross-signature"))?;
    }

    Ok(())
}

/// Try to verify the pending third party revocations of `entity` against
/// the keys in `keyring`. Returns the first (signature, key) pair that
/// verifies.
pub fn find_verified_designated_revoke<'a, 'e>(
    keyring: &'a [Entity],
    entity: &'e Entity,
) -> Option<(&'e Signature, super::keyring::Key<'a>)> {
    for sig in &entity.unverified_revocations {
        let issuer = sig.issuer?;
        for candidate in super::keyring::keys_by_id(keyring, issuer.as_u64()) {
            // the candidate must be one of the declared designated revokers
            let fingerprint = candidate.public_key.fingerprint().ok()?;
            let declared = entity
                .designated_revokers
                .iter()
                .any(|rk| rk.fingerprint[..] == fingerprint[..]);
            if !declared {
                continue;
            }
            if sig
                .verify_key(candidate.public_key, &entity.primary_key)
                .is_ok()
            {
                return Some((sig, candidate));
            }
        }
    }
    None
}
