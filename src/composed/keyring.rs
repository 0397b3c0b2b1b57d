use chrono::{DateTime, Utc};

use crate::composed::entity::Entity;
use crate::packet::{PublicKey, SecretKey, Signature};

/// One match out of a keyring lookup: a primary key or subkey, the entity
/// it belongs to and the self signature governing it.
#[derive(Debug, Clone)]
pub struct Key<'a> {
    pub entity: &'a Entity,
    pub public_key: &'a PublicKey,
    pub secret_key: Option<&'a SecretKey>,
    pub self_signature: Option<&'a Signature>,
    pub revoked: bool,
}

impl Key<'_> {
    /// Effective usage flags: the self signature's key flags, or the
    /// algorithm's natural capabilities when no flags were set.
    fn usage(&self) -> u8 {
        if let Some(flags) = self.self_signature.and_then(|s| s.key_flags) {
            return flags.0;
        }
        let alg = self.public_key.algorithm();
        let mut usage = 0;
        if alg.can_sign() {
            usage |= KEY_FLAG_CERTIFY | KEY_FLAG_SIGN;
        }
        if alg.can_encrypt() {
            usage |= KEY_FLAG_ENCRYPT_COMMUNICATIONS | KEY_FLAG_ENCRYPT_STORAGE;
        }
        usage
    }

    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.self_signature
            .map(|sig| sig.key_expired_at(self.public_key.created_at(), now))
            .unwrap_or(false)
    }
}

pub const KEY_FLAG_CERTIFY: u8 = 0x01;
pub const KEY_FLAG_SIGN: u8 = 0x02;
pub const KEY_FLAG_ENCRYPT_COMMUNICATIONS: u8 = 0x04;
pub const KEY_FLAG_ENCRYPT_STORAGE: u8 = 0x08;

fn entity_keys(entity: &Entity) -> Vec<Key<'_>> {
    let mut out = Vec::new();

    let primary_self_sig = entity
        .primary_identity()
        .and_then(|i| i.self_signature.as_ref());
    out.push(Key {
        entity,
        public_key: &entity.primary_key,
        secret_key: entity.private_key.as_ref(),
        self_signature: primary_self_sig,
        revoked: !entity.revocations.is_empty(),
    });

    for subkey in &entity.subkeys {
        out.push(Key {
            entity,
            public_key: &subkey.public_key,
            secret_key: subkey.secret_key.as_ref(),
            self_signature: Some(&subkey.sig),
            // a revoked primary poisons its subkeys too
            revoked: subkey.revocation.is_some() || !entity.revocations.is_empty(),
        });
    }

    out
}

/// All keys whose 64 bit key id matches `id`. Revoked keys are included;
/// callers inspecting revocations need them.
pub fn keys_by_id(entities: &[Entity], id: u64) -> Vec<Key<'_>> {
    let mut out = Vec::new();
    for entity in entities {
        for key in entity_keys(entity) {
            match key.public_key.key_id() {
                Ok(kid) if kid.as_u64() == id => out.push(key),
                _ => {}
            }
        }
    }
    out
}

/// Like [`keys_by_id`], filtered to keys that are not revoked, not
/// expired at `now`, and that carry every usage bit in `required_usage`.
pub fn keys_by_id_usage(
    entities: &[Entity],
    id: u64,
    required_usage: u8,
    now: DateTime<Utc>,
) -> Vec<Key<'_>> {
    keys_by_id(entities, id)
        .into_iter()
        .filter(|key| !key.revoked)
        .filter(|key| !key.expired_at(now))
        .filter(|key| key.usage() & required_usage == required_usage)
        .collect()
}

/// All keys with secret material that are authorized for decryption.
pub fn decryption_keys(entities: &[Entity]) -> Vec<Key<'_>> {
    let mut out = Vec::new();
    for entity in entities {
        for key in entity_keys(entity) {
            if key.secret_key.is_none() {
                continue;
            }
            if key.usage() & (KEY_FLAG_ENCRYPT_COMMUNICATIONS | KEY_FLAG_ENCRYPT_STORAGE) == 0 {
                continue;
            }
            out.push(key);
        }
    }
    out
}

/// An ordered collection of entities with indexed key lookups.
pub trait KeyRing {
    fn entities(&self) -> &[Entity];

    fn keys_by_id(&self, id: u64) -> Vec<Key<'_>> {
        keys_by_id(self.entities(), id)
    }

    fn keys_by_id_usage(&self, id: u64, required_usage: u8, now: DateTime<Utc>) -> Vec<Key<'_>> {
        keys_by_id_usage(self.entities(), id, required_usage, now)
    }

    fn decryption_keys(&self) -> Vec<Key<'_>> {
        decryption_keys(self.entities())
    }
}

impl KeyRing for [Entity] {
    fn entities(&self) -> &[Entity] {
        self
    }
}

impl KeyRing for Vec<Entity> {
    fn entities(&self) -> &[Entity] {
        self
    }
}
