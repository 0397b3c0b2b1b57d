use std::io::{self, Read};

use chrono::{DateTime, Utc};
use log::debug;
use num_bigint::traits::ModInverse;
use rand::{CryptoRng, Rng};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};

use crate::armor;
use crate::composed::config::Config;
use crate::composed::entity::{Entity, Identity, Subkey};
use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{checksum, sym::SymmetricKeyAlgorithm};
use crate::errors::Result;
use crate::packet::{
    hash_user_id, subpacket, write_packet, write_subpacket, CompressedData, LiteralData,
    OnePassSignature, PlainSecretParams, PublicKey, PublicKeyEncryptedSessionKey, PublicParams,
    SecretKey, Signature, SignatureType, SymEncryptedProtectedData, SymKeyEncryptedSessionKey,
    UserId,
};
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Mpi, StringToKey, Tag};

/// Extra hashed subpackets for a new signature.
#[derive(Default)]
struct SubpacketPlan {
    key_flags: Option<u8>,
    key_expires_seconds: Option<u32>,
    preferred_symmetric: Vec<u8>,
    preferred_hash: Vec<u8>,
    preferred_compression: Vec<u8>,
    primary_user_id: Option<bool>,
    embedded_signature: Option<Signature>,
}

/// Create a v4 signature with `signer`, hashing whatever `feed` pushes.
fn sign_v4<R: CryptoRng + Rng>(
    rng: &mut R,
    signer: &SecretKey,
    typ: SignatureType,
    hash_alg: HashAlgorithm,
    created: DateTime<Utc>,
    plan: SubpacketPlan,
    feed: impl FnOnce(&mut dyn Hasher),
) -> Result<Signature> {
    let mut hashed = Vec::new();
    write_subpacket(
        &mut hashed,
        subpacket::CREATION_TIME,
        &(created.timestamp() as u32).to_be_bytes(),
    );
    if let Some(flags) = plan.key_flags {
        write_subpacket(&mut hashed, subpacket::KEY_FLAGS, &[flags]);
    }
    if let Some(secs) = plan.key_expires_seconds {
        write_subpacket(&mut hashed, subpacket::KEY_EXPIRATION, &secs.to_be_bytes());
    }
    if !plan.preferred_symmetric.is_empty() {
        write_subpacket(&mut hashed, subpacket::PREF_SYMMETRIC, &plan.preferred_symmetric);
    }
    if !plan.preferred_hash.is_empty() {
        write_subpacket(&mut hashed, subpacket::PREF_HASH, &plan.preferred_hash);
    }
    if !plan.preferred_compression.is_empty() {
        write_subpacket(
            &mut hashed,
            subpacket::PREF_COMPRESSION,
            &plan.preferred_compression,
        );
    }
    if let Some(primary) = plan.primary_user_id {
        write_subpacket(&mut hashed, subpacket::PRIMARY_USER_ID, &[u8::from(primary)]);
    }
    if let Some(embedded) = &plan.embedded_signature {
        write_subpacket(&mut hashed, subpacket::EMBEDDED_SIGNATURE, &embedded.to_bytes()?);
    }

    let mut unhashed = Vec::new();
    write_subpacket(
        &mut unhashed,
        subpacket::ISSUER,
        signer.key_id()?.as_ref(),
    );

    let mut sig = Signature::from_parts(
        typ,
        signer.details().algorithm(),
        hash_alg,
        hashed,
        unhashed,
    )?;

    let mut hasher = sig.new_hasher()?;
    feed(hasher.as_mut());
    let digest = sig.finish_digest(hasher);

    sig.signed_hash_prefix = [digest[0], digest[1]];
    sig.sig = signer.create_signature(rng, hash_alg, &digest)?;

    Ok(sig)
}

/// Produce a binary detached signature over `message` with the signing
/// key of `entity`.
pub fn detach_sign<W: io::Write, R: Read>(
    w: &mut W,
    entity: &Entity,
    mut message: R,
    config: Option<&Config>,
) -> Result<()> {
    let now = Config::now(config);
    let key = entity
        .signing_key(now)
        .ok_or_else(|| format_err!("no valid signing key"))?;
    let signer = key
        .secret_key
        .ok_or_else(|| format_err!("signing key has no secret material"))?;

    let mut data = Vec::new();
    message.read_to_end(&mut data)?;

    let sig = sign_v4(
        &mut rand::thread_rng(),
        signer,
        SignatureType::Binary,
        Config::hash(config),
        now,
        SubpacketPlan::default(),
        |h| h.update(&data),
    )?;

    write_packet(w, Tag::Signature, &sig)
}

/// Like [`detach_sign`], wrapped in a `PGP SIGNATURE` armor block.
pub fn armored_detach_sign<W: io::Write, R: Read>(
    w: &mut W,
    entity: &Entity,
    message: R,
    config: Option<&Config>,
) -> Result<()> {
    let mut raw = Vec::new();
    detach_sign(&mut raw, entity, message, config)?;
    armor::encode(w, armor::BlockType::Signature, &[], &raw)
}

impl Entity {
    /// Certify one of this entity's user ids with `signer`'s primary key.
    /// The new signature lands in the identity's third party signatures.
    pub fn sign_identity(
        &mut self,
        name: &str,
        signer: &Entity,
        config: Option<&Config>,
    ) -> Result<()> {
        let secret = signer
            .private_key
            .as_ref()
            .ok_or_else(|| format_err!("signer has no private key"))?;

        let now = Config::now(config);
        let frame = self.primary_key.hashed_frame()?;
        let identity_pos = self
            .identities
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| format_err!("unknown identity {:?}", name))?;

        let sig = sign_v4(
            &mut rand::thread_rng(),
            secret,
            SignatureType::CertGeneric,
            Config::hash(config),
            now,
            SubpacketPlan::default(),
            |h| {
                h.update(&frame);
                hash_user_id(h, name);
            },
        )?;

        self.identities[identity_pos].signatures.push(sig);
        Ok(())
    }

    /// Generate a fresh RSA entity: certifying/signing primary plus an
    /// encryption subkey, both self signed.
    pub fn new_rsa<R: CryptoRng + Rng>(
        rng: &mut R,
        name: &str,
        comment: &str,
        email: &str,
        config: Option<&Config>,
    ) -> Result<Entity> {
        let now = Config::now(config);
        let bits = Config::rsa_bits(config);

        debug!("generating rsa entity with {} bit keys", bits);
        let primary_secret = generate_rsa_key(rng, bits, now)?;
        let subkey_secret = generate_rsa_key(rng, bits, now)?;

        let uid = format_user_id(name, comment, email);
        let primary_frame = primary_secret.details().hashed_frame()?;
        let subkey_frame = subkey_secret.details().hashed_frame()?;

        let self_sig = sign_v4(
            rng,
            &primary_secret,
            SignatureType::CertPositive,
            Config::hash(config),
            now,
            SubpacketPlan {
                key_flags: Some(0x03),
                preferred_symmetric: vec![u8::from(Config::cipher(config))],
                preferred_hash: vec![u8::from(Config::hash(config))],
                preferred_compression: vec![u8::from(CompressionAlgorithm::ZLIB)],
                primary_user_id: Some(true),
                ..Default::default()
            },
            |h| {
                h.update(&primary_frame);
                hash_user_id(h, &uid);
            },
        )?;

        let binding = sign_v4(
            rng,
            &primary_secret,
            SignatureType::SubkeyBinding,
            Config::hash(config),
            now,
            SubpacketPlan {
                key_flags: Some(0x0C),
                ..Default::default()
            },
            |h| {
                h.update(&primary_frame);
                h.update(&subkey_frame);
            },
        )?;

        let identity = Identity {
            name: uid.clone(),
            user_id: UserId::from_str(&uid),
            self_signature: Some(self_sig),
            signatures: Vec::new(),
            revocation: None,
        };

        Ok(Entity {
            primary_key: primary_secret.details().clone(),
            identities: vec![identity],
            subkeys: vec![Subkey {
                public_key: subkey_secret.details().clone(),
                secret_key: Some(subkey_secret),
                sig: binding,
                revocation: None,
            }],
            private_key: Some(primary_secret),
            revocations: Vec::new(),
            unverified_revocations: Vec::new(),
            bad_subkeys: Vec::new(),
            designated_revokers: Vec::new(),
            direct_signatures: Vec::new(),
        })
    }
}

fn format_user_id(name: &str, comment: &str, email: &str) -> String {
    match (comment.is_empty(), email.is_empty()) {
        (true, true) => name.to_string(),
        (true, false) => format!("{} <{}>", name, email),
        (false, true) => format!("{} ({})", name, comment),
        (false, false) => format!("{} ({}) <{}>", name, comment, email),
    }
}

fn generate_rsa_key<R: CryptoRng + Rng>(
    rng: &mut R,
    bits: usize,
    created: DateTime<Utc>,
) -> Result<SecretKey> {
    let key = rsa::RsaPrivateKey::new(rng, bits)?;

    let n = Mpi::from_slice(&key.n().to_bytes_be());
    let e = Mpi::from_slice(&key.e().to_bytes_be());
    let d = Mpi::from_slice(&key.d().to_bytes_be());
    let primes = key.primes();
    let p = &primes[0];
    let q = &primes[1];
    let u = p
        .clone()
        .mod_inverse(q)
        .and_then(|u| u.to_biguint())
        .ok_or_else(|| format_err!("invalid rsa primes"))?;

    let details = PublicKey::new(4, created, PublicKeyAlgorithm::RSA, PublicParams::Rsa { n, e });
    SecretKey::new_unprotected(
        details,
        PlainSecretParams::Rsa {
            d,
            p: Mpi::from_slice(&p.to_bytes_be()),
            q: Mpi::from_slice(&q.to_bytes_be()),
            u: Mpi::from_slice(&u.to_bytes_be()),
        },
    )
}

/// Session key payload: `algorithm ‖ key ‖ checksum`.
fn session_key_payload(alg: SymmetricKeyAlgorithm, key: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(key.len() + 3);
    payload.push(u8::from(alg));
    payload.extend_from_slice(key);
    let sum = checksum::simple(key);
    payload.extend_from_slice(&sum.to_be_bytes());
    payload
}

/// Build the inner (to be encrypted) message: optionally one pass signed,
/// optionally compressed.
fn build_inner_message<R: CryptoRng + Rng>(
    rng: &mut R,
    plaintext: &[u8],
    file_name: &str,
    signer: Option<&Entity>,
    config: Option<&Config>,
) -> Result<Vec<u8>> {
    let now = Config::now(config);
    let literal = LiteralData::new_binary(file_name, now.timestamp() as u32, plaintext.to_vec());

    let mut inner = Vec::new();
    match signer {
        Some(entity) => {
            let key = entity
                .signing_key(now)
                .ok_or_else(|| format_err!("no valid signing key"))?;
            let secret = key
                .secret_key
                .ok_or_else(|| format_err!("signing key has no secret material"))?;

            let ops = OnePassSignature::new(
                SignatureType::Binary,
                Config::hash(config),
                secret.details().algorithm(),
                secret.key_id()?,
            );
            write_packet(&mut inner, Tag::OnePassSignature, &ops)?;
            write_packet(&mut inner, Tag::LiteralData, &literal)?;

            let sig = sign_v4(
                rng,
                secret,
                SignatureType::Binary,
                Config::hash(config),
                now,
                SubpacketPlan::default(),
                |h| h.update(plaintext),
            )?;
            write_packet(&mut inner, Tag::Signature, &sig)?;
        }
        None => {
            write_packet(&mut inner, Tag::LiteralData, &literal)?;
        }
    }

    match Config::compression(config) {
        CompressionAlgorithm::Uncompressed => Ok(inner),
        alg => {
            let compressed = CompressedData::compress(alg, &inner)?;
            let mut out = Vec::new();
            write_packet(&mut out, Tag::CompressedData, &compressed)?;
            Ok(out)
        }
    }
}

/// Encrypt `plaintext` to the given recipients, optionally signing it
/// first, and write the complete message to `w`.
pub fn encrypt<W: io::Write, R: CryptoRng + Rng>(
    rng: &mut R,
    w: &mut W,
    to: &[&Entity],
    signer: Option<&Entity>,
    plaintext: &[u8],
    config: Option<&Config>,
) -> Result<()> {
    ensure!(!to.is_empty(), "no message recipients");
    let now = Config::now(config);
    let cipher = Config::cipher(config);

    let mut session_key = vec![0u8; cipher.key_size()];
    rng.fill_bytes(&mut session_key);
    let payload = session_key_payload(cipher, &session_key);

    for entity in to {
        let key = entity
            .encryption_key(now)
            .ok_or_else(|| format_err!("no valid encryption key for recipient"))?;
        let esk = PublicKeyEncryptedSessionKey {
            key_id: key.public_key.key_id()?,
            algorithm: key.public_key.algorithm(),
            values: key.public_key.encrypt_session_key(rng, &payload)?,
        };
        write_packet(w, Tag::PublicKeyEncryptedSessionKey, &esk)?;
    }

    let inner = build_inner_message(rng, plaintext, "", signer, config)?;
    let edata = SymEncryptedProtectedData::encrypt(rng, cipher, &session_key, &inner)?;
    write_packet(w, Tag::SymEncryptedProtectedData, &edata)?;

    Ok(())
}

/// Encrypt `plaintext` under a passphrase and write the complete message
/// to `w`.
pub fn symmetrically_encrypt<W: io::Write, R: CryptoRng + Rng>(
    rng: &mut R,
    w: &mut W,
    passphrase: &[u8],
    plaintext: &[u8],
    config: Option<&Config>,
) -> Result<()> {
    let cipher = Config::cipher(config);
    let s2k = StringToKey::new_iterated(rng, Config::hash(config), 224);
    let session_key = s2k.derive_key(passphrase, cipher.key_size())?;

    let esk = SymKeyEncryptedSessionKey {
        cipher,
        s2k,
        encrypted_key: None,
    };
    write_packet(w, Tag::SymKeyEncryptedSessionKey, &esk)?;

    let inner = build_inner_message(rng, plaintext, "", None, config)?;
    let edata = SymEncryptedProtectedData::encrypt(rng, cipher, &session_key, &inner)?;
    write_packet(w, Tag::SymEncryptedProtectedData, &edata)?;

    Ok(())
}
