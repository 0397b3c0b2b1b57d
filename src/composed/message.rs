use std::io::{self, Read};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::composed::config::Config;
use crate::composed::entity::Entity;
use crate::composed::keyring::{self, Key, KEY_FLAG_SIGN};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{
    Packet, PacketReader, PublicKeyEncryptedSessionKey, Signature, SignatureV3,
    SymKeyEncryptedSessionKey,
};
use crate::types::KeyId;

/// The prompt callback used to obtain key material mid-decryption.
///
/// Called with the candidate encryption keys and whether a passphrase for
/// symmetric decryption is wanted. `Ok(Some(bytes))` supplies a
/// passphrase, `Ok(None)` means "state was changed in place (a key was
/// unlocked), try again", and an error aborts the read.
pub type PromptFunction<'a> = Box<dyn FnMut(&[Key<'_>], bool) -> Result<Option<Vec<u8>>> + 'a>;

/// Metadata of the literal data packet carrying the message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralMeta {
    pub file_name: String,
    pub is_binary: bool,
    /// Creation or modification time of the file, seconds since the epoch.
    pub time: u32,
}

#[derive(Debug)]
enum TrailingSig {
    V4(Signature),
    V3(SignatureV3),
}

/// The result of opening a message.
///
/// `MessageDetails` is itself the `UnverifiedBody` stream: read it to the
/// end, then inspect `signature` / `signature_v3` / `signature_error`.
/// The signature fields stay unset until the body has been fully drained;
/// verification is deferred because the trailing signature covers every
/// body byte.
#[derive(Debug)]
pub struct MessageDetails<'a> {
    /// True when the message was wrapped in an encryption container.
    pub is_encrypted: bool,
    /// Key ids of the session keys the message was encrypted to.
    pub encrypted_to_key_ids: Vec<KeyId>,
    /// True when the message was decrypted with a passphrase.
    pub is_symmetrically_encrypted: bool,
    /// True when a one pass signature announced a signer.
    pub is_signed: bool,
    pub signed_by_key_id: Option<KeyId>,
    /// The signing key, once resolved through the keyring.
    pub signed_by: Option<Key<'a>>,
    /// Multiple signers were declared.
    pub multi_sig: bool,
    pub literal_data: LiteralMeta,

    /// The verified signature; only populated after the body hit EOF.
    pub signature: Option<Signature>,
    pub signature_v3: Option<SignatureV3>,
    /// The verification failure, if any, also populated at EOF.
    pub signature_error: Option<Error>,

    keyring: &'a [Entity],
    body: Bytes,
    position: usize,
    trailing: Vec<TrailingSig>,
    finalized: bool,
    now: DateTime<Utc>,
}

impl Read for MessageDetails<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.body[self.position..];
        if remaining.is_empty() {
            if !self.finalized {
                self.finalized = true;
                self.finalize_verification();
            }
            return Ok(0);
        }

        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl MessageDetails<'_> {
    /// Hash the full body under `sig`'s hash algorithm and trailer, and
    /// verify against the keyring.
    fn verify_one(&self, sig: &TrailingSig) -> (Option<KeyId>, Result<()>) {
        match sig {
            TrailingSig::V4(sig) => {
                let issuer = sig.issuer;
                let Some(issuer) = issuer else {
                    return (None, Err(Error::unknown_issuer()));
                };
                let keys =
                    keyring::keys_by_id_usage(self.keyring, issuer.as_u64(), KEY_FLAG_SIGN, self.now);
                if keys.is_empty() {
                    return (Some(issuer), Err(Error::unknown_issuer()));
                }
                if sig.is_expired_at(self.now) {
                    return (Some(issuer), Err(Error::signature_expired()));
                }
                let result = (|| -> Result<()> {
                    let mut h = sig.new_hasher()?;
                    h.update(&self.body);
                    let digest = sig.finish_digest(h);
                    let mut last = Error::unknown_issuer();
                    for key in &keys {
                        match sig.verify_digest(key.public_key, &digest) {
                            Ok(()) => return Ok(()),
                            Err(err) => last = err,
                        }
                    }
                    Err(last)
                })();
                (Some(issuer), result)
            }
            TrailingSig::V3(sig) => {
                let issuer = sig.issuer;
                let keys =
                    keyring::keys_by_id_usage(self.keyring, issuer.as_u64(), KEY_FLAG_SIGN, self.now);
                if keys.is_empty() {
                    return (Some(issuer), Err(Error::unknown_issuer()));
                }
                let result = (|| -> Result<()> {
                    let mut h = sig.new_hasher()?;
                    h.update(&self.body);
                    let digest = sig.finish_digest(h);
                    let mut last = Error::unknown_issuer();
                    for key in &keys {
                        match sig.verify_digest(key.public_key, &digest) {
                            Ok(()) => return Ok(()),
                            Err(err) => last = err,
                        }
                    }
                    Err(last)
                })();
                (Some(issuer), result)
            }
        }
    }

    fn finalize_verification(&mut self) {
        if self.trailing.is_empty() {
            if self.is_signed {
                self.signature_error = Some(Error::unknown_issuer());
            }
            return;
        }

        let mut last_error: Option<Error> = None;
        let trailing = std::mem::take(&mut self.trailing);
        for sig in trailing {
            let (issuer, result) = self.verify_one(&sig);
            match result {
                Ok(()) => {
                    if let Some(issuer) = issuer {
                        self.signed_by_key_id = Some(issuer);
                        self.signed_by = keyring::keys_by_id(self.keyring, issuer.as_u64())
                            .into_iter()
                            .next();
                    }
                    match sig {
                        TrailingSig::V4(sig) => self.signature = Some(sig),
                        TrailingSig::V3(sig) => self.signature_v3 = Some(sig),
                    }
                    self.signature_error = None;
                    return;
                }
                Err(err) => {
                    debug!("signature did not verify: {:?}", err);
                    last_error = Some(err);
                }
            }
        }

        self.signature_error = last_error;
    }
}

struct SessionKeys {
    pkesks: Vec<PublicKeyEncryptedSessionKey>,
    skesks: Vec<SymKeyEncryptedSessionKey>,
}

/// Open a message: walk the ESK sequence and the nested containers down
/// to the literal data.
///
/// `prompt` is consulted when no usable session key is available, see
/// [`PromptFunction`]. Decryption failures of every candidate end in
/// `KeyIncorrect`.
pub fn read_message<'a, R: Read>(
    source: R,
    keyring: &'a [Entity],
    mut prompt: Option<PromptFunction<'_>>,
    config: Option<&Config>,
) -> Result<MessageDetails<'a>> {
    let now = Config::now(config);
    let mut packets = PacketReader::new(source);

    let mut esks = SessionKeys {
        pkesks: Vec::new(),
        skesks: Vec::new(),
    };
    let mut is_encrypted = false;
    let mut is_symmetrically_encrypted = false;
    let mut encrypted_to_key_ids: Vec<KeyId> = Vec::new();
    let mut one_pass_count = 0usize;
    let mut signed_by_key_id: Option<KeyId> = None;
    let mut signed_by: Option<Key<'a>> = None;
    let mut trailing: Vec<TrailingSig> = Vec::new();

    let literal = loop {
        let packet = match packets.next_packet()? {
            Some(p) => p,
            None => bail!("premature end of message"),
        };

        match packet {
            Packet::PublicKeyEncryptedSessionKey(esk) => {
                encrypted_to_key_ids.push(esk.key_id);
                esks.pkesks.push(esk);
            }
            Packet::SymKeyEncryptedSessionKey(esk) => {
                esks.skesks.push(esk);
            }
            Packet::SymEncryptedData(edata) => {
                let plaintext = decrypt_edata(
                    &esks,
                    keyring,
                    prompt.as_mut(),
                    &|alg, key| edata.decrypt(alg, key),
                )?;
                is_encrypted = true;
                is_symmetrically_encrypted = esks.pkesks.is_empty();
                packets.push_layer(plaintext)?;
            }
            Packet::SymEncryptedProtectedData(edata) => {
                let plaintext = decrypt_edata(
                    &esks,
                    keyring,
                    prompt.as_mut(),
                    &|alg, key| edata.decrypt(alg, key),
                )?;
                is_encrypted = true;
                is_symmetrically_encrypted = esks.pkesks.is_empty();
                packets.push_layer(plaintext)?;
            }
            Packet::CompressedData(compressed) => {
                packets.push_layer(compressed.decompress()?)?;
            }
            Packet::OnePassSignature(ops) => {
                one_pass_count += 1;
                if signed_by_key_id.is_none() || signed_by.is_none() {
                    signed_by_key_id = Some(ops.key_id);
                    signed_by = keyring::keys_by_id_usage(
                        keyring,
                        ops.key_id.as_u64(),
                        KEY_FLAG_SIGN,
                        now,
                    )
                    .into_iter()
                    .next();
                }
            }
            Packet::LiteralData(literal) => break literal,
            Packet::Marker(_) | Packet::Trust(_) | Packet::Opaque { .. } => continue,
            p => {
                bail!("unexpected packet {:?} in message", p.tag());
            }
        }
    };

    // everything after the literal body: the trailing signatures of the
    // one pass construction
    loop {
        match packets.next_packet() {
            Ok(Some(Packet::Signature(sig))) => trailing.push(TrailingSig::V4(sig)),
            Ok(Some(Packet::SignatureV3(sig))) => trailing.push(TrailingSig::V3(sig)),
            Ok(Some(p)) => {
                debug!("ignoring trailing packet {:?}", p.tag());
            }
            Ok(None) => break,
            Err(err) if err.is_unsupported() => {
                warn!("skipping unsupported trailing packet: {:?}", err);
            }
            Err(err) => return Err(err),
        }
    }

    let is_signed = one_pass_count > 0 || !trailing.is_empty();
    let multi_sig = one_pass_count > 1 || trailing.len() > 1;

    Ok(MessageDetails {
        is_encrypted,
        encrypted_to_key_ids,
        is_symmetrically_encrypted,
        is_signed,
        signed_by_key_id,
        signed_by,
        multi_sig,
        literal_data: LiteralMeta {
            file_name: literal.file_name().to_string(),
            is_binary: literal.format().is_binary(),
            time: literal.time(),
        },
        signature: None,
        signature_v3: None,
        signature_error: None,
        keyring,
        body: literal.into_data(),
        position: 0,
        trailing,
        finalized: false,
        now,
    })
}

/// Try every session key against the encrypted container, prompting for
/// passphrases or key unlocks as needed.
fn decrypt_edata(
    esks: &SessionKeys,
    keyring: &[Entity],
    mut prompt: Option<&mut PromptFunction<'_>>,
    decrypt: &dyn Fn(SymmetricKeyAlgorithm, &[u8]) -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    // candidate secret keys for the declared recipients
    let mut candidates: Vec<Key<'_>> = Vec::new();
    for esk in &esks.pkesks {
        if esk.is_wildcard() {
            candidates.extend(keyring::decryption_keys(keyring));
        } else {
            candidates.extend(
                keyring::keys_by_id(keyring, esk.key_id.as_u64())
                    .into_iter()
                    .filter(|k| k.secret_key.is_some()),
            );
        }
    }

    loop {
        // pass 1: every unlocked private key against its session keys
        for esk in &esks.pkesks {
            for key in &candidates {
                let Some(secret) = key.secret_key else { continue };
                if secret.is_encrypted() {
                    continue;
                }
                let matches = esk.is_wildcard()
                    || secret
                        .key_id()
                        .map(|id| id == esk.key_id)
                        .unwrap_or(false);
                if !matches {
                    continue;
                }

                match secret.decrypt_session_key(&esk.values) {
                    Ok((alg, session_key)) => match decrypt(alg, &session_key) {
                        Ok(plaintext) => return Ok(plaintext),
                        Err(err) if err.is_mdc_mismatch() => {
                            // a session key that decrypts but fails the
                            // integrity check means tampering, not a key
                            // mismatch: stop here
                            return Err(Error::key_incorrect());
                        }
                        Err(err) if err.is_key_incorrect() => {
                            debug!("session key did not fit, trying next");
                        }
                        Err(err) => return Err(err),
                    },
                    Err(err) => {
                        debug!("failed to decrypt session key: {:?}", err);
                    }
                }
            }
        }

        // pass 2: ask the caller
        let Some(cb) = prompt.as_mut() else {
            return Err(Error::key_incorrect());
        };
        if candidates.is_empty() && esks.skesks.is_empty() {
            return Err(Error::key_incorrect());
        }

        let symmetric = !esks.skesks.is_empty();
        match cb(&candidates, symmetric)? {
            Some(passphrase) => {
                for esk in &esks.skesks {
                    let (alg, session_key) = match esk.decrypt(&passphrase) {
                        Ok(v) => v,
                        Err(err) => {
                            debug!("passphrase did not derive a session key: {:?}", err);
                            continue;
                        }
                    };
                    match decrypt(alg, &session_key) {
                        Ok(plaintext) => return Ok(plaintext),
                        Err(err) if err.is_mdc_mismatch() => {
                            return Err(Error::key_incorrect());
                        }
                        Err(err) if err.is_key_incorrect() => {
                            debug!("derived session key did not fit");
                        }
                        Err(err) => return Err(err),
                    }
                }
                // wrong passphrase: ask again
            }
            None => {
                // the callback unlocked a key in place, retry the pkesks
            }
        }
    }
}

/// Check a detached signature over `signed`. Returns the signing entity.
///
/// Every signature packet in `signature` is considered; the cleartext is
/// hashed once per declared hash algorithm. Signatures with unknown hash
/// ids are skipped while alternatives remain.
pub fn check_detached_signature<'a, R: Read, S: Read>(
    keyring: &'a [Entity],
    mut signed: S,
    signature: R,
) -> Result<&'a Entity> {
    check_detached_signature_at(keyring, &mut signed, signature, Utc::now())
}

pub fn check_detached_signature_at<'a, R: Read, S: Read>(
    keyring: &'a [Entity],
    signed: &mut S,
    signature: R,
    now: DateTime<Utc>,
) -> Result<&'a Entity> {
    let mut packets = PacketReader::new(signature);
    let mut sigs: Vec<TrailingSig> = Vec::new();
    let mut unsupported: Option<Error> = None;

    loop {
        match packets.next_packet() {
            Ok(Some(Packet::Signature(sig))) => sigs.push(TrailingSig::V4(sig)),
            Ok(Some(Packet::SignatureV3(sig))) => sigs.push(TrailingSig::V3(sig)),
            Ok(Some(Packet::Opaque { .. })) => continue,
            Ok(Some(p)) => bail!("non signature packet {:?} found", p.tag()),
            Ok(None) => break,
            Err(err) if err.is_unsupported() => {
                unsupported = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    // build one hasher per signature, so the cleartext is read only once
    let mut hashers = Vec::with_capacity(sigs.len());
    for sig in &sigs {
        let (hash_alg, hasher) = match sig {
            TrailingSig::V4(sig) => (sig.hash_alg, sig.new_hasher()),
            TrailingSig::V3(sig) => (sig.hash_alg, sig.new_hasher()),
        };
        match hash_alg {
            HashAlgorithm::Other(v) => {
                unsupported = Some(unsupported_error!("hash function {}", v));
                hashers.push(None);
            }
            _ => hashers.push(Some(hasher?)),
        }
    }

    let mut buf = [0u8; 4096];
    loop {
        let n = signed.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for hasher in hashers.iter_mut().flatten() {
            hasher.update(&buf[..n]);
        }
    }

    let mut last_error: Option<Error> = None;
    for (sig, hasher) in sigs.into_iter().zip(hashers.into_iter()) {
        let Some(hasher) = hasher else { continue };

        let (issuer, digest): (Option<KeyId>, Vec<u8>) = match &sig {
            TrailingSig::V4(s) => (s.issuer, s.finish_digest(hasher)),
            TrailingSig::V3(s) => (Some(s.issuer), s.finish_digest(hasher)),
        };
        let Some(issuer) = issuer else {
            last_error = Some(format_err!("signature without an issuer"));
            continue;
        };

        let keys = keyring::keys_by_id_usage(keyring, issuer.as_u64(), KEY_FLAG_SIGN, now);
        if keys.is_empty() {
            continue;
        }

        for key in keys {
            let result = match &sig {
                TrailingSig::V4(s) => s.verify_digest(key.public_key, &digest),
                TrailingSig::V3(s) => s.verify_digest(key.public_key, &digest),
            };
            match result {
                Ok(()) => return Ok(key.entity),
                Err(err) => last_error = Some(err),
            }
        }
    }

    if let Some(err) = last_error {
        return Err(err);
    }
    if let Some(err) = unsupported {
        return Err(err);
    }
    Err(Error::unknown_issuer())
}
