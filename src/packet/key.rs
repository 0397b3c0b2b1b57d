use std::cell::RefCell;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, Utc};
use log::debug;
use md5::Md5;
use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::{checksum, dsa, ecdh, ecdsa, eddsa, elgamal, rsa};
use crate::errors::{Error, Result};
use crate::packet::public_key_encrypted_session_key::EskValues;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Mpi, StringToKey};

/// The public parameters of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    Rsa {
        n: Mpi,
        e: Mpi,
    },
    Dsa {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Ecdsa {
        curve: EccCurve,
        point: Bytes,
    },
    EdDsa {
        curve: EccCurve,
        point: Bytes,
    },
    Ecdh {
        curve: EccCurve,
        point: Bytes,
        kdf_hash: HashAlgorithm,
        kdf_cipher: SymmetricKeyAlgorithm,
    },
}

fn parse_ecc_point<B: Buf>(i: &mut B) -> Result<(EccCurve, Bytes)> {
    let oid_len = i.read_u8()?;
    let oid = i.read_take(usize::from(oid_len))?;
    let curve = EccCurve::try_from_oid(&oid)
        .ok_or_else(|| unsupported_error!("public key curve oid {}", hex::encode(&oid)))?;
    let point = Mpi::from_buf(&mut *i)?;
    Ok((curve, Bytes::copy_from_slice(point.as_ref())))
}

impl PublicParams {
    fn from_buf<B: Buf>(algorithm: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        match algorithm {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => Ok(PublicParams::Rsa {
                n: Mpi::from_buf(&mut *i)?,
                e: Mpi::from_buf(&mut *i)?,
            }),
            PublicKeyAlgorithm::DSA => Ok(PublicParams::Dsa {
                p: Mpi::from_buf(&mut *i)?,
                q: Mpi::from_buf(&mut *i)?,
                g: Mpi::from_buf(&mut *i)?,
                y: Mpi::from_buf(&mut *i)?,
            }),
            PublicKeyAlgorithm::ElGamal => Ok(PublicParams::Elgamal {
                p: Mpi::from_buf(&mut *i)?,
                g: Mpi::from_buf(&mut *i)?,
                y: Mpi::from_buf(&mut *i)?,
            }),
            PublicKeyAlgorithm::ECDSA => {
                let (curve, point) = parse_ecc_point(i)?;
                Ok(PublicParams::Ecdsa { curve, point })
            }
            PublicKeyAlgorithm::EdDSA => {
                let (curve, point) = parse_ecc_point(i)?;
                Ok(PublicParams::EdDsa { curve, point })
            }
            PublicKeyAlgorithm::ECDH => {
                let (curve, point) = parse_ecc_point(i)?;
                let kdf_len = i.read_u8()?;
                ensure!(kdf_len >= 3, "invalid ecdh kdf parameters");
                let kdf = i.read_take(usize::from(kdf_len))?;
                ensure_eq!(kdf[0], 1, "invalid ecdh kdf version");
                Ok(PublicParams::Ecdh {
                    curve,
                    point,
                    kdf_hash: HashAlgorithm::from(kdf[1]),
                    kdf_cipher: SymmetricKeyAlgorithm::from(kdf[2]),
                })
            }
            _ => unsupported_err!("public key algorithm {}", u8::from(algorithm)),
        }
    }
}

fn write_ecc_point<W: io::Write>(w: &mut W, curve: EccCurve, point: &[u8]) -> Result<()> {
    w.write_all(&[curve.oid().len() as u8])?;
    w.write_all(curve.oid())?;
    Mpi::from_slice(point).to_writer(w)?;
    Ok(())
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match self {
            PublicParams::Rsa { n, e } => {
                n.to_writer(w)?;
                e.to_writer(w)?;
            }
            PublicParams::Dsa { p, q, g, y } => {
                p.to_writer(w)?;
                q.to_writer(w)?;
                g.to_writer(w)?;
                y.to_writer(w)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(w)?;
                g.to_writer(w)?;
                y.to_writer(w)?;
            }
            PublicParams::Ecdsa { curve, point } | PublicParams::EdDsa { curve, point } => {
                write_ecc_point(w, *curve, point)?;
            }
            PublicParams::Ecdh {
                curve,
                point,
                kdf_hash,
                kdf_cipher,
            } => {
                write_ecc_point(w, *curve, point)?;
                w.write_all(&[3, 1, u8::from(*kdf_hash), u8::from(*kdf_cipher)])?;
            }
        }
        Ok(())
    }
}

/// Public Key packet (tags 6 and 14; the role is decided by the tag and
/// the surrounding packet sequence, not by the body).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.2>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    version: u8,
    created_at: DateTime<Utc>,
    /// v3 only: validity period in days.
    expiration_days: Option<u16>,
    algorithm: PublicKeyAlgorithm,
    params: PublicParams,
}

impl PublicKey {
    /// Parse the public portion of a key packet, consuming exactly the
    /// bytes that belong to it.
    pub fn parse<B: Buf>(i: &mut B) -> Result<Self> {
        let version = i.read_u8()?;
        match version {
            4 => {
                let created = i.read_be_u32()?;
                let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
                let params = PublicParams::from_buf(algorithm, i)?;
                Ok(PublicKey {
                    version,
                    created_at: timestamp(created)?,
                    expiration_days: None,
                    algorithm,
                    params,
                })
            }
            2 | 3 => {
                let created = i.read_be_u32()?;
                let expiration_days = i.read_be_u16()?;
                let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
                ensure!(
                    matches!(
                        algorithm,
                        PublicKeyAlgorithm::RSA
                            | PublicKeyAlgorithm::RSAEncrypt
                            | PublicKeyAlgorithm::RSASign
                    ),
                    "v3 keys are RSA only"
                );
                let params = PublicParams::from_buf(algorithm, i)?;
                Ok(PublicKey {
                    version,
                    created_at: timestamp(created)?,
                    expiration_days: Some(expiration_days),
                    algorithm,
                    params,
                })
            }
            v => unsupported_err!("public key version {}", v),
        }
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let key = Self::parse(&mut i)?;
        // tail bytes of the packet body are discarded
        Ok(key)
    }

    pub fn new(
        version: u8,
        created_at: DateTime<Utc>,
        algorithm: PublicKeyAlgorithm,
        params: PublicParams,
    ) -> Self {
        PublicKey {
            version,
            created_at,
            expiration_days: None,
            algorithm,
            params,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn params(&self) -> &PublicParams {
        &self.params
    }

    /// The key fingerprint: SHA-1 over the framed body for v4, MD5 over
    /// the raw RSA material for v3.
    pub fn fingerprint(&self) -> Result<Vec<u8>> {
        match self.version {
            4 => {
                let frame = self.hashed_frame()?;
                Ok(Sha1::digest(&frame).to_vec())
            }
            2 | 3 => {
                let PublicParams::Rsa { ref n, ref e } = self.params else {
                    bail!("v3 keys are RSA only");
                };
                let mut h = Md5::new();
                h.update(n.as_ref());
                h.update(e.as_ref());
                Ok(h.finalize().to_vec())
            }
            v => unsupported_err!("public key version {}", v),
        }
    }

    /// The key id: low 64 bits of the fingerprint for v4, low 64 bits of
    /// the RSA modulus for v3.
    pub fn key_id(&self) -> Result<KeyId> {
        match self.version {
            4 => {
                let fp = self.fingerprint()?;
                KeyId::from_slice(&fp[fp.len() - 8..])
            }
            2 | 3 => {
                let PublicParams::Rsa { ref n, .. } = self.params else {
                    bail!("v3 keys are RSA only");
                };
                let n = n.as_ref();
                ensure!(n.len() >= 8, "rsa modulus too short");
                KeyId::from_slice(&n[n.len() - 8..])
            }
            v => unsupported_err!("public key version {}", v),
        }
    }

    /// The `0x99 ‖ len2 ‖ body` framing used in signature preimages and
    /// v4 fingerprints.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-5.2.4>
    pub fn hashed_frame(&self) -> Result<Vec<u8>> {
        let body = self.to_bytes()?;
        let mut out = Vec::with_capacity(3 + body.len());
        out.push(0x99);
        out.write_u16::<BigEndian>(body.len() as u16)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Verify `sig` over `digest` with this key.
    pub fn verify_digest(&self, hash: HashAlgorithm, digest: &[u8], sig: &[Mpi]) -> Result<()> {
        match &self.params {
            PublicParams::Rsa { n, e } => {
                ensure!(sig.len() == 1, "malformed rsa signature");
                rsa::verify(n, e, hash, digest, &sig[0])
            }
            PublicParams::Dsa { p, q, g, y } => {
                ensure!(sig.len() == 2, "malformed dsa signature");
                dsa::verify(p, q, g, y, digest, &sig[0], &sig[1])
            }
            PublicParams::Ecdsa { curve, point } => {
                ensure!(sig.len() == 2, "malformed ecdsa signature");
                ecdsa::verify(*curve, point, digest, &sig[0], &sig[1])
            }
            PublicParams::EdDsa { curve, point } => {
                ensure!(sig.len() == 2, "malformed eddsa signature");
                eddsa::verify(*curve, point, digest, &sig[0], &sig[1])
            }
            PublicParams::Elgamal { .. } => {
                unsupported_err!("public key algorithm {} for signing", self.algorithm)
            }
            PublicParams::Ecdh { .. } => {
                unsupported_err!("public key algorithm {} for signing", self.algorithm)
            }
        }
    }

    /// Encrypt a session key payload to this key.
    pub fn encrypt_session_key<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        plain: &[u8],
    ) -> Result<EskValues> {
        match &self.params {
            PublicParams::Rsa { n, e } => {
                let mpis = rsa::encrypt(rng, n, e, plain)?;
                Ok(EskValues::Rsa {
                    mpi: mpis.into_iter().next().expect("one mpi"),
                })
            }
            PublicParams::Elgamal { p, g, y } => {
                let mut mpis = elgamal::encrypt(rng, p, g, y, plain)?.into_iter();
                Ok(EskValues::Elgamal {
                    first: mpis.next().expect("two mpis"),
                    second: mpis.next().expect("two mpis"),
                })
            }
            PublicParams::Ecdh {
                curve,
                point,
                kdf_hash,
                kdf_cipher,
            } => {
                let fingerprint = self.fingerprint()?;
                let (ephemeral, wrapped) = ecdh::encrypt(
                    rng,
                    *curve,
                    point,
                    *kdf_hash,
                    *kdf_cipher,
                    &fingerprint,
                    plain,
                )?;
                Ok(EskValues::Ecdh {
                    ephemeral: Mpi::from_slice(&ephemeral),
                    wrapped: wrapped.into(),
                })
            }
            _ => unsupported_err!("public key algorithm {} for encryption", self.algorithm),
        }
    }
}

fn timestamp(ts: u32) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::from(ts), 0)
        .ok_or_else(|| format_err!("invalid timestamp {}", ts))
}

impl Serialize for PublicKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_u8(self.version)?;
        w.write_u32::<BigEndian>(self.created_at.timestamp() as u32)?;
        if let Some(days) = self.expiration_days {
            w.write_u16::<BigEndian>(days)?;
        }
        w.write_u8(u8::from(self.algorithm))?;
        self.params.to_writer(w)?;

        Ok(())
    }
}

/// The decrypted secret parameters of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlainSecretParams {
    Rsa { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    Dsa { x: Mpi },
    Elgamal { x: Mpi },
    Ecdsa { d: Mpi },
    EdDsa { seed: Mpi },
    Ecdh { d: Mpi },
}

impl PlainSecretParams {
    fn from_slice(algorithm: PublicKeyAlgorithm, material: &[u8]) -> Result<Self> {
        let mut i = material;
        match algorithm {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => Ok(PlainSecretParams::Rsa {
                d: Mpi::from_buf(&mut i)?,
                p: Mpi::from_buf(&mut i)?,
                q: Mpi::from_buf(&mut i)?,
                u: Mpi::from_buf(&mut i)?,
            }),
            PublicKeyAlgorithm::DSA => Ok(PlainSecretParams::Dsa {
                x: Mpi::from_buf(&mut i)?,
            }),
            PublicKeyAlgorithm::ElGamal => Ok(PlainSecretParams::Elgamal {
                x: Mpi::from_buf(&mut i)?,
            }),
            PublicKeyAlgorithm::ECDSA => Ok(PlainSecretParams::Ecdsa {
                d: Mpi::from_buf(&mut i)?,
            }),
            PublicKeyAlgorithm::EdDSA => Ok(PlainSecretParams::EdDsa {
                seed: Mpi::from_buf(&mut i)?,
            }),
            PublicKeyAlgorithm::ECDH => Ok(PlainSecretParams::Ecdh {
                d: Mpi::from_buf(&mut i)?,
            }),
            _ => unsupported_err!("public key algorithm {}", u8::from(algorithm)),
        }
    }

    pub(crate) fn to_bytes_with_checksum(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                d.to_writer(&mut buf)?;
                p.to_writer(&mut buf)?;
                q.to_writer(&mut buf)?;
                u.to_writer(&mut buf)?;
            }
            PlainSecretParams::Dsa { x }
            | PlainSecretParams::Elgamal { x } => x.to_writer(&mut buf)?,
            PlainSecretParams::Ecdsa { d }
            | PlainSecretParams::Ecdh { d } => d.to_writer(&mut buf)?,
            PlainSecretParams::EdDsa { seed } => seed.to_writer(&mut buf)?,
        }
        let sum = checksum::simple(&buf);
        buf.write_u16::<BigEndian>(sum)?;
        Ok(buf)
    }
}

/// How the secret material of a key packet is protected.
const S2K_USAGE_PLAIN: u8 = 0;
const S2K_USAGE_SHA1: u8 = 254;
const S2K_USAGE_CHECKSUM: u8 = 255;

/// Secret Key packet (tags 5 and 7).
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKey {
    details: PublicKey,
    s2k_usage: u8,
    cipher: Option<SymmetricKeyAlgorithm>,
    s2k: Option<StringToKey>,
    iv: Option<Bytes>,
    encrypted: Bytes,
    /// Decrypted material; populated at parse time for unprotected keys
    /// and by [`SecretKey::unlock`] otherwise. Interior mutability keeps
    /// unlock available through the shared borrows handed to prompt
    /// callbacks, and makes repeat unlocks of an open key a no-op.
    unlocked: RefCell<Option<PlainSecretParams>>,
}

impl SecretKey {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let details = PublicKey::parse(&mut i)?;
        let s2k_usage = i.read_u8()?;

        match s2k_usage {
            S2K_USAGE_PLAIN => {
                let material = i.rest();
                ensure!(material.len() >= 2, "missing secret key checksum");
                let (body, sum) = material.split_at(material.len() - 2);
                let expected = u16::from(sum[0]) << 8 | u16::from(sum[1]);
                checksum::simple_verify(body, expected)
                    .map_err(|_| format_err!("secret key checksum mismatch"))?;

                let params = PlainSecretParams::from_slice(details.algorithm(), body)?;
                Ok(SecretKey {
                    details,
                    s2k_usage,
                    cipher: None,
                    s2k: None,
                    iv: None,
                    encrypted: material,
                    unlocked: RefCell::new(Some(params)),
                })
            }
            S2K_USAGE_SHA1 | S2K_USAGE_CHECKSUM => {
                let cipher = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::from_buf(&mut i)?;

                if s2k.is_gnu_dummy() {
                    return Ok(SecretKey {
                        details,
                        s2k_usage,
                        cipher: Some(cipher),
                        s2k: Some(s2k),
                        iv: None,
                        encrypted: Bytes::new(),
                        unlocked: RefCell::new(None),
                    });
                }

                let iv = i.read_take(cipher.block_size())?;
                Ok(SecretKey {
                    details,
                    s2k_usage,
                    cipher: Some(cipher),
                    s2k: Some(s2k),
                    iv: Some(iv),
                    encrypted: i.rest(),
                    unlocked: RefCell::new(None),
                })
            }
            // legacy: the usage octet is the cipher id, simple MD5 s2k
            _ => {
                let cipher = SymmetricKeyAlgorithm::from(s2k_usage);
                let iv = i.read_take(cipher.block_size())?;
                Ok(SecretKey {
                    details,
                    s2k_usage,
                    cipher: Some(cipher),
                    s2k: Some(StringToKey::new_simple_md5()),
                    iv: Some(iv),
                    encrypted: i.rest(),
                    unlocked: RefCell::new(None),
                })
            }
        }
    }

    /// Build an unprotected secret key from generated material.
    pub fn new_unprotected(details: PublicKey, params: PlainSecretParams) -> Result<Self> {
        let encrypted = params.to_bytes_with_checksum()?;
        Ok(SecretKey {
            details,
            s2k_usage: S2K_USAGE_PLAIN,
            cipher: None,
            s2k: None,
            iv: None,
            encrypted: encrypted.into(),
            unlocked: RefCell::new(Some(params)),
        })
    }

    pub fn details(&self) -> &PublicKey {
        &self.details
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.details
    }

    pub fn key_id(&self) -> Result<KeyId> {
        self.details.key_id()
    }

    /// True for "GNU dummy" keys whose secret material is externally held.
    pub fn is_dummy(&self) -> bool {
        self.s2k.as_ref().map(|s| s.is_gnu_dummy()).unwrap_or(false)
    }

    /// True while the secret material is not available in memory.
    pub fn is_encrypted(&self) -> bool {
        self.unlocked.borrow().is_none()
    }

    /// Decrypt the secret material with `passphrase`.
    ///
    /// Idempotent: once unlocked, further calls succeed without touching
    /// the material, whatever passphrase they carry. Unlocking a dummy key
    /// is a no-op. A wrong passphrase on a locked key is `KeyIncorrect`.
    pub fn unlock(&self, passphrase: &[u8]) -> Result<()> {
        if self.unlocked.borrow().is_some() {
            return Ok(());
        }
        if self.is_dummy() {
            debug!("unlock of gnu-dummy key is a no-op");
            return Ok(());
        }

        let cipher = self.cipher.ok_or_else(|| format_err!("no cipher for locked key"))?;
        let s2k = self.s2k.as_ref().ok_or_else(|| format_err!("no s2k for locked key"))?;
        let iv = self.iv.as_ref().ok_or_else(|| format_err!("no iv for locked key"))?;

        let key = Zeroizing::new(s2k.derive_key(passphrase, cipher.key_size())?);
        let mut data = Zeroizing::new(self.encrypted.to_vec());
        cipher.decrypt_with_iv_regular(&key[..], iv, &mut data[..])?;

        let material = match self.s2k_usage {
            S2K_USAGE_SHA1 => {
                if data.len() < 20 {
                    return Err(Error::key_incorrect());
                }
                let (body, digest) = data.split_at(data.len() - 20);
                checksum::sha1_verify(body, digest)?;
                body
            }
            _ => {
                if data.len() < 2 {
                    return Err(Error::key_incorrect());
                }
                let (body, sum) = data.split_at(data.len() - 2);
                let expected = u16::from(sum[0]) << 8 | u16::from(sum[1]);
                checksum::simple_verify(body, expected)?;
                body
            }
        };

        let params = PlainSecretParams::from_slice(self.details.algorithm(), material)
            .map_err(|_| Error::key_incorrect())?;
        *self.unlocked.borrow_mut() = Some(params);

        Ok(())
    }

    /// Produce a signature over `digest` with the unlocked material.
    pub fn create_signature<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        hash: HashAlgorithm,
        digest: &[u8],
    ) -> Result<Vec<Mpi>> {
        let guard = self.unlocked.borrow();
        let Some(secret) = guard.as_ref() else {
            bail!("secret key material is locked or missing");
        };

        match (self.details.params(), secret) {
            (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }) => {
                let key = rsa::private_key(n, e, d, p, q)?;
                rsa::sign(&key, hash, digest)
            }
            (PublicParams::Dsa { p, q, g, .. }, PlainSecretParams::Dsa { x }) => {
                dsa::sign(rng, p, q, g, x, digest)
            }
            (PublicParams::Ecdsa { curve, .. }, PlainSecretParams::Ecdsa { d }) => {
                ecdsa::sign(*curve, d, digest)
            }
            (PublicParams::EdDsa { .. }, PlainSecretParams::EdDsa { seed }) => {
                eddsa::sign(&seed.to_padded(32)?, digest)
            }
            _ => unsupported_err!(
                "public key algorithm {} for signing",
                self.details.algorithm()
            ),
        }
    }

    /// Decrypt an encrypted session key. Returns the raw
    /// `algorithm ‖ key ‖ checksum` payload parsed into its parts.
    pub fn decrypt_session_key(
        &self,
        values: &EskValues,
    ) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
        let guard = self.unlocked.borrow();
        let Some(secret) = guard.as_ref() else {
            return Err(Error::key_incorrect());
        };

        let payload = match (self.details.params(), secret, values) {
            (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }, EskValues::Rsa { mpi }) => {
                let key = rsa::private_key(n, e, d, p, q)?;
                rsa::decrypt(&key, mpi)?
            }
            (
                PublicParams::Elgamal { p, .. },
                PlainSecretParams::Elgamal { x },
                EskValues::Elgamal { first, second },
            ) => elgamal::decrypt(p, x, first, second)?,
            (
                PublicParams::Ecdh {
                    curve,
                    kdf_hash,
                    kdf_cipher,
                    ..
                },
                PlainSecretParams::Ecdh { d },
                EskValues::Ecdh { ephemeral, wrapped },
            ) => {
                let fingerprint = self.details.fingerprint()?;
                ecdh::decrypt(
                    *curve,
                    d,
                    *kdf_hash,
                    *kdf_cipher,
                    &fingerprint,
                    ephemeral.as_ref(),
                    wrapped,
                )?
            }
            _ => {
                return Err(Error::key_incorrect());
            }
        };

        // payload is algorithm ‖ session key ‖ two octet checksum
        if payload.len() < 3 {
            return Err(Error::key_incorrect());
        }
        let alg = SymmetricKeyAlgorithm::from(payload[0]);
        let key = &payload[1..payload.len() - 2];
        let sum = &payload[payload.len() - 2..];
        let expected = u16::from(sum[0]) << 8 | u16::from(sum[1]);
        checksum::simple_verify(key, expected)?;

        Ok((alg, key.to_vec()))
    }
}

impl Serialize for SecretKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        self.details.to_writer(w)?;

        // a key that has been unlocked serializes unprotected; dummy keys
        // keep their marker so the stripped secret stays stripped
        if self.s2k_usage != S2K_USAGE_PLAIN && !self.is_dummy() {
            if let Some(params) = self.unlocked.borrow().as_ref() {
                w.write_u8(S2K_USAGE_PLAIN)?;
                w.write_all(&params.to_bytes_with_checksum()?)?;
                return Ok(());
            }
        }

        w.write_u8(self.s2k_usage)?;

        match self.s2k_usage {
            S2K_USAGE_PLAIN => {
                w.write_all(&self.encrypted)?;
            }
            S2K_USAGE_SHA1 | S2K_USAGE_CHECKSUM => {
                let cipher = self.cipher.expect("locked key has cipher");
                let s2k = self.s2k.as_ref().expect("locked key has s2k");
                w.write_u8(u8::from(cipher))?;
                s2k.to_writer(w)?;
                if let Some(ref iv) = self.iv {
                    w.write_all(iv)?;
                }
                w.write_all(&self.encrypted)?;
            }
            _ => {
                // legacy framing: the usage octet was the cipher id
                if let Some(ref iv) = self.iv {
                    w.write_all(iv)?;
                }
                w.write_all(&self.encrypted)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key_hex() -> Vec<u8> {
        // primary public key of the fixture keyring used across the
        // integration tests (RSA-1024, key id a34d7e18c20c31bb)
        hex::decode(
            "044d3c5c10010400b1d13382944bd5aba23a4312968b5095d14f947f600eb478e14a6fcb16b0e0ca\
             c764884909c020bc495cfcc39a935387c661507bdb236a0612fb582cac3af9b29cc2c8c70090616c\
             41b662f4da4c1201e195472eb7f4ae1ccbcbf9940fe21d985e379a5563dde5b9a23d35f1cfaa5790\
             da3b79db26f23695107bfaca8e7b5bcd0011010001",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_v4_rsa_key() {
        let raw = test_key_hex();
        let key = PublicKey::from_buf(&mut &raw[..]).unwrap();
        assert_eq!(key.version(), 4);
        assert_eq!(key.algorithm(), PublicKeyAlgorithm::RSA);
        assert_eq!(
            format!("{:x}", key.key_id().unwrap()),
            "a34d7e18c20c31bb"
        );
    }

    #[test]
    fn test_serialize_roundtrip() {
        let raw = test_key_hex();
        let key = PublicKey::from_buf(&mut &raw[..]).unwrap();
        assert_eq!(key.to_bytes().unwrap(), raw);
    }
}
