use log::debug;
use rand::{CryptoRng, Rng};

use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::aes_kw;
use crate::errors::{Error, Result};
use crate::types::Mpi;

/// The fixed party info of the OpenPGP ECDH KDF.
const ANONYMOUS_SENDER: &[u8] = b"Anonymous Sender    ";

/// The "one-pass Diffie-Hellman" KDF of RFC 6637 §7: derives the key
/// encryption key from the shared point and the key's KDF parameters.
fn derive_kek(
    curve: EccCurve,
    shared: &[u8],
    kdf_hash: HashAlgorithm,
    kdf_cipher: SymmetricKeyAlgorithm,
    fingerprint: &[u8],
) -> Result<Vec<u8>> {
    let mut input = Vec::with_capacity(64 + shared.len());
    input.extend_from_slice(&[0, 0, 0, 1]);
    input.extend_from_slice(shared);
    input.push(curve.oid().len() as u8);
    input.extend_from_slice(curve.oid());
    input.push(18); // ECDH algorithm id
    input.extend_from_slice(&[3, 1, u8::from(kdf_hash), u8::from(kdf_cipher)]);
    input.extend_from_slice(ANONYMOUS_SENDER);
    input.extend_from_slice(fingerprint);

    let digest = kdf_hash.digest(&input)?;
    let key_size = kdf_cipher.key_size();
    ensure!(digest.len() >= key_size, "kdf hash too small for kek");

    Ok(digest[..key_size].to_vec())
}

fn shared_secret(curve: EccCurve, d: &Mpi, ephemeral: &[u8]) -> Result<Vec<u8>> {
    match curve {
        EccCurve::Curve25519 => {
            ensure!(
                ephemeral.len() == 33 && ephemeral[0] == 0x40,
                "invalid curve25519 ephemeral point"
            );

            // the secret scalar is stored big-endian, dalek wants little-endian
            let mut secret = d.to_padded(32)?;
            secret.reverse();
            let secret: [u8; 32] = secret.as_slice().try_into().expect("32 bytes");

            let mut point = [0u8; 32];
            point.copy_from_slice(&ephemeral[1..]);

            let sk = x25519_dalek::StaticSecret::from(secret);
            let shared = sk.diffie_hellman(&x25519_dalek::PublicKey::from(point));
            Ok(shared.as_bytes().to_vec())
        }
        EccCurve::P256 => nist_shared::<p256::NistP256>(curve, d, ephemeral),
        EccCurve::P384 => nist_shared::<p384::NistP384>(curve, d, ephemeral),
        EccCurve::P521 => nist_shared::<p521::NistP521>(curve, d, ephemeral),
        _ => unsupported_err!("public key ECDH over {:?}", curve),
    }
}

fn nist_shared<C>(curve: EccCurve, d: &Mpi, ephemeral: &[u8]) -> Result<Vec<u8>>
where
    C: elliptic_curve::CurveArithmetic,
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    elliptic_curve::AffinePoint<C>: elliptic_curve::sec1::FromEncodedPoint<C>
        + elliptic_curve::sec1::ToEncodedPoint<C>,
{
    let secret = elliptic_curve::SecretKey::<C>::from_slice(&d.to_padded(curve.field_size())?)
        .map_err(|_| format_err!("invalid {:?} secret key", curve))?;
    let public = elliptic_curve::PublicKey::<C>::from_sec1_bytes(ephemeral)
        .map_err(|_| format_err!("invalid {:?} ephemeral point", curve))?;

    let shared =
        elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Ok(shared.raw_secret_bytes().to_vec())
}

/// Decrypt an ECDH encrypted session key. Returns the unpadded
/// `algorithm ‖ key ‖ checksum` payload.
pub fn decrypt(
    curve: EccCurve,
    d: &Mpi,
    kdf_hash: HashAlgorithm,
    kdf_cipher: SymmetricKeyAlgorithm,
    fingerprint: &[u8],
    ephemeral: &[u8],
    wrapped: &[u8],
) -> Result<Vec<u8>> {
    debug!("ECDH decrypt over {:?}", curve);

    let shared = shared_secret(curve, d, ephemeral)?;
    let kek = derive_kek(curve, &shared, kdf_hash, kdf_cipher, fingerprint)?;
    let padded = aes_kw::unwrap(&kek, wrapped)?;

    // PKCS5 style padding, each pad byte holds the pad length
    let pad = *padded.last().ok_or_else(Error::key_incorrect)? as usize;
    if pad == 0 || pad > padded.len() {
        return Err(Error::key_incorrect());
    }

    Ok(padded[..padded.len() - pad].to_vec())
}

/// Encrypt a session key payload to an ECDH recipient key. Returns the
/// ephemeral public point and the wrapped key.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    curve: EccCurve,
    point: &[u8],
    kdf_hash: HashAlgorithm,
    kdf_cipher: SymmetricKeyAlgorithm,
    fingerprint: &[u8],
    plain: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let (ephemeral_point, shared) = match curve {
        EccCurve::Curve25519 => {
            ensure!(
                point.len() == 33 && point[0] == 0x40,
                "invalid curve25519 recipient point"
            );
            let mut recipient = [0u8; 32];
            recipient.copy_from_slice(&point[1..]);

            let eph = x25519_dalek::EphemeralSecret::random_from_rng(&mut *rng);
            let eph_public = x25519_dalek::PublicKey::from(&eph);
            let shared = eph.diffie_hellman(&x25519_dalek::PublicKey::from(recipient));

            let mut encoded = vec![0x40];
            encoded.extend_from_slice(eph_public.as_bytes());
            (encoded, shared.as_bytes().to_vec())
        }
        _ => unsupported_err!("public key ECDH encryption over {:?}", curve),
    };

    let kek = derive_kek(curve, &shared, kdf_hash, kdf_cipher, fingerprint)?;

    // pad to the next multiple of 8 with PKCS5 style bytes
    let mut padded = plain.to_vec();
    let pad = 8 - (padded.len() % 8);
    padded.extend(std::iter::repeat(pad as u8).take(pad));

    let wrapped = aes_kw::wrap(&kek, &padded)?;

    Ok((ephemeral_point, wrapped))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_curve25519_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(13);

        // recipient key pair, secret stored big-endian like the wire format
        let sk = x25519_dalek::StaticSecret::random_from_rng(&mut rng);
        let pk = x25519_dalek::PublicKey::from(&sk);
        let mut secret_be = sk.to_bytes();
        secret_be.reverse();
        let d = Mpi::from_slice(&secret_be);
        let mut point = vec![0x40];
        point.extend_from_slice(pk.as_bytes());

        let fingerprint = [0xABu8; 20];
        let payload = b"\x09sixteen byte key\x1a\x2b";

        let (ephemeral, wrapped) = encrypt(
            &mut rng,
            EccCurve::Curve25519,
            &point,
            HashAlgorithm::SHA2_256,
            SymmetricKeyAlgorithm::AES128,
            &fingerprint,
            payload,
        )
        .unwrap();

        let back = decrypt(
            EccCurve::Curve25519,
            &d,
            HashAlgorithm::SHA2_256,
            SymmetricKeyAlgorithm::AES128,
            &fingerprint,
            &ephemeral,
            &wrapped,
        )
        .unwrap();

        assert_eq!(back, payload);
    }
}
