use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::crypto::ecc_curve::EccCurve;
use crate::errors::{Error, Result};
use crate::types::Mpi;

/// Strip the 0x40 "native point" prefix of an EdDSA public key point.
fn native_point(point: &[u8]) -> Result<[u8; 32]> {
    ensure!(
        point.len() == 33 && point[0] == 0x40,
        "invalid EdDSA point encoding"
    );
    let mut raw = [0u8; 32];
    raw.copy_from_slice(&point[1..]);
    Ok(raw)
}

/// Verify an EdDSA (Ed25519) signature over the prehashed input. The
/// signature travels as two MPIs holding R and S.
pub fn verify(curve: EccCurve, point: &[u8], hashed: &[u8], r: &Mpi, s: &Mpi) -> Result<()> {
    ensure_eq!(curve, EccCurve::Ed25519, "unexpected EdDSA curve");

    let key = VerifyingKey::from_bytes(&native_point(point)?)
        .map_err(|_| format_err!("invalid Ed25519 public key"))?;

    // R and S are MPIs and may arrive with leading zeros stripped
    let mut raw = [0u8; 64];
    raw[..32].copy_from_slice(&r.to_padded(32)?);
    raw[32..].copy_from_slice(&s.to_padded(32)?);
    let sig = Signature::from_bytes(&raw);

    key.verify_strict(hashed, &sig)
        .map_err(|_| Error::invalid_signature())
}

/// Produce an EdDSA signature over the prehashed input.
pub fn sign(seed: &[u8], hashed: &[u8]) -> Result<Vec<Mpi>> {
    ensure_eq!(seed.len(), 32, "invalid Ed25519 secret key length");
    let mut raw = [0u8; 32];
    raw.copy_from_slice(seed);

    let key = SigningKey::from_bytes(&raw);
    let sig = key.sign(hashed);
    let bytes = sig.to_bytes();

    Ok(vec![
        Mpi::from_slice(&bytes[..32]),
        Mpi::from_slice(&bytes[32..]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn test_eddsa_sign_verify_roundtrip() {
        let seed = [7u8; 32];
        let key = SigningKey::from_bytes(&seed);
        let mut point = vec![0x40];
        point.extend_from_slice(key.verifying_key().as_bytes());

        let digest = HashAlgorithm::SHA2_256.digest(b"hello eddsa").unwrap();
        let sig = sign(&seed, &digest).unwrap();
        verify(EccCurve::Ed25519, &point, &digest, &sig[0], &sig[1]).unwrap();

        let bad = HashAlgorithm::SHA2_256.digest(b"hello eddsb").unwrap();
        assert!(verify(EccCurve::Ed25519, &point, &bad, &sig[0], &sig[1]).is_err());
    }
}
