use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::crypto::ecc_curve::EccCurve;
use crate::errors::{Error, Result};
use crate::types::Mpi;

macro_rules! verify_nist {
    ($mod:ident, $curve:expr, $point:expr, $hashed:expr, $r:expr, $s:expr) => {{
        let key = $mod::ecdsa::VerifyingKey::from_sec1_bytes($point)
            .map_err(|_| format_err!("invalid {:?} public key", $curve))?;
        let size = $curve.field_size();
        let r = $r.to_padded(size)?;
        let s = $s.to_padded(size)?;
        let mut raw = r;
        raw.extend_from_slice(&s);
        let sig = $mod::ecdsa::Signature::from_slice(&raw)
            .map_err(|_| Error::invalid_signature())?;
        key.verify_prehash($hashed, &sig)
            .map_err(|_| Error::invalid_signature())
    }};
}

/// Verify an ECDSA signature `(r, s)` over the prehashed input.
pub fn verify(
    curve: EccCurve,
    point: &[u8],
    hashed: &[u8],
    r: &Mpi,
    s: &Mpi,
) -> Result<()> {
    match curve {
        EccCurve::P256 => verify_nist!(p256, curve, point, hashed, r, s),
        EccCurve::P384 => verify_nist!(p384, curve, point, hashed, r, s),
        EccCurve::P521 => verify_nist!(p521, curve, point, hashed, r, s),
        _ => unsupported_err!("public key ECDSA over {:?}", curve),
    }
}

macro_rules! sign_nist {
    ($mod:ident, $curve:expr, $d:expr, $hashed:expr) => {{
        let d = $d.to_padded($curve.field_size())?;
        let key = $mod::ecdsa::SigningKey::from_slice(&d)
            .map_err(|_| format_err!("invalid {:?} secret key", $curve))?;
        let sig: $mod::ecdsa::Signature = key
            .sign_prehash($hashed)
            .map_err(|_| Error::invalid_signature())?;
        let (r, s) = sig.split_bytes();
        Ok(vec![Mpi::from_slice(&r), Mpi::from_slice(&s)])
    }};
}

/// Produce an ECDSA signature over the prehashed input.
pub fn sign(curve: EccCurve, d: &Mpi, hashed: &[u8]) -> Result<Vec<Mpi>> {
    match curve {
        EccCurve::P256 => sign_nist!(p256, curve, d, hashed),
        EccCurve::P384 => sign_nist!(p384, curve, d, hashed),
        EccCurve::P521 => sign_nist!(p521, curve, d, hashed),
        _ => unsupported_err!("public key ECDSA over {:?}", curve),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn test_p256_sign_verify_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let key = p256::ecdsa::SigningKey::random(&mut rng);
        let point = key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        let d = Mpi::from_slice(&key.to_bytes());

        let digest = HashAlgorithm::SHA2_256.digest(b"sample").unwrap();
        let sig = sign(EccCurve::P256, &d, &digest).unwrap();
        verify(EccCurve::P256, &point, &digest, &sig[0], &sig[1]).unwrap();

        let bad = HashAlgorithm::SHA2_256.digest(b"sampla").unwrap();
        assert!(verify(EccCurve::P256, &point, &bad, &sig[0], &sig[1]).is_err());
    }
}
