use log::debug;
use rand::{CryptoRng, Rng};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::{Error, Result};
use crate::types::Mpi;

fn public_key(n: &Mpi, e: &Mpi) -> Result<RsaPublicKey> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(n.as_ref()),
        BigUint::from_bytes_be(e.as_ref()),
    )
    .map_err(Into::into)
}

pub(crate) fn private_key(n: &Mpi, e: &Mpi, d: &Mpi, p: &Mpi, q: &Mpi) -> Result<RsaPrivateKey> {
    let key = RsaPrivateKey::from_components(
        BigUint::from_bytes_be(n.as_ref()),
        BigUint::from_bytes_be(e.as_ref()),
        BigUint::from_bytes_be(d.as_ref()),
        vec![
            BigUint::from_bytes_be(p.as_ref()),
            BigUint::from_bytes_be(q.as_ref()),
        ],
    )?;
    Ok(key)
}

fn signature_scheme(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    let scheme = match hash {
        HashAlgorithm::MD5 => Pkcs1v15Sign::new::<md5::Md5>(),
        HashAlgorithm::SHA1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::RIPEMD160 => Pkcs1v15Sign::new::<ripemd::Ripemd160>(),
        HashAlgorithm::SHA2_256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::SHA2_384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::SHA2_512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::SHA2_224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        _ => unsupported_err!("hash function {}", u8::from(hash)),
    };
    Ok(scheme)
}

/// Verify a PKCS#1 v1.5 padded RSA signature.
pub fn verify(n: &Mpi, e: &Mpi, hash: HashAlgorithm, hashed: &[u8], sig: &Mpi) -> Result<()> {
    debug!("RSA verify hash={:?}", hash);
    let key = public_key(n, e)?;
    // the signature is an MPI and may have been stripped of leading zeros
    let sig = sig.to_padded(key.size())?;

    key.verify(signature_scheme(hash)?, hashed, &sig)
        .map_err(|_| Error::invalid_signature())
}

/// Sign using RSA with PKCS#1 v1.5 padding.
pub fn sign(key: &RsaPrivateKey, hash: HashAlgorithm, digest: &[u8]) -> Result<Vec<Mpi>> {
    let sig = key.sign(signature_scheme(hash)?, digest)?;
    Ok(vec![Mpi::from_slice(&sig)])
}

/// RSA session key decryption using PKCS#1 v1.5 padding.
pub fn decrypt(key: &RsaPrivateKey, mpi: &Mpi) -> Result<Vec<u8>> {
    let ciphertext = mpi.to_padded(key.size())?;
    key.decrypt(Pkcs1v15Encrypt, &ciphertext)
        .map_err(|_| Error::key_incorrect())
}

/// RSA session key encryption using PKCS#1 v1.5 padding.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    n: &Mpi,
    e: &Mpi,
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    let key = public_key(n, e)?;
    let data = key.encrypt(rng, Pkcs1v15Encrypt, plaintext)?;
    Ok(vec![Mpi::from_slice(&data)])
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_rsa_encrypt_decrypt_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let n = Mpi::from_slice(&key.n().to_bytes_be());
        let e = Mpi::from_slice(&key.e().to_bytes_be());

        let session_key = b"0123456789abcdef";
        let enc = encrypt(&mut rng, &n, &e, session_key).unwrap();
        let dec = decrypt(&key, &enc[0]).unwrap();
        assert_eq!(dec, session_key);
    }

    #[test]
    fn test_rsa_sign_verify_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let n = Mpi::from_slice(&key.n().to_bytes_be());
        let e = Mpi::from_slice(&key.e().to_bytes_be());

        let digest = HashAlgorithm::SHA2_256.digest(b"hello world").unwrap();
        let sig = sign(&key, HashAlgorithm::SHA2_256, &digest).unwrap();
        verify(&n, &e, HashAlgorithm::SHA2_256, &digest, &sig[0]).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"hello worle").unwrap();
        assert!(verify(&n, &e, HashAlgorithm::SHA2_256, &other, &sig[0]).is_err());
    }
}
