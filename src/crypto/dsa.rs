use num_bigint::traits::ModInverse;
use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, Rng};

use crate::errors::{Error, Result};
use crate::types::Mpi;

/// Truncate `hashed` to the byte size of the subgroup order `q`.
///
/// Required whenever the digest is wider than the subgroup, e.g. SHA-512
/// certifications made over a DSA-1024 key.
fn truncated(q: &BigUint, hashed: &[u8]) -> BigUint {
    let qlen = (q.bits() + 7) / 8;
    let take = hashed.len().min(qlen);
    BigUint::from_bytes_be(&hashed[..take])
}

/// Verify a DSA signature `(r, s)` over `hashed`.
pub fn verify(p: &Mpi, q: &Mpi, g: &Mpi, y: &Mpi, hashed: &[u8], r: &Mpi, s: &Mpi) -> Result<()> {
    let p = BigUint::from_bytes_be(p.as_ref());
    let q = BigUint::from_bytes_be(q.as_ref());
    let g = BigUint::from_bytes_be(g.as_ref());
    let y = BigUint::from_bytes_be(y.as_ref());
    let r = BigUint::from_bytes_be(r.as_ref());
    let s = BigUint::from_bytes_be(s.as_ref());

    let zero = BigUint::from(0u8);
    if r == zero || r >= q || s == zero || s >= q {
        return Err(Error::invalid_signature());
    }

    let w = s
        .mod_inverse(&q)
        .and_then(|w| w.to_biguint())
        .ok_or_else(Error::invalid_signature)?;

    let z = truncated(&q, hashed);
    let u1 = (&z * &w) % &q;
    let u2 = (&r * &w) % &q;
    let v = (g.modpow(&u1, &p) * y.modpow(&u2, &p) % &p) % &q;

    if v != r {
        return Err(Error::invalid_signature());
    }

    Ok(())
}

/// Produce a DSA signature over `hashed`.
pub fn sign<R: CryptoRng + Rng>(
    rng: &mut R,
    p: &Mpi,
    q: &Mpi,
    g: &Mpi,
    x: &Mpi,
    hashed: &[u8],
) -> Result<Vec<Mpi>> {
    let p = BigUint::from_bytes_be(p.as_ref());
    let q = BigUint::from_bytes_be(q.as_ref());
    let g = BigUint::from_bytes_be(g.as_ref());
    let x = BigUint::from_bytes_be(x.as_ref());

    let z = truncated(&q, hashed);
    let one = BigUint::from(1u8);
    let zero = BigUint::from(0u8);

    loop {
        let k = rng.gen_biguint_range(&one, &q);
        let r = g.modpow(&k, &p) % &q;
        if r == zero {
            continue;
        }

        let kinv = match k.mod_inverse(&q).and_then(|k| k.to_biguint()) {
            Some(kinv) => kinv,
            None => continue,
        };
        let s = (kinv * (&z + &x * &r)) % &q;
        if s == zero {
            continue;
        }

        return Ok(vec![
            Mpi::from_slice(&r.to_bytes_be()),
            Mpi::from_slice(&s.to_bytes_be()),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    // RFC 6979 appendix A.2.1 DSA-1024 domain parameters.
    const P: &str = "86f5ca03dcfeb225063ff830a0c769b9dd9d6153ad91d7ce27f787c43278b447\
                     e6533b86b18bed6e8a48b784a14c252c5be0dbf60b86d6385bd2f12fb763ed88\
                     73abfd3f5ba2e0a8c0a59082eac056935e529daf7c610467899c77adedfc846c\
                     881870b7b19b2b58f9be0521a17002e3bdd6b86685ee90b3d9a1b02b782b1779";
    const Q: &str = "996f967f6c8e388d9e28d01e205fba957a5698b1";
    const G: &str = "07b0f92546150b62514bb771e2a0c0ce387f03bda6c56b505209ff25fd3c133d\
                     89bbcd97e904e09114d9a7defdeadfc9078ea544d2e401aeecc40bb9fbbf78fd\
                     87995a10a1c27cb7789b594ba7efb5c4326a9fe59a070e136db77175464adca4\
                     17be5dce2f40d10a46a3a3943f26ab7fd9c0398ff8c76ee0a56826a8a88f1dbd";

    #[test]
    fn test_dsa_sign_verify_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let p = Mpi::from_slice(&hex::decode(P).unwrap());
        let q = Mpi::from_slice(&hex::decode(Q).unwrap());
        let g = Mpi::from_slice(&hex::decode(G).unwrap());

        let x_int = rng.gen_biguint_range(
            &BigUint::from(1u8),
            &BigUint::from_bytes_be(q.as_ref()),
        );
        let y_int = BigUint::from_bytes_be(g.as_ref()).modpow(
            &x_int,
            &BigUint::from_bytes_be(p.as_ref()),
        );
        let x = Mpi::from_slice(&x_int.to_bytes_be());
        let y = Mpi::from_slice(&y_int.to_bytes_be());

        // SHA-512 digest is wider than q, exercising the truncation
        let digest = HashAlgorithm::SHA2_512.digest(b"sample").unwrap();
        let sig = sign(&mut rng, &p, &q, &g, &x, &digest).unwrap();
        verify(&p, &q, &g, &y, &digest, &sig[0], &sig[1]).unwrap();

        let bad = HashAlgorithm::SHA2_512.digest(b"mangled").unwrap();
        assert!(verify(&p, &q, &g, &y, &bad, &sig[0], &sig[1]).is_err());
    }
}
