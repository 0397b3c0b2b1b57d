use num_bigint::traits::ModInverse;
use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, Rng};

use crate::errors::{Error, Result};
use crate::types::Mpi;

/// ElGamal session key encryption, EME-PKCS1-v1_5 padded.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    p: &Mpi,
    g: &Mpi,
    y: &Mpi,
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    let p = BigUint::from_bytes_be(p.as_ref());
    let g = BigUint::from_bytes_be(g.as_ref());
    let y = BigUint::from_bytes_be(y.as_ref());

    let k = (p.bits() + 7) / 8;
    ensure!(plaintext.len() <= k.saturating_sub(11), "message too long");

    // EME-PKCS1-v1_5: 00 02 <nonzero padding> 00 M
    let mut em = vec![0u8; k];
    em[1] = 2;
    for b in em.iter_mut().take(k - plaintext.len() - 1).skip(2) {
        *b = rng.gen_range(1..=255u8);
    }
    let m_offset = k - plaintext.len();
    em[m_offset..].copy_from_slice(plaintext);

    let m = BigUint::from_bytes_be(&em);
    let one = BigUint::from(1u8);
    let kk = rng.gen_biguint_range(&one, &(&p - &one));

    let c1 = g.modpow(&kk, &p);
    let c2 = (m * y.modpow(&kk, &p)) % &p;

    Ok(vec![
        Mpi::from_slice(&c1.to_bytes_be()),
        Mpi::from_slice(&c2.to_bytes_be()),
    ])
}

/// ElGamal session key decryption. Returns the unpadded message.
pub fn decrypt(p: &Mpi, x: &Mpi, c1: &Mpi, c2: &Mpi) -> Result<Vec<u8>> {
    let p = BigUint::from_bytes_be(p.as_ref());
    let x = BigUint::from_bytes_be(x.as_ref());
    let c1 = BigUint::from_bytes_be(c1.as_ref());
    let c2 = BigUint::from_bytes_be(c2.as_ref());

    let s = c1.modpow(&x, &p);
    let s_inv = s
        .mod_inverse(&p)
        .and_then(|s| s.to_biguint())
        .ok_or_else(Error::key_incorrect)?;
    let m = (c2 * s_inv) % &p;

    let k = (p.bits() + 7) / 8;
    let mut em = vec![0u8; k - m.to_bytes_be().len()];
    em.extend_from_slice(&m.to_bytes_be());

    // strip EME-PKCS1-v1_5 padding
    if em.len() < 11 || em[0] != 0 || em[1] != 2 {
        return Err(Error::key_incorrect());
    }
    let sep = em[2..]
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(Error::key_incorrect)?;

    Ok(em[sep + 3..].to_vec())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    // RFC 5114 1024-bit MODP group parameters.
    const P: &str = "b10b8f96a080e01dde92de5eae5d54ec52c99fbcfb06a3c69a6a9dca52d23b61\
                     6073e28675a23d189838ef1e2ee652c013ecb4aea906112324975c3cd49b83bf\
                     accbdd7d90c4bd7098488e9c219a73724effd6fae5644738faa31a4ff55bccc0\
                     a151af5f0dc8b4bd45bf37df365c1a65e68cfda76d4da708df1fb2bc2e4a4371";
    const G: &str = "a4d1cbd5c3fd34126765a442efb99905f8104dd258ac507fd6406cff14266d31\
                     266fea1e5c41564b777e690f5504f213160217b4b01b886a5e91547f9e2749f4\
                     d7fbd7d3b9a92ee1909d0d2263f80a76a6a24c087a091f531dbf0a0169b6a28a\
                     d662a4d18e73afa32d779d5918d08bc8858f4dcef97c2a24855e6eeb22b3b2e5";

    #[test]
    fn test_elgamal_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);

        let p = Mpi::from_slice(&hex::decode(P).unwrap());
        let g = Mpi::from_slice(&hex::decode(G).unwrap());

        let x_int = rng.gen_biguint(256);
        let y_int = BigUint::from_bytes_be(g.as_ref()).modpow(
            &x_int,
            &BigUint::from_bytes_be(p.as_ref()),
        );
        let x = Mpi::from_slice(&x_int.to_bytes_be());
        let y = Mpi::from_slice(&y_int.to_bytes_be());

        let msg = b"\x09super secret session key\x12\x34";
        let c = encrypt(&mut rng, &p, &g, &y, msg).unwrap();
        let back = decrypt(&p, &x, &c[0], &c[1]).unwrap();
        assert_eq!(back, msg);
    }
}
