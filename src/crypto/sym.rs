use std::fmt::Display;

use aes::{Aes128, Aes192, Aes256};
use cast5::Cast5;
use cfb_mode::{BufDecryptor, BufEncryptor};
use cipher::{BlockCipher, BlockEncryptMut, BlockSizeUser, KeyInit, KeyIvInit};
use des::TdesEde3;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};

use crate::errors::{Error, Result};

/// Available symmetric key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    Plaintext = 0,
    IDEA = 1,
    /// TripleDES (DES-EDE, 168 bit key derived from 192)
    TripleDES = 2,
    /// CAST5 (128 bit key, as per RFC 2144)
    CAST5 = 3,
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    Twofish = 10,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for SymmetricKeyAlgorithm {
    fn default() -> Self {
        Self::AES128
    }
}

impl Display for SymmetricKeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Plaintext => "Plaintext",
            Self::IDEA => "IDEA",
            Self::TripleDES => "3DES",
            Self::CAST5 => "CAST5",
            Self::Blowfish => "Blowfish",
            Self::AES128 => "AES128",
            Self::AES192 => "AES192",
            Self::AES256 => "AES256",
            Self::Twofish => "Twofish",
            Self::Other(v) => return write!(f, "Other({})", v),
        };
        write!(f, "{}", s)
    }
}

fn cfb_decrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let mut decryptor = BufDecryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| format_err!("invalid key or iv length"))?;
    decryptor.decrypt(data);
    Ok(())
}

fn cfb_encrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let mut encryptor = BufEncryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| format_err!("invalid key or iv length"))?;
    encryptor.encrypt(data);
    Ok(())
}

/// OpenPGP CFB with the prefix resynchronization step of RFC 4880 §13.9:
/// the `bs + 2` byte prefix is decrypted under a zero IV, then the body
/// continues with a decryptor re-keyed on the encrypted prefix bytes
/// `2..bs + 2`.
fn openpgp_cfb_decrypt<C>(key: &[u8], prefix: &mut [u8], data: &mut [u8]) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let bs = C::block_size();
    ensure_eq!(prefix.len(), bs + 2, "invalid prefix length");

    let iv = vec![0u8; bs];
    let mut decryptor = BufDecryptor::<C>::new_from_slices(key, &iv)
        .map_err(|_| format_err!("invalid key or iv length"))?;

    // resyncing: the encrypted prefix becomes the IV of the body
    let encrypted_prefix = prefix[2..].to_vec();
    decryptor.decrypt(prefix);

    let mut decryptor = BufDecryptor::<C>::new_from_slices(key, &encrypted_prefix)
        .map_err(|_| format_err!("invalid key or iv length"))?;
    decryptor.decrypt(data);

    Ok(())
}

macro_rules! dispatch_cipher {
    ($self:expr, $func:ident, $($arg:expr),+) => {
        match $self {
            SymmetricKeyAlgorithm::TripleDES => $func::<TdesEde3>($($arg),+),
            SymmetricKeyAlgorithm::CAST5 => $func::<Cast5>($($arg),+),
            SymmetricKeyAlgorithm::AES128 => $func::<Aes128>($($arg),+),
            SymmetricKeyAlgorithm::AES192 => $func::<Aes192>($($arg),+),
            SymmetricKeyAlgorithm::AES256 => $func::<Aes256>($($arg),+),
            _ => unsupported_err!("cipher {}", u8::from($self)),
        }
    };
}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 8,
            SymmetricKeyAlgorithm::TripleDES => 8,
            SymmetricKeyAlgorithm::CAST5 => 8,
            SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 16,
            SymmetricKeyAlgorithm::AES256 => 16,
            SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// The key size in bytes.
    pub fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 16,
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// Decrypt a Symmetrically Encrypted Data packet body (tag 9): OpenPGP
    /// CFB with prefix resynchronization. Returns the plaintext without the
    /// random prefix. A failed prefix quick check is `KeyIncorrect`.
    pub fn decrypt(self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let bs = self.block_size();
        if ciphertext.len() < bs + 2 {
            return Err(Error::key_incorrect());
        }

        let mut prefix = ciphertext[..bs + 2].to_vec();
        let mut data = ciphertext[bs + 2..].to_vec();
        dispatch_cipher!(self, openpgp_cfb_decrypt, key, &mut prefix, &mut data)?;

        if prefix[bs - 2] != prefix[bs] || prefix[bs - 1] != prefix[bs + 1] {
            return Err(Error::key_incorrect());
        }

        Ok(data)
    }

    /// Decrypt an integrity protected body (tag 18): one continuous CFB
    /// stream with a zero IV, no resynchronization. Returns the full
    /// plaintext including the `bs + 2` byte prefix, which the caller needs
    /// for the MDC computation.
    pub fn decrypt_protected(self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let bs = self.block_size();
        if ciphertext.len() < bs + 2 {
            return Err(Error::key_incorrect());
        }

        let mut data = ciphertext.to_vec();
        let iv = vec![0u8; bs];
        dispatch_cipher!(self, cfb_decrypt, key, &iv, &mut data)?;

        if data[bs - 2] != data[bs] || data[bs - 1] != data[bs + 1] {
            return Err(Error::key_incorrect());
        }

        Ok(data)
    }

    /// Encrypt an integrity protected body in place: one continuous CFB
    /// stream with a zero IV. The input starts with the prefix from
    /// [`Self::make_prefix`] and already carries the MDC trailer.
    pub fn encrypt_protected(self, key: &[u8], prefix_and_plaintext: &mut [u8]) -> Result<()> {
        let bs = self.block_size();
        ensure!(prefix_and_plaintext.len() >= bs + 2, "input too short");

        let iv = vec![0u8; bs];
        dispatch_cipher!(self, cfb_encrypt, key, &iv, prefix_and_plaintext)
    }

    /// Generate the `bs + 2` byte random prefix with its repeated check
    /// bytes.
    pub fn make_prefix<R: CryptoRng + Rng>(self, rng: &mut R) -> Vec<u8> {
        let bs = self.block_size();
        let mut prefix = vec![0u8; bs + 2];
        rng.fill_bytes(&mut prefix[..bs]);
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];
        prefix
    }

    /// Plain CFB decryption with the given IV, used for secret key material
    /// and embedded session keys.
    pub fn decrypt_with_iv_regular(self, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
        dispatch_cipher!(self, cfb_decrypt, key, iv, data)
    }

    /// Plain CFB encryption with the given IV.
    pub fn encrypt_with_iv_regular(self, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
        dispatch_cipher!(self, cfb_encrypt, key, iv, data)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_regular_cfb_roundtrip() {
        for alg in [
            SymmetricKeyAlgorithm::TripleDES,
            SymmetricKeyAlgorithm::CAST5,
            SymmetricKeyAlgorithm::AES128,
            SymmetricKeyAlgorithm::AES192,
            SymmetricKeyAlgorithm::AES256,
        ] {
            let key = vec![1u8; alg.key_size()];
            let iv = vec![0u8; alg.block_size()];
            let data = b"the quick brown fox jumps over the lazy dog".to_vec();

            let mut buf = data.clone();
            alg.encrypt_with_iv_regular(&key, &iv, &mut buf).unwrap();
            assert_ne!(buf, data);
            alg.decrypt_with_iv_regular(&key, &iv, &mut buf).unwrap();
            assert_eq!(buf, data, "{:?}", alg);
        }
    }

    #[test]
    fn test_protected_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = vec![2u8; alg.key_size()];

        let mut body = alg.make_prefix(&mut rng);
        body.extend_from_slice(b"attack at dawn");
        let plain = body.clone();

        alg.encrypt_protected(&key, &mut body).unwrap();
        let decrypted = alg.decrypt_protected(&key, &body).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn test_resync_decrypt() {
        // encrypt in the no-resync layout, then re-encrypt the body the
        // resynced way by using the encrypted prefix as the body IV
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let alg = SymmetricKeyAlgorithm::CAST5;
        let key = vec![5u8; alg.key_size()];
        let bs = alg.block_size();

        let prefix = alg.make_prefix(&mut rng);
        let body = b"resynchronized message".to_vec();

        let mut encrypted_prefix = prefix.clone();
        let iv = vec![0u8; bs];
        alg.encrypt_with_iv_regular(&key, &iv, &mut encrypted_prefix)
            .unwrap();
        let mut encrypted_body = body.clone();
        alg.encrypt_with_iv_regular(&key, &encrypted_prefix[2..], &mut encrypted_body)
            .unwrap();

        let mut ciphertext = encrypted_prefix;
        ciphertext.extend_from_slice(&encrypted_body);

        assert_eq!(alg.decrypt(&key, &ciphertext).unwrap(), body);
    }

    #[test]
    fn test_wrong_key_is_key_incorrect() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = vec![2u8; alg.key_size()];

        let mut body = alg.make_prefix(&mut rng);
        body.extend_from_slice(b"attack at dawn");
        alg.encrypt_protected(&key, &mut body).unwrap();

        let wrong = vec![3u8; alg.key_size()];
        let err = alg.decrypt_protected(&wrong, &body).unwrap_err();
        assert!(err.is_key_incorrect());
    }

    #[test]
    fn test_unsupported_cipher() {
        let err = SymmetricKeyAlgorithm::Twofish
            .decrypt(&[0u8; 32], &[0u8; 64])
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("cipher "));
    }
}
