use aes_kw::{KekAes128, KekAes192, KekAes256};
use cipher::generic_array::GenericArray;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// AES Key Wrap
/// As defined in RFC 3394.
pub fn wrap(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let aes_size = key.len() * 8;
    let res = match aes_size {
        128 => {
            let kek = KekAes128::from(*GenericArray::from_slice(key));
            kek.wrap_vec(data)
        }
        192 => {
            let kek = KekAes192::from(*GenericArray::from_slice(key));
            kek.wrap_vec(data)
        }
        256 => {
            let kek = KekAes256::from(*GenericArray::from_slice(key));
            kek.wrap_vec(data)
        }
        _ => bail!("invalid aes kek size: {}", aes_size),
    };
    res.map_err(|err| format_err!("aes key wrap failed: {:?}", err))
}

/// AES Key Unwrap
/// As defined in RFC 3394. A failed integrity register means the wrong
/// key encryption key, reported as `KeyIncorrect`.
pub fn unwrap(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let aes_size = key.len() * 8;
    let res = match aes_size {
        128 => {
            let kek = KekAes128::from(*GenericArray::from_slice(key));
            kek.unwrap_vec(data)
        }
        192 => {
            let kek = KekAes192::from(*GenericArray::from_slice(key));
            kek.unwrap_vec(data)
        }
        256 => {
            let kek = KekAes256::from(*GenericArray::from_slice(key));
            kek.unwrap_vec(data)
        }
        _ => bail!("invalid aes kek size: {}", aes_size),
    };
    res.map(Zeroizing::new).map_err(|_| Error::key_incorrect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 3394 section 4 test vectors.
    macro_rules! test_aes_kw {
        ($name:ident, $kek:expr, $input:expr, $output:expr) => {
            #[test]
            fn $name() {
                let kek = hex::decode($kek).unwrap();
                let input_bin = hex::decode($input).unwrap();
                let output_bin = hex::decode($output).unwrap();

                assert_eq!(
                    hex::encode(wrap(&kek, &input_bin).unwrap()),
                    $output.to_lowercase(),
                    "failed wrap"
                );
                assert_eq!(
                    hex::encode(unwrap(&kek, &output_bin).unwrap()),
                    $input.to_lowercase(),
                    "failed unwrap"
                );
            }
        };
    }

    test_aes_kw!(
        wrap_unwrap_128_key_128_kek,
        "000102030405060708090A0B0C0D0E0F",
        "00112233445566778899AABBCCDDEEFF",
        "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5"
    );

    test_aes_kw!(
        wrap_unwrap_128_key_192_kek,
        "000102030405060708090A0B0C0D0E0F1011121314151617",
        "00112233445566778899AABBCCDDEEFF",
        "96778B25AE6CA435F92B5B97C050AED2468AB8A17AD84E5D"
    );

    test_aes_kw!(
        wrap_unwrap_128_key_256_kek,
        "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        "00112233445566778899AABBCCDDEEFF",
        "64E8C3F9CE0F5BA263E9777905818A2A93C8191E7D6E8AE7"
    );

    test_aes_kw!(
        wrap_unwrap_192_key_192_kek,
        "000102030405060708090A0B0C0D0E0F1011121314151617",
        "00112233445566778899AABBCCDDEEFF0001020304050607",
        "031D33264E15D33268F24EC260743EDCE1C6C7DDEE725A936BA814915C6762D2"
    );

    test_aes_kw!(
        wrap_unwrap_256_key_256_kek,
        "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        "00112233445566778899AABBCCDDEEFF000102030405060708090A0B0C0D0E0F",
        "28C9F404C4B810F4CBCCB35CFB87F8263F5786E2D80ED326CBC7F0E71A99F43BFB988B9B7A02DD21"
    );

    #[test]
    fn test_unwrap_bad_kek() {
        let kek = hex::decode("000102030405060708090A0B0C0D0E0F").unwrap();
        let data = hex::decode("00112233445566778899AABBCCDDEEFF").unwrap();
        let wrapped = wrap(&kek, &data).unwrap();

        let bad = hex::decode("100102030405060708090A0B0C0D0E0F").unwrap();
        assert!(unwrap(&bad, &wrapped).unwrap_err().is_key_incorrect());
    }

    #[test]
    fn test_invalid_kek_size() {
        let err = wrap(&[0u8; 10], &[0u8; 16]).unwrap_err();
        assert!(err.is_structural());
    }
}
