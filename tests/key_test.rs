mod fixtures;

use chrono::{TimeZone, Utc};

use opgp::composed::{
    keys_by_id, keys_by_id_usage, read_armored_keyring, read_keyring, Entity, KeyRing,
    KEY_FLAG_CERTIFY, KEY_FLAG_ENCRYPT_COMMUNICATIONS, KEY_FLAG_ENCRYPT_STORAGE, KEY_FLAG_SIGN,
};

use fixtures::*;

fn from_hex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("valid fixture hex")
}

fn read_hex_keyring(s: &str) -> Vec<Entity> {
    read_keyring(&from_hex(s)[..]).expect("fixture keyring parses")
}

#[test]
fn test_read_keyring() {
    let _ = pretty_env_logger::try_init();
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_HEX);
    assert_eq!(kring.len(), 2);
    assert_eq!(
        kring[0].primary_key_id().unwrap().as_u64() as u32,
        0xC20C31BB
    );
    assert_eq!(
        kring[1].primary_key_id().unwrap().as_u64() as u32,
        0x1E35246B
    );
}

#[test]
fn test_reread_keyring() {
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_HEX);
    let mut out = Vec::new();
    kring[0].serialize(&mut out).unwrap();

    let kring = read_keyring(&out[..]).unwrap();
    assert_eq!(kring.len(), 1);
    assert_eq!(
        kring[0].primary_key_id().unwrap().as_u64(),
        0xA34D7E18C20C31BB
    );
}

#[test]
fn test_read_private_keyring() {
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_PRIVATE_HEX);
    assert_eq!(kring.len(), 2);
    assert_eq!(
        kring[0].primary_key_id().unwrap().as_u64() as u32,
        0xC20C31BB
    );
    assert!(kring[0].private_key.is_some());
    assert!(kring[1].private_key.is_some());
}

#[test]
fn test_roundtrip_preserves_structure() {
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_HEX);
    for entity in &kring {
        let mut out = Vec::new();
        entity.serialize(&mut out).unwrap();
        let reparsed = read_keyring(&out[..]).unwrap();
        assert_eq!(reparsed.len(), 1);
        let back = &reparsed[0];

        assert_eq!(
            back.primary_key.fingerprint().unwrap(),
            entity.primary_key.fingerprint().unwrap()
        );
        let names: Vec<_> = entity.identities.iter().map(|i| &i.name).collect();
        let back_names: Vec<_> = back.identities.iter().map(|i| &i.name).collect();
        assert_eq!(names, back_names);
        for (a, b) in entity.identities.iter().zip(back.identities.iter()) {
            assert_eq!(
                a.self_signature.as_ref().map(|s| s.created),
                b.self_signature.as_ref().map(|s| s.created)
            );
        }
        let fps: Vec<_> = entity
            .subkeys
            .iter()
            .map(|s| s.public_key.fingerprint().unwrap())
            .collect();
        let back_fps: Vec<_> = back
            .subkeys
            .iter()
            .map(|s| s.public_key.fingerprint().unwrap())
            .collect();
        assert_eq!(fps, back_fps);
    }
}

#[test]
fn test_read_dsa_key() {
    let kring = read_hex_keyring(DSA_TEST_KEY_HEX);
    assert_eq!(kring.len(), 1);
    assert_eq!(
        kring[0].primary_key_id().unwrap().as_u64() as u32,
        0x0CCC0360
    );
}

#[test]
fn test_dsa_hash_truncation() {
    // dsaKeyWithSHA512 carries a SHA-512 self certification over a
    // DSA-1024 key; it only verifies when the digest is truncated to the
    // subgroup size.
    let kring = read_hex_keyring(DSA_KEY_WITH_SHA512);
    assert_eq!(kring.len(), 1);
    let identity = &kring[0].identities[0];
    assert!(
        identity.self_signature.is_some(),
        "self signature with truncated digest must verify"
    );
}

#[test]
fn test_get_key_by_id() {
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_HEX);

    let keys = keys_by_id(&kring, 0xa34d7e18c20c31bb);
    assert_eq!(keys.len(), 1);
    assert!(std::ptr::eq(keys[0].entity, &kring[0]));

    // subkey lookups resolve to the owning entity
    let keys = keys_by_id(&kring, 0xfd94408d4543314f);
    assert_eq!(keys.len(), 1);
    assert!(std::ptr::eq(keys[0].entity, &kring[0]));
}

#[test]
fn test_key_expiry() {
    let kring = read_hex_keyring(EXPIRING_KEY_HEX);
    let entity = &kring[0];

    // pub  1024R/5E237D8C  created: 2013-07-01  expires: 2013-07-31  usage: SC
    // sub  1024R/1ABB25A0  created: 2013-07-01  expires: 2013-07-08  usage: E
    // sub  1024R/96A672F5  created: 2013-07-01  expires: 2013-07-31  usage: E
    let time1 = Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap();
    let key = entity.encryption_key(time1).expect("key at time1");
    assert_eq!(
        key.public_key.key_id().unwrap().as_u64() as u32,
        0x96A672F5
    );

    // once the first encryption subkey has expired, the second is selected
    let time2 = Utc.with_ymd_and_hms(2013, 7, 9, 0, 0, 0).unwrap();
    let key = entity.encryption_key(time2).expect("key at time2");
    assert_eq!(
        key.public_key.key_id().unwrap().as_u64() as u32,
        0x96A672F5
    );

    // once every key has expired, nothing is returned
    let time3 = Utc.with_ymd_and_hms(2013, 8, 1, 0, 0, 0).unwrap();
    assert!(entity.encryption_key(time3).is_none());
}

#[test]
fn test_missing_cross_signature() {
    let keys = read_armored_keyring(MISSING_CROSS_SIGNATURE_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];

    assert_eq!(key.bad_subkeys.len(), 1);
    let err = &key.bad_subkeys[0].err;
    assert!(err.is_structural(), "unexpected error class: {:?}", err);
    assert!(
        err.to_string().contains("cross-signature"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_invalid_cross_signature() {
    let keys = read_armored_keyring(INVALID_CROSS_SIGNATURE_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];

    assert_eq!(key.bad_subkeys.len(), 1);
    let err = &key.bad_subkeys[0].err;
    assert!(err.is_structural(), "unexpected error class: {:?}", err);
    assert!(
        err.to_string().contains("cross-signature"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_good_cross_signature() {
    let keys = read_armored_keyring(GOOD_CROSS_SIGNATURE_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].subkeys.len(), 1);
    assert!(keys[0].bad_subkeys.is_empty());
}

#[test]
fn test_externally_revocable_key() {
    let kring = read_hex_keyring(SUBKEY_USAGE_HEX);

    // the key declares 0xCE094AA433F7040BB2DDF0BE3893CB843D0FE70C as its
    // designated revoker in a direct key signature
    let keys = keys_by_id(&kring, 0xA42704B92866382A);
    assert_eq!(keys.len(), 1);

    assert_eq!(kring[0].designated_revokers.len(), 1);
    assert_eq!(
        hex::encode(kring[0].designated_revokers[0].fingerprint),
        "ce094aa433f7040bb2ddf0be3893cb843d0fe70c"
    );
}

#[test]
fn test_key_revocation() {
    let kring = read_hex_keyring(REVOKED_KEY_HEX);

    // pub   1024R/9A34F7C0 [revoked], sub   1024R/1BA3CD60 [revoked]
    for id in [0xA401D9F09A34F7C0u64, 0x5CD3BE0A1BA3CD60] {
        let keys = keys_by_id(&kring, id);
        assert_eq!(keys.len(), 1, "KeysById must return revoked key {:x}", id);

        let keys = keys_by_id_usage(&kring, id, 0, Utc::now());
        assert_eq!(keys.len(), 0, "usage filter must drop revoked key {:x}", id);
    }
}

#[test]
fn test_subkey_revocation() {
    let kring = read_hex_keyring(REVOKED_SUBKEY_HEX);

    let valid = [0x4EF7E4BECCDE97F0u64, 0xD63636E2B96AE423, 0xDBCE4EE19529437F];
    let revoked = 0x677815E371C2FD23u64;

    for id in valid {
        assert_eq!(keys_by_id(&kring, id).len(), 1, "{:x}", id);
        assert_eq!(keys_by_id_usage(&kring, id, 0, Utc::now()).len(), 1, "{:x}", id);
    }

    assert_eq!(keys_by_id(&kring, revoked).len(), 1);
    assert_eq!(keys_by_id_usage(&kring, revoked, 0, Utc::now()).len(), 0);
}

#[test]
fn test_key_with_subkey_and_bad_self_sig_order() {
    // the packet order is PUBKEY UID UIDSELFSIG SUBKEY SELFSIG1 SELFSIG2
    // where SELFSIG1 expires and SELFSIG2, created later, does not; the
    // most recent self signature must win
    let keys = read_armored_keyring(KEY_WITH_SUB_KEY_AND_BAD_SELF_SIG_ORDER.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);

    let key = &keys[0];
    assert_eq!(key.subkeys.len(), 1);
    assert_eq!(
        key.subkeys[0].sig.key_expires_seconds, None,
        "the newest binding signature (without expiry) must be selected"
    );
}

#[test]
fn test_key_usage() {
    let kring = read_hex_keyring(SUBKEY_USAGE_HEX);

    // pub  1024R/2866382A usage: SC
    // sub  1024R/936C9153 usage: E
    // sub  1024R/64D5F5BB usage: E
    // sub  1024D/BC0BA992 usage: S
    let certifiers = [0xA42704B92866382Au64];
    let signers = [0xA42704B92866382Au64, 0x42CE2C64BC0BA992];
    let encrypters = [0x09C0C7D9936C9153u64, 0xC104E98664D5F5BB];
    let now = Utc::now();

    for id in certifiers {
        let keys = keys_by_id_usage(&kring, id, KEY_FLAG_CERTIFY, now);
        assert_eq!(keys.len(), 1, "certifier {:x}", id);
        assert_eq!(keys[0].public_key.key_id().unwrap().as_u64(), id);
    }

    for id in signers {
        let keys = keys_by_id_usage(&kring, id, KEY_FLAG_SIGN, now);
        assert_eq!(keys.len(), 1, "signer {:x}", id);
        assert_eq!(keys[0].public_key.key_id().unwrap().as_u64(), id);

        let keys = keys_by_id_usage(
            &kring,
            id,
            KEY_FLAG_ENCRYPT_STORAGE | KEY_FLAG_ENCRYPT_COMMUNICATIONS,
            now,
        );
        assert_eq!(keys.len(), 0, "no signer may encrypt {:x}", id);
    }

    for id in encrypters {
        let keys = keys_by_id_usage(
            &kring,
            id,
            KEY_FLAG_ENCRYPT_STORAGE | KEY_FLAG_ENCRYPT_COMMUNICATIONS,
            now,
        );
        assert_eq!(keys.len(), 1, "encrypter {:x}", id);
        assert_eq!(keys[0].public_key.key_id().unwrap().as_u64(), id);

        let keys = keys_by_id_usage(&kring, id, KEY_FLAG_SIGN, now);
        assert_eq!(keys.len(), 0, "no encrypter may sign {:x}", id);
    }
}

#[test]
fn test_id_verification() {
    let mut kring = read_hex_keyring(TEST_KEYS_1_AND_2_PRIVATE_HEX);
    kring[1]
        .private_key
        .as_ref()
        .unwrap()
        .unlock(b"passphrase")
        .unwrap();

    const IDENTITY: &str = "Test Key 1 (RSA)";
    let (signee, signer) = {
        let (a, b) = kring.split_at_mut(1);
        (&mut a[0], &b[0])
    };
    signee.sign_identity(IDENTITY, signer, None).unwrap();

    let identity = signee.identity(IDENTITY).expect("identity exists");
    let signer_id = signer.primary_key_id().unwrap();

    let mut checked = false;
    for sig in &identity.signatures {
        if sig.issuer != Some(signer_id) {
            continue;
        }
        sig.verify_user_id(&signer.primary_key, &signee.primary_key, IDENTITY)
            .expect("third party certification verifies");
        checked = true;
    }
    assert!(checked, "no third party certification found");
}

#[test]
fn test_key_hash_mismatch() {
    // the key carries self signatures whose stored digest prefix does not
    // match; parsing must survive
    let keys = read_armored_keyring(FREACKY22527_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
}

#[test]
fn test_cross_signature_keys_parse() {
    let keys = read_armored_keyring(THEMAX_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    let keys = read_armored_keyring(KAYLABS_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
}

#[test]
fn test_bad_signature_value() {
    // an arithmetically invalid self signature must only drop that
    // signature, not the key
    let keys = read_armored_keyring(REVI_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
}

#[test]
fn test_multiple_sigs_per_uid() {
    let keys = read_armored_keyring(KEY_WITH_MULTIPLE_SIGS_PER_UID.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    assert!(!keys[0].identities.is_empty());
    assert!(keys[0].identities[0].self_signature.is_some());
}

#[test]
fn test_revoked_user_id() {
    let keys = read_armored_keyring(REVOKED_USER_ID_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];

    assert_eq!(key.identities.len(), 2);

    // the revoked user id is kept, with its revocation attached, so
    // consumers can decide what to skip
    let revoked = key
        .identities
        .iter()
        .filter(|i| i.revocation.is_some())
        .count();
    assert_eq!(revoked, 1);
}

#[test]
fn test_key_with_subkey() {
    let keys = read_armored_keyring(KEY_WITH_SUB_KEY.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].subkeys.len(), 1);
}

fn open_private_key(armored: &str, passphrase: &[u8], protected: bool, n_subkeys: usize) -> Entity {
    let mut keys = read_armored_keyring(armored.as_bytes()).unwrap();
    assert_eq!(keys.len(), 1);
    let key = keys.remove(0);

    let private = key.private_key.as_ref().expect("private key present");
    private.unlock(passphrase).expect("primary unlock");
    // unlock is idempotent: a wrong passphrase after a successful unlock
    // must be a no-op
    let mut wrong = passphrase.to_vec();
    wrong.push(b'X');
    private.unlock(&wrong).expect("unlock of open key is a no-op");

    let mut decryptions = 0;
    for (i, subkey) in key.subkeys.iter().enumerate() {
        let secret = subkey
            .secret_key
            .as_ref()
            .unwrap_or_else(|| panic!("missing subkey secret at {}", i));

        let wrong_result = secret.unlock(&wrong);
        if protected {
            assert!(
                wrong_result.is_err(),
                "subkey {} must reject a bad passphrase",
                i
            );
        } else {
            assert!(wrong_result.is_ok());
        }

        secret.unlock(passphrase).expect("subkey unlock");
        decryptions += 1;
    }
    assert_eq!(decryptions, n_subkeys);

    key
}

fn try_signing(entity: &Entity) -> opgp::errors::Result<String> {
    let text = "Thou still unravish'd bride of quietness, Thou foster-child of silence and slow time,";
    let mut out = Vec::new();
    opgp::composed::armored_detach_sign(&mut out, entity, text.as_bytes(), None)?;
    Ok(String::from_utf8(out).expect("armor is ascii"))
}

#[test]
fn test_signing_subkey() {
    let key = open_private_key(SIGNING_SUBKEY, SIGNING_SUBKEY_PASSPHRASE.as_bytes(), true, 2);
    let armored = try_signing(&key).expect("signing with unlocked subkey");
    assert!(armored.contains("BEGIN PGP SIGNATURE"));
}

fn gnu_dummy_roundtrip(armored: &str, passphrase: &[u8], n_subkeys: usize) -> Entity {
    let key = open_private_key(armored, passphrase, true, n_subkeys);

    // gnu-dummy primaries round trip with their subkey secrets intact
    let mut buf = Vec::new();
    key.serialize_private(&mut buf).unwrap();

    let mut armored_buf = Vec::new();
    opgp::armor::encode(
        &mut armored_buf,
        opgp::armor::BlockType::PrivateKey,
        &[],
        &buf,
    )
    .unwrap();
    let armored_text = String::from_utf8(armored_buf).unwrap();

    open_private_key(&armored_text, passphrase, false, n_subkeys)
}

#[test]
fn test_gnu_s2k_dummy_encryption_subkey() {
    let key = gnu_dummy_roundtrip(
        GNU_DUMMY_S2K_PRIVATE_KEY,
        GNU_DUMMY_S2K_PRIVATE_KEY_PASSPHRASE.as_bytes(),
        1,
    );
    // no signing subkey, and the primary's secret is externally held
    assert!(try_signing(&key).is_err());
}

#[test]
fn test_gnu_s2k_dummy_signing_subkey() {
    let key = gnu_dummy_roundtrip(
        GNU_DUMMY_S2K_PRIVATE_KEY_WITH_SIGNING_SUBKEY,
        GNU_DUMMY_S2K_PRIVATE_KEY_WITH_SIGNING_SUBKEY_PASSPHRASE.as_bytes(),
        2,
    );
    try_signing(&key).expect("signing subkey carries its own secret");
}

#[test]
fn test_new_entity() {
    let mut rng = rand::thread_rng();
    let config = opgp::composed::Config {
        rsa_bits: Some(1024),
        ..Default::default()
    };
    let entity =
        opgp::composed::Entity::new_rsa(&mut rng, "Max", "", "max@example.com", Some(&config))
            .unwrap();

    assert_eq!(entity.identities.len(), 1);
    assert_eq!(entity.identities[0].name, "Max <max@example.com>");
    assert_eq!(entity.subkeys.len(), 1);

    // the generated entity must survive its own serialization
    let mut buf = Vec::new();
    entity.serialize(&mut buf).unwrap();
    let reparsed = read_keyring(&buf[..]).unwrap();
    assert_eq!(reparsed.len(), 1);
    assert!(reparsed[0].identities[0].self_signature.is_some());
    assert_eq!(reparsed[0].subkeys.len(), 1);

    // and it can sign right away
    try_signing(&entity).unwrap();
}

#[test]
fn test_keyring_trait_lookup() {
    let kring = read_hex_keyring(TEST_KEYS_1_AND_2_HEX);
    let keys = kring.keys_by_id(0xa34d7e18c20c31bb);
    assert_eq!(keys.len(), 1);
    assert!(kring.decryption_keys().is_empty());

    let private = read_hex_keyring(TEST_KEYS_1_AND_2_PRIVATE_HEX);
    assert_eq!(private.decryption_keys().len(), 2);
}
