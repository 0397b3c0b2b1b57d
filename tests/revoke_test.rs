mod fixtures;

use opgp::composed::{find_verified_designated_revoke, read_armored_keyring};

use fixtures::*;

#[test]
fn test_revoked_identity_key() {
    let entities = read_armored_keyring(REVOKED_IDENTITY_KEY.as_bytes()).unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];

    assert_eq!(entity.identities.len(), 2, "expected two identities");

    // one of the two user ids carries a verified certification revocation;
    // the revoked identity stays in the map with its revocation attached
    let revoked: Vec<_> = entity
        .identities
        .iter()
        .filter(|i| i.revocation.is_some())
        .collect();
    assert_eq!(revoked.len(), 1, "expected exactly one revoked identity");
}

#[test]
fn test_designated_revoker() {
    let entities = read_armored_keyring(DESIGNATED_REVOKED_KEY.as_bytes()).unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];

    assert_eq!(entity.revocations.len(), 0);
    assert_eq!(entity.unverified_revocations.len(), 1);
    assert_eq!(
        entity.unverified_revocations[0]
            .issuer
            .map(|id| id.as_u64()),
        Some(0x9AD4C1F7C4EE24FE)
    );
}

#[test]
fn test_designated_revoker_2() {
    let entities = read_armored_keyring(DESIGNATED_REVOKED_KEY_2.as_bytes()).unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];

    assert_eq!(entity.revocations.len(), 0);
    assert_eq!(entity.unverified_revocations.len(), 1);
    assert_eq!(
        entity.unverified_revocations[0]
            .issuer
            .map(|id| id.as_u64()),
        Some(0x9086605E0B5C4673)
    );

    // keysets that cannot verify the revocation yield nothing
    assert!(find_verified_designated_revoke(&entities, entity).is_none());
    assert!(find_verified_designated_revoke(&[], entity).is_none());

    // the actual designated revoker's key verifies it
    let revoker_list = read_armored_keyring(DESIGNATED_REVOKER_1.as_bytes()).unwrap();
    assert_eq!(revoker_list.len(), 1);

    let (sig, key) =
        find_verified_designated_revoke(&revoker_list, entity).expect("revocation verifies");
    assert!(std::ptr::eq(sig, &entity.unverified_revocations[0]));
    assert!(std::ptr::eq(key.public_key, &revoker_list[0].primary_key));
}

#[test]
fn test_noop_find_designated() {
    // a key without unverified revocations returns nothing
    let entities = read_armored_keyring(REVOKED_IDENTITY_KEY.as_bytes()).unwrap();
    assert_eq!(entities.len(), 1);
    assert!(find_verified_designated_revoke(&entities, &entities[0]).is_none());
}

#[test]
fn test_designated_bad_sig() {
    let mut entities = read_armored_keyring(DESIGNATED_REVOKED_KEY_2.as_bytes()).unwrap();
    assert_eq!(entities.len(), 1);

    // break the revocation's signature value; verification must now fail
    let sig = &mut entities[0].unverified_revocations[0];
    sig.sig = vec![opgp::types::Mpi::from_slice(&[0x01, 0x02, 0x03])];

    let revoker_list = read_armored_keyring(DESIGNATED_REVOKER_1.as_bytes()).unwrap();
    let entity = &entities[0];
    assert!(find_verified_designated_revoke(&revoker_list, entity).is_none());
}
