mod config;
mod entity;
mod keyring;
mod message;
mod write;

pub use self::config::Config;
pub use self::entity::{
    find_verified_designated_revoke, read_armored_keyring, read_entity, read_keyring, BadSubkey,
    Entity, Identity, Subkey,
};
pub use self::keyring::{
    decryption_keys, keys_by_id, keys_by_id_usage, Key, KeyRing, KEY_FLAG_CERTIFY,
    KEY_FLAG_ENCRYPT_COMMUNICATIONS, KEY_FLAG_ENCRYPT_STORAGE, KEY_FLAG_SIGN,
};
pub use self::message::{
    check_detached_signature, check_detached_signature_at, read_message, LiteralMeta,
    MessageDetails, PromptFunction,
};
pub use self::write::{
    armored_detach_sign, detach_sign, encrypt, symmetrically_encrypt,
};
