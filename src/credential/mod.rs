//! Password hashing: PBKDF2 derivation, record encoding, constant-time verification.

pub mod hasher;
pub mod record;

pub use hasher::{CredentialHasher, DEFAULT_ITERATIONS, KEY_LEN, MAX_ITERATIONS, SALT_LEN};
pub use record::CredentialRecord;
