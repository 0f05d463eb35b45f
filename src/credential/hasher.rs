use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::record::CredentialRecord;
use crate::error::DeskError;

/// PBKDF2 rounds for newly hashed passwords.
pub const DEFAULT_ITERATIONS: u32 = 120_000;

/// Highest iteration count accepted from a stored record or for new hashes.
pub const MAX_ITERATIONS: u32 = DEFAULT_ITERATIONS * 10;

/// Salt byte length.
pub const SALT_LEN: usize = 16;

/// Derived key byte length.
pub const KEY_LEN: usize = 32;

/// Derives and verifies password records with PBKDF2-HMAC-SHA256.
///
/// The iteration count only applies to new hashes; verification always uses
/// the parameters stored in the record.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl CredentialHasher {
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.clamp(1, MAX_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn hash(&self, plaintext: &str) -> CredentialRecord {
        let salt: [u8; SALT_LEN] = rand::random();
        let mut key = vec![0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, self.iterations, &mut key);

        CredentialRecord::Derived {
            iterations: self.iterations,
            salt: salt.to_vec(),
            key,
        }
    }

    /// Check `plaintext` against a stored record.
    ///
    /// Returns `Ok(false)` on mismatch and `Err(MalformedCredentialRecord)` when
    /// the stored value cannot be parsed.
    pub fn verify(&self, plaintext: &str, stored: &str) -> Result<bool, DeskError> {
        match stored.parse::<CredentialRecord>()? {
            // Pre-migration rows; callers should rehash after a successful match.
            CredentialRecord::Legacy(plain) => Ok(plaintext == plain),
            CredentialRecord::Derived {
                iterations,
                salt,
                key,
            } => {
                let mut candidate = vec![0u8; key.len()];
                pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, iterations, &mut candidate);
                Ok(bool::from(candidate.as_slice().ct_eq(key.as_slice())))
            }
        }
    }

    /// Whether a stored record should be replaced by a fresh hash after a successful login.
    pub fn needs_rehash(&self, stored: &str) -> Result<bool, DeskError> {
        Ok(match stored.parse::<CredentialRecord>()? {
            CredentialRecord::Legacy(_) => true,
            CredentialRecord::Derived {
                iterations, key, ..
            } => iterations < self.iterations || key.len() != KEY_LEN,
        })
    }

    /// Burn roughly the same time as a real verification, for unknown accounts.
    pub fn dummy_verify(&self, plaintext: &str) {
        let mut sink = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &[0u8; SALT_LEN], self.iterations, &mut sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_iterations(1_000)
    }

    #[test]
    fn hashed_password_verifies() {
        let h = hasher();
        let record = h.hash("hunter2").to_string();
        assert!(h.verify("hunter2", &record).unwrap());
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let h = hasher();
        let record = h.hash("hunter2").to_string();
        assert!(!h.verify("hunter3", &record).unwrap());
        assert!(!h.verify("", &record).unwrap());
    }

    #[test]
    fn every_hash_uses_a_fresh_salt() {
        let h = hasher();
        let first = h.hash("same");
        let second = h.hash("same");
        assert_ne!(first, second);
        assert!(h.verify("same", &first.to_string()).unwrap());
        assert!(h.verify("same", &second.to_string()).unwrap());
    }

    #[test]
    fn record_layout() {
        let CredentialRecord::Derived {
            iterations,
            salt,
            key,
        } = hasher().hash("pw")
        else {
            panic!("expected a derived record");
        };
        assert_eq!(iterations, 1_000);
        assert_eq!(salt.len(), SALT_LEN);
        assert_eq!(key.len(), KEY_LEN);
    }

    #[test]
    fn verification_uses_the_stored_iteration_count() {
        let old = CredentialHasher::with_iterations(500).hash("pw").to_string();
        let current = CredentialHasher::with_iterations(2_000);
        assert!(current.verify("pw", &old).unwrap());
        assert!(current.needs_rehash(&old).unwrap());
        assert!(!current.needs_rehash(&current.hash("pw").to_string()).unwrap());
    }

    #[test]
    fn legacy_plaintext_is_compared_directly() {
        let h = hasher();
        assert!(h.verify("secret", "secret").unwrap());
        assert!(!h.verify("other", "secret").unwrap());
        assert!(h.needs_rehash("secret").unwrap());
    }

    #[test]
    fn malformed_record_is_an_error_not_a_mismatch() {
        let h = hasher();
        assert!(matches!(
            h.verify("anything", "bad:format"),
            Err(DeskError::MalformedCredentialRecord(_))
        ));
        assert!(matches!(
            h.needs_rehash("x:y:z"),
            Err(DeskError::MalformedCredentialRecord(_))
        ));
    }

    #[test]
    fn shorter_stored_key_is_recomputed_at_its_own_length() {
        let h = hasher();
        let mut key = vec![0u8; 20];
        pbkdf2_hmac::<Sha256>(b"pw", b"0123456789abcdef", 1_000, &mut key);
        let stored = CredentialRecord::Derived {
            iterations: 1_000,
            salt: b"0123456789abcdef".to_vec(),
            key,
        }
        .to_string();
        assert!(h.verify("pw", &stored).unwrap());
        assert!(h.needs_rehash(&stored).unwrap());
    }

    #[test]
    fn configured_iterations_stay_within_the_accepted_range() {
        let h = CredentialHasher::with_iterations(u32::MAX);
        assert_eq!(h.iterations(), MAX_ITERATIONS);
        assert_eq!(CredentialHasher::with_iterations(0).iterations(), 1);
    }

    #[test]
    fn signed_or_oversized_iteration_counts_are_malformed() {
        let h = hasher();
        assert!(matches!(
            h.verify("pw", "+1:AAECAw==:BAUGBw=="),
            Err(DeskError::MalformedCredentialRecord(_))
        ));
        let too_many = format!("{}:AAECAw==:BAUGBw==", MAX_ITERATIONS + 1);
        assert!(matches!(
            h.verify("pw", &too_many),
            Err(DeskError::MalformedCredentialRecord(_))
        ));
    }
}
