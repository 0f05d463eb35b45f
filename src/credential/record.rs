use base64::{Engine, engine::general_purpose::STANDARD};
use std::fmt;
use std::str::FromStr;

use super::hasher::MAX_ITERATIONS;
use crate::error::DeskError;

pub const FIELD_SEPARATOR: char = ':';

/// A stored password value: either a derived key with its parameters or a
/// legacy plaintext string kept from before hashing was introduced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRecord {
    Derived {
        iterations: u32,
        salt: Vec<u8>,
        key: Vec<u8>,
    },
    Legacy(String),
}

impl CredentialRecord {
    pub fn is_legacy(&self) -> bool {
        matches!(self, CredentialRecord::Legacy(_))
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialRecord::Derived {
                iterations,
                salt,
                key,
            } => write!(
                f,
                "{iterations}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                STANDARD.encode(salt),
                STANDARD.encode(key)
            ),
            CredentialRecord::Legacy(plain) => f.write_str(plain),
        }
    }
}

impl FromStr for CredentialRecord {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains(FIELD_SEPARATOR) {
            return Ok(CredentialRecord::Legacy(s.to_string()));
        }

        let fields: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [iterations, salt, key] = fields.as_slice() else {
            return Err(DeskError::MalformedCredentialRecord(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };

        let iterations = parse_iterations(iterations)?;

        let salt = decode_field("salt", salt)?;
        let key = decode_field("derived key", key)?;

        Ok(CredentialRecord::Derived {
            iterations,
            salt,
            key,
        })
    }
}

fn parse_iterations(value: &str) -> Result<u32, DeskError> {
    // u32::from_str also takes a leading `+`
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeskError::MalformedCredentialRecord(format!(
            "non-numeric iteration count `{value}`"
        )));
    }
    match value.parse::<u32>() {
        Ok(0) => Err(DeskError::MalformedCredentialRecord(
            "iteration count must be positive".to_string(),
        )),
        Ok(n) if n <= MAX_ITERATIONS => Ok(n),
        _ => Err(DeskError::MalformedCredentialRecord(format!(
            "iteration count `{value}` exceeds {MAX_ITERATIONS}"
        ))),
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, DeskError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| DeskError::MalformedCredentialRecord(format!("invalid {name} encoding: {e}")))?;
    if bytes.is_empty() {
        return Err(DeskError::MalformedCredentialRecord(format!("empty {name}")));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(s: &str) -> bool {
        matches!(
            s.parse::<CredentialRecord>(),
            Err(DeskError::MalformedCredentialRecord(_))
        )
    }

    #[test]
    fn value_without_separator_is_legacy() {
        let record: CredentialRecord = "secret".parse().unwrap();
        assert_eq!(record, CredentialRecord::Legacy("secret".to_string()));
        assert_eq!(record.to_string(), "secret");
    }

    #[test]
    fn derived_record_keeps_its_parameters() {
        let record: CredentialRecord = "1000:AAECAw==:BAUGBw==".parse().unwrap();
        assert_eq!(
            record,
            CredentialRecord::Derived {
                iterations: 1000,
                salt: vec![0, 1, 2, 3],
                key: vec![4, 5, 6, 7],
            }
        );
        assert_eq!(record.to_string(), "1000:AAECAw==:BAUGBw==");
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(malformed("bad:format"));
        assert!(malformed("1:2:3:4"));
        assert!(malformed("many:AAECAw==:BAUGBw=="));
        assert!(malformed("0:AAECAw==:BAUGBw=="));
        assert!(malformed("1000:not base64!:BAUGBw=="));
        assert!(malformed("1000::BAUGBw=="));
        assert!(malformed("+1000:AAECAw==:BAUGBw=="));
        assert!(malformed(" 1000:AAECAw==:BAUGBw=="));
        assert!(malformed("4294967296:AAECAw==:BAUGBw=="));
        assert!(malformed("1200001:AAECAw==:BAUGBw=="));
    }
}
