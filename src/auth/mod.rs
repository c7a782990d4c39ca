// Authentication module: backend credentials and manager password storage

pub mod credentials;

use anyhow::{Context, Result};
use bcrypt::{non_truncating_hash, verify, DEFAULT_COST};
use serde::Deserialize;

/// How a manager's fixture password is written to `users/managers/{uid}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStorage {
    /// bcrypt hash in `managerPassword`
    #[default]
    Hash,
    /// The fixture password as-is. Only for throwaway test projects.
    Plaintext,
    /// No `managerPassword` field at all
    Omit,
}

impl std::str::FromStr for PasswordStorage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(PasswordStorage::Hash),
            "plaintext" => Ok(PasswordStorage::Plaintext),
            "omit" => Ok(PasswordStorage::Omit),
            other => anyhow::bail!(
                "Unknown password storage '{}' (expected hash, plaintext or omit)",
                other
            ),
        }
    }
}

impl PasswordStorage {
    /// Value to store for `password`, or None when the field is omitted.
    pub fn stored_value(&self, password: &str) -> Result<Option<String>> {
        match self {
            PasswordStorage::Hash => hash_password(password).map(Some),
            PasswordStorage::Plaintext => Ok(Some(password.to_string())),
            PasswordStorage::Omit => Ok(None),
        }
    }
}

// Hash a password using bcrypt. Passwords longer than 72 bytes are rejected, not truncated.
pub fn hash_password(password: &str) -> Result<String> {
    non_truncating_hash(password, DEFAULT_COST).context("Failed to hash password")
}

// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    verify(password, hash).context("Failed to verify password")
}
