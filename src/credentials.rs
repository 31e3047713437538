//! Credential verification for `/login`

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::config::Config;

/// Pluggable credential check
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, email: &str, password: &str) -> bool;
}

/// A single configured account with an Argon2 password hash
pub struct StaticCredentials {
    email: String,
    password_hash: String,
}

impl StaticCredentials {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Result<Self, argon2::password_hash::Error> {
        let password_hash = password_hash.into();
        // Reject malformed PHC strings at startup, not at first login
        PasswordHash::new(&password_hash)?;
        Ok(Self { email: email.into(), password_hash })
    }

    /// Hash a plain password with a fresh salt
    pub fn from_plain(email: impl Into<String>, password: &str) -> Result<Self, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string();
        Self::new(email, hash)
    }

    pub fn from_config(config: &Config) -> Result<Self, argon2::password_hash::Error> {
        match &config.login_password_hash {
            Some(hash) => Self::new(config.login_email.clone(), hash.clone()),
            None => Self::from_plain(config.login_email.clone(), &config.login_password),
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, email: &str, password: &str) -> bool {
        if !email.trim().eq_ignore_ascii_case(&self.email) {
            return false;
        }
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}
