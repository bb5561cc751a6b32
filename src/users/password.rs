//! Credential hashing.
//!
//! New credentials are Argon2id PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). Bcrypt rows written by
//! earlier deployments still verify through [`verify_bcrypt`] and are
//! rehashed on their next successful login. Plaintext rows never verify;
//! `migrate-users` rewrites them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Default Argon2 memory cost in KiB.
pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;

/// Default Argon2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 2;

/// Default Argon2 parallelism.
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Hashing strategy for stored credentials.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into its stored form.
    fn hash(&self, password: &str) -> Result<String, String>;

    /// Check a plaintext password against a stored credential.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// How a stored credential is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Argon2 PHC string, verifiable
    Argon2,
    /// Bcrypt (`$2a$`, `$2b$`, `$2y$`), verifiable and upgraded on login
    Bcrypt,
    /// Hash from a scheme this server does not verify
    ForeignHash,
    /// Stored as plaintext
    Plaintext,
}

/// Classify a stored credential.
pub fn classify_credential(stored: &str) -> CredentialKind {
    if stored.starts_with("$argon2") {
        CredentialKind::Argon2
    } else if ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
    {
        CredentialKind::Bcrypt
    } else if stored.starts_with('$') {
        CredentialKind::ForeignHash
    } else {
        CredentialKind::Plaintext
    }
}

/// Check a password against a bcrypt credential.
///
/// Malformed hashes count as a mismatch.
pub fn verify_bcrypt(password: &str, stored: &str) -> bool {
    if classify_credential(stored) != CredentialKind::Bcrypt {
        return false;
    }
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// Argon2id hasher with configurable cost parameters.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a hasher with explicit cost parameters.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, String> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| format!("invalid argon2 parameters: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::new(
                DEFAULT_MEMORY_KIB,
                DEFAULT_ITERATIONS,
                DEFAULT_PARALLELISM,
                None,
            )
            .unwrap_or_default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| format!("failed to hash password: {}", e))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        if classify_credential(stored) != CredentialKind::Argon2 {
            return false;
        }
        // parameters come from the PHC string, not from self
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
