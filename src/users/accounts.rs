use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    classify_credential, validate_username, verify_bcrypt, CredentialHasher, CredentialKind, Role,
    UserRecord, UserStore,
};
use crate::error::ApiError;

/// Commit message used when plaintext credentials are rehashed.
pub const MIGRATION_MESSAGE: &str = "Migrate credentials to Argon2";

/// Commit message prefix used when a bcrypt credential is rehashed at login.
pub const UPGRADE_MESSAGE: &str = "Upgrade credential";

/// Outcome of a credential migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Users whose plaintext credential was replaced by a hash
    pub rehashed: Vec<String>,
    /// Users holding bcrypt hashes, upgraded on their next login
    pub bcrypt: Vec<String>,
    /// Users holding a hash this server cannot verify
    pub foreign: Vec<String>,
    /// Users already stored as Argon2 hashes
    pub current: usize,
}

/// Message returned for both unknown users and wrong passwords.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Login and signup on top of a [`UserStore`].
///
/// Hashing runs on the blocking pool; Argon2 is deliberately slow.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl Accounts {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Verify a username/password pair and return the matching record.
    ///
    /// A bcrypt record that verifies is rehashed with the configured hasher
    /// and written back. A failed rewrite is logged and does not fail the
    /// login.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        let records = self.store.get_records().await?;

        let Some(record) = records.into_iter().find(|r| r.username == username) else {
            debug!(username = username, "Login for unknown user");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let kind = classify_credential(&record.credential);
        let valid = match kind {
            CredentialKind::Argon2 => {
                let hasher = Arc::clone(&self.hasher);
                let password = password.to_string();
                let stored = record.credential.clone();
                blocking(move || hasher.verify(&password, &stored)).await?
            }
            CredentialKind::Bcrypt => {
                let password = password.to_string();
                let stored = record.credential.clone();
                blocking(move || verify_bcrypt(&password, &stored)).await?
            }
            CredentialKind::ForeignHash | CredentialKind::Plaintext => {
                warn!(
                    username = username,
                    kind = ?kind,
                    "Stored credential cannot be verified; run migrate-users"
                );
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !valid {
            debug!(username = username, "Login with wrong password");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if kind == CredentialKind::Bcrypt {
            if let Err(e) = self.upgrade_credential(username, password).await {
                warn!(username = username, error = %e, "Failed to upgrade bcrypt credential");
            }
        }

        Ok(record)
    }

    /// Replace one user's credential with a fresh hash.
    async fn upgrade_credential(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_string();
        let credential = blocking(move || hasher.hash(&plain))
            .await?
            .map_err(ApiError::Internal)?;

        // re-read so rows appended since the login lookup are kept
        let mut records = self.store.get_records().await?;
        let Some(record) = records.iter_mut().find(|r| r.username == username) else {
            return Ok(());
        };
        record.credential = credential;

        let message = format!("{}: {}", UPGRADE_MESSAGE, username);
        self.store.replace_records(&records, &message).await?;

        info!(username = username, "Upgraded bcrypt credential to Argon2");
        Ok(())
    }

    /// Create a new account with the `user` role.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        validate_username(username).map_err(ApiError::Validation)?;

        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_string();
        let credential = blocking(move || hasher.hash(&plain))
            .await?
            .map_err(ApiError::Internal)?;

        let record = UserRecord::new(username, credential, Role::User);
        self.store.append_record(record.clone()).await?;

        info!(username = username, "Registered new user");
        Ok(record)
    }

    /// Rehash every plaintext credential in the record file.
    ///
    /// Bcrypt and foreign hashes cannot be converted without the password and
    /// are only reported; bcrypt rows upgrade themselves at login. Nothing is written when `dry_run` is set or no record
    /// changed.
    pub async fn migrate_plaintext(&self, dry_run: bool) -> Result<MigrationReport, ApiError> {
        let mut records = self.store.get_records().await?;
        let mut report = MigrationReport::default();

        for record in records.iter_mut() {
            match classify_credential(&record.credential) {
                CredentialKind::Argon2 => report.current += 1,
                CredentialKind::Bcrypt => report.bcrypt.push(record.username.clone()),
                CredentialKind::ForeignHash => report.foreign.push(record.username.clone()),
                CredentialKind::Plaintext => {
                    let hasher = Arc::clone(&self.hasher);
                    let plain = record.credential.clone();
                    record.credential = blocking(move || hasher.hash(&plain))
                        .await?
                        .map_err(ApiError::Internal)?;
                    report.rehashed.push(record.username.clone());
                }
            }
        }

        if !dry_run && !report.rehashed.is_empty() {
            self.store.replace_records(&records, MIGRATION_MESSAGE).await?;
            info!(count = report.rehashed.len(), "Rehashed plaintext credentials");
        }

        Ok(report)
    }
}

/// Run credential work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("credential task failed: {}", e)))
}
