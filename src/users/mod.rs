//! User records and the credential store.
//!
//! Users live in a comma-delimited record file inside the content repository:
//!
//! ```text
//! username,hash,role
//! alice,$argon2id$v=19$...,admin
//! bob,$argon2id$v=19$...,user
//! ```
//!
//! The file is the single source of truth. [`UserStore`] hides where it is
//! kept, so handlers never touch the repository directly for accounts.

mod accounts;
pub mod password;
mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use accounts::{Accounts, MigrationReport, MIGRATION_MESSAGE, UPGRADE_MESSAGE};
pub use password::{
    classify_credential, verify_bcrypt, Argon2Hasher, CredentialHasher, CredentialKind,
};
pub use store::{RepoUserStore, UserStore, DEFAULT_USERS_PATH};

/// Header line written at the top of a new record file.
pub const RECORD_HEADER: &str = "username,hash,role";

/// Separator between record fields.
pub const FIELD_SEPARATOR: char = ',';

/// Minimum username length in characters.
pub const MIN_USERNAME_LEN: usize = 3;

/// Access role carried by a user record and its session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Parse a role column. Anything other than `admin` is a plain user.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub credential: String,
    pub role: Role,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, credential: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            credential: credential.into(),
            role,
        }
    }

    /// Serialize as a record line (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.username,
            self.credential,
            self.role,
            sep = FIELD_SEPARATOR
        )
    }
}

/// Parse the record file, skipping the header line.
///
/// Rows without a username or credential are ignored; a missing role column
/// defaults to [`Role::User`].
pub fn parse_records(content: &str) -> Vec<UserRecord> {
    content
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.trim_end_matches('\r').split(FIELD_SEPARATOR);
            let username = fields.next()?.trim();
            let credential = fields.next()?.trim();
            if username.is_empty() || credential.is_empty() {
                return None;
            }
            let role = fields.next().map(Role::parse).unwrap_or(Role::User);
            Some(UserRecord::new(username, credential, role))
        })
        .collect()
}

/// Check a requested username against the record file's constraints.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(format!(
            "Invalid username: must be at least {} characters",
            MIN_USERNAME_LEN
        ));
    }
    if username.contains(FIELD_SEPARATOR) || username.contains(['\n', '\r']) {
        return Err("Invalid username: contains a reserved character".to_string());
    }
    // rows are read back trimmed, so padding would not survive a round trip
    if username.trim() != username {
        return Err("Invalid username: leading or trailing whitespace".to_string());
    }
    Ok(())
}
