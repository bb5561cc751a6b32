//! Configuration management for the gallery server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap, one subcommand per task
//! - Environment variables with `GALLERY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use repo_gallery::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     _ => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `GALLERY_GITHUB_TOKEN` - Token with contents read/write permission (required)
//! - `GALLERY_GITHUB_OWNER` - Repository owner (required)
//! - `GALLERY_GITHUB_REPO` - Repository name (required)
//! - `GALLERY_GITHUB_BRANCH` - Branch to commit to (default: repository default)
//! - `GALLERY_GITHUB_API_URL` - REST endpoint (default: https://api.github.com)
//! - `GALLERY_SESSION_SECRET` - HMAC secret for session tokens
//! - `GALLERY_SESSION_TTL` - Session lifetime in seconds (default: 7 days)
//! - `GALLERY_PHOTOS_ROOT` - Photo directory inside the repository (default: Photos)
//! - `GALLERY_USERS_PATH` - User record file (default: data/users.csv)
//! - `GALLERY_HOST` - Server bind address (default: 0.0.0.0)
//! - `GALLERY_PORT` - Server port (default: 3000)
//! - `GALLERY_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)
//! - `GALLERY_BODY_LIMIT` - Maximum request body in bytes (default: 25 MiB)
//! - `GALLERY_ALLOW_ANONYMOUS_UPLOAD` - Accept uploads without a session
//! - `GALLERY_ARGON2_MEMORY_KIB` / `GALLERY_ARGON2_ITERATIONS` /
//!   `GALLERY_ARGON2_PARALLELISM` - Credential hashing cost

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::gallery::DEFAULT_PHOTOS_ROOT;
use crate::repo::DEFAULT_API_URL;
use crate::server::DEFAULT_BODY_LIMIT;
use crate::users::password::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};
use crate::users::DEFAULT_USERS_PATH;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default session lifetime in seconds (7 days).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Default catalog file name.
pub const DEFAULT_CATALOG_FILE: &str = "photos.json";

/// Default longest thumbnail edge in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 800;

/// Default thumbnail JPEG quality.
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Repo Gallery - a photo gallery API backed by a GitHub repository.
///
/// Every upload, move, delete, metadata edit and signup becomes a commit.
#[derive(Parser, Debug, Clone)]
#[command(name = "repo-gallery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the parsed arguments and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeConfig),

    /// Hash a password for a user record
    HashPassword(HashPasswordConfig),

    /// Rewrite plaintext credentials in the user record file as Argon2 hashes
    MigrateUsers(MigrateUsersConfig),

    /// Check repository access and configuration
    Check(CheckConfig),

    /// Generate photos.json and thumbnails from a local photos directory
    Catalog(CatalogConfig),
}

// =============================================================================
// Shared Argument Groups
// =============================================================================

/// Content repository connection settings.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// GitHub token with contents read/write permission.
    #[arg(long, env = "GALLERY_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository owner (user or organization).
    #[arg(long, env = "GALLERY_GITHUB_OWNER")]
    pub github_owner: Option<String>,

    /// Repository name.
    #[arg(long, env = "GALLERY_GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// Branch to commit to. Uses the repository default if unset.
    #[arg(long, env = "GALLERY_GITHUB_BRANCH")]
    pub github_branch: Option<String>,

    /// GitHub REST API endpoint (GitHub Enterprise or a proxy).
    #[arg(long, default_value = DEFAULT_API_URL, env = "GALLERY_GITHUB_API_URL")]
    pub github_api_url: String,
}

impl RepoArgs {
    /// Validate that all required repository settings are present.
    pub fn validate(&self) -> Result<(), String> {
        if is_blank(&self.github_token) {
            return Err(
                "GitHub token is required. Set --github-token or GALLERY_GITHUB_TOKEN".to_string(),
            );
        }
        if is_blank(&self.github_owner) {
            return Err(
                "Repository owner is required. Set --github-owner or GALLERY_GITHUB_OWNER"
                    .to_string(),
            );
        }
        if is_blank(&self.github_repo) {
            return Err(
                "Repository name is required. Set --github-repo or GALLERY_GITHUB_REPO".to_string(),
            );
        }
        match url::Url::parse(&self.github_api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(format!(
                "GitHub API URL must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => Err(format!(
                "Invalid GitHub API URL '{}': {}",
                self.github_api_url, e
            )),
        }
    }

    /// Get the token, or an empty string if unset (call validate() first).
    pub fn token_or_empty(&self) -> &str {
        self.github_token.as_deref().unwrap_or("")
    }

    /// Get `owner/repo` for display.
    pub fn slug(&self) -> String {
        format!(
            "{}/{}",
            self.github_owner.as_deref().unwrap_or(""),
            self.github_repo.as_deref().unwrap_or("")
        )
    }
}

/// Argon2 cost parameters.
#[derive(Args, Debug, Clone)]
pub struct HasherArgs {
    /// Argon2 memory cost in KiB.
    #[arg(long, default_value_t = DEFAULT_MEMORY_KIB, env = "GALLERY_ARGON2_MEMORY_KIB")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS, env = "GALLERY_ARGON2_ITERATIONS")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism.
    #[arg(long, default_value_t = DEFAULT_PARALLELISM, env = "GALLERY_ARGON2_PARALLELISM")]
    pub argon2_parallelism: u32,
}

impl HasherArgs {
    /// Validate the cost parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.argon2_iterations == 0 {
            return Err("argon2_iterations must be greater than 0".to_string());
        }
        if self.argon2_parallelism == 0 {
            return Err("argon2_parallelism must be greater than 0".to_string());
        }
        if self.argon2_memory_kib < 8 * self.argon2_parallelism {
            return Err("argon2_memory_kib must be at least 8 x argon2_parallelism".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Serve Command
// =============================================================================

/// Configuration for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    // =========================================================================
    // Repository Configuration
    // =========================================================================
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Photo directory inside the repository.
    #[arg(long, default_value = DEFAULT_PHOTOS_ROOT, env = "GALLERY_PHOTOS_ROOT")]
    pub photos_root: String,

    /// User record file inside the repository.
    #[arg(long, default_value = DEFAULT_USERS_PATH, env = "GALLERY_USERS_PATH")]
    pub users_path: String,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for signing session tokens.
    ///
    /// If not provided, login and admin operations answer 500.
    #[arg(long, env = "GALLERY_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL_SECS, env = "GALLERY_SESSION_TTL")]
    pub session_ttl: u64,

    /// Accept uploads without a session.
    ///
    /// WARNING: anyone who can reach the server can commit files.
    #[arg(long, default_value_t = false, env = "GALLERY_ALLOW_ANONYMOUS_UPLOAD")]
    pub allow_anonymous_upload: bool,

    #[command(flatten)]
    pub hasher: HasherArgs,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GALLERY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "GALLERY_BODY_LIMIT")]
    pub body_limit: usize,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.repo.validate()?;
        self.hasher.validate()?;

        if self.photos_root.trim_matches('/').is_empty() {
            return Err("photos_root must not be empty".to_string());
        }
        if self.users_path.trim_matches('/').is_empty() {
            return Err("users_path must not be empty".to_string());
        }
        if self.session_ttl == 0 {
            return Err("session_ttl must be greater than 0".to_string());
        }
        if self.session_ttl > MAX_SESSION_TTL_SECS {
            return Err(format!(
                "session_ttl must be at most {} seconds",
                MAX_SESSION_TTL_SECS
            ));
        }
        if self.body_limit < 1024 {
            return Err("body_limit must be at least 1KB".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a usable session secret is configured.
    pub fn has_session_secret(&self) -> bool {
        !is_blank(&self.session_secret)
    }
}

// =============================================================================
// Hash Password Command
// =============================================================================

/// Configuration for the `hash-password` subcommand.
#[derive(Args, Debug, Clone)]
pub struct HashPasswordConfig {
    /// Password to hash.
    pub password: String,

    /// Print a complete record line for this username.
    #[arg(long)]
    pub username: Option<String>,

    /// Role for the record line.
    #[arg(long, default_value = "user")]
    pub role: String,

    #[command(flatten)]
    pub hasher: HasherArgs,
}

impl HashPasswordConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.password.is_empty() {
            return Err("Password must not be empty".to_string());
        }
        if let Some(ref username) = self.username {
            crate::users::validate_username(username)?;
        }
        if self.role != "admin" && self.role != "user" {
            return Err(format!("Unknown role '{}': use admin or user", self.role));
        }
        self.hasher.validate()
    }
}

// =============================================================================
// Migrate Users Command
// =============================================================================

/// Configuration for the `migrate-users` subcommand.
#[derive(Args, Debug, Clone)]
pub struct MigrateUsersConfig {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// User record file inside the repository.
    #[arg(long, default_value = DEFAULT_USERS_PATH, env = "GALLERY_USERS_PATH")]
    pub users_path: String,

    #[command(flatten)]
    pub hasher: HasherArgs,

    /// Report what would change without committing.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl MigrateUsersConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.repo.validate()?;
        self.hasher.validate()?;
        if self.users_path.trim_matches('/').is_empty() {
            return Err("users_path must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Check Command
// =============================================================================

/// Configuration for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Photo directory inside the repository.
    #[arg(long, default_value = DEFAULT_PHOTOS_ROOT, env = "GALLERY_PHOTOS_ROOT")]
    pub photos_root: String,

    /// User record file inside the repository.
    #[arg(long, default_value = DEFAULT_USERS_PATH, env = "GALLERY_USERS_PATH")]
    pub users_path: String,

    /// Secret key for signing session tokens.
    #[arg(long, env = "GALLERY_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.repo.validate()
    }
}

// =============================================================================
// Catalog Command
// =============================================================================

/// Configuration for the `catalog` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CatalogConfig {
    /// Local photos directory to scan.
    #[arg(long, default_value = DEFAULT_PHOTOS_ROOT)]
    pub photos_dir: PathBuf,

    /// Output file for the catalog.
    #[arg(long, default_value = DEFAULT_CATALOG_FILE)]
    pub output: PathBuf,

    /// Longest thumbnail edge in pixels.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE)]
    pub thumbnail_size: u32,

    /// Thumbnail JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_QUALITY)]
    pub thumbnail_quality: u8,

    /// Skip thumbnail generation.
    #[arg(long, default_value_t = false)]
    pub no_thumbnails: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CatalogConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.photos_dir.is_dir() {
            return Err(format!(
                "Photos directory not found: {}",
                self.photos_dir.display()
            ));
        }
        if self.thumbnail_size == 0 {
            return Err("thumbnail_size must be greater than 0".to_string());
        }
        if self.thumbnail_quality == 0 || self.thumbnail_quality > 100 {
            return Err("thumbnail_quality must be between 1 and 100".to_string());
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// =============================================================================
// Tests
// =============================================================================
