//! # Repo Gallery
//!
//! An admin-gated photo gallery API that uses a GitHub repository as its
//! storage backend.
//!
//! Photos live as files under a content directory (`Photos/` by default) and
//! user credentials live in a comma-delimited record file
//! (`data/users.csv`). Every mutation (upload, move, delete, metadata edit and
//! signup) becomes a commit through the repository's REST API.
//!
//! ## Features
//!
//! - **Signed sessions**: HS256 tokens with a 7 day lifetime, checked per request
//! - **Argon2 credentials**: passwords are stored as Argon2id PHC strings
//! - **Exif editing**: rewrites camera metadata inside a JPEG's APP1 segment
//! - **Catalog generation**: builds `photos.json` and thumbnails for a static front end
//!
//! ## Architecture
//!
//! - [`repo`] - Content repository trait, GitHub client and in-memory store
//! - [`users`] - User records, credential hashing, login and signup
//! - [`gallery`] - Photo upload, move, delete and metadata operations
//! - [`exif`] - JPEG segment handling and the Exif/TIFF codec
//! - [`catalog`] - Offline `photos.json` and thumbnail generator
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use repo_gallery::{
//!     create_router, Accounts, Argon2Hasher, GitHubRepository, PhotoPaths, PhotoService,
//!     RepoUserStore, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let repo = Arc::new(
//!         GitHubRepository::new("https://api.github.com", "alice", "gallery", None, "ghp_...")
//!             .unwrap(),
//!     );
//!     let store = RepoUserStore::new(Arc::clone(&repo), "data/users.csv");
//!     let accounts = Accounts::new(Arc::new(store), Arc::new(Argon2Hasher::default()));
//!     let photos = PhotoService::new(repo, PhotoPaths::new("Photos"));
//!
//!     let config = RouterConfig::new().with_session_secret("change-me");
//!     let router = create_router(photos, accounts, config);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod exif;
pub mod gallery;
pub mod repo;
pub mod server;
pub mod users;

// Re-export commonly used types
pub use catalog::{build_catalog, write_catalog, Catalog, CatalogOptions, PhotoEntry, PhotoMeta};
pub use config::{Cli, Command, ServeConfig};
pub use error::{ApiError, CatalogError, ExifError, RepoError, StoreError};
pub use exif::{rewrite_metadata, ExifData, ExifFields, FieldInput};
pub use gallery::{PhotoPaths, PhotoService};
pub use repo::{ContentRepository, GitHubRepository, MemoryRepository, PutFile, RepoFile};
pub use server::{
    create_router, AdminSession, AppState, AuthError, Claims, RouterConfig, Session, SessionSigner,
};
pub use users::{Accounts, Argon2Hasher, CredentialHasher, RepoUserStore, Role, UserRecord, UserStore};
