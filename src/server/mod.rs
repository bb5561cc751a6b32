//! HTTP server layer for the gallery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │               POST /api/{login,signup,upload,...}               │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │ (sessions)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{AdminSession, AuthError, Claims, Session, SessionKeys, SessionSigner};
pub use handlers::{
    AppState, CredentialsRequest, DeleteRequest, ErrorResponse, HealthResponse, JsonBody,
    LoginResponse, MessageResponse, MoveRequest, MoveResponse, UpdateExifRequest, UploadRequest,
    UploadResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_BODY_LIMIT};
