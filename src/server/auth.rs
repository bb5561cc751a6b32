//! Session token authentication.
//!
//! Logging in issues a session token: a compact HS256 JWT carrying the
//! username and role, signed with the server's session secret.
//!
//! ```text
//! token = base64url(header) "." base64url(claims) "." base64url(signature)
//! signature = HMAC-SHA256(session_secret, base64url(header) "." base64url(claims))
//! ```
//!
//! Tokens are never stored server-side. Each request presents one in the
//! `Authorization: Bearer <token>` header and it is verified on the spot.
//!
//! # Security Properties
//!
//! - **Tamper-evident**: claims are covered by the signature
//! - **Time-limited**: tokens expire after a configurable TTL (7 days by default)
//! - **Constant-time comparison**: signature verification uses `subtle`
//! - **Fail closed**: without a session secret, no token is issued or accepted
//!
//! # Example
//!
//! ```rust
//! use repo_gallery::server::auth::SessionSigner;
//! use repo_gallery::users::Role;
//! use std::time::Duration;
//!
//! let signer = SessionSigner::new("my-secret-key", Duration::from_secs(3600)).unwrap();
//! let token = signer.sign("alice", Role::Admin);
//! let claims = signer.verify(&token).unwrap();
//! assert_eq!(claims.username, "alice");
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use super::handlers::ErrorResponse;
use crate::users::Role;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The only signing algorithm accepted.
const ALGORITHM: &str = "HS256";

/// Authentication error types.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No `Authorization` header
    MissingToken,

    /// Header or token is not in the expected shape
    MalformedToken,

    /// Signature does not match the claims
    InvalidSignature,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Valid session without the required role
    Forbidden {
        /// Role carried by the token
        role: Role,
    },

    /// No session secret is configured
    NotConfigured,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Unauthorized: Missing token"),
            AuthError::MalformedToken => write!(f, "Unauthorized: Invalid token"),
            AuthError::InvalidSignature => write!(f, "Unauthorized: Invalid token"),
            AuthError::Expired { expired_at, .. } => {
                write!(f, "Unauthorized: Token expired at {}", expired_at)
            }
            AuthError::Forbidden { .. } => write!(f, "Forbidden: Admins only"),
            AuthError::NotConfigured => {
                write!(f, "Server configuration error: session secret is not set")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "invalid_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired { .. } => "token_expired",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::NotConfigured => "configuration_error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        // a bad signature may be tampering; the rest is routine
        match &self {
            AuthError::InvalidSignature => {
                warn!(code = code, status = status.as_u16(), "Authentication failed: {}", message);
            }
            AuthError::NotConfigured => {
                error!(code = code, status = status.as_u16(), "Authentication unavailable: {}", message);
            }
            AuthError::Forbidden { role } => {
                debug!(code = code, role = %role, status = status.as_u16(), "Authorization failed");
            }
            _ => {
                debug!(code = code, status = status.as_u16(), "Authentication failed: {}", message);
            }
        }

        let body = ErrorResponse::with_status(code, message, status);
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Claims
// =============================================================================

/// Signed content of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub role: Role,

    /// Issued at (Unix seconds)
    pub iat: u64,

    /// Expires at (Unix seconds)
    pub exp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

// =============================================================================
// Session Signer
// =============================================================================

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl SessionSigner {
    /// Create a signer. An empty secret is rejected as [`AuthError::NotConfigured`].
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::NotConfigured)?;
        Ok(Self { mac, ttl })
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid from now.
    pub fn sign(&self, username: &str, role: Role) -> String {
        self.sign_at(username, role, unix_now())
    }

    /// Issue a token as if it were `issued_at`.
    pub fn sign_at(&self, username: &str, role: Role, issued_at: u64) -> String {
        let claims = Claims {
            username: username.to_string(),
            role,
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };
        self.encode(&claims)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// Verify a token against `current_time`.
    pub fn verify_at(&self, token: &str, current_time: u64) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken);
        };

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::MalformedToken);
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::MalformedToken)?;
        let expected = self.signature(&token[..token.len() - signature.len() - 1]);
        if !bool::from(provided.ct_eq(&expected)) {
            return Err(AuthError::InvalidSignature);
        }

        let claims: Claims = decode_segment(claims)?;
        if current_time > claims.exp {
            return Err(AuthError::Expired {
                expired_at: claims.exp,
                current_time,
            });
        }

        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> String {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(claims));
        let signature = URL_SAFE_NO_PAD.encode(self.signature(&signing_input));
        format!("{}.{}", signing_input, signature)
    }

    fn signature(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn encode_segment<T: Serialize>(value: &T) -> String {
    // serializing these plain structs cannot fail
    let json = serde_json::to_vec(value).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Extractors
// =============================================================================

/// Session verification state, pulled out of the router state via [`FromRef`].
///
/// `None` means no session secret is configured.
#[derive(Clone, Default)]
pub struct SessionKeys(pub Option<Arc<SessionSigner>>);

/// Read the bearer token from request headers.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token.trim())
}

/// Axum extractor for any valid session.
#[derive(Debug, Clone)]
pub struct Session(pub Claims);

impl<S> FromRequestParts<S> for Session
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let SessionKeys(signer) = SessionKeys::from_ref(state);
        let signer = signer.ok_or(AuthError::NotConfigured)?;
        Ok(Session(signer.verify(token)?))
    }
}

/// Axum extractor for a session carrying the admin role.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Claims);

impl<S> FromRequestParts<S> for AdminSession
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Session(claims) = Session::from_request_parts(parts, state).await?;
        if !claims.role.is_admin() {
            return Err(AuthError::Forbidden { role: claims.role });
        }
        Ok(AdminSession(claims))
    }
}

// =============================================================================
// Tests
// =============================================================================
