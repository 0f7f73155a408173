//! Request identity: bearer token -> authenticated user.

pub mod jwt;
pub mod remote;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub use jwt::JwtIdentityProvider;
pub use remote::RemoteIdentityProvider;

/// The authenticated requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth service returned {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// Resolves a session token to the user it belongs to.
/// An unknown, expired or malformed token is `Ok(None)`; `Err` means the provider itself failed.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<Option<Identity>, AuthError>;
}

/// `Authorization: Bearer <token>`, if present.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extracted identity that may be absent.
///
/// Never rejects for a missing or invalid token, so handlers can validate
/// the request body before deciding on 401. Reuses an identity already
/// resolved earlier in the middleware stack.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl MaybeIdentity {
    pub fn require(self) -> Result<Identity, ApiError> {
        self.0.ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<MaybeIdentity>() {
            return Ok(resolved.clone());
        }
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };
        let identity = state
            .identity
            .current_user(token)
            .await
            .map_err(|e| ApiError::internal("Failed to verify session", e))?;
        Ok(Self(identity))
    }
}
