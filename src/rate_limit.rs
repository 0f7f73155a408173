//! Per-token request throttling for the write endpoints.

use std::num::NonZeroU32;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::state::AppState;

const ANONYMOUS_KEY: &str = "anonymous";

pub struct TokenRateLimiter {
    inner: DefaultKeyedRateLimiter<String>,
}

impl TokenRateLimiter {
    pub fn per_minute(requests: NonZeroU32) -> Self {
        Self {
            inner: RateLimiter::keyed(Quota::per_minute(requests)),
        }
    }

    /// Consume one unit for `key`; false when its quota is spent.
    pub fn check(&self, key: &str) -> bool {
        self.inner.check_key(&key.to_owned()).is_ok()
    }

    /// Drop keys whose quota has fully replenished.
    pub fn prune(&self) {
        self.inner.retain_recent();
        self.inner.shrink_to_fit();
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.len()
    }
}

/// Keys on the resolved user id, so any spelling of one session token shares
/// a quota. Unknown and missing tokens share the anonymous quota.
/// The resolved identity is left in the request extensions for the handler.
pub async fn throttle(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let requester = match MaybeIdentity::from_request_parts(&mut parts, &state).await {
        Ok(requester) => requester,
        Err(e) => return e.into_response(),
    };
    let key = requester
        .0
        .as_ref()
        .map_or_else(|| ANONYMOUS_KEY.to_owned(), |identity| identity.id.to_string());

    if !state.limiter.check(&key) {
        tracing::warn!(path = %parts.uri.path(), %key, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    parts.extensions.insert(requester);
    next.run(Request::from_parts(parts, body)).await
}
