use std::num::NonZeroU32;
use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::db::Backend;
use crate::rate_limit::TokenRateLimiter;

/// Shared handler dependencies. Everything is injected; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub identity: Arc<dyn IdentityProvider>,
    pub limiter: Arc<TokenRateLimiter>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn Backend>,
        identity: Arc<dyn IdentityProvider>,
        requests_per_minute: NonZeroU32,
    ) -> Self {
        Self {
            backend,
            identity,
            limiter: Arc::new(TokenRateLimiter::per_minute(requests_per_minute)),
        }
    }
}
