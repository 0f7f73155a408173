//! Router construction.

use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::access::role_redirect;
use crate::error::{method_not_allowed, not_found};
use crate::handlers;
use crate::rate_limit::throttle;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Writes are throttled per session token
    let writes = Router::new()
        .route("/api/update-xp", post(handlers::xp::update_xp))
        .route(
            "/api/activity/complete",
            post(handlers::activity::complete_activity),
        )
        .route("/api/events", post(handlers::events::log_event))
        .route_layer(axum_mw::from_fn_with_state(state.clone(), throttle));

    let reads = Router::new()
        .route(
            "/api/leaderboard",
            get(handlers::leaderboard::get_leaderboard),
        )
        .route("/api/health", get(handlers::health::health));

    Router::new()
        .merge(writes)
        .merge(reads)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(axum_mw::from_fn_with_state(state.clone(), role_redirect)),
        )
        .with_state(state)
}
