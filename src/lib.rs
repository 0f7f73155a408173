//! CodeCikgu XP ledger and leaderboard API.
//!
//! Four JSON endpoints over Supabase Postgres: self-service XP awards,
//! idempotent activity completion, an audit event log, and the leaderboard.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
