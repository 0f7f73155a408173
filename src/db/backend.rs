//! Storage port used by the request handlers.
//! `PgBackend` implements it against Supabase Postgres; tests substitute an in-memory one.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CompletionOutcome, LeaderboardRow, NewCompletion, NewEvent, Period, Profile};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Connection(#[from] super::connection::DbError),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Cheap liveness check.
    async fn ping(&self) -> Result<()>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    /// Append a ledger entry and add `amount` to the profile total as one atomic unit.
    /// Returns the new total, or `None` (and writes nothing) when the profile is missing.
    async fn award_xp(&self, user_id: Uuid, activity: &str, amount: i32) -> Result<Option<i64>>;

    /// Insert the completion row and award its XP as one atomic unit.
    /// A completion row exists only if its award was applied. A concurrent
    /// request for the same `(user_id, activity_key)` waits for the first to
    /// finish, then sees `Duplicate` or gets to record the completion itself.
    async fn complete_activity(&self, completion: &NewCompletion) -> Result<CompletionOutcome>;

    async fn log_event(&self, event: &NewEvent) -> Result<()>;

    /// Ranked by XP descending, at most `limit` rows.
    async fn leaderboard(&self, period: Period, limit: u32) -> Result<Vec<LeaderboardRow>>;
}
