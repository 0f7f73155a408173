//! Postgres implementation of [`Backend`].
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the crate
//! builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::backend::{Backend, BackendError, Result};
use super::connection::{self, set_user_context};
use crate::models::{
    CompletionOutcome, LeaderboardRow, NewCompletion, NewEvent, Period, Profile, Role,
};

#[derive(Debug, sqlx::FromRow)]
struct PgProfileRow {
    id: Uuid,
    email: String,
    role: String,
    xp: i64,
    name: Option<String>,
    sekolah: Option<String>,
    tingkatan: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PgProfileRow> for Profile {
    type Error = BackendError;

    fn try_from(row: PgProfileRow) -> Result<Self> {
        let role = row.role.parse::<Role>().map_err(BackendError::CorruptRow)?;
        Ok(Profile {
            id: row.id,
            email: row.email,
            role,
            xp: row.xp,
            name: row.name,
            sekolah: row.sekolah,
            tingkatan: row.tingkatan,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn ping(&self) -> Result<()> {
        connection::health_check(&self.pool).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, PgProfileRow>(
            r#"
            SELECT id, email, role, xp, name, sekolah, tingkatan, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn award_xp(&self, user_id: Uuid, activity: &str, amount: i32) -> Result<Option<i64>> {
        let mut tx = self.pool.begin().await?;
        set_user_context(&mut tx, user_id).await?;
        let new_xp: Option<i64> = sqlx::query_scalar("SELECT award_xp($1, $2, $3)")
            .bind(user_id)
            .bind(activity)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(new_xp)
    }

    async fn complete_activity(&self, completion: &NewCompletion) -> Result<CompletionOutcome> {
        let mut tx = self.pool.begin().await?;
        set_user_context(&mut tx, completion.user_id).await?;

        // A concurrent insert of the same key blocks here until the other
        // transaction commits or rolls back.
        let inserted = sqlx::query(
            r#"
            INSERT INTO activity_completions (user_id, activity_key, activity_type, xp, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, activity_key) DO NOTHING
            "#,
        )
        .bind(completion.user_id)
        .bind(&completion.activity_key)
        .bind(completion.activity_type.as_str())
        .bind(completion.xp)
        .bind(&completion.metadata)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(done) if done.rows_affected() == 0 => {
                tx.rollback().await?;
                return Ok(CompletionOutcome::Duplicate);
            }
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                tx.rollback().await?;
                return Ok(CompletionOutcome::MissingProfile);
            }
            Err(e) => return Err(e.into()),
        }

        let new_xp: Option<i64> = sqlx::query_scalar("SELECT award_xp($1, $2, $3)")
            .bind(completion.user_id)
            .bind(&completion.activity_key)
            .bind(completion.xp)
            .fetch_one(&mut *tx)
            .await?;

        match new_xp {
            Some(new_xp) => {
                tx.commit().await?;
                Ok(CompletionOutcome::Awarded { new_xp })
            }
            None => {
                tx.rollback().await?;
                Ok(CompletionOutcome::MissingProfile)
            }
        }
    }

    async fn log_event(&self, event: &NewEvent) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        set_user_context(&mut tx, event.user_id).await?;
        sqlx::query("INSERT INTO events (user_id, event_type, metadata) VALUES ($1, $2, $3)")
            .bind(event.user_id)
            .bind(&event.event_type)
            .bind(&event.metadata)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn leaderboard(&self, period: Period, limit: u32) -> Result<Vec<LeaderboardRow>> {
        let limit = i32::try_from(limit).map_err(|e| BackendError::Other(e.into()))?;
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            "SELECT user_id, name, email, xp FROM get_leaderboard($1, $2)",
        )
        .bind(period.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
