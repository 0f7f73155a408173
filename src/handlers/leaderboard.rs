//! GET /api/leaderboard?period=weekly|monthly|all&limit=1..=100

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::models::{LeaderboardRow, Period};
use crate::state::AppState;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Raw query string; both values arrive as text and are coerced here.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub period: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardParams {
    pub period: Period,
    pub limit: u32,
}

impl TryFrom<LeaderboardQuery> for LeaderboardParams {
    type Error = ApiError;

    fn try_from(query: LeaderboardQuery) -> Result<Self, Self::Error> {
        let period = match query.period {
            None => Period::default(),
            Some(raw) => raw.trim().parse().map_err(ApiError::InvalidInput)?,
        };
        let limit = match query.limit {
            None => DEFAULT_LIMIT,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| ApiError::InvalidInput(format!("limit: {e}")))?,
        };
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            )));
        }
        Ok(Self { period, limit })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardResponse {
    pub period: Period,
    pub limit: u32,
    pub results: Vec<LeaderboardRow>,
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    requester: MaybeIdentity,
    query: Result<Query<LeaderboardQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let params = LeaderboardParams::try_from(query)?;
    requester.require()?;

    let results = state
        .backend
        .leaderboard(params.period, params.limit)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch leaderboard", e))?;

    Ok(Json(LeaderboardResponse {
        period: params.period,
        limit: params.limit,
        results,
    }))
}
