//! POST /api/update-xp — a user awards XP to themself.
//!
//! Checks run in order and fail fast: body shape and bounds, session,
//! ownership, profile existence. The award itself is the backend's atomic
//! `award_xp`, so concurrent requests for one user cannot lose updates.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidatedJson;

pub const MAX_XP_AMOUNT: i32 = 10_000;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateXpRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub activity: String,
    #[validate(range(min = 1, max = MAX_XP_AMOUNT))]
    pub xp_amount: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateXpResponse {
    pub message: String,
    pub new_xp: i64,
    pub activity: String,
    pub xp_earned: i32,
}

pub async fn update_xp(
    State(state): State<AppState>,
    requester: MaybeIdentity,
    ValidatedJson(req): ValidatedJson<UpdateXpRequest>,
) -> Result<Json<UpdateXpResponse>, ApiError> {
    let identity = requester.require()?;
    if identity.id != req.user_id {
        warn!(
            requester = %identity.id,
            target = %req.user_id,
            "refused XP update for another user"
        );
        return Err(ApiError::Forbidden(format!(
            "{} may not award XP to {}",
            identity.id, req.user_id
        )));
    }

    let new_xp = state
        .backend
        .award_xp(req.user_id, &req.activity, req.xp_amount)
        .await
        .map_err(|e| ApiError::internal("Failed to update XP", e))?
        .ok_or(ApiError::NotFound("Profile not found"))?;

    info!(
        user_id = %req.user_id,
        email = identity.email.as_deref().unwrap_or("-"),
        activity = %req.activity,
        xp_earned = req.xp_amount,
        new_xp,
        "XP awarded"
    );
    Ok(Json(UpdateXpResponse {
        message: "XP updated successfully".into(),
        new_xp,
        activity: req.activity,
        xp_earned: req.xp_amount,
    }))
}
