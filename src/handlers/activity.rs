//! POST /api/activity/complete — idempotent XP award for a content unit.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use validator::Validate;

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::models::{ActivityType, CompletionOutcome, NewCompletion};
use crate::state::AppState;
use crate::validation::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteActivityRequest {
    #[validate(length(min = 1, max = 255))]
    pub activity_key: String,
    #[serde(default)]
    pub activity_type: ActivityType,
    #[validate(range(min = 1, max = 1000))]
    pub xp: i32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompleteActivityResponse {
    #[serde(rename_all = "camelCase")]
    Awarded { success: bool, xp_earned: i32 },
    #[serde(rename_all = "camelCase")]
    AlreadyCompleted {
        message: String,
        xp_earned: i32,
        duplicate: bool,
    },
}

pub async fn complete_activity(
    State(state): State<AppState>,
    requester: MaybeIdentity,
    ValidatedJson(req): ValidatedJson<CompleteActivityRequest>,
) -> Result<Json<CompleteActivityResponse>, ApiError> {
    let identity = requester.require()?;

    let completion = NewCompletion {
        user_id: identity.id,
        activity_key: req.activity_key,
        activity_type: req.activity_type,
        xp: req.xp,
        metadata: req.metadata.map(Value::Object),
    };

    let outcome = state
        .backend
        .complete_activity(&completion)
        .await
        .map_err(|e| ApiError::internal("Failed to complete activity", e))?;

    match outcome {
        CompletionOutcome::Awarded { new_xp } => {
            info!(
                user_id = %identity.id,
                email = identity.email.as_deref().unwrap_or("-"),
                activity_key = %completion.activity_key,
                activity_type = completion.activity_type.as_str(),
                xp_earned = completion.xp,
                new_xp,
                "activity completed"
            );
            Ok(Json(CompleteActivityResponse::Awarded {
                success: true,
                xp_earned: completion.xp,
            }))
        }
        CompletionOutcome::Duplicate => {
            info!(
                user_id = %identity.id,
                activity_key = %completion.activity_key,
                "activity already completed"
            );
            Ok(Json(CompleteActivityResponse::AlreadyCompleted {
                message: "Already completed".into(),
                xp_earned: 0,
                duplicate: true,
            }))
        }
        CompletionOutcome::MissingProfile => Err(ApiError::internal(
            "Failed to complete activity",
            anyhow::anyhow!("no profile for user {}", identity.id),
        )),
    }
}
