//! POST /api/events — append-only audit trail of client events.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use validator::Validate;

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::models::NewEvent;
use crate::state::AppState;
use crate::validation::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogEventRequest {
    #[validate(length(min = 1, max = 100))]
    pub event_type: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

pub async fn log_event(
    State(state): State<AppState>,
    requester: MaybeIdentity,
    ValidatedJson(req): ValidatedJson<LogEventRequest>,
) -> Result<Json<Value>, ApiError> {
    let identity = requester.require()?;
    let event = NewEvent {
        user_id: identity.id,
        event_type: req.event_type,
        metadata: req.metadata.map(Value::Object),
    };
    state
        .backend
        .log_event(&event)
        .await
        .map_err(|e| ApiError::internal("Failed to log event", e))?;
    debug!(user_id = %event.user_id, event_type = %event.event_type, "event logged");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse;

    #[test]
    fn event_type_length_bounds() {
        let ok = json!({ "eventType": "page_view" });
        assert!(parse::<LogEventRequest>(ok.to_string().as_bytes()).is_ok());

        let empty = json!({ "eventType": "" });
        assert!(parse::<LogEventRequest>(empty.to_string().as_bytes()).is_err());

        let long = json!({ "eventType": "e".repeat(101) });
        assert!(parse::<LogEventRequest>(long.to_string().as_bytes()).is_err());
    }
}
