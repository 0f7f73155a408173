//! JSON body extraction with bound checks.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// Like `axum::Json`, but every failure (unreadable body, bad JSON, wrong
/// field types, out-of-range values) maps to [`ApiError::InvalidInput`].
/// The content type is not checked.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
        parse(&bytes).map(ValidatedJson)
    }
}

pub fn parse<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let value: T =
        serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    value
        .validate()
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    Ok(value)
}
