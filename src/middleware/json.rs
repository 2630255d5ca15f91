use axum::{extract::rejection::JsonRejection, Json};

use crate::error::ApiError;

/// Unwraps a JSON body, turning axum's rejection into the error envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::bad_request(rejection.body_text()))
        }
    }
}
