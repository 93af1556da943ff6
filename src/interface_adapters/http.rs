// JSON error payloads shared by every HTTP route.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// `{"error": ..}` body with the given status.
    pub fn reply(status: StatusCode, error: &str) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}
