use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::{errors::UseCaseError, gateway_reconciliation::WebhookRejection};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

fn render(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(status, message))).into_response()
}

impl IntoResponse for UseCaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            UseCaseError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        render(status, message)
    }
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        render(self.status_code(), self.to_string())
    }
}
