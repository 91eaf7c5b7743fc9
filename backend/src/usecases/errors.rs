use axum::http::StatusCode;
use crates::domain::value_objects::{carts::CartError, order_state::OrderTransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    /// The gateway refused or could not be reached.
    #[error("payment gateway failure: {0}")]
    Gateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn not_found(what: &str) -> Self {
        UseCaseError::NotFound(format!("{what} not found"))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        UseCaseError::InvalidRequest(message.into())
    }

    pub fn concurrent_modification(what: &str) -> Self {
        UseCaseError::InvalidRequest(format!("{what} was modified concurrently"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::InvalidRequest(_) | UseCaseError::Gateway(_) => StatusCode::BAD_REQUEST,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CartError> for UseCaseError {
    fn from(err: CartError) -> Self {
        UseCaseError::InvalidRequest(err.to_string())
    }
}

impl From<OrderTransitionError> for UseCaseError {
    fn from(err: OrderTransitionError) -> Self {
        UseCaseError::InvalidRequest(err.to_string())
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_failures_surface_as_bad_request() {
        assert_eq!(
            UseCaseError::Gateway("timeout".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UseCaseError::not_found("order").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            UseCaseError::Internal(anyhow::anyhow!("db down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_rejections_become_invalid_requests() {
        let err = UseCaseError::from(CartError::Empty);
        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }
}
