use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
};
use crates::domain::value_objects::tenant::TenantId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantClaims {
    pub tenant_id: String,
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: usize,
}

/// HS256 secret for tenant tokens, installed on the router as an extension.
#[derive(Clone)]
pub struct TenantJwtSecret(pub Arc<String>);

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub subject: Option<String>,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::UNAUTHORIZED, format!("Unauthorized: {}", self.0)).into_response()
    }
}

pub fn validate_tenant_jwt(token: &str, secret: &str) -> Result<TenantClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<TenantClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, (StatusCode, String)> {
    let auth_header = headers.get(AUTHORIZATION).ok_or((
        StatusCode::UNAUTHORIZED,
        "Missing Authorization header".to_string(),
    ))?;

    let auth_str = auth_header.to_str().map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        )
    })?;

    auth_str.strip_prefix("Bearer ").ok_or((
        StatusCode::UNAUTHORIZED,
        "Invalid Authorization header format".to_string(),
    ))
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let secret = parts
            .extensions
            .get::<TenantJwtSecret>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Tenant authentication is not configured".to_string(),
            ))?;

        let token = bearer_token(&parts.headers)?;
        let claims = validate_tenant_jwt(token, &secret.0)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.0.to_string()))?;

        let tenant_id = Uuid::parse_str(&claims.tenant_id).map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid tenant ID in token".to_string(),
            )
        })?;

        Ok(TenantContext {
            tenant_id: TenantId::new(tenant_id),
            subject: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests;
