use super::*;
use axum::http::{HeaderValue, Request};
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "tenantsecretforunittesting123";
const TENANT: &str = "123e4567-e89b-12d3-a456-426614174000";

fn token(secret: &str, tenant_id: &str, exp: usize) -> String {
    let claims = TenantClaims {
        tenant_id: tenant_id.to_string(),
        sub: Some("storefront".to_string()),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn extract(authorization: Option<&str>) -> Result<TenantContext, (StatusCode, String)> {
    let mut builder = Request::builder().uri("/api/v1/carts");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    }
    let mut request = builder.body(()).unwrap();
    request
        .extensions_mut()
        .insert(TenantJwtSecret(Arc::new(SECRET.to_string())));

    let (mut parts, _) = request.into_parts();
    TenantContext::from_request_parts(&mut parts, &()).await
}

#[test]
fn test_validate_tenant_jwt_success() {
    let claims = validate_tenant_jwt(&token(SECRET, TENANT, 9999999999), SECRET)
        .expect("Valid token should pass");
    assert_eq!(claims.tenant_id, TENANT);
    assert_eq!(claims.sub.as_deref(), Some("storefront"));
}

#[test]
fn test_validate_tenant_jwt_expired() {
    let result = validate_tenant_jwt(&token(SECRET, TENANT, 1), SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_tenant_jwt_invalid_signature() {
    let result = validate_tenant_jwt(&token("wrongsecret", TENANT, 9999999999), SECRET);
    assert!(result.is_err());
}

#[tokio::test]
async fn extractor_yields_tenant_from_claims() {
    let bearer = format!("Bearer {}", token(SECRET, TENANT, 9999999999));
    let context = extract(Some(&bearer)).await.expect("token should be accepted");

    assert_eq!(context.tenant_id.as_uuid().to_string(), TENANT);
}

#[tokio::test]
async fn extractor_rejects_missing_header_and_bad_tenant() {
    let (status, _) = extract(None).await.unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = format!("Bearer {}", token(SECRET, "not-a-uuid", 9999999999));
    let (status, message) = extract(Some(&bearer)).await.unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "Invalid tenant ID in token");

    let (status, _) = extract(Some("Basic abc")).await.unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
