use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
};
use crates::{
    domain::value_objects::{gateway_webhook::ReconciliationOutcome, tenant::TenantId},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            gateway_webhook_events::WebhookEventPostgres, orders::OrderPostgres,
            payments::PaymentPostgres, subscriptions::SubscriptionPostgres,
        },
    },
};
use serde::Serialize;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::usecases::{
    gateway_reconciliation::{GatewayReconciliationUseCase, WebhookRejection},
    payment_gateway::PaymentGateway,
};

pub const ACCESS_TOKEN_HEADER: &str = "gateway-access-token";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: ReconciliationOutcome,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, gateway: Arc<dyn PaymentGateway>) -> Router {
    let reconciliation_usecase = GatewayReconciliationUseCase::new(
        Arc::new(WebhookEventPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        gateway,
    );

    Router::new()
        .route("/gateway/:tenant_id", post(gateway_webhook))
        .with_state(Arc::new(reconciliation_usecase))
}

/// Authenticated by the gateway's shared token rather than a tenant JWT.
pub async fn gateway_webhook(
    State(reconciliation_usecase): State<Arc<GatewayReconciliationUseCase>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookRejection> {
    let access_token = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = reconciliation_usecase
        .handle_delivery(TenantId::new(tenant_id), access_token, &body)
        .instrument(info_span!("gateway_webhook", %tenant_id))
        .await?;

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
