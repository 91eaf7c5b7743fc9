use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use crates::{
    domain::value_objects::orders::PlaceOrderRequest,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{carts::CartPostgres, orders::OrderPostgres, payments::PaymentPostgres},
    },
};
use tracing::{Instrument, info_span};

use crate::{
    auth::TenantContext,
    usecases::{checkout::CheckoutUseCase, errors::UseCaseError, payment_gateway::PaymentGateway},
};

pub fn checkout_usecase(
    db_pool: &Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    payment_due_days: i64,
) -> CheckoutUseCase {
    CheckoutUseCase::new(
        Arc::new(CartPostgres::new(Arc::clone(db_pool))),
        Arc::new(OrderPostgres::new(Arc::clone(db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(db_pool))),
        gateway,
        payment_due_days,
    )
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    payment_due_days: i64,
) -> Router {
    let checkout_usecase = checkout_usecase(&db_pool, gateway, payment_due_days);

    Router::new()
        .route("/", post(place_order))
        .with_state(Arc::new(checkout_usecase))
}

pub async fn place_order(
    State(checkout_usecase): State<Arc<CheckoutUseCase>>,
    tenant: TenantContext,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, UseCaseError> {
    let span = info_span!("checkout", tenant_id = %tenant.tenant_id, cart_id = %request.cart_id);
    let placed = checkout_usecase
        .place_order(tenant.tenant_id, request)
        .instrument(span)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
