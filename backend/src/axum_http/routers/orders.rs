use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use crates::{
    domain::value_objects::orders::{
        CancelOrderRequest, OrderModel, RefundOrderRequest, UpdateFulfillmentRequest,
        UpdateOrderItemStatusRequest, UpdateOrderStatusRequest,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{orders::OrderPostgres, payments::PaymentPostgres},
    },
};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::checkout::checkout_usecase;
use crate::{
    auth::TenantContext,
    usecases::{
        checkout::{CheckoutUseCase, PlacedOrder},
        errors::UseCaseError,
        orders::OrderUseCase,
        payment_gateway::PaymentGateway,
    },
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    payment_due_days: i64,
) -> Router {
    let orders_usecase = OrderUseCase::new(
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
    );

    let retries = Router::new()
        .route("/:order_id/retry-payment", post(retry_payment))
        .with_state(Arc::new(checkout_usecase(
            &db_pool,
            gateway,
            payment_due_days,
        )));

    Router::new()
        .route("/:order_id", get(get_order))
        .route("/:order_id/status", patch(update_status))
        .route("/:order_id/fulfillment", patch(update_fulfillment))
        .route("/:order_id/items/:item_id/status", patch(update_item_status))
        .route("/:order_id/cancel", post(cancel_order))
        .route("/:order_id/refund", post(refund_order))
        .with_state(Arc::new(orders_usecase))
        .merge(retries)
}

pub async fn get_order(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(orders_usecase.get_order(tenant.tenant_id, order_id).await?))
}

pub async fn update_status(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(
        orders_usecase
            .update_status(tenant.tenant_id, order_id, request.status)
            .await?,
    ))
}

pub async fn update_fulfillment(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateFulfillmentRequest>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(
        orders_usecase
            .update_fulfillment(tenant.tenant_id, order_id, request.fulfillment_status)
            .await?,
    ))
}

pub async fn update_item_status(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateOrderItemStatusRequest>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(
        orders_usecase
            .update_item_status(tenant.tenant_id, order_id, item_id, request.status)
            .await?,
    ))
}

pub async fn cancel_order(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(
        orders_usecase
            .cancel(tenant.tenant_id, order_id, request.reason)
            .await?,
    ))
}

pub async fn refund_order(
    State(orders_usecase): State<Arc<OrderUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RefundOrderRequest>,
) -> Result<Json<OrderModel>, UseCaseError> {
    Ok(Json(
        orders_usecase
            .refund(tenant.tenant_id, order_id, request.amount_minor, request.reason)
            .await?,
    ))
}

pub async fn retry_payment(
    State(checkout_usecase): State<Arc<CheckoutUseCase>>,
    tenant: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PlacedOrder>, UseCaseError> {
    Ok(Json(
        checkout_usecase
            .retry_payment(tenant.tenant_id, order_id)
            .instrument(info_span!("payment_retry", tenant_id = %tenant.tenant_id, %order_id))
            .await?,
    ))
}
