use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use crates::{
    domain::value_objects::subscriptions::{
        ChangePlanRequest, ConvertTrialRequest, CreateSubscriptionRequest, SubscriptionModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{payments::PaymentPostgres, subscriptions::SubscriptionPostgres},
    },
};
use uuid::Uuid;

use crate::{
    auth::TenantContext,
    usecases::{
        errors::UseCaseError, payment_gateway::PaymentGateway,
        subscriptions::SubscriptionUseCase,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, gateway: Arc<dyn PaymentGateway>) -> Router {
    let subscriptions_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let payments_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions_repository),
        Arc::new(payments_repository),
        gateway,
    );

    Router::new()
        .route("/", post(create_subscription))
        .route("/:subscription_id", get(get_subscription))
        .route("/:subscription_id/convert-trial", post(convert_trial))
        .route("/:subscription_id/plan", patch(change_plan))
        .route("/:subscription_id/cancel", post(cancel_subscription))
        .with_state(Arc::new(subscriptions_usecase))
}

pub async fn create_subscription(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    tenant: TenantContext,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, UseCaseError> {
    let subscription = subscriptions_usecase
        .create_subscription(tenant.tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn get_subscription(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<SubscriptionModel>, UseCaseError> {
    Ok(Json(
        subscriptions_usecase
            .get_subscription(tenant.tenant_id, subscription_id)
            .await?,
    ))
}

pub async fn convert_trial(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<ConvertTrialRequest>,
) -> Result<Json<SubscriptionModel>, UseCaseError> {
    Ok(Json(
        subscriptions_usecase
            .convert_trial(tenant.tenant_id, subscription_id, request)
            .await?,
    ))
}

pub async fn change_plan(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<Json<SubscriptionModel>, UseCaseError> {
    Ok(Json(
        subscriptions_usecase
            .change_plan(tenant.tenant_id, subscription_id, request)
            .await?,
    ))
}

pub async fn cancel_subscription(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<SubscriptionModel>, UseCaseError> {
    Ok(Json(
        subscriptions_usecase
            .cancel(tenant.tenant_id, subscription_id)
            .await?,
    ))
}
