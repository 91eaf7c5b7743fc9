use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use crates::{
    domain::value_objects::shipping::{
        NewShippingOption, ReorderShippingOptionsRequest, ShippingOptionModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{carts::CartPostgres, shipping_options::ShippingOptionPostgres},
    },
};

use crate::{
    auth::TenantContext,
    usecases::{errors::UseCaseError, shipping::ShippingUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let shipping_usecase = ShippingUseCase::new(
        Arc::new(ShippingOptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CartPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/", get(list_options).post(create_option))
        .route("/order", put(reorder_options))
        .with_state(Arc::new(shipping_usecase))
}

pub async fn list_options(
    State(shipping_usecase): State<Arc<ShippingUseCase>>,
    tenant: TenantContext,
) -> Result<Json<Vec<ShippingOptionModel>>, UseCaseError> {
    Ok(Json(shipping_usecase.list_options(tenant.tenant_id).await?))
}

pub async fn create_option(
    State(shipping_usecase): State<Arc<ShippingUseCase>>,
    tenant: TenantContext,
    Json(option): Json<NewShippingOption>,
) -> Result<impl IntoResponse, UseCaseError> {
    let created = shipping_usecase
        .create_option(tenant.tenant_id, option)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn reorder_options(
    State(shipping_usecase): State<Arc<ShippingUseCase>>,
    tenant: TenantContext,
    Json(request): Json<ReorderShippingOptionsRequest>,
) -> Result<StatusCode, UseCaseError> {
    shipping_usecase.reorder(tenant.tenant_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
