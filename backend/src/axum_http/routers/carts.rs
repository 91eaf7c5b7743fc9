use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use crates::{
    domain::value_objects::{
        carts::{
            AddCartItemRequest, ApplyCouponRequest, CartModel, CreateCartRequest,
            SelectShippingRequest, SetCartAddressesRequest, UpdateCartItemRequest,
        },
        shipping::ShippingQuote,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            carts::CartPostgres, catalog::CatalogPostgres,
            shipping_options::ShippingOptionPostgres,
        },
    },
};
use uuid::Uuid;

use crate::{
    auth::TenantContext,
    usecases::{carts::CartUseCase, errors::UseCaseError, shipping::ShippingUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let cart_repository = Arc::new(CartPostgres::new(Arc::clone(&db_pool)));
    let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));
    let shipping_option_repository = Arc::new(ShippingOptionPostgres::new(Arc::clone(&db_pool)));

    let carts_usecase = CartUseCase::new(
        cart_repository.clone(),
        catalog_repository.clone(),
        catalog_repository,
        shipping_option_repository.clone(),
    );
    let shipping_usecase = ShippingUseCase::new(shipping_option_repository, cart_repository);

    let quotes = Router::new()
        .route("/:cart_id/shipping-rates", get(shipping_rates))
        .with_state(Arc::new(shipping_usecase));

    Router::new()
        .route("/", post(create_cart))
        .route("/:cart_id", get(get_cart))
        .route("/:cart_id/items", post(add_item))
        .route(
            "/:cart_id/items/:item_id",
            patch(update_item).delete(remove_item),
        )
        .route("/:cart_id/addresses", put(set_addresses))
        .route("/:cart_id/coupon", put(apply_coupon))
        .route("/:cart_id/shipping", put(select_shipping))
        .route("/:cart_id/checkout-start", post(start_checkout))
        .with_state(Arc::new(carts_usecase))
        .merge(quotes)
}

pub async fn create_cart(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Json(request): Json<CreateCartRequest>,
) -> Result<impl IntoResponse, UseCaseError> {
    let cart = carts_usecase.create_cart(tenant.tenant_id, request).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn get_cart(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(carts_usecase.get_cart(tenant.tenant_id, cart_id).await?))
}

pub async fn add_item(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .add_item(tenant.tenant_id, cart_id, request)
            .await?,
    ))
}

pub async fn update_item(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .update_item_quantity(tenant.tenant_id, cart_id, item_id, request.quantity)
            .await?,
    ))
}

pub async fn remove_item(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .remove_item(tenant.tenant_id, cart_id, item_id)
            .await?,
    ))
}

pub async fn set_addresses(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<SetCartAddressesRequest>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .set_addresses(tenant.tenant_id, cart_id, request)
            .await?,
    ))
}

pub async fn apply_coupon(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .apply_coupon(tenant.tenant_id, cart_id, request)
            .await?,
    ))
}

pub async fn select_shipping(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<SelectShippingRequest>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .select_shipping(tenant.tenant_id, cart_id, request)
            .await?,
    ))
}

pub async fn start_checkout(
    State(carts_usecase): State<Arc<CartUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartModel>, UseCaseError> {
    Ok(Json(
        carts_usecase
            .start_checkout(tenant.tenant_id, cart_id)
            .await?,
    ))
}

pub async fn shipping_rates(
    State(shipping_usecase): State<Arc<ShippingUseCase>>,
    tenant: TenantContext,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<Vec<ShippingQuote>>, UseCaseError> {
    Ok(Json(
        shipping_usecase
            .quote_for_cart(tenant.tenant_id, cart_id)
            .await?,
    ))
}
