use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::domain::{
    repositories::{
        carts::{CartMutationOutcome, CartRepository},
        catalog::{CouponRepository, ProductCatalog},
        shipping_options::ShippingOptionRepository,
    },
    value_objects::{
        carts::{
            AddCartItemRequest, ApplyCouponRequest, CartModel, CartMutation, CreateCartRequest,
            SelectShippingRequest, SelectedShipping, SetCartAddressesRequest,
        },
        shipping::{Destination, RateResolution},
        tenant::TenantId,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{UseCaseError, UseCaseResult};

pub const DEFAULT_CURRENCY: &str = "BRL";

pub struct CartUseCase {
    carts: Arc<dyn CartRepository + Send + Sync>,
    catalog: Arc<dyn ProductCatalog + Send + Sync>,
    coupons: Arc<dyn CouponRepository + Send + Sync>,
    shipping_options: Arc<dyn ShippingOptionRepository + Send + Sync>,
}

fn into_cart(outcome: CartMutationOutcome) -> UseCaseResult<CartModel> {
    match outcome {
        CartMutationOutcome::Applied(cart) => Ok(cart),
        CartMutationOutcome::Rejected(rejection) => Err(rejection.into()),
        CartMutationOutcome::NotFound => Err(UseCaseError::not_found("cart")),
    }
}

impl CartUseCase {
    pub fn new(
        carts: Arc<dyn CartRepository + Send + Sync>,
        catalog: Arc<dyn ProductCatalog + Send + Sync>,
        coupons: Arc<dyn CouponRepository + Send + Sync>,
        shipping_options: Arc<dyn ShippingOptionRepository + Send + Sync>,
    ) -> Self {
        Self {
            carts,
            catalog,
            coupons,
            shipping_options,
        }
    }

    async fn mutate(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        mutation: CartMutation,
    ) -> UseCaseResult<CartModel> {
        let outcome = self
            .carts
            .mutate(tenant_id, cart_id, mutation)
            .await
            .map_err(|err| {
                error!(%tenant_id, %cart_id, db_error = ?err, "carts: mutation failed");
                UseCaseError::Internal(err)
            })?;

        if let CartMutationOutcome::Rejected(rejection) = &outcome {
            info!(%tenant_id, %cart_id, %rejection, "carts: mutation rejected");
        }
        into_cart(outcome)
    }

    /// Returns the owner's active cart, creating one when there is none.
    pub async fn create_cart(
        &self,
        tenant_id: TenantId,
        request: CreateCartRequest,
    ) -> UseCaseResult<CartModel> {
        let session_id = request.session_id.filter(|s| !s.trim().is_empty());
        if session_id.is_none() && request.user_id.is_none() {
            return Err(UseCaseError::invalid("session_id or user_id is required"));
        }

        if let Some(existing) = self
            .carts
            .find_active_by_owner(tenant_id, session_id.clone(), request.user_id)
            .await?
        {
            return Ok(existing);
        }

        let currency = request
            .currency
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| c.len() == 3)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let cart = self
            .carts
            .create(tenant_id, session_id, request.user_id, currency)
            .await?;
        info!(%tenant_id, cart_id = %cart.id, "carts: cart created");
        Ok(cart)
    }

    pub async fn get_cart(&self, tenant_id: TenantId, cart_id: Uuid) -> UseCaseResult<CartModel> {
        self.carts
            .find(tenant_id, cart_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("cart"))
    }

    pub async fn add_item(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        request: AddCartItemRequest,
    ) -> UseCaseResult<CartModel> {
        if request.quantity < 1 {
            return Err(UseCaseError::invalid("quantity must be at least 1"));
        }

        let product = self
            .catalog
            .find_active_product(tenant_id, request.product_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("product"))?;

        self.mutate(
            tenant_id,
            cart_id,
            CartMutation::AddItem {
                line: product.to_cart_line(request.quantity),
                stock_quantity: product.stock_quantity,
            },
        )
        .await
    }

    /// A quantity of 0 removes the line.
    pub async fn update_item_quantity(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> UseCaseResult<CartModel> {
        let cart = self.get_cart(tenant_id, cart_id).await?;
        let line = cart
            .lines
            .iter()
            .find(|line| line.id == item_id)
            .ok_or_else(|| UseCaseError::not_found("cart item"))?;

        let stock_quantity = if quantity == 0 {
            0
        } else {
            self.catalog
                .find_active_product(tenant_id, line.product_id)
                .await?
                .ok_or_else(|| UseCaseError::not_found("product"))?
                .stock_quantity
        };

        self.mutate(
            tenant_id,
            cart_id,
            CartMutation::UpdateQuantity {
                item_id,
                quantity,
                stock_quantity,
            },
        )
        .await
    }

    pub async fn remove_item(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> UseCaseResult<CartModel> {
        self.mutate(tenant_id, cart_id, CartMutation::RemoveItem { item_id })
            .await
    }

    pub async fn set_addresses(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        request: SetCartAddressesRequest,
    ) -> UseCaseResult<CartModel> {
        for address in [&request.shipping_address, &request.billing_address]
            .into_iter()
            .flatten()
        {
            if address.country.trim().is_empty() || address.postal_code.trim().is_empty() {
                return Err(UseCaseError::invalid(
                    "address country and postal_code are required",
                ));
            }
        }

        self.mutate(
            tenant_id,
            cart_id,
            CartMutation::SetAddresses {
                shipping: request.shipping_address,
                billing: request.billing_address,
            },
        )
        .await
    }

    /// `code: None` removes the applied coupon.
    pub async fn apply_coupon(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        request: ApplyCouponRequest,
    ) -> UseCaseResult<CartModel> {
        let Some(code) = request.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
        else {
            return self
                .mutate(tenant_id, cart_id, CartMutation::ApplyCoupon(None))
                .await;
        };

        let now = Utc::now();
        let coupon = self
            .coupons
            .find_redeemable(tenant_id, code.clone(), now)
            .await?
            .filter(|coupon| coupon.is_redeemable(now))
            .ok_or_else(|| {
                warn!(%tenant_id, %cart_id, %code, "carts: coupon not redeemable");
                UseCaseError::not_found("coupon")
            })?;

        self.mutate(
            tenant_id,
            cart_id,
            CartMutation::ApplyCoupon(Some(coupon.snapshot())),
        )
        .await
    }

    /// Prices the chosen option for the current contents and destination.
    pub async fn select_shipping(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        request: SelectShippingRequest,
    ) -> UseCaseResult<CartModel> {
        let Some(option_id) = request.shipping_option_id else {
            return self
                .mutate(tenant_id, cart_id, CartMutation::SelectShipping(None))
                .await;
        };

        let cart = self.get_cart(tenant_id, cart_id).await?;
        let option = self
            .shipping_options
            .find(tenant_id, option_id)
            .await?
            .filter(|option| option.is_active)
            .ok_or_else(|| UseCaseError::not_found("shipping option"))?;

        let destination = cart
            .shipping_address
            .as_ref()
            .map(Destination::from)
            .ok_or_else(|| {
                UseCaseError::invalid("a shipping address is required to price shipping")
            })?;

        let price_minor = match option.resolve_rate(
            cart.totals.subtotal_minor,
            cart.shippable_weight_grams(),
            &destination,
        ) {
            RateResolution::Price(price_minor) => price_minor,
            RateResolution::NotApplicable => {
                return Err(UseCaseError::invalid(format!(
                    "shipping option `{}` is not available for this cart",
                    option.name
                )));
            }
        };

        self.mutate(
            tenant_id,
            cart_id,
            CartMutation::SelectShipping(Some(SelectedShipping {
                option_id,
                price_minor,
            })),
        )
        .await
    }

    /// Locks the cart items ahead of order placement.
    pub async fn start_checkout(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
    ) -> UseCaseResult<CartModel> {
        self.mutate(tenant_id, cart_id, CartMutation::StartCheckout)
            .await
    }

    pub async fn sweep_abandoned(
        &self,
        tenant_id: TenantId,
        inactive_for: Duration,
    ) -> UseCaseResult<usize> {
        let cutoff = Utc::now() - inactive_for;
        let swept = self
            .carts
            .mark_abandoned_inactive_since(tenant_id, cutoff)
            .await?;

        if swept > 0 {
            info!(%tenant_id, swept, %cutoff, "carts: abandoned carts swept");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{
        repositories::{
            carts::MockCartRepository,
            catalog::{MockCouponRepository, MockProductCatalog},
            shipping_options::MockShippingOptionRepository,
        },
        value_objects::{
            carts::{Address, CartError, CartTotals},
            catalog::ProductModel,
            enums::cart_statuses::CartStatus,
            shipping::{ShippingOptionModel, ShippingPricing},
        },
    };
    use mockall::predicate::eq;

    fn tenant() -> TenantId {
        TenantId::new(Uuid::from_u128(7))
    }

    fn empty_cart(id: Uuid) -> CartModel {
        CartModel {
            id,
            tenant_id: tenant(),
            session_id: Some("sess-1".to_string()),
            user_id: None,
            status: CartStatus::Active,
            currency: "BRL".to_string(),
            lines: Vec::new(),
            shipping_address: None,
            billing_address: None,
            coupon: None,
            shipping: None,
            totals: CartTotals::default(),
            last_activity_at: Utc::now(),
        }
    }

    fn product(price_minor: i64, weight_grams: i64, stock_quantity: i32) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            name: "Mug".to_string(),
            sku: Some("MUG-1".to_string()),
            price_minor,
            weight_grams,
            requires_shipping: true,
            is_digital: false,
            is_service: false,
            stock_quantity,
            is_active: true,
        }
    }

    fn usecase(
        carts: MockCartRepository,
        catalog: MockProductCatalog,
        shipping_options: MockShippingOptionRepository,
    ) -> CartUseCase {
        CartUseCase::new(
            Arc::new(carts),
            Arc::new(catalog),
            Arc::new(MockCouponRepository::new()),
            Arc::new(shipping_options),
        )
    }

    #[tokio::test]
    async fn add_item_snapshots_catalog_product() {
        let cart_id = Uuid::new_v4();
        let mug = product(5000, 200, 10);
        let mug_id = mug.id;

        let mut catalog = MockProductCatalog::new();
        let found = mug.clone();
        catalog
            .expect_find_active_product()
            .with(eq(tenant()), eq(mug_id))
            .times(1)
            .returning(move |_, _| Ok(Some(found.clone())));

        let mut carts = MockCartRepository::new();
        carts
            .expect_mutate()
            .times(1)
            .returning(move |_, id, mutation| {
                let mut cart = empty_cart(id);
                match cart.apply(mutation, Utc::now()) {
                    Ok(()) => Ok(CartMutationOutcome::Applied(cart)),
                    Err(rejection) => Ok(CartMutationOutcome::Rejected(rejection)),
                }
            });

        let cart = usecase(carts, catalog, MockShippingOptionRepository::new())
            .add_item(
                tenant(),
                cart_id,
                AddCartItemRequest {
                    product_id: mug_id,
                    quantity: 5,
                },
            )
            .await
            .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].unit_price_minor, 5000);
        assert_eq!(cart.totals.subtotal_minor, 25000);
        assert_eq!(cart.shippable_weight_grams(), 1000);
    }

    #[tokio::test]
    async fn add_item_beyond_stock_is_rejected() {
        let mug = product(5000, 200, 2);
        let mug_id = mug.id;

        let mut catalog = MockProductCatalog::new();
        catalog
            .expect_find_active_product()
            .returning(move |_, _| Ok(Some(mug.clone())));

        let mut carts = MockCartRepository::new();
        carts.expect_mutate().returning(|_, id, mutation| {
            let mut cart = empty_cart(id);
            Ok(match cart.apply(mutation, Utc::now()) {
                Ok(()) => CartMutationOutcome::Applied(cart),
                Err(rejection) => CartMutationOutcome::Rejected(rejection),
            })
        });

        let err = usecase(carts, catalog, MockShippingOptionRepository::new())
            .add_item(
                tenant(),
                Uuid::new_v4(),
                AddCartItemRequest {
                    product_id: mug_id,
                    quantity: 3,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message == CartError::InsufficientStock { available: 2 }.to_string()));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found_without_touching_the_cart() {
        let mut catalog = MockProductCatalog::new();
        catalog
            .expect_find_active_product()
            .returning(|_, _| Ok(None));

        let mut carts = MockCartRepository::new();
        carts.expect_mutate().never();

        let err = usecase(carts, catalog, MockShippingOptionRepository::new())
            .add_item(
                tenant(),
                Uuid::new_v4(),
                AddCartItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn inapplicable_shipping_option_is_rejected() {
        let cart_id = Uuid::new_v4();
        let option_id = Uuid::new_v4();

        let mut carts = MockCartRepository::new();
        carts.expect_find().returning(move |_, id| {
            let mut cart = empty_cart(id);
            cart.shipping_address = Some(Address {
                country: "BR".to_string(),
                postal_code: "01310-100".to_string(),
                city: "São Paulo".to_string(),
                ..Address::default()
            });
            cart.lines.push(product(1000, 100, 5).to_cart_line(1));
            cart.recalculate();
            Ok(Some(cart))
        });
        carts.expect_mutate().never();

        let mut shipping_options = MockShippingOptionRepository::new();
        shipping_options
            .expect_find()
            .with(eq(tenant()), eq(option_id))
            .returning(move |tenant_id, id| {
                Ok(Some(ShippingOptionModel {
                    id,
                    tenant_id,
                    name: "express".to_string(),
                    pricing: ShippingPricing::Fixed,
                    base_price_minor: 2500,
                    free_shipping_threshold_minor: None,
                    min_order_value_minor: Some(10_000),
                    max_order_value_minor: None,
                    estimated_delivery_days: Some(1),
                    is_active: true,
                    sort_order: 0,
                }))
            });

        let err = usecase(carts, MockProductCatalog::new(), shipping_options)
            .select_shipping(
                tenant(),
                cart_id,
                SelectShippingRequest {
                    shipping_option_id: Some(option_id),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn create_cart_reuses_the_active_cart_of_the_session() {
        let existing = Uuid::new_v4();

        let mut carts = MockCartRepository::new();
        carts
            .expect_find_active_by_owner()
            .with(eq(tenant()), eq(Some("sess-1".to_string())), eq(None))
            .returning(move |_, _, _| Ok(Some(empty_cart(existing))));
        carts.expect_create().never();

        let cart = usecase(
            carts,
            MockProductCatalog::new(),
            MockShippingOptionRepository::new(),
        )
        .create_cart(
            tenant(),
            CreateCartRequest {
                session_id: Some("sess-1".to_string()),
                ..CreateCartRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(cart.id, existing);
    }
}
