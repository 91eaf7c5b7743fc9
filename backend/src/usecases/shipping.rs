use std::sync::Arc;

use crates::domain::{
    repositories::{carts::CartRepository, shipping_options::ShippingOptionRepository},
    value_objects::{
        shipping::{
            Destination, NewShippingOption, ReorderShippingOptionsRequest, ShippingOptionModel,
            ShippingQuote, quote_shipping,
        },
        tenant::TenantId,
    },
};
use tracing::info;
use uuid::Uuid;

use super::errors::{UseCaseError, UseCaseResult};

pub struct ShippingUseCase {
    shipping_options: Arc<dyn ShippingOptionRepository + Send + Sync>,
    carts: Arc<dyn CartRepository + Send + Sync>,
}

impl ShippingUseCase {
    pub fn new(
        shipping_options: Arc<dyn ShippingOptionRepository + Send + Sync>,
        carts: Arc<dyn CartRepository + Send + Sync>,
    ) -> Self {
        Self {
            shipping_options,
            carts,
        }
    }

    pub async fn list_options(&self, tenant_id: TenantId) -> UseCaseResult<Vec<ShippingOptionModel>> {
        Ok(self.shipping_options.list_active(tenant_id).await?)
    }

    pub async fn create_option(
        &self,
        tenant_id: TenantId,
        option: NewShippingOption,
    ) -> UseCaseResult<ShippingOptionModel> {
        if option.name.trim().is_empty() {
            return Err(UseCaseError::invalid("name is required"));
        }
        if option.base_price_minor < 0 {
            return Err(UseCaseError::invalid("base_price_minor cannot be negative"));
        }
        if let (Some(min), Some(max)) = (option.min_order_value_minor, option.max_order_value_minor)
        {
            if min > max {
                return Err(UseCaseError::invalid(
                    "min_order_value_minor cannot exceed max_order_value_minor",
                ));
            }
        }

        let created = self.shipping_options.create(tenant_id, option).await?;
        info!(%tenant_id, option_id = %created.id, "shipping: option created");
        Ok(created)
    }

    pub async fn reorder(
        &self,
        tenant_id: TenantId,
        request: ReorderShippingOptionsRequest,
    ) -> UseCaseResult<()> {
        if request.ordered_ids.is_empty() {
            return Err(UseCaseError::invalid("ordered_ids cannot be empty"));
        }

        if !self
            .shipping_options
            .reorder(tenant_id, request.ordered_ids)
            .await?
        {
            return Err(UseCaseError::not_found("shipping option"));
        }
        Ok(())
    }

    /// Every applicable option priced for the cart's contents and destination.
    pub async fn quote_for_cart(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
    ) -> UseCaseResult<Vec<ShippingQuote>> {
        let cart = self
            .carts
            .find(tenant_id, cart_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("cart"))?;

        let destination = cart
            .shipping_address
            .as_ref()
            .map(Destination::from)
            .ok_or_else(|| {
                UseCaseError::invalid("a shipping address is required to quote shipping")
            })?;

        let options = self.shipping_options.list_active(tenant_id).await?;
        Ok(quote_shipping(
            &options,
            cart.totals.subtotal_minor,
            cart.shippable_weight_grams(),
            &destination,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{
        repositories::{carts::MockCartRepository, shipping_options::MockShippingOptionRepository},
        value_objects::shipping::ShippingPricing,
    };

    fn tenant() -> TenantId {
        TenantId::new(Uuid::from_u128(3))
    }

    #[tokio::test]
    async fn reorder_with_foreign_id_is_not_found() {
        let mut options = MockShippingOptionRepository::new();
        options.expect_reorder().times(1).returning(|_, _| Ok(false));

        let err = ShippingUseCase::new(Arc::new(options), Arc::new(MockCartRepository::new()))
            .reorder(
                tenant(),
                ReorderShippingOptionsRequest {
                    ordered_ids: vec![Uuid::new_v4()],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn inverted_order_bounds_are_rejected_before_storage() {
        let mut options = MockShippingOptionRepository::new();
        options.expect_create().never();

        let err = ShippingUseCase::new(Arc::new(options), Arc::new(MockCartRepository::new()))
            .create_option(
                tenant(),
                NewShippingOption {
                    name: "standard".to_string(),
                    pricing: ShippingPricing::Fixed,
                    base_price_minor: 1_000,
                    free_shipping_threshold_minor: None,
                    min_order_value_minor: Some(5_000),
                    max_order_value_minor: Some(1_000),
                    estimated_delivery_days: None,
                    sort_order: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn quote_requires_a_shipping_address() {
        let mut carts = MockCartRepository::new();
        carts.expect_find().returning(|tenant_id, id| {
            Ok(Some(crates::domain::value_objects::carts::CartModel {
                id,
                tenant_id,
                session_id: None,
                user_id: Some(Uuid::new_v4()),
                status: crates::domain::value_objects::enums::cart_statuses::CartStatus::Active,
                currency: "BRL".to_string(),
                lines: Vec::new(),
                shipping_address: None,
                billing_address: None,
                coupon: None,
                shipping: None,
                totals: Default::default(),
                last_activity_at: chrono::Utc::now(),
            }))
        });
        let mut options = MockShippingOptionRepository::new();
        options.expect_list_active().never();

        let err = ShippingUseCase::new(Arc::new(options), Arc::new(carts))
            .quote_for_cart(tenant(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }
}
