use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    catalog::{CouponModel, ProductModel},
    tenant::TenantId,
};

#[automock]
#[async_trait]
pub trait ProductCatalog {
    async fn find_active_product(
        &self,
        tenant_id: TenantId,
        product_id: Uuid,
    ) -> Result<Option<ProductModel>>;
}

#[automock]
#[async_trait]
pub trait CouponRepository {
    /// Active, unexpired coupon with the given code.
    async fn find_redeemable(
        &self,
        tenant_id: TenantId,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<CouponModel>>;
}
