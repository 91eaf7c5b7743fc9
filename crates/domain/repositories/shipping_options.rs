use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    shipping::{NewShippingOption, ShippingOptionModel},
    tenant::TenantId,
};

#[automock]
#[async_trait]
pub trait ShippingOptionRepository {
    async fn list_active(&self, tenant_id: TenantId) -> Result<Vec<ShippingOptionModel>>;
    async fn find(
        &self,
        tenant_id: TenantId,
        option_id: Uuid,
    ) -> Result<Option<ShippingOptionModel>>;
    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewShippingOption,
    ) -> Result<ShippingOptionModel>;
    /// Rewrites every sort order in one transaction. `false` when an id is
    /// not one of the tenant's options; nothing is written in that case.
    async fn reorder(&self, tenant_id: TenantId, ordered_ids: Vec<Uuid>) -> Result<bool>;
}
