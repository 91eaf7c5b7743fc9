use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::tenant::TenantId;

#[automock]
#[async_trait]
pub trait TenantRepository {
    /// Every tenant with settings on file. Used by batch jobs that walk all tenants.
    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>>;
}
