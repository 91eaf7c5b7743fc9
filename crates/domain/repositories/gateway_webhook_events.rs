use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::tenant::TenantId;

#[automock]
#[async_trait]
pub trait WebhookEventRepository {
    /// `true` when the key was new and is now recorded.
    async fn record_if_absent(
        &self,
        tenant_id: TenantId,
        idempotency_key: String,
        event: String,
    ) -> Result<bool>;
    async fn release(&self, tenant_id: TenantId, idempotency_key: String) -> Result<()>;
}
