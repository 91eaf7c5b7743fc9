use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    carts::{CartError, CartModel, CartMutation},
    tenant::TenantId,
};

#[derive(Debug)]
pub enum CartMutationOutcome {
    Applied(CartModel),
    Rejected(CartError),
    NotFound,
}

#[automock]
#[async_trait]
pub trait CartRepository {
    async fn create(
        &self,
        tenant_id: TenantId,
        session_id: Option<String>,
        user_id: Option<Uuid>,
        currency: String,
    ) -> Result<CartModel>;
    async fn find(&self, tenant_id: TenantId, cart_id: Uuid) -> Result<Option<CartModel>>;
    async fn find_active_by_owner(
        &self,
        tenant_id: TenantId,
        session_id: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<Option<CartModel>>;
    /// Locks the cart row, applies the mutation and writes items and totals
    /// back in one transaction.
    async fn mutate(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        mutation: CartMutation,
    ) -> Result<CartMutationOutcome>;
    async fn mark_abandoned_inactive_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<usize>;
}
