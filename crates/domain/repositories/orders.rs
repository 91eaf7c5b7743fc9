use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::order_item_statuses::OrderItemStatus,
    order_state::{OrderItemTimestamps, OrderState},
    orders::{OrderDraft, OrderModel},
    tenant::TenantId,
};

#[derive(Debug)]
pub enum OrderCreation {
    Created(OrderModel),
    /// The cart was converted or abandoned before this checkout committed.
    CartUnavailable,
}

#[automock]
#[async_trait]
pub trait OrderRepository {
    /// Allocates the order number, stores order and items, and converts the
    /// cart, all in one transaction.
    async fn create_from_cart(&self, tenant_id: TenantId, draft: OrderDraft)
    -> Result<OrderCreation>;
    async fn find(&self, tenant_id: TenantId, order_id: Uuid) -> Result<Option<OrderModel>>;
    /// Writes `next` only while the row still matches `expected`.
    async fn apply_transition(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        expected: OrderState,
        next: OrderState,
    ) -> Result<bool>;
    async fn update_item_status(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        item_id: Uuid,
        expected: OrderItemStatus,
        next: OrderItemStatus,
        timestamps: OrderItemTimestamps,
    ) -> Result<bool>;
}
