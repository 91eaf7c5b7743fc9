use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{PgConnection, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{carts, order_items, order_number_sequences, orders, tenant_settings},
    },
};
use domain::{
    entities::orders::{
        InsertOrderEntity, InsertOrderNumberSequenceEntity, OrderEntity, OrderItemEntity,
        UpdateOrderItemStatusEntity, UpdateOrderStateEntity,
    },
    repositories::orders::{OrderCreation, OrderRepository},
    value_objects::{
        enums::{cart_statuses::CartStatus, order_item_statuses::OrderItemStatus},
        order_state::{OrderItemTimestamps, OrderState},
        orders::{DEFAULT_ORDER_NUMBER_PREFIX, OrderDraft, OrderModel, format_order_number},
        tenant::TenantId,
    },
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn load_items(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    order_id: Uuid,
) -> QueryResult<Vec<OrderItemEntity>> {
    order_items::table
        .filter(order_items::tenant_id.eq(tenant_id.as_uuid()))
        .filter(order_items::order_id.eq(order_id))
        .order((order_items::created_at.asc(), order_items::id.asc()))
        .select(OrderItemEntity::as_select())
        .load::<OrderItemEntity>(conn)
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_from_cart(
        &self,
        tenant_id: TenantId,
        draft: OrderDraft,
    ) -> Result<OrderCreation> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<OrderCreation> {
            let mut conn = db_pool.get()?;

            let now = Utc::now();

            let creation = conn.transaction::<OrderCreation, anyhow::Error, _>(|conn| {
                // a cart yields at most one order
                let converted = update(carts::table.find((tenant_id.as_uuid(), draft.cart_id)))
                    .filter(carts::status.eq(CartStatus::CheckoutStarted.to_string()))
                    .set((
                        carts::status.eq(CartStatus::Converted.to_string()),
                        carts::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                if converted == 0 {
                    return Ok(OrderCreation::CartUnavailable);
                }

                let prefix = tenant_settings::table
                    .find(tenant_id.as_uuid())
                    .select(tenant_settings::order_number_prefix)
                    .first::<String>(conn)
                    .optional()?
                    .unwrap_or_else(|| DEFAULT_ORDER_NUMBER_PREFIX.to_string());

                let day = now.date_naive();
                let sequence = insert_into(order_number_sequences::table)
                    .values(&InsertOrderNumberSequenceEntity {
                        tenant_id: tenant_id.as_uuid(),
                        day,
                        last_value: 1,
                    })
                    .on_conflict((order_number_sequences::tenant_id, order_number_sequences::day))
                    .do_update()
                    .set(order_number_sequences::last_value.eq(order_number_sequences::last_value + 1))
                    .returning(order_number_sequences::last_value)
                    .get_result::<i64>(conn)?;

                let order_number = format_order_number(&prefix, day, sequence);
                let order = insert_into(orders::table)
                    .values(&InsertOrderEntity::from_draft(tenant_id, order_number, &draft)?)
                    .returning(OrderEntity::as_returning())
                    .get_result::<OrderEntity>(conn)?;

                let items: Vec<OrderItemEntity> = draft
                    .lines
                    .iter()
                    .map(|line| OrderItemEntity::from_line(tenant_id, order.id, line, now))
                    .collect();
                if !items.is_empty() {
                    insert_into(order_items::table).values(&items).execute(conn)?;
                }

                Ok(OrderCreation::Created(order.into_model(items)?))
            })?;

            Ok(creation)
        })
        .await??)
    }

    async fn find(&self, tenant_id: TenantId, order_id: Uuid) -> Result<Option<OrderModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<OrderModel>> {
            let mut conn = db_pool.get()?;

            let Some(order) = orders::table
                .find((tenant_id.as_uuid(), order_id))
                .select(OrderEntity::as_select())
                .first::<OrderEntity>(&mut conn)
                .optional()?
            else {
                return Ok(None);
            };

            let items = load_items(&mut conn, tenant_id, order_id)?;
            Ok(Some(order.into_model(items)?))
        })
        .await??)
    }

    async fn apply_transition(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        expected: OrderState,
        next: OrderState,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let updated = update(orders::table.find((tenant_id.as_uuid(), order_id)))
                .filter(orders::status.eq(expected.status.to_string()))
                .filter(orders::payment_status.eq(expected.payment_status.to_string()))
                .filter(orders::fulfillment_status.eq(expected.fulfillment_status.to_string()))
                .filter(orders::refunded_minor.eq(expected.refunded_minor))
                .set(&UpdateOrderStateEntity::from_state(&next, Utc::now()))
                .execute(&mut conn)?;

            Ok(updated == 1)
        })
        .await??)
    }

    async fn update_item_status(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        item_id: Uuid,
        expected: OrderItemStatus,
        next: OrderItemStatus,
        timestamps: OrderItemTimestamps,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let updated = update(order_items::table.find((tenant_id.as_uuid(), item_id)))
                .filter(order_items::order_id.eq(order_id))
                .filter(order_items::status.eq(expected.to_string()))
                .set(&UpdateOrderItemStatusEntity {
                    status: next.to_string(),
                    shipped_at: timestamps.shipped_at,
                    delivered_at: timestamps.delivered_at,
                    cancelled_at: timestamps.cancelled_at,
                    refunded_at: timestamps.refunded_at,
                    updated_at: Utc::now(),
                })
                .execute(&mut conn)?;

            Ok(updated == 1)
        })
        .await??)
    }
}
