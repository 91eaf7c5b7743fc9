use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{cart_items, carts},
    },
};
use domain::{
    entities::carts::{CartEntity, CartItemEntity, InsertCartEntity, UpdateCartEntity},
    repositories::carts::{CartMutationOutcome, CartRepository},
    value_objects::{
        carts::{CartModel, CartMutation},
        enums::cart_statuses::CartStatus,
        tenant::TenantId,
    },
};

pub struct CartPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CartPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn load_items(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    cart_id: Uuid,
) -> QueryResult<Vec<CartItemEntity>> {
    cart_items::table
        .filter(cart_items::tenant_id.eq(tenant_id.as_uuid()))
        .filter(cart_items::cart_id.eq(cart_id))
        .order(cart_items::position.asc())
        .select(CartItemEntity::as_select())
        .load::<CartItemEntity>(conn)
}

#[async_trait]
impl CartRepository for CartPostgres {
    async fn create(
        &self,
        tenant_id: TenantId,
        session_id: Option<String>,
        user_id: Option<Uuid>,
        currency: String,
    ) -> Result<CartModel> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<CartModel> {
            let mut conn = db_pool.get()?;

            let insert_entity = InsertCartEntity {
                tenant_id: tenant_id.as_uuid(),
                id: Uuid::new_v4(),
                session_id,
                user_id,
                status: CartStatus::Active.to_string(),
                currency,
                last_activity_at: Utc::now(),
            };

            let cart = insert_into(carts::table)
                .values(&insert_entity)
                .returning(CartEntity::as_returning())
                .get_result::<CartEntity>(&mut conn)?;

            cart.into_model(Vec::new())
        })
        .await??)
    }

    async fn find(&self, tenant_id: TenantId, cart_id: Uuid) -> Result<Option<CartModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<CartModel>> {
            let mut conn = db_pool.get()?;

            let Some(cart) = carts::table
                .find((tenant_id.as_uuid(), cart_id))
                .select(CartEntity::as_select())
                .first::<CartEntity>(&mut conn)
                .optional()?
            else {
                return Ok(None);
            };

            let items = load_items(&mut conn, tenant_id, cart_id)?;
            Ok(Some(cart.into_model(items)?))
        })
        .await??)
    }

    async fn find_active_by_owner(
        &self,
        tenant_id: TenantId,
        session_id: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<Option<CartModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<CartModel>> {
            let mut conn = db_pool.get()?;

            let mut query = carts::table
                .filter(carts::tenant_id.eq(tenant_id.as_uuid()))
                .filter(carts::status.eq(CartStatus::Active.to_string()))
                .order(carts::last_activity_at.desc())
                .select(CartEntity::as_select())
                .into_boxed();

            query = match (user_id, session_id) {
                (Some(user_id), _) => query.filter(carts::user_id.eq(user_id)),
                (None, Some(session_id)) => query.filter(carts::session_id.eq(session_id)),
                (None, None) => return Ok(None),
            };

            let Some(cart) = query.first::<CartEntity>(&mut conn).optional()? else {
                return Ok(None);
            };

            let items = load_items(&mut conn, tenant_id, cart.id)?;
            Ok(Some(cart.into_model(items)?))
        })
        .await??)
    }

    async fn mutate(
        &self,
        tenant_id: TenantId,
        cart_id: Uuid,
        mutation: CartMutation,
    ) -> Result<CartMutationOutcome> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<CartMutationOutcome> {
            let mut conn = db_pool.get()?;

            let outcome = conn.transaction::<CartMutationOutcome, anyhow::Error, _>(|conn| {
                let Some(cart) = carts::table
                    .find((tenant_id.as_uuid(), cart_id))
                    .select(CartEntity::as_select())
                    .for_update()
                    .first::<CartEntity>(conn)
                    .optional()?
                else {
                    return Ok(CartMutationOutcome::NotFound);
                };

                let items = load_items(conn, tenant_id, cart_id)?;
                let mut cart = cart.into_model(items)?;
                let now = Utc::now();

                if let Err(rejection) = cart.apply(mutation, now) {
                    return Ok(CartMutationOutcome::Rejected(rejection));
                }

                diesel::delete(
                    cart_items::table
                        .filter(cart_items::tenant_id.eq(tenant_id.as_uuid()))
                        .filter(cart_items::cart_id.eq(cart_id)),
                )
                .execute(conn)?;

                let rows: Vec<CartItemEntity> = cart
                    .lines
                    .iter()
                    .enumerate()
                    .map(|(position, line)| {
                        CartItemEntity::from_line(tenant_id, cart_id, position as i32, line, now)
                    })
                    .collect();
                if !rows.is_empty() {
                    insert_into(cart_items::table).values(&rows).execute(conn)?;
                }

                update(carts::table.find((tenant_id.as_uuid(), cart_id)))
                    .set(&UpdateCartEntity::from_model(&cart, now)?)
                    .execute(conn)?;

                Ok(CartMutationOutcome::Applied(cart))
            })?;

            Ok(outcome)
        })
        .await??)
    }

    async fn mark_abandoned_inactive_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let swept = update(carts::table)
                .filter(carts::tenant_id.eq(tenant_id.as_uuid()))
                .filter(carts::status.eq_any([
                    CartStatus::Active.to_string(),
                    CartStatus::CheckoutStarted.to_string(),
                ]))
                .filter(carts::last_activity_at.lt(cutoff))
                .set((
                    carts::status.eq(CartStatus::Abandoned.to_string()),
                    carts::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            Ok(swept)
        })
        .await??)
    }
}
