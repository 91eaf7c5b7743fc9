use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{dsl::count_star, insert_into, prelude::*, update};
use std::{collections::HashSet, sync::Arc};
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::shipping_options},
};
use domain::{
    entities::shipping_options::{InsertShippingOptionEntity, ShippingOptionEntity},
    repositories::shipping_options::ShippingOptionRepository,
    value_objects::{
        shipping::{NewShippingOption, ShippingOptionModel},
        tenant::TenantId,
    },
};

pub struct ShippingOptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ShippingOptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ShippingOptionRepository for ShippingOptionPostgres {
    async fn list_active(&self, tenant_id: TenantId) -> Result<Vec<ShippingOptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<ShippingOptionModel>> {
            let mut conn = db_pool.get()?;

            let results = shipping_options::table
                .filter(shipping_options::tenant_id.eq(tenant_id.as_uuid()))
                .filter(shipping_options::is_active.eq(true))
                .order((shipping_options::sort_order.asc(), shipping_options::name.asc()))
                .select(ShippingOptionEntity::as_select())
                .load::<ShippingOptionEntity>(&mut conn)?;

            results
                .into_iter()
                .map(ShippingOptionModel::try_from)
                .collect()
        })
        .await??)
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        option_id: Uuid,
    ) -> Result<Option<ShippingOptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ShippingOptionModel>> {
            let mut conn = db_pool.get()?;

            shipping_options::table
                .find((tenant_id.as_uuid(), option_id))
                .select(ShippingOptionEntity::as_select())
                .first::<ShippingOptionEntity>(&mut conn)
                .optional()?
                .map(ShippingOptionModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewShippingOption,
    ) -> Result<ShippingOptionModel> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<ShippingOptionModel> {
            let mut conn = db_pool.get()?;

            let entity = insert_into(shipping_options::table)
                .values(&InsertShippingOptionEntity::new(tenant_id, option, Utc::now())?)
                .returning(ShippingOptionEntity::as_returning())
                .get_result::<ShippingOptionEntity>(&mut conn)?;

            ShippingOptionModel::try_from(entity)
        })
        .await??)
    }

    async fn reorder(&self, tenant_id: TenantId, ordered_ids: Vec<Uuid>) -> Result<bool> {
        let unique: HashSet<Uuid> = ordered_ids.iter().copied().collect();
        if unique.len() != ordered_ids.len() {
            return Ok(false);
        }

        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let now = Utc::now();

            let reordered = conn.transaction::<bool, diesel::result::Error, _>(|conn| {
                let owned = shipping_options::table
                    .filter(shipping_options::tenant_id.eq(tenant_id.as_uuid()))
                    .filter(shipping_options::id.eq_any(&ordered_ids))
                    .select(count_star())
                    .first::<i64>(conn)?;
                if owned != ordered_ids.len() as i64 {
                    return Ok(false);
                }

                for (position, option_id) in ordered_ids.iter().enumerate() {
                    update(shipping_options::table.find((tenant_id.as_uuid(), *option_id)))
                        .set((
                            shipping_options::sort_order.eq(position as i32),
                            shipping_options::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }

                Ok(true)
            })?;

            Ok(reordered)
        })
        .await??)
    }
}
