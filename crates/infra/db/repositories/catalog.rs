use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{coupons, products},
    },
};
use domain::{
    entities::catalog::{CouponEntity, ProductEntity},
    repositories::catalog::{CouponRepository, ProductCatalog},
    value_objects::{
        catalog::{CouponModel, ProductModel},
        tenant::TenantId,
    },
};

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProductCatalog for CatalogPostgres {
    async fn find_active_product(
        &self,
        tenant_id: TenantId,
        product_id: Uuid,
    ) -> Result<Option<ProductModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ProductModel>> {
            let mut conn = db_pool.get()?;

            let product = products::table
                .find((tenant_id.as_uuid(), product_id))
                .filter(products::is_active.eq(true))
                .select(ProductEntity::as_select())
                .first::<ProductEntity>(&mut conn)
                .optional()?;

            Ok(product.map(ProductModel::from))
        })
        .await??)
    }
}

#[async_trait]
impl CouponRepository for CatalogPostgres {
    async fn find_redeemable(
        &self,
        tenant_id: TenantId,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<CouponModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<CouponModel>> {
            let mut conn = db_pool.get()?;

            coupons::table
                .filter(coupons::tenant_id.eq(tenant_id.as_uuid()))
                .filter(coupons::code.eq(code))
                .filter(coupons::is_active.eq(true))
                .filter(coupons::expires_at.is_null().or(coupons::expires_at.gt(now)))
                .select(CouponEntity::as_select())
                .first::<CouponEntity>(&mut conn)
                .optional()?
                .map(CouponModel::try_from)
                .transpose()
        })
        .await??)
    }
}
