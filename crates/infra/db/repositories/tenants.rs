use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::tenant_settings},
};
use domain::{repositories::tenants::TenantRepository, value_objects::tenant::TenantId};

pub struct TenantPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TenantPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TenantRepository for TenantPostgres {
    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<TenantId>> {
            let mut conn = db_pool.get()?;

            let ids = tenant_settings::table
                .select(tenant_settings::tenant_id)
                .order(tenant_settings::created_at.asc())
                .load::<Uuid>(&mut conn)?;

            Ok(ids.into_iter().map(TenantId::new).collect())
        })
        .await??)
    }
}
