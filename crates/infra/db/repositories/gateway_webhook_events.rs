use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::gateway_webhook_events},
};
use domain::{
    entities::gateway_webhook_events::InsertGatewayWebhookEventEntity,
    repositories::gateway_webhook_events::WebhookEventRepository,
    value_objects::tenant::TenantId,
};

pub struct WebhookEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WebhookEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WebhookEventRepository for WebhookEventPostgres {
    async fn record_if_absent(
        &self,
        tenant_id: TenantId,
        idempotency_key: String,
        event: String,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let inserted = insert_into(gateway_webhook_events::table)
                .values(&InsertGatewayWebhookEventEntity {
                    tenant_id: tenant_id.as_uuid(),
                    idempotency_key,
                    event,
                    received_at: Utc::now(),
                })
                .on_conflict_do_nothing()
                .execute(&mut conn)?;

            Ok(inserted == 1)
        })
        .await??)
    }

    async fn release(&self, tenant_id: TenantId, idempotency_key: String) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            diesel::delete(gateway_webhook_events::table.find((tenant_id.as_uuid(), idempotency_key)))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??)
    }
}
