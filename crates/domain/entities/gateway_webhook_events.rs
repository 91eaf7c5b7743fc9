use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::gateway_webhook_events;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = gateway_webhook_events)]
pub struct InsertGatewayWebhookEventEntity {
    pub tenant_id: Uuid,
    pub idempotency_key: String,
    pub event: String,
    pub received_at: DateTime<Utc>,
}
