use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{
            billing_cycles::BillingCycle, billing_types::BillingType,
            subscription_statuses::SubscriptionStatus,
        },
        subscriptions::{NewSubscription, SubscriptionModel},
        tenant::TenantId,
    },
    infra::db::postgres::schema::subscriptions,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions, primary_key(tenant_id, id))]
pub struct SubscriptionEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub billing_type: String,
    pub amount_minor: i64,
    pub cycle: String,
    pub status: String,
    pub gateway_subscription_id: Option<String>,
    pub gateway_customer_id: Option<String>,
    pub start_date: NaiveDate,
    pub next_billing_date: Option<NaiveDate>,
    pub trial_end_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,
    pub total_payments: i32,
    pub failed_payments: i32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub billing_type: String,
    pub amount_minor: i64,
    pub cycle: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub trial_end_date: Option<NaiveDate>,
    pub total_payments: i32,
    pub failed_payments: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertSubscriptionEntity {
    pub fn new(tenant_id: TenantId, subscription: &NewSubscription, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.as_uuid(),
            id: Uuid::new_v4(),
            customer_id: subscription.customer_id,
            description: subscription.description.clone(),
            billing_type: subscription.billing_type.to_string(),
            amount_minor: subscription.amount_minor,
            cycle: subscription.cycle.to_string(),
            status: subscription.status.to_string(),
            start_date: subscription.start_date,
            trial_end_date: subscription.trial_end_date,
            total_payments: 0,
            failed_payments: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<SubscriptionEntity> for SubscriptionModel {
    type Error = anyhow::Error;

    fn try_from(entity: SubscriptionEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            tenant_id: TenantId::new(entity.tenant_id),
            customer_id: entity.customer_id,
            description: entity.description,
            billing_type: BillingType::from_str(&entity.billing_type)
                .with_context(|| format!("unknown billing type `{}`", entity.billing_type))?,
            amount_minor: entity.amount_minor,
            cycle: BillingCycle::from_str(&entity.cycle)
                .with_context(|| format!("unknown billing cycle `{}`", entity.cycle))?,
            status: SubscriptionStatus::from_str(&entity.status)
                .with_context(|| format!("unknown subscription status `{}`", entity.status))?,
            gateway_subscription_id: entity.gateway_subscription_id,
            gateway_customer_id: entity.gateway_customer_id,
            start_date: entity.start_date,
            next_billing_date: entity.next_billing_date,
            trial_end_date: entity.trial_end_date,
            last_payment_date: entity.last_payment_date,
            total_payments: entity.total_payments,
            failed_payments: entity.failed_payments,
            cancelled_at: entity.cancelled_at,
            created_at: entity.created_at,
        })
    }
}
