use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};
use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::{PlanChange, SubscriptionRepository},
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        subscriptions::{NewSubscription, SubscriptionActivation, SubscriptionModel},
        tenant::TenantId,
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_models(entities: Vec<SubscriptionEntity>) -> Result<Vec<SubscriptionModel>> {
    entities
        .into_iter()
        .map(SubscriptionModel::try_from)
        .collect()
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn create(
        &self,
        tenant_id: TenantId,
        subscription: NewSubscription,
    ) -> Result<SubscriptionModel> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<SubscriptionModel> {
            let mut conn = db_pool.get()?;

            let entity = insert_into(subscriptions::table)
                .values(&InsertSubscriptionEntity::new(
                    tenant_id,
                    &subscription,
                    Utc::now(),
                ))
                .returning(SubscriptionEntity::as_returning())
                .get_result::<SubscriptionEntity>(&mut conn)?;

            SubscriptionModel::try_from(entity)
        })
        .await??)
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionModel>> {
            let mut conn = db_pool.get()?;

            subscriptions::table
                .find((tenant_id.as_uuid(), subscription_id))
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(&mut conn)
                .optional()?
                .map(SubscriptionModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn find_by_gateway_id(
        &self,
        tenant_id: TenantId,
        gateway_subscription_id: String,
    ) -> Result<Option<SubscriptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionModel>> {
            let mut conn = db_pool.get()?;

            subscriptions::table
                .filter(subscriptions::tenant_id.eq(tenant_id.as_uuid()))
                .filter(subscriptions::gateway_subscription_id.eq(gateway_subscription_id))
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(&mut conn)
                .optional()?
                .map(SubscriptionModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn activate(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        activation: SubscriptionActivation,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let updated = update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                .filter(subscriptions::status.eq(expected.to_string()))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Active.to_string()),
                    subscriptions::gateway_subscription_id.eq(Some(activation.gateway_subscription_id)),
                    subscriptions::gateway_customer_id.eq(Some(activation.gateway_customer_id)),
                    subscriptions::next_billing_date.eq(Some(activation.next_billing_date)),
                    subscriptions::total_payments.eq(activation.total_payments),
                    subscriptions::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            Ok(updated == 1)
        })
        .await??)
    }

    async fn compare_and_set_status(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let target = update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                .filter(subscriptions::status.eq(expected.to_string()));

            let updated = match cancelled_at {
                Some(cancelled_at) => target
                    .set((
                        subscriptions::status.eq(next.to_string()),
                        subscriptions::cancelled_at.eq(Some(cancelled_at)),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
                None => target
                    .set((
                        subscriptions::status.eq(next.to_string()),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
            };

            Ok(updated == 1)
        })
        .await??)
    }

    async fn advance_billing_date(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: Option<NaiveDate>,
        next: NaiveDate,
        paid_on: Option<NaiveDate>,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let target = update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                .filter(subscriptions::next_billing_date.is_not_distinct_from(expected));

            let updated = match paid_on {
                Some(paid_on) => target
                    .set((
                        subscriptions::next_billing_date.eq(Some(next)),
                        subscriptions::total_payments.eq(subscriptions::total_payments + 1),
                        subscriptions::last_payment_date.eq(Some(paid_on)),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
                None => target
                    .set((
                        subscriptions::next_billing_date.eq(Some(next)),
                        subscriptions::total_payments.eq(subscriptions::total_payments + 1),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
            };

            Ok(updated == 1)
        })
        .await??)
    }

    async fn record_payment_success(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        paid_on: NaiveDate,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            let now = Utc::now();

            conn.transaction::<(), diesel::result::Error, _>(|conn| {
                update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                    .set((
                        subscriptions::last_payment_date.eq(Some(paid_on)),
                        subscriptions::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                    .filter(subscriptions::status.eq(SubscriptionStatus::Overdue.to_string()))
                    .set(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                    .execute(conn)?;

                Ok(())
            })?;

            Ok(())
        })
        .await??)
    }

    async fn record_payment_failure(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            let now = Utc::now();

            conn.transaction::<(), diesel::result::Error, _>(|conn| {
                update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                    .set((
                        subscriptions::failed_payments.eq(subscriptions::failed_payments + 1),
                        subscriptions::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                    .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                    .set(subscriptions::status.eq(SubscriptionStatus::Overdue.to_string()))
                    .execute(conn)?;

                Ok(())
            })?;

            Ok(())
        })
        .await??)
    }

    async fn update_plan(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        change: PlanChange,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let target = update(subscriptions::table.find((tenant_id.as_uuid(), subscription_id)))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()));

            let updated = match change.next_billing_date {
                Some(next_billing_date) => target
                    .set((
                        subscriptions::amount_minor.eq(change.amount_minor),
                        subscriptions::cycle.eq(change.cycle.to_string()),
                        subscriptions::description.eq(change.description),
                        subscriptions::next_billing_date.eq(Some(next_billing_date)),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
                None => target
                    .set((
                        subscriptions::amount_minor.eq(change.amount_minor),
                        subscriptions::cycle.eq(change.cycle.to_string()),
                        subscriptions::description.eq(change.description),
                        subscriptions::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?,
            };

            Ok(updated == 1)
        })
        .await??)
    }

    async fn list_due_for_renewal(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<Vec<SubscriptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<SubscriptionModel>> {
            let mut conn = db_pool.get()?;

            let due = subscriptions::table
                .filter(subscriptions::tenant_id.eq(tenant_id.as_uuid()))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .filter(subscriptions::next_billing_date.le(today))
                .order(subscriptions::next_billing_date.asc())
                .select(SubscriptionEntity::as_select())
                .load::<SubscriptionEntity>(&mut conn)?;

            into_models(due)
        })
        .await??)
    }

    async fn list_trials_ending(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<Vec<SubscriptionModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<SubscriptionModel>> {
            let mut conn = db_pool.get()?;

            let ending = subscriptions::table
                .filter(subscriptions::tenant_id.eq(tenant_id.as_uuid()))
                .filter(subscriptions::status.eq(SubscriptionStatus::Trial.to_string()))
                .filter(subscriptions::trial_end_date.le(today))
                .order(subscriptions::trial_end_date.asc())
                .select(SubscriptionEntity::as_select())
                .load::<SubscriptionEntity>(&mut conn)?;

            into_models(ending)
        })
        .await??)
    }
}
