use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{payment_methods, payment_transactions, payments},
    },
};
use domain::{
    entities::payments::{
        InsertPaymentEntity, InsertPaymentTransactionEntity, PaymentEntity, PaymentMethodEntity,
        UpdatePaymentStatusEntity,
    },
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::payment_statuses::PaymentStatus,
        payments::{
            NewPayment, NewPaymentTransaction, PaymentMethodModel, PaymentModel,
            PaymentStatusChange,
        },
        tenant::TenantId,
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create(&self, tenant_id: TenantId, payment: NewPayment) -> Result<PaymentModel> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PaymentModel> {
            let mut conn = db_pool.get()?;

            let entity = insert_into(payments::table)
                .values(&InsertPaymentEntity::new(tenant_id, &payment, Utc::now()))
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(&mut conn)?;

            PaymentModel::try_from(entity)
        })
        .await??)
    }

    async fn find(&self, tenant_id: TenantId, payment_id: Uuid) -> Result<Option<PaymentModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentModel>> {
            let mut conn = db_pool.get()?;

            payments::table
                .find((tenant_id.as_uuid(), payment_id))
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?
                .map(PaymentModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn find_by_gateway_id(
        &self,
        tenant_id: TenantId,
        gateway_payment_id: String,
    ) -> Result<Option<PaymentModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentModel>> {
            let mut conn = db_pool.get()?;

            payments::table
                .filter(payments::tenant_id.eq(tenant_id.as_uuid()))
                .filter(payments::gateway_payment_id.eq(gateway_payment_id))
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?
                .map(PaymentModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn find_unbound_by_external_reference(
        &self,
        tenant_id: TenantId,
        external_reference: String,
    ) -> Result<Option<PaymentModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentModel>> {
            let mut conn = db_pool.get()?;

            payments::table
                .filter(payments::tenant_id.eq(tenant_id.as_uuid()))
                .filter(payments::external_reference.eq(external_reference))
                .filter(payments::gateway_payment_id.is_null())
                .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
                .order(payments::created_at.desc())
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?
                .map(PaymentModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn find_latest_for_order(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
    ) -> Result<Option<PaymentModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentModel>> {
            let mut conn = db_pool.get()?;

            payments::table
                .filter(payments::tenant_id.eq(tenant_id.as_uuid()))
                .filter(payments::order_id.eq(order_id))
                .order(payments::created_at.desc())
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?
                .map(PaymentModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn find_settled_for_order(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
    ) -> Result<Option<PaymentModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentModel>> {
            let mut conn = db_pool.get()?;

            payments::table
                .filter(payments::tenant_id.eq(tenant_id.as_uuid()))
                .filter(payments::order_id.eq(order_id))
                .filter(payments::status.eq_any([
                    PaymentStatus::Confirmed.to_string(),
                    PaymentStatus::Received.to_string(),
                    PaymentStatus::PartiallyRefunded.to_string(),
                ]))
                .order(payments::created_at.desc())
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?
                .map(PaymentModel::try_from)
                .transpose()
        })
        .await??)
    }

    async fn bind_gateway_payment(
        &self,
        tenant_id: TenantId,
        payment_id: Uuid,
        gateway_payment_id: String,
        invoice_url: Option<String>,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let updated = update(payments::table.find((tenant_id.as_uuid(), payment_id)))
                .filter(payments::gateway_payment_id.is_null())
                .set((
                    payments::gateway_payment_id.eq(Some(gateway_payment_id)),
                    payments::invoice_url.eq(invoice_url),
                    payments::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            Ok(updated == 1)
        })
        .await??)
    }

    async fn compare_and_set_status(
        &self,
        tenant_id: TenantId,
        payment_id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
        change: PaymentStatusChange,
    ) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let changes = UpdatePaymentStatusEntity {
                status: next.to_string(),
                paid_at: change.paid_at,
                refunded_minor: change.refunded_minor,
                updated_at: Utc::now(),
            };
            let target = payments::table
                .find((tenant_id.as_uuid(), payment_id))
                .filter(payments::status.eq(expected.to_string()));

            // refunded totals only grow, so a replayed refund total is a no-op
            let updated = match change.refunded_minor {
                Some(refunded_minor) => update(target.filter(payments::refunded_minor.lt(refunded_minor)))
                    .set(&changes)
                    .execute(&mut conn)?,
                None => update(target).set(&changes).execute(&mut conn)?,
            };

            Ok(updated == 1)
        })
        .await??)
    }

    async fn append_transaction(
        &self,
        tenant_id: TenantId,
        entry: NewPaymentTransaction,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            insert_into(payment_transactions::table)
                .values(&InsertPaymentTransactionEntity::new(
                    tenant_id,
                    &entry,
                    Utc::now(),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??)
    }

    async fn find_payment_method(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> Result<Option<PaymentMethodModel>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentMethodModel>> {
            let mut conn = db_pool.get()?;

            payment_methods::table
                .find((tenant_id.as_uuid(), code))
                .select(PaymentMethodEntity::as_select())
                .first::<PaymentMethodEntity>(&mut conn)
                .optional()?
                .map(PaymentMethodModel::try_from)
                .transpose()
        })
        .await??)
    }
}
