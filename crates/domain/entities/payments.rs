use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{billing_types::BillingType, payment_statuses::PaymentStatus},
        payments::{NewPayment, NewPaymentTransaction, PaymentMethodModel, PaymentModel},
        tenant::TenantId,
    },
    infra::db::postgres::schema::{payment_methods, payment_transactions, payments},
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments, primary_key(tenant_id, id))]
pub struct PaymentEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub billing_type: String,
    pub amount_minor: i64,
    pub refunded_minor: i64,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub external_reference: String,
    pub invoice_url: Option<String>,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub billing_type: String,
    pub amount_minor: i64,
    pub refunded_minor: i64,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub external_reference: String,
    pub invoice_url: Option<String>,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = payments)]
pub struct UpdatePaymentStatusEntity {
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_minor: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_transactions)]
pub struct InsertPaymentTransactionEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub payment_id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub gateway_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_methods, primary_key(tenant_id, code))]
pub struct PaymentMethodEntity {
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub billing_type: String,
    pub is_active: bool,
}

impl InsertPaymentEntity {
    pub fn new(tenant_id: TenantId, payment: &NewPayment, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.as_uuid(),
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            subscription_id: payment.subscription_id,
            billing_type: payment.billing_type.to_string(),
            amount_minor: payment.amount_minor,
            refunded_minor: 0,
            status: payment.status.to_string(),
            gateway_payment_id: payment.gateway_payment_id.clone(),
            external_reference: payment.external_reference.clone(),
            invoice_url: payment.invoice_url.clone(),
            due_date: payment.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

impl InsertPaymentTransactionEntity {
    pub fn new(tenant_id: TenantId, entry: &NewPaymentTransaction, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.as_uuid(),
            id: Uuid::new_v4(),
            payment_id: entry.payment_id,
            kind: entry.kind.to_string(),
            amount_minor: entry.amount_minor,
            gateway_reference: entry.gateway_reference.clone(),
            created_at: now,
        }
    }
}

impl TryFrom<PaymentEntity> for PaymentModel {
    type Error = anyhow::Error;

    fn try_from(entity: PaymentEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            tenant_id: TenantId::new(entity.tenant_id),
            order_id: entity.order_id,
            subscription_id: entity.subscription_id,
            billing_type: BillingType::from_str(&entity.billing_type)
                .with_context(|| format!("unknown billing type `{}`", entity.billing_type))?,
            amount_minor: entity.amount_minor,
            refunded_minor: entity.refunded_minor,
            status: PaymentStatus::from_str(&entity.status)
                .with_context(|| format!("unknown payment status `{}`", entity.status))?,
            gateway_payment_id: entity.gateway_payment_id,
            external_reference: entity.external_reference,
            invoice_url: entity.invoice_url,
            due_date: entity.due_date,
            paid_at: entity.paid_at,
            created_at: entity.created_at,
        })
    }
}

impl TryFrom<PaymentMethodEntity> for PaymentMethodModel {
    type Error = anyhow::Error;

    fn try_from(entity: PaymentMethodEntity) -> Result<Self> {
        Ok(Self {
            billing_type: BillingType::from_str(&entity.billing_type)
                .with_context(|| format!("unknown billing type `{}`", entity.billing_type))?,
            code: entity.code,
            name: entity.name,
            is_active: entity.is_active,
        })
    }
}
