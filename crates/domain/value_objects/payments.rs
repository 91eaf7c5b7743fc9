use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{
        billing_types::BillingType, payment_statuses::PaymentStatus,
        transaction_kinds::TransactionKind,
    },
    tenant::TenantId,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub refunded_minor: i64,
    pub status: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub external_reference: String,
    pub invoice_url: Option<String>,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentModel {
    pub fn is_bound(&self) -> bool {
        self.gateway_payment_id.is_some()
    }

    /// A pending attempt already registered at the gateway can be handed out again.
    pub fn is_reusable(&self) -> bool {
        self.status == PaymentStatus::Pending && self.is_bound()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub external_reference: String,
    pub invoice_url: Option<String>,
    pub due_date: NaiveDate,
}

/// Columns written together with a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentStatusChange {
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_minor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentTransaction {
    pub payment_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentMethodModel {
    pub code: String,
    pub name: String,
    pub billing_type: BillingType,
    pub is_active: bool,
}
