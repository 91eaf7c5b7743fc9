use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{
        billing_cycles::BillingCycle, billing_types::BillingType,
        subscription_statuses::SubscriptionStatus,
    },
    tenant::TenantId,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub customer_id: Uuid,
    pub description: String,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub cycle: BillingCycle,
    pub status: SubscriptionStatus,
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
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub customer_id: Uuid,
    pub description: String,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub trial_end_date: Option<NaiveDate>,
}

/// Gateway binding written when a subscription starts billing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionActivation {
    pub gateway_subscription_id: String,
    pub gateway_customer_id: String,
    pub next_billing_date: NaiveDate,
    pub total_payments: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub customer_id: Uuid,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_document: Option<String>,
    pub description: String,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub cycle: BillingCycle,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub trial_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertTrialRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_document: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanRequest {
    #[serde(default)]
    pub amount_minor: Option<i64>,
    #[serde(default)]
    pub cycle: Option<BillingCycle>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
}
