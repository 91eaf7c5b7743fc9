use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus},
    subscriptions::{NewSubscription, SubscriptionActivation, SubscriptionModel},
    tenant::TenantId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanChange {
    pub amount_minor: i64,
    pub cycle: BillingCycle,
    pub description: String,
    pub next_billing_date: Option<NaiveDate>,
}

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn create(
        &self,
        tenant_id: TenantId,
        subscription: NewSubscription,
    ) -> Result<SubscriptionModel>;
    async fn find(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionModel>>;
    async fn find_by_gateway_id(
        &self,
        tenant_id: TenantId,
        gateway_subscription_id: String,
    ) -> Result<Option<SubscriptionModel>>;
    async fn activate(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        activation: SubscriptionActivation,
    ) -> Result<bool>;
    async fn compare_and_set_status(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;
    /// Moves `next_billing_date` from `expected` to `next` and counts the cycle.
    async fn advance_billing_date(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        expected: Option<NaiveDate>,
        next: NaiveDate,
        paid_on: Option<NaiveDate>,
    ) -> Result<bool>;
    /// Records a collected cycle payment, lifting an overdue subscription back to active.
    async fn record_payment_success(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        paid_on: NaiveDate,
    ) -> Result<()>;
    async fn record_payment_failure(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> Result<()>;
    async fn update_plan(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        change: PlanChange,
    ) -> Result<bool>;
    async fn list_due_for_renewal(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<Vec<SubscriptionModel>>;
    async fn list_trials_ending(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<Vec<SubscriptionModel>>;
}
