use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use crates::{
    domain::{
        repositories::{
            payments::PaymentRepository,
            subscriptions::{PlanChange, SubscriptionRepository},
        },
        value_objects::{
            enums::{payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus},
            payments::NewPayment,
            subscriptions::{
                BatchReport, ChangePlanRequest, ConvertTrialRequest, CreateSubscriptionRequest,
                NewSubscription, SubscriptionActivation, SubscriptionModel,
            },
            tenant::TenantId,
        },
    },
    payments::gateway_client::{CustomerRequest, RecurringRequest, RecurringUpdate},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{UseCaseError, UseCaseResult},
    payment_gateway::PaymentGateway,
};

pub const DEFAULT_TRIAL_DAYS: u32 = 15;

fn gateway_failure(err: anyhow::Error) -> UseCaseError {
    UseCaseError::Gateway(err.to_string())
}

pub struct SubscriptionUseCase {
    subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
    payments: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
}

impl SubscriptionUseCase {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
        payments: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            gateway,
        }
    }

    pub async fn get_subscription(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> UseCaseResult<SubscriptionModel> {
        self.subscriptions
            .find(tenant_id, subscription_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("subscription"))
    }

    /// Trials are stored locally only; the gateway hears about them when
    /// they convert.
    pub async fn create_subscription(
        &self,
        tenant_id: TenantId,
        request: CreateSubscriptionRequest,
    ) -> UseCaseResult<SubscriptionModel> {
        if request.amount_minor <= 0 {
            return Err(UseCaseError::invalid("amount_minor must be positive"));
        }
        if request.description.trim().is_empty() {
            return Err(UseCaseError::invalid("description is required"));
        }

        let start_date = request
            .start_date
            .unwrap_or_else(|| Utc::now().date_naive());

        if request.is_trial {
            let trial_days = request.trial_days.unwrap_or(DEFAULT_TRIAL_DAYS);
            let trial_end_date = start_date
                .checked_add_days(Days::new(u64::from(trial_days)))
                .ok_or_else(|| UseCaseError::invalid("trial_days is out of range"))?;

            let subscription = self
                .subscriptions
                .create(
                    tenant_id,
                    NewSubscription {
                        customer_id: request.customer_id,
                        description: request.description,
                        billing_type: request.billing_type,
                        amount_minor: request.amount_minor,
                        cycle: request.cycle,
                        status: SubscriptionStatus::Trial,
                        start_date,
                        trial_end_date: Some(trial_end_date),
                    },
                )
                .await?;
            info!(%tenant_id, subscription_id = %subscription.id, %trial_end_date, "subscriptions: trial started");
            return Ok(subscription);
        }

        let subscription = self
            .subscriptions
            .create(
                tenant_id,
                NewSubscription {
                    customer_id: request.customer_id,
                    description: request.description,
                    billing_type: request.billing_type,
                    amount_minor: request.amount_minor,
                    cycle: request.cycle,
                    status: SubscriptionStatus::Pending,
                    start_date,
                    trial_end_date: None,
                },
            )
            .await?;

        let identity = CustomerRequest {
            name: request.customer_name,
            email: request.customer_email,
            document: request.customer_document,
            external_reference: Some(request.customer_id.to_string()),
        };
        let subscription_id = subscription.id;
        match self.start_billing(tenant_id, subscription, identity).await {
            Err(err @ UseCaseError::Gateway(_)) => {
                self.abandon_pending(tenant_id, subscription_id).await;
                Err(err)
            }
            result => result,
        }
    }

    /// Closes a row whose gateway registration never happened so it does not
    /// linger as pending.
    async fn abandon_pending(&self, tenant_id: TenantId, subscription_id: Uuid) {
        match self
            .subscriptions
            .compare_and_set_status(
                tenant_id,
                subscription_id,
                SubscriptionStatus::Pending,
                SubscriptionStatus::Cancelled,
                Some(Utc::now()),
            )
            .await
        {
            Ok(true) => {
                warn!(%tenant_id, %subscription_id, "subscriptions: pending subscription cancelled after gateway failure");
            }
            Ok(false) => {}
            Err(err) => {
                error!(%tenant_id, %subscription_id, db_error = ?err, "subscriptions: failed to cancel pending subscription");
            }
        }
    }

    pub async fn convert_trial(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        request: ConvertTrialRequest,
    ) -> UseCaseResult<SubscriptionModel> {
        let subscription = self.get_subscription(tenant_id, subscription_id).await?;
        if subscription.status != SubscriptionStatus::Trial {
            return Err(UseCaseError::invalid(format!(
                "only trial subscriptions can be converted, this one is {}",
                subscription.status
            )));
        }

        let identity = CustomerRequest {
            name: request.customer_name,
            email: request.customer_email,
            document: request.customer_document,
            external_reference: Some(subscription.customer_id.to_string()),
        };
        self.start_billing(tenant_id, subscription, identity).await
    }

    /// Registers the recurring charge and records its first invoice.
    async fn start_billing(
        &self,
        tenant_id: TenantId,
        subscription: SubscriptionModel,
        identity: CustomerRequest,
    ) -> UseCaseResult<SubscriptionModel> {
        let today = Utc::now().date_naive();
        let first_due = subscription.start_date.max(today);

        let gateway_customer_id = match subscription.gateway_customer_id.clone() {
            Some(id) => id,
            None => self
                .gateway
                .create_customer(identity)
                .await
                .map_err(gateway_failure)?,
        };

        let recurring = self
            .gateway
            .create_subscription(RecurringRequest {
                customer: gateway_customer_id.clone(),
                billing_type: subscription.billing_type,
                amount_minor: subscription.amount_minor,
                next_due_date: first_due,
                cycle: subscription.cycle,
                description: subscription.description.clone(),
                external_reference: subscription.id.to_string(),
            })
            .await
            .map_err(|err| {
                error!(%tenant_id, subscription_id = %subscription.id, error = ?err, "subscriptions: gateway registration failed");
                gateway_failure(err)
            })?;

        let first_invoice = match self
            .gateway
            .list_subscription_payments(recurring.id.clone())
            .await
        {
            Ok(charges) => charges.into_iter().next(),
            Err(err) => {
                // the cycle charge still arrives through PAYMENT_CREATED
                warn!(%tenant_id, subscription_id = %subscription.id, error = ?err, "subscriptions: first invoice not fetched");
                None
            }
        };

        let mut anchor = first_due;
        if let Some(charge) = &first_invoice {
            anchor = charge.due_date.unwrap_or(first_due);
            self.payments
                .create(
                    tenant_id,
                    NewPayment {
                        order_id: None,
                        subscription_id: Some(subscription.id),
                        billing_type: subscription.billing_type,
                        amount_minor: subscription.amount_minor,
                        status: PaymentStatus::Pending,
                        gateway_payment_id: Some(charge.id.clone()),
                        external_reference: subscription.id.to_string(),
                        invoice_url: charge.invoice_url.clone(),
                        due_date: anchor,
                    },
                )
                .await?;
        }

        let activation = SubscriptionActivation {
            gateway_subscription_id: recurring.id,
            gateway_customer_id,
            next_billing_date: subscription
                .cycle
                .advance(anchor)
                .ok_or_else(|| UseCaseError::invalid("next billing date is out of range"))?,
            total_payments: i32::from(first_invoice.is_some()),
        };

        let activated = self
            .subscriptions
            .activate(
                tenant_id,
                subscription.id,
                subscription.status,
                activation.clone(),
            )
            .await?;
        if !activated {
            return Err(UseCaseError::concurrent_modification("subscription"));
        }

        info!(
            %tenant_id,
            subscription_id = %subscription.id,
            gateway_subscription_id = %activation.gateway_subscription_id,
            next_billing_date = %activation.next_billing_date,
            "subscriptions: billing started"
        );
        Ok(SubscriptionModel {
            status: SubscriptionStatus::Active,
            gateway_subscription_id: Some(activation.gateway_subscription_id),
            gateway_customer_id: Some(activation.gateway_customer_id),
            next_billing_date: Some(activation.next_billing_date),
            total_payments: activation.total_payments,
            ..subscription
        })
    }

    pub async fn change_plan(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        request: ChangePlanRequest,
    ) -> UseCaseResult<SubscriptionModel> {
        let subscription = self.get_subscription(tenant_id, subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(UseCaseError::invalid(format!(
                "only active subscriptions can change plan, this one is {}",
                subscription.status
            )));
        }
        if request.amount_minor.is_some_and(|amount| amount <= 0) {
            return Err(UseCaseError::invalid("amount_minor must be positive"));
        }

        let cycle = request.cycle.unwrap_or(subscription.cycle);
        let cycle_changed = cycle != subscription.cycle;
        let next_billing_date = if cycle_changed {
            let anchor = subscription
                .last_payment_date
                .unwrap_or(subscription.start_date);
            let recomputed = cycle.advance(anchor);
            match (recomputed, subscription.next_billing_date) {
                (Some(recomputed), Some(current)) => Some(recomputed.max(current)),
                (recomputed, current) => recomputed.or(current),
            }
        } else {
            subscription.next_billing_date
        };

        let change = PlanChange {
            amount_minor: request.amount_minor.unwrap_or(subscription.amount_minor),
            cycle,
            description: request
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| subscription.description.clone()),
            next_billing_date,
        };

        if let Some(gateway_subscription_id) = subscription.gateway_subscription_id.clone() {
            let update = RecurringUpdate {
                amount_minor: (change.amount_minor != subscription.amount_minor)
                    .then_some(change.amount_minor),
                cycle: cycle_changed.then_some(cycle),
                description: (change.description != subscription.description)
                    .then(|| change.description.clone()),
                next_due_date: if cycle_changed { next_billing_date } else { None },
            };
            self.gateway
                .update_subscription(gateway_subscription_id, update)
                .await
                .map_err(gateway_failure)?;
        }

        if !self
            .subscriptions
            .update_plan(tenant_id, subscription_id, change.clone())
            .await?
        {
            return Err(UseCaseError::concurrent_modification("subscription"));
        }

        info!(%tenant_id, %subscription_id, amount_minor = change.amount_minor, %cycle, "subscriptions: plan changed");
        Ok(SubscriptionModel {
            amount_minor: change.amount_minor,
            cycle: change.cycle,
            description: change.description,
            next_billing_date: change.next_billing_date,
            ..subscription
        })
    }

    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
    ) -> UseCaseResult<SubscriptionModel> {
        let subscription = self.get_subscription(tenant_id, subscription_id).await?;
        if subscription.status.is_closed() {
            return Err(UseCaseError::invalid(format!(
                "subscription is already {}",
                subscription.status
            )));
        }

        if let Some(gateway_subscription_id) = subscription.gateway_subscription_id.clone() {
            self.gateway
                .cancel_subscription(gateway_subscription_id)
                .await
                .map_err(gateway_failure)?;
        }

        let cancelled_at = Utc::now();
        if !self
            .subscriptions
            .compare_and_set_status(
                tenant_id,
                subscription_id,
                subscription.status,
                SubscriptionStatus::Cancelled,
                Some(cancelled_at),
            )
            .await?
        {
            return Err(UseCaseError::concurrent_modification("subscription"));
        }

        info!(%tenant_id, %subscription_id, "subscriptions: cancelled");
        Ok(SubscriptionModel {
            status: SubscriptionStatus::Cancelled,
            cancelled_at: Some(cancelled_at),
            ..subscription
        })
    }

    /// Advances every due subscription by one cycle. A subscription another
    /// writer already advanced is skipped.
    pub async fn process_renewals(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> UseCaseResult<BatchReport> {
        let due = self.subscriptions.list_due_for_renewal(tenant_id, today).await?;
        let mut report = BatchReport::default();

        for subscription in due {
            let Some(current) = subscription.next_billing_date else {
                continue;
            };
            let Some(next) = subscription.cycle.advance(current) else {
                report.failed += 1;
                continue;
            };

            match self
                .subscriptions
                .advance_billing_date(tenant_id, subscription.id, Some(current), next, None)
                .await
            {
                Ok(true) => report.processed += 1,
                Ok(false) => {}
                Err(err) => {
                    report.failed += 1;
                    error!(%tenant_id, subscription_id = %subscription.id, db_error = ?err, "subscriptions: renewal failed");
                }
            }
        }

        info!(%tenant_id, processed = report.processed, failed = report.failed, "subscriptions: renewals processed");
        Ok(report)
    }

    /// Starts billing for every trial that has run out.
    pub async fn process_trial_endings(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> UseCaseResult<BatchReport> {
        let ending = self.subscriptions.list_trials_ending(tenant_id, today).await?;
        let mut report = BatchReport::default();

        for subscription in ending {
            let subscription_id = subscription.id;
            let identity = CustomerRequest {
                name: format!("Customer {}", subscription.customer_id),
                email: None,
                document: None,
                external_reference: Some(subscription.customer_id.to_string()),
            };

            match self.start_billing(tenant_id, subscription, identity).await {
                Ok(_) => report.processed += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(%tenant_id, %subscription_id, error = ?err, "subscriptions: trial conversion failed");
                }
            }
        }

        info!(%tenant_id, processed = report.processed, failed = report.failed, "subscriptions: trial endings processed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::payment_gateway::MockPaymentGateway;
    use crates::{
        domain::{
            repositories::{
                payments::MockPaymentRepository, subscriptions::MockSubscriptionRepository,
            },
            value_objects::enums::{billing_cycles::BillingCycle, billing_types::BillingType},
        },
        payments::gateway_client::{GatewayCharge, GatewayRecurring},
    };

    fn tenant() -> TenantId {
        TenantId::new(Uuid::from_u128(41))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(new: NewSubscription) -> SubscriptionModel {
        SubscriptionModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            customer_id: new.customer_id,
            description: new.description,
            billing_type: new.billing_type,
            amount_minor: new.amount_minor,
            cycle: new.cycle,
            status: new.status,
            gateway_subscription_id: None,
            gateway_customer_id: None,
            start_date: new.start_date,
            next_billing_date: None,
            trial_end_date: new.trial_end_date,
            last_payment_date: None,
            total_payments: 0,
            failed_payments: 0,
            cancelled_at: None,
            created_at: Utc::now(),
        }
    }

    fn active(next_billing_date: NaiveDate) -> SubscriptionModel {
        SubscriptionModel {
            status: SubscriptionStatus::Active,
            gateway_subscription_id: Some("sub_1".to_string()),
            gateway_customer_id: Some("cus_1".to_string()),
            next_billing_date: Some(next_billing_date),
            total_payments: 1,
            ..stored(NewSubscription {
                customer_id: Uuid::new_v4(),
                description: "Pro plan".to_string(),
                billing_type: BillingType::CreditCard,
                amount_minor: 4_990,
                cycle: BillingCycle::Monthly,
                status: SubscriptionStatus::Active,
                start_date: date(2026, 9, 1),
                trial_end_date: None,
            })
        }
    }

    fn request(is_trial: bool, start_date: NaiveDate) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            customer_id: Uuid::new_v4(),
            customer_name: "Ana Souza".to_string(),
            customer_email: Some("ana@example.com".to_string()),
            customer_document: None,
            description: "Pro plan".to_string(),
            billing_type: BillingType::CreditCard,
            amount_minor: 4_990,
            cycle: BillingCycle::Monthly,
            start_date: Some(start_date),
            is_trial,
            trial_days: None,
        }
    }

    fn usecase(
        subscriptions: MockSubscriptionRepository,
        payments: MockPaymentRepository,
        gateway: MockPaymentGateway,
    ) -> SubscriptionUseCase {
        SubscriptionUseCase::new(Arc::new(subscriptions), Arc::new(payments), Arc::new(gateway))
    }

    #[tokio::test]
    async fn trial_skips_gateway_and_payment() {
        let start = date(2026, 10, 17);

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_create()
            .withf(|_, new| new.status == SubscriptionStatus::Trial)
            .times(1)
            .returning(|_, new| Ok(stored(new)));
        let mut payments = MockPaymentRepository::new();
        payments.expect_create().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_customer().never();
        gateway.expect_create_subscription().never();

        let trial = usecase(subscriptions, payments, gateway)
            .create_subscription(tenant(), request(true, start))
            .await
            .unwrap();

        assert_eq!(trial.status, SubscriptionStatus::Trial);
        assert_eq!(trial.trial_end_date, Some(date(2026, 11, 1)));
        assert!(trial.gateway_subscription_id.is_none());
    }

    #[tokio::test]
    async fn paid_subscription_records_first_invoice() {
        let start = Utc::now().date_naive() + Days::new(2);
        let first_due = start;

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_create()
            .withf(|_, new| new.status == SubscriptionStatus::Pending)
            .returning(|_, new| Ok(stored(new)));
        subscriptions
            .expect_activate()
            .withf(move |_, _, expected, activation| {
                *expected == SubscriptionStatus::Pending
                    && activation.gateway_subscription_id == "sub_new"
                    && activation.total_payments == 1
                    && Some(activation.next_billing_date) == BillingCycle::Monthly.advance(first_due)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_create()
            .withf(|_, new| new.gateway_payment_id.as_deref() == Some("pay_first"))
            .times(1)
            .returning(|tenant_id, new| {
                Ok(crates::domain::value_objects::payments::PaymentModel {
                    id: Uuid::new_v4(),
                    tenant_id,
                    order_id: None,
                    subscription_id: new.subscription_id,
                    billing_type: new.billing_type,
                    amount_minor: new.amount_minor,
                    refunded_minor: 0,
                    status: new.status,
                    gateway_payment_id: new.gateway_payment_id,
                    external_reference: new.external_reference,
                    invoice_url: new.invoice_url,
                    due_date: new.due_date,
                    paid_at: None,
                    created_at: Utc::now(),
                })
            });

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .returning(|_| Ok("cus_new".to_string()));
        gateway
            .expect_create_subscription()
            .withf(move |recurring| recurring.next_due_date == first_due && recurring.customer == "cus_new")
            .returning(|_| {
                Ok(GatewayRecurring {
                    id: "sub_new".to_string(),
                    customer: Some("cus_new".to_string()),
                    status: Some("ACTIVE".to_string()),
                    next_due_date: None,
                })
            });
        gateway
            .expect_list_subscription_payments()
            .returning(move |_| {
                Ok(vec![GatewayCharge {
                    id: "pay_first".to_string(),
                    status: Some("PENDING".to_string()),
                    invoice_url: None,
                    due_date: Some(first_due),
                    subscription: Some("sub_new".to_string()),
                }])
            });

        let subscription = usecase(subscriptions, payments, gateway)
            .create_subscription(tenant(), request(false, start))
            .await
            .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.total_payments, 1);
        assert_eq!(
            subscription.next_billing_date,
            BillingCycle::Monthly.advance(first_due)
        );
    }

    #[tokio::test]
    async fn renewal_batch_counts_advanced_and_failed() {
        let today = date(2026, 10, 17);
        let first = active(date(2026, 10, 15));
        let second = active(date(2026, 10, 17));
        let skipped = active(date(2026, 10, 16));
        let failing_id = second.id;
        let skipped_id = skipped.id;

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_list_due_for_renewal()
            .returning(move |_, _| Ok(vec![first.clone(), second.clone(), skipped.clone()]));
        subscriptions
            .expect_advance_billing_date()
            .times(3)
            .returning(move |_, id, expected, next, paid_on| {
                assert!(paid_on.is_none());
                assert_eq!(expected.and_then(|d| BillingCycle::Monthly.advance(d)), Some(next));
                if id == failing_id {
                    Err(anyhow::anyhow!("deadlock detected"))
                } else {
                    Ok(id != skipped_id)
                }
            });

        let report = usecase(
            subscriptions,
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
        )
        .process_renewals(tenant(), today)
        .await
        .unwrap();

        assert_eq!(report, BatchReport { processed: 1, failed: 1 });
    }

    #[tokio::test]
    async fn cancelled_subscription_cannot_be_cancelled_again() {
        let mut cancelled = active(date(2026, 11, 1));
        cancelled.status = SubscriptionStatus::Cancelled;

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find()
            .returning(move |_, _| Ok(Some(cancelled.clone())));
        subscriptions.expect_compare_and_set_status().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_subscription().never();

        let err = usecase(subscriptions, MockPaymentRepository::new(), gateway)
            .cancel(tenant(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn cycle_change_never_moves_billing_backwards() {
        let mut subscription = active(date(2026, 12, 1));
        subscription.last_payment_date = Some(date(2026, 10, 1));

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find()
            .returning(move |_, _| Ok(Some(subscription.clone())));
        subscriptions
            .expect_update_plan()
            .withf(|_, _, change| {
                change.cycle == BillingCycle::Quarterly
                    && change.next_billing_date == Some(date(2027, 1, 1))
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_update_subscription()
            .withf(|id, update| {
                id == "sub_1"
                    && update.cycle == Some(BillingCycle::Quarterly)
                    && update.amount_minor.is_none()
            })
            .times(1)
            .returning(|id, _| {
                Ok(GatewayRecurring {
                    id,
                    customer: None,
                    status: None,
                    next_due_date: None,
                })
            });

        let changed = usecase(subscriptions, MockPaymentRepository::new(), gateway)
            .change_plan(
                tenant(),
                Uuid::new_v4(),
                ChangePlanRequest {
                    amount_minor: None,
                    cycle: Some(BillingCycle::Quarterly),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(changed.next_billing_date, Some(date(2027, 1, 1)));
    }

    #[tokio::test]
    async fn gateway_failure_at_creation_cancels_the_pending_row() {
        let start = Utc::now().date_naive();

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_create()
            .withf(|_, new| new.status == SubscriptionStatus::Pending)
            .times(1)
            .returning(|_, new| Ok(stored(new)));
        subscriptions
            .expect_compare_and_set_status()
            .withf(|_, _, expected, next, cancelled_at| {
                *expected == SubscriptionStatus::Pending
                    && *next == SubscriptionStatus::Cancelled
                    && cancelled_at.is_some()
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));
        subscriptions.expect_activate().never();

        let mut payments = MockPaymentRepository::new();
        payments.expect_create().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .returning(|_| Ok("cus_new".to_string()));
        gateway
            .expect_create_subscription()
            .returning(|_| Err(anyhow::anyhow!("gateway unavailable")));

        let err = usecase(subscriptions, payments, gateway)
            .create_subscription(tenant(), request(false, start))
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::Gateway(_)));
    }
}
