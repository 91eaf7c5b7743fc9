use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    repositories::{
        gateway_webhook_events::WebhookEventRepository, orders::OrderRepository,
        payments::PaymentRepository, subscriptions::SubscriptionRepository,
    },
    value_objects::{
        enums::{
            payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus,
            transaction_kinds::TransactionKind,
        },
        gateway_webhook::{
            GatewayEventKind, GatewayPaymentPayload, GatewaySubscriptionPayload,
            GatewayWebhookEvent, PaymentSignal, ReconciliationOutcome, SubscriptionSignal,
        },
        payments::{NewPayment, NewPaymentTransaction, PaymentModel, PaymentStatusChange},
        tenant::TenantId,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::payment_gateway::PaymentGateway;

#[derive(Debug, Error)]
pub enum WebhookRejection {
    #[error("invalid webhook access token")]
    Unauthorized,
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
}

impl WebhookRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookRejection::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookRejection::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

enum PaymentMatch {
    Existing(PaymentModel),
    /// A subscription cycle charge first seen through its creation event.
    Opened(PaymentModel),
    Missing,
}

pub struct GatewayReconciliationUseCase {
    webhook_events: Arc<dyn WebhookEventRepository + Send + Sync>,
    payments: Arc<dyn PaymentRepository + Send + Sync>,
    orders: Arc<dyn OrderRepository + Send + Sync>,
    subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
}

impl GatewayReconciliationUseCase {
    pub fn new(
        webhook_events: Arc<dyn WebhookEventRepository + Send + Sync>,
        payments: Arc<dyn PaymentRepository + Send + Sync>,
        orders: Arc<dyn OrderRepository + Send + Sync>,
        subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            webhook_events,
            payments,
            orders,
            subscriptions,
            gateway,
        }
    }

    /// Authenticates, deduplicates and applies one webhook delivery.
    ///
    /// Only an invalid token or an unparseable body is rejected; every other
    /// outcome, failures included, is acknowledged to the gateway.
    pub async fn handle_delivery(
        &self,
        tenant_id: TenantId,
        access_token: Option<&str>,
        raw_body: &[u8],
    ) -> Result<ReconciliationOutcome, WebhookRejection> {
        let authentic = access_token
            .map(|token| self.gateway.verify_webhook_token(token))
            .unwrap_or(false);
        if !authentic {
            warn!(%tenant_id, "webhooks: rejected delivery with invalid access token");
            return Err(WebhookRejection::Unauthorized);
        }

        let event: GatewayWebhookEvent = serde_json::from_slice(raw_body).map_err(|err| {
            warn!(%tenant_id, error = %err, "webhooks: malformed payload");
            WebhookRejection::Malformed(err.to_string())
        })?;

        let idempotency_key = event.idempotency_key(raw_body);
        match self
            .webhook_events
            .record_if_absent(tenant_id, idempotency_key.clone(), event.event.clone())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(%tenant_id, event = %event.event, %idempotency_key, "webhooks: duplicate delivery");
                return Ok(ReconciliationOutcome::Duplicate);
            }
            Err(err) => {
                error!(%tenant_id, event = %event.event, db_error = ?err, "webhooks: could not record delivery");
                return Ok(ReconciliationOutcome::Failed);
            }
        }

        match self.dispatch(tenant_id, &event).await {
            Ok(ReconciliationOutcome::Unmatched) => {
                // the local record may be bound later; a redelivery must still apply
                self.release_key(tenant_id, idempotency_key).await;
                Ok(ReconciliationOutcome::Unmatched)
            }
            Ok(outcome) => {
                info!(%tenant_id, event = %event.event, ?outcome, "webhooks: delivery processed");
                Ok(outcome)
            }
            Err(err) => {
                error!(%tenant_id, event = %event.event, error = ?err, "webhooks: processing failed");
                self.release_key(tenant_id, idempotency_key).await;
                Ok(ReconciliationOutcome::Failed)
            }
        }
    }

    async fn release_key(&self, tenant_id: TenantId, idempotency_key: String) {
        if let Err(err) = self
            .webhook_events
            .release(tenant_id, idempotency_key)
            .await
        {
            error!(%tenant_id, db_error = ?err, "webhooks: could not release idempotency key");
        }
    }

    async fn dispatch(
        &self,
        tenant_id: TenantId,
        event: &GatewayWebhookEvent,
    ) -> Result<ReconciliationOutcome> {
        match event.kind() {
            GatewayEventKind::Payment(signal) => match &event.payment {
                Some(payload) => self.reconcile_payment(tenant_id, signal, payload).await,
                None => {
                    warn!(%tenant_id, event = %event.event, "webhooks: payment event without payment");
                    Ok(ReconciliationOutcome::Ignored)
                }
            },
            GatewayEventKind::Subscription(signal) => match &event.subscription {
                Some(payload) => self.reconcile_subscription(tenant_id, signal, payload).await,
                None => {
                    warn!(%tenant_id, event = %event.event, "webhooks: subscription event without subscription");
                    Ok(ReconciliationOutcome::Ignored)
                }
            },
            GatewayEventKind::Transfer | GatewayEventKind::Anticipation => {
                info!(%tenant_id, event = %event.event, "webhooks: financial notice acknowledged");
                Ok(ReconciliationOutcome::Ignored)
            }
            GatewayEventKind::Unknown => Ok(ReconciliationOutcome::Ignored),
        }
    }

    async fn match_payment(
        &self,
        tenant_id: TenantId,
        signal: PaymentSignal,
        payload: &GatewayPaymentPayload,
    ) -> Result<PaymentMatch> {
        if let Some(payment) = self
            .payments
            .find_by_gateway_id(tenant_id, payload.id.clone())
            .await?
        {
            return Ok(PaymentMatch::Existing(payment));
        }

        if let Some(reference) = payload
            .external_reference
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        {
            if let Some(payment) = self
                .payments
                .find_unbound_by_external_reference(tenant_id, reference.to_string())
                .await?
            {
                let bound = self
                    .payments
                    .bind_gateway_payment(
                        tenant_id,
                        payment.id,
                        payload.id.clone(),
                        payload.invoice_url.clone(),
                    )
                    .await?;
                if bound {
                    info!(%tenant_id, payment_id = %payment.id, gateway_payment_id = %payload.id, "webhooks: payment bound by reference");
                    return Ok(PaymentMatch::Existing(PaymentModel {
                        gateway_payment_id: Some(payload.id.clone()),
                        invoice_url: payload.invoice_url.clone().or(payment.invoice_url.clone()),
                        ..payment
                    }));
                }

                return Ok(self
                    .payments
                    .find_by_gateway_id(tenant_id, payload.id.clone())
                    .await?
                    .map_or(PaymentMatch::Missing, PaymentMatch::Existing));
            }
        }

        if signal != PaymentSignal::Created {
            return Ok(PaymentMatch::Missing);
        }
        let Some(gateway_subscription_id) = payload.subscription.clone() else {
            return Ok(PaymentMatch::Missing);
        };
        let Some(subscription) = self
            .subscriptions
            .find_by_gateway_id(tenant_id, gateway_subscription_id)
            .await?
        else {
            return Ok(PaymentMatch::Missing);
        };

        let today = Utc::now().date_naive();
        let payment = self
            .payments
            .create(
                tenant_id,
                NewPayment {
                    order_id: None,
                    subscription_id: Some(subscription.id),
                    billing_type: subscription.billing_type,
                    amount_minor: payload.value_minor().unwrap_or(subscription.amount_minor),
                    status: PaymentStatus::Pending,
                    gateway_payment_id: Some(payload.id.clone()),
                    external_reference: subscription.id.to_string(),
                    invoice_url: payload.invoice_url.clone(),
                    due_date: payload
                        .due_date
                        .or(subscription.next_billing_date)
                        .unwrap_or(today),
                },
            )
            .await?;
        Ok(PaymentMatch::Opened(payment))
    }

    async fn reconcile_payment(
        &self,
        tenant_id: TenantId,
        signal: PaymentSignal,
        payload: &GatewayPaymentPayload,
    ) -> Result<ReconciliationOutcome> {
        let payment = match self.match_payment(tenant_id, signal, payload).await? {
            PaymentMatch::Existing(payment) => payment,
            PaymentMatch::Opened(payment) => {
                info!(
                    %tenant_id,
                    payment_id = %payment.id,
                    subscription_id = ?payment.subscription_id,
                    "webhooks: subscription cycle payment opened"
                );
                return Ok(ReconciliationOutcome::Applied);
            }
            PaymentMatch::Missing => {
                warn!(
                    %tenant_id,
                    gateway_payment_id = %payload.id,
                    external_reference = ?payload.external_reference,
                    "webhooks: no local payment matches delivery"
                );
                return Ok(ReconciliationOutcome::Unmatched);
            }
        };

        let PaymentSignal::Status(next) = signal else {
            return Ok(ReconciliationOutcome::Unchanged);
        };
        // successive partial refunds keep the status and grow the refunded total
        let further_refund = payment.status == PaymentStatus::PartiallyRefunded
            && next == PaymentStatus::PartiallyRefunded;
        if !further_refund && !payment.status.can_transition_to(next) {
            return Ok(ReconciliationOutcome::Unchanged);
        }

        let now = Utc::now();
        let refunded_total = match next {
            PaymentStatus::Refunded => Some(payment.amount_minor),
            PaymentStatus::PartiallyRefunded => payload
                .value_minor()
                .filter(|remaining| *remaining < payment.amount_minor)
                .map(|remaining| payment.amount_minor - remaining)
                .filter(|total| *total > payment.refunded_minor),
            _ => None,
        };
        if further_refund && refunded_total.is_none() {
            return Ok(ReconciliationOutcome::Unchanged);
        }
        let change = PaymentStatusChange {
            paid_at: next.is_settled().then_some(payment.paid_at.unwrap_or(now)),
            refunded_minor: refunded_total,
        };

        let applied = self
            .payments
            .compare_and_set_status(tenant_id, payment.id, payment.status, next, change)
            .await?;
        if !applied {
            return Ok(ReconciliationOutcome::Unchanged);
        }
        info!(
            %tenant_id,
            payment_id = %payment.id,
            from = %payment.status,
            to = %next,
            "webhooks: payment status applied"
        );

        let refunded_delta = refunded_total.map(|total| total - payment.refunded_minor);
        self.record_ledger(tenant_id, &payment, next, payload, refunded_delta)
            .await?;
        if let Some(order_id) = payment.order_id {
            self.follow_order(tenant_id, order_id, next, refunded_delta)
                .await?;
        }
        if let Some(subscription_id) = payment.subscription_id {
            self.follow_subscription(tenant_id, subscription_id, next)
                .await?;
        }

        Ok(ReconciliationOutcome::Applied)
    }

    async fn record_ledger(
        &self,
        tenant_id: TenantId,
        payment: &PaymentModel,
        next: PaymentStatus,
        payload: &GatewayPaymentPayload,
        refunded_delta: Option<i64>,
    ) -> Result<()> {
        let mut entries = Vec::new();
        if next.is_settled() && !payment.status.is_settled() {
            entries.push((
                TransactionKind::Payment,
                payload.value_minor().unwrap_or(payment.amount_minor),
            ));
            if let Some(fee) = payload.fee_minor() {
                entries.push((TransactionKind::Fee, fee));
            }
        }
        if let Some(refunded) = refunded_delta.filter(|amount| *amount > 0) {
            entries.push((TransactionKind::Refund, refunded));
        }

        for (kind, amount_minor) in entries {
            self.payments
                .append_transaction(
                    tenant_id,
                    NewPaymentTransaction {
                        payment_id: payment.id,
                        kind,
                        amount_minor,
                        gateway_reference: Some(payload.id.clone()),
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn follow_order(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        next: PaymentStatus,
        refunded_delta: Option<i64>,
    ) -> Result<()> {
        let Some(order) = self.orders.find(tenant_id, order_id).await? else {
            warn!(%tenant_id, %order_id, "webhooks: payment references a missing order");
            return Ok(());
        };

        let now = Utc::now();
        let state = &order.state;
        let target = match next {
            PaymentStatus::Confirmed | PaymentStatus::Received => state.settle(now),
            PaymentStatus::Failed => state.fail_payment(),
            PaymentStatus::Overdue => state.await_payment(),
            PaymentStatus::Refunded => state.refund(state.refundable_minor(), now).ok(),
            PaymentStatus::PartiallyRefunded => refunded_delta
                .filter(|amount| *amount > 0)
                .and_then(|amount| state.refund(amount.min(state.refundable_minor()), now).ok()),
            PaymentStatus::Pending | PaymentStatus::Cancelled => None,
        };
        let Some(target) = target else {
            return Ok(());
        };

        let applied = self
            .orders
            .apply_transition(tenant_id, order_id, state.clone(), target.clone())
            .await?;
        if applied {
            info!(%tenant_id, %order_id, to = %target.status, payment_status = %target.payment_status, "webhooks: order followed payment");
        } else {
            warn!(%tenant_id, %order_id, "webhooks: order changed concurrently, follow-up skipped");
        }
        Ok(())
    }

    async fn follow_subscription(
        &self,
        tenant_id: TenantId,
        subscription_id: Uuid,
        next: PaymentStatus,
    ) -> Result<()> {
        match next {
            PaymentStatus::Confirmed | PaymentStatus::Received => {
                self.subscriptions
                    .record_payment_success(tenant_id, subscription_id, Utc::now().date_naive())
                    .await
            }
            PaymentStatus::Overdue | PaymentStatus::Failed => {
                self.subscriptions
                    .record_payment_failure(tenant_id, subscription_id)
                    .await
            }
            _ => Ok(()),
        }
    }

    async fn reconcile_subscription(
        &self,
        tenant_id: TenantId,
        signal: SubscriptionSignal,
        payload: &GatewaySubscriptionPayload,
    ) -> Result<ReconciliationOutcome> {
        let Some(subscription) = self
            .subscriptions
            .find_by_gateway_id(tenant_id, payload.id.clone())
            .await?
        else {
            warn!(%tenant_id, gateway_subscription_id = %payload.id, "webhooks: no local subscription matches delivery");
            return Ok(ReconciliationOutcome::Unmatched);
        };

        match signal {
            SubscriptionSignal::Renewed => {
                let today = Utc::now().date_naive();
                let current = subscription.next_billing_date;
                let next = payload
                    .next_due_date
                    .or_else(|| current.and_then(|date| subscription.cycle.advance(date)))
                    .or_else(|| subscription.cycle.advance(today));
                let Some(next) = next else {
                    return Ok(ReconciliationOutcome::Unchanged);
                };
                if current.is_some_and(|current| next <= current) {
                    return Ok(ReconciliationOutcome::Unchanged);
                }

                let advanced = self
                    .subscriptions
                    .advance_billing_date(tenant_id, subscription.id, current, next, Some(today))
                    .await?;
                if !advanced {
                    return Ok(ReconciliationOutcome::Unchanged);
                }
                info!(%tenant_id, subscription_id = %subscription.id, %next, "webhooks: subscription renewed");
                Ok(ReconciliationOutcome::Applied)
            }
            SubscriptionSignal::Cancelled => {
                if subscription.status.is_closed() {
                    return Ok(ReconciliationOutcome::Unchanged);
                }
                let cancelled = self
                    .subscriptions
                    .compare_and_set_status(
                        tenant_id,
                        subscription.id,
                        subscription.status,
                        SubscriptionStatus::Cancelled,
                        Some(Utc::now()),
                    )
                    .await?;
                if !cancelled {
                    return Ok(ReconciliationOutcome::Unchanged);
                }
                info!(%tenant_id, subscription_id = %subscription.id, "webhooks: subscription cancelled at gateway");
                Ok(ReconciliationOutcome::Applied)
            }
            SubscriptionSignal::Created | SubscriptionSignal::Updated => {
                Ok(ReconciliationOutcome::Unchanged)
            }
            SubscriptionSignal::Other => Ok(ReconciliationOutcome::Ignored),
        }
    }
}
