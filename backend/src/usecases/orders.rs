use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::{orders::OrderRepository, payments::PaymentRepository},
    value_objects::{
        enums::{
            fulfillment_statuses::FulfillmentStatus, order_item_statuses::OrderItemStatus,
            order_statuses::OrderStatus, payment_statuses::PaymentStatus,
            transaction_kinds::TransactionKind,
        },
        order_state::OrderState,
        orders::OrderModel,
        payments::{NewPaymentTransaction, PaymentStatusChange},
        tenant::TenantId,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{UseCaseError, UseCaseResult},
    payment_gateway::PaymentGateway,
};

const REFUND_RECORD_ATTEMPTS: usize = 3;

pub struct OrderUseCase {
    orders: Arc<dyn OrderRepository + Send + Sync>,
    payments: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
}

impl OrderUseCase {
    pub fn new(
        orders: Arc<dyn OrderRepository + Send + Sync>,
        payments: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            orders,
            payments,
            gateway,
        }
    }

    pub async fn get_order(&self, tenant_id: TenantId, order_id: Uuid) -> UseCaseResult<OrderModel> {
        self.orders
            .find(tenant_id, order_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("order"))
    }

    async fn commit(
        &self,
        tenant_id: TenantId,
        order: OrderModel,
        next: OrderState,
    ) -> UseCaseResult<OrderModel> {
        if next == order.state {
            return Ok(order);
        }

        let applied = self
            .orders
            .apply_transition(tenant_id, order.id, order.state.clone(), next.clone())
            .await?;
        if !applied {
            warn!(%tenant_id, order_id = %order.id, "orders: transition lost a concurrent update");
            return Err(UseCaseError::concurrent_modification("order"));
        }

        info!(
            %tenant_id,
            order_id = %order.id,
            from = %order.state.status,
            to = %next.status,
            payment_status = %next.payment_status,
            "orders: transition applied"
        );
        Ok(OrderModel {
            state: next,
            updated_at: Utc::now(),
            ..order
        })
    }

    pub async fn update_status(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        status: OrderStatus,
    ) -> UseCaseResult<OrderModel> {
        let order = self.get_order(tenant_id, order_id).await?;
        let next = order.state.transition_status(status, Utc::now())?;
        self.commit(tenant_id, order, next).await
    }

    pub async fn update_fulfillment(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        fulfillment_status: FulfillmentStatus,
    ) -> UseCaseResult<OrderModel> {
        let order = self.get_order(tenant_id, order_id).await?;
        let next = order.state.transition_fulfillment(fulfillment_status)?;
        self.commit(tenant_id, order, next).await
    }

    /// Item statuses do not roll up into the order's fulfillment status.
    pub async fn update_item_status(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        item_id: Uuid,
        status: OrderItemStatus,
    ) -> UseCaseResult<OrderModel> {
        let mut order = self.get_order(tenant_id, order_id).await?;
        let item = order
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| UseCaseError::not_found("order item"))?;

        if item.status == status {
            return Ok(order);
        }

        let timestamps = item.timestamps.stamp(status, Utc::now());
        let applied = self
            .orders
            .update_item_status(tenant_id, order_id, item_id, item.status, status, timestamps)
            .await?;
        if !applied {
            return Err(UseCaseError::concurrent_modification("order item"));
        }

        info!(%tenant_id, %order_id, %item_id, from = %item.status, to = %status, "orders: item status updated");
        item.status = status;
        item.timestamps = timestamps;
        Ok(order)
    }

    /// Cancels the order and withdraws its open gateway charge, if any.
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        reason: Option<String>,
    ) -> UseCaseResult<OrderModel> {
        let order = self.get_order(tenant_id, order_id).await?;
        let next = order.state.cancel(reason, Utc::now())?;
        let order = self.commit(tenant_id, order, next).await?;

        self.withdraw_open_charge(tenant_id, order_id).await;
        Ok(order)
    }

    async fn withdraw_open_charge(&self, tenant_id: TenantId, order_id: Uuid) {
        let payment = match self.payments.find_latest_for_order(tenant_id, order_id).await {
            Ok(Some(payment)) if payment.is_reusable() => payment,
            Ok(_) => return,
            Err(err) => {
                error!(%tenant_id, %order_id, db_error = ?err, "orders: could not load payment to withdraw");
                return;
            }
        };
        let Some(gateway_payment_id) = payment.gateway_payment_id.clone() else {
            return;
        };

        if let Err(err) = self.gateway.cancel_payment(gateway_payment_id.clone()).await {
            warn!(
                %tenant_id,
                %order_id,
                %gateway_payment_id,
                error = ?err,
                "orders: gateway charge not withdrawn"
            );
            return;
        }

        match self
            .payments
            .compare_and_set_status(
                tenant_id,
                payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Cancelled,
                PaymentStatusChange::default(),
            )
            .await
        {
            Ok(_) => info!(%tenant_id, %order_id, payment_id = %payment.id, "orders: open charge withdrawn"),
            Err(err) => {
                error!(%tenant_id, payment_id = %payment.id, db_error = ?err, "orders: could not mark payment cancelled")
            }
        }
    }

    /// Refunds part or all of the settled payment. The gateway refund is
    /// requested before anything is written locally.
    pub async fn refund(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
        amount_minor: i64,
        reason: Option<String>,
    ) -> UseCaseResult<OrderModel> {
        let order = self.get_order(tenant_id, order_id).await?;
        let next = order.state.refund(amount_minor, Utc::now())?;

        let payment = self
            .payments
            .find_settled_for_order(tenant_id, order_id)
            .await?
            .ok_or_else(|| UseCaseError::invalid("order has no settled payment to refund"))?;
        let gateway_payment_id = payment
            .gateway_payment_id
            .clone()
            .ok_or_else(|| UseCaseError::invalid("settled payment is not registered at the gateway"))?;

        let payment_refunded = payment.refunded_minor + amount_minor;
        if payment_refunded > payment.amount_minor {
            return Err(UseCaseError::invalid(format!(
                "refund of {amount_minor} exceeds the {} still refundable on the payment",
                payment.amount_minor - payment.refunded_minor
            )));
        }

        self.gateway
            .refund_payment(gateway_payment_id.clone(), Some(amount_minor), reason)
            .await
            .map_err(|err| {
                error!(
                    %tenant_id,
                    %order_id,
                    %gateway_payment_id,
                    error = ?err,
                    "orders: gateway refund failed"
                );
                UseCaseError::Gateway(err.to_string())
            })?;

        let (order, reflected) = self
            .record_refund(tenant_id, order, next, amount_minor)
            .await?;
        if reflected {
            info!(%tenant_id, %order_id, amount_minor, "orders: refund already reflected by the gateway webhook");
            return Ok(order);
        }

        let payment_status = if payment_refunded >= payment.amount_minor {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        let updated = self
            .payments
            .compare_and_set_status(
                tenant_id,
                payment.id,
                payment.status,
                payment_status,
                PaymentStatusChange {
                    paid_at: None,
                    refunded_minor: Some(payment_refunded),
                },
            )
            .await?;
        if updated {
            self.payments
                .append_transaction(
                    tenant_id,
                    NewPaymentTransaction {
                        payment_id: payment.id,
                        kind: TransactionKind::Refund,
                        amount_minor,
                        gateway_reference: Some(gateway_payment_id),
                    },
                )
                .await?;
        } else {
            // the REFUNDED webhook already moved the payment and wrote the ledger
            warn!(%tenant_id, payment_id = %payment.id, "orders: payment status already moved");
        }

        info!(
            %tenant_id,
            %order_id,
            amount_minor,
            refunded_minor = order.state.refunded_minor,
            "orders: refund recorded"
        );
        Ok(order)
    }

    /// Writes a refund whose money has already moved at the gateway. A lost
    /// race is re-read rather than reported: `true` means the concurrent
    /// writer already recorded this refund.
    async fn record_refund(
        &self,
        tenant_id: TenantId,
        order: OrderModel,
        next: OrderState,
        amount_minor: i64,
    ) -> UseCaseResult<(OrderModel, bool)> {
        let refunded_target = order.state.refunded_minor + amount_minor;
        let mut current = order;
        let mut next = next;

        for _ in 0..REFUND_RECORD_ATTEMPTS {
            let applied = self
                .orders
                .apply_transition(tenant_id, current.id, current.state.clone(), next.clone())
                .await?;
            if applied {
                info!(%tenant_id, order_id = %current.id, to = %next.status, "orders: refund transition applied");
                return Ok((
                    OrderModel {
                        state: next,
                        updated_at: Utc::now(),
                        ..current
                    },
                    false,
                ));
            }

            let fresh = self.get_order(tenant_id, current.id).await?;
            if fresh.state.refunded_minor >= refunded_target {
                return Ok((fresh, true));
            }
            match fresh.state.refund(amount_minor, Utc::now()) {
                Ok(retry) => {
                    next = retry;
                    current = fresh;
                }
                Err(err) => {
                    error!(%tenant_id, order_id = %fresh.id, amount_minor, error = %err, "orders: gateway refund could not be recorded on the order");
                    return Err(err.into());
                }
            }
        }

        error!(%tenant_id, order_id = %current.id, amount_minor, "orders: gateway refund could not be recorded on the order");
        Err(UseCaseError::concurrent_modification("order"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::payment_gateway::MockPaymentGateway;
    use chrono::NaiveDate;
    use crates::{
        domain::{
            repositories::{orders::MockOrderRepository, payments::MockPaymentRepository},
            value_objects::{
                enums::{billing_types::BillingType, order_payment_statuses::OrderPaymentStatus},
                order_state::OrderTimestamps,
                payments::PaymentModel,
            },
        },
        payments::gateway_client::GatewayCharge,
    };

    fn tenant() -> TenantId {
        TenantId::new(Uuid::from_u128(21))
    }

    fn order(status: OrderStatus, payment_status: OrderPaymentStatus) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            order_number: "ORD2610170002".to_string(),
            cart_id: Uuid::new_v4(),
            customer_id: None,
            currency: "BRL".to_string(),
            subtotal_minor: 10_000,
            tax_minor: 0,
            discount_minor: 0,
            shipping_minor: 0,
            coupon_code: None,
            shipping_option_id: None,
            shipping_address: None,
            billing_address: None,
            payment_method_code: "pix".to_string(),
            has_physical_items: false,
            has_digital_items: true,
            has_services: false,
            state: OrderState {
                status,
                payment_status,
                fulfillment_status: FulfillmentStatus::Unfulfilled,
                total_minor: 10_000,
                refunded_minor: 0,
                cancel_reason: None,
                timestamps: OrderTimestamps::default(),
            },
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn settled_payment(order_id: Uuid) -> PaymentModel {
        PaymentModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            order_id: Some(order_id),
            subscription_id: None,
            billing_type: BillingType::Pix,
            amount_minor: 10_000,
            refunded_minor: 0,
            status: PaymentStatus::Received,
            gateway_payment_id: Some("pay_9".to_string()),
            external_reference: order_id.to_string(),
            invoice_url: None,
            due_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            paid_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn refunded_charge() -> GatewayCharge {
        GatewayCharge {
            id: "pay_9".to_string(),
            status: Some("REFUNDED".to_string()),
            invoice_url: None,
            due_date: None,
            subscription: None,
        }
    }

    fn paid_order_repo(paid: OrderModel) -> MockOrderRepository {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_find()
            .returning(move |_, _| Ok(Some(paid.clone())));
        orders
    }

    #[tokio::test]
    async fn full_refund_marks_order_and_payment_refunded() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;

        let mut orders = paid_order_repo(paid);
        orders
            .expect_apply_transition()
            .withf(|_, _, _, next| {
                next.status == OrderStatus::Refunded && next.refunded_minor == 10_000
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| Ok(Some(settled_payment(order_id))));
        payments
            .expect_compare_and_set_status()
            .withf(|_, _, expected, next, change| {
                *expected == PaymentStatus::Received
                    && *next == PaymentStatus::Refunded
                    && change.refunded_minor == Some(10_000)
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));
        payments
            .expect_append_transaction()
            .withf(|_, entry| entry.kind == TransactionKind::Refund && entry.amount_minor == 10_000)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .withf(|id, amount, _| id == "pay_9" && *amount == Some(10_000))
            .times(1)
            .returning(|_, _, _| Ok(refunded_charge()));

        let refunded = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 10_000, Some("damaged".to_string()))
            .await
            .unwrap();

        assert_eq!(refunded.status(), OrderStatus::Refunded);
        assert_eq!(refunded.state.payment_status, OrderPaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn partial_refund_leaves_remaining_balance() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;

        let mut orders = paid_order_repo(paid);
        orders
            .expect_apply_transition()
            .returning(|_, _, _, _| Ok(true));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| Ok(Some(settled_payment(order_id))));
        payments
            .expect_compare_and_set_status()
            .withf(|_, _, _, next, change| {
                *next == PaymentStatus::PartiallyRefunded && change.refunded_minor == Some(3_000)
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));
        payments
            .expect_append_transaction()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .returning(|_, _, _| Ok(refunded_charge()));

        let refunded = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 3_000, None)
            .await
            .unwrap();

        assert_eq!(refunded.status(), OrderStatus::PartiallyRefunded);
        assert_eq!(refunded.state.refunded_minor, 3_000);
        assert_eq!(refunded.state.refundable_minor(), 7_000);
    }

    #[tokio::test]
    async fn unpaid_order_cannot_be_refunded() {
        let unpaid = order(OrderStatus::PendingPayment, OrderPaymentStatus::Pending);
        let order_id = unpaid.id;

        let mut orders = paid_order_repo(unpaid);
        orders.expect_apply_transition().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_settled_for_order().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().never();

        let err = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 1_000, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn gateway_refund_failure_writes_nothing() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;

        let mut orders = paid_order_repo(paid);
        orders.expect_apply_transition().never();
        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| Ok(Some(settled_payment(order_id))));
        payments.expect_compare_and_set_status().never();
        payments.expect_append_transaction().never();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .returning(|_, _, _| Err(anyhow::anyhow!("insufficient balance")));

        let err = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 5_000, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::Gateway(_)));
    }

    #[tokio::test]
    async fn delivered_order_cannot_be_cancelled() {
        let delivered = order(OrderStatus::Delivered, OrderPaymentStatus::Paid);
        let order_id = delivered.id;

        let mut orders = paid_order_repo(delivered);
        orders.expect_apply_transition().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_latest_for_order().never();

        let err = OrderUseCase::new(
            Arc::new(orders),
            Arc::new(payments),
            Arc::new(MockPaymentGateway::new()),
        )
        .cancel(tenant(), order_id, Some("late".to_string()))
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn lost_race_surfaces_as_concurrent_modification() {
        let pending = order(OrderStatus::Pending, OrderPaymentStatus::Pending);
        let order_id = pending.id;

        let mut orders = paid_order_repo(pending);
        orders
            .expect_apply_transition()
            .returning(|_, _, _, _| Ok(false));

        let err = OrderUseCase::new(
            Arc::new(orders),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(MockPaymentGateway::new()),
        )
        .update_status(tenant(), order_id, OrderStatus::Processing)
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message == "order was modified concurrently"));
    }

    #[tokio::test]
    async fn cancel_withdraws_open_gateway_charge() {
        let pending = order(OrderStatus::PendingPayment, OrderPaymentStatus::Pending);
        let order_id = pending.id;

        let mut orders = paid_order_repo(pending);
        orders
            .expect_apply_transition()
            .withf(|_, _, _, next| next.status == OrderStatus::Cancelled)
            .returning(|_, _, _, _| Ok(true));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_latest_for_order()
            .returning(|_, order_id| {
                Ok(Some(PaymentModel {
                    status: PaymentStatus::Pending,
                    paid_at: None,
                    ..settled_payment(order_id)
                }))
            });
        payments
            .expect_compare_and_set_status()
            .withf(|_, _, expected, next, _| {
                *expected == PaymentStatus::Pending && *next == PaymentStatus::Cancelled
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel_payment()
            .withf(|id| id == "pay_9")
            .times(1)
            .returning(|_| Ok(()));

        let cancelled = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .cancel(tenant(), order_id, Some("customer request".to_string()))
            .await
            .unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(
            cancelled.state.cancel_reason.as_deref(),
            Some("customer request")
        );
    }

    #[tokio::test]
    async fn refund_beyond_order_total_is_rejected_before_the_gateway() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;

        let mut orders = paid_order_repo(paid);
        orders.expect_apply_transition().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_settled_for_order().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().never();

        let err = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 12_000, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn refund_beyond_payment_balance_is_rejected_before_the_gateway() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;

        let mut orders = paid_order_repo(paid);
        orders.expect_apply_transition().never();
        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| {
                Ok(Some(PaymentModel {
                    refunded_minor: 8_000,
                    ..settled_payment(order_id)
                }))
            });
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment().never();

        let err = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 5_000, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message.contains("2000 still refundable")));
    }

    #[tokio::test]
    async fn refund_already_recorded_by_webhook_is_not_reported_as_conflict() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;
        let refunded_by_webhook = OrderModel {
            state: paid.state.refund(4_000, Utc::now()).unwrap(),
            ..paid.clone()
        };

        let mut reads = 0;
        let mut orders = MockOrderRepository::new();
        orders.expect_find().returning(move |_, _| {
            reads += 1;
            if reads == 1 {
                Ok(Some(paid.clone()))
            } else {
                Ok(Some(refunded_by_webhook.clone()))
            }
        });
        orders
            .expect_apply_transition()
            .times(1)
            .returning(|_, _, _, _| Ok(false));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| Ok(Some(settled_payment(order_id))));
        payments.expect_compare_and_set_status().never();
        payments.expect_append_transaction().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .times(1)
            .returning(|_, _, _| Ok(refunded_charge()));

        let refunded = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 4_000, None)
            .await
            .unwrap();

        assert_eq!(refunded.status(), OrderStatus::PartiallyRefunded);
        assert_eq!(refunded.state.refunded_minor, 4_000);
    }

    #[tokio::test]
    async fn refund_is_reapplied_when_an_unrelated_write_wins_the_race() {
        let paid = order(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let order_id = paid.id;
        let fulfilled = OrderModel {
            state: OrderState {
                fulfillment_status: FulfillmentStatus::Fulfilled,
                ..paid.state.clone()
            },
            ..paid.clone()
        };

        let mut reads = 0;
        let mut orders = MockOrderRepository::new();
        orders.expect_find().returning(move |_, _| {
            reads += 1;
            if reads == 1 {
                Ok(Some(paid.clone()))
            } else {
                Ok(Some(fulfilled.clone()))
            }
        });
        let mut attempts = 0;
        orders
            .expect_apply_transition()
            .times(2)
            .returning(move |_, _, expected, _| {
                attempts += 1;
                Ok(attempts == 2 && expected.fulfillment_status == FulfillmentStatus::Fulfilled)
            });

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_settled_for_order()
            .returning(|_, order_id| Ok(Some(settled_payment(order_id))));
        payments
            .expect_compare_and_set_status()
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));
        payments
            .expect_append_transaction()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment()
            .times(1)
            .returning(|_, _, _| Ok(refunded_charge()));

        let refunded = OrderUseCase::new(Arc::new(orders), Arc::new(payments), Arc::new(gateway))
            .refund(tenant(), order_id, 2_500, None)
            .await
            .unwrap();

        assert_eq!(refunded.state.refunded_minor, 2_500);
        assert_eq!(refunded.state.fulfillment_status, FulfillmentStatus::Fulfilled);
    }
}
