use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::value_objects::enums::{
    fulfillment_statuses::FulfillmentStatus, order_item_statuses::OrderItemStatus,
    order_payment_statuses::OrderPaymentStatus, order_statuses::OrderStatus,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderTransitionError {
    #[error("order is {0} and its status can no longer change")]
    Terminal(OrderStatus),
    #[error("order cannot be cancelled while {0}")]
    NotCancellable(OrderStatus),
    #[error("order cannot be refunded while payment is {0}")]
    NotRefundable(OrderPaymentStatus),
    #[error("refund amount must be positive")]
    NonPositiveRefund,
    #[error("refund of {requested} exceeds the {available} still refundable")]
    RefundExceedsTotal { requested: i64, available: i64 },
    #[error("fulfillment cannot move from {from} to {to}")]
    InvalidFulfillment {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct OrderTimestamps {
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

/// The mutable part of an order. Every transition returns a new state; the
/// repository writes it with a compare-and-set on the state it came from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub total_minor: i64,
    pub refunded_minor: i64,
    pub cancel_reason: Option<String>,
    pub timestamps: OrderTimestamps,
}

impl OrderState {
    pub fn transition_status(
        &self,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<OrderState, OrderTransitionError> {
        if next == self.status {
            return Ok(self.clone());
        }
        if self.status.is_terminal() {
            return Err(OrderTransitionError::Terminal(self.status));
        }
        if next == OrderStatus::Cancelled {
            return self.cancel(None, now);
        }

        let mut state = self.clone();
        state.status = next;
        let stamps = &mut state.timestamps;
        match next {
            OrderStatus::Paid => {
                state.payment_status = OrderPaymentStatus::Paid;
                stamps.paid_at = stamps.paid_at.or(Some(now));
            }
            OrderStatus::Shipped => stamps.shipped_at = stamps.shipped_at.or(Some(now)),
            OrderStatus::Delivered => stamps.delivered_at = stamps.delivered_at.or(Some(now)),
            OrderStatus::Completed => stamps.completed_at = stamps.completed_at.or(Some(now)),
            OrderStatus::Refunded => stamps.refunded_at = stamps.refunded_at.or(Some(now)),
            _ => {}
        }

        Ok(state)
    }

    pub fn cancel(
        &self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderState, OrderTransitionError> {
        if !self.status.can_cancel() {
            return Err(OrderTransitionError::NotCancellable(self.status));
        }

        let mut state = self.clone();
        state.status = OrderStatus::Cancelled;
        state.cancel_reason = reason;
        state.timestamps.cancelled_at = Some(now);
        Ok(state)
    }

    pub fn refundable_minor(&self) -> i64 {
        (self.total_minor - self.refunded_minor).max(0)
    }

    pub fn refund(
        &self,
        amount_minor: i64,
        now: DateTime<Utc>,
    ) -> Result<OrderState, OrderTransitionError> {
        if !self.payment_status.holds_funds() {
            return Err(OrderTransitionError::NotRefundable(self.payment_status));
        }
        if amount_minor <= 0 {
            return Err(OrderTransitionError::NonPositiveRefund);
        }
        if self.refunded_minor + amount_minor > self.total_minor {
            return Err(OrderTransitionError::RefundExceedsTotal {
                requested: amount_minor,
                available: self.refundable_minor(),
            });
        }

        let mut state = self.clone();
        state.refunded_minor += amount_minor;
        if state.refunded_minor >= state.total_minor {
            state.status = OrderStatus::Refunded;
            state.payment_status = OrderPaymentStatus::Refunded;
        } else {
            state.status = OrderStatus::PartiallyRefunded;
            state.payment_status = OrderPaymentStatus::PartiallyRefunded;
        }
        state.timestamps.refunded_at = Some(now);
        Ok(state)
    }

    /// Gateway reported the money as collected. `None` when there is nothing
    /// to change (already paid, or the order is terminal).
    pub fn settle(&self, now: DateTime<Utc>) -> Option<OrderState> {
        if self.status.is_terminal() || self.payment_status.holds_funds() {
            return None;
        }
        self.transition_status(OrderStatus::Paid, now).ok()
    }

    pub fn fail_payment(&self) -> Option<OrderState> {
        if self.status.is_terminal() || self.payment_status.holds_funds() {
            return None;
        }
        if self.status == OrderStatus::PaymentFailed
            && self.payment_status == OrderPaymentStatus::Failed
        {
            return None;
        }

        let mut state = self.clone();
        state.status = OrderStatus::PaymentFailed;
        state.payment_status = OrderPaymentStatus::Failed;
        Some(state)
    }

    pub fn await_payment(&self) -> Option<OrderState> {
        if self.status.is_terminal()
            || self.payment_status.holds_funds()
            || self.status == OrderStatus::PendingPayment
        {
            return None;
        }

        let mut state = self.clone();
        state.status = OrderStatus::PendingPayment;
        Some(state)
    }

    pub fn transition_fulfillment(
        &self,
        next: FulfillmentStatus,
    ) -> Result<OrderState, OrderTransitionError> {
        use FulfillmentStatus::*;

        let from = self.fulfillment_status;
        let allowed = from == next
            || match from {
                Unfulfilled => matches!(next, PartiallyFulfilled | Fulfilled),
                PartiallyFulfilled => matches!(next, Fulfilled | PartiallyReturned | Returned),
                Fulfilled => matches!(next, PartiallyReturned | Returned),
                PartiallyReturned => matches!(next, Returned),
                Returned => false,
            };
        if !allowed {
            return Err(OrderTransitionError::InvalidFulfillment { from, to: next });
        }

        let mut state = self.clone();
        state.fulfillment_status = next;
        Ok(state)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct OrderItemTimestamps {
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl OrderItemTimestamps {
    pub fn stamp(&self, status: OrderItemStatus, now: DateTime<Utc>) -> OrderItemTimestamps {
        let mut stamps = *self;
        match status {
            OrderItemStatus::Shipped => stamps.shipped_at = stamps.shipped_at.or(Some(now)),
            OrderItemStatus::Delivered => stamps.delivered_at = stamps.delivered_at.or(Some(now)),
            OrderItemStatus::Cancelled => stamps.cancelled_at = stamps.cancelled_at.or(Some(now)),
            OrderItemStatus::Refunded => stamps.refunded_at = stamps.refunded_at.or(Some(now)),
            _ => {}
        }
        stamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: OrderStatus, payment_status: OrderPaymentStatus) -> OrderState {
        OrderState {
            status,
            payment_status,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            total_minor: 10_000,
            refunded_minor: 0,
            cancel_reason: None,
            timestamps: OrderTimestamps::default(),
        }
    }

    #[test]
    fn paid_forces_payment_axis_and_stamps() {
        let now = Utc::now();
        let next = state(OrderStatus::Pending, OrderPaymentStatus::Pending)
            .transition_status(OrderStatus::Paid, now)
            .unwrap();

        assert_eq!(next.payment_status, OrderPaymentStatus::Paid);
        assert_eq!(next.timestamps.paid_at, Some(now));
    }

    #[test]
    fn terminal_orders_reject_status_changes() {
        let err = state(OrderStatus::Completed, OrderPaymentStatus::Paid)
            .transition_status(OrderStatus::Shipped, Utc::now())
            .unwrap_err();

        assert_eq!(err, OrderTransitionError::Terminal(OrderStatus::Completed));
    }

    #[test]
    fn cancel_rejected_for_delivered_completed_cancelled_refunded() {
        for status in [
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let err = state(status, OrderPaymentStatus::Paid)
                .cancel(Some("changed mind".to_string()), Utc::now())
                .unwrap_err();
            assert_eq!(err, OrderTransitionError::NotCancellable(status));
        }
    }

    #[test]
    fn cancel_records_reason_and_time() {
        let now = Utc::now();
        let next = state(OrderStatus::Processing, OrderPaymentStatus::Paid)
            .cancel(Some("out of stock".to_string()), now)
            .unwrap();

        assert_eq!(next.status, OrderStatus::Cancelled);
        assert_eq!(next.cancel_reason.as_deref(), Some("out of stock"));
        assert_eq!(next.timestamps.cancelled_at, Some(now));
    }

    #[test]
    fn full_refund_moves_both_axes_to_refunded() {
        let next = state(OrderStatus::Paid, OrderPaymentStatus::Paid)
            .refund(10_000, Utc::now())
            .unwrap();

        assert_eq!(next.status, OrderStatus::Refunded);
        assert_eq!(next.payment_status, OrderPaymentStatus::Refunded);
        assert_eq!(next.refunded_minor, 10_000);
    }

    #[test]
    fn partial_refunds_accumulate_until_total() {
        let now = Utc::now();
        let first = state(OrderStatus::Paid, OrderPaymentStatus::Paid)
            .refund(4_000, now)
            .unwrap();
        assert_eq!(first.status, OrderStatus::PartiallyRefunded);
        assert_eq!(first.payment_status, OrderPaymentStatus::PartiallyRefunded);

        let err = first.refund(6_001, now).unwrap_err();
        assert_eq!(
            err,
            OrderTransitionError::RefundExceedsTotal {
                requested: 6_001,
                available: 6_000
            }
        );

        let second = first.refund(6_000, now).unwrap();
        assert_eq!(second.status, OrderStatus::Refunded);
        assert_eq!(second.refunded_minor, 10_000);
    }

    #[test]
    fn refund_requires_collected_payment_and_positive_amount() {
        let unpaid = state(OrderStatus::Pending, OrderPaymentStatus::Pending);
        assert_eq!(
            unpaid.refund(1_000, Utc::now()).unwrap_err(),
            OrderTransitionError::NotRefundable(OrderPaymentStatus::Pending)
        );

        let paid = state(OrderStatus::Paid, OrderPaymentStatus::Paid);
        assert_eq!(
            paid.refund(0, Utc::now()).unwrap_err(),
            OrderTransitionError::NonPositiveRefund
        );
    }

    #[test]
    fn settle_is_a_no_op_once_paid() {
        let now = Utc::now();
        let pending = state(OrderStatus::PendingPayment, OrderPaymentStatus::Pending);
        let paid = pending.settle(now).unwrap();

        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.settle(now).is_none());
        assert!(
            state(OrderStatus::Cancelled, OrderPaymentStatus::Pending)
                .settle(now)
                .is_none()
        );
    }

    #[test]
    fn fulfillment_follows_allowed_moves() {
        let order = state(OrderStatus::Paid, OrderPaymentStatus::Paid);
        let fulfilled = order
            .transition_fulfillment(FulfillmentStatus::Fulfilled)
            .unwrap();
        let returned = fulfilled
            .transition_fulfillment(FulfillmentStatus::Returned)
            .unwrap();

        assert_eq!(
            returned
                .transition_fulfillment(FulfillmentStatus::Fulfilled)
                .unwrap_err(),
            OrderTransitionError::InvalidFulfillment {
                from: FulfillmentStatus::Returned,
                to: FulfillmentStatus::Fulfilled
            }
        );
        assert!(
            order
                .transition_fulfillment(FulfillmentStatus::PartiallyReturned)
                .is_err()
        );
    }
}
