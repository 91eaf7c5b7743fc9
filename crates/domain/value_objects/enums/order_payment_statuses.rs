use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Payment axis of an order. Distinct from [`super::payment_statuses::PaymentStatus`],
/// which tracks a single collection attempt at the gateway.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Paid => "paid",
            OrderPaymentStatus::Failed => "failed",
            OrderPaymentStatus::Refunded => "refunded",
            OrderPaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderPaymentStatus::Pending),
            "paid" => Some(OrderPaymentStatus::Paid),
            "failed" => Some(OrderPaymentStatus::Failed),
            "refunded" => Some(OrderPaymentStatus::Refunded),
            "partially_refunded" => Some(OrderPaymentStatus::PartiallyRefunded),
            _ => None,
        }
    }

    /// Money has been captured and not fully returned.
    pub fn holds_funds(&self) -> bool {
        matches!(
            self,
            OrderPaymentStatus::Paid | OrderPaymentStatus::PartiallyRefunded
        )
    }
}

impl Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
