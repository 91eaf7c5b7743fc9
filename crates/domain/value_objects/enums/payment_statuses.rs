use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Received,
    Overdue,
    Refunded,
    PartiallyRefunded,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Received => "received",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "confirmed" => Some(PaymentStatus::Confirmed),
            "received" => Some(PaymentStatus::Received),
            "overdue" => Some(PaymentStatus::Overdue),
            "refunded" => Some(PaymentStatus::Refunded),
            "partially_refunded" => Some(PaymentStatus::PartiallyRefunded),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    /// Funds were collected (card confirmation or settled transfer).
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Confirmed | PaymentStatus::Received)
    }

    /// Whether a gateway-reported move from `self` to `next` may be applied.
    ///
    /// The gateway does not guarantee delivery order, so a late `CONFIRMED`
    /// arriving after `RECEIVED` must not pull the payment backwards, and
    /// nothing leaves `Refunded`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        if *self == next {
            return false;
        }

        match self {
            Pending => true,
            Overdue => matches!(next, Confirmed | Received | Cancelled | Failed),
            Failed => matches!(next, Confirmed | Received | Overdue | Cancelled),
            Cancelled => matches!(next, Confirmed | Received),
            Confirmed => matches!(next, Received | Refunded | PartiallyRefunded),
            Received => matches!(next, Refunded | PartiallyRefunded),
            PartiallyRefunded => matches!(next, Refunded),
            Refunded => false,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
