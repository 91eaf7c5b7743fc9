use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    Completed,
}

impl OrderItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemStatus::Pending => "pending",
            OrderItemStatus::Processing => "processing",
            OrderItemStatus::Shipped => "shipped",
            OrderItemStatus::Delivered => "delivered",
            OrderItemStatus::Cancelled => "cancelled",
            OrderItemStatus::Refunded => "refunded",
            OrderItemStatus::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderItemStatus::Pending),
            "processing" => Some(OrderItemStatus::Processing),
            "shipped" => Some(OrderItemStatus::Shipped),
            "delivered" => Some(OrderItemStatus::Delivered),
            "cancelled" => Some(OrderItemStatus::Cancelled),
            "refunded" => Some(OrderItemStatus::Refunded),
            "completed" => Some(OrderItemStatus::Completed),
            _ => None,
        }
    }
}

impl Display for OrderItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
