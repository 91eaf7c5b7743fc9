use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyReturned,
    Returned,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::PartiallyFulfilled => "partially_fulfilled",
            FulfillmentStatus::Fulfilled => "fulfilled",
            FulfillmentStatus::PartiallyReturned => "partially_returned",
            FulfillmentStatus::Returned => "returned",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "unfulfilled" => Some(FulfillmentStatus::Unfulfilled),
            "partially_fulfilled" => Some(FulfillmentStatus::PartiallyFulfilled),
            "fulfilled" => Some(FulfillmentStatus::Fulfilled),
            "partially_returned" => Some(FulfillmentStatus::PartiallyReturned),
            "returned" => Some(FulfillmentStatus::Returned),
            _ => None,
        }
    }
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
