use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    CheckoutStarted,
    Converted,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::CheckoutStarted => "checkout_started",
            CartStatus::Converted => "converted",
            CartStatus::Abandoned => "abandoned",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CartStatus::Active),
            "checkout_started" => Some(CartStatus::CheckoutStarted),
            "converted" => Some(CartStatus::Converted),
            "abandoned" => Some(CartStatus::Abandoned),
            _ => None,
        }
    }

    /// Converted and abandoned carts accept no mutation at all.
    pub fn is_closed(&self) -> bool {
        matches!(self, CartStatus::Converted | CartStatus::Abandoned)
    }
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
