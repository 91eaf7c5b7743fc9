use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How the customer pays at the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    Boleto,
    CreditCard,
    Pix,
    Undefined,
}

impl BillingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingType::Boleto => "boleto",
            BillingType::CreditCard => "credit_card",
            BillingType::Pix => "pix",
            BillingType::Undefined => "undefined",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "boleto" => Some(BillingType::Boleto),
            "credit_card" => Some(BillingType::CreditCard),
            "pix" => Some(BillingType::Pix),
            "undefined" => Some(BillingType::Undefined),
            _ => None,
        }
    }

    pub fn gateway_code(&self) -> &'static str {
        match self {
            BillingType::Boleto => "BOLETO",
            BillingType::CreditCard => "CREDIT_CARD",
            BillingType::Pix => "PIX",
            BillingType::Undefined => "UNDEFINED",
        }
    }
}

impl Display for BillingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
