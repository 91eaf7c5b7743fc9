use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// Value is basis points of the subtotal (1000 = 10%).
    Percentage,
    /// Value is an amount in minor units.
    Fixed,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::Fixed => "fixed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(CouponKind::Percentage),
            "fixed" => Some(CouponKind::Fixed),
            _ => None,
        }
    }
}

impl Display for CouponKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
