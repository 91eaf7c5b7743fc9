use std::fmt::Display;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Semiannual => "semiannual",
            BillingCycle::Annual => "annual",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingCycle::Monthly),
            "quarterly" => Some(BillingCycle::Quarterly),
            "semiannual" => Some(BillingCycle::Semiannual),
            "annual" => Some(BillingCycle::Annual),
            _ => None,
        }
    }

    /// Cycle name on the gateway wire.
    pub fn gateway_code(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "MONTHLY",
            BillingCycle::Quarterly => "QUARTERLY",
            BillingCycle::Semiannual => "SEMIANNUALLY",
            BillingCycle::Annual => "YEARLY",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Semiannual => 6,
            BillingCycle::Annual => 12,
        }
    }

    /// Next billing date one cycle after `from`. Month ends clamp
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn advance(&self, from: NaiveDate) -> Option<NaiveDate> {
        from.checked_add_months(Months::new(self.months()))
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn advances_by_cycle_length() {
        let start = date(2026, 1, 15);
        assert_eq!(BillingCycle::Monthly.advance(start), Some(date(2026, 2, 15)));
        assert_eq!(BillingCycle::Quarterly.advance(start), Some(date(2026, 4, 15)));
        assert_eq!(BillingCycle::Semiannual.advance(start), Some(date(2026, 7, 15)));
        assert_eq!(BillingCycle::Annual.advance(start), Some(date(2027, 1, 15)));
    }

    #[test]
    fn clamps_month_end() {
        assert_eq!(
            BillingCycle::Monthly.advance(date(2026, 1, 31)),
            Some(date(2026, 2, 28))
        );
    }
}
