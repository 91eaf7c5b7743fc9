use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use sha2::{Digest, Sha256};

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

// Gateway webhook envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayWebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub event: String,
    #[serde(default)]
    pub payment: Option<GatewayPaymentPayload>,
    #[serde(default)]
    pub subscription: Option<GatewaySubscriptionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPaymentPayload {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub value: Option<Number>,
    #[serde(default)]
    pub net_value: Option<Number>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
}

impl GatewayPaymentPayload {
    pub fn value_minor(&self) -> Option<i64> {
        self.value.as_ref().and_then(decimal_to_minor)
    }

    pub fn net_value_minor(&self) -> Option<i64> {
        self.net_value.as_ref().and_then(decimal_to_minor)
    }

    /// Gateway fee implied by a net value lower than the gross value.
    pub fn fee_minor(&self) -> Option<i64> {
        match (self.value_minor(), self.net_value_minor()) {
            (Some(gross), Some(net)) if net < gross => Some(gross - net),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscriptionPayload {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub value: Option<Number>,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub cycle: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSignal {
    Created,
    Status(PaymentStatus),
    /// Updates that carry no status change (UPDATED, VIEWED, ...).
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionSignal {
    Created,
    Updated,
    Renewed,
    Cancelled,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventKind {
    Payment(PaymentSignal),
    Subscription(SubscriptionSignal),
    Transfer,
    Anticipation,
    Unknown,
}

/// What the reconciliation did with one delivery.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Applied,
    /// The entity already carried the reported state.
    Unchanged,
    Duplicate,
    /// Nothing local matched the gateway ids in the payload.
    Unmatched,
    Ignored,
    Failed,
}

fn payment_signal(suffix: &str) -> PaymentSignal {
    match suffix {
        "CREATED" => PaymentSignal::Created,
        "CONFIRMED" => PaymentSignal::Status(PaymentStatus::Confirmed),
        "RECEIVED" | "RECEIVED_IN_CASH" => PaymentSignal::Status(PaymentStatus::Received),
        "OVERDUE" => PaymentSignal::Status(PaymentStatus::Overdue),
        "REFUNDED" => PaymentSignal::Status(PaymentStatus::Refunded),
        "PARTIALLY_REFUNDED" => PaymentSignal::Status(PaymentStatus::PartiallyRefunded),
        "DELETED" | "CANCELLED" => PaymentSignal::Status(PaymentStatus::Cancelled),
        "REPROVED_BY_RISK_ANALYSIS" | "CREDIT_CARD_CAPTURE_REFUSED" | "FAILED" => {
            PaymentSignal::Status(PaymentStatus::Failed)
        }
        _ => PaymentSignal::Informational,
    }
}

fn subscription_signal(suffix: &str) -> SubscriptionSignal {
    match suffix {
        "CREATED" => SubscriptionSignal::Created,
        "UPDATED" => SubscriptionSignal::Updated,
        "RENEWED" => SubscriptionSignal::Renewed,
        "DELETED" | "INACTIVATED" => SubscriptionSignal::Cancelled,
        _ => SubscriptionSignal::Other,
    }
}

impl GatewayWebhookEvent {
    pub fn kind(&self) -> GatewayEventKind {
        let event = self.event.trim();

        // subscription cycle charges are payment events
        if let Some(suffix) = event.strip_prefix("SUBSCRIPTION_PAYMENT_") {
            return GatewayEventKind::Payment(payment_signal(suffix));
        }
        if let Some(suffix) = event.strip_prefix("PAYMENT_") {
            return GatewayEventKind::Payment(payment_signal(suffix));
        }
        if let Some(suffix) = event.strip_prefix("SUBSCRIPTION_") {
            return GatewayEventKind::Subscription(subscription_signal(suffix));
        }
        if event.starts_with("TRANSFER_") {
            return GatewayEventKind::Transfer;
        }
        if event.starts_with("ANTICIPATION_") {
            return GatewayEventKind::Anticipation;
        }
        GatewayEventKind::Unknown
    }

    /// Key under which a delivery is recorded. Deliveries without an event id
    /// are keyed by a digest of the event name and the raw body.
    pub fn idempotency_key(&self, raw_body: &[u8]) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.trim().is_empty()) {
            return id.to_string();
        }

        let mut hasher = Sha256::new();
        hasher.update(self.event.as_bytes());
        hasher.update(raw_body);
        hex::encode(hasher.finalize())
    }
}

/// Parses a decimal gateway amount (`"19.9"`, `250`, `"0.05"`) into minor units
/// without going through floating point arithmetic.
pub fn decimal_to_minor(value: &Number) -> Option<i64> {
    if let Some(units) = value.as_i64() {
        return units.checked_mul(100);
    }

    let text = value.to_string();
    if text.contains(['e', 'E']) {
        return value.as_f64().map(|v| (v * 100.0).round() as i64);
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut cents = 0i64;
    for (position, ch) in fraction.chars().take(2).enumerate() {
        let digit = i64::from(ch.to_digit(10)?);
        cents += if position == 0 { digit * 10 } else { digit };
    }

    let minor = whole.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -minor } else { minor })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> GatewayWebhookEvent {
        GatewayWebhookEvent {
            id: None,
            event: name.to_string(),
            payment: None,
            subscription: None,
        }
    }

    #[test]
    fn subscription_payment_events_take_the_payment_path() {
        assert_eq!(
            event("SUBSCRIPTION_PAYMENT_CONFIRMED").kind(),
            GatewayEventKind::Payment(PaymentSignal::Status(PaymentStatus::Confirmed))
        );
        assert_eq!(
            event("SUBSCRIPTION_RENEWED").kind(),
            GatewayEventKind::Subscription(SubscriptionSignal::Renewed)
        );
    }

    #[test]
    fn payment_suffixes_map_to_statuses() {
        let cases = [
            ("PAYMENT_RECEIVED_IN_CASH", PaymentSignal::Status(PaymentStatus::Received)),
            ("PAYMENT_DELETED", PaymentSignal::Status(PaymentStatus::Cancelled)),
            (
                "PAYMENT_CREDIT_CARD_CAPTURE_REFUSED",
                PaymentSignal::Status(PaymentStatus::Failed),
            ),
            ("PAYMENT_CREATED", PaymentSignal::Created),
            ("PAYMENT_UPDATED", PaymentSignal::Informational),
        ];

        for (name, expected) in cases {
            assert_eq!(event(name).kind(), GatewayEventKind::Payment(expected), "{name}");
        }
    }

    #[test]
    fn other_families_are_classified() {
        assert_eq!(event("TRANSFER_DONE").kind(), GatewayEventKind::Transfer);
        assert_eq!(event("ANTICIPATION_CREDITED").kind(), GatewayEventKind::Anticipation);
        assert_eq!(event("INVOICE_CREATED").kind(), GatewayEventKind::Unknown);
        assert_eq!(
            event("SUBSCRIPTION_INACTIVATED").kind(),
            GatewayEventKind::Subscription(SubscriptionSignal::Cancelled)
        );
    }

    #[test]
    fn idempotency_key_prefers_event_id() {
        let mut with_id = event("PAYMENT_CONFIRMED");
        with_id.id = Some("evt_123".to_string());
        assert_eq!(with_id.idempotency_key(b"{}"), "evt_123");

        let without_id = event("PAYMENT_CONFIRMED");
        let first = without_id.idempotency_key(b"{\"a\":1}");
        let second = without_id.idempotency_key(b"{\"a\":1}");
        let other = without_id.idempotency_key(b"{\"a\":2}");
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn payload_amounts_convert_exactly() {
        let raw = r#"{
            "event": "PAYMENT_RECEIVED",
            "payment": {"id": "pay_1", "value": 19.9, "netValue": 18.95, "dueDate": "2024-05-10"}
        }"#;
        let parsed: GatewayWebhookEvent = serde_json::from_str(raw).unwrap();
        let payment = parsed.payment.unwrap();

        assert_eq!(payment.value_minor(), Some(1_990));
        assert_eq!(payment.net_value_minor(), Some(1_895));
        assert_eq!(payment.fee_minor(), Some(95));
        assert_eq!(decimal_to_minor(&Number::from(250)), Some(25_000));
    }
}
