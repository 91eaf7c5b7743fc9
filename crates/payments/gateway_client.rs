use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use sha2::Sha256;
use tracing::error;

use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, billing_types::BillingType,
};

type HmacSha256 = Hmac<Sha256>;

const ACCESS_TOKEN_HEADER: &str = "access_token";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub api_key: String,
    pub webhook_token: String,
    pub timeout: Duration,
}

/// Payment gateway client built on reqwest.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    webhook_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRequest {
    pub name: String,
    pub email: Option<String>,
    pub document: Option<String>,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub customer: String,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub due_date: NaiveDate,
    pub description: String,
    pub external_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringRequest {
    pub customer: String,
    pub billing_type: BillingType,
    pub amount_minor: i64,
    pub next_due_date: NaiveDate,
    pub cycle: BillingCycle,
    pub description: String,
    pub external_reference: String,
}

/// Fields left as `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringUpdate {
    pub amount_minor: Option<i64>,
    pub cycle: Option<BillingCycle>,
    pub description: Option<String>,
    pub next_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCharge {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRecurring {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct GatewayList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    #[serde(default)]
    errors: Vec<GatewayErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetails {
    code: Option<String>,
    description: Option<String>,
}

/// Renders minor units as the decimal amount the gateway expects (`1990` -> `19.9`).
pub fn minor_to_decimal(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

impl GatewayClient {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build gateway http client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            webhook_token: settings.webhook_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (gateway_error_code, gateway_error_description) =
            match serde_json::from_str::<GatewayErrorEnvelope>(&body) {
                Ok(envelope) => envelope
                    .errors
                    .into_iter()
                    .next()
                    .map(|details| (details.code, details.description))
                    .unwrap_or((None, None)),
                Err(_) => (None, None),
            };

        error!(
            status = %status,
            gateway_error_code = ?gateway_error_code,
            gateway_error_description = ?gateway_error_description,
            response_body = %body,
            context = %context,
            "gateway: api request failed"
        );

        anyhow::bail!(
            "gateway request failed: {} (status {}, code={:?})",
            context,
            status,
            gateway_error_code
        );
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Value,
        context: &str,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.url(path))
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("gateway request failed: {context}"))?;
        let resp = Self::ensure_success(resp, context).await?;

        Ok(resp.json::<T>().await?)
    }

    async fn delete(&self, path: &str, context: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(path))
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .with_context(|| format!("gateway request failed: {context}"))?;
        Self::ensure_success(resp, context).await?;

        Ok(())
    }

    /// Registers a customer and returns its gateway id.
    pub async fn create_customer(&self, customer: &CustomerRequest) -> Result<String> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(customer.name));
        if let Some(email) = &customer.email {
            body.insert("email".to_string(), json!(email));
        }
        if let Some(document) = &customer.document {
            body.insert("cpfCnpj".to_string(), json!(document));
        }
        if let Some(reference) = &customer.external_reference {
            body.insert("externalReference".to_string(), json!(reference));
        }

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = self
            .post_json("customers", &Value::Object(body), "create customer")
            .await?;
        Ok(parsed.id)
    }

    pub async fn create_payment(&self, charge: &ChargeRequest) -> Result<GatewayCharge> {
        let body = json!({
            "customer": charge.customer,
            "billingType": charge.billing_type.gateway_code(),
            "value": minor_to_decimal(charge.amount_minor),
            "dueDate": charge.due_date,
            "description": charge.description,
            "externalReference": charge.external_reference,
        });

        self.post_json("payments", &body, "create payment").await
    }

    pub async fn cancel_payment(&self, gateway_payment_id: &str) -> Result<()> {
        self.delete(&format!("payments/{gateway_payment_id}"), "cancel payment")
            .await
    }

    /// Refunds a settled charge. `None` refunds the remaining value.
    pub async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount_minor: Option<i64>,
        description: Option<&str>,
    ) -> Result<GatewayCharge> {
        let mut body = Map::new();
        if let Some(amount_minor) = amount_minor {
            body.insert("value".to_string(), json!(minor_to_decimal(amount_minor)));
        }
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }

        self.post_json(
            &format!("payments/{gateway_payment_id}/refund"),
            &Value::Object(body),
            "refund payment",
        )
        .await
    }

    pub async fn create_subscription(&self, recurring: &RecurringRequest) -> Result<GatewayRecurring> {
        let body = json!({
            "customer": recurring.customer,
            "billingType": recurring.billing_type.gateway_code(),
            "value": minor_to_decimal(recurring.amount_minor),
            "nextDueDate": recurring.next_due_date,
            "cycle": recurring.cycle.gateway_code(),
            "description": recurring.description,
            "externalReference": recurring.external_reference,
        });

        self.post_json("subscriptions", &body, "create subscription")
            .await
    }

    pub async fn update_subscription(
        &self,
        gateway_subscription_id: &str,
        update: &RecurringUpdate,
    ) -> Result<GatewayRecurring> {
        let mut body = Map::new();
        if let Some(amount_minor) = update.amount_minor {
            body.insert("value".to_string(), json!(minor_to_decimal(amount_minor)));
            body.insert("updatePendingPayments".to_string(), json!(true));
        }
        if let Some(cycle) = update.cycle {
            body.insert("cycle".to_string(), json!(cycle.gateway_code()));
        }
        if let Some(description) = &update.description {
            body.insert("description".to_string(), json!(description));
        }
        if let Some(next_due_date) = update.next_due_date {
            body.insert("nextDueDate".to_string(), json!(next_due_date));
        }

        self.post_json(
            &format!("subscriptions/{gateway_subscription_id}"),
            &Value::Object(body),
            "update subscription",
        )
        .await
    }

    pub async fn cancel_subscription(&self, gateway_subscription_id: &str) -> Result<()> {
        self.delete(
            &format!("subscriptions/{gateway_subscription_id}"),
            "cancel subscription",
        )
        .await
    }

    /// Charges the gateway scheduled for a recurring subscription, oldest first.
    pub async fn list_subscription_payments(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Vec<GatewayCharge>> {
        let context = "list subscription payments";
        let resp = self
            .http
            .get(self.url(&format!("subscriptions/{gateway_subscription_id}/payments")))
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .with_context(|| format!("gateway request failed: {context}"))?;
        let resp = Self::ensure_success(resp, context).await?;

        let mut page: GatewayList<GatewayCharge> = resp.json().await?;
        page.data.sort_by_key(|charge| charge.due_date);
        Ok(page.data)
    }

    /// Constant-time check of the token the gateway sends with each webhook.
    pub fn verify_webhook_token(&self, provided: &str) -> bool {
        verify_token(&self.webhook_token, provided)
    }
}

fn verify_token(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let tag = |key: &str| -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(b"gateway-webhook");
        Some(mac.finalize().into_bytes().to_vec())
    };

    let Some(expected_tag) = tag(expected) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(provided.as_bytes()) else {
        return false;
    };
    mac.update(b"gateway-webhook");
    mac.verify_slice(&expected_tag).is_ok()
}
