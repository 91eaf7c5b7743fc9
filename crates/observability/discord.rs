use super::notifier::{AlertChannel, AlertEvent};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

const MESSAGE_LIMIT: usize = 2000;
const TRUNCATED_SUFFIX: &str = "\n… (truncated)";

/// Fields promoted to the headline so on-call sees which record failed.
const HEADLINE_FIELDS: [&str; 4] = ["tenant_id", "order_id", "payment_id", "subscription_id"];

pub(crate) struct DiscordChannel {
    webhook_url: Url,
    client: Client,
}

impl DiscordChannel {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build discord http client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn render_alert(event: &AlertEvent) -> String {
    let mut lines = vec![format!(
        "**{}** `{}` `{}` `{}`",
        event.service_name,
        event.environment,
        event.component,
        event.level.as_str()
    )];

    let ids: Vec<String> = HEADLINE_FIELDS
        .iter()
        .filter_map(|key| event.fields.get(*key).map(|value| format!("{key}=`{value}`")))
        .collect();
    if !ids.is_empty() {
        lines.push(ids.join(" "));
    }

    let location = event
        .location
        .as_deref()
        .map(|location| format!(" `{location}`"))
        .unwrap_or_default();
    lines.push(format!(
        "`{}` `{}`{}",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        event.target,
        location
    ));

    if let Some(message) = event.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !event.span_path.is_empty() {
        lines.push(format!("spans: `{}`", event.span_path.join(" > ")));
    }

    for (key, value) in &event.fields {
        if HEADLINE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    if content.chars().count() <= MESSAGE_LIMIT {
        return content;
    }

    let keep = MESSAGE_LIMIT - TRUNCATED_SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATED_SUFFIX);
    truncated
}

#[async_trait]
impl AlertChannel for DiscordChannel {
    async fn deliver(&self, event: &AlertEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render_alert(event) }))
            .send()
            .await
            // reqwest errors embed the url, which holds the webhook secret
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "discord webhook returned status {}",
            response.status()
        ))
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
