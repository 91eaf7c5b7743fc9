use tracing::Level;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let component = component.trim().to_string();

        let service_context = ServiceContext {
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| format!("commerce-{component}")),
            environment: non_empty("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let alerts = alert_sink(&non_empty, &mut warnings);

        Self {
            service_context,
            alerts,
            warnings,
        }
    }
}

fn alert_sink<F>(non_empty: &F, warnings: &mut Vec<String>) -> Option<AlertSinkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if non_empty("DISCORD_NOTIFY_ENABLED").and_then(|raw| parse_bool(&raw)) == Some(false) {
        return None;
    }

    let raw_url = non_empty("DISCORD_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(err) => {
            // the url itself is a secret
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL is invalid, error alerts disabled ({err})"
            ));
            return None;
        }
    };

    let min_level = match non_empty("DISCORD_NOTIFY_LEVEL") {
        None => Level::ERROR,
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_LEVEL `{raw}` is not a log level, using ERROR"
            ));
            Level::ERROR
        }),
    };

    Some(AlertSinkConfig {
        webhook_url,
        min_level,
    })
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ObservabilityConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ObservabilityConfig::from_lookup("backend", |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_alert_sink() {
        let config = config(&[]);
        assert_eq!(config.service_context.service_name, "commerce-backend");
        assert_eq!(config.service_context.environment, "unknown");
        assert!(config.alerts.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_url_disables_alerts_with_warning() {
        let config = config(&[("DISCORD_WEBHOOK_URL", "not a url")]);
        assert!(config.alerts.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(!config.warnings[0].contains("not a url"));
    }

    #[test]
    fn unknown_level_falls_back_to_error() {
        let config = config(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.test/api/webhooks/1/abc"),
            ("DISCORD_NOTIFY_LEVEL", "loud"),
        ]);
        assert_eq!(config.alerts.map(|a| a.min_level), Some(Level::ERROR));
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn explicit_disable_wins_over_url() {
        let config = config(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.test/api/webhooks/1/abc"),
            ("DISCORD_NOTIFY_ENABLED", "off"),
        ]);
        assert!(config.alerts.is_none());
    }
}
