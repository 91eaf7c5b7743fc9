mod config;
mod discord;
mod layer;
mod notifier;

use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordChannel;
use layer::AlertLayer;
use notifier::{AlertChannel, AlertDispatcher};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber for a binary. Must run inside a tokio runtime
/// when error alerts are configured.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = match config.alerts.as_ref() {
        Some(alerts) => {
            let channel: Arc<dyn AlertChannel> =
                Arc::new(DiscordChannel::new(alerts.webhook_url.clone())?);
            let dispatcher = AlertDispatcher::spawn(vec![channel]);

            Some(
                AlertLayer::new(dispatcher, config.service_context.clone(), alerts.min_level)
                    .with_filter(LevelFilter::from_level(alerts.min_level)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // local offset so operators read their own wall clock
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    let service = &config.service_context;
    for warning in &config.warnings {
        warn!(
            service = %service.service_name,
            environment = %service.environment,
            %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %service.service_name,
        environment = %service.environment,
        component = %service.component,
        error_alerts = config.alerts.is_some(),
        "observability: initialised"
    );

    Ok(())
}
