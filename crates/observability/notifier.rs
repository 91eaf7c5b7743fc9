use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, warn};

const ALERT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct AlertEvent {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    /// Event fields merged over the fields of its enclosing spans.
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) span_path: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertChannel: Send + Sync {
    async fn deliver(&self, event: &AlertEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Hands alerts to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(ALERT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for channel in &channels {
                    if let Err(error) = channel.deliver(&event).await {
                        // target outside the alert filter, no feedback loop
                        warn!(
                            target: "alert_delivery",
                            channel = channel.name(),
                            error = %error,
                            "observability: alert delivery failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<AlertEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn dispatch(&self, event: AlertEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            warn!(target: "alert_delivery", reason, "observability: alert dropped");
        }
    }
}
