use super::config::ServiceContext;
use super::notifier::{AlertDispatcher, AlertEvent};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

const REDACTED: &str = "[REDACTED]";

/// Field names whose values never leave the process.
const SENSITIVE_MARKERS: [&str; 8] = [
    "secret",
    "password",
    "token",
    "authorization",
    "api_key",
    "webhook_url",
    "document",
    "card",
];

/// Forwards events at or above `min_level` to the alert dispatcher.
#[derive(Clone)]
pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    service_context: ServiceContext,
    min_level: Level,
}

impl AlertLayer {
    pub(crate) fn new(
        dispatcher: AlertDispatcher,
        service_context: ServiceContext,
        min_level: Level,
    ) -> Self {
        Self {
            dispatcher,
            service_context,
            min_level,
        }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    values: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        let value = if is_sensitive(name) {
            REDACTED.to_string()
        } else {
            value
        };
        self.values.insert(name.to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }
}

struct SpanFields(BTreeMap<String, String>);

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = RedactingVisitor::default();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(visitor.values));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = RedactingVisitor::default();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(fields) => fields.0.extend(visitor.values),
            None => extensions.insert(SpanFields(visitor.values)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.min_level || metadata.target() == "alert_delivery" {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut span_path = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                span_path.push(span.metadata().name().to_string());
                if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                    fields.extend(span_fields.0.clone());
                }
            }
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);
        let message = visitor.values.remove("message").map(|raw| unquote(&raw));
        fields.extend(visitor.values);

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.dispatch(AlertEvent {
            level: *metadata.level(),
            timestamp: Utc::now(),
            service_name: self.service_context.service_name.clone(),
            environment: self.service_context.environment.clone(),
            component: self.service_context.component.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields,
            span_path,
        });
    }
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

fn is_sensitive(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| field.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tracing::{error, info_span};
    use tracing_subscriber::layer::SubscriberExt;

    fn service() -> ServiceContext {
        ServiceContext {
            service_name: "commerce-backend".to_string(),
            environment: "test".to_string(),
            component: "backend".to_string(),
        }
    }

    #[test]
    fn alerts_carry_the_enclosing_commerce_spans() {
        let (tx, mut rx) = mpsc::channel(8);
        let layer = AlertLayer::new(AlertDispatcher::from_sender(tx), service(), Level::ERROR);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let webhook = info_span!("gateway_webhook", tenant_id = "t-1");
            let _webhook = webhook.enter();
            let checkout = info_span!("checkout", cart_id = "c-7", gateway_token = "whsec");
            let _checkout = checkout.enter();
            error!(payment_id = "p-9", "checkout: gateway charge failed");
        });

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.span_path, vec!["gateway_webhook", "checkout"]);
        assert_eq!(alert.fields.get("tenant_id").map(String::as_str), Some("t-1"));
        assert_eq!(alert.fields.get("cart_id").map(String::as_str), Some("c-7"));
        assert_eq!(alert.fields.get("payment_id").map(String::as_str), Some("p-9"));
        assert_eq!(alert.fields.get("gateway_token").map(String::as_str), Some(REDACTED));
        assert_eq!(alert.message.as_deref(), Some("checkout: gateway charge failed"));
    }

    #[test]
    fn events_below_the_alert_level_are_not_forwarded() {
        let (tx, mut rx) = mpsc::channel(8);
        let layer = AlertLayer::new(AlertDispatcher::from_sender(tx), service(), Level::ERROR);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let _batch = info_span!("billing_batch").entered();
            tracing::warn!("worker: renewals failed");
        });

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn redacts_credentials_and_customer_documents() {
        assert!(is_sensitive("gateway_webhook_token"));
        assert!(is_sensitive("GATEWAY_API_KEY"));
        assert!(is_sensitive("customer_document"));
        assert!(is_sensitive("Authorization"));
        assert!(!is_sensitive("tenant_id"));
        assert!(!is_sensitive("order_id"));
    }

    #[test]
    fn strips_debug_quotes_from_messages() {
        assert_eq!(unquote("\"checkout: failed\""), "checkout: failed");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
