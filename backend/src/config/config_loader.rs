use std::time::Duration;

use anyhow::{Context, Result};
use crates::payments::gateway_client::GatewaySettings;

use super::config_model::{
    BackendServer, Checkout, Database, DotEnvyConfig, Gateway, TenantAuth,
};

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        Err(_) => Ok(default),
    }
}

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: parsed_or("SERVER_BODY_LIMIT", 10)?,
        timeout: parsed_or("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let tenant_auth = TenantAuth {
        jwt_secret: required("JWT_TENANT_SECRET")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        tenant_auth,
        gateway: load_gateway()?,
        checkout: Checkout {
            payment_due_days: parsed_or("PAYMENT_DUE_DAYS", 3)?,
        },
    })
}

/// Gateway settings, shared with the worker binary.
pub fn load_gateway() -> Result<Gateway> {
    dotenvy::dotenv().ok();

    Ok(Gateway {
        base_url: required("GATEWAY_BASE_URL")?,
        api_key: required("GATEWAY_API_KEY")?,
        webhook_token: required("GATEWAY_WEBHOOK_TOKEN")?,
        timeout_secs: parsed_or("GATEWAY_TIMEOUT_SECS", 15)?,
    })
}

impl Gateway {
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            webhook_token: self.webhook_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
