use anyhow::{Context, Result, ensure};
use backend::config::config_loader::load_gateway;

use super::config_model::{Database, DotEnvyConfig, Schedule};

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

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
        max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 4)?,
    };

    let schedule = Schedule {
        interval_secs: parsed_or("WORKER_INTERVAL_SECS", 3600)?,
        cart_abandon_after_hours: parsed_or("CART_ABANDON_AFTER_HOURS", 72)?,
    };
    ensure!(schedule.interval_secs > 0, "WORKER_INTERVAL_SECS must be positive");
    ensure!(
        schedule.cart_abandon_after_hours > 0,
        "CART_ABANDON_AFTER_HOURS must be positive"
    );

    Ok(DotEnvyConfig {
        database,
        gateway: load_gateway()?,
        schedule,
    })
}
