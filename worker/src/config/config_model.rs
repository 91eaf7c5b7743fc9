use backend::config::config_model::Gateway;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub gateway: Gateway,
    pub schedule: Schedule,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    /// Seconds between batch runs
    pub interval_secs: u64,
    /// Carts idle longer than this are marked abandoned
    pub cart_abandon_after_hours: i64,
}
