#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub tenant_auth: TenantAuth,
    pub gateway: Gateway,
    pub checkout: Checkout,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TenantAuth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    pub base_url: String,
    pub api_key: String,
    pub webhook_token: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    /// Days between order placement and the payment due date.
    pub payment_due_days: i64,
}
