use anyhow::Result;
use backend::axum_http::http_serve;
use backend::config::config_loader;
use backend::usecases::payment_gateway::PaymentGateway;
use crates::infra::db::postgres::postgres_connection;
use crates::payments::gateway_client::GatewayClient;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(GatewayClient::new(dotenvy_env.gateway.settings())?);

    http_serve::start(Arc::new(dotenvy_env), Arc::new(postgres_pool), gateway).await?;

    Ok(())
}
