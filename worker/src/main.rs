use anyhow::Result;
use backend::usecases::{
    carts::CartUseCase, payment_gateway::PaymentGateway, subscriptions::SubscriptionUseCase,
};
use crates::{
    domain::repositories::tenants::TenantRepository,
    infra::db::{
        postgres::postgres_connection,
        repositories::{
            carts::CartPostgres, catalog::CatalogPostgres, payments::PaymentPostgres,
            shipping_options::ShippingOptionPostgres, subscriptions::SubscriptionPostgres,
            tenants::TenantPostgres,
        },
    },
    payments::gateway_client::GatewayClient,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{config, services::worker_loop::{self, BatchJobs}};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(GatewayClient::new(dotenvy_env.gateway.settings())?);

    let tenants: Arc<dyn TenantRepository + Send + Sync> =
        Arc::new(TenantPostgres::new(Arc::clone(&db_pool_arc)));

    let cart_repository = Arc::new(CartPostgres::new(Arc::clone(&db_pool_arc)));
    let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool_arc)));
    let carts_usecase = CartUseCase::new(
        cart_repository,
        catalog_repository.clone(),
        catalog_repository,
        Arc::new(ShippingOptionPostgres::new(Arc::clone(&db_pool_arc))),
    );

    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc))),
        gateway,
    );

    let jobs = BatchJobs {
        tenants,
        carts: Arc::new(carts_usecase),
        subscriptions: Arc::new(subscriptions_usecase),
        cart_abandon_after: chrono::Duration::hours(dotenvy_env.schedule.cart_abandon_after_hours),
    };

    info!(
        interval_secs = dotenvy_env.schedule.interval_secs,
        "worker: started"
    );
    worker_loop::run_worker_loop(
        jobs,
        std::time::Duration::from_secs(dotenvy_env.schedule.interval_secs),
    )
    .await
}
