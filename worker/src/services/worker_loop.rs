use anyhow::Result;
use backend::usecases::{carts::CartUseCase, subscriptions::SubscriptionUseCase};
use chrono::{NaiveDate, Utc};
use crates::domain::{repositories::tenants::TenantRepository, value_objects::tenant::TenantId};
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, error, info, info_span};

pub struct BatchJobs {
    pub tenants: Arc<dyn TenantRepository + Send + Sync>,
    pub carts: Arc<CartUseCase>,
    pub subscriptions: Arc<SubscriptionUseCase>,
    pub cart_abandon_after: chrono::Duration,
}

/// Totals for one pass over every tenant.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub tenants: usize,
    pub renewed: usize,
    pub trials_converted: usize,
    pub carts_abandoned: usize,
    pub failures: usize,
}

pub async fn run_worker_loop(jobs: BatchJobs, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let today = Utc::now().date_naive();
        match run_batch(&jobs, today)
            .instrument(info_span!("billing_batch", %today))
            .await
        {
            Ok(summary) => info!(
                tenants = summary.tenants,
                renewed = summary.renewed,
                trials_converted = summary.trials_converted,
                carts_abandoned = summary.carts_abandoned,
                failures = summary.failures,
                "worker: batch finished"
            ),
            Err(err) => error!(error = ?err, "worker: batch aborted"),
        }
    }
}

/// One pass of every job over every tenant. A failing tenant is counted and
/// skipped so the rest still run.
pub async fn run_batch(jobs: &BatchJobs, today: NaiveDate) -> Result<BatchSummary> {
    let tenant_ids = jobs.tenants.list_tenant_ids().await?;
    let mut summary = BatchSummary {
        tenants: tenant_ids.len(),
        ..BatchSummary::default()
    };

    for tenant_id in tenant_ids {
        run_tenant(jobs, tenant_id, today, &mut summary)
            .instrument(info_span!("tenant_jobs", %tenant_id))
            .await;
    }

    Ok(summary)
}

async fn run_tenant(
    jobs: &BatchJobs,
    tenant_id: TenantId,
    today: NaiveDate,
    summary: &mut BatchSummary,
) {
    match jobs.subscriptions.process_renewals(tenant_id, today).await {
        Ok(report) => {
            summary.renewed += report.processed;
            summary.failures += report.failed;
        }
        Err(err) => {
            summary.failures += 1;
            error!(%tenant_id, error = ?err, "worker: renewals failed");
        }
    }

    match jobs.subscriptions.process_trial_endings(tenant_id, today).await {
        Ok(report) => {
            summary.trials_converted += report.processed;
            summary.failures += report.failed;
        }
        Err(err) => {
            summary.failures += 1;
            error!(%tenant_id, error = ?err, "worker: trial endings failed");
        }
    }

    match jobs
        .carts
        .sweep_abandoned(tenant_id, jobs.cart_abandon_after)
        .await
    {
        Ok(swept) => summary.carts_abandoned += swept,
        Err(err) => {
            summary.failures += 1;
            error!(%tenant_id, error = ?err, "worker: abandoned cart sweep failed");
        }
    }
}
