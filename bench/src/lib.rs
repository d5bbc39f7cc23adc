pub mod config;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod services;
pub mod workload;

#[cfg(feature = "benchmarks")]
pub mod benchmarks;

pub use config::*;
pub use error::*;

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::openfga::{bootstrap, AuthorizationService, InMemoryAuthorizationService, OpenFgaClient};
use crate::workload::{run_workload, RunPlan, RunSummary, WorkloadContext, WorkloadSelection};

/// Run the workloads `cli` selects, in order, stopping at the first failure.
///
/// Against OpenFGA a fresh store and model are bootstrapped first; the store
/// is deleted afterwards when `openfga.delete_store_on_exit` is set, even if
/// a workload failed.
pub async fn run(cli: &Cli, config: BenchConfig) -> BenchResult<Vec<RunSummary>> {
    let plan = RunPlan::new(cli.iterations, cli.concurrency)?;

    if cli.in_memory {
        info!("Using the in-memory authorization service");
        let service: Arc<dyn AuthorizationService> = Arc::new(InMemoryAuthorizationService::new());
        return run_selected(cli.workload, WorkloadContext::new(service, config.workloads), plan).await;
    }

    warn_if_transitive_unsupported(cli.workload);

    let client = OpenFgaClient::new(&config.openfga)?;
    let store_name = config
        .openfga
        .store_name
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let store = Arc::new(bootstrap(client, &store_name).await?);
    info!(
        store_id = %store.scope().store_id,
        authorization_model_id = %store.scope().authorization_model_id,
        "OpenFGA store ready"
    );

    let ctx = WorkloadContext::new(store.clone(), config.workloads.clone());
    let result = run_selected(cli.workload, ctx, plan).await;

    if config.openfga.delete_store_on_exit {
        if let Err(err) = store.delete_store().await {
            if result.is_ok() {
                return Err(err.into());
            }
            warn!(error = %err, "Failed to delete store after workload error");
        }
    }

    result
}

/// Run each selected workload to completion with the same plan
pub async fn run_selected(
    selection: WorkloadSelection,
    ctx: WorkloadContext,
    plan: RunPlan,
) -> BenchResult<Vec<RunSummary>> {
    let mut summaries = Vec::new();
    for workload in selection.build(&ctx) {
        summaries.push(run_workload(workload, plan).await?);
    }
    Ok(summaries)
}

/// The bundled model only grants `reader` directly, so OpenFGA never resolves
/// a leaf group through its `subgroup` chain.
fn warn_if_transitive_unsupported(selection: WorkloadSelection) {
    if selection.includes_transitive() {
        warn!(
            workload = ?selection,
            "The bundled authorization model has no inherited relations; transitive checks will be denied and the run will fail with an assertion error"
        );
    }
}
