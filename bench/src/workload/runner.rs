//! Drives a [`Workload`] through setup, concurrent invocations and teardown

use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, trace};

use super::Workload;
use crate::error::BenchError;

/// How many invocations to run and how many tasks share them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub iterations: usize,
    pub concurrency: usize,
}

impl RunPlan {
    pub fn new(iterations: usize, concurrency: usize) -> Result<Self, BenchError> {
        if iterations < 1 {
            return Err(BenchError::InvalidArgument(
                "iterations must be greater than or equal to 1".to_string(),
            ));
        }
        if concurrency < 1 {
            return Err(BenchError::InvalidArgument(
                "concurrency must be greater than or equal to 1".to_string(),
            ));
        }
        Ok(Self { iterations, concurrency })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub workload: &'static str,
    pub iterations: usize,
    pub elapsed: Duration,
    /// Invocations per second
    pub throughput: f64,
}

/// Run one workload end to end.
///
/// Teardown runs whenever setup was attempted, including after a failed
/// setup or invocation. The first error wins; a teardown failure that
/// follows it is only logged.
pub async fn run_workload(
    workload: Arc<dyn Workload>,
    plan: RunPlan,
) -> Result<RunSummary, BenchError> {
    let name = workload.name();
    info!(workload = name, "Setting up workload");

    let result = match workload.setup().await {
        Ok(()) => {
            let capacity = workload.capacity();
            if plan.iterations > capacity {
                Err(BenchError::Config(format!(
                    "workload '{name}' can serve {capacity} invocations but {} were requested",
                    plan.iterations
                )))
            } else {
                drive(Arc::clone(&workload), plan).await
            }
        }
        Err(err) => Err(err),
    };

    info!(workload = name, "Tearing down workload");
    let teardown = workload.teardown().await;

    match (result, teardown) {
        (Ok(summary), Ok(())) => {
            info!(
                workload = summary.workload,
                iterations = summary.iterations,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                throughput = summary.throughput,
                "Workload finished"
            );
            Ok(summary)
        }
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(teardown_err)) => {
            error!(workload = name, error = %teardown_err, "Teardown failed after workload error");
            Err(err)
        }
    }
}

async fn drive(workload: Arc<dyn Workload>, plan: RunPlan) -> Result<RunSummary, BenchError> {
    let next = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let start = Instant::now();
    let mut workers = JoinSet::new();

    for worker in 0..plan.concurrency.min(plan.iterations) {
        let workload = Arc::clone(&workload);
        let next = Arc::clone(&next);
        let completed = Arc::clone(&completed);
        let stop = Arc::clone(&stop);
        let iterations = plan.iterations;

        workers.spawn(async move {
            loop {
                if stop.load(Ordering::SeqCst) {
                    return Ok(());
                }
                let iteration = next.fetch_add(1, Ordering::SeqCst);
                if iteration >= iterations {
                    return Ok(());
                }

                if let Err(err) = workload.run_once().await {
                    stop.store(true, Ordering::SeqCst);
                    return Err(err);
                }
                completed.fetch_add(1, Ordering::SeqCst);
                trace!(worker, iteration, "Invocation complete");
            }
        });
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        let outcome = joined
            .map_err(|e| BenchError::Internal(anyhow!("workload task failed: {e}")))
            .and_then(|result| result);

        if let Err(err) = outcome {
            error!(workload = workload.name(), error = %err, "Workload invocation failed");
            first_error.get_or_insert(err);
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let elapsed = start.elapsed();
    let iterations = completed.load(Ordering::SeqCst);
    let throughput = if elapsed.is_zero() {
        0.0
    } else {
        iterations as f64 / elapsed.as_secs_f64()
    };

    Ok(RunSummary {
        workload: workload.name(),
        iterations,
        elapsed,
        throughput,
    })
}
