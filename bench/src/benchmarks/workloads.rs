//! One criterion benchmark per workload
//!
//! Only `run_once` is timed. When criterion asks for more iterations than
//! the pools still hold, the workload is torn down and set up again outside
//! the measured window.

use criterion::{criterion_group, Criterion};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::config::{load_config, Cli};
use crate::services::openfga::{bootstrap, OpenFgaClient};
use crate::workload::{WorkloadContext, WorkloadSelection};

fn bench_selection(c: &mut Criterion, selection: WorkloadSelection) {
    let rt = Runtime::new().unwrap();
    let config = load_config(&Cli::default()).expect("benchmark configuration");
    let client = OpenFgaClient::new(&config.openfga).unwrap();
    let store_name = format!("fga-bench-{}", Uuid::new_v4());
    let store = Arc::new(rt.block_on(bootstrap(client, &store_name)).expect("store bootstrap"));

    let ctx = WorkloadContext::new(store.clone(), config.workloads.clone());
    for workload in selection.build(&ctx) {
        rt.block_on(workload.setup()).expect("workload setup");

        c.bench_function(workload.name(), |b| {
            b.to_async(&rt).iter_custom(|iters| {
                let workload = Arc::clone(&workload);
                async move {
                    let iters = iters as usize;
                    if workload.capacity() < iters {
                        workload.teardown().await.unwrap();
                        workload.setup().await.unwrap();
                        assert!(
                            workload.capacity() >= iters,
                            "'{}' pools hold {} tuples, criterion needs {iters}",
                            workload.name(),
                            workload.capacity()
                        );
                    }

                    let start = Instant::now();
                    for _ in 0..iters {
                        workload.run_once().await.unwrap();
                    }
                    start.elapsed()
                }
            })
        });

        rt.block_on(workload.teardown()).expect("workload teardown");
    }

    rt.block_on(store.delete_store()).expect("store cleanup");
}

pub fn bench_create(c: &mut Criterion) {
    bench_selection(c, WorkloadSelection::Create);
}

pub fn bench_delete(c: &mut Criterion) {
    bench_selection(c, WorkloadSelection::Delete);
}

pub fn bench_lookup(c: &mut Criterion) {
    bench_selection(c, WorkloadSelection::Lookup);
}

pub fn bench_lookup_missing(c: &mut Criterion) {
    bench_selection(c, WorkloadSelection::LookupMissing);
}

pub fn bench_transitive(c: &mut Criterion) {
    bench_selection(c, WorkloadSelection::Transitive);
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(10));
    targets =
        bench_create,
        bench_delete,
        bench_lookup,
        bench_lookup_missing,
        bench_transitive
}
