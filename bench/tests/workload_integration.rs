//! End-to-end workload runs against the in-memory authorization service

use std::sync::Arc;

use fga_bench::fixtures::RootPairing;
use fga_bench::services::openfga::InMemoryAuthorizationService;
use fga_bench::workload::{
    run_workload, LookupMode, PointLookupWorkload, RunPlan, Workload, WorkloadContext,
    WorkloadSelection,
};
use fga_bench::{run, run_selected, BenchError, Cli, ErrorKind, WorkloadConfig};

fn small_settings() -> WorkloadConfig {
    WorkloadConfig {
        batch_size: 100,
        create_pool_size: 300,
        delete_pool_size: 300,
        lookup_pool_size: 300,
        hierarchy_count: 120,
        hierarchy_depth: 5,
        hierarchies_per_batch: 20,
        root_pairing: RootPairing::Own,
    }
}

fn context(settings: WorkloadConfig) -> (Arc<InMemoryAuthorizationService>, WorkloadContext) {
    let service = Arc::new(InMemoryAuthorizationService::new());
    let ctx = WorkloadContext::new(service.clone(), settings);
    (service, ctx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_workloads_leave_the_store_empty() {
    let (service, ctx) = context(small_settings());

    let summaries = run_selected(WorkloadSelection::All, ctx, RunPlan::new(100, 4).unwrap())
        .await
        .expect("all workloads should pass");

    let names: Vec<&str> = summaries.iter().map(|s| s.workload).collect();
    assert_eq!(
        names,
        vec!["create", "delete", "lookup", "lookup-missing", "transitive"]
    );
    assert!(summaries.iter().all(|s| s.iterations == 100));
    assert_eq!(service.tuple_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transitive_run_uses_every_lookup() {
    let (service, ctx) = context(small_settings());

    let workload = WorkloadSelection::Transitive.build(&ctx).remove(0);
    let summary = run_workload(workload, RunPlan::new(120, 8).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.iterations, 120);
    assert_eq!(service.check_count(), 120);
    assert_eq!(service.tuple_count(), 0);
}

#[tokio::test]
async fn test_previous_root_pairing_fails_on_the_last_leaf() {
    let settings = WorkloadConfig {
        root_pairing: RootPairing::Previous,
        ..small_settings()
    };
    let lookups = settings.hierarchy_count - 1;
    let (service, ctx) = context(settings.clone());

    // Every leaf but the last reaches the report through its own root.
    let workload = WorkloadSelection::Transitive.build(&ctx).remove(0);
    let summary = run_workload(workload, RunPlan::new(lookups - 1, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.iterations, lookups - 1);

    let (service_all, ctx) = context(settings);
    let workload = WorkloadSelection::Transitive.build(&ctx).remove(0);
    let err = run_workload(workload, RunPlan::new(lookups, 1).unwrap())
        .await
        .unwrap_err();
    assert_eq!(service_all.check_count(), lookups as u64);

    assert!(matches!(err, BenchError::Assertion { expected: true, actual: false, .. }));
    assert_eq!(err.kind(), ErrorKind::Assertion);
    assert_eq!(err.exit_code(), 4);

    // Teardown ran after both the clean and the failed run.
    assert_eq!(service.tuple_count(), 0);
    assert_eq!(service_all.tuple_count(), 0);
}

#[tokio::test]
async fn test_undersized_pool_fails_before_running() {
    let (service, ctx) = context(small_settings());

    let workload = WorkloadSelection::Create.build(&ctx).remove(0);
    let err = run_workload(workload, RunPlan::new(301, 1).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(service.write_calls().is_empty());
}

#[tokio::test]
async fn test_pool_exhaustion_mid_run_is_reported() {
    let (_, ctx) = context(small_settings());
    let workload = PointLookupWorkload::new(ctx, LookupMode::Missing);

    workload.setup().await.unwrap();
    for _ in 0..300 {
        workload.run_once().await.unwrap();
    }

    let err = workload.run_once().await.unwrap_err();
    match &err {
        BenchError::PoolExhausted { knob, .. } => assert_eq!(knob, "workloads.lookup_pool_size"),
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);

    workload.teardown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alternating_lookups_under_concurrency() {
    let (service, ctx) = context(small_settings());
    let workload: Arc<dyn Workload> = Arc::new(PointLookupWorkload::new(ctx, LookupMode::Alternating));

    let summary = run_workload(workload, RunPlan::new(600, 6).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.workload, "lookup-alternating");
    assert_eq!(summary.iterations, 600);
    assert_eq!(service.tuple_count(), 0);
}

#[tokio::test]
async fn test_run_in_memory_from_cli() {
    let cli = Cli {
        workload: WorkloadSelection::Delete,
        iterations: 50,
        concurrency: 2,
        in_memory: true,
        ..Cli::default()
    };
    let config = fga_bench::BenchConfig {
        workloads: small_settings(),
        ..Default::default()
    };

    let summaries = run(&cli, config).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].workload, "delete");
    assert_eq!(summaries[0].iterations, 50);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let cli = Cli {
        concurrency: 0,
        in_memory: true,
        ..Cli::default()
    };

    let err = run(&cli, fga_bench::BenchConfig::default()).await.unwrap_err();
    assert!(matches!(err, BenchError::InvalidArgument(_)));
}
