use async_trait::async_trait;
use tracing::{debug, info};

use super::{Workload, WorkloadContext, WorkloadQueue};
use crate::error::BenchError;
use crate::fixtures::new_user_reader_tuples;

/// Writes one fresh `(user, reader, report)` tuple per invocation
///
/// Tuples are generated up front but not persisted; each written tuple moves
/// to the delete pool so teardown can remove exactly what the run created.
pub struct CreateRelationshipWorkload {
    ctx: WorkloadContext,
    pending: WorkloadQueue,
    written: WorkloadQueue,
}

impl CreateRelationshipWorkload {
    pub fn new(ctx: WorkloadContext) -> Self {
        Self {
            ctx,
            pending: WorkloadQueue::new("create", "workloads.create_pool_size"),
            written: WorkloadQueue::new("create.written", "workloads.create_pool_size"),
        }
    }

    /// Tuples written so far and not yet cleaned up
    pub fn written(&self) -> usize {
        self.written.len()
    }
}

#[async_trait]
impl Workload for CreateRelationshipWorkload {
    fn name(&self) -> &'static str {
        "create"
    }

    async fn setup(&self) -> Result<(), BenchError> {
        let pool_size = self.ctx.settings.create_pool_size;
        self.pending.populate(new_user_reader_tuples(pool_size))?;

        info!(workload = self.name(), tuples = pool_size, "Create pool ready");
        Ok(())
    }

    async fn run_once(&self) -> Result<(), BenchError> {
        let tuple = self.pending.pop_or_exhausted()?;
        self.ctx.service.write(std::slice::from_ref(&tuple), &[]).await?;

        debug!(%tuple, "Tuple written");
        self.written.push(tuple);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), BenchError> {
        let written = self.written.drain();
        self.pending.reset();
        self.written.reset();

        if written.is_empty() {
            return Ok(());
        }

        let report = self.ctx.batch_writer()?.delete_all(&written).await?;
        info!(
            workload = self.name(),
            tuples = report.tuples,
            batches = report.batches,
            "Created tuples removed"
        );
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::services::openfga::InMemoryAuthorizationService;
    use std::sync::Arc;

    fn workload(pool: usize) -> (Arc<InMemoryAuthorizationService>, CreateRelationshipWorkload) {
        let service = Arc::new(InMemoryAuthorizationService::new());
        let settings = WorkloadConfig {
            create_pool_size: pool,
            batch_size: 2,
            ..WorkloadConfig::default()
        };
        let ctx = WorkloadContext::new(service.clone(), settings);
        (service, CreateRelationshipWorkload::new(ctx))
    }

    #[tokio::test]
    async fn test_setup_does_not_persist() {
        let (service, workload) = workload(10);
        workload.setup().await.unwrap();

        assert_eq!(workload.capacity(), 10);
        assert_eq!(service.tuple_count(), 0);
        assert!(service.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_invocations_write_single_tuples_and_teardown_cleans_up() {
        let (service, workload) = workload(5);
        workload.setup().await.unwrap();

        for _ in 0..3 {
            workload.run_once().await.unwrap();
        }
        assert_eq!(service.tuple_count(), 3);
        assert_eq!(workload.written(), 3);
        assert_eq!(workload.capacity(), 2);

        workload.teardown().await.unwrap();
        assert_eq!(service.tuple_count(), 0);
        assert_eq!(workload.capacity(), 0);

        // Setup is allowed again once teardown reset the pools.
        workload.setup().await.unwrap();
        assert_eq!(workload.capacity(), 5);
    }

    #[tokio::test]
    async fn test_exhausted_pool_names_its_knob() {
        let (_, workload) = workload(1);
        workload.setup().await.unwrap();
        workload.run_once().await.unwrap();

        match workload.run_once().await {
            Err(BenchError::PoolExhausted { pool, knob }) => {
                assert_eq!(pool, "create");
                assert_eq!(knob, "workloads.create_pool_size");
            }
            other => panic!("expected PoolExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_setup_without_teardown_fails() {
        let (_, workload) = workload(2);
        workload.setup().await.unwrap();
        assert!(matches!(workload.setup().await, Err(BenchError::Config(_))));
    }
}
