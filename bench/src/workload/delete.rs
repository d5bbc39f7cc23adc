use async_trait::async_trait;
use tracing::{debug, info};

use super::{Workload, WorkloadContext, WorkloadQueue};
use crate::error::BenchError;

/// Deletes one persisted `(user, reader, report)` tuple per invocation
pub struct DeleteRelationshipWorkload {
    ctx: WorkloadContext,
    pool: WorkloadQueue,
}

impl DeleteRelationshipWorkload {
    pub fn new(ctx: WorkloadContext) -> Self {
        Self {
            ctx,
            pool: WorkloadQueue::new("delete", "workloads.delete_pool_size"),
        }
    }
}

#[async_trait]
impl Workload for DeleteRelationshipWorkload {
    fn name(&self) -> &'static str {
        "delete"
    }

    async fn setup(&self) -> Result<(), BenchError> {
        let pool_size = self.ctx.settings.delete_pool_size;

        // Each accepted batch joins the pool at once, so teardown drains
        // whatever landed even if a later batch fails.
        self.pool.populate(std::iter::empty())?;
        self.ctx
            .batch_writer()?
            .create_user_readers_with(pool_size, |batch| {
                for tuple in batch {
                    self.pool.push(tuple.clone());
                }
            })
            .await?;

        info!(workload = self.name(), tuples = pool_size, "Delete pool persisted");
        Ok(())
    }

    async fn run_once(&self) -> Result<(), BenchError> {
        let tuple = self.pool.pop_or_exhausted()?;
        self.ctx.service.write(&[], std::slice::from_ref(&tuple)).await?;

        debug!(%tuple, "Tuple deleted");
        Ok(())
    }

    async fn teardown(&self) -> Result<(), BenchError> {
        let remaining = self.pool.drain();
        self.pool.reset();

        if remaining.is_empty() {
            return Ok(());
        }

        let report = self.ctx.batch_writer()?.delete_all(&remaining).await?;
        info!(
            workload = self.name(),
            tuples = report.tuples,
            batches = report.batches,
            "Unused delete pool removed"
        );
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.pool.len()
    }
}
