use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{assert_verdict, Workload, WorkloadContext, WorkloadQueue};
use crate::error::BenchError;
use crate::fixtures::{build_hierarchies, derive_transitive_lookups, HierarchyLayout, Tuple};
use crate::services::openfga::BatchWriter;

/// Checks that only resolve by walking a group hierarchy
///
/// Setup persists `hierarchy_count` subgroup chains and one capstone per
/// lookup granting `reader` on a fresh report to a hierarchy root. Each
/// invocation checks whether a leaf group can read that report.
pub struct TransitiveLookupWorkload {
    ctx: WorkloadContext,
    lookups: WorkloadQueue,
    /// Subgroup and capstone tuples, recorded before they are written
    persisted: Mutex<Vec<Tuple>>,
}

impl TransitiveLookupWorkload {
    pub fn new(ctx: WorkloadContext) -> Self {
        Self {
            ctx,
            lookups: WorkloadQueue::new("transitive", "workloads.hierarchy_count"),
            persisted: Mutex::new(Vec::new()),
        }
    }

    fn record_persisted(&self, tuples: &[Tuple]) {
        self.persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(tuples);
    }

    fn take_persisted(&self) -> Vec<Tuple> {
        let mut guard = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl Workload for TransitiveLookupWorkload {
    fn name(&self) -> &'static str {
        "transitive"
    }

    async fn setup(&self) -> Result<(), BenchError> {
        let settings = &self.ctx.settings;
        let layout = HierarchyLayout::new(settings.hierarchy_count, settings.hierarchy_depth)?;

        let hierarchies = build_hierarchies(layout.count(), layout.depth())?;
        let hierarchy_writer = BatchWriter::new(
            self.ctx.service.as_ref(),
            settings.hierarchy_batch_tuples(),
        )?;

        // Recorded first so a partial write is still cleaned up.
        self.record_persisted(&hierarchies);
        let written = hierarchy_writer.write_all(&hierarchies).await?;
        info!(
            workload = self.name(),
            hierarchies = layout.count(),
            depth = layout.depth(),
            batches = written.batches,
            "Hierarchies persisted"
        );

        let report_id = Uuid::new_v4().to_string();
        let fixtures = derive_transitive_lookups(
            &hierarchies,
            layout,
            &report_id,
            settings.root_pairing,
        )?;

        self.record_persisted(&fixtures.capstones);
        let written = self.ctx.batch_writer()?.write_all(&fixtures.capstones).await?;
        info!(
            workload = self.name(),
            report = %report_id,
            pairing = ?settings.root_pairing,
            capstones = written.tuples,
            "Capstones persisted"
        );

        self.lookups.populate(fixtures.lookups)?;
        Ok(())
    }

    async fn run_once(&self) -> Result<(), BenchError> {
        let tuple = self.lookups.pop_or_exhausted()?;

        let response = self.ctx.service.check(&tuple).await?;
        debug!(%tuple, allowed = response.allowed, "Transitive lookup");

        assert_verdict(&tuple, true, &response)
    }

    async fn teardown(&self) -> Result<(), BenchError> {
        let persisted = self.take_persisted();
        self.lookups.reset();

        if persisted.is_empty() {
            return Ok(());
        }

        let report = self
            .ctx
            .batch_writer()?
            .delete_all_best_effort(&persisted)
            .await?;
        info!(
            workload = self.name(),
            tuples = report.tuples,
            batches = report.batches,
            skipped = report.skipped,
            "Hierarchy fixtures removed"
        );
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.lookups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::fixtures::RootPairing;
    use crate::services::openfga::{InMemoryAuthorizationService, WriteCall};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn workload(
        count: usize,
        depth: usize,
        pairing: RootPairing,
    ) -> (Arc<InMemoryAuthorizationService>, TransitiveLookupWorkload) {
        let service = Arc::new(InMemoryAuthorizationService::new());
        let settings = WorkloadConfig {
            hierarchy_count: count,
            hierarchy_depth: depth,
            hierarchies_per_batch: 4,
            batch_size: 3,
            root_pairing: pairing,
            ..WorkloadConfig::default()
        };
        let workload = TransitiveLookupWorkload::new(WorkloadContext::new(service.clone(), settings));
        (service, workload)
    }

    #[tokio::test]
    async fn test_setup_batches_hierarchies_then_capstones() {
        let (service, workload) = workload(10, 5, RootPairing::Own);
        workload.setup().await.unwrap();

        // 50 subgroup tuples in chunks of 4 hierarchies, then 10 capstones in threes.
        let writes: Vec<usize> = service.write_calls().iter().map(|c| c.writes).collect();
        assert_eq!(writes, vec![20, 20, 10, 3, 3, 3, 1]);
        assert_eq!(service.tuple_count(), 60);
        assert_eq!(workload.capacity(), 10);
    }

    #[tokio::test]
    async fn test_own_pairing_lookups_are_allowed() {
        let (service, workload) = workload(6, 3, RootPairing::Own);
        workload.setup().await.unwrap();

        for _ in 0..6 {
            workload.run_once().await.unwrap();
        }
        assert_eq!(service.check_count(), 6);

        workload.teardown().await.unwrap();
        assert_eq!(service.tuple_count(), 0);
    }

    #[tokio::test]
    async fn test_previous_pairing_denies_only_the_last_leaf() {
        let count = 4;
        let (_, workload) = workload(count, 2, RootPairing::Previous);
        workload.setup().await.unwrap();
        assert_eq!(workload.capacity(), count - 1);

        // Leaves 1..count-1 still reach the report through their own root,
        // which the next hierarchy's capstone granted.
        for _ in 0..count - 2 {
            workload.run_once().await.unwrap();
        }

        // The last root never gets a capstone.
        assert!(matches!(
            workload.run_once().await,
            Err(BenchError::Assertion { expected: true, actual: false, .. })
        ));
        assert_eq!(workload.capacity(), 0);
        workload.teardown().await.unwrap();
    }

    #[traced_test]
    #[tokio::test]
    async fn test_teardown_skips_already_missing_batches() {
        let (service, workload) = workload(2, 3, RootPairing::Own);
        workload.setup().await.unwrap();

        // Delete one hierarchy tuple out from under the workload.
        let stray = workload.persisted.lock().unwrap()[0].clone();
        crate::services::openfga::AuthorizationService::write(service.as_ref(), &[], &[stray])
            .await
            .unwrap();

        workload.teardown().await.unwrap();
        assert!(logs_contain("Skipping cleanup batch"));

        // Only the batch holding the stray tuple was rejected.
        assert_eq!(service.tuple_count(), 2);
        assert_eq!(
            service.write_calls().iter().filter(|c| c.deletes > 0).count(),
            4
        );
        assert!(service
            .write_calls()
            .contains(&WriteCall { writes: 0, deletes: 3 }));
    }
}
