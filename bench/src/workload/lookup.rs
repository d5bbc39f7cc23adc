use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

use super::{assert_verdict, Workload, WorkloadContext, WorkloadQueue};
use crate::error::BenchError;
use crate::fixtures::{new_user_reader_tuples, Tuple};

/// Which pool a point lookup draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Persisted tuples, expected allowed
    Existing,
    /// Never-written tuples, expected denied
    Missing,
    /// Existing on even invocations, missing on odd ones
    Alternating,
}

/// Direct `check` calls against a known fixture set
pub struct PointLookupWorkload {
    ctx: WorkloadContext,
    mode: LookupMode,
    existing: WorkloadQueue,
    missing: WorkloadQueue,
    /// Every batch setup persisted, independent of what the pools hand out
    persisted: Mutex<Vec<Tuple>>,
    invocations: AtomicUsize,
}

impl PointLookupWorkload {
    pub fn new(ctx: WorkloadContext, mode: LookupMode) -> Self {
        Self {
            ctx,
            mode,
            existing: WorkloadQueue::new("lookup.existing", "workloads.lookup_pool_size"),
            missing: WorkloadQueue::new("lookup.missing", "workloads.lookup_pool_size"),
            persisted: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    fn take_persisted(&self) -> Vec<Tuple> {
        let mut guard = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }

    fn record_persisted(&self, tuples: &[Tuple]) {
        self.persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(tuples);
    }

    /// Pick the pool for this invocation and the verdict it should produce
    fn next_pool(&self) -> (&WorkloadQueue, bool) {
        match self.mode {
            LookupMode::Existing => (&self.existing, true),
            LookupMode::Missing => (&self.missing, false),
            LookupMode::Alternating => {
                if self.invocations.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
                    (&self.existing, true)
                } else {
                    (&self.missing, false)
                }
            }
        }
    }
}

#[async_trait]
impl Workload for PointLookupWorkload {
    fn name(&self) -> &'static str {
        match self.mode {
            LookupMode::Existing => "lookup",
            LookupMode::Missing => "lookup-missing",
            LookupMode::Alternating => "lookup-alternating",
        }
    }

    async fn setup(&self) -> Result<(), BenchError> {
        let pool_size = self.ctx.settings.lookup_pool_size;

        let existing = self
            .ctx
            .batch_writer()?
            .create_user_readers_with(pool_size, |batch| self.record_persisted(batch))
            .await?;
        self.existing.populate(existing)?;
        self.missing.populate(new_user_reader_tuples(pool_size))?;
        self.invocations.store(0, Ordering::Relaxed);

        info!(workload = self.name(), tuples = pool_size, "Lookup pools ready");
        Ok(())
    }

    async fn run_once(&self) -> Result<(), BenchError> {
        let (pool, expected) = self.next_pool();
        let tuple = pool.pop_or_exhausted()?;

        let response = self.ctx.service.check(&tuple).await?;
        debug!(%tuple, allowed = response.allowed, "Point lookup");

        assert_verdict(&tuple, expected, &response)
    }

    async fn teardown(&self) -> Result<(), BenchError> {
        let persisted = self.take_persisted();
        self.existing.reset();
        self.missing.reset();

        if persisted.is_empty() {
            return Ok(());
        }

        let report = self.ctx.batch_writer()?.delete_all(&persisted).await?;
        info!(
            workload = self.name(),
            tuples = report.tuples,
            batches = report.batches,
            "Lookup fixtures removed"
        );
        Ok(())
    }

    fn capacity(&self) -> usize {
        match self.mode {
            LookupMode::Existing => self.existing.len(),
            LookupMode::Missing => self.missing.len(),
            LookupMode::Alternating => {
                let existing = self.existing.len();
                let missing = self.missing.len();
                // Existing is drawn first, so it may run one ahead.
                2 * existing.min(missing) + usize::from(existing > missing)
            }
        }
    }
}
