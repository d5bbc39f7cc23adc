//! Benchmark workloads
//!
//! Each workload pre-builds a pool of tuples during [`Workload::setup`], then
//! spends exactly one tuple per [`Workload::run_once`] call, and removes
//! everything it persisted in [`Workload::teardown`]. Drivers never exit the
//! process; failures come back as [`BenchError`] and the [`runner`] or the
//! binary decides what to do with them.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::WorkloadConfig;
use crate::error::BenchError;
use crate::fixtures::Tuple;
use crate::services::openfga::{AuthorizationService, BatchWriter, CheckResponse};

pub mod create;
pub mod delete;
pub mod lookup;
pub mod queue;
pub mod runner;
pub mod transitive;

pub use create::CreateRelationshipWorkload;
pub use delete::DeleteRelationshipWorkload;
pub use lookup::{LookupMode, PointLookupWorkload};
pub use queue::WorkloadQueue;
pub use runner::{run_workload, RunPlan, RunSummary};
pub use transitive::TransitiveLookupWorkload;

#[async_trait]
pub trait Workload: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build and persist fixtures, then fill the pools
    async fn setup(&self) -> Result<(), BenchError>;

    /// One benchmarked operation
    async fn run_once(&self) -> Result<(), BenchError>;

    /// Delete everything setup and the invocations persisted
    async fn teardown(&self) -> Result<(), BenchError>;

    /// Invocations the current pools can still serve
    fn capacity(&self) -> usize;
}

/// Everything a workload needs from the outside
#[derive(Clone)]
pub struct WorkloadContext {
    pub service: Arc<dyn AuthorizationService>,
    pub settings: WorkloadConfig,
}

impl WorkloadContext {
    pub fn new(service: Arc<dyn AuthorizationService>, settings: WorkloadConfig) -> Self {
        Self { service, settings }
    }

    pub fn batch_writer(&self) -> Result<BatchWriter<'_>, BenchError> {
        BatchWriter::new(self.service.as_ref(), self.settings.batch_size)
    }
}

impl std::fmt::Debug for WorkloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Workloads selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkloadSelection {
    Create,
    Delete,
    /// Checks against persisted tuples
    Lookup,
    /// Checks against tuples that were never written
    LookupMissing,
    Transitive,
    All,
}

impl WorkloadSelection {
    /// Whether the selection runs the transitive workload
    pub fn includes_transitive(self) -> bool {
        matches!(self, WorkloadSelection::Transitive | WorkloadSelection::All)
    }

    /// Instantiate the selected workloads in run order
    pub fn build(self, ctx: &WorkloadContext) -> Vec<Arc<dyn Workload>> {
        let create = || -> Arc<dyn Workload> { Arc::new(CreateRelationshipWorkload::new(ctx.clone())) };
        let delete = || -> Arc<dyn Workload> { Arc::new(DeleteRelationshipWorkload::new(ctx.clone())) };
        let lookup = |mode| -> Arc<dyn Workload> { Arc::new(PointLookupWorkload::new(ctx.clone(), mode)) };
        let transitive = || -> Arc<dyn Workload> { Arc::new(TransitiveLookupWorkload::new(ctx.clone())) };

        match self {
            WorkloadSelection::Create => vec![create()],
            WorkloadSelection::Delete => vec![delete()],
            WorkloadSelection::Lookup => vec![lookup(LookupMode::Existing)],
            WorkloadSelection::LookupMissing => vec![lookup(LookupMode::Missing)],
            WorkloadSelection::Transitive => vec![transitive()],
            WorkloadSelection::All => vec![
                create(),
                delete(),
                lookup(LookupMode::Existing),
                lookup(LookupMode::Missing),
                transitive(),
            ],
        }
    }
}

/// Compare a check response with the verdict the fixture implies
pub(crate) fn assert_verdict(
    tuple: &Tuple,
    expected: bool,
    response: &CheckResponse,
) -> Result<(), BenchError> {
    if response.allowed != expected {
        return Err(BenchError::Assertion {
            tuple: tuple.clone(),
            expected,
            actual: response.allowed,
        });
    }
    Ok(())
}
