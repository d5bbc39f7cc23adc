use thiserror::Error;

use crate::fixtures::Tuple;
use crate::services::openfga::OpenFgaError;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Workload pool '{pool}' is exhausted; increase `{knob}`")]
    PoolExhausted { pool: String, knob: String },

    #[error("Service error: {0}")]
    Service(#[from] OpenFgaError),

    #[error("Check verdict mismatch for {tuple}: expected allowed={expected}, got allowed={actual}")]
    Assertion {
        tuple: Tuple,
        expected: bool,
        actual: bool,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification used by the top-level driver to pick an exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments, bad config, undersized pools.
    Configuration,
    /// The authorization service rejected a request or could not be reached.
    Service,
    /// A check disagreed with the fixture's ground truth.
    Assertion,
    Internal,
}

impl BenchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BenchError::Config(_)
            | BenchError::InvalidArgument(_)
            | BenchError::PoolExhausted { .. } => ErrorKind::Configuration,
            BenchError::Service(_) => ErrorKind::Service,
            BenchError::Assertion { .. } => ErrorKind::Assertion,
            BenchError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::Service => 3,
            ErrorKind::Assertion => 4,
            ErrorKind::Internal => 1,
        }
    }

    /// True for the one service failure teardown is allowed to swallow.
    pub fn is_missing_tuple_delete(&self) -> bool {
        matches!(self, BenchError::Service(err) if err.is_missing_tuple_delete())
    }
}

impl From<garde::Report> for BenchError {
    fn from(report: garde::Report) -> Self {
        BenchError::Config(report.to_string())
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
