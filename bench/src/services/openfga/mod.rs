//! OpenFGA integration for the benchmark workloads
//!
//! This module provides the narrow interface the workloads use to talk to a
//! relationship-based authorization service:
//! - [`AuthorizationService`]: batched tuple writes/deletes and checks
//! - [`OpenFgaClient`]: reqwest HTTP client, store and model bootstrap
//! - [`InMemoryAuthorizationService`]: reference implementation of the
//!   write/check contract for tests and offline runs
//! - [`BatchWriter`]: splits large fixture sets into bounded write calls
//!
//! # Failure Semantics
//!
//! Every non-2xx response surfaces as an [`OpenFgaError`]. Nothing here
//! retries: benchmark correctness depends on an exact, fully accounted-for
//! fixture set, so callers decide whether a failure ends the run.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fga_bench::config::OpenFgaConfig;
//! use fga_bench::services::openfga::{bootstrap, AuthorizationService, OpenFgaClient};
//! use fga_bench::fixtures::new_user_reader_tuple;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenFgaClient::new(&OpenFgaConfig::default())?;
//! let scoped = bootstrap(client, "bench-store").await?;
//!
//! let tuple = new_user_reader_tuple();
//! scoped.write(&[tuple.clone()], &[]).await?;
//! assert!(scoped.check(&tuple).await?.allowed);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::fixtures::Tuple;

pub mod batch;
pub mod client;
pub mod memory;
pub mod model;

pub use batch::{BatchReport, BatchWriter, MAX_BATCH_SIZE};
pub use client::{bootstrap, OpenFgaClient, ScopedOpenFgaClient, StoreScope};
pub use memory::{InMemoryAuthorizationService, WriteCall};
pub use model::authorization_model;

/// Validation code OpenFGA uses for rejected tuple writes and deletes
pub const INVALID_WRITE_INPUT: &str = "write_failed_due_to_invalid_input";

/// Authorization service errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpenFgaError {
    /// Connection or network error
    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// 401 / 403
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Request rejected by the service's input validation
    #[error("Validation error ({code}): {message}")]
    Validation { code: String, message: String },

    /// Any other non-2xx status
    #[error("Unexpected status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Rejected locally before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl OpenFgaError {
    /// True when the service refused to delete a tuple that is not stored.
    pub fn is_missing_tuple_delete(&self) -> bool {
        match self {
            OpenFgaError::Validation { code, message } => {
                code == INVALID_WRITE_INPUT
                    && message.contains("cannot delete a tuple which does not exist")
            }
            _ => false,
        }
    }
}

/// Successful write or delete
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResponse {
    pub status: u16,
    pub raw: String,
}

/// Successful check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResponse {
    pub status: u16,
    pub allowed: bool,
    pub raw: String,
}

/// Relationship write and check operations, scoped to one store and model
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Write and delete tuples in one call. At least one side must be non-empty.
    async fn write(&self, writes: &[Tuple], deletes: &[Tuple])
        -> Result<WriteResponse, OpenFgaError>;

    /// Whether `tuple.user` has `tuple.relation` on `tuple.object`, directly
    /// or through the relationship graph.
    async fn check(&self, tuple: &Tuple) -> Result<CheckResponse, OpenFgaError>;
}
