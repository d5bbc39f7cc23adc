//! Bounded batch writes against an [`AuthorizationService`]
//!
//! Fixture sets run into the tens of thousands of tuples while the service
//! caps a single write call. [`BatchWriter`] slices them into chunks of at
//! most `batch_size` tuples and issues one call per chunk, in order.

use tracing::{debug, warn};

use super::AuthorizationService;
use crate::error::BenchError;
use crate::fixtures::{new_user_reader_tuples, Tuple};

/// Largest number of tuples a single write call may carry
pub const MAX_BATCH_SIZE: usize = 1000;

/// Outcome of a batched operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Write calls issued
    pub batches: usize,
    /// Tuples in batches the service accepted
    pub tuples: usize,
    /// Batches skipped as benign cleanup noise
    pub skipped: usize,
}

pub struct BatchWriter<'a> {
    service: &'a dyn AuthorizationService,
    batch_size: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(service: &'a dyn AuthorizationService, batch_size: usize) -> Result<Self, BenchError> {
        if batch_size < 1 || batch_size > MAX_BATCH_SIZE {
            return Err(BenchError::InvalidArgument(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }

        Ok(Self { service, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Persist every tuple, one write call per chunk
    pub async fn write_all(&self, tuples: &[Tuple]) -> Result<BatchReport, BenchError> {
        self.write_all_with(tuples, |_| {}).await
    }

    /// Like [`write_all`](Self::write_all), calling `on_written` with each
    /// chunk the service accepted. On failure, every chunk before the failing
    /// one has been reported.
    pub async fn write_all_with<F>(
        &self,
        tuples: &[Tuple],
        mut on_written: F,
    ) -> Result<BatchReport, BenchError>
    where
        F: FnMut(&[Tuple]) + Send,
    {
        let mut report = BatchReport::default();

        for chunk in tuples.chunks(self.batch_size) {
            self.service.write(chunk, &[]).await?;
            on_written(chunk);
            report.batches += 1;
            report.tuples += chunk.len();
        }

        debug!(batches = report.batches, tuples = report.tuples, "Batched write finished");
        Ok(report)
    }

    /// Delete every tuple, one write call per chunk
    pub async fn delete_all(&self, tuples: &[Tuple]) -> Result<BatchReport, BenchError> {
        let mut report = BatchReport::default();

        for chunk in tuples.chunks(self.batch_size) {
            self.service.write(&[], chunk).await?;
            report.batches += 1;
            report.tuples += chunk.len();
        }

        debug!(batches = report.batches, tuples = report.tuples, "Batched delete finished");
        Ok(report)
    }

    /// Like [`delete_all`](Self::delete_all), but a chunk the service rejects
    /// for containing an already-missing tuple is logged and skipped. Any other
    /// failure still aborts.
    pub async fn delete_all_best_effort(&self, tuples: &[Tuple]) -> Result<BatchReport, BenchError> {
        let mut report = BatchReport::default();

        for chunk in tuples.chunks(self.batch_size) {
            report.batches += 1;

            match self.service.write(&[], chunk).await {
                Ok(_) => report.tuples += chunk.len(),
                Err(err) if err.is_missing_tuple_delete() => {
                    warn!(error = %err, tuples = chunk.len(), "Skipping cleanup batch");
                    report.skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(
            batches = report.batches,
            tuples = report.tuples,
            skipped = report.skipped,
            "Best-effort delete finished"
        );
        Ok(report)
    }

    /// Generate `total` user-reader tuples, persisting them in batches when
    /// `persist` is set.
    pub async fn create_user_readers(&self, total: usize, persist: bool) -> Result<Vec<Tuple>, BenchError> {
        if persist {
            return self.create_user_readers_with(total, |_| {}).await;
        }

        check_total(total)?;
        Ok(new_user_reader_tuples(total))
    }

    /// Generate and persist `total` user-reader tuples, reporting each
    /// accepted batch to `on_written` as in [`write_all_with`](Self::write_all_with).
    pub async fn create_user_readers_with<F>(
        &self,
        total: usize,
        on_written: F,
    ) -> Result<Vec<Tuple>, BenchError>
    where
        F: FnMut(&[Tuple]) + Send,
    {
        check_total(total)?;

        let tuples = new_user_reader_tuples(total);
        self.write_all_with(&tuples, on_written).await?;
        Ok(tuples)
    }
}

fn check_total(total: usize) -> Result<(), BenchError> {
    if total < 1 {
        return Err(BenchError::InvalidArgument(
            "total users must be greater than or equal to 1".to_string(),
        ));
    }
    Ok(())
}
