//! Thread-safe tuple pools shared by benchmark workers
//!
//! A [`WorkloadQueue`] is filled once during setup and then drained one tuple
//! per invocation from any number of tasks. The lock is held only for the
//! O(1) push/pop and never across an `.await`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::BenchError;
use crate::fixtures::Tuple;

#[derive(Debug)]
pub struct WorkloadQueue {
    name: &'static str,
    /// Config key that sizes this pool, reported on exhaustion
    knob: &'static str,
    tuples: Mutex<VecDeque<Tuple>>,
    populated: AtomicBool,
}

impl WorkloadQueue {
    pub fn new(name: &'static str, knob: &'static str) -> Self {
        Self {
            name,
            knob,
            tuples: Mutex::new(VecDeque::new()),
            populated: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // A poisoned lock only means another worker panicked mid push/pop; the
    // deque itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Tuple>> {
        self.tuples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, tuple: Tuple) {
        self.lock().push_back(tuple);
    }

    /// Non-blocking; `None` when the pool is empty
    pub fn pop(&self) -> Option<Tuple> {
        self.lock().pop_front()
    }

    pub fn pop_or_exhausted(&self) -> Result<Tuple, BenchError> {
        self.pop().ok_or_else(|| BenchError::PoolExhausted {
            pool: self.name.to_string(),
            knob: self.knob.to_string(),
        })
    }

    /// Fill the pool. Allowed once until the next [`reset`](Self::reset).
    pub fn populate<I>(&self, tuples: I) -> Result<usize, BenchError>
    where
        I: IntoIterator<Item = Tuple>,
    {
        if self.populated.swap(true, Ordering::SeqCst) {
            return Err(BenchError::Config(format!(
                "pool '{}' was already populated",
                self.name
            )));
        }

        let mut guard = self.lock();
        let before = guard.len();
        guard.extend(tuples);
        Ok(guard.len() - before)
    }

    /// Take every remaining tuple, leaving the pool empty
    pub fn drain(&self) -> Vec<Tuple> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Empty the pool and allow it to be populated again
    pub fn reset(&self) {
        self.clear();
        self.populated.store(false, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
