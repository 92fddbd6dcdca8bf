/// ReadbackScheduler - GPU to CPU readbacks on a bounded worker pool
///
/// Each job waits on its fence with a bounded timeout, reads its data and
/// hands the result to a callback: `Some(value)` on success, `None` on
/// timeout or failure. Errors never cross the worker boundary. The job's
/// resources are released on every path before the callback runs.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::{engine_trace, engine_warn};

/// A pending GPU to CPU transfer
pub trait ReadbackJob: Send + 'static {
    type Output: Send + 'static;

    /// Wait up to `timeout` for the GPU copy. Returns false on timeout.
    fn wait(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the copied data (only called after a successful wait)
    fn read(&mut self) -> Result<Self::Output>;

    /// Destroy fence, buffer and command buffer
    fn release(&mut self);
}

/// Releases the job when dropped
struct ReleaseOnDrop<J: ReadbackJob>(J);

impl<J: ReadbackJob> Drop for ReleaseOnDrop<J> {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Decrements the pending count when the task ends, even by panic
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Bounded pool of readback workers
pub struct ReadbackScheduler {
    pool: rayon::ThreadPool,
    timeout: Duration,
    pending: Arc<Pending>,
}

impl ReadbackScheduler {
    /// Create `config.readback_workers` worker threads
    pub fn new(config: &Config) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.readback_workers.max(1))
            .thread_name(|i| format!("framegraph-readback-{}", i))
            .build()
            .map_err(|e| Error::InitializationFailed(format!("readback worker pool: {}", e)))?;
        Ok(Self {
            pool,
            timeout: config.readback_timeout,
            pending: Arc::new(Pending::default()),
        })
    }

    /// Run `job` in the background and pass its result to `callback`
    pub fn submit<J, F>(&self, job: J, callback: F)
    where
        J: ReadbackJob,
        F: FnOnce(Option<J::Output>) + Send + 'static,
    {
        self.pending.increment();
        let pending = PendingGuard(self.pending.clone());
        let timeout = self.timeout;
        self.pool.spawn(move || {
            let _pending = pending;
            let value = {
                let mut job = ReleaseOnDrop(job);
                complete(&mut job.0, timeout)
            };
            callback(value);
        });
    }

    /// Readbacks submitted but not finished
    pub fn pending_count(&self) -> usize {
        *self.pending.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every readback finished or `timeout` elapsed
    ///
    /// Returns true if nothing is pending anymore.
    pub fn wait_for_pending(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                engine_warn!(
                    "framegraph::ReadbackScheduler",
                    "{} readbacks still pending after {:?}",
                    *count, timeout
                );
                return false;
            }
            count = match self.pending.idle.wait_timeout(count, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

fn complete<J: ReadbackJob>(job: &mut J, timeout: Duration) -> Option<J::Output> {
    match job.wait(timeout) {
        Ok(true) => match job.read() {
            Ok(value) => {
                engine_trace!("framegraph::ReadbackScheduler", "Readback completed");
                Some(value)
            }
            Err(e) => {
                engine_warn!("framegraph::ReadbackScheduler", "Readback read failed: {}", e);
                None
            }
        },
        Ok(false) => {
            engine_warn!("framegraph::ReadbackScheduler", "Readback timed out after {:?}", timeout);
            None
        }
        Err(e) => {
            engine_warn!("framegraph::ReadbackScheduler", "Readback wait failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
