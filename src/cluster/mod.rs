//! Cluster collaborator
//!
//! The benchmark never manages Spark or HDFS itself. It talks to the
//! cluster through [`Cluster`], which exposes the three operations a scaling
//! run needs: restart, timed data load and timed query.
//!
//! [`CommandCluster`] implements the trait by shelling out to
//! operator-supplied commands; tests use scripted fakes.

mod command;

pub use command::CommandCluster;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::state::Checkpoint;
use crate::Result;

/// Operations provided by the cluster under test.
pub trait Cluster {
    /// Restart servers and the Spark context with the given sizing.
    ///
    /// Failures are reported as [`crate::Error::ClusterManagement`].
    fn restart_cluster(&mut self, memory_per_worker: &str, cores: u32) -> Result<()>;

    /// Load the dataset and return the timestamped checkpoints of the load.
    fn timed_data_load(&mut self) -> Result<Vec<Checkpoint>>;

    /// Run `query` over `[start, end]` and return its checkpoints.
    ///
    /// The server reports three phases (submit, cache, execute).
    fn timed_query(
        &mut self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        cache: bool,
        throughput: u64,
    ) -> Result<Vec<Checkpoint>>;
}

impl<C: Cluster + ?Sized> Cluster for &mut C {
    fn restart_cluster(&mut self, memory_per_worker: &str, cores: u32) -> Result<()> {
        (**self).restart_cluster(memory_per_worker, cores)
    }

    fn timed_data_load(&mut self) -> Result<Vec<Checkpoint>> {
        (**self).timed_data_load()
    }

    fn timed_query(
        &mut self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        cache: bool,
        throughput: u64,
    ) -> Result<Vec<Checkpoint>> {
        (**self).timed_query(query, start, end, cache, throughput)
    }
}

/// How often blocking waits look at the [`CancelToken`].
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cooperative cancellation flag shared between the signal handler and the
/// code issuing blocking calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return [`crate::Error::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Fails once [`CancelToken::cancel`] has been called on any clone.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early if cancellation is requested.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if the token fires before or
    /// during the wait.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(POLL_INTERVAL));
        }
    }
}
