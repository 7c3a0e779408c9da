//! Sampling checkpoint tracker
//!
//! Drives every configured cluster size through
//!
//! ```text
//! Pending ──> Loading ──> Executing ──> Done
//!    ^           │            │
//!    └── failure leaves the phase unchanged, samples are kept
//! ```
//!
//! The phase is always derived from the sample counts in
//! [`ExperimentState`], so a resumed run picks up exactly where the last
//! persisted sample left it. Every appended sample is saved immediately; a
//! sample whose save failed is saved again before any further cluster work.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cluster::{CancelToken, Cluster};
use crate::config::ExperimentConfig;
use crate::operator::Operator;
use crate::state::{data_load_elapsed, query_elapsed, ExperimentState};
use crate::store::StateStore;
use crate::Result;

/// Collection phase of one cluster-size configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing collected yet.
    Pending,
    /// Data load samples below target.
    Loading,
    /// Data load done, at least one query below target.
    Executing,
    /// All targets met.
    Done,
}

/// Collects timing samples for each configured cluster size until the
/// target count is reached, retrying failed attempts until cancelled.
pub struct Tracker<C, S, O> {
    config: ExperimentConfig,
    cluster: C,
    store: S,
    operator: O,
    cancel: CancelToken,
    /// A sample was appended but its save failed.
    dirty: bool,
}

impl<C: Cluster, S: StateStore, O: Operator> Tracker<C, S, O> {
    /// Create a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` doesn't validate.
    pub fn new(config: ExperimentConfig, cluster: C, store: S, operator: O) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cluster,
            store,
            operator,
            cancel: CancelToken::new(),
            dirty: false,
        })
    }

    /// Use `cancel` to stop between external calls.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The experiment configuration.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The cluster collaborator.
    #[must_use]
    pub const fn cluster(&self) -> &C {
        &self.cluster
    }

    /// The state store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The operator.
    #[must_use]
    pub const fn operator(&self) -> &O {
        &self.operator
    }

    /// Whether `nodes` has reached the target for data load and every query.
    #[must_use]
    pub fn is_complete(&self, state: &ExperimentState, nodes: u32) -> bool {
        let target = self.config.times_to_run;
        state.data_load_count(nodes) >= target
            && self
                .config
                .queries
                .iter()
                .all(|query| state.execution_count(nodes, query) >= target)
    }

    /// Current phase of `nodes`, derived from the stored sample counts.
    #[must_use]
    pub fn phase(&self, state: &ExperimentState, nodes: u32) -> Phase {
        if self.is_complete(state, nodes) {
            return Phase::Done;
        }
        let loaded = state.data_load_count(nodes);
        if loaded >= self.config.times_to_run {
            Phase::Executing
        } else if loaded == 0 && state.get(nodes).map_or(true, |set| set.queries().next().is_none())
        {
            Phase::Pending
        } else {
            Phase::Loading
        }
    }

    /// Collect data load samples for `nodes` until there are `target` of them.
    ///
    /// Each sample is persisted as soon as it is appended. Existing samples
    /// are never touched.
    ///
    /// # Errors
    ///
    /// Propagates the first cluster, checkpoint or storage error.
    pub fn ensure_data_load_samples(
        &mut self,
        state: &mut ExperimentState,
        nodes: u32,
        target: usize,
    ) -> Result<()> {
        while state.data_load_count(nodes) < target {
            self.cancel.check()?;
            let checkpoints = self.cluster.timed_data_load()?;
            let elapsed = data_load_elapsed(&checkpoints)?;
            state.entry(nodes).push_data_load(elapsed);
            self.dirty = true;
            self.persist(state)?;
            debug!(
                nodes,
                sample = state.data_load_count(nodes),
                target,
                elapsed_ms = elapsed,
                "data load sample"
            );
        }
        Ok(())
    }

    /// Collect execution samples of `query` on `nodes` until there are
    /// `target` of them.
    ///
    /// With `cache` set, one warm-up run is issued and discarded before the
    /// timed runs. A query that already has `target` samples is skipped
    /// without any external call.
    ///
    /// # Errors
    ///
    /// Propagates the first cluster, checkpoint or storage error.
    pub fn ensure_execution_samples(
        &mut self,
        state: &mut ExperimentState,
        nodes: u32,
        query: &str,
        target: usize,
        cache: bool,
    ) -> Result<()> {
        if state.execution_count(nodes, query) >= target {
            info!(nodes, query, "already profiled, skipping");
            return Ok(());
        }
        state.entry(nodes).touch_query(query);

        let (start, end, throughput) = (
            self.config.start_date,
            self.config.end_date,
            self.config.throughput,
        );
        if cache {
            self.cancel.check()?;
            self.cluster
                .timed_query(query, start, end, cache, throughput)?;
            debug!(nodes, query, "warm-up run done");
        }
        while state.execution_count(nodes, query) < target {
            self.cancel.check()?;
            let checkpoints = self
                .cluster
                .timed_query(query, start, end, cache, throughput)?;
            let elapsed = query_elapsed(&checkpoints)?;
            state.entry(nodes).push_execution(query, elapsed);
            self.dirty = true;
            self.persist(state)?;
            debug!(
                nodes,
                query,
                sample = state.execution_count(nodes, query),
                target,
                elapsed_ms = elapsed,
                "execution sample"
            );
        }
        Ok(())
    }

    /// Bring `nodes` to [`Phase::Done`], retrying failed attempts.
    ///
    /// Asks the operator for confirmation once if any work remains. Returns
    /// the number of attempts made, 0 if the configuration was already done.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] on user cancellation, or any other
    /// non-retryable error. Retryable errors are logged and never returned.
    pub fn run_configuration(&mut self, state: &mut ExperimentState, nodes: u32) -> Result<usize> {
        state.entry(nodes);
        let done = self.phase(state, nodes) == Phase::Done;
        if done && !self.dirty {
            info!(nodes, "all samples present");
            return Ok(0);
        }
        if !done {
            self.operator.confirm_nodes(nodes)?;
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(state, nodes) {
                Ok(()) => {
                    info!(nodes, attempts, "configuration complete");
                    return Ok(attempts);
                }
                Err(e) if !e.is_retryable() => return Err(self.stop(state, nodes, e)),
                Err(e) => {
                    error!(
                        nodes,
                        attempt = attempts,
                        phase = ?self.phase(state, nodes),
                        error = %e,
                        detail = ?e,
                        "attempt failed, retrying"
                    );
                    let delay = Duration::from_secs(self.config.retry_delay_secs);
                    if let Err(e) = self.cancel.sleep(delay) {
                        return Err(self.stop(state, nodes, e));
                    }
                }
            }
        }
    }

    /// Run every configured cluster size in the configured order.
    ///
    /// # Errors
    ///
    /// See [`Tracker::run_configuration`].
    pub fn run(&mut self, state: &mut ExperimentState) -> Result<()> {
        info!(
            nodes = ?self.config.nodes,
            queries = self.config.queries.len(),
            times_to_run = self.config.times_to_run,
            "running scaling experiment"
        );
        for nodes in self.config.nodes.clone() {
            self.run_configuration(state, nodes)?;
        }
        Ok(())
    }

    /// Load state from the store, run everything, and return the final state.
    ///
    /// # Errors
    ///
    /// Returns load errors and anything [`Tracker::run`] returns.
    pub fn run_from_store(&mut self) -> Result<ExperimentState> {
        let mut state = self.store.load()?;
        self.run(&mut state)?;
        Ok(state)
    }

    fn persist(&mut self, state: &ExperimentState) -> Result<()> {
        self.store.save(state)?;
        self.dirty = false;
        Ok(())
    }

    /// Log a final error, saving a pending sample on the way out.
    fn stop(&mut self, state: &ExperimentState, nodes: u32, e: crate::Error) -> crate::Error {
        warn!(nodes, error = %e, "stopping");
        if self.dirty {
            if let Err(save) = self.persist(state) {
                warn!(nodes, error = %save, "last sample not saved");
            }
        }
        e
    }

    fn attempt(&mut self, state: &mut ExperimentState, nodes: u32) -> Result<()> {
        self.cancel.check()?;
        if self.dirty {
            self.persist(state)?;
        }
        if self.phase(state, nodes) == Phase::Done {
            return Ok(());
        }
        let cores = self.config.cores(nodes)?;
        self.cluster
            .restart_cluster(&self.config.memory_per_worker, cores)?;

        let target = self.config.times_to_run;
        loop {
            let phase = self.phase(state, nodes);
            debug!(nodes, ?phase, "phase");
            match phase {
                Phase::Pending | Phase::Loading => {
                    self.ensure_data_load_samples(state, nodes, target)?;
                }
                Phase::Executing => {
                    let cache = self.config.cache;
                    for query in self.config.queries.clone() {
                        self.ensure_execution_samples(state, nodes, &query, target, cache)?;
                    }
                }
                Phase::Done => return Ok(()),
            }
        }
    }
}
