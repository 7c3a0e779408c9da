//! Experiment state - the samples collected so far, keyed by cluster size
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentState (nodes) ──> SampleSet
//!                               ├── dataLoad:  [ms, ms, ...]
//!                               └── execution: { query: [ms, ms, ...] }
//! ```
//!
//! The serialized form keeps the key names of the existing `scaling.yaml`
//! files so that older runs can be resumed and reported on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Samples collected for a single cluster-size configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSet {
    #[serde(rename = "dataLoad", default)]
    data_load: Vec<u64>,
    #[serde(default)]
    execution: BTreeMap<String, Vec<u64>>,
}

impl SampleSet {
    /// Create an empty sample set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Data load durations in milliseconds, in collection order.
    #[must_use]
    pub fn data_load(&self) -> &[u64] {
        &self.data_load
    }

    /// Execution durations for `query`, in collection order.
    ///
    /// Returns an empty slice for a query that was never profiled.
    #[must_use]
    pub fn execution(&self, query: &str) -> &[u64] {
        self.execution
            .get(query)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Queries with at least an (possibly empty) entry in this set.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.execution.keys().map(String::as_str)
    }

    /// Append a data load sample.
    pub fn push_data_load(&mut self, millis: u64) {
        self.data_load.push(millis);
    }

    /// Append an execution sample for `query`.
    pub fn push_execution(&mut self, query: &str, millis: u64) {
        self.execution
            .entry(query.to_string())
            .or_default()
            .push(millis);
    }

    /// Make sure `query` has an entry, even before its first sample.
    pub fn touch_query(&mut self, query: &str) {
        self.execution.entry(query.to_string()).or_default();
    }
}

/// All samples of a scaling experiment, keyed by number of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentState {
    configurations: BTreeMap<u32, SampleSet>,
}

impl ExperimentState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no configuration has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Number of recorded configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Get the samples for `nodes`, if any were recorded.
    #[must_use]
    pub fn get(&self, nodes: u32) -> Option<&SampleSet> {
        self.configurations.get(&nodes)
    }

    /// Get the samples for `nodes`, creating an empty set on first use.
    pub fn entry(&mut self, nodes: u32) -> &mut SampleSet {
        self.configurations.entry(nodes).or_default()
    }

    /// Recorded node counts in ascending order.
    pub fn node_counts(&self) -> impl Iterator<Item = u32> + '_ {
        self.configurations.keys().copied()
    }

    /// Configurations in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &SampleSet)> {
        self.configurations.iter().map(|(&nodes, set)| (nodes, set))
    }

    /// Number of data load samples stored for `nodes`.
    #[must_use]
    pub fn data_load_count(&self, nodes: u32) -> usize {
        self.get(nodes).map_or(0, |set| set.data_load().len())
    }

    /// Number of execution samples stored for (`nodes`, `query`).
    #[must_use]
    pub fn execution_count(&self, nodes: u32, query: &str) -> usize {
        self.get(nodes).map_or(0, |set| set.execution(query).len())
    }
}

/// A timestamped marker returned by a timed cluster operation.
///
/// Only `TimeMillis` is interpreted; any other fields the server attaches
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "TimeMillis")]
    time_millis: i64,
}

impl Checkpoint {
    /// Create a checkpoint at `time_millis`.
    #[must_use]
    pub const fn new(time_millis: i64) -> Self {
        Self { time_millis }
    }

    /// Timestamp in milliseconds.
    #[must_use]
    pub const fn time_millis(&self) -> i64 {
        self.time_millis
    }
}

/// Elapsed milliseconds between `checkpoints[start]` and `checkpoints[end]`.
///
/// # Errors
///
/// Returns [`Error::TimedOperation`] if either index is out of range or the
/// end checkpoint precedes the start checkpoint.
pub fn elapsed_between(checkpoints: &[Checkpoint], start: usize, end: usize) -> Result<u64> {
    let (Some(first), Some(last)) = (checkpoints.get(start), checkpoints.get(end)) else {
        return Err(Error::TimedOperation(format!(
            "expected at least {} checkpoints, got {}",
            start.max(end) + 1,
            checkpoints.len()
        )));
    };
    last.time_millis
        .checked_sub(first.time_millis)
        .and_then(|elapsed| u64::try_from(elapsed).ok())
        .ok_or_else(|| {
            Error::TimedOperation(format!(
                "checkpoint {end} ({}) precedes checkpoint {start} ({})",
                last.time_millis, first.time_millis
            ))
        })
}

/// Data load duration: last checkpoint minus first checkpoint.
///
/// # Errors
///
/// Returns [`Error::TimedOperation`] for an empty or non-monotonic sequence.
pub fn data_load_elapsed(checkpoints: &[Checkpoint]) -> Result<u64> {
    elapsed_between(checkpoints, 0, checkpoints.len().saturating_sub(1))
}

/// Query duration: third checkpoint (execute) minus first (submit).
///
/// # Errors
///
/// Returns [`Error::TimedOperation`] if fewer than three checkpoints came back.
pub fn query_elapsed(checkpoints: &[Checkpoint]) -> Result<u64> {
    elapsed_between(checkpoints, 0, 2)
}
