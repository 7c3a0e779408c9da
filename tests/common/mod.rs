//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use chrono::NaiveDate;
use spark_scaling_bench::cluster::{CancelToken, Cluster};
use spark_scaling_bench::config::ExperimentConfig;
use spark_scaling_bench::state::Checkpoint;
use spark_scaling_bench::{Error, Result};

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Restart { memory: String, cores: u32 },
    Load,
    Query { query: String, cache: bool },
}

/// Cluster fake that hands out scripted durations and injects failures.
///
/// Call numbers are 1-based and counted per operation kind.
#[derive(Debug, Default)]
pub struct ScriptedCluster {
    pub load_times: VecDeque<u64>,
    pub query_times: VecDeque<u64>,
    pub fail_restarts: usize,
    pub fail_loads: Vec<usize>,
    pub fail_queries: Vec<usize>,
    pub cancel_on_query: Option<usize>,
    /// Fired when a restart fails, as if the operator hit ^C right after.
    pub cancel_on_restart_failure: Option<CancelToken>,
    pub calls: Vec<Call>,
    loads: usize,
    queries: usize,
}

impl ScriptedCluster {
    pub fn new(load_times: &[u64], query_times: &[u64]) -> Self {
        Self {
            load_times: load_times.iter().copied().collect(),
            query_times: query_times.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn loads(&self) -> usize {
        self.count(|c| matches!(c, Call::Load))
    }

    pub fn queries(&self) -> usize {
        self.count(|c| matches!(c, Call::Query { .. }))
    }

    pub fn restarts(&self) -> usize {
        self.count(|c| matches!(c, Call::Restart { .. }))
    }
}

impl Cluster for ScriptedCluster {
    fn restart_cluster(&mut self, memory_per_worker: &str, cores: u32) -> Result<()> {
        self.calls.push(Call::Restart {
            memory: memory_per_worker.to_string(),
            cores,
        });
        if self.fail_restarts > 0 {
            self.fail_restarts -= 1;
            if let Some(cancel) = &self.cancel_on_restart_failure {
                cancel.cancel();
            }
            return Err(Error::ClusterManagement("spark context refused".into()));
        }
        Ok(())
    }

    fn timed_data_load(&mut self) -> Result<Vec<Checkpoint>> {
        self.calls.push(Call::Load);
        self.loads += 1;
        if self.fail_loads.contains(&self.loads) {
            return Err(Error::TimedOperation(format!("load #{} failed", self.loads)));
        }
        let d = self.load_times.pop_front().unwrap_or(100);
        let d = i64::try_from(d).unwrap();
        Ok(vec![Checkpoint::new(1_000), Checkpoint::new(1_000 + d)])
    }

    fn timed_query(
        &mut self,
        query: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        cache: bool,
        _throughput: u64,
    ) -> Result<Vec<Checkpoint>> {
        self.calls.push(Call::Query {
            query: query.to_string(),
            cache,
        });
        self.queries += 1;
        if self.cancel_on_query == Some(self.queries) {
            return Err(Error::Cancelled);
        }
        if self.fail_queries.contains(&self.queries) {
            return Err(Error::TimedOperation(format!("query #{} failed", self.queries)));
        }
        let d = self.query_times.pop_front().unwrap_or(100);
        let d = i64::try_from(d).unwrap();
        Ok(vec![
            Checkpoint::new(0),
            Checkpoint::new(d / 2),
            Checkpoint::new(d),
        ])
    }
}

pub fn config(nodes: &[u32], queries: &[&str], times_to_run: usize) -> ExperimentConfig {
    ExperimentConfig {
        nodes: nodes.to_vec(),
        queries: queries.iter().map(ToString::to_string).collect(),
        times_to_run,
        ..ExperimentConfig::default()
    }
}
