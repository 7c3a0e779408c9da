//! Experiment configuration
//!
//! Defaults reproduce the reference scaling run: 6 down to 3 workers, four
//! samples per measurement, 21g executors, cached queries at 1.5M tuples/s.
//! A YAML file may override any subset of keys.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Queries of the reference workload, in reporting order (`Q0`..`Q7`).
pub const DEFAULT_QUERIES: [&str; 8] = [
    "Pageviews",
    "Revenue",
    "RevenueFromTopReferringDomains",
    "RevenueFromTopReferringDomainsFirstVisitGoogle",
    "TopPages",
    "TopPagesByBrowser",
    "TopPagesByPreviousTopPages",
    "TopReferringDomains",
];

/// Shell commands used by [`crate::cluster::CommandCluster`].
///
/// Placeholders in braces are substituted before each invocation; see the
/// field docs for which ones apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterCommands {
    /// Restart servers and the Spark context. `{memory}`, `{cores}`.
    pub restart: Option<String>,
    /// Load the dataset, printing a JSON checkpoint array on stdout.
    pub data_load: Option<String>,
    /// Run one query, printing a JSON checkpoint array on stdout.
    /// `{query}`, `{start}`, `{end}`, `{cache}`, `{throughput}`.
    pub query: Option<String>,
}

/// Parameters of a scaling experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Cluster sizes to measure, in the order they are visited.
    pub nodes: Vec<u32>,
    /// Query identifiers, in the order they are run and reported.
    pub queries: Vec<String>,
    /// Target sample count per measurement.
    pub times_to_run: usize,
    /// Executor memory passed to the Spark context (e.g. `21g`).
    pub memory_per_worker: String,
    /// Cores contributed by each worker node.
    pub cores_per_node: u32,
    /// Cores held back from the total for the driver.
    pub reserved_cores: u32,
    /// Run a discarded warm-up query before timing, so data is cached.
    pub cache: bool,
    /// Tuples per second, passed through to the query operation.
    pub throughput: u64,
    /// First day of the queried date range.
    pub start_date: NaiveDate,
    /// Last day of the queried date range.
    pub end_date: NaiveDate,
    /// Seconds to wait after a failed attempt before retrying.
    pub retry_delay_secs: u64,
    /// Commands for the shell-out cluster driver.
    pub cluster: ClusterCommands,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            nodes: vec![6, 5, 4, 3],
            queries: DEFAULT_QUERIES.iter().map(ToString::to_string).collect(),
            times_to_run: 4,
            memory_per_worker: "21g".to_string(),
            cores_per_node: 24,
            reserved_cores: 1,
            cache: true,
            throughput: 1_500_000,
            start_date: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2014, 1, 7).unwrap_or_default(),
            retry_delay_secs: 0,
            cluster: ClusterCommands::default(),
        }
    }
}

impl ExperimentConfig {
    /// Read a (possibly partial) configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, doesn't parse, or fails
    /// [`ExperimentConfig::validate`].
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidConfig("no cluster sizes configured".into()));
        }
        let mut seen = HashSet::new();
        for &nodes in &self.nodes {
            if nodes == 0 {
                return Err(Error::InvalidConfig("cluster size must be positive".into()));
            }
            if !seen.insert(nodes) {
                return Err(Error::InvalidConfig(format!("duplicate cluster size {nodes}")));
            }
            self.cores(nodes)?;
        }
        if self.queries.is_empty() {
            return Err(Error::InvalidConfig("no queries configured".into()));
        }
        let mut seen = HashSet::new();
        for query in &self.queries {
            if !seen.insert(query.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate query {query}")));
            }
        }
        if self.times_to_run == 0 {
            return Err(Error::InvalidConfig("times_to_run must be positive".into()));
        }
        if self.end_date < self.start_date {
            return Err(Error::InvalidConfig(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }

    /// Total Spark cores for a cluster of `nodes` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the reserve exceeds the total or
    /// the product overflows.
    pub fn cores(&self, nodes: u32) -> Result<u32> {
        nodes
            .checked_mul(self.cores_per_node)
            .and_then(|total| total.checked_sub(self.reserved_cores))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "cannot reserve {} cores out of {nodes} x {}",
                    self.reserved_cores, self.cores_per_node
                ))
            })
    }

    /// Short report names for the configured queries: `Q0`, `Q1`, ...
    #[must_use]
    pub fn short_names(&self) -> Vec<String> {
        (0..self.queries.len()).map(|i| format!("Q{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.nodes, vec![6, 5, 4, 3]);
        assert_eq!(config.queries.len(), 8);
        assert_eq!(config.cores(6).unwrap(), 143);
        assert_eq!(config.cores(3).unwrap(), 71);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ExperimentConfig =
            serde_yaml::from_str("nodes: [3]\nqueries: [Q0]\ntimes_to_run: 2\n").unwrap();
        assert_eq!(config.nodes, vec![3]);
        assert_eq!(config.times_to_run, 2);
        assert_eq!(config.memory_per_worker, "21g");
        assert!(config.cache);
        assert_eq!(config.start_date.to_string(), "2014-01-01");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ExperimentConfig {
            nodes: vec![3, 3],
            ..ExperimentConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.nodes = vec![0];
        assert!(config.validate().is_err());

        config.nodes = vec![3];
        config.times_to_run = 0;
        assert!(config.validate().is_err());

        config.times_to_run = 1;
        config.queries = vec!["A".into(), "A".into()];
        assert!(config.validate().is_err());

        config.queries = vec!["A".into()];
        config.end_date = NaiveDate::from_ymd_opt(2013, 12, 31).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_core_reserve_underflow() {
        let config = ExperimentConfig {
            cores_per_node: 1,
            reserved_cores: 5,
            ..ExperimentConfig::default()
        };
        assert!(config.cores(3).is_err());
    }

    #[test]
    fn test_short_names() {
        let config = ExperimentConfig::default();
        assert_eq!(config.short_names()[0], "Q0");
        assert_eq!(config.short_names()[7], "Q7");
    }
}
