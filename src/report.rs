//! Scaling report
//!
//! Summarizes collected samples per cluster size: data load mean/stdev, and
//! per query execution mean/stdev plus the execution time normalized to the
//! smallest cluster. The execution table is emitted as LaTeX rows.

use std::fmt;

use serde::Serialize;

use crate::state::ExperimentState;
use crate::{Error, Result};

/// Mean and sample standard deviation of a sample sequence, in ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 with fewer than two samples.
    pub stdev: f64,
    /// Number of samples.
    pub samples: usize,
}

impl Summary {
    /// Summarize `samples`, or `None` if there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        let stdev = if samples.len() < 2 {
            0.0
        } else {
            let var = samples
                .iter()
                .map(|&s| (s as f64 - mean).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            var.sqrt()
        };
        Some(Self {
            mean,
            stdev,
            samples: samples.len(),
        })
    }
}

/// Data load statistics for one cluster size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataLoadRow {
    /// Cluster size.
    pub nodes: u32,
    /// Load time statistics.
    pub summary: Summary,
}

/// Execution statistics for one query across cluster sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow {
    /// Short name (`Q0`, `Q1`, ...).
    pub name: String,
    /// Full query identifier.
    pub query: String,
    /// One summary per cluster size, in ascending node order.
    pub cells: Vec<Summary>,
    /// Mean divided by the mean at the smallest cluster size.
    pub normalized: Vec<f64>,
    /// Stdev divided by the mean at the smallest cluster size.
    pub normalized_err: Vec<f64>,
}

/// Report over every cluster size present in the state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingReport {
    /// Cluster sizes, ascending.
    pub nodes: Vec<u32>,
    /// Data load rows, ascending by cluster size.
    pub data_load: Vec<DataLoadRow>,
    /// Execution rows, in configured query order.
    pub queries: Vec<QueryRow>,
}

impl ScalingReport {
    /// Build the report for `queries` from `state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSamples`] if the state is empty, or a cluster
    /// size lacks data load samples or samples for any of `queries`.
    pub fn build(state: &ExperimentState, queries: &[String]) -> Result<Self> {
        let nodes: Vec<u32> = state.node_counts().collect();
        if nodes.is_empty() {
            return Err(Error::MissingSamples("no cluster sizes recorded".into()));
        }

        let mut data_load = Vec::with_capacity(nodes.len());
        for (n, set) in state.iter() {
            let summary = Summary::of(set.data_load())
                .ok_or_else(|| Error::MissingSamples(format!("data load for {n} nodes")))?;
            data_load.push(DataLoadRow { nodes: n, summary });
        }

        let mut rows = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            let mut cells = Vec::with_capacity(nodes.len());
            for &n in &nodes {
                let samples = state.get(n).map(|set| set.execution(query)).unwrap_or_default();
                let summary = Summary::of(samples).ok_or_else(|| {
                    Error::MissingSamples(format!("query {query} on {n} nodes"))
                })?;
                cells.push(summary);
            }
            let base = cells.first().map_or(0.0, |c| c.mean);
            let scale = |v: f64| if base > 0.0 { v / base } else { 0.0 };
            rows.push(QueryRow {
                name: format!("Q{i}"),
                query: query.clone(),
                normalized: cells.iter().map(|c| scale(c.mean)).collect(),
                normalized_err: cells.iter().map(|c| scale(c.stdev)).collect(),
                cells,
            });
        }

        Ok(Self {
            nodes,
            data_load,
            queries: rows,
        })
    }

    /// LaTeX table of execution times in seconds: one header row of node
    /// counts, then `name & mean & stdev & ...` per query.
    #[must_use]
    pub fn execution_table(&self) -> String {
        let header: Vec<String> = self.nodes.iter().map(ToString::to_string).collect();
        let mut out = format!("{} \\\\ \\hline\n", header.join(" & "));
        for row in &self.queries {
            let mut cols = vec![row.name.clone()];
            for cell in &row.cells {
                cols.push(seconds(cell.mean));
                cols.push(seconds(cell.stdev));
            }
            out.push_str(&cols.join(" & "));
            out.push_str(" \\\\\n");
        }
        out
    }

    fn normalized_table(&self) -> String {
        let mut out = String::new();
        for row in &self.queries {
            let cols: Vec<String> = row
                .normalized
                .iter()
                .zip(&row.normalized_err)
                .map(|(v, e)| format!("{v:.2}±{e:.2}"))
                .collect();
            out.push_str(&format!("{:<4} {}\n", row.name, cols.join("  ")));
        }
        out
    }
}

fn seconds(millis: f64) -> String {
    format!("{:.2}", millis / 1000.0)
}

impl fmt::Display for ScalingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loading Data (ms)")?;
        for row in &self.data_load {
            writeln!(
                f,
                "  {:>3} workers: {:.0} ± {:.0} (n={})",
                row.nodes, row.summary.mean, row.summary.stdev, row.summary.samples
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Execution Time (s)")?;
        write!(f, "{}", self.execution_table())?;
        writeln!(f)?;
        if let Some(base) = self.nodes.first() {
            writeln!(f, "Normalized Execution Time ({base} workers = 1)")?;
            write!(f, "{}", self.normalized_table())?;
        }
        Ok(())
    }
}
