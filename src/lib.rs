//! # spark-scaling-bench: Spark/HDFS Scaling Benchmark Harness
//!
//! Measures how data load and query execution times of an external Spark/HDFS
//! cluster change as the number of worker nodes varies.
//!
//! ## Design Principles
//!
//! - **Resumable**: samples are persisted one at a time to `scaling.yaml`;
//!   an interrupted run continues from the last saved sample
//! - **Retry until done**: a failed attempt restarts the cluster and resumes
//!   the configuration; only the operator can stop it
//! - **Collaborators as traits**: the cluster ([`cluster::Cluster`]), state
//!   storage ([`store::StateStore`]) and the operator prompt
//!   ([`operator::Operator`]) are injected
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use spark_scaling_bench::cluster::{CancelToken, CommandCluster};
//! use spark_scaling_bench::config::ExperimentConfig;
//! use spark_scaling_bench::operator::ConsoleOperator;
//! use spark_scaling_bench::store::YamlFileStore;
//! use spark_scaling_bench::tracker::Tracker;
//!
//! let config = ExperimentConfig::from_yaml_file("scaling-config.yaml")?;
//! let cancel = CancelToken::new();
//! let cluster = CommandCluster::from_commands(&config.cluster, cancel.clone())?;
//! let store = YamlFileStore::in_data_dir(".");
//!
//! let operator = ConsoleOperator::new(cancel.clone());
//! let mut tracker = Tracker::new(config, cluster, store, operator)?
//!     .with_cancel_token(cancel);
//! let state = tracker.run_from_store()?;
//! println!("{} configurations measured", state.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod operator;
pub mod report;
pub mod state;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
