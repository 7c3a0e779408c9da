//! Shell-out cluster driver.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{CancelToken, Cluster, POLL_INTERVAL};
use crate::config::ClusterCommands;
use crate::state::Checkpoint;
use crate::{Error, Result};

/// [`Cluster`] that runs operator-configured commands through `sh -c`.
///
/// Timed commands must print a JSON array of checkpoints
/// (`[{"TimeMillis": ...}, ...]`) on stdout. A running child is killed when
/// the [`CancelToken`] fires.
#[derive(Debug, Clone)]
pub struct CommandCluster {
    restart: String,
    data_load: String,
    query: String,
    cancel: CancelToken,
}

impl CommandCluster {
    /// Build from the `cluster:` section of the experiment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any of the three commands is missing.
    pub fn from_commands(commands: &ClusterCommands, cancel: CancelToken) -> Result<Self> {
        let require = |value: &Option<String>, key: &str| {
            value
                .clone()
                .ok_or_else(|| Error::InvalidConfig(format!("cluster.{key} command not set")))
        };
        Ok(Self {
            restart: require(&commands.restart, "restart")?,
            data_load: require(&commands.data_load, "data_load")?,
            query: require(&commands.query, "query")?,
            cancel,
        })
    }

    fn run(&self, command: &str) -> std::result::Result<String, String> {
        self.cancel.check().map_err(|e| e.to_string())?;
        debug!(command, "spawning");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn `{command}`: {e}"))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = loop {
            if let Some(status) = child.try_wait().map_err(|e| e.to_string())? {
                break status;
            }
            if self.cancel.is_cancelled() {
                kill(&mut child);
                return Err(CANCELLED.to_string());
            }
            thread::sleep(POLL_INTERVAL);
        };
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if status.success() {
            Ok(stdout)
        } else {
            Err(format!("`{command}` exited with {status}: {}", stderr.trim()))
        }
    }

    fn run_timed(&self, command: &str) -> Result<Vec<Checkpoint>> {
        let stdout = self.run(command).map_err(|e| self.classify(e, Error::TimedOperation))?;
        serde_json::from_str(stdout.trim()).map_err(|e| {
            Error::TimedOperation(format!("`{command}` did not print checkpoints: {e}"))
        })
    }

    fn classify(&self, message: String, kind: fn(String) -> Error) -> Error {
        if self.cancel.is_cancelled() {
            Error::Cancelled
        } else {
            kind(message)
        }
    }
}

const CANCELLED: &str = "cancelled";

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn substitute(template: &str, pairs: &[(&str, String)]) -> String {
    pairs.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

impl Cluster for CommandCluster {
    fn restart_cluster(&mut self, memory_per_worker: &str, cores: u32) -> Result<()> {
        let command = substitute(
            &self.restart,
            &[("memory", memory_per_worker.to_string()), ("cores", cores.to_string())],
        );
        info!(memory_per_worker, cores, "restarting cluster");
        self.run(&command)
            .map(drop)
            .map_err(|e| self.classify(e, Error::ClusterManagement))
    }

    fn timed_data_load(&mut self) -> Result<Vec<Checkpoint>> {
        let command = self.data_load.clone();
        self.run_timed(&command)
    }

    fn timed_query(
        &mut self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        cache: bool,
        throughput: u64,
    ) -> Result<Vec<Checkpoint>> {
        let command = substitute(
            &self.query,
            &[
                ("query", query.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("cache", cache.to_string()),
                ("throughput", throughput.to_string()),
            ],
        );
        self.run_timed(&command)
    }
}
