//! Operator interaction
//!
//! Before collecting for a cluster size, the operator has to bring the right
//! number of Spark and HDFS nodes up by hand. [`Operator`] is the pause point.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use crate::cluster::{CancelToken, POLL_INTERVAL};
use crate::{Error, Result};

/// Blocks until the operator confirms the cluster is ready.
pub trait Operator {
    /// Wait for confirmation that `nodes` Spark and HDFS nodes are running.
    fn confirm_nodes(&mut self, nodes: u32) -> Result<()>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn confirm_nodes(&mut self, nodes: u32) -> Result<()> {
        (**self).confirm_nodes(nodes)
    }
}

/// Prompts on stdout and waits for a line on stdin.
///
/// The line is read on a helper thread so the wait ends as soon as the
/// [`CancelToken`] fires.
#[derive(Debug, Default, Clone)]
pub struct ConsoleOperator {
    cancel: CancelToken,
}

impl ConsoleOperator {
    /// Create a console operator that gives up when `cancel` fires.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Operator for ConsoleOperator {
    fn confirm_nodes(&mut self, nodes: u32) -> Result<()> {
        self.cancel.check()?;
        let mut out = std::io::stdout().lock();
        write!(
            out,
            "Please ensure {nodes} Spark and HDFS nodes are running and press enter to continue."
        )?;
        out.flush()?;
        drop(out);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let _ = tx.send(std::io::stdin().lock().read_line(&mut line));
        });
        await_line(&rx, &self.cancel)
    }
}

/// Wait for the reader thread to report a line, polling `cancel`.
///
/// EOF or a vanished reader counts as cancellation: nobody is there to
/// confirm.
fn await_line(rx: &Receiver<std::io::Result<usize>>, cancel: &CancelToken) -> Result<()> {
    loop {
        cancel.check()?;
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(0)) | Err(RecvTimeoutError::Disconnected) => return Err(Error::Cancelled),
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => return Err(e.into()),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Confirms immediately. Used with `--yes` and in tests.
#[derive(Debug, Default, Clone)]
pub struct AutoConfirm {
    prompts: Vec<u32>,
}

impl AutoConfirm {
    /// Create an operator that always confirms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Node counts that were asked for, in order.
    #[must_use]
    pub fn prompts(&self) -> &[u32] {
        &self.prompts
    }
}

impl Operator for AutoConfirm {
    fn confirm_nodes(&mut self, nodes: u32) -> Result<()> {
        tracing::info!(nodes, "assuming cluster is ready");
        self.prompts.push(nodes);
        Ok(())
    }
}
