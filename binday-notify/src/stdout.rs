//! Writes the summary line to standard output.

use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;

use binday_core::{
    model::DueSet,
    ports::{DispatchError, Notifier},
};

/// Prints the summary, one line per notification.
pub struct StdoutNotifier<W = io::Stdout> {
    out: Mutex<W>,
}

impl StdoutNotifier {
    /// Notifier bound to the process's standard output.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> StdoutNotifier<W> {
    /// Notifier writing to an arbitrary sink.
    #[must_use]
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Give back the sink, e.g. to inspect captured output.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Output`] if a writer panicked while holding the sink.
    pub fn into_inner(self) -> Result<W, DispatchError> {
        self.out
            .into_inner()
            .map_err(|err| DispatchError::Output(err.to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> Notifier for StdoutNotifier<W> {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn notify(&self, _due: &DueSet, summary: &str) -> Result<(), DispatchError> {
        let mut out = self
            .out
            .lock()
            .map_err(|err| DispatchError::Output(err.to_string()))?;
        writeln!(out, "{summary}")
            .and_then(|()| out.flush())
            .map_err(|err| DispatchError::Output(err.to_string()))
    }
}
