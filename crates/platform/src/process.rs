//! Owning-process control.
//!
//! The connection tool lives for exactly one connection attempt. Any fatal
//! condition is escalated to the whole process: the failing component asks
//! the process captured at startup to shut down, and the top level (which
//! holds the [`TerminationListener`]) performs the actual exit.

use crate::{PlatformError, PlatformResult};
use tokio::sync::mpsc;
use tracing::warn;

/// A request to shut down the owning process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// Process the request is addressed to
    pub pid: u32,
    /// Human readable cause
    pub reason: String,
}

/// Handle for requesting termination of the process it was captured in.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    tx: mpsc::UnboundedSender<Termination>,
}

/// Receiving side of [`ProcessHandle::terminate`].
#[derive(Debug)]
pub struct TerminationListener {
    rx: mpsc::UnboundedReceiver<Termination>,
}

impl ProcessHandle {
    /// Captures the identity of the current process.
    pub fn capture() -> (Self, TerminationListener) {
        Self::for_pid(std::process::id())
    }

    /// Creates a handle addressed to an explicit process id.
    pub fn for_pid(pid: u32) -> (Self, TerminationListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { pid, tx }, TerminationListener { rx })
    }

    /// Process id this handle was captured for.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Asks the owning process to shut down.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ProcessGone`] if the listener was dropped.
    pub fn terminate(&self, reason: impl Into<String>) -> PlatformResult<()> {
        let reason = reason.into();
        warn!(pid = self.pid, reason = %reason, "Requesting process termination");

        self.tx
            .send(Termination {
                pid: self.pid,
                reason,
            })
            .map_err(|_| PlatformError::ProcessGone(self.pid))
    }
}

impl TerminationListener {
    /// Waits for the next termination request.
    ///
    /// Returns `None` once every [`ProcessHandle`] has been dropped.
    pub async fn wait(&mut self) -> Option<Termination> {
        self.rx.recv().await
    }

    /// Returns a pending termination request without waiting.
    pub fn try_recv(&mut self) -> Option<Termination> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminate_reaches_listener() {
        let (handle, mut listener) = ProcessHandle::for_pid(4711);

        handle.terminate("missing --host option").unwrap();

        let termination = listener.wait().await.unwrap();
        assert_eq!(termination.pid, 4711);
        assert_eq!(termination.reason, "missing --host option");
    }

    #[test]
    fn test_capture_uses_current_pid() {
        let (handle, _listener) = ProcessHandle::capture();
        assert_eq!(handle.pid(), std::process::id());
    }

    #[test]
    fn test_terminate_without_listener_fails() {
        let (handle, listener) = ProcessHandle::for_pid(1);
        drop(listener);

        assert!(matches!(
            handle.terminate("late"),
            Err(PlatformError::ProcessGone(1))
        ));
    }

    #[tokio::test]
    async fn test_listener_closes_when_handles_dropped() {
        let (handle, mut listener) = ProcessHandle::for_pid(2);
        let clone = handle.clone();
        drop(handle);
        assert!(listener.try_recv().is_none());

        drop(clone);
        assert!(listener.wait().await.is_none());
    }
}
