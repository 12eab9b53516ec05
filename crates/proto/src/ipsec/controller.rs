//! Daemon collaborators
//!
//! The connection core never negotiates anything itself. It hands the
//! assembled configuration to a [`Controller`] and asks a [`LocalSocket`]
//! which port IKE is bound to.

use super::{
    child_cfg::ChildConfig,
    config::PeerConfig,
    nat::{IKE_PORT, NAT_T_PORT},
    Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Receives progress messages while the controller works.
pub trait InitiateListener: Send + Sync {
    /// Called for each progress message; returning `false` cancels.
    fn on_progress(&self, level: u8, message: &str) -> bool;
}

/// Listener that ignores all progress and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl InitiateListener for NoopListener {
    fn on_progress(&self, _level: u8, _message: &str) -> bool {
        true
    }
}

/// Connection controller of the daemon
#[async_trait]
pub trait Controller: Send + Sync {
    /// Initiate an IKE SA for `peer` with the Child SA `child`.
    ///
    /// Ownership of both configurations passes to the controller. Resolves
    /// once the attempt reached a definite outcome, or `timeout` elapsed if
    /// one is given.
    async fn initiate(
        &self,
        peer: Arc<PeerConfig>,
        child: Arc<ChildConfig>,
        listener: &dyn InitiateListener,
        timeout: Option<Duration>,
    ) -> Result<()>;
}

/// Local IKE socket
pub trait LocalSocket: Send + Sync {
    /// Bound port; `nat_t` selects the NAT-T socket
    fn port(&self, nat_t: bool) -> u16;
}

/// Socket with fixed, already bound ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSocket {
    port: u16,
    nat_t_port: u16,
}

impl StaticSocket {
    /// Socket bound to `port`, with NAT-T on the standard NAT-T port
    pub fn new(port: u16) -> Self {
        StaticSocket {
            port,
            nat_t_port: NAT_T_PORT,
        }
    }
}

impl Default for StaticSocket {
    fn default() -> Self {
        StaticSocket::new(IKE_PORT)
    }
}

impl LocalSocket for StaticSocket {
    fn port(&self, nat_t: bool) -> u16 {
        if nat_t {
            self.nat_t_port
        } else {
            self.port
        }
    }
}

/// Daemon services needed to initiate a connection
#[derive(Clone)]
pub struct Daemon {
    /// Connection controller
    pub controller: Arc<dyn Controller>,
    /// Local IKE socket
    pub socket: Arc<dyn LocalSocket>,
}

impl Daemon {
    /// Bundle a controller and a socket
    pub fn new(controller: Arc<dyn Controller>, socket: Arc<dyn LocalSocket>) -> Self {
        Daemon { controller, socket }
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("port", &self.socket.port(false))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_socket_ports() {
        let socket = StaticSocket::default();
        assert_eq!(socket.port(false), 500);
        assert_eq!(socket.port(true), 4500);

        let socket = StaticSocket::new(10500);
        assert_eq!(socket.port(false), 10500);
        assert_eq!(socket.port(true), 4500);

        let socket = StaticSocket::new(500);
        assert_eq!(socket.port(true), 4500);
    }

    #[test]
    fn test_noop_listener_never_cancels() {
        let listener = NoopListener;
        assert!(listener.on_progress(0, "establishing IKE_SA"));
        assert!(listener.on_progress(4, "anything"));
    }
}
