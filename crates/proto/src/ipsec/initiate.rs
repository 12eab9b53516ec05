//! One-shot connection initiation
//!
//! [`InitiateJob`] owns everything one attempt needs. It validates the
//! collected options, assembles the configuration, hands it to the
//! controller and, on any failure, asks the owning process to terminate.
//! Running it consumes it, so an attempt can never be repeated.

use super::{
    connection::ConnectionBuilder,
    controller::{Daemon, NoopListener},
    logging, Error, Result,
};
use ikecmd_platform::ProcessHandle;
use std::sync::Arc;
use tracing::warn;

/// The single connection attempt of a process
#[derive(Debug)]
pub struct InitiateJob {
    request: ConnectionBuilder,
    daemon: Daemon,
    process: ProcessHandle,
}

impl InitiateJob {
    /// Create job for the collected options
    pub fn new(request: ConnectionBuilder, daemon: Daemon, process: ProcessHandle) -> Self {
        InitiateJob {
            request,
            daemon,
            process,
        }
    }

    /// Run the attempt.
    ///
    /// On error a termination request carrying the error message has been
    /// sent to the owning process before this returns.
    pub async fn run(self) -> Result<()> {
        let InitiateJob {
            request,
            daemon,
            process,
        } = self;

        let result = execute(request, &daemon).await;
        if let Err(e) = &result {
            logging::log_initiate_failed(e);
            if let Err(gone) = process.terminate(e.to_string()) {
                warn!(error = %gone, "Termination request not delivered");
            }
        }
        result
    }
}

async fn execute(mut request: ConnectionBuilder, daemon: &Daemon) -> Result<()> {
    let host = request
        .host()
        .map(str::to_string)
        .ok_or(Error::MissingRequiredOption("--host"))?;
    if request.identity().is_none() {
        return Err(Error::MissingRequiredOption("--identity"));
    }

    let mut peer = request.create_peer_cfg(daemon.socket.port(false))?;
    let resolved = request.add_auth_cfgs(&mut peer)?;

    let child = Arc::new(request.create_child_cfg()?);
    peer.add_child_cfg(Arc::clone(&child));
    logging::log_config_assembled(&peer);

    logging::log_initiate_start(&host, peer.ike().remote_port, resolved.profile);
    daemon
        .controller
        .initiate(Arc::new(peer), child, &NoopListener, None)
        .await
        .map_err(|e| match e {
            Error::ControllerFailure(_) => e,
            other => Error::ControllerFailure(other.to_string()),
        })?;

    logging::log_initiate_success(&host);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipsec::{
        child_cfg::ChildConfig,
        config::PeerConfig,
        controller::{Controller, InitiateListener, StaticSocket},
        profile::{AuthClass, IkeVersion, Profile, Side},
    };
    use async_trait::async_trait;
    use ikecmd_platform::{JobPriority, Processor, TerminationListener};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(Arc<PeerConfig>, Arc<ChildConfig>, Option<Duration>)>>,
        fail: bool,
    }

    impl RecordingController {
        fn failing() -> Self {
            RecordingController {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn peer(&self) -> Arc<PeerConfig> {
            Arc::clone(&self.calls.lock().unwrap()[0].0)
        }
    }

    #[async_trait]
    impl Controller for RecordingController {
        async fn initiate(
            &self,
            peer: Arc<PeerConfig>,
            child: Arc<ChildConfig>,
            listener: &dyn InitiateListener,
            timeout: Option<Duration>,
        ) -> Result<()> {
            assert!(listener.on_progress(1, "initiating"));
            self.calls.lock().unwrap().push((peer, child, timeout));
            if self.fail {
                return Err(Error::InvalidParameter("peer unreachable".into()));
            }
            Ok(())
        }
    }

    fn setup(
        controller: RecordingController,
        port: u16,
    ) -> (Arc<RecordingController>, Daemon, ProcessHandle, TerminationListener) {
        let controller = Arc::new(controller);
        let daemon = Daemon::new(controller.clone(), Arc::new(StaticSocket::new(port)));
        let (process, listener) = ProcessHandle::for_pid(1234);
        (controller, daemon, process, listener)
    }

    fn alice() -> ConnectionBuilder {
        ConnectionBuilder::new()
            .with_host("vpn.example.com")
            .with_identity("alice@example.com")
    }

    fn rounds(peer: &PeerConfig) -> Vec<(Side, AuthClass, String)> {
        peer.auth_cfgs()
            .iter()
            .map(|a| (a.side, a.class, a.identity.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_eap_inferred_without_key() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);

        InitiateJob::new(alice(), daemon, process).run().await.unwrap();

        assert_eq!(controller.calls(), 1);
        let peer = controller.peer();
        assert_eq!(peer.version(), IkeVersion::V2);
        assert_eq!(
            rounds(&peer),
            vec![
                (Side::Local, AuthClass::Eap, "alice@example.com".into()),
                (Side::Remote, AuthClass::Any, "vpn.example.com".into()),
            ]
        );
        assert_eq!(peer.child_cfgs().len(), 1);
        assert!(listener.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_xauth_psk_ignores_key() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let request = alice().with_key().with_profile(Profile::V1XauthPsk);

        InitiateJob::new(request, daemon, process).run().await.unwrap();

        let peer = controller.peer();
        assert_eq!(peer.version(), IkeVersion::V1);
        let classes: Vec<(Side, AuthClass)> =
            peer.auth_cfgs().iter().map(|a| (a.side, a.class)).collect();
        assert_eq!(
            classes,
            vec![
                (Side::Local, AuthClass::Psk),
                (Side::Local, AuthClass::Xauth),
                (Side::Remote, AuthClass::Psk),
            ]
        );
        assert!(listener.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_terminates_before_controller() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let request = alice().with_profile(Profile::V2Pub);

        let result = InitiateJob::new(request, daemon, process).run().await;

        assert!(matches!(result, Err(Error::MissingCredential(Profile::V2Pub))));
        assert_eq!(controller.calls(), 0);
        let termination = listener.try_recv().expect("termination requested");
        assert_eq!(termination.pid, 1234);
        assert!(termination.reason.contains("ikev2-pub"));
    }

    #[tokio::test]
    async fn test_missing_host_terminates() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let request = ConnectionBuilder::new().with_identity("alice@example.com");

        let result = InitiateJob::new(request, daemon, process).run().await;

        assert!(matches!(result, Err(Error::MissingRequiredOption("--host"))));
        assert_eq!(controller.calls(), 0);
        assert_eq!(
            listener.try_recv().unwrap().reason,
            "unable to initiate, missing --host option"
        );
    }

    #[tokio::test]
    async fn test_missing_identity_terminates() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let request = ConnectionBuilder::new().with_host("vpn.example.com");

        let result = InitiateJob::new(request, daemon, process).run().await;

        assert!(matches!(result, Err(Error::MissingRequiredOption("--identity"))));
        assert_eq!(controller.calls(), 0);
        assert!(listener.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_controller_failure_terminates() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::failing(), 500);

        let result = InitiateJob::new(alice(), daemon, process).run().await;

        assert!(matches!(result, Err(Error::ControllerFailure(_))));
        assert_eq!(controller.calls(), 1);
        assert!(listener.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_controller_gets_no_timeout() {
        let (controller, daemon, process, _listener) =
            setup(RecordingController::default(), 500);

        InitiateJob::new(alice(), daemon, process).run().await.unwrap();

        assert_eq!(controller.calls.lock().unwrap()[0].2, None);
    }

    #[tokio::test]
    async fn test_remote_identity_override() {
        let (controller, daemon, process, _listener) =
            setup(RecordingController::default(), 500);
        let request = alice().with_remote_identity("gw@example.com");

        InitiateJob::new(request, daemon, process).run().await.unwrap();

        let peer = controller.peer();
        let remote: Vec<_> = peer.auth_cfgs_for(Side::Remote).collect();
        assert_eq!(remote[0].identity.value(), "gw@example.com");
        assert_eq!(peer.ike().remote_addr, "vpn.example.com");
    }

    #[tokio::test]
    async fn test_floated_local_port_uses_nat_t() {
        let (controller, daemon, process, _listener) =
            setup(RecordingController::default(), 10500);

        InitiateJob::new(alice(), daemon, process).run().await.unwrap();

        let peer = controller.peer();
        assert_eq!(peer.ike().local_port, 10500);
        assert_eq!(peer.ike().remote_port, 4500);
    }

    #[tokio::test]
    async fn test_scheduled_job_runs_once() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let processor = Processor::new();

        alice().schedule(&processor, daemon, process).unwrap();
        assert_eq!(processor.pending(), 1);

        assert_eq!(processor.run_until_idle().await, 1);
        assert_eq!(processor.run_until_idle().await, 0);
        assert_eq!(controller.calls(), 1);
        assert!(listener.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_scheduled_failure_reaches_listener() {
        let (controller, daemon, process, mut listener) =
            setup(RecordingController::default(), 500);
        let processor = Processor::new();

        alice()
            .with_profile(Profile::V1Pub)
            .schedule(&processor, daemon, process)
            .unwrap();
        processor.queue_job(JobPriority::Low, async {}).unwrap();
        processor.run_until_idle().await;

        assert_eq!(controller.calls(), 0);
        let termination = listener.wait().await.unwrap();
        assert_eq!(termination.reason, "missing private key for profile ikev1-pub");
    }
}
