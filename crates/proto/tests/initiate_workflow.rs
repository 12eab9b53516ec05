//! Connection Initiation Integration Tests
//!
//! End-to-end tests from command-line options to the controller call.
//! Options go through `ConnectionBuilder::handle`, the job runs on a
//! `Processor` and failures surface on the `TerminationListener`.

#![cfg(feature = "ipsec")]

use async_trait::async_trait;
use ikecmd_platform::{ProcessHandle, Processor, TerminationListener};
use ikecmd_proto::ipsec::{
    AuthClass, ChildConfig, CmdOption, ConnectionBuilder, Controller, Daemon, Error, IkeVersion,
    InitiateListener, PeerConfig, Profile, Result, Side, StaticSocket,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Controller recording every configuration it receives
#[derive(Default)]
struct MockController {
    initiated: Mutex<Vec<(Arc<PeerConfig>, Arc<ChildConfig>)>>,
}

impl MockController {
    fn count(&self) -> usize {
        self.initiated.lock().unwrap().len()
    }

    fn last(&self) -> (Arc<PeerConfig>, Arc<ChildConfig>) {
        let initiated = self.initiated.lock().unwrap();
        let (peer, child) = initiated.last().expect("controller not called");
        (Arc::clone(peer), Arc::clone(child))
    }
}

#[async_trait]
impl Controller for MockController {
    async fn initiate(
        &self,
        peer: Arc<PeerConfig>,
        child: Arc<ChildConfig>,
        _listener: &dyn InitiateListener,
        _timeout: Option<Duration>,
    ) -> Result<()> {
        self.initiated.lock().unwrap().push((peer, child));
        Ok(())
    }
}

/// Helper applying options the way the command line would
fn builder_from(options: &[(CmdOption, &str)]) -> ConnectionBuilder {
    let mut builder = ConnectionBuilder::new();
    for (option, value) in options {
        assert!(builder.handle(*option, value).expect("option rejected"));
    }
    builder
}

/// Helper running the single initiation job on one worker
async fn run(
    builder: ConnectionBuilder,
    port: u16,
) -> (Arc<MockController>, TerminationListener) {
    let controller = Arc::new(MockController::default());
    let daemon = Daemon::new(controller.clone(), Arc::new(StaticSocket::new(port)));
    let (process, listener) = ProcessHandle::capture();

    let processor = Processor::new();
    builder.schedule(&processor, daemon, process).unwrap();
    let workers = processor.spawn_workers(1).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while processor.executed() < 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("job did not run");

    processor.shutdown();
    for worker in workers {
        worker.await.unwrap();
    }
    (controller, listener)
}

fn auth_rounds(peer: &PeerConfig) -> Vec<(Side, AuthClass, String)> {
    peer.auth_cfgs()
        .iter()
        .map(|auth| (auth.side, auth.class, auth.identity.to_string()))
        .collect()
}

//
// Test Cases - End-to-end scenarios
//

#[tokio::test]
async fn test_default_profile_without_key() {
    let builder = builder_from(&[
        (CmdOption::Host, "vpn.example.com"),
        (CmdOption::Identity, "alice@example.com"),
    ]);

    let (controller, mut listener) = run(builder, 500).await;

    assert_eq!(controller.count(), 1);
    let (peer, child) = controller.last();
    assert_eq!(peer.version(), IkeVersion::V2);
    assert_eq!(
        auth_rounds(&peer),
        vec![
            (Side::Local, AuthClass::Eap, "alice@example.com".to_string()),
            (Side::Remote, AuthClass::Any, "vpn.example.com".to_string()),
        ]
    );
    assert_eq!(peer.child_cfgs().len(), 1);
    assert!(Arc::ptr_eq(&peer.child_cfgs()[0], &child));
    assert!(listener.try_recv().is_none());
}

#[tokio::test]
async fn test_explicit_xauth_psk_with_key() {
    let builder = builder_from(&[
        (CmdOption::Host, "vpn.example.com"),
        (CmdOption::Identity, "alice@example.com"),
        (CmdOption::Rsa, "alice.pem"),
        (CmdOption::Profile, "ikev1-xauth-psk"),
    ]);

    let (controller, mut listener) = run(builder, 500).await;

    let (peer, _) = controller.last();
    assert_eq!(peer.version(), IkeVersion::V1);
    let classes: Vec<_> = auth_rounds(&peer)
        .into_iter()
        .map(|(side, class, _)| (side, class))
        .collect();
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
async fn test_pubkey_profile_without_key_terminates() {
    let builder = builder_from(&[
        (CmdOption::Host, "vpn.example.com"),
        (CmdOption::Identity, "alice@example.com"),
        (CmdOption::Profile, "ikev2-pub"),
    ]);

    let (controller, mut listener) = run(builder, 500).await;

    assert_eq!(controller.count(), 0);
    let termination = listener.wait().await.expect("termination requested");
    assert_eq!(termination.pid, std::process::id());
    assert_eq!(termination.reason, "missing private key for profile ikev2-pub");
}

#[tokio::test]
async fn test_missing_identity_terminates() {
    let builder = builder_from(&[(CmdOption::Host, "vpn.example.com")]);

    let (controller, mut listener) = run(builder, 500).await;

    assert_eq!(controller.count(), 0);
    assert_eq!(
        listener.wait().await.unwrap().reason,
        "unable to initiate, missing --identity option"
    );
}

//
// Test Cases - Traffic selectors and ports
//

#[tokio::test]
async fn test_selectors_keep_insertion_order() {
    let builder = builder_from(&[
        (CmdOption::Host, "vpn.example.com"),
        (CmdOption::Identity, "alice@example.com"),
        (CmdOption::RemoteTs, "10.3.0.0/16"),
        (CmdOption::LocalTs, "192.168.0.0/24"),
        (CmdOption::RemoteTs, "10.1.0.0/16"),
        (CmdOption::RemoteTs, "fec0::/16"),
        (CmdOption::RemoteTs, "10.2.0.1-10.2.0.9"),
    ]);

    let (controller, _listener) = run(builder, 500).await;

    let (_, child) = controller.last();
    let local: Vec<String> = child
        .traffic_selectors(Side::Local)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(local, vec!["dynamic", "192.168.0.0/24"]);

    let remote: Vec<String> = child
        .traffic_selectors(Side::Remote)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        remote,
        vec!["10.3.0.0/16", "10.1.0.0/16", "fec0::/16", "10.2.0.1..10.2.0.9"]
    );
}

#[tokio::test]
async fn test_default_selectors() {
    let builder = builder_from(&[
        (CmdOption::Host, "vpn.example.com"),
        (CmdOption::Identity, "alice@example.com"),
    ]);

    let (controller, _listener) = run(builder, 500).await;

    let (_, child) = controller.last();
    let local = child.traffic_selectors(Side::Local);
    assert_eq!(local.len(), 1);
    assert!(local[0].is_dynamic());

    let remote = child.traffic_selectors(Side::Remote);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].to_string(), "0.0.0.0/0");
    assert!(!remote[0].is_dynamic());
    assert!(remote[0].is_any_port());
}

#[tokio::test]
async fn test_remote_port_follows_local_port() {
    for (local, remote) in [(500, 500), (4500, 4500), (1500, 4500)] {
        let builder = builder_from(&[
            (CmdOption::Host, "192.0.2.10"),
            (CmdOption::Identity, "alice@example.com"),
        ]);

        let (controller, _listener) = run(builder, local).await;

        let (peer, _) = controller.last();
        assert_eq!(peer.ike().local_port, local);
        assert_eq!(peer.ike().remote_port, remote, "local port {}", local);
    }
}

//
// Test Cases - Option errors
//

#[test]
fn test_invalid_options_fail_at_parse_time() {
    let mut builder = ConnectionBuilder::new();
    assert!(matches!(
        builder.handle(CmdOption::RemoteTs, "not-a-subnet"),
        Err(Error::InvalidSelector(_))
    ));
    assert!(matches!(
        builder.handle(CmdOption::Profile, "ikev2-psk"),
        Err(Error::UnknownProfile(_))
    ));
}

#[test]
fn test_every_profile_name_accepted() {
    for profile in Profile::NAMED {
        let mut builder = ConnectionBuilder::new();
        let name = profile.name().unwrap();
        assert!(builder.handle(CmdOption::Profile, name).unwrap());
        assert_eq!(builder.profile(), profile);
    }
}
