//! Connection builder
//!
//! Collects the command-line options of a single connection attempt and
//! turns them into the configuration objects the controller consumes.
//!
//! ```text
//! handle(option, value)*  ──►  ConnectionBuilder
//!                                   │ schedule()
//!                                   ▼
//!                       InitiateJob (JobPriority::Critical)
//!                                   │
//!        create_peer_cfg ─► add_auth_cfgs ─► create_child_cfg
//!                                   │
//!                                   ▼
//!                          Controller::initiate
//! ```
//!
//! The builder is filled synchronously before the job is scheduled and is
//! moved into the job, so nothing can change it afterwards.

use super::{
    child_cfg::{default_esp_proposal, ChildAction, ChildConfig, IpsecMode, LifetimeConfig},
    config::{
        AuthConfig, CertPolicy, Fragmentation, Identity, IkeConfig, PeerConfig, UniquePolicy,
        ANY_ADDR, IKE_JITTER, IKE_OVER_TIME, IKE_REKEY_TIME,
    },
    controller::Daemon,
    dpd::DpdConfig,
    initiate::InitiateJob,
    logging,
    nat::remote_port_for,
    profile::{Profile, ResolvedProfile, Side},
    proposal::{Proposal, ProtocolId},
    ts::TrafficSelectorSet,
    Error, Result,
};
use ikecmd_platform::{JobPriority, ProcessHandle, Processor};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Name of both the peer and the child configuration
pub const CONNECTION_NAME: &str = "cmd";

/// Command-line option kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdOption {
    /// `--host`: remote host to connect to
    Host,
    /// `--remote-identity`: expected server identity
    RemoteIdentity,
    /// `--identity`: local identity
    Identity,
    /// `--rsa`: a private key was loaded
    Rsa,
    /// `--local-ts`: additional local traffic selector
    LocalTs,
    /// `--remote-ts`: additional remote traffic selector
    RemoteTs,
    /// `--profile`: connection profile name
    Profile,
    /// `--agent`: use an SSH agent for the key
    Agent,
    /// `--cert`: trusted or own certificate
    Cert,
    /// `--debug`: log level
    Debug,
    /// `--eap-identity`: EAP identity differing from `--identity`
    EapIdentity,
    /// `--xauth-username`: XAuth username differing from `--identity`
    XauthUsername,
}

impl CmdOption {
    /// Long option name without dashes
    pub fn name(self) -> &'static str {
        match self {
            CmdOption::Host => "host",
            CmdOption::RemoteIdentity => "remote-identity",
            CmdOption::Identity => "identity",
            CmdOption::Rsa => "rsa",
            CmdOption::LocalTs => "local-ts",
            CmdOption::RemoteTs => "remote-ts",
            CmdOption::Profile => "profile",
            CmdOption::Agent => "agent",
            CmdOption::Cert => "cert",
            CmdOption::Debug => "debug",
            CmdOption::EapIdentity => "eap-identity",
            CmdOption::XauthUsername => "xauth-username",
        }
    }
}

impl fmt::Display for CmdOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.name())
    }
}

/// Options of one connection attempt
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    host: Option<String>,
    server: Option<String>,
    identity: Option<String>,
    key_seen: bool,
    profile: Profile,
    local_ts: TrafficSelectorSet,
    remote_ts: TrafficSelectorSet,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionBuilder {
    /// Create an empty builder.
    ///
    /// The local selector set starts with the dynamic virtual IP selector.
    pub fn new() -> Self {
        ConnectionBuilder {
            host: None,
            server: None,
            identity: None,
            key_seen: false,
            profile: Profile::Undefined,
            local_ts: TrafficSelectorSet::local(),
            remote_ts: TrafficSelectorSet::remote(),
        }
    }

    /// Apply one command-line option.
    ///
    /// Returns `Ok(false)` for options owned by other components. Later
    /// values of single-valued options replace earlier ones; selectors
    /// accumulate in order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSelector`] for unparsable `--local-ts`/`--remote-ts`
    /// - [`Error::UnknownProfile`] for an unsupported `--profile`
    pub fn handle(&mut self, option: CmdOption, value: &str) -> Result<bool> {
        let outcome = match option {
            CmdOption::Host => {
                self.host = Some(value.to_string());
                Ok(())
            }
            CmdOption::RemoteIdentity => {
                self.server = Some(value.to_string());
                Ok(())
            }
            CmdOption::Identity => {
                self.identity = Some(value.to_string());
                Ok(())
            }
            CmdOption::Rsa => {
                self.key_seen = true;
                Ok(())
            }
            CmdOption::LocalTs => self.local_ts.add_from_cidr(value),
            CmdOption::RemoteTs => self.remote_ts.add_from_cidr(value),
            CmdOption::Profile => value
                .parse::<Profile>()
                .map(|profile| self.profile = profile),
            CmdOption::Agent
            | CmdOption::Cert
            | CmdOption::Debug
            | CmdOption::EapIdentity
            | CmdOption::XauthUsername => return Ok(false),
        };

        match outcome {
            Ok(()) => {
                logging::log_option_accepted(option, value);
                Ok(true)
            }
            Err(e) => {
                logging::log_option_rejected(option, value, &e);
                Err(e)
            }
        }
    }

    /// Set remote host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set expected server identity
    pub fn with_remote_identity(mut self, identity: impl Into<String>) -> Self {
        self.server = Some(identity.into());
        self
    }

    /// Set local identity
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Mark that a private key is available
    pub fn with_key(mut self) -> Self {
        self.key_seen = true;
        self
    }

    /// Set connection profile
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Append a local traffic selector
    pub fn with_local_ts(mut self, text: &str) -> Result<Self> {
        self.local_ts.add_from_cidr(text)?;
        Ok(self)
    }

    /// Append a remote traffic selector
    pub fn with_remote_ts(mut self, text: &str) -> Result<Self> {
        self.remote_ts.add_from_cidr(text)?;
        Ok(self)
    }

    /// Remote host, if given
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Local identity, if given
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Identity expected from the peer: `--remote-identity`, else the host
    pub fn remote_identity(&self) -> Option<&str> {
        self.server.as_deref().or(self.host.as_deref())
    }

    /// Whether a private key was supplied
    pub fn key_seen(&self) -> bool {
        self.key_seen
    }

    /// Requested profile
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Pending local selectors
    pub fn local_ts(&self) -> &TrafficSelectorSet {
        &self.local_ts
    }

    /// Pending remote selectors
    pub fn remote_ts(&self) -> &TrafficSelectorSet {
        &self.remote_ts
    }

    // ---- configuration assembly -------------------------------------------

    /// Build the peer configuration for an IKE socket bound to `local_port`.
    ///
    /// The IKE version follows the requested profile; an undefined profile
    /// uses IKEv2. Authentication rounds and children are added separately.
    pub fn create_peer_cfg(&self, local_port: u16) -> Result<PeerConfig> {
        let host = self
            .host
            .as_deref()
            .ok_or(Error::MissingRequiredOption("--host"))?;

        let mut ike = IkeConfig::builder(self.profile.version())
            .with_local(ANY_ADDR, local_port)
            .with_remote(host, remote_port_for(local_port))
            .with_certreq(true)
            .with_force_encap(false)
            .with_fragmentation(Fragmentation::No)
            .build()?;
        ike.add_proposal(Proposal::default_for(ProtocolId::Ike));

        let mut peer = PeerConfig::builder(CONNECTION_NAME, ike)
            .with_cert_policy(CertPolicy::IfAsked)
            .with_unique_policy(UniquePolicy::Replace)
            .with_keyingtries(1)
            .with_rekey(IKE_REKEY_TIME, None)
            .with_jitter(IKE_JITTER, IKE_OVER_TIME)
            .with_mobike(true)
            .with_aggressive(false)
            .with_dpd(DpdConfig::default())
            .build()?;
        peer.add_virtual_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        Ok(peer)
    }

    /// Resolve the profile and append its authentication rounds to `peer`.
    ///
    /// Local rounds use the local identity, remote rounds the expected
    /// server identity. `peer` is left untouched on error.
    pub fn add_auth_cfgs(&self, peer: &mut PeerConfig) -> Result<ResolvedProfile> {
        let local = self
            .identity
            .as_deref()
            .map(Identity::from_string)
            .ok_or(Error::MissingRequiredOption("--identity"))?;
        let remote = self
            .remote_identity()
            .map(Identity::from_string)
            .ok_or(Error::MissingRequiredOption("--host"))?;

        let resolved = self.profile.resolve(self.key_seen)?;
        logging::log_profile_resolved(self.profile, &resolved);

        for step in resolved.steps {
            let identity = match step.side {
                Side::Local => local.clone(),
                Side::Remote => remote.clone(),
            };
            peer.add_auth_cfg(AuthConfig::new(step.side, step.class, identity));
        }

        Ok(resolved)
    }

    /// Build the child configuration, draining both selector sets into it.
    ///
    /// An empty remote set contributes a selector for any IPv4 address.
    pub fn create_child_cfg(&mut self) -> Result<ChildConfig> {
        let mut child = ChildConfig::builder(CONNECTION_NAME)
            .with_lifetime(LifetimeConfig::default())
            .with_hostaccess(false)
            .with_mode(IpsecMode::Tunnel)
            .with_actions(ChildAction::None, ChildAction::None, ChildAction::None)
            .with_ipcomp(false)
            .build()?;
        child.add_proposal(default_esp_proposal());

        for ts in self.local_ts.drain() {
            child.add_traffic_selector(Side::Local, ts);
        }
        for ts in self.remote_ts.drain() {
            child.add_traffic_selector(Side::Remote, ts);
        }

        Ok(child)
    }

    /// Queue the one initiation attempt on `processor`.
    ///
    /// Consumes the builder. Any failure during the attempt is reported to
    /// `process` as a termination request.
    pub fn schedule(
        self,
        processor: &Processor,
        daemon: Daemon,
        process: ProcessHandle,
    ) -> Result<()> {
        let job = InitiateJob::new(self, daemon, process);
        processor.queue_job(JobPriority::Critical, async move {
            // Failures already went to the process handle.
            let _ = job.run().await;
        })?;
        Ok(())
    }
}
