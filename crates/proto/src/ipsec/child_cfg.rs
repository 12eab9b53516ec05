//! Child SA configuration
//!
//! Describes which traffic a Child SA protects and how: traffic selectors
//! for both sides, ESP proposals, encapsulation mode and lifetimes.
//!
//! # Lifetimes
//!
//! ```text
//! 0 ............ rekey - rand(0..jitter) ........ rekey ........ life
//!                 rekey starts somewhere here                    hard expiry
//! ```
//!
//! The jitter spreads rekeying of many SAs over time so they do not all
//! renegotiate at once.

use super::{
    profile::Side,
    proposal::{Proposal, ProtocolId},
    ts::TrafficSelector,
    Error, Result,
};
use std::time::Duration;

/// Hard lifetime of command-line Child SAs (3 hours)
pub const CHILD_LIFETIME: Duration = Duration::from_secs(10800);

/// Rekey time of command-line Child SAs (2 hours 50 minutes)
pub const CHILD_REKEY_TIME: Duration = Duration::from_secs(10200);

/// Rekey jitter of command-line Child SAs (5 minutes)
pub const CHILD_JITTER: Duration = Duration::from_secs(300);

/// SA lifetime limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LifetimeConfig {
    /// Hard limit - SA is deleted when reached
    pub life: Duration,

    /// Soft limit - rekeying starts when reached
    pub rekey: Duration,

    /// Random amount subtracted from `rekey`
    pub jitter: Duration,
}

impl Default for LifetimeConfig {
    /// 3h life, 2h50m rekey, 5min jitter
    fn default() -> Self {
        LifetimeConfig {
            life: CHILD_LIFETIME,
            rekey: CHILD_REKEY_TIME,
            jitter: CHILD_JITTER,
        }
    }
}

/// IPsec encapsulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IpsecMode {
    /// Whole IP packets are encapsulated
    #[default]
    Tunnel,
    /// Only the payload is protected
    Transport,
}

/// Action the daemon takes on start, dead peer or remote close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChildAction {
    /// Do nothing
    #[default]
    None,
    /// Install a trap policy and negotiate on demand
    Route,
    /// Re-initiate immediately
    Restart,
}

/// Child SA configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChildConfig {
    name: String,
    lifetime: LifetimeConfig,
    hostaccess: bool,
    mode: IpsecMode,
    start_action: ChildAction,
    dpd_action: ChildAction,
    close_action: ChildAction,
    ipcomp: bool,
    proposals: Vec<Proposal>,
    local_ts: Vec<TrafficSelector>,
    remote_ts: Vec<TrafficSelector>,
}

impl ChildConfig {
    /// Create builder for a named child configuration
    pub fn builder(name: impl Into<String>) -> ChildConfigBuilder {
        ChildConfigBuilder::new(name)
    }

    /// Add an ESP proposal
    pub fn add_proposal(&mut self, proposal: Proposal) {
        self.proposals.push(proposal);
    }

    /// Attach a traffic selector to one side, keeping attachment order
    pub fn add_traffic_selector(&mut self, side: Side, ts: TrafficSelector) {
        match side {
            Side::Local => self.local_ts.push(ts),
            Side::Remote => self.remote_ts.push(ts),
        }
    }

    /// Configuration name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifetime limits
    pub fn lifetime(&self) -> &LifetimeConfig {
        &self.lifetime
    }

    /// Whether the local host may access the protected remote subnet
    pub fn hostaccess(&self) -> bool {
        self.hostaccess
    }

    /// Encapsulation mode
    pub fn mode(&self) -> IpsecMode {
        self.mode
    }

    /// Action after loading the configuration
    pub fn start_action(&self) -> ChildAction {
        self.start_action
    }

    /// Action when the peer is declared dead
    pub fn dpd_action(&self) -> ChildAction {
        self.dpd_action
    }

    /// Action when the peer closes the SA
    pub fn close_action(&self) -> ChildAction {
        self.close_action
    }

    /// Whether IPComp is proposed
    pub fn ipcomp(&self) -> bool {
        self.ipcomp
    }

    /// ESP proposals
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Traffic selectors of one side
    pub fn traffic_selectors(&self, side: Side) -> &[TrafficSelector] {
        match side {
            Side::Local => &self.local_ts,
            Side::Remote => &self.remote_ts,
        }
    }
}

/// Builder for ChildConfig
pub struct ChildConfigBuilder {
    name: String,
    lifetime: Option<LifetimeConfig>,
    hostaccess: bool,
    mode: IpsecMode,
    start_action: ChildAction,
    dpd_action: ChildAction,
    close_action: ChildAction,
    ipcomp: bool,
}

impl ChildConfigBuilder {
    /// Create new child configuration builder
    pub fn new(name: impl Into<String>) -> Self {
        ChildConfigBuilder {
            name: name.into(),
            lifetime: None,
            hostaccess: false,
            mode: IpsecMode::default(),
            start_action: ChildAction::None,
            dpd_action: ChildAction::None,
            close_action: ChildAction::None,
            ipcomp: false,
        }
    }

    /// Set SA lifetime
    pub fn with_lifetime(mut self, lifetime: LifetimeConfig) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Allow host access to the protected subnet
    pub fn with_hostaccess(mut self, hostaccess: bool) -> Self {
        self.hostaccess = hostaccess;
        self
    }

    /// Set encapsulation mode
    pub fn with_mode(mut self, mode: IpsecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set start, DPD and close actions
    pub fn with_actions(mut self, start: ChildAction, dpd: ChildAction, close: ChildAction) -> Self {
        self.start_action = start;
        self.dpd_action = dpd;
        self.close_action = close;
        self
    }

    /// Propose IPComp
    pub fn with_ipcomp(mut self, ipcomp: bool) -> Self {
        self.ipcomp = ipcomp;
        self
    }

    /// Build ChildConfig with validation
    pub fn build(self) -> Result<ChildConfig> {
        if self.name.is_empty() {
            return Err(Error::InvalidParameter("child name cannot be empty".into()));
        }

        Ok(ChildConfig {
            name: self.name,
            lifetime: self.lifetime.unwrap_or_default(),
            hostaccess: self.hostaccess,
            mode: self.mode,
            start_action: self.start_action,
            dpd_action: self.dpd_action,
            close_action: self.close_action,
            ipcomp: self.ipcomp,
            proposals: Vec::new(),
            local_ts: Vec::new(),
            remote_ts: Vec::new(),
        })
    }
}

/// ESP default proposal shortcut
pub(crate) fn default_esp_proposal() -> Proposal {
    Proposal::default_for(ProtocolId::Esp)
}
