//! IKE and peer configuration
//!
//! Configuration objects handed to the controller, with builders in the
//! same `with_*` / `build()` style used throughout this crate:
//!
//! ```text
//! PeerConfig
//!   ├── IkeConfig        version, endpoints, IKE proposals
//!   ├── AuthConfig(s)    ordered rounds, each tagged local/remote
//!   ├── virtual IPs      addresses requested from the peer
//!   └── ChildConfig(s)   shared with the controller
//! ```

use super::{
    child_cfg::ChildConfig,
    dpd::DpdConfig,
    profile::{AuthClass, IkeVersion, Side},
    proposal::Proposal,
    Error, Result,
};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Wildcard local address
pub const ANY_ADDR: &str = "0.0.0.0";

/// IKE SA rekey time of command-line connections (10 hours)
pub const IKE_REKEY_TIME: Duration = Duration::from_secs(36000);

/// IKE SA rekey jitter of command-line connections (10 minutes)
pub const IKE_JITTER: Duration = Duration::from_secs(600);

/// Time allowed for a rekey or reauthentication to complete (10 minutes)
pub const IKE_OVER_TIME: Duration = Duration::from_secs(600);

/// Identity type (RFC 7296 Section 3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IdType {
    /// Matches any identity (`%any`)
    Any,
    /// IPv4 address
    Ipv4Addr,
    /// Fully qualified domain name
    Fqdn,
    /// RFC 822 email address
    Rfc822Addr,
    /// IPv6 address
    Ipv6Addr,
    /// ASN.1 distinguished name
    DerAsn1Dn,
    /// Opaque key identifier
    KeyId,
}

/// Peer or local identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Identity {
    id_type: IdType,
    value: String,
}

impl Identity {
    /// Create an identity from user supplied text, guessing its type.
    ///
    /// - `%any` or empty: any
    /// - an IP address: IPv4/IPv6 address
    /// - contains `=`: distinguished name
    /// - `@#...`: key id
    /// - `@...`: FQDN, taken literally without the `@`
    /// - contains `@`: email address
    /// - anything else: FQDN
    pub fn from_string(text: &str) -> Self {
        let text = text.trim();
        let (id_type, value) = if text.is_empty() || text == "%any" {
            (IdType::Any, "%any")
        } else if let Ok(addr) = text.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(_) => (IdType::Ipv4Addr, text),
                IpAddr::V6(_) => (IdType::Ipv6Addr, text),
            }
        } else if text.contains('=') {
            (IdType::DerAsn1Dn, text)
        } else if let Some(key_id) = text.strip_prefix("@#") {
            (IdType::KeyId, key_id)
        } else if let Some(fqdn) = text.strip_prefix('@') {
            (IdType::Fqdn, fqdn)
        } else if text.contains('@') {
            (IdType::Rfc822Addr, text)
        } else {
            (IdType::Fqdn, text)
        };

        Identity {
            id_type,
            value: value.to_string(),
        }
    }

    /// Identity type
    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    /// Identity value as text
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// One authentication round
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AuthConfig {
    /// Side that authenticates in this round
    pub side: Side,
    /// Method used
    pub class: AuthClass,
    /// Identity claimed (local) or expected (remote)
    pub identity: Identity,
}

impl AuthConfig {
    /// Create new authentication round
    pub fn new(side: Side, class: AuthClass, identity: Identity) -> Self {
        AuthConfig {
            side,
            class,
            identity,
        }
    }
}

/// IKE fragmentation support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Fragmentation {
    /// Never fragment
    #[default]
    No,
    /// Fragment if the peer supports it
    Yes,
    /// Always fragment IKEv1 messages
    Force,
}

/// IKE SA configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IkeConfig {
    /// IKE version
    pub version: IkeVersion,

    /// Send certificate requests
    pub send_certreq: bool,

    /// Force UDP encapsulation of ESP
    pub force_encap: bool,

    /// Local address (`0.0.0.0` for any)
    pub local_addr: String,

    /// Local IKE port
    pub local_port: u16,

    /// Remote address or hostname, resolved by the daemon
    pub remote_addr: String,

    /// Remote IKE port
    pub remote_port: u16,

    /// IKE fragmentation
    pub fragmentation: Fragmentation,

    /// IKE SA proposals
    pub proposals: Vec<Proposal>,
}

impl IkeConfig {
    /// Create builder for an IKE configuration
    pub fn builder(version: IkeVersion) -> IkeConfigBuilder {
        IkeConfigBuilder::new(version)
    }

    /// Add an IKE proposal
    pub fn add_proposal(&mut self, proposal: Proposal) {
        self.proposals.push(proposal);
    }
}

/// Builder for IkeConfig
pub struct IkeConfigBuilder {
    version: IkeVersion,
    send_certreq: bool,
    force_encap: bool,
    local_addr: String,
    local_port: Option<u16>,
    remote_addr: Option<String>,
    remote_port: Option<u16>,
    fragmentation: Fragmentation,
}

impl IkeConfigBuilder {
    /// Create new IKE configuration builder
    pub fn new(version: IkeVersion) -> Self {
        IkeConfigBuilder {
            version,
            send_certreq: true,
            force_encap: false,
            local_addr: ANY_ADDR.to_string(),
            local_port: None,
            remote_addr: None,
            remote_port: None,
            fragmentation: Fragmentation::No,
        }
    }

    /// Set local endpoint
    pub fn with_local(mut self, addr: impl Into<String>, port: u16) -> Self {
        self.local_addr = addr.into();
        self.local_port = Some(port);
        self
    }

    /// Set remote endpoint
    pub fn with_remote(mut self, addr: impl Into<String>, port: u16) -> Self {
        self.remote_addr = Some(addr.into());
        self.remote_port = Some(port);
        self
    }

    /// Enable or disable certificate requests
    pub fn with_certreq(mut self, send_certreq: bool) -> Self {
        self.send_certreq = send_certreq;
        self
    }

    /// Force UDP encapsulation
    pub fn with_force_encap(mut self, force_encap: bool) -> Self {
        self.force_encap = force_encap;
        self
    }

    /// Set IKE fragmentation
    pub fn with_fragmentation(mut self, fragmentation: Fragmentation) -> Self {
        self.fragmentation = fragmentation;
        self
    }

    /// Build IkeConfig with validation
    pub fn build(self) -> Result<IkeConfig> {
        let remote_addr = self
            .remote_addr
            .filter(|addr| !addr.is_empty())
            .ok_or_else(|| Error::InvalidParameter("remote address is required".into()))?;

        Ok(IkeConfig {
            version: self.version,
            send_certreq: self.send_certreq,
            force_encap: self.force_encap,
            local_addr: self.local_addr,
            local_port: self
                .local_port
                .ok_or_else(|| Error::InvalidParameter("local port is required".into()))?,
            remote_addr,
            remote_port: self
                .remote_port
                .ok_or_else(|| Error::InvalidParameter("remote port is required".into()))?,
            fragmentation: self.fragmentation,
            proposals: Vec::new(),
        })
    }
}

/// Certificate send policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CertPolicy {
    /// Always send our certificate
    Always,
    /// Send it only if the peer asks for it
    #[default]
    IfAsked,
    /// Never send it
    Never,
}

/// Policy for duplicate IKE SAs with the same identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum UniquePolicy {
    /// Allow duplicates
    No,
    /// Replace the older SA
    #[default]
    Replace,
    /// Keep the older SA, reject the new one
    Keep,
}

/// Peer configuration: everything needed to negotiate with one peer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PeerConfig {
    name: String,
    ike: IkeConfig,
    cert_policy: CertPolicy,
    unique: UniquePolicy,
    keyingtries: u32,
    rekey_time: Duration,
    reauth_time: Option<Duration>,
    jitter_time: Duration,
    over_time: Duration,
    mobike: bool,
    aggressive: bool,
    dpd: DpdConfig,
    virtual_ips: Vec<IpAddr>,
    auth: Vec<AuthConfig>,
    children: Vec<Arc<ChildConfig>>,
}

impl PeerConfig {
    /// Create builder for a named peer configuration
    pub fn builder(name: impl Into<String>, ike: IkeConfig) -> PeerConfigBuilder {
        PeerConfigBuilder::new(name, ike)
    }

    /// Request a virtual IP; `0.0.0.0` asks for any IPv4 address
    pub fn add_virtual_ip(&mut self, addr: IpAddr) {
        self.virtual_ips.push(addr);
    }

    /// Append an authentication round
    pub fn add_auth_cfg(&mut self, auth: AuthConfig) {
        self.auth.push(auth);
    }

    /// Attach a child configuration
    pub fn add_child_cfg(&mut self, child: Arc<ChildConfig>) {
        self.children.push(child);
    }

    /// Configuration name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// IKE SA configuration
    pub fn ike(&self) -> &IkeConfig {
        &self.ike
    }

    /// IKE version
    pub fn version(&self) -> IkeVersion {
        self.ike.version
    }

    /// Certificate send policy
    pub fn cert_policy(&self) -> CertPolicy {
        self.cert_policy
    }

    /// Uniqueness policy
    pub fn unique_policy(&self) -> UniquePolicy {
        self.unique
    }

    /// Number of keying attempts
    pub fn keyingtries(&self) -> u32 {
        self.keyingtries
    }

    /// IKE SA rekey time
    pub fn rekey_time(&self) -> Duration {
        self.rekey_time
    }

    /// Reauthentication time, `None` if never forced
    pub fn reauth_time(&self) -> Option<Duration> {
        self.reauth_time
    }

    /// Rekey jitter
    pub fn jitter_time(&self) -> Duration {
        self.jitter_time
    }

    /// Rekey overtime
    pub fn over_time(&self) -> Duration {
        self.over_time
    }

    /// MOBIKE enabled
    pub fn use_mobike(&self) -> bool {
        self.mobike
    }

    /// IKEv1 aggressive mode enabled
    pub fn use_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Dead peer detection timers
    pub fn dpd(&self) -> &DpdConfig {
        &self.dpd
    }

    /// Requested virtual IPs
    pub fn virtual_ips(&self) -> &[IpAddr] {
        &self.virtual_ips
    }

    /// All authentication rounds in emission order
    pub fn auth_cfgs(&self) -> &[AuthConfig] {
        &self.auth
    }

    /// Authentication rounds of one side, in order
    pub fn auth_cfgs_for(&self, side: Side) -> impl Iterator<Item = &AuthConfig> {
        self.auth.iter().filter(move |auth| auth.side == side)
    }

    /// Attached child configurations
    pub fn child_cfgs(&self) -> &[Arc<ChildConfig>] {
        &self.children
    }
}

/// Builder for PeerConfig
pub struct PeerConfigBuilder {
    name: String,
    ike: IkeConfig,
    cert_policy: CertPolicy,
    unique: UniquePolicy,
    keyingtries: u32,
    rekey_time: Duration,
    reauth_time: Option<Duration>,
    jitter_time: Duration,
    over_time: Duration,
    mobike: bool,
    aggressive: bool,
    dpd: DpdConfig,
}

impl PeerConfigBuilder {
    /// Create new peer configuration builder
    pub fn new(name: impl Into<String>, ike: IkeConfig) -> Self {
        PeerConfigBuilder {
            name: name.into(),
            ike,
            cert_policy: CertPolicy::default(),
            unique: UniquePolicy::default(),
            keyingtries: 1,
            rekey_time: IKE_REKEY_TIME,
            reauth_time: None,
            jitter_time: IKE_JITTER,
            over_time: IKE_OVER_TIME,
            mobike: true,
            aggressive: false,
            dpd: DpdConfig::default(),
        }
    }

    /// Set certificate send policy
    pub fn with_cert_policy(mut self, policy: CertPolicy) -> Self {
        self.cert_policy = policy;
        self
    }

    /// Set uniqueness policy
    pub fn with_unique_policy(mut self, policy: UniquePolicy) -> Self {
        self.unique = policy;
        self
    }

    /// Set number of keying attempts (0 retries forever)
    pub fn with_keyingtries(mut self, tries: u32) -> Self {
        self.keyingtries = tries;
        self
    }

    /// Set rekey and reauthentication times
    pub fn with_rekey(mut self, rekey_time: Duration, reauth_time: Option<Duration>) -> Self {
        self.rekey_time = rekey_time;
        self.reauth_time = reauth_time;
        self
    }

    /// Set rekey jitter and overtime
    pub fn with_jitter(mut self, jitter_time: Duration, over_time: Duration) -> Self {
        self.jitter_time = jitter_time;
        self.over_time = over_time;
        self
    }

    /// Enable or disable MOBIKE
    pub fn with_mobike(mut self, mobike: bool) -> Self {
        self.mobike = mobike;
        self
    }

    /// Enable or disable IKEv1 aggressive mode
    pub fn with_aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    /// Set DPD configuration
    pub fn with_dpd(mut self, dpd: DpdConfig) -> Self {
        self.dpd = dpd;
        self
    }

    /// Build PeerConfig with validation
    pub fn build(self) -> Result<PeerConfig> {
        if self.name.is_empty() {
            return Err(Error::InvalidParameter("peer name cannot be empty".into()));
        }
        if self.ike.proposals.is_empty() {
            return Err(Error::InvalidParameter(
                "At least one IKE proposal required".into(),
            ));
        }
        if self.jitter_time > self.rekey_time {
            return Err(Error::InvalidParameter(
                "Jitter must not exceed rekey time".into(),
            ));
        }

        Ok(PeerConfig {
            name: self.name,
            ike: self.ike,
            cert_policy: self.cert_policy,
            unique: self.unique,
            keyingtries: self.keyingtries,
            rekey_time: self.rekey_time,
            reauth_time: self.reauth_time,
            jitter_time: self.jitter_time,
            over_time: self.over_time,
            mobike: self.mobike,
            aggressive: self.aggressive,
            dpd: self.dpd,
            virtual_ips: Vec::new(),
            auth: Vec::new(),
            children: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipsec::proposal::ProtocolId;

    fn ike_config() -> IkeConfig {
        let mut ike = IkeConfig::builder(IkeVersion::V2)
            .with_local(ANY_ADDR, 500)
            .with_remote("vpn.example.com", 500)
            .build()
            .expect("Failed to build IKE config");
        ike.add_proposal(Proposal::default_for(ProtocolId::Ike));
        ike
    }

    #[test]
    fn test_identity_types() {
        let cases = [
            ("alice@example.com", IdType::Rfc822Addr, "alice@example.com"),
            ("vpn.example.com", IdType::Fqdn, "vpn.example.com"),
            ("@vpn.example.com", IdType::Fqdn, "vpn.example.com"),
            ("@#0a0b0c", IdType::KeyId, "0a0b0c"),
            ("192.0.2.1", IdType::Ipv4Addr, "192.0.2.1"),
            ("2001:db8::1", IdType::Ipv6Addr, "2001:db8::1"),
            ("C=CH, O=Example, CN=alice", IdType::DerAsn1Dn, "C=CH, O=Example, CN=alice"),
            ("%any", IdType::Any, "%any"),
            ("", IdType::Any, "%any"),
        ];

        for (text, id_type, value) in cases {
            let id = Identity::from_string(text);
            assert_eq!(id.id_type(), id_type, "{:?}", text);
            assert_eq!(id.value(), value, "{:?}", text);
        }
    }

    #[test]
    fn test_ike_config_builder() {
        let ike = ike_config();
        assert_eq!(ike.version, IkeVersion::V2);
        assert_eq!(ike.local_addr, "0.0.0.0");
        assert_eq!(ike.remote_addr, "vpn.example.com");
        assert!(ike.send_certreq);
        assert!(!ike.force_encap);
        assert_eq!(ike.fragmentation, Fragmentation::No);
    }

    #[test]
    fn test_ike_config_validation() {
        // Missing remote
        assert!(IkeConfig::builder(IkeVersion::V1)
            .with_local(ANY_ADDR, 500)
            .build()
            .is_err());

        // Empty remote
        assert!(IkeConfig::builder(IkeVersion::V1)
            .with_local(ANY_ADDR, 500)
            .with_remote("", 500)
            .build()
            .is_err());

        // Missing local port
        assert!(IkeConfig::builder(IkeVersion::V1)
            .with_remote("10.0.0.1", 500)
            .build()
            .is_err());
    }

    #[test]
    fn test_peer_config_defaults() {
        let peer = PeerConfig::builder("cmd", ike_config())
            .build()
            .expect("Failed to build peer config");

        assert_eq!(peer.name(), "cmd");
        assert_eq!(peer.cert_policy(), CertPolicy::IfAsked);
        assert_eq!(peer.unique_policy(), UniquePolicy::Replace);
        assert_eq!(peer.keyingtries(), 1);
        assert_eq!(peer.rekey_time(), Duration::from_secs(10 * 3600));
        assert_eq!(peer.reauth_time(), None);
        assert_eq!(peer.jitter_time(), Duration::from_secs(600));
        assert_eq!(peer.over_time(), Duration::from_secs(600));
        assert!(peer.use_mobike());
        assert!(!peer.use_aggressive());
        assert_eq!(peer.dpd().delay, Duration::from_secs(30));
        assert!(!peer.dpd().has_timeout());
    }

    #[test]
    fn test_peer_config_requires_proposal() {
        let ike = IkeConfig::builder(IkeVersion::V2)
            .with_local(ANY_ADDR, 500)
            .with_remote("10.0.0.1", 500)
            .build()
            .unwrap();
        assert!(PeerConfig::builder("cmd", ike).build().is_err());
    }

    #[test]
    fn test_auth_cfgs_keep_order() {
        let mut peer = PeerConfig::builder("cmd", ike_config()).build().unwrap();
        let me = Identity::from_string("alice@example.com");
        let gw = Identity::from_string("vpn.example.com");

        peer.add_auth_cfg(AuthConfig::new(Side::Local, AuthClass::Pubkey, me.clone()));
        peer.add_auth_cfg(AuthConfig::new(Side::Local, AuthClass::Eap, me));
        peer.add_auth_cfg(AuthConfig::new(Side::Remote, AuthClass::Any, gw));

        let local: Vec<AuthClass> = peer.auth_cfgs_for(Side::Local).map(|a| a.class).collect();
        assert_eq!(local, vec![AuthClass::Pubkey, AuthClass::Eap]);
        assert_eq!(peer.auth_cfgs_for(Side::Remote).count(), 1);
        assert_eq!(peer.auth_cfgs().len(), 3);
    }
}
