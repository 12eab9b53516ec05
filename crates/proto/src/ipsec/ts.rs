//! Traffic selectors
//!
//! A traffic selector describes the traffic a Child SA protects: an address
//! range, a port range and an IP protocol (RFC 7296 Section 3.13.1).
//!
//! Selectors are collected per side in a [`TrafficSelectorSet`] while
//! options are handled, and drained into the child configuration when the
//! connection is assembled. Draining moves the selectors out; the set is
//! left empty.
//!
//! # Accepted text forms
//!
//! ```text
//! 10.1.0.0/16            CIDR subnet
//! fec1::/64              IPv6 CIDR subnet
//! 192.168.1.5            single host
//! 10.0.0.10-10.0.0.20    explicit range (same family, start <= end)
//! ```

use super::{Error, Result};
use ipnet::IpNet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// IP protocol "any"
pub const PROTO_ANY: u8 = 0;

/// Lowest port of the full port range
pub const PORT_MIN: u16 = 0;

/// Highest port of the full port range
pub const PORT_MAX: u16 = 65535;

/// Traffic selector type (RFC 7296 Section 3.13.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TsType {
    /// TS_IPV4_ADDR_RANGE
    Ipv4AddrRange,
    /// TS_IPV6_ADDR_RANGE
    Ipv6AddrRange,
}

impl TsType {
    fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => TsType::Ipv4AddrRange,
            IpAddr::V6(_) => TsType::Ipv6AddrRange,
        }
    }

    fn width(self) -> u32 {
        match self {
            TsType::Ipv4AddrRange => 32,
            TsType::Ipv6AddrRange => 128,
        }
    }
}

/// A single traffic selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrafficSelector {
    ts_type: TsType,
    protocol: u8,
    start_addr: IpAddr,
    end_addr: IpAddr,
    start_port: u16,
    end_port: u16,
    dynamic: bool,
}

impl TrafficSelector {
    /// Create a selector for an address range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the addresses belong to
    /// different families, or a range ends before it starts.
    pub fn new(
        start_addr: IpAddr,
        end_addr: IpAddr,
        protocol: u8,
        start_port: u16,
        end_port: u16,
    ) -> Result<Self> {
        let ts_type = TsType::of(&start_addr);
        if ts_type != TsType::of(&end_addr) {
            return Err(Error::InvalidSelector(format!(
                "{}-{} mixes address families",
                start_addr, end_addr
            )));
        }
        if addr_bits(&start_addr) > addr_bits(&end_addr) {
            return Err(Error::InvalidSelector(format!(
                "{}-{} ends before it starts",
                start_addr, end_addr
            )));
        }
        if start_port > end_port {
            return Err(Error::InvalidSelector(format!(
                "port range {}-{} ends before it starts",
                start_port, end_port
            )));
        }

        Ok(TrafficSelector {
            ts_type,
            protocol,
            start_addr,
            end_addr,
            start_port,
            end_port,
            dynamic: false,
        })
    }

    /// Create a selector from CIDR, single address or range text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] for anything that does not parse.
    pub fn from_cidr(text: &str, protocol: u8, start_port: u16, end_port: u16) -> Result<Self> {
        let text = text.trim();
        let invalid = || Error::InvalidSelector(text.to_string());

        if let Some((from, to)) = text.split_once('-') {
            let from: IpAddr = from.trim().parse().map_err(|_| invalid())?;
            let to: IpAddr = to.trim().parse().map_err(|_| invalid())?;
            return Self::new(from, to, protocol, start_port, end_port);
        }
        if let Ok(net) = text.parse::<IpNet>() {
            return Self::new(net.network(), net.broadcast(), protocol, start_port, end_port);
        }
        if let Ok(addr) = text.parse::<IpAddr>() {
            return Self::new(addr, addr, protocol, start_port, end_port);
        }

        Err(invalid())
    }

    /// Create a selector standing in for the virtual IP assigned at
    /// negotiation time.
    ///
    /// Until the peer assigns an address the selector covers the whole IPv4
    /// space; the daemon narrows it to the assigned address.
    pub fn dynamic(protocol: u8, start_port: u16, end_port: u16) -> Self {
        TrafficSelector {
            ts_type: TsType::Ipv4AddrRange,
            protocol,
            start_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            end_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            start_port,
            end_port,
            dynamic: true,
        }
    }

    /// Any IPv4 address, any port, any protocol
    pub fn ipv4_any() -> Self {
        TrafficSelector {
            ts_type: TsType::Ipv4AddrRange,
            protocol: PROTO_ANY,
            start_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            end_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            start_port: PORT_MIN,
            end_port: PORT_MAX,
            dynamic: false,
        }
    }

    /// Selector type
    pub fn ts_type(&self) -> TsType {
        self.ts_type
    }

    /// IP protocol, 0 for any
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// First address of the range
    pub fn start_addr(&self) -> IpAddr {
        self.start_addr
    }

    /// Last address of the range
    pub fn end_addr(&self) -> IpAddr {
        self.end_addr
    }

    /// First port of the range
    pub fn start_port(&self) -> u16 {
        self.start_port
    }

    /// Last port of the range
    pub fn end_port(&self) -> u16 {
        self.end_port
    }

    /// Whether the selector is resolved to the virtual IP at runtime
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Whether the selector spans every port
    pub fn is_any_port(&self) -> bool {
        self.start_port == PORT_MIN && self.end_port == PORT_MAX
    }

    /// Prefix length if the address range is exactly one subnet.
    pub fn prefix_len(&self) -> Option<u8> {
        let start = addr_bits(&self.start_addr);
        let end = addr_bits(&self.end_addr);
        let span = start ^ end;

        // span must be a run of low one bits not overlapping the network part
        if span & span.wrapping_add(1) != 0 || start & span != 0 {
            return None;
        }
        let host_bits = 128 - span.leading_zeros();
        Some((self.ts_type.width() - host_bits) as u8)
    }
}

impl FromStr for TrafficSelector {
    type Err = Error;

    /// Parses with protocol "any" and the full port range.
    fn from_str(s: &str) -> Result<Self> {
        TrafficSelector::from_cidr(s, PROTO_ANY, PORT_MIN, PORT_MAX)
    }
}

impl fmt::Display for TrafficSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dynamic {
            write!(f, "dynamic")?;
        } else {
            match self.prefix_len() {
                Some(prefix) => write!(f, "{}/{}", self.start_addr, prefix)?,
                None => write!(f, "{}..{}", self.start_addr, self.end_addr)?,
            }
        }

        if self.protocol == PROTO_ANY && self.is_any_port() {
            return Ok(());
        }
        if self.is_any_port() {
            write!(f, "[{}]", self.protocol)
        } else if self.start_port == self.end_port {
            write!(f, "[{}/{}]", self.protocol, self.start_port)
        } else {
            write!(f, "[{}/{}-{}]", self.protocol, self.start_port, self.end_port)
        }
    }
}

fn addr_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// Ordered selectors for one side of the connection.
///
/// Insertion order is kept; nothing is sorted or merged.
#[derive(Debug, Clone, Default)]
pub struct TrafficSelectorSet {
    selectors: Vec<TrafficSelector>,
    fallback: Option<TrafficSelector>,
}

impl TrafficSelectorSet {
    /// Local set, seeded with the dynamic virtual IP selector.
    pub fn local() -> Self {
        TrafficSelectorSet {
            selectors: vec![TrafficSelector::dynamic(PROTO_ANY, PORT_MIN, PORT_MAX)],
            fallback: None,
        }
    }

    /// Remote set, falling back to any IPv4 address when left empty.
    pub fn remote() -> Self {
        TrafficSelectorSet {
            selectors: Vec::new(),
            fallback: Some(TrafficSelector::ipv4_any()),
        }
    }

    /// Parse `text` and append it, covering all ports for any protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] and leaves the set untouched if
    /// `text` does not parse.
    pub fn add_from_cidr(&mut self, text: &str) -> Result<()> {
        let ts = TrafficSelector::from_cidr(text, PROTO_ANY, PORT_MIN, PORT_MAX)?;
        self.push(ts);
        Ok(())
    }

    /// Append an already constructed selector.
    pub fn push(&mut self, ts: TrafficSelector) {
        self.selectors.push(ts);
    }

    /// Number of selectors currently held
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Whether the set currently holds no selectors
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TrafficSelector> {
        self.selectors.iter()
    }

    /// Move every selector out, in insertion order.
    ///
    /// An empty set with a fallback yields the fallback instead. The set is
    /// always empty afterwards.
    pub fn drain(&mut self) -> Vec<TrafficSelector> {
        let drained = std::mem::take(&mut self.selectors);
        match (&self.fallback, drained.is_empty()) {
            (Some(fallback), true) => vec![fallback.clone()],
            _ => drained,
        }
    }
}
