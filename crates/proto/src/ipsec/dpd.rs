//! Dead Peer Detection (DPD) settings
//!
//! Liveness probing itself runs inside the daemon (RFC 3706 for IKEv1,
//! empty INFORMATIONAL exchanges for IKEv2). This module only carries the
//! timers handed to it.
//!
//! # References
//!
//! - [RFC 3706](https://datatracker.ietf.org/doc/html/rfc3706) - Dead Peer Detection

use std::time::Duration;

/// DPD delay used for command-line connections (30 seconds)
pub const DEFAULT_DPD_DELAY: Duration = Duration::from_secs(30);

/// DPD Configuration
///
/// A zero `delay` disables probing. A zero `timeout` means the daemon relies
/// on its regular retransmission logic instead of a separate DPD timeout
/// (the only behaviour available with IKEv2).
///
/// # Example
///
/// ```rust
/// use ikecmd_proto::ipsec::dpd::DpdConfig;
/// use std::time::Duration;
///
/// let config = DpdConfig::new(Duration::from_secs(30), Duration::ZERO);
/// assert!(config.is_enabled());
/// assert!(!config.has_timeout());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DpdConfig {
    /// Idle time after which a liveness check is sent
    pub delay: Duration,

    /// Time after which an unresponsive peer is declared dead (IKEv1 only)
    pub timeout: Duration,
}

impl Default for DpdConfig {
    fn default() -> Self {
        DpdConfig {
            delay: DEFAULT_DPD_DELAY,
            timeout: Duration::ZERO,
        }
    }
}

impl DpdConfig {
    /// Create new DPD configuration
    pub fn new(delay: Duration, timeout: Duration) -> Self {
        DpdConfig { delay, timeout }
    }

    /// Whether liveness checks are sent at all
    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Whether a dedicated DPD timeout is configured
    pub fn has_timeout(&self) -> bool {
        !self.timeout.is_zero()
    }
}
