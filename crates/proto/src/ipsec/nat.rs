//! NAT Traversal port selection
//!
//! IKE normally runs on UDP 500. With NAT-T (RFC 3948) both peers float to
//! UDP 4500, where IKE messages carry a four byte non-ESP marker.
//!
//! When the local IKE socket is not bound to port 500 (another daemon owns
//! it, or the tool runs unprivileged on a high port), messages from that
//! port cannot be answered on 500 in a meaningful way, so the connection is
//! started directly on the peer's NAT-T port.
//!
//! # References
//!
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - UDP Encapsulation
//! - [RFC 7296 Section 2.23](https://datatracker.ietf.org/doc/html/rfc7296#section-2.23) - NAT Traversal

/// Default IKE port (UDP 500)
pub const IKE_PORT: u16 = 500;

/// NAT-T port (UDP 4500)
pub const NAT_T_PORT: u16 = 4500;

/// Remote port to contact given the locally bound IKE port.
pub fn remote_port_for(local_port: u16) -> u16 {
    if local_port == IKE_PORT {
        IKE_PORT
    } else {
        NAT_T_PORT
    }
}
