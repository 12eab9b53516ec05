//! Connection setup for the ikecmd command-line IKE client.
//!
//! This crate turns the handful of connection parameters a user passes on
//! the command line (host, identities, credential presence, traffic
//! selectors, a named profile) into a complete, validated IKE connection
//! configuration and hands it to the connection controller exactly once.
//!
//! # Features
//!
//! - `ipsec` (default) - profile resolution, configuration assembly and the
//!   initiation workflow
//! - `serde` - `Serialize` implementations for the assembled configuration
//!
//! # Example
//!
//! ```rust
//! use ikecmd_proto::ipsec::{CmdOption, ConnectionBuilder, Profile};
//!
//! let mut builder = ConnectionBuilder::new();
//! builder.handle(CmdOption::Host, "vpn.example.com").unwrap();
//! builder.handle(CmdOption::Identity, "alice@example.com").unwrap();
//!
//! let resolved = builder.profile().resolve(builder.key_seen()).unwrap();
//! assert_eq!(resolved.profile, Profile::V2Eap);
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 2409](https://datatracker.ietf.org/doc/html/rfc2409) - IKEv1 Protocol
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - NAT Traversal

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ipsec")]
pub mod ipsec;
