//! IKE connection setup for a single command-line connection
//!
//! This module covers everything between parsed command-line options and
//! the daemon's connection controller:
//!
//! - **Traffic selectors** - ordered local/remote selector sets with
//!   defaulting rules
//! - **Profiles** - named profiles mapped to an IKE version and an ordered
//!   list of authentication rounds
//! - **Configuration** - IKE, peer, authentication and child configuration
//!   objects with builders
//! - **Initiation** - a one-shot job that hands the configuration to the
//!   controller and terminates the process on failure
//!
//! # Architecture
//!
//! ```text
//! CLI options
//!   └── ConnectionBuilder::handle()
//!        ↓ schedule() at JobPriority::Critical
//! InitiateJob
//!   ├── PeerConfig   (IkeConfig, AuthConfig rounds from the Profile)
//!   ├── ChildConfig  (drained TrafficSelectorSets)
//!   └── Controller::initiate()
//!        ↓ on error
//! ProcessHandle::terminate()
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use ikecmd_platform::{ProcessHandle, Processor};
//! use ikecmd_proto::ipsec::{
//!     ChildConfig, CmdOption, ConnectionBuilder, Controller, Daemon, InitiateListener,
//!     PeerConfig, Result, StaticSocket,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Accept;
//!
//! #[async_trait]
//! impl Controller for Accept {
//!     async fn initiate(
//!         &self,
//!         _peer: Arc<PeerConfig>,
//!         _child: Arc<ChildConfig>,
//!         _listener: &dyn InitiateListener,
//!         _timeout: Option<Duration>,
//!     ) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut builder = ConnectionBuilder::new();
//!     builder.handle(CmdOption::Host, "vpn.example.com")?;
//!     builder.handle(CmdOption::Identity, "alice@example.com")?;
//!     builder.handle(CmdOption::RemoteTs, "10.0.0.0/8")?;
//!
//!     let processor = Processor::new();
//!     let (process, _listener) = ProcessHandle::capture();
//!     let daemon = Daemon::new(Arc::new(Accept), Arc::new(StaticSocket::default()));
//!
//!     builder.schedule(&processor, daemon, process)?;
//!     processor.run_until_idle().await;
//!     Ok(())
//! }
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 2409](https://datatracker.ietf.org/doc/html/rfc2409) - IKEv1 Protocol
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - NAT Traversal

pub mod child_cfg;
pub mod config;
pub mod connection;
pub mod controller;
pub mod dpd;
pub mod error;
pub mod initiate;
pub mod logging;
pub mod nat;
pub mod profile;
pub mod proposal;
pub mod ts;

// Re-export commonly used types
pub use child_cfg::{ChildConfig, IpsecMode, LifetimeConfig};
pub use config::{AuthConfig, IdType, Identity, IkeConfig, PeerConfig};
pub use connection::{CmdOption, ConnectionBuilder};
pub use controller::{Controller, Daemon, InitiateListener, LocalSocket, NoopListener, StaticSocket};
pub use error::{Error, Result};
pub use initiate::InitiateJob;
pub use profile::{AuthClass, IkeVersion, Profile, ResolvedProfile, Side};
pub use proposal::{Proposal, ProtocolId};
pub use ts::{TrafficSelector, TrafficSelectorSet};
