//! Structured logging for connection setup
//!
//! One function per event, each emitting a `tracing` event with the
//! relevant context fields.
//!
//! # Log Levels
//!
//! - **DEBUG**: Individual options and selectors
//! - **INFO**: Profile resolution, configuration assembly, initiation
//! - **ERROR**: Fatal setup and controller failures
//!
//! # Example
//!
//! ```no_run
//! use ikecmd_proto::ipsec::{logging, Profile};
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter("ikecmd_proto::ipsec=debug")
//!     .init();
//!
//! logging::log_initiate_start("vpn.example.com", 4500, Profile::V2Eap);
//! ```

use super::{
    config::PeerConfig,
    connection::CmdOption,
    profile::{Profile, ResolvedProfile},
    Error,
};
use tracing::{debug, error, info};

/// Log an accepted command-line option
pub fn log_option_accepted(option: CmdOption, value: &str) {
    debug!(option = %option, value = value, "Option accepted");
}

/// Log a rejected command-line option
///
/// # Arguments
///
/// * `option` - Option kind
/// * `value` - Raw option value
/// * `error` - Reason for rejection
pub fn log_option_rejected(option: CmdOption, value: &str, error: &Error) {
    error!(
        option = %option,
        value = value,
        error = %error,
        "Option rejected"
    );
}

/// Log profile resolution
///
/// # Arguments
///
/// * `requested` - Profile as requested on the command line
/// * `resolved` - Outcome after inference
pub fn log_profile_resolved(requested: Profile, resolved: &ResolvedProfile) {
    info!(
        requested = %requested,
        profile = %resolved.profile,
        version = %resolved.version,
        auth_rounds = resolved.steps.len(),
        "Connection profile resolved"
    );
}

/// Log assembled peer configuration
pub fn log_config_assembled(peer: &PeerConfig) {
    let ike = peer.ike();
    info!(
        name = peer.name(),
        version = %ike.version,
        local = %format_args!("{}[{}]", ike.local_addr, ike.local_port),
        remote = %format_args!("{}[{}]", ike.remote_addr, ike.remote_port),
        auth_rounds = peer.auth_cfgs().len(),
        children = peer.child_cfgs().len(),
        "Connection configuration assembled"
    );
}

/// Log initiation start
///
/// # Arguments
///
/// * `host` - Remote host as given
/// * `remote_port` - Remote IKE port
/// * `profile` - Requested profile
pub fn log_initiate_start(host: &str, remote_port: u16, profile: Profile) {
    info!(
        host = host,
        remote_port = remote_port,
        profile = %profile,
        "Initiating connection"
    );
}

/// Log successful initiation
pub fn log_initiate_success(host: &str) {
    info!(host = host, "Connection initiated successfully");
}

/// Log failed initiation
pub fn log_initiate_failed(error: &Error) {
    error!(error = %error, "Connection initiation failed");
}
