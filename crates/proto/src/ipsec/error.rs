//! Error types for connection setup
//!
//! Every error here is fatal to the command-line tool: there is one
//! connection attempt per invocation and no degraded mode.

use super::profile::Profile;
use ikecmd_platform::PlatformError;
use thiserror::Error;

/// Result type for connection setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Connection setup errors
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory option (`--host`, `--identity`) was never given
    #[error("unable to initiate, missing {0} option")]
    MissingRequiredOption(&'static str),

    /// Traffic selector text could not be parsed
    #[error("invalid traffic selector: {0}")]
    InvalidSelector(String),

    /// Profile name is not one of the supported connection profiles
    #[error("unknown connection profile: {0}")]
    UnknownProfile(String),

    /// Profile authenticates with a local key, but none was supplied
    #[error("missing private key for profile {0}")]
    MissingCredential(Profile),

    /// The controller could not establish the connection
    #[error("controller failed to initiate: {0}")]
    ControllerFailure(String),

    /// Invalid configuration parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Job scheduling or process control failed
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
