//! Error types for ikecmd platform services

use thiserror::Error;

/// Unified error type for platform operations
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job processor no longer accepts work
    #[error("Job processor is shut down")]
    ProcessorClosed,

    /// Nobody is listening for termination requests anymore
    #[error("Process {0} is no longer reachable")]
    ProcessGone(u32),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
