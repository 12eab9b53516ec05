//! # ikecmd Platform
//!
//! Runtime services the ikecmd connection core relies on, independent of any
//! IKE configuration type.
//!
//! This crate provides:
//! - Unified error types (`PlatformError`, `PlatformResult`)
//! - A priority-ordered job processor running one-shot deferred work on tokio
//! - A handle for asking the owning process to shut down
//!
//! # Examples
//!
//! ```
//! use ikecmd_platform::{JobPriority, Processor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ikecmd_platform::PlatformResult<()> {
//! let processor = Processor::new();
//! processor.queue_job(JobPriority::Critical, async {
//!     println!("runs exactly once");
//! })?;
//! assert_eq!(processor.run_until_idle().await, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod process;
pub mod processor;

pub use error::{PlatformError, PlatformResult};
pub use process::{ProcessHandle, Termination, TerminationListener};
pub use processor::{JobPriority, Processor};
