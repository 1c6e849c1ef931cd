//! Stockgate Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing used by every Stockgate workspace member.
//!
//! # Overview
//!
//! - **Error Handling**: the [`CommonError`] type and [`Result`] alias used by
//!   configuration loading and logging setup
//! - **Logging**: centralized `tracing` subscriber initialization
//!
//! # Example
//!
//! ```no_run
//! use stockgate_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> stockgate_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("control plane starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
