//! URL processors: matching a job's URL to an external command and running it.
//!
//! All subprocess and filesystem work is pure (no DB access) and lives in the
//! `core` crate so it can be tested without a database. The worker owns the
//! job state transitions around it.

pub mod command;
pub mod config;
pub mod executor;
pub mod registry;
pub mod relocate;
pub mod subprocess;

pub use command::CommandProcessor;
pub use config::{ProcessorConfig, ProcessorConfigError};
pub use executor::{ProcessError, ProcessRequest, UrlProcessor};
pub use registry::ProcessorRegistry;
