//! Catcher domain logic.
//!
//! Holds everything about the job lifecycle that does not touch the
//! database: the status vocabulary and retry rule, URL validation, and the
//! processor layer that matches URLs to external commands and runs them.

pub mod error;
pub mod job;
pub mod paths;
pub mod processing;
pub mod types;
