//! Catcher HTTP server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! signature verification) so integration tests and the `catcher` binary
//! share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
