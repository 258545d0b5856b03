//! Job orchestration and the polling worker.
//!
//! [`JobService`] is the only path by which the HTTP layer and the worker
//! touch job state; [`Worker`] drives pending jobs through their processors.

pub mod service;
pub mod worker;

pub use service::{JobService, ServiceError};
pub use worker::{Worker, WorkerConfig};
