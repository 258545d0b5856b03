//! Request handlers.
//!
//! Handlers delegate to [`catcher_worker::JobService`] and map errors via
//! [`AppError`](crate::error::AppError).

pub mod jobs;
