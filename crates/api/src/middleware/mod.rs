//! Request extractors that guard handlers.
//!
//! - [`signature::SignedBody`] -- Request body verified against the webhook secret.

pub mod signature;
