//! fal.ai queue provider
//!
//! Requests go through the fal queue API: submit, poll the status URL until
//! the request completes, then fetch the result.

mod client;
mod types;

pub use client::{FalClient, FalConfig};
