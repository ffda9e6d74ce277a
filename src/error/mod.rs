//! Error handling types for flux-studio.
//!
//! - `StudioError`: crate-level failures surfaced to callers
//! - `SchemaError`: invariant violations while declaring model schemas
//! - `StoreError`: history store failures (always absorbed by the reconciler)
//!
//! Field-level validation failures live in [`crate::params`] and provider
//! failures are classified into [`crate::executors::GenerationOutcome`].

mod conversions;
pub mod types;

pub use types::*;
