//! flux-studio
//!
//! Schema-driven image generation against the fal.ai queue, with a generation
//! history kept in a remote store and reconciled with a per-device cache.
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod executors;
pub mod history;
pub mod params;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod studio;
pub mod telemetry;
pub mod types;

pub use config::{StudioConfig, StudioConfigBuilder, SupabaseConfig};
pub use error::{Result, SchemaError, StoreError, StudioError};
pub use executors::{ErrorCode, GenerationFailure, GenerationInvoker, GenerationOutcome, GenerationSuccess};
pub use history::{FetchOptions, HistoryContext, HistoryReconciler, SessionIdentity};
pub use params::{ValidationErrors, Violation, validate_input};
pub use providers::{GenerationProvider, ProviderError, QueueUpdate};
pub use registry::SchemaRegistry;
pub use studio::{GenerationRun, Studio};
pub use types::{GenerationOutput, GenerationRecord, Image, ModelSchema, ParameterSpec, ParameterType};
