//! Core error types

use thiserror::Error;

use crate::params::ValidationErrors;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Crate-level error.
#[derive(Error, Debug)]
pub enum StudioError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A schema declaration broke one of its invariants
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// No schema registered under the requested id
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Raw input rejected by the request validator
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(String),

    /// Tracing subscriber could not be installed
    #[error("Telemetry initialization failed: {0}")]
    TelemetryInit(String),
}

impl StudioError {
    /// Returns the batched violations when this is a validation error.
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Invariant violations raised while building a `ModelSchema`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("parameter `{key}`: enum options must not be empty")]
    EmptyOptions { key: String },

    #[error("parameter `{key}`: default {default} is not one of the enum options")]
    DefaultNotInOptions {
        key: String,
        default: serde_json::Value,
    },

    #[error("parameter `{key}`: default {default} does not match type `{expected}`")]
    DefaultTypeMismatch {
        key: String,
        expected: String,
        default: serde_json::Value,
    },

    #[error("parameter `{key}`: min {min} is greater than max {max}")]
    InvertedBounds { key: String, min: f64, max: f64 },

    #[error("parameter `{key}`: invalid pattern: {reason}")]
    InvalidPattern { key: String, reason: String },

    #[error("parameter `{key}`: unknown type `{type_name}`")]
    UnknownType { key: String, type_name: String },

    #[error("schema `{schema}`: duplicate parameter key `{key}`")]
    DuplicateKey { schema: String, key: String },

    #[error("duplicate model id `{0}`")]
    DuplicateModel(String),
}

/// Failures of the durable remote store or the local cache.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Http(String),

    #[error("store rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode store payload: {0}")]
    Decode(String),

    #[error("cache IO error: {0}")]
    Io(String),

    #[error("remote store disabled: {0}")]
    Disabled(String),
}
