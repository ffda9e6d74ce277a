//! Generation provider abstraction
//!
//! A [`GenerationProvider`] turns a model id and a validated parameter map
//! into generated images. Implementations report raw failures as
//! [`ProviderError`]; turning those into user-facing outcomes is the job of
//! [`crate::executors`].

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::GenerationOutput;

pub mod fal;

pub use fal::{FalClient, FalConfig};

/// Intermediate status reported while a request waits in the provider queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueUpdate {
    InQueue { position: Option<u32> },
    InProgress { logs: Vec<String> },
    Completed { logs: Vec<String> },
}

impl QueueUpdate {
    pub fn status(&self) -> &'static str {
        match self {
            Self::InQueue { .. } => "IN_QUEUE",
            Self::InProgress { .. } => "IN_PROGRESS",
            Self::Completed { .. } => "COMPLETED",
        }
    }
}

/// Observer for queue updates; called in the order the provider reports them.
pub type ProgressObserver<'a> = &'a (dyn Fn(&QueueUpdate) + Send + Sync);

/// Successful provider exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub request_id: String,
    pub output: GenerationOutput,
}

/// Raw provider failure.
///
/// `status` and `body` are present when the provider answered with an HTTP
/// error; transport failures only carry a message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub message: String,
}

impl ProviderError {
    pub fn api(status: u16, body: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// `detail` text of the error body, if it is a string.
    pub fn detail(&self) -> Option<&str> {
        self.body.as_ref()?.get("detail")?.as_str()
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status == 429 || (500..=599).contains(&status),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::api(status.as_u16(), None, err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Submit one generation and wait for its result.
    async fn subscribe(
        &self,
        model_id: &str,
        input: &Map<String, Value>,
        credentials: &SecretString,
        on_update: Option<ProgressObserver<'_>>,
    ) -> Result<ProviderResponse, ProviderError>;
}
