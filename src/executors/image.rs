//! Generation invoker
//!
//! Sends a validated parameter map to a [`GenerationProvider`] and always
//! answers with a [`GenerationOutcome`]; provider failures never escape as
//! errors.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::{MISSING_CREDENTIAL_MESSAGE, NO_IMAGE_MESSAGE, classify_provider_error};
use crate::providers::{GenerationProvider, ProgressObserver};
use crate::types::{Image, ModelSchema};

/// Stable codes for failures callers may want to handle specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingCredential,
    BalanceExhausted,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::BalanceExhausted => "BALANCE_EXHAUSTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSuccess {
    /// First image of the provider response
    pub image: Image,
    pub seed: u64,
    pub request_id: String,
    pub timings: Map<String, Value>,
    #[serde(rename = "has_nsfw_concepts")]
    pub has_nsfw_concepts: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFailure {
    /// Human-readable explanation
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl GenerationFailure {
    pub fn new(message: impl Into<String>, error_code: Option<ErrorCode>) -> Self {
        Self {
            message: message.into(),
            error_code,
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(GenerationSuccess),
    Failure(GenerationFailure),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&GenerationSuccess> {
        match self {
            Self::Success(success) => Some(success),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Success(_) => None,
        }
    }
}

/// Runs generations against a provider.
#[derive(Clone)]
pub struct GenerationInvoker {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerationInvoker {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    /// Generate images for `params`, which must already be validated against
    /// `schema`.
    pub async fn invoke(
        &self,
        schema: &ModelSchema,
        params: &Map<String, Value>,
        credentials: Option<&SecretString>,
        on_update: Option<ProgressObserver<'_>>,
    ) -> GenerationOutcome {
        let Some(credentials) = credentials.filter(|key| !key.expose_secret().trim().is_empty()) else {
            tracing::warn!(model = schema.id(), "no provider credentials configured");
            return GenerationOutcome::Failure(GenerationFailure::new(
                MISSING_CREDENTIAL_MESSAGE,
                Some(ErrorCode::MissingCredential),
            ));
        };

        tracing::debug!(
            provider = self.provider_id(),
            model = schema.id(),
            prompt = %prompt_preview(params),
            "starting generation"
        );

        let response = match self
            .provider
            .subscribe(schema.id(), params, credentials, on_update)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let failure = classify_provider_error(&err);
                tracing::warn!(
                    model = schema.id(),
                    status = ?err.status,
                    code = failure.error_code.map(|c| c.as_str()),
                    error = %err,
                    "generation failed"
                );
                return GenerationOutcome::Failure(failure);
            }
        };

        let output = response.output;
        let Some(image) = output.images.into_iter().next() else {
            tracing::warn!(model = schema.id(), request_id = %response.request_id, "provider returned no image");
            return GenerationOutcome::Failure(GenerationFailure::new(NO_IMAGE_MESSAGE, None));
        };

        tracing::info!(
            model = schema.id(),
            request_id = %response.request_id,
            seed = output.seed,
            "generation completed"
        );
        GenerationOutcome::Success(GenerationSuccess {
            image,
            seed: output.seed,
            request_id: response.request_id,
            timings: output.timings,
            has_nsfw_concepts: output.has_nsfw_concepts,
        })
    }
}

/// First 50 characters of the prompt, for logs.
fn prompt_preview(params: &Map<String, Value>) -> String {
    let prompt = params.get("prompt").and_then(Value::as_str).unwrap_or_default();
    let mut preview: String = prompt.chars().take(50).collect();
    if prompt.chars().count() > 50 {
        preview.push_str("...");
    }
    preview
}
