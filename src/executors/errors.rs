//! Provider failure classification
//!
//! Balance exhaustion is detected with a best-effort heuristic over the
//! structured error and, failing that, over its flattened message. The
//! checks run in a fixed order:
//!
//! 1. HTTP 403 with a body `detail` containing the marker
//! 2. a message mentioning both `403` and the marker
//! 3. a JSON object embedded in the message whose `detail` contains the marker
//!
//! Anything else is a generic failure carrying the provider message.

use serde_json::Value;

use super::image::{ErrorCode, GenerationFailure};
use crate::providers::ProviderError;

/// Text fal.ai puts in the error detail when the account is out of credit.
pub const BALANCE_EXHAUSTED_MARKER: &str = "Exhausted balance";

pub const BALANCE_EXHAUSTED_MESSAGE: &str =
    "Your fal.ai account balance is exhausted. Top up at fal.ai/dashboard/billing and try again.";

pub const MISSING_CREDENTIAL_MESSAGE: &str = "Set your fal.ai API key before generating images.";

pub const NO_IMAGE_MESSAGE: &str = "no image generated";

/// Used when the provider error carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "image generation failed";

/// Map a raw provider failure onto the stable failure taxonomy.
pub fn classify_provider_error(err: &ProviderError) -> GenerationFailure {
    if is_balance_exhausted(err) {
        return GenerationFailure::new(BALANCE_EXHAUSTED_MESSAGE, Some(ErrorCode::BalanceExhausted));
    }
    if err.message.trim().is_empty() {
        GenerationFailure::new(GENERIC_FAILURE_MESSAGE, None)
    } else {
        GenerationFailure::new(err.message.clone(), None)
    }
}

fn is_balance_exhausted(err: &ProviderError) -> bool {
    if err.status == Some(403)
        && err
            .detail()
            .is_some_and(|detail| detail.contains(BALANCE_EXHAUSTED_MARKER))
    {
        return true;
    }

    let message = err.message.as_str();
    if message.contains("403") && message.contains(BALANCE_EXHAUSTED_MARKER) {
        return true;
    }

    embedded_detail(message).is_some_and(|detail| detail.contains(BALANCE_EXHAUSTED_MARKER))
}

/// `detail` of the JSON object spanning the first `{` to the last `}`.
fn embedded_detail(message: &str) -> Option<String> {
    let start = message.find('{')?;
    let end = message.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&message[start..=end]) {
        Ok(json) => json.get("detail")?.as_str().map(str::to_string),
        Err(e) => {
            tracing::debug!(error = %e, "provider error message embeds no parsable JSON");
            None
        }
    }
}
