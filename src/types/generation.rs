//! Generation history records

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::image::GenerationOutput;
use super::schema::ModelSchema;

/// One completed generation, as kept in the remote store and the local cache.
///
/// Records are immutable once created. `is_current_user` is derived on read
/// from the active session and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    pub model_id: String,
    pub model_name: String,
    pub prompt: String,
    pub parameters: Map<String, Value>,
    pub output: GenerationOutput,
    /// Creation instant (epoch milliseconds on the wire)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Owner; stamped from the session when the record is saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip)]
    pub is_current_user: bool,
}

impl GenerationRecord {
    /// Create a record for a successful generation with a fresh identifier.
    ///
    /// The prompt is taken from the `prompt` parameter when present.
    pub fn new(schema: &ModelSchema, parameters: Map<String, Value>, output: GenerationOutput) -> Self {
        let prompt = parameters
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            model_id: schema.id().to_string(),
            model_name: schema.name().to_string(),
            prompt,
            parameters,
            output,
            timestamp: Utc::now().trunc_subsecs(3),
            user_id: None,
            is_current_user: false,
        }
    }

    /// Set `is_current_user` against the given session identity.
    pub fn mark_owner(&mut self, session_user: &str) {
        self.is_current_user = self.user_id.as_deref() == Some(session_user);
    }
}
