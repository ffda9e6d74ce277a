//! Durable multi-device history store
//!
//! [`SupabaseStore`] talks to the PostgREST endpoint of a Supabase project and
//! expects a `generations` table with the columns of [`GenerationRow`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StudioError};
use crate::types::{GenerationOutput, GenerationRecord};

pub const GENERATIONS_TABLE: &str = "generations";

/// Row layout of the `generations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRow {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub model_id: String,
    pub model_name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub output: GenerationOutput,
    pub created_at: DateTime<Utc>,
}

impl GenerationRow {
    pub fn from_record(record: &GenerationRecord, owner: &str) -> Self {
        Self {
            id: record.id.clone(),
            user_id: Some(owner.to_string()),
            model_id: record.model_id.clone(),
            model_name: record.model_name.clone(),
            prompt: record.prompt.clone(),
            parameters: record.parameters.clone(),
            output: record.output.clone(),
            created_at: record.timestamp,
        }
    }

    pub fn into_record(self, session_user: &str) -> GenerationRecord {
        let mut record = GenerationRecord {
            id: self.id,
            model_id: self.model_id,
            model_name: self.model_name,
            prompt: self.prompt,
            parameters: self.parameters,
            output: self.output,
            timestamp: self.created_at,
            user_id: self.user_id,
            is_current_user: false,
        };
        record.mark_owner(session_user);
        record
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn insert(&self, row: &GenerationRow) -> Result<(), StoreError>;

    /// Newest-first rows, at most `limit`, optionally restricted to `owner`.
    async fn select_recent(&self, limit: usize, owner: Option<&str>) -> Result<Vec<GenerationRow>, StoreError>;

    /// Delete one row, only if it belongs to `owner`.
    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError>;

    /// Delete every row belonging to `owner`.
    async fn delete_owned(&self, owner: &str) -> Result<(), StoreError>;
}

/// PostgREST client for a Supabase project.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, anon_key: SecretString) -> Result<Self, StudioError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http_client(http, base_url, anon_key))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>, anon_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            anon_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), GENERATIONS_TABLE)
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let key = self.anon_key.expose_secret();
        let invalid =
            |_: InvalidHeaderValue| StoreError::Http("Supabase key contains characters not allowed in a header".into());

        let mut apikey = HeaderValue::from_str(key).map_err(invalid)?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), apikey);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = request.headers(self.headers()?).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn insert(&self, row: &GenerationRow) -> Result<(), StoreError> {
        let request = self
            .http
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(row);
        self.execute(request).await?;
        tracing::debug!(id = %row.id, "inserted generation row");
        Ok(())
    }

    async fn select_recent(&self, limit: usize, owner: Option<&str>) -> Result<Vec<GenerationRow>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("user_id", format!("eq.{owner}")));
        }
        let resp = self.execute(self.http.get(self.table_url()).query(&query)).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        let query = [("id", format!("eq.{id}")), ("user_id", format!("eq.{owner}"))];
        self.execute(self.http.delete(self.table_url()).query(&query)).await?;
        Ok(())
    }

    async fn delete_owned(&self, owner: &str) -> Result<(), StoreError> {
        let query = [("user_id", format!("eq.{owner}"))];
        self.execute(self.http.delete(self.table_url()).query(&query)).await?;
        Ok(())
    }
}

/// Stand-in used when no remote store is configured; every call fails with
/// [`StoreError::Disabled`], so history falls back to the local cache.
#[derive(Debug, Clone, Default)]
pub struct DisabledStore;

impl DisabledStore {
    fn disabled<T>() -> Result<T, StoreError> {
        Err(StoreError::Disabled("no Supabase project configured".into()))
    }
}

#[async_trait]
impl RemoteStore for DisabledStore {
    async fn insert(&self, _row: &GenerationRow) -> Result<(), StoreError> {
        Self::disabled()
    }

    async fn select_recent(&self, _limit: usize, _owner: Option<&str>) -> Result<Vec<GenerationRow>, StoreError> {
        Self::disabled()
    }

    async fn delete(&self, _id: &str, _owner: &str) -> Result<(), StoreError> {
        Self::disabled()
    }

    async fn delete_owned(&self, _owner: &str) -> Result<(), StoreError> {
        Self::disabled()
    }
}
