//! Studio facade
//!
//! Wires the schema registry, the generation invoker and the history
//! reconciler together for the usual generate-then-record flow.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::executors::{GenerationInvoker, GenerationOutcome};
use crate::history::{
    DisabledStore, FetchOptions, FileCache, HistoryContext, HistoryReconciler, RemoteStore, SessionIdentity,
    SupabaseStore,
};
use crate::params::validate_input;
use crate::providers::{FalClient, GenerationProvider, ProgressObserver};
use crate::registry::SchemaRegistry;
use crate::types::{GenerationOutput, GenerationRecord, ModelSchema};

/// Result of [`Studio::generate`]: the invocation outcome and, on success,
/// the history record that was saved for it.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub outcome: GenerationOutcome,
    pub record: Option<GenerationRecord>,
}

pub struct Studio {
    registry: SchemaRegistry,
    invoker: GenerationInvoker,
    reconciler: HistoryReconciler,
    context: HistoryContext,
    fal_key: Option<SecretString>,
    fetch_limit: usize,
}

impl Studio {
    /// Build a studio backed by fal.ai, Supabase (when configured) and the
    /// file cache under the configured data directory.
    pub async fn from_config(config: StudioConfig) -> Result<Self> {
        let mut registry = SchemaRegistry::builtin()?;
        if let Some(path) = &config.schema_file {
            let added = registry.extend_from_file(path).await?;
            tracing::info!(path = %path.display(), added, "registered extra model schemas");
        }

        let provider: Arc<dyn GenerationProvider> = Arc::new(FalClient::new(config.fal.clone())?);
        let remote: Arc<dyn RemoteStore> = match &config.supabase {
            Some(supabase) => Arc::new(SupabaseStore::new(supabase.url.clone(), supabase.anon_key.clone())?),
            None => {
                tracing::info!("no Supabase project configured, history is local only");
                Arc::new(DisabledStore)
            }
        };

        let session = SessionIdentity::load_or_create(config.user_id_path())
            .await
            .map_err(|e| StudioError::Io(e.to_string()))?;
        let context = HistoryContext::new(session, Arc::new(FileCache::new(config.cache_path())));

        Ok(Self::with_components(
            registry,
            provider,
            remote,
            context,
            config.fal_key,
            config.fetch_limit,
        ))
    }

    pub fn with_components(
        registry: SchemaRegistry,
        provider: Arc<dyn GenerationProvider>,
        remote: Arc<dyn RemoteStore>,
        context: HistoryContext,
        fal_key: Option<SecretString>,
        fetch_limit: usize,
    ) -> Self {
        Self {
            registry,
            invoker: GenerationInvoker::new(provider),
            reconciler: HistoryReconciler::new(remote),
            context,
            fal_key,
            fetch_limit,
        }
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.registry.iter()
    }

    pub fn model(&self, id: &str) -> Option<&ModelSchema> {
        self.registry.get(id)
    }

    pub fn context(&self) -> &HistoryContext {
        &self.context
    }

    /// Validate `raw` against the schema of `model_id`.
    pub fn prepare(&self, model_id: &str, raw: &Map<String, Value>) -> Result<Map<String, Value>> {
        let schema = self.schema(model_id)?;
        Ok(validate_input(schema, raw)?)
    }

    /// Validate, generate, and record a successful generation in history.
    ///
    /// Unknown models and invalid input are errors; provider failures come
    /// back as a failure outcome.
    pub async fn generate(
        &self,
        model_id: &str,
        raw: &Map<String, Value>,
        on_update: Option<ProgressObserver<'_>>,
    ) -> Result<GenerationRun> {
        let schema = self.schema(model_id)?;
        let params = validate_input(schema, raw)?;

        let outcome = self
            .invoker
            .invoke(schema, &params, self.fal_key.as_ref(), on_update)
            .await;

        let record = match &outcome {
            GenerationOutcome::Success(success) => {
                let output = GenerationOutput {
                    images: vec![success.image.clone()],
                    timings: success.timings.clone(),
                    seed: success.seed,
                    has_nsfw_concepts: success.has_nsfw_concepts.first().copied().into_iter().collect(),
                };
                let record = GenerationRecord::new(schema, params, output);
                Some(self.reconciler.save(&self.context, record).await)
            }
            GenerationOutcome::Failure(_) => None,
        };

        Ok(GenerationRun { outcome, record })
    }

    /// Recent history, newest first; `limit` defaults to the configured
    /// fetch limit.
    pub async fn history(&self, limit: Option<usize>, current_user_only: bool) -> Vec<GenerationRecord> {
        let options = FetchOptions::default()
            .with_limit(limit.unwrap_or(self.fetch_limit))
            .current_user_only(current_user_only);
        self.reconciler.fetch(&self.context, options).await
    }

    pub async fn delete(&self, id: &str) {
        self.reconciler.delete(&self.context, id).await;
    }

    pub async fn clear_history(&self) {
        self.reconciler.clear_all(&self.context).await;
    }

    fn schema(&self, model_id: &str) -> Result<&ModelSchema> {
        self.registry
            .get(model_id)
            .ok_or_else(|| StudioError::UnknownModel(model_id.to_string()))
    }
}
