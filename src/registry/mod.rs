//! Schema registry
//!
//! An in-memory catalog of every [`ModelSchema`] the studio can drive. The
//! catalog is assembled once at startup (built-in models plus optional
//! JSON-declared ones) and only read afterwards.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, SchemaError};
use crate::types::ModelSchema;

pub mod models;

/// Catalog of model schemas, addressable by provider id.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    models: Vec<ModelSchema>,
    by_id: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in model catalog.
    pub fn builtin() -> std::result::Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in models::builtin_models()? {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Add a schema; ids must be unique.
    pub fn register(&mut self, schema: ModelSchema) -> std::result::Result<(), SchemaError> {
        if self.by_id.contains_key(schema.id()) {
            return Err(SchemaError::DuplicateModel(schema.id().to_string()));
        }
        self.by_id.insert(schema.id().to_string(), self.models.len());
        self.models.push(schema);
        Ok(())
    }

    /// Register every schema of a JSON array; returns how many were added.
    ///
    /// All or nothing: on a duplicate id the registry is left unchanged.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize> {
        let schemas: Vec<ModelSchema> = serde_json::from_str(json)?;
        let mut staged = self.clone();
        let count = schemas.len();
        for schema in schemas {
            staged.register(schema)?;
        }
        *self = staged;
        Ok(count)
    }

    /// Register the schemas declared in a JSON file.
    pub async fn extend_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let count = self.extend_from_json(&raw)?;
        tracing::debug!(path = %path.display(), count, "loaded model schemas");
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<&ModelSchema> {
        self.by_id.get(id).map(|&idx| &self.models[idx])
    }

    /// Schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
