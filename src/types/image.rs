//! Image payloads returned by generation providers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub content_type: String,
    /// Provider-specific fields (file name, file size, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Image {
    pub fn new(url: impl Into<String>, width: u32, height: u32, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            content_type: content_type.into(),
            extra: Map::new(),
        }
    }
}

/// Provider output stored with a generation record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub timings: Map<String, Value>,
    #[serde(default)]
    pub seed: u64,
    /// Positionally aligned with `images`
    #[serde(default)]
    pub has_nsfw_concepts: Vec<bool>,
}
