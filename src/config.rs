//! Studio configuration
//!
//! Built either explicitly through [`StudioConfig::builder`] or from process
//! environment variables with [`StudioConfig::from_env`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Result, StudioError};
use crate::history::DEFAULT_FETCH_LIMIT;
use crate::providers::FalConfig;

pub const FAL_KEY_ENV: &str = "FAL_KEY";
pub const FAL_QUEUE_URL_ENV: &str = "FAL_QUEUE_URL";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const DATA_DIR_ENV: &str = "FLUX_STUDIO_DATA_DIR";
pub const SCHEMAS_ENV: &str = "FLUX_STUDIO_SCHEMAS";

pub const DEFAULT_DATA_DIR: &str = ".flux-studio";
const CACHE_FILE: &str = "generations.json";
const USER_ID_FILE: &str = "user-id";

/// Connection details of the Supabase project backing the remote history.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: SecretString,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// fal.ai API key; generations fail with a missing-credential outcome
    /// without it
    pub fal_key: Option<SecretString>,
    pub fal: FalConfig,
    /// Remote history store; history is local-only when absent
    pub supabase: Option<SupabaseConfig>,
    /// Holds the history cache and the session identity file
    pub data_dir: PathBuf,
    /// Extra model schemas (JSON array) registered after the built-in ones
    pub schema_file: Option<PathBuf>,
    pub fetch_limit: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            fal_key: None,
            fal: FalConfig::default(),
            supabase: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            schema_file: None,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

impl StudioConfig {
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut builder = Self::builder();
        if let Some(key) = var(FAL_KEY_ENV) {
            builder = builder.fal_key(key);
        }
        if let Some(url) = var(FAL_QUEUE_URL_ENV) {
            builder = builder.queue_url(url);
        }
        match (var(SUPABASE_URL_ENV), var(SUPABASE_ANON_KEY_ENV)) {
            (Some(url), Some(key)) => builder = builder.supabase(url, key),
            (None, None) => {}
            (Some(_), None) => {
                return Err(StudioError::Configuration(format!(
                    "{SUPABASE_URL_ENV} is set but {SUPABASE_ANON_KEY_ENV} is missing"
                )));
            }
            (None, Some(_)) => {
                return Err(StudioError::Configuration(format!(
                    "{SUPABASE_ANON_KEY_ENV} is set but {SUPABASE_URL_ENV} is missing"
                )));
            }
        }
        if let Some(dir) = var(DATA_DIR_ENV) {
            builder = builder.data_dir(dir);
        }
        if let Some(path) = var(SCHEMAS_ENV) {
            builder = builder.schema_file(path);
        }
        builder.build()
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE)
    }

    pub fn user_id_path(&self) -> PathBuf {
        self.data_dir.join(USER_ID_FILE)
    }
}

#[derive(Debug, Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn fal_key(mut self, key: impl Into<String>) -> Self {
        self.config.fal_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn queue_url(mut self, url: impl Into<String>) -> Self {
        self.config.fal = self.config.fal.with_queue_url(url);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.fal = self.config.fal.with_poll_interval(interval);
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.config.fal = self.config.fal.with_max_wait(max_wait);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.fal = self.config.fal.with_timeout(timeout);
        self
    }

    pub fn fal(mut self, fal: FalConfig) -> Self {
        self.config.fal = fal;
        self
    }

    pub fn supabase(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        self.config.supabase = Some(SupabaseConfig {
            url: url.into(),
            anon_key: SecretString::from(anon_key.into()),
        });
        self
    }

    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_file = Some(path.into());
        self
    }

    pub fn fetch_limit(mut self, limit: usize) -> Self {
        self.config.fetch_limit = limit;
        self
    }

    pub fn build(self) -> Result<StudioConfig> {
        let config = self.config;
        if config.fetch_limit == 0 {
            return Err(StudioError::Configuration("fetch limit must be at least 1".into()));
        }
        if config.fal.poll_interval.is_zero() {
            return Err(StudioError::Configuration("poll interval must be non-zero".into()));
        }
        if let Some(supabase) = &config.supabase
            && !supabase.url.starts_with("http://")
            && !supabase.url.starts_with("https://")
        {
            return Err(StudioError::Configuration(format!(
                "Supabase URL must be http(s): {}",
                supabase.url
            )));
        }
        Ok(config)
    }
}
