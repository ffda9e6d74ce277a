//! Shared helpers for integration tests: an in-memory remote store that can
//! be switched offline, a scripted generation provider, and record builders.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use flux_studio::history::{GenerationRow, HistoryContext, MemoryCache, RemoteStore, SessionIdentity};
use flux_studio::providers::{GenerationProvider, ProgressObserver, ProviderError, ProviderResponse, QueueUpdate};
use flux_studio::{GenerationOutput, GenerationRecord, Image, StoreError};
use secrecy::SecretString;
use serde_json::{Map, Value, json};

/// Remote store kept in memory; `set_online(false)` makes every call fail.
#[derive(Default)]
pub struct FlakyStore {
    rows: Mutex<Vec<GenerationRow>>,
    offline: AtomicBool,
    pub calls: AtomicUsize,
}

impl FlakyStore {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        let store = Self::default();
        store.offline.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<GenerationRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, row: GenerationRow) {
        self.rows.lock().unwrap().push(row);
    }

    fn check(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Http("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn insert(&self, row: &GenerationRow) -> Result<(), StoreError> {
        self.check()?;
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn select_recent(&self, limit: usize, owner: Option<&str>) -> Result<Vec<GenerationRow>, StoreError> {
        self.check()?;
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| owner.is_none() || r.user_id.as_deref() == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        self.check()?;
        self.rows
            .lock()
            .unwrap()
            .retain(|r| !(r.id == id && r.user_id.as_deref() == Some(owner)));
        Ok(())
    }

    async fn delete_owned(&self, owner: &str) -> Result<(), StoreError> {
        self.check()?;
        self.rows.lock().unwrap().retain(|r| r.user_id.as_deref() != Some(owner));
        Ok(())
    }
}

/// Provider that replays a fixed result and reports a fixed update sequence.
pub struct ScriptedProvider {
    result: Result<ProviderResponse, ProviderError>,
    updates: Vec<QueueUpdate>,
    pub calls: AtomicUsize,
    pub last_input: Mutex<Option<Map<String, Value>>>,
}

impl ScriptedProvider {
    pub fn new(result: Result<ProviderResponse, ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            updates: vec![
                QueueUpdate::InQueue { position: Some(1) },
                QueueUpdate::InProgress { logs: vec![] },
                QueueUpdate::Completed { logs: vec![] },
            ],
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Ok(response(vec![image("https://fal.media/files/out.jpg")])))
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn subscribe(
        &self,
        _model_id: &str,
        input: &Map<String, Value>,
        _credentials: &SecretString,
        on_update: Option<ProgressObserver<'_>>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        if let Some(observer) = on_update {
            for update in &self.updates {
                observer(update);
            }
        }
        self.result.clone()
    }
}

pub fn image(url: &str) -> Image {
    Image::new(url, 1024, 768, "image/jpeg")
}

pub fn response(images: Vec<Image>) -> ProviderResponse {
    ProviderResponse {
        request_id: "req-1".into(),
        output: GenerationOutput {
            images,
            timings: Map::new(),
            seed: 42,
            has_nsfw_concepts: vec![false],
        },
    }
}

pub fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn record(id: &str, owner: &str, millis: i64) -> GenerationRecord {
    GenerationRecord {
        id: id.into(),
        model_id: "fal-ai/flux-pro/v1.1".into(),
        model_name: "Flux 1.1 Pro".into(),
        prompt: format!("prompt for {id}"),
        parameters: json!({"prompt": format!("prompt for {id}")})
            .as_object()
            .cloned()
            .unwrap(),
        output: GenerationOutput::default(),
        timestamp: at(millis),
        user_id: Some(owner.into()),
        is_current_user: false,
    }
}

pub fn row(id: &str, owner: &str, millis: i64) -> GenerationRow {
    GenerationRow::from_record(&record(id, owner, millis), owner)
}

pub fn memory_context(user: &str) -> HistoryContext {
    HistoryContext::new(SessionIdentity::new(user), Arc::new(MemoryCache::new()))
}

pub fn ids(records: &[GenerationRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}
