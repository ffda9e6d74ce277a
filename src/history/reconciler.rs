//! History reconciler
//!
//! Keeps generation history in the durable remote store when it is reachable
//! and in the local cache always. Store failures are logged and absorbed; none
//! of the operations here return an error.

use std::sync::Arc;

use super::local::LocalCache;
use super::merge::merge_records;
use super::remote::{GenerationRow, RemoteStore};
use super::session::HistoryContext;
use crate::error::StoreError;
use crate::types::GenerationRecord;

pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// Options for [`HistoryReconciler::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub limit: usize,
    /// Only records owned by the session user
    pub current_user_only: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FETCH_LIMIT,
            current_user_only: false,
        }
    }
}

impl FetchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn current_user_only(mut self, only: bool) -> Self {
        self.current_user_only = only;
        self
    }
}

#[derive(Clone)]
pub struct HistoryReconciler {
    remote: Arc<dyn RemoteStore>,
}

impl HistoryReconciler {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Persist a record, stamped with the session user.
    ///
    /// The record lands in the local cache whether or not the remote write
    /// succeeded; the cache write only starts once the remote outcome is known.
    pub async fn save(&self, ctx: &HistoryContext, mut record: GenerationRecord) -> GenerationRecord {
        record.user_id = Some(ctx.user_id().to_string());
        record.is_current_user = true;

        let row = GenerationRow::from_record(&record, ctx.user_id());
        match self.remote.insert(&row).await {
            Ok(()) => tracing::info!(id = %record.id, model = %record.model_id, "saved generation"),
            Err(err) => log_store_failure("save", &err),
        }

        let mut cached = load_cache(ctx.cache.as_ref()).await;
        cached.retain(|r| r.id != record.id);
        cached.insert(0, record.clone());
        store_cache(ctx.cache.as_ref(), &cached).await;
        record
    }

    /// Recent history, newest first.
    ///
    /// Falls back to the local cache when the remote store fails or returns
    /// nothing; otherwise the merged view is written back to the cache. With
    /// `current_user_only`, cached records of other users are left out of the
    /// merged view but kept in the cache.
    pub async fn fetch(&self, ctx: &HistoryContext, options: FetchOptions) -> Vec<GenerationRecord> {
        let owner = options.current_user_only.then(|| ctx.user_id());
        let remote = match self.remote.select_recent(options.limit, owner).await {
            Ok(rows) => rows,
            Err(err) => {
                log_store_failure("fetch", &err);
                Vec::new()
            }
        };

        let mut local = load_cache(ctx.cache.as_ref()).await;
        if remote.is_empty() {
            newest_first(&mut local);
            return with_owner_flags(local, ctx.user_id());
        }

        let remote = remote.into_iter().map(|row| row.into_record(ctx.user_id())).collect();
        let mut merged = merge_records(remote, local);
        newest_first(&mut merged);
        store_cache(ctx.cache.as_ref(), &merged).await;
        tracing::debug!(count = merged.len(), "history reconciled");

        let mut view = with_owner_flags(merged, ctx.user_id());
        if options.current_user_only {
            view.retain(|r| r.is_current_user);
        }
        view
    }

    /// Remove a record owned by the session user from both stores.
    pub async fn delete(&self, ctx: &HistoryContext, id: &str) {
        if let Err(err) = self.remote.delete(id, ctx.user_id()).await {
            log_store_failure("delete", &err);
        }

        let mut cached = load_cache(ctx.cache.as_ref()).await;
        cached.retain(|r| r.id != id);
        store_cache(ctx.cache.as_ref(), &cached).await;
    }

    /// Remove every remote record owned by the session user and empty the
    /// local cache.
    pub async fn clear_all(&self, ctx: &HistoryContext) {
        if let Err(err) = self.remote.delete_owned(ctx.user_id()).await {
            log_store_failure("clear", &err);
        }
        store_cache(ctx.cache.as_ref(), &[]).await;
        tracing::info!("history cleared");
    }
}

// Stable, so records sharing an instant keep their merge order.
fn newest_first(records: &mut [GenerationRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn with_owner_flags(mut records: Vec<GenerationRecord>, session_user: &str) -> Vec<GenerationRecord> {
    for record in &mut records {
        record.mark_owner(session_user);
    }
    records
}

async fn load_cache(cache: &dyn LocalCache) -> Vec<GenerationRecord> {
    cache.load().await.unwrap_or_else(|err| {
        log_store_failure("load cache", &err);
        Vec::new()
    })
}

async fn store_cache(cache: &dyn LocalCache, records: &[GenerationRecord]) {
    if let Err(err) = cache.store(records).await {
        log_store_failure("store cache", &err);
    }
}

fn log_store_failure(operation: &str, err: &StoreError) {
    match err {
        StoreError::Disabled(_) => tracing::debug!(operation, "remote store disabled, using local cache"),
        _ => tracing::warn!(operation, error = %err, "history store operation failed"),
    }
}
