//! History reconciliation with the remote store online and offline.

mod support;

use std::sync::Arc;

use flux_studio::history::{FetchOptions, FileCache, HistoryContext, HistoryReconciler, LocalCache, SessionIdentity};
use support::{FlakyStore, ids, memory_context, record, row};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn degraded_save_is_visible_on_next_fetch() {
    let remote = FlakyStore::offline();
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");

    let saved = reconciler.save(&ctx, record("g1", "spoofed", 1_000)).await;
    assert_eq!(saved.user_id.as_deref(), Some("me"));
    assert!(remote.rows().is_empty());
    assert!(logs_contain("history store operation failed"));

    let history = reconciler
        .fetch(&ctx, FetchOptions::default().current_user_only(true))
        .await;
    assert_eq!(ids(&history), ["g1"]);
    assert!(history[0].is_current_user);
}

#[tokio::test]
async fn successful_save_is_mirrored_locally() {
    let remote = FlakyStore::online();
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");

    reconciler.save(&ctx, record("g1", "me", 1_000)).await;
    assert_eq!(remote.rows().len(), 1);
    assert_eq!(remote.rows()[0].user_id.as_deref(), Some("me"));

    remote.set_online(false);
    let offline_view = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&offline_view), ["g1"]);
}

#[tokio::test]
async fn fetch_merges_remote_first_and_refreshes_cache() {
    let remote = FlakyStore::online();
    remote.seed(row("r1", "me", 3_000));
    remote.seed(row("shared", "other", 2_000));
    let ctx = memory_context("me");
    ctx.cache
        .store(&[record("shared", "other", 2_000), record("local-only", "me", 500)])
        .await
        .unwrap();

    let reconciler = HistoryReconciler::new(remote.clone());
    let history = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&history), ["r1", "shared", "local-only"]);
    let owned: Vec<_> = history.iter().map(|r| r.is_current_user).collect();
    assert_eq!(owned, [true, false, true]);

    let cached = ctx.cache.load().await.unwrap();
    assert_eq!(ids(&cached), ["r1", "shared", "local-only"]);
}

#[tokio::test]
async fn record_saved_during_outage_sorts_first_after_recovery() {
    let remote = FlakyStore::online();
    remote.seed(row("old-remote", "me", 1_000));
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");

    remote.set_online(false);
    reconciler.save(&ctx, record("new-local", "me", 9_000)).await;
    remote.set_online(true);

    let history = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&history), ["new-local", "old-remote"]);
    let cached = ctx.cache.load().await.unwrap();
    assert_eq!(ids(&cached), ["new-local", "old-remote"]);
}

#[tokio::test]
async fn own_records_view_leaves_out_cached_records_of_others() {
    let remote = FlakyStore::online();
    remote.seed(row("mine", "me", 3_000));
    remote.seed(row("theirs", "other", 2_000));
    let ctx = memory_context("me");
    let reconciler = HistoryReconciler::new(remote);

    let everyone = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&everyone), ["mine", "theirs"]);

    let own = reconciler
        .fetch(&ctx, FetchOptions::default().current_user_only(true))
        .await;
    assert_eq!(ids(&own), ["mine"]);
    assert!(own.iter().all(|r| r.is_current_user));

    let cached = ctx.cache.load().await.unwrap();
    assert_eq!(ids(&cached), ["mine", "theirs"]);
}

#[tokio::test]
async fn fetch_honours_limit_and_owner_filter() {
    let remote = FlakyStore::online();
    for (i, owner) in ["me", "other", "me", "me"].iter().enumerate() {
        remote.seed(row(&format!("g{i}"), owner, i as i64 * 1_000));
    }
    let ctx = memory_context("me");
    let reconciler = HistoryReconciler::new(remote);

    let history = reconciler
        .fetch(&ctx, FetchOptions::default().with_limit(2).current_user_only(true))
        .await;
    assert_eq!(ids(&history), ["g3", "g2"]);
}

#[tokio::test]
async fn delete_removes_record_with_remote_available() {
    let remote = FlakyStore::online();
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");
    reconciler.save(&ctx, record("g1", "me", 1_000)).await;
    reconciler.save(&ctx, record("g2", "me", 2_000)).await;

    reconciler.delete(&ctx, "g1").await;

    let history = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&history), ["g2"]);
    assert_eq!(remote.rows().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn delete_removes_record_with_remote_unavailable() {
    let remote = FlakyStore::offline();
    let reconciler = HistoryReconciler::new(remote);
    let ctx = memory_context("me");
    reconciler.save(&ctx, record("g1", "me", 1_000)).await;
    reconciler.save(&ctx, record("g2", "me", 2_000)).await;

    reconciler.delete(&ctx, "g2").await;

    let history = reconciler.fetch(&ctx, FetchOptions::default()).await;
    assert_eq!(ids(&history), ["g1"]);
    assert!(logs_contain("delete"));
}

#[tokio::test]
async fn remote_delete_only_touches_owned_rows() {
    let remote = FlakyStore::online();
    remote.seed(row("theirs", "other", 1_000));
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");

    reconciler.delete(&ctx, "theirs").await;
    assert_eq!(remote.rows().len(), 1);
}

#[tokio::test]
async fn clear_all_drops_owned_remote_rows_and_local_cache() {
    let remote = FlakyStore::online();
    remote.seed(row("theirs", "other", 1_000));
    let reconciler = HistoryReconciler::new(remote.clone());
    let ctx = memory_context("me");
    reconciler.save(&ctx, record("mine", "me", 2_000)).await;

    reconciler.clear_all(&ctx).await;

    assert_eq!(
        remote.rows().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        ["theirs"]
    );
    assert!(ctx.cache.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("generations.json");
    let id_path = dir.path().join("user-id");
    let remote = FlakyStore::offline();
    let reconciler = HistoryReconciler::new(remote);

    let session = SessionIdentity::load_or_create(&id_path).await.unwrap();
    let ctx = HistoryContext::new(session, Arc::new(FileCache::new(&cache_path)));
    reconciler.save(&ctx, record("g1", "ignored", 1_000)).await;

    let session = SessionIdentity::load_or_create(&id_path).await.unwrap();
    let restarted = HistoryContext::new(session, Arc::new(FileCache::new(&cache_path)));
    let history = reconciler.fetch(&restarted, FetchOptions::default()).await;
    assert_eq!(ids(&history), ["g1"]);
    assert!(history[0].is_current_user);
}
