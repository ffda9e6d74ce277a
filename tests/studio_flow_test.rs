//! End-to-end studio flow with a scripted provider and an in-memory store.

mod support;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use flux_studio::providers::ProviderError;
use flux_studio::{ErrorCode, QueueUpdate, SchemaRegistry, Studio, StudioConfig, StudioError};
use secrecy::SecretString;
use serde_json::json;
use support::{FlakyStore, ScriptedProvider, image, memory_context, object, response};

const PRO: &str = "fal-ai/flux-pro/v1.1";

fn studio(provider: Arc<ScriptedProvider>, remote: Arc<FlakyStore>, key: Option<&str>) -> Studio {
    Studio::with_components(
        SchemaRegistry::builtin().unwrap(),
        provider,
        remote,
        memory_context("me"),
        key.map(SecretString::from),
        50,
    )
}

#[tokio::test]
async fn successful_generation_is_recorded() {
    let provider = ScriptedProvider::succeeding();
    let remote = FlakyStore::online();
    let studio = studio(provider.clone(), remote.clone(), Some("fal-key"));

    let updates = Mutex::new(Vec::new());
    let observer = |u: &QueueUpdate| updates.lock().unwrap().push(u.status());
    let run = studio
        .generate(PRO, &object(json!({"prompt": "a quiet harbor"})), Some(&observer))
        .await
        .unwrap();

    assert!(run.outcome.is_success());
    let record = run.record.unwrap();
    assert_eq!(record.model_id, PRO);
    assert_eq!(record.model_name, "Flux 1.1 Pro");
    assert_eq!(record.prompt, "a quiet harbor");
    assert_eq!(record.user_id.as_deref(), Some("me"));
    assert_eq!(record.output.images[0].url, "https://fal.media/files/out.jpg");
    assert_eq!(*updates.lock().unwrap(), ["IN_QUEUE", "IN_PROGRESS", "COMPLETED"]);

    let sent = provider.last_input.lock().unwrap().clone().unwrap();
    assert_eq!(sent["num_images"], json!(1));
    assert_eq!(remote.rows().len(), 1);

    let history = studio.history(None, true).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, record.id);
}

#[tokio::test]
async fn multi_image_response_records_first_image_with_its_flag() {
    let mut reply = response(vec![
        image("https://fal.media/files/first.jpg"),
        image("https://fal.media/files/second.jpg"),
    ]);
    reply.output.has_nsfw_concepts = vec![false, true];
    let remote = FlakyStore::online();
    let studio = studio(ScriptedProvider::new(Ok(reply)), remote.clone(), Some("fal-key"));

    let run = studio
        .generate(PRO, &object(json!({"prompt": "two boats", "num_images": 2})), None)
        .await
        .unwrap();

    let output = run.record.unwrap().output;
    assert_eq!(output.images.len(), 1);
    assert_eq!(output.images[0].url, "https://fal.media/files/first.jpg");
    assert_eq!(output.has_nsfw_concepts, [false]);

    let history = studio.history(None, false).await;
    assert_eq!(history[0].output.images.len(), history[0].output.has_nsfw_concepts.len());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_provider() {
    let provider = ScriptedProvider::succeeding();
    let studio = studio(provider.clone(), FlakyStore::online(), Some("fal-key"));

    let err = studio
        .generate(PRO, &object(json!({"num_images": "9", "image_size": "huge"})), None)
        .await
        .unwrap_err();
    let violations = err.violations().unwrap();
    let keys: Vec<_> = violations.violations().iter().map(|v| v.key()).collect();
    assert_eq!(keys, ["prompt", "image_size", "num_images"]);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let err = studio.prepare("fal-ai/unknown", &object(json!({}))).unwrap_err();
    assert!(matches!(err, StudioError::UnknownModel(id) if id == "fal-ai/unknown"));
}

#[tokio::test]
async fn failed_generation_is_not_recorded() {
    let provider = ScriptedProvider::new(Err(ProviderError::api(
        403,
        Some(json!({"detail": "Exhausted balance: top up"})),
        "Exhausted balance: top up",
    )));
    let remote = FlakyStore::online();
    let studio = studio(provider, remote.clone(), Some("fal-key"));

    let run = studio
        .generate(PRO, &object(json!({"prompt": "x"})), None)
        .await
        .unwrap();
    assert_eq!(
        run.outcome.failure().unwrap().error_code,
        Some(ErrorCode::BalanceExhausted)
    );
    assert!(run.record.is_none());
    assert!(remote.rows().is_empty());
    assert!(studio.history(None, false).await.is_empty());
}

#[tokio::test]
async fn missing_key_is_a_failure_outcome() {
    let provider = ScriptedProvider::succeeding();
    let studio = studio(provider.clone(), FlakyStore::online(), None);

    let run = studio
        .generate(PRO, &object(json!({"prompt": "x"})), None)
        .await
        .unwrap();
    assert_eq!(
        run.outcome.failure().unwrap().error_code,
        Some(ErrorCode::MissingCredential)
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_and_clear_history() {
    let studio = studio(ScriptedProvider::succeeding(), FlakyStore::offline(), Some("fal-key"));
    let mut ids = Vec::new();
    for prompt in ["one", "two", "three"] {
        let run = studio
            .generate(PRO, &object(json!({"prompt": prompt})), None)
            .await
            .unwrap();
        ids.push(run.record.unwrap().id);
    }

    studio.delete(&ids[1]).await;
    let history = studio.history(Some(10), false).await;
    let prompts: Vec<_> = history.iter().map(|r| r.prompt.as_str()).collect();
    assert_eq!(prompts, ["three", "one"]);

    studio.clear_history().await;
    assert!(studio.history(None, false).await.is_empty());
}

#[tokio::test]
async fn from_config_bootstraps_local_state() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas.json");
    std::fs::write(
        &schemas,
        r#"[{"name": "Upscaler", "id": "fal-ai/upscale",
             "inputSchema": [{"key": "image_url", "type": "image", "required": true}]}]"#,
    )
    .unwrap();

    let config = StudioConfig::builder()
        .data_dir(dir.path().join("data"))
        .schema_file(&schemas)
        .build()
        .unwrap();
    let studio = Studio::from_config(config.clone()).await.unwrap();

    assert_eq!(studio.models().count(), 4);
    assert!(studio.model("fal-ai/upscale").is_some());
    assert!(config.user_id_path().exists());
    assert_eq!(
        std::fs::read_to_string(config.user_id_path()).unwrap(),
        studio.context().user_id()
    );
    assert!(studio.history(None, false).await.is_empty());
}
