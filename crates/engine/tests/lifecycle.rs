//! End-to-end scenarios against the public `Engine` API, using the demo
//! stage collaborators from `engine-stages`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use engine::{
    Engine, EngineConfig, EngineDeps, EngineError, EngineStatus, OptionBundle, SpiderCallbacks,
    SpiderId, SpiderState, Stage,
};
use engine_stages::{DemoDownloader, DemoItemProcessor, DemoSpider, NoopPipelineHooks};

const TIMEOUT: Duration = Duration::from_secs(2);

fn demo_deps() -> EngineDeps {
    EngineDeps::new(
        Arc::new(DemoDownloader),
        Arc::new(DemoSpider),
        Arc::new(DemoItemProcessor),
        Arc::new(NoopPipelineHooks),
    )
}

async fn wait_for_running(engine_ref: &engine::EngineRef) {
    for _ in 0..50 {
        if engine_ref.status().await.unwrap() == EngineStatus::Running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("engine never reached running status");
}

#[tokio::test]
async fn e1_lifecycle() {
    let config = EngineConfig::new("s1_lifecycle");
    let engine_ref = Engine::start(config, demo_deps()).unwrap();

    wait_for_running(&engine_ref).await;
    assert_eq!(engine_ref.status().await.unwrap(), EngineStatus::Running);

    engine_ref.suspend(TIMEOUT).await.unwrap();
    assert_eq!(engine_ref.status().await.unwrap(), EngineStatus::Suspend);

    engine_ref.continue_(TIMEOUT).await.unwrap();
    assert_eq!(engine_ref.status().await.unwrap(), EngineStatus::Running);

    engine_ref.terminate("normal").await.unwrap();
}

#[tokio::test]
async fn e2_dump_gate_rejects_non_suspended_engine() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("s2");

    let config = EngineConfig::new("s2_dump_gate");
    let engine_ref = Engine::start(config, demo_deps()).unwrap();
    wait_for_running(&engine_ref).await;

    let result = engine_ref.dump2file_force(Some(base.clone()), TIMEOUT).await;
    assert!(matches!(result, Err(EngineError::StatusError)));

    let any_file_exists = std::fs::read_dir(dir.path()).unwrap().next().is_some();
    assert!(!any_file_exists, "dump must not touch the filesystem when not suspended");

    engine_ref.terminate("normal").await.unwrap();
}

#[tokio::test]
async fn e3_dump_and_restore_round_trips_out_of_band_writes() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("s3");

    let spider = SpiderId::new("s3_dump_restore");
    let config = EngineConfig::new(spider.as_str());
    let engine_ref = Engine::start(config, demo_deps()).unwrap();
    wait_for_running(&engine_ref).await;

    let spider_table = engine::lookup(&spider, "spider_tid").expect("spider table must be published");
    spider_table.insert("a", serde_json::json!(1));
    spider_table.insert("b", serde_json::json!("two"));
    spider_table.insert("c", serde_json::json!(true));

    engine_ref.suspend(TIMEOUT).await.unwrap();
    let dumped = engine_ref.dump2file_force(Some(base.clone()), TIMEOUT).await.unwrap();
    assert_eq!(dumped.len(), 7);
    for path in &dumped {
        assert!(path.exists());
    }

    engine_ref.terminate("normal").await.unwrap();
    // Allow the registry to clear before a second engine claims the same spider id.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let restored_config = EngineConfig::new(spider.as_str()).with_load_from_file(base.to_string_lossy());
    let restored_ref = Engine::start(restored_config, demo_deps()).unwrap();
    wait_for_running(&restored_ref).await;

    let restored_spider_table = engine::lookup(&spider, "spider_tid").expect("restored table must be published");
    assert_eq!(restored_spider_table.get("a"), Some(serde_json::json!(1)));
    assert_eq!(restored_spider_table.get("b"), Some(serde_json::json!("two")));
    assert_eq!(restored_spider_table.get("c"), Some(serde_json::json!(true)));

    restored_ref.terminate("normal").await.unwrap();
}

#[tokio::test]
async fn e4_suspend_and_continue_are_idempotent() {
    let config = EngineConfig::new("s4_idempotence");
    let engine_ref = Engine::start(config, demo_deps()).unwrap();
    wait_for_running(&engine_ref).await;

    engine_ref.suspend(TIMEOUT).await.unwrap();
    engine_ref.suspend(TIMEOUT).await.unwrap();
    engine_ref.suspend(TIMEOUT).await.unwrap();
    assert_eq!(engine_ref.status().await.unwrap(), EngineStatus::Suspend);

    engine_ref.continue_(TIMEOUT).await.unwrap();
    assert_eq!(engine_ref.status().await.unwrap(), EngineStatus::Running);

    engine_ref.terminate("normal").await.unwrap();
}

#[derive(Default)]
struct RecordingCallbacks {
    start: AtomicU32,
    start_component: AtomicU32,
    stop: AtomicU32,
    stop_component: AtomicU32,
}

#[async_trait]
impl SpiderCallbacks for RecordingCallbacks {
    async fn prepare_for_start(&self, state: SpiderState) -> SpiderState {
        self.start.fetch_add(1, Ordering::SeqCst);
        state
    }

    async fn prepare_for_start_component(&self, _stage: Stage, bundle: OptionBundle) -> OptionBundle {
        self.start_component.fetch_add(1, Ordering::SeqCst);
        bundle
    }

    async fn prepare_for_stop(&self, _state: &SpiderState) {
        self.stop.fetch_add(1, Ordering::SeqCst);
    }

    async fn prepare_for_stop_component(&self, _stage: Stage, _bundle: &OptionBundle) {
        self.stop_component.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn e5_callback_invocation_counts() {
    let callbacks = Arc::new(RecordingCallbacks::default());
    let deps = demo_deps().with_callbacks(callbacks.clone());

    let config = EngineConfig::new("s5_callbacks");
    let engine_ref = Engine::start(config, deps).unwrap();
    wait_for_running(&engine_ref).await;

    assert_eq!(callbacks.start.load(Ordering::SeqCst), 1);
    assert_eq!(callbacks.start_component.load(Ordering::SeqCst), 3);

    engine_ref.terminate("normal").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(callbacks.stop.load(Ordering::SeqCst), 1);
    assert_eq!(callbacks.stop_component.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn e6_stage_veto_crashes_the_engine() {
    let config = EngineConfig::new("s6_veto").with_downloader_option("simulate_violation", serde_json::json!(true));
    let engine_ref = Engine::start(config, demo_deps()).unwrap();
    wait_for_running(&engine_ref).await;

    let result = engine_ref.suspend(TIMEOUT).await;
    assert!(matches!(result, Err(EngineError::ControlContractViolation { .. })));

    // The actor crashed processing the violation; the mailbox is now closed.
    let status_result = engine_ref.status().await;
    assert!(matches!(status_result, Err(EngineError::MailboxClosed)));
}
