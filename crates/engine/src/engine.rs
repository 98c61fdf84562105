//! The Engine lifecycle controller: a single-threaded cooperative actor
//! (a dedicated `tokio` task consuming a mailbox) that owns `EngineState`,
//! sequences setup and teardown, and routes control operations.
//!
//! Realizes the design notes' "Actor -> worker + mailbox" and "Deferred
//! setup" sections: `start` enqueues an internal `StartComponents` command
//! before any caller can observe the `EngineRef`, so the FIFO mailbox
//! naturally serializes every later control call behind setup completing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::bundle::OptionBundle;
use crate::callbacks::{NoopSpiderCallbacks, SpiderCallbacks, SpiderState};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ids::{EngineStatus, SpiderId, Stage, TableRole};
use crate::persist;
use crate::plugins::{RequesterPluginRegistry, StoragePluginRegistry};
use crate::registry;
use crate::stage::{ControlAck, ControlCommand, PipelineHooks, StageChild, StageRunner};
use crate::table::TableHandle;

/// The Engine's runtime collaborators, supplied alongside the plain-data
/// `EngineConfig`. Kept separate because trait objects can't be
/// deserialized from a config file the way `EngineConfig` can.
pub struct EngineDeps {
    pub downloader_runner: Arc<dyn StageRunner>,
    pub spider_runner: Arc<dyn StageRunner>,
    pub item_processor_runner: Arc<dyn StageRunner>,
    pub pipeline_hooks: Arc<dyn PipelineHooks>,
    pub requester_plugins: RequesterPluginRegistry,
    pub storage_plugins: StoragePluginRegistry,
    pub callbacks: Arc<dyn SpiderCallbacks>,
}

impl EngineDeps {
    /// Convenience constructor for tests/demos: real requester/storage
    /// plugin registries and callbacks default to empty/no-op.
    pub fn new(
        downloader_runner: Arc<dyn StageRunner>,
        spider_runner: Arc<dyn StageRunner>,
        item_processor_runner: Arc<dyn StageRunner>,
        pipeline_hooks: Arc<dyn PipelineHooks>,
    ) -> Self {
        Self {
            downloader_runner,
            spider_runner,
            item_processor_runner,
            pipeline_hooks,
            requester_plugins: RequesterPluginRegistry::new(),
            storage_plugins: StoragePluginRegistry::new(),
            callbacks: Arc::new(NoopSpiderCallbacks),
        }
    }

    pub fn with_callbacks(mut self, callbacks: Arc<dyn SpiderCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_requester_plugins(mut self, registry: RequesterPluginRegistry) -> Self {
        self.requester_plugins = registry;
        self
    }

    pub fn with_storage_plugins(mut self, registry: StoragePluginRegistry) -> Self {
        self.storage_plugins = registry;
        self
    }
}

/// Mailbox commands. `StartComponents` is internal: pushed once by `start`
/// before the `EngineRef` is handed back to the caller.
enum Command {
    StartComponents,
    Status(oneshot::Sender<EngineStatus>),
    Suspend {
        reply: oneshot::Sender<EngineResult<()>>,
    },
    Continue {
        reply: oneshot::Sender<EngineResult<()>>,
    },
    Dump {
        file_base: Option<PathBuf>,
        reply: oneshot::Sender<EngineResult<Vec<PathBuf>>>,
    },
    Terminate {
        reason: String,
        reply: oneshot::Sender<()>,
    },
}

/// A cheaply-clonable handle to a running Engine. The only way callers
/// reach the actor; never exposes `EngineState` directly.
#[derive(Clone)]
pub struct EngineRef {
    spider: SpiderId,
    tx: mpsc::Sender<Command>,
}

impl EngineRef {
    pub fn spider(&self) -> &SpiderId {
        &self.spider
    }

    /// Constant-time read of the actor's status field. Never blocks on
    /// stage activity.
    pub async fn status(&self) -> EngineResult<EngineStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Status(reply_tx))
            .await
            .map_err(|_| EngineError::MailboxClosed)?;
        reply_rx.await.map_err(|_| EngineError::MailboxClosed)
    }

    /// Blocks until all three stages acknowledge suspension or `timeout`
    /// elapses. Idempotent: suspending an already-suspended engine is a
    /// no-op returning `Ok`.
    pub async fn suspend(&self, timeout: Duration) -> EngineResult<()> {
        self.call_with_timeout(timeout, |reply| Command::Suspend { reply }).await
    }

    /// Symmetric to `suspend`.
    pub async fn continue_(&self, timeout: Duration) -> EngineResult<()> {
        self.call_with_timeout(timeout, |reply| Command::Continue { reply }).await
    }

    /// The actual dump contract: requires `suspend`, writes the seven
    /// `<base>_<role>.ets` files. Returns `EngineError::StatusError` from a
    /// non-suspended status, touching no files.
    pub async fn dump2file_force(
        &self,
        file_base: Option<PathBuf>,
        timeout: Duration,
    ) -> EngineResult<Vec<PathBuf>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Dump { file_base, reply: reply_tx })
            .await
            .map_err(|_| EngineError::MailboxClosed)?;
        tokio::time::timeout(timeout, reply_rx)
            .await
            .map_err(|_| EngineError::Timeout)?
            .map_err(|_| EngineError::MailboxClosed)?
    }

    /// User-facing wrapper around `dump2file_force`: not itself part of the
    /// core control contract (per the spec, the non-forced variant just
    /// adds an interactive confirmation step before the real dump runs).
    /// `confirm` stands in for that prompt so this crate stays free of
    /// direct terminal I/O.
    pub async fn dump2file(
        &self,
        file_base: Option<PathBuf>,
        timeout: Duration,
        confirm: impl FnOnce() -> bool,
    ) -> EngineResult<Vec<PathBuf>> {
        if !confirm() {
            return Ok(Vec::new());
        }
        self.dump2file_force(file_base, timeout).await
    }

    /// Triggers teardown. Returns once the async supervisor-stop has been
    /// scheduled; the remaining shutdown proceeds on its own timeline,
    /// bounded by the 60 second shutdown budget.
    pub async fn terminate(&self, reason: impl Into<String>) -> EngineResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Terminate { reason: reason.into(), reply: reply_tx })
            .await
            .map_err(|_| EngineError::MailboxClosed)?;
        reply_rx.await.map_err(|_| EngineError::MailboxClosed)
    }

    async fn call_with_timeout(
        &self,
        timeout: Duration,
        make_cmd: impl FnOnce(oneshot::Sender<EngineResult<()>>) -> Command,
    ) -> EngineResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make_cmd(reply_tx))
            .await
            .map_err(|_| EngineError::MailboxClosed)?;
        tokio::time::timeout(timeout, reply_rx)
            .await
            .map_err(|_| EngineError::Timeout)?
            .map_err(|_| EngineError::MailboxClosed)?
    }
}

/// Everything the actor task owns exclusively. Never shared across tasks;
/// all access happens from within the single worker loop.
struct ActorState {
    spider: SpiderId,
    status: EngineStatus,
    config: EngineConfig,
    deps: EngineDeps,
    tables: Option<HashMap<TableRole, TableHandle>>,
    downloader_options: Option<OptionBundle>,
    spider_options: Option<OptionBundle>,
    item_processor_options: Option<OptionBundle>,
    downloader_child: Option<Box<dyn StageChild>>,
    spider_child: Option<Box<dyn StageChild>>,
    item_processor_child: Option<Box<dyn StageChild>>,
    user_state: SpiderState,
}

/// Entry point: the single long-lived supervised actor per spider.
pub struct Engine;

impl Engine {
    /// Creates the actor and returns once it is alive but before setup
    /// completes (setup runs as a deferred continuation). Fatal
    /// configuration errors (a missing `spider`) are caught here, before
    /// the actor is even spawned.
    pub fn start(config: EngineConfig, deps: EngineDeps) -> EngineResult<EngineRef> {
        let spider = config.spider_id()?;
        registry::reserve_spider(&spider)?;

        let (tx, rx) = mpsc::channel(32);
        let engine_ref = EngineRef { spider: spider.clone(), tx: tx.clone() };

        let state = ActorState {
            spider,
            status: EngineStatus::Preparing,
            config,
            deps,
            tables: None,
            downloader_options: None,
            spider_options: None,
            item_processor_options: None,
            downloader_child: None,
            spider_child: None,
            item_processor_child: None,
            user_state: SpiderState::Null,
        };

        // Deferred setup: enqueue StartComponents before the caller can
        // reach the actor with any other command.
        let _ = tx.try_send(Command::StartComponents);

        tokio::spawn(run_actor(state, rx));

        Ok(engine_ref)
    }
}

async fn run_actor(mut state: ActorState, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::StartComponents => {
                if let Err(e) = handle_start_components(&mut state).await {
                    error!(spider = %state.spider, error = %e, "engine setup failed, crashing");
                    return;
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(state.status);
            }
            Command::Suspend { reply } => {
                let result = handle_suspend(&mut state).await;
                let crashed = result.is_err() && matches!(result, Err(EngineError::ControlContractViolation { .. }));
                let _ = reply.send(result);
                if crashed {
                    return;
                }
            }
            Command::Continue { reply } => {
                let result = handle_continue(&mut state).await;
                let crashed = result.is_err() && matches!(result, Err(EngineError::ControlContractViolation { .. }));
                let _ = reply.send(result);
                if crashed {
                    return;
                }
            }
            Command::Dump { file_base, reply } => {
                let result = handle_dump(&state, file_base).await;
                let _ = reply.send(result);
            }
            Command::Terminate { reason, reply } => {
                handle_terminate(&mut state, reason).await;
                let _ = reply.send(());
                return;
            }
        }
    }
}

/// Setup protocol (spec §4.1), steps 1-8.
async fn handle_start_components(state: &mut ActorState) -> EngineResult<()> {
    // 1. Load or create the seven tables.
    let tables: HashMap<TableRole, TableHandle> = if let Some(base) = state.config.load_from_file.clone() {
        persist::load_all(std::path::Path::new(&base))?
            .into_iter()
            .collect()
    } else {
        TableRole::ALL.iter().map(|role| (*role, TableHandle::new(*role))).collect()
    };

    // 2. Publish the four registry-visible tables.
    for role in [TableRole::CommonPipeline, TableRole::Downloader, TableRole::Spider, TableRole::ItemProcessor] {
        registry::publish(&state.spider, &format!("{}_tid", role.as_str()), tables[&role].clone());
    }

    // 3. Assemble each stage's bundle: framework prefix (framework wins
    // duplicates) concatenated with the user overrides.
    let downloader_bundle = OptionBundle::concat_first_wins(
        build_prefix(Stage::Downloader, &state.spider, &tables),
        state.config.downloader_overrides(),
    );
    let spider_bundle = OptionBundle::concat_first_wins(
        build_prefix(Stage::Spider, &state.spider, &tables),
        state.config.spider_overrides(),
    );
    let item_processor_bundle = OptionBundle::concat_first_wins(
        build_prefix(Stage::ItemProcessor, &state.spider, &tables),
        state.config.item_processor_overrides(),
    );

    // 4. Plugin resolution.
    let downloader_bundle =
        crate::plugins::resolve_requester(downloader_bundle, &state.deps.requester_plugins).await?;
    let item_processor_bundle =
        crate::plugins::resolve_storage(item_processor_bundle, &state.deps.storage_plugins).await?;

    // 5. Spider callback per-component hook.
    let downloader_bundle = state
        .deps
        .callbacks
        .prepare_for_start_component(Stage::Downloader, downloader_bundle)
        .await;
    let spider_bundle = state
        .deps
        .callbacks
        .prepare_for_start_component(Stage::Spider, spider_bundle)
        .await;
    let item_processor_bundle = state
        .deps
        .callbacks
        .prepare_for_start_component(Stage::ItemProcessor, item_processor_bundle)
        .await;

    // 6. Start the three stage children in order. Any failure aborts setup.
    info!(spider = %state.spider, "starting downloader stage");
    let downloader_child = state
        .deps
        .downloader_runner
        .start(&downloader_bundle)
        .await
        .map_err(|e| wrap_start_error(Stage::Downloader, e))?;

    info!(spider = %state.spider, "starting spider stage");
    let spider_child = state
        .deps
        .spider_runner
        .start(&spider_bundle)
        .await
        .map_err(|e| wrap_start_error(Stage::Spider, e))?;

    info!(spider = %state.spider, "starting item_processor stage");
    let item_processor_child = state
        .deps
        .item_processor_runner
        .start(&item_processor_bundle)
        .await
        .map_err(|e| wrap_start_error(Stage::ItemProcessor, e))?;

    // 7. Persist finalized bundles and child identifiers; transition.
    state.tables = Some(tables);
    state.downloader_options = Some(downloader_bundle);
    state.spider_options = Some(spider_bundle);
    state.item_processor_options = Some(item_processor_bundle);
    state.downloader_child = Some(downloader_child);
    state.spider_child = Some(spider_child);
    state.item_processor_child = Some(item_processor_child);
    state.status = EngineStatus::Running;

    // 8. Spider callback whole-state hook.
    state.user_state = state.deps.callbacks.prepare_for_start(state.user_state.clone()).await;

    info!(spider = %state.spider, "engine setup complete, running");
    Ok(())
}

fn wrap_start_error(stage: Stage, err: EngineError) -> EngineError {
    match err {
        EngineError::StageStartFailed { .. } => err,
        other => EngineError::StageStartFailed { stage: stage.to_string(), message: other.to_string() },
    }
}

/// Builds the framework-supplied prefix for one stage: `spider`, this
/// stage's own `tid`, `next_tid` (Downloader/Spider only), the shared
/// `common_pipeline_tid`, and this stage's private `pipeline_tid`.
fn build_prefix(stage: Stage, spider: &SpiderId, tables: &HashMap<TableRole, TableHandle>) -> OptionBundle {
    let (own_role, own_pipeline_role, next_role) = match stage {
        Stage::Downloader => (TableRole::Downloader, TableRole::DownloaderPipeline, Some(TableRole::Spider)),
        Stage::Spider => (TableRole::Spider, TableRole::SpiderPipeline, Some(TableRole::ItemProcessor)),
        Stage::ItemProcessor => (TableRole::ItemProcessor, TableRole::ItemProcessorPipeline, None),
    };

    let mut bundle = OptionBundle::new();
    bundle.push("spider", serde_json::json!(spider.as_str()));
    bundle.push("tid", tables[&own_role].clone());
    if let Some(next_role) = next_role {
        bundle.push("next_tid", tables[&next_role].clone());
    }
    bundle.push("common_pipeline_tid", tables[&TableRole::CommonPipeline].clone());
    bundle.push("pipeline_tid", tables[&own_pipeline_role].clone());
    bundle
}

/// Suspend/continue broadcast: send the control message to all three
/// stages and require `[Ok, Ok, Ok]`. Any other reply is a contract
/// violation and crashes the Engine.
async fn broadcast_control(state: &ActorState, cmd: ControlCommand) -> EngineResult<()> {
    let children: [(&str, &dyn StageChild); 3] = [
        ("downloader", state.downloader_child.as_deref().expect("populated once running")),
        ("spider", state.spider_child.as_deref().expect("populated once running")),
        (
            "item_processor",
            state.item_processor_child.as_deref().expect("populated once running"),
        ),
    ];

    for (name, child) in children {
        match child.control(cmd).await {
            Ok(ControlAck::Ok) => {}
            Ok(ControlAck::Violation(detail)) => {
                error!(stage = name, detail = %detail, "control contract violation");
                return Err(EngineError::ControlContractViolation { stage: name.to_string(), got: detail });
            }
            Err(e) => {
                error!(stage = name, error = %e, "control endpoint errored");
                return Err(EngineError::ControlContractViolation { stage: name.to_string(), got: e.to_string() });
            }
        }
    }
    Ok(())
}

async fn handle_suspend(state: &mut ActorState) -> EngineResult<()> {
    if state.status == EngineStatus::Suspend {
        return Ok(());
    }
    broadcast_control(state, ControlCommand::Suspend).await?;
    state.status = EngineStatus::Suspend;
    Ok(())
}

async fn handle_continue(state: &mut ActorState) -> EngineResult<()> {
    if state.status == EngineStatus::Running {
        return Ok(());
    }
    broadcast_control(state, ControlCommand::Continue).await?;
    state.status = EngineStatus::Running;
    Ok(())
}

async fn handle_dump(state: &ActorState, file_base: Option<PathBuf>) -> EngineResult<Vec<PathBuf>> {
    if state.status != EngineStatus::Suspend {
        return Err(EngineError::StatusError);
    }

    let base = file_base.unwrap_or_else(|| {
        let unix_seconds = chrono::Utc::now().timestamp();
        persist::default_base(state.spider.as_str(), unix_seconds)
    });

    let tables = state.tables.as_ref().expect("populated once suspended");
    let mut ordered: Vec<(TableRole, TableHandle)> = Vec::with_capacity(7);
    for role in TableRole::ALL {
        ordered.push((role, tables[&role].clone()));
    }
    let ordered: [(TableRole, TableHandle); 7] = ordered.try_into().expect("exactly seven roles");

    persist::dump_all(&base, &ordered)
}

/// Teardown (spec §4.4), steps 1-4.
async fn handle_terminate(state: &mut ActorState, reason: String) {
    if reason.to_lowercase().contains("normal") || reason.is_empty() {
        info!(spider = %state.spider, reason = %reason, "engine terminating");
    } else {
        warn!(spider = %state.spider, reason = %reason, "engine terminating abnormally");
    }

    let stages: [(Stage, &Option<OptionBundle>); 3] = [
        (Stage::Downloader, &state.downloader_options),
        (Stage::Spider, &state.spider_options),
        (Stage::ItemProcessor, &state.item_processor_options),
    ];

    for (stage, bundle) in stages {
        if let Some(bundle) = bundle {
            state.deps.callbacks.prepare_for_stop_component(stage, bundle).await;
            state.deps.pipeline_hooks.prepare_for_stop(stage, bundle).await;
        }
    }

    state.deps.callbacks.prepare_for_stop(&state.user_state).await;

    registry::unregister_spider(&state.spider);
    state.status = EngineStatus::Terminating;

    // Asynchronously stop the spider's supervision tree. We have no real
    // supervisor in this workspace, so the detached task is a stand-in that
    // represents the remaining child shutdown proceeding on its own
    // timeline, bounded by the 60 second shutdown budget.
    let spider = state.spider.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        info!(spider = %spider, "supervision tree stop scheduled, engine returning");
    });
}

/// The Engine's shutdown budget: the parent supervisor must not kill the
/// Engine before this elapses.
pub const SHUTDOWN_BUDGET: Duration = Duration::from_secs(60);
