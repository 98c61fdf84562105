//! Per-spider control plane: assembles the three-stage pipeline, owns the
//! seven shared tables, and drives the preparing -> running -> suspend ->
//! terminating lifecycle.

mod bundle;
mod callbacks;
mod config;
mod engine;
mod error;
mod ids;
mod persist;
mod plugins;
mod registry;
mod stage;
mod table;

pub use bundle::{BundleValue, OptionBundle};
pub use callbacks::{NoopSpiderCallbacks, SpiderCallbacks, SpiderState};
pub use config::EngineConfig;
pub use engine::{Engine, EngineDeps, EngineRef, SHUTDOWN_BUDGET};
pub use error::{EngineError, EngineResult};
pub use ids::{EngineStatus, SpiderId, Stage, TableRole};
pub use plugins::{
    resolve_requester, resolve_storage, RequesterPlugin, RequesterPluginRegistry, StoragePlugin,
    StoragePluginRegistry, DEFAULT_REQUESTER,
};
pub use registry::{lookup, publish, unregister_spider};
pub use stage::{ControlAck, ControlCommand, PipelineHooks, StageChild, StageRunner};
pub use table::{SharedTable, TableHandle};
