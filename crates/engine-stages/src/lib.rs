//! Demo stage collaborators used by the `engine-cli` binary and by the
//! `engine` crate's integration tests: pass-through stage runners plus
//! `"http"`/`"memory"` plugins, in the spirit of
//! `pipeline::stages::register_builtin_stages`.

mod common;
mod downloader;
mod hooks;
mod item_processor;
mod plugins;
mod spider;

pub use common::DemoStageChild;
pub use downloader::DemoDownloader;
pub use hooks::NoopPipelineHooks;
pub use item_processor::DemoItemProcessor;
pub use plugins::{HttpRequesterPlugin, MemoryStoragePlugin};
pub use spider::DemoSpider;

use engine::{RequesterPluginRegistry, StoragePluginRegistry};
use std::sync::Arc;

/// Builds the registries with the demo `"http"`/`"memory"` plugins
/// installed, mirroring `pipeline::stages::register_builtin_stages`'s
/// one-call setup convenience.
pub fn register_demo_plugins() -> (RequesterPluginRegistry, StoragePluginRegistry) {
    let mut requesters = RequesterPluginRegistry::new();
    requesters.register("http", Arc::new(HttpRequesterPlugin));

    let mut storages = StoragePluginRegistry::new();
    storages.register("memory", Arc::new(MemoryStoragePlugin));

    (requesters, storages)
}
