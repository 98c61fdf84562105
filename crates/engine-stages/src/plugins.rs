//! Demo requester/storage plugins: `"http"` and `"memory"`, registered
//! under those identifiers so a config's `requester`/`storage` options can
//! name them directly.

use async_trait::async_trait;
use engine::{EngineResult, OptionBundle, RequesterPlugin, StoragePlugin};
use serde_json::Value;

/// Stands in for a real HTTP client plugin: records whatever args the
/// config passed under a `requester_args` key so tests/demos can observe
/// what was resolved.
#[derive(Default)]
pub struct HttpRequesterPlugin;

#[async_trait]
impl RequesterPlugin for HttpRequesterPlugin {
    async fn prepare_for_start(&self, args: &Value, mut bundle: OptionBundle) -> EngineResult<OptionBundle> {
        bundle.set("requester_args", args.clone());
        Ok(bundle)
    }
}

/// Stands in for a real storage backend: the demo engine-cli binary wires
/// this up as the default `"memory"` storage.
#[derive(Default)]
pub struct MemoryStoragePlugin;

#[async_trait]
impl StoragePlugin for MemoryStoragePlugin {
    async fn prepare_for_start(&self, args: &Value, mut bundle: OptionBundle) -> EngineResult<OptionBundle> {
        bundle.set("storage_args", args.clone());
        Ok(bundle)
    }
}
