//! RequesterPlugin / StoragePlugin resolution (spec §4.5, §4.6).
//!
//! Both stages read a "spec" option (`requester` for the Downloader,
//! `storage` for the ItemProcessor) that is either absent, a bare plugin
//! identifier, or an `(identifier, args)` pair. The resolved identifier is
//! injected into the bundle's `context` map; if the named plugin is
//! registered and implements `prepare_for_start`, it gets a chance to
//! rewrite the bundle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::bundle::OptionBundle;
use crate::error::{EngineError, EngineResult};

/// A resolvable requester implementation contributing to the Downloader's
/// options bundle at setup time.
#[async_trait]
pub trait RequesterPlugin: Send + Sync {
    /// Rewrite the bundle given the plugin's resolved args. The default
    /// identity implementation leaves the bundle unchanged, matching
    /// "otherwise the bundle is unchanged" in the spec.
    async fn prepare_for_start(&self, _args: &Value, bundle: OptionBundle) -> EngineResult<OptionBundle> {
        Ok(bundle)
    }
}

/// A resolvable storage implementation contributing to the ItemProcessor's
/// options bundle at setup time.
#[async_trait]
pub trait StoragePlugin: Send + Sync {
    async fn prepare_for_start(&self, _args: &Value, bundle: OptionBundle) -> EngineResult<OptionBundle> {
        Ok(bundle)
    }
}

/// The framework default requester identifier, used when the bundle omits
/// the `requester` option entirely.
pub const DEFAULT_REQUESTER: &str = "default";

/// Name-keyed set of installed requester plugins.
#[derive(Clone, Default)]
pub struct RequesterPluginRegistry(HashMap<String, Arc<dyn RequesterPlugin>>);

impl RequesterPluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: impl Into<String>, plugin: Arc<dyn RequesterPlugin>) {
        self.0.insert(identifier.into(), plugin);
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<dyn RequesterPlugin>> {
        self.0.get(identifier)
    }
}

/// Name-keyed set of installed storage plugins.
#[derive(Clone, Default)]
pub struct StoragePluginRegistry(HashMap<String, Arc<dyn StoragePlugin>>);

impl StoragePluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: impl Into<String>, plugin: Arc<dyn StoragePlugin>) {
        self.0.insert(identifier.into(), plugin);
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<dyn StoragePlugin>> {
        self.0.get(identifier)
    }
}

/// A parsed `requester`/`storage` option value.
enum Spec {
    Absent,
    Identifier(String),
    WithArgs(String, Value),
}

fn parse_spec(bundle: &OptionBundle, key: &str) -> EngineResult<Spec> {
    match bundle.get(key) {
        None | Some(Value::Null) => Ok(Spec::Absent),
        Some(Value::String(id)) => Ok(Spec::Identifier(id.clone())),
        Some(Value::Array(items)) if items.len() == 2 => match &items[0] {
            Value::String(id) => Ok(Spec::WithArgs(id.clone(), items[1].clone())),
            _ => Err(EngineError::InvalidRequesterSpec {
                message: format!("'{}' pair's first element must be a string identifier", key),
            }),
        },
        Some(other) => Err(EngineError::InvalidRequesterSpec {
            message: format!("'{}' must be absent, a string, or a [id, args] pair, got {}", key, other),
        }),
    }
}

/// Resolve the Downloader bundle's `requester` option (spec §4.5).
pub async fn resolve_requester(
    mut bundle: OptionBundle,
    registry: &RequesterPluginRegistry,
) -> EngineResult<OptionBundle> {
    let spec = parse_spec(&bundle, "requester").map_err(|e| match e {
        EngineError::InvalidRequesterSpec { message } => EngineError::InvalidRequesterSpec { message },
        other => other,
    })?;

    let (identifier, args) = match spec {
        Spec::Absent => (DEFAULT_REQUESTER.to_string(), Value::Null),
        Spec::Identifier(id) => (id, Value::Null),
        Spec::WithArgs(id, args) => (id, args),
    };

    let mut context = bundle
        .get("context")
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    context.insert("requester".to_string(), json!(identifier));
    bundle.set("context", Value::Object(context));

    if let Some(plugin) = registry.get(&identifier) {
        bundle = plugin.prepare_for_start(&args, bundle).await?;
    }

    Ok(bundle)
}

/// Resolve the ItemProcessor bundle's `storage` option (spec §4.6).
pub async fn resolve_storage(
    mut bundle: OptionBundle,
    registry: &StoragePluginRegistry,
) -> EngineResult<OptionBundle> {
    let spec = parse_spec(&bundle, "storage").map_err(|e| match e {
        EngineError::InvalidRequesterSpec { message } => EngineError::InvalidStorageSpec { message },
        other => other,
    })?;

    let (identifier, args) = match spec {
        Spec::Absent => ("default".to_string(), Value::Null),
        Spec::Identifier(id) => (id, Value::Null),
        Spec::WithArgs(id, args) => (id, args),
    };

    if let Some(plugin) = registry.get(&identifier) {
        bundle = plugin.prepare_for_start(&args, bundle).await?;
    }

    let mut context = bundle
        .get("context")
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    context.insert("storage".to_string(), json!(identifier));
    context.insert("storage_options".to_string(), args);
    bundle.set("context", Value::Object(context));

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoPlugin;

    #[async_trait]
    impl RequesterPlugin for EchoPlugin {
        async fn prepare_for_start(&self, args: &Value, mut bundle: OptionBundle) -> EngineResult<OptionBundle> {
            bundle.set("echoed_args", args.clone());
            Ok(bundle)
        }
    }

    #[tokio::test]
    async fn absent_requester_resolves_to_default() {
        let bundle = OptionBundle::new();
        let registry = RequesterPluginRegistry::new();
        let resolved = resolve_requester(bundle, &registry).await.unwrap();
        let context = resolved.get("context").unwrap().as_object().unwrap();
        assert_eq!(context["requester"], json!(DEFAULT_REQUESTER));
    }

    #[tokio::test]
    async fn pair_spec_invokes_plugin_with_args() {
        let mut bundle = OptionBundle::new();
        bundle.push("requester", json!(["echo", {"k": 1}]));

        let mut registry = RequesterPluginRegistry::new();
        registry.register("echo", Arc::new(EchoPlugin));

        let resolved = resolve_requester(bundle, &registry).await.unwrap();
        assert_eq!(resolved.get("echoed_args"), Some(&json!({"k": 1})));
        let context = resolved.get("context").unwrap().as_object().unwrap();
        assert_eq!(context["requester"], json!("echo"));
    }

    #[tokio::test]
    async fn malformed_spec_is_rejected() {
        let mut bundle = OptionBundle::new();
        bundle.push("requester", json!(42));
        let registry = RequesterPluginRegistry::new();
        let result = resolve_requester(bundle, &registry).await;
        assert!(matches!(result, Err(EngineError::InvalidRequesterSpec { .. })));
    }
}
