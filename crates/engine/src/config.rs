//! Configuration consumed at Engine construction (spec §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::OptionBundle;
use crate::error::{EngineError, EngineResult};
use crate::ids::SpiderId;

/// The plain-data configuration options consumed at construction. Separate
/// from the Engine's runtime collaborators (`EngineDeps`) so this half can
/// be deserialized straight from a YAML/JSON config file, the way
/// `SystemConfig` is loaded in the teacher's daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    pub spider: String,
    #[serde(default)]
    pub downloader_options: HashMap<String, Value>,
    #[serde(default)]
    pub spider_options: HashMap<String, Value>,
    #[serde(default)]
    pub item_processor_options: HashMap<String, Value>,
    /// Base path for `load_from_file`; when set, setup loads the seven
    /// tables from `<base>_<role>.ets` instead of creating fresh ones.
    #[serde(default)]
    pub load_from_file: Option<String>,
}

impl EngineConfig {
    pub fn new(spider: impl Into<String>) -> Self {
        Self {
            spider: spider.into(),
            ..Default::default()
        }
    }

    pub fn with_load_from_file(mut self, base: impl Into<String>) -> Self {
        self.load_from_file = Some(base.into());
        self
    }

    pub fn with_downloader_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.downloader_options.insert(key.into(), value);
        self
    }

    pub fn with_spider_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.spider_options.insert(key.into(), value);
        self
    }

    pub fn with_item_processor_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.item_processor_options.insert(key.into(), value);
        self
    }

    /// Validate and extract the `SpiderId`. `spider` is the only required
    /// construction option; a missing/empty value is a fatal configuration
    /// error that prevents the Engine from starting.
    pub fn spider_id(&self) -> EngineResult<SpiderId> {
        if self.spider.trim().is_empty() {
            return Err(EngineError::MissingSpider);
        }
        Ok(SpiderId::new(self.spider.clone()))
    }

    pub fn downloader_overrides(&self) -> OptionBundle {
        map_to_bundle(&self.downloader_options)
    }

    pub fn spider_overrides(&self) -> OptionBundle {
        map_to_bundle(&self.spider_options)
    }

    pub fn item_processor_overrides(&self) -> OptionBundle {
        map_to_bundle(&self.item_processor_options)
    }
}

fn map_to_bundle(map: &HashMap<String, Value>) -> OptionBundle {
    let mut bundle = OptionBundle::new();
    for (k, v) in map {
        bundle.push(k.clone(), v.clone());
    }
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_spider_is_a_configuration_error() {
        let config = EngineConfig::default();
        assert!(matches!(config.spider_id(), Err(EngineError::MissingSpider)));
    }

    #[test]
    fn blank_spider_is_also_rejected() {
        let config = EngineConfig::new("   ");
        assert!(matches!(config.spider_id(), Err(EngineError::MissingSpider)));
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{"spider": "s1", "downloader_options": {"timeout_ms": 500}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.spider, "s1");
        assert_eq!(config.downloader_options["timeout_ms"], Value::from(500));
    }
}
