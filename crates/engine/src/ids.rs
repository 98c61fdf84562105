//! Opaque identifiers used throughout the engine.

use std::fmt;

/// Identifies a single engine instance. Two engines with the same `SpiderId`
/// must not coexist in a process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SpiderId(String);

impl SpiderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpiderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SpiderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The seven table roles the Engine creates or loads per spider, exactly as
/// named in the on-disk file convention `<base>_<role>.ets`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableRole {
    Downloader,
    Spider,
    ItemProcessor,
    CommonPipeline,
    DownloaderPipeline,
    SpiderPipeline,
    ItemProcessorPipeline,
}

impl TableRole {
    /// All seven roles, in a fixed canonical order.
    pub const ALL: [TableRole; 7] = [
        TableRole::Downloader,
        TableRole::Spider,
        TableRole::ItemProcessor,
        TableRole::CommonPipeline,
        TableRole::DownloaderPipeline,
        TableRole::SpiderPipeline,
        TableRole::ItemProcessorPipeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableRole::Downloader => "downloader",
            TableRole::Spider => "spider",
            TableRole::ItemProcessor => "item_processor",
            TableRole::CommonPipeline => "common_pipeline",
            TableRole::DownloaderPipeline => "downloader_pipeline",
            TableRole::SpiderPipeline => "spider_pipeline",
            TableRole::ItemProcessorPipeline => "item_processor_pipeline",
        }
    }

    /// Whether this role's table carries extra read-concurrency because it
    /// is read on every element flowing through a stage (the four
    /// pipeline/middleware tables), as opposed to the three data-stage
    /// tables which are write-concurrency only.
    pub fn is_pipeline_table(&self) -> bool {
        matches!(
            self,
            TableRole::CommonPipeline
                | TableRole::DownloaderPipeline
                | TableRole::SpiderPipeline
                | TableRole::ItemProcessorPipeline
        )
    }
}

/// The stage kind a bundle/child-id belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Downloader,
    Spider,
    ItemProcessor,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Downloader => "downloader",
            Stage::Spider => "spider",
            Stage::ItemProcessor => "item_processor",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an Engine. See the transition table in the spec:
/// preparing -> running -> suspend -> running, any -> terminating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EngineStatus {
    Preparing,
    Running,
    Suspend,
    Terminating,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineStatus::Preparing => "preparing",
            EngineStatus::Running => "running",
            EngineStatus::Suspend => "suspend",
            EngineStatus::Terminating => "terminating",
        };
        write!(f, "{}", s)
    }
}
