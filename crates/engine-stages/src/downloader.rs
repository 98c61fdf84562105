//! A demo Downloader stage runner.

use async_trait::async_trait;
use engine::{EngineResult, OptionBundle, Stage, StageChild, StageRunner};
use tracing::info;

use crate::common::DemoStageChild;

#[derive(Default)]
pub struct DemoDownloader;

#[async_trait]
impl StageRunner for DemoDownloader {
    async fn start(&self, bundle: &OptionBundle) -> EngineResult<Box<dyn StageChild>> {
        info!("starting demo downloader stage");
        Ok(Box::new(DemoStageChild::new(Stage::Downloader, bundle)))
    }
}
