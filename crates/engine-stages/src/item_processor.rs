//! A demo ItemProcessor stage runner.

use async_trait::async_trait;
use engine::{EngineResult, OptionBundle, Stage, StageChild, StageRunner};
use tracing::info;

use crate::common::DemoStageChild;

#[derive(Default)]
pub struct DemoItemProcessor;

#[async_trait]
impl StageRunner for DemoItemProcessor {
    async fn start(&self, bundle: &OptionBundle) -> EngineResult<Box<dyn StageChild>> {
        info!("starting demo item_processor stage");
        Ok(Box::new(DemoStageChild::new(Stage::ItemProcessor, bundle)))
    }
}
