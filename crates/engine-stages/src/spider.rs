//! A demo Spider stage runner.

use async_trait::async_trait;
use engine::{EngineResult, OptionBundle, Stage, StageChild, StageRunner};
use tracing::info;

use crate::common::DemoStageChild;

#[derive(Default)]
pub struct DemoSpider;

#[async_trait]
impl StageRunner for DemoSpider {
    async fn start(&self, bundle: &OptionBundle) -> EngineResult<Box<dyn StageChild>> {
        info!("starting demo spider stage");
        Ok(Box::new(DemoStageChild::new(Stage::Spider, bundle)))
    }
}
