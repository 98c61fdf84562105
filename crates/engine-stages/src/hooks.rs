//! A no-op `PipelineHooks` implementation for demos/tests that don't care
//! about per-stage teardown middleware.

use async_trait::async_trait;
use engine::{OptionBundle, PipelineHooks, Stage};
use tracing::debug;

#[derive(Default)]
pub struct NoopPipelineHooks;

#[async_trait]
impl PipelineHooks for NoopPipelineHooks {
    async fn prepare_for_stop(&self, stage: Stage, _bundle: &OptionBundle) {
        debug!(stage = %stage, "no-op pipeline hook: prepare_for_stop");
    }
}
