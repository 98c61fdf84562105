//! Shared demo stage-child plumbing used by the Downloader/Spider/
//! ItemProcessor runners. Grounded in `pipeline::stages::test_stage`'s
//! `StatefulTestStage`: a minimal pass-through stage whose only real job is
//! to exercise the control plane.

use async_trait::async_trait;
use engine::{ControlAck, ControlCommand, EngineResult, OptionBundle, Stage, StageChild};
use tracing::{debug, warn};

/// A stage child that does no real work: it acknowledges `suspend`/
/// `continue` and optionally simulates a control-contract violation, for
/// exercising the Engine's crash-on-violation path.
pub struct DemoStageChild {
    id: String,
    stage: Stage,
    simulate_violation: bool,
}

impl DemoStageChild {
    pub fn new(stage: Stage, bundle: &OptionBundle) -> Self {
        let spider = bundle.get("spider").and_then(|v| v.as_str()).unwrap_or("unknown");
        let simulate_violation = bundle
            .get("simulate_violation")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Self {
            id: format!("{}:{}", spider, stage),
            stage,
            simulate_violation,
        }
    }
}

#[async_trait]
impl StageChild for DemoStageChild {
    fn id(&self) -> String {
        self.id.clone()
    }

    async fn control(&self, cmd: ControlCommand) -> EngineResult<ControlAck> {
        if self.simulate_violation {
            warn!(stage = %self.stage, "demo stage simulating a control contract violation");
            return Ok(ControlAck::Violation("demo stage configured to misbehave".to_string()));
        }

        match cmd {
            ControlCommand::Suspend => debug!(stage = %self.stage, id = %self.id, "suspended"),
            ControlCommand::Continue => debug!(stage = %self.stage, id = %self.id, "resumed"),
        }
        Ok(ControlAck::Ok)
    }
}
