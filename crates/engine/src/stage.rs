//! The Stage Runner contract: what the Engine requires from each of the
//! three external collaborators (Downloader, Spider, ItemProcessor), and
//! the `PipelineHooks` middleware lifecycle contract.

use async_trait::async_trait;

use crate::bundle::OptionBundle;
use crate::error::EngineResult;
use crate::ids::Stage;

/// A control message the Engine broadcasts to a running stage child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Suspend,
    Continue,
}

/// A stage child's reply to a control message. Anything other than `Ok` is
/// a contract violation (see `EngineError::ControlContractViolation`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlAck {
    Ok,
    Violation(String),
}

/// A handle to one started, supervised stage child.
#[async_trait]
pub trait StageChild: Send + Sync {
    /// An identifier for this child, used in logs and error messages.
    fn id(&self) -> String;

    /// Send a control message and await the stage's acknowledgement. Must
    /// not mutate this stage's own `tid` or any downstream `next_tid`
    /// while suspended.
    async fn control(&self, cmd: ControlCommand) -> EngineResult<ControlAck>;
}

/// A factory for one of the three pipeline stages. Supplied by the caller;
/// the Engine only ever calls `start` once per stage, during setup.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Construct and start a supervised child from the finalized options
    /// bundle. Must succeed synchronously (from the Engine's point of view)
    /// or the whole setup aborts.
    async fn start(&self, bundle: &OptionBundle) -> EngineResult<Box<dyn StageChild>>;
}

/// Per-stage middleware lifecycle hook, invoked during teardown after the
/// SpiderCallback's `prepare_for_stop_component` and before the supervisor
/// is asked to stop.
#[async_trait]
pub trait PipelineHooks: Send + Sync {
    async fn prepare_for_stop(&self, stage: Stage, bundle: &OptionBundle);
}
