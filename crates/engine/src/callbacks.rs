//! `SpiderCallbacks`: optional per-spider user hooks.
//!
//! The source probes for each callback's presence and calls it only when
//! defined. Rust has no capability-check for "does this function exist", so
//! per the design notes this becomes a trait with identity-default methods:
//! a spider that implements none of them behaves exactly as if none were
//! defined, and the Engine always calls every method unconditionally.

use async_trait::async_trait;

use crate::bundle::OptionBundle;
use crate::ids::Stage;

/// Free-form user state threaded through `prepare_for_start` /
/// `prepare_for_stop`. Not the Engine's internal state — just whatever a
/// spider module wants to carry between its own lifecycle hooks.
pub type SpiderState = serde_json::Value;

/// Optional per-spider lifecycle hooks.
#[async_trait]
pub trait SpiderCallbacks: Send + Sync {
    /// Called once after all three stages have started and the Engine has
    /// transitioned to `running`. The returned state is adopted as-is.
    async fn prepare_for_start(&self, state: SpiderState) -> SpiderState {
        state
    }

    /// Called once per stage during setup, after plugin resolution, letting
    /// the spider rewrite that stage's finalized bundle.
    async fn prepare_for_start_component(&self, _stage: Stage, bundle: OptionBundle) -> OptionBundle {
        bundle
    }

    /// Called once during teardown, after every stage's
    /// `prepare_for_stop_component` has run.
    async fn prepare_for_stop(&self, _state: &SpiderState) {}

    /// Called once per stage during teardown, before the corresponding
    /// `PipelineHooks::prepare_for_stop`.
    async fn prepare_for_stop_component(&self, _stage: Stage, _bundle: &OptionBundle) {}
}

/// The callbacks used when a spider defines none of its own: every hook is
/// the identity/no-op default.
pub struct NoopSpiderCallbacks;

impl SpiderCallbacks for NoopSpiderCallbacks {}
