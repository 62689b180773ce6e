//! Hooked model iterator
//!
//! The engine that drives a model over its splits: step state, the fetch
//! evaluator, lazy per-split thunks, hook dispatch, signal shutdown and the
//! epoch loop itself.

mod driver;
mod fetch;
mod hooks;
mod lazy;
mod shutdown;
mod state;

pub use driver::{IterateSummary, ModelIterator};
pub use fetch::{run, FetchOp, Fetches};
pub use hooks::{Hook, HookRunner, HookScope, StepPhase};
pub use lazy::{LazySplit, StepResults};
pub use shutdown::{ShutdownController, ShutdownHandle, ShutdownRequest};
pub use state::StepState;
