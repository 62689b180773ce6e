//! Stock hooks
//!
//! Ready-made hooks for the common policies:
//! - [`TrainHook`] / [`ValidationHook`]: pull the train and validation splits
//!   during the fast loop
//! - [`EvaluationHook`]: runs every offered split during the per-split pass
//! - [`LoggingHook`]: logs whatever other hooks evaluated
//! - [`CheckpointHook`]: persists the step state at epoch end and on failure
//!
//! # Example
//!
//! ```rust
//! use hookloop::hooks::{Checkpoint, CheckpointReason};
//!
//! let checkpoint = Checkpoint::new(120, 3, CheckpointReason::EpochEnd);
//! assert_eq!(checkpoint.global_step, 120);
//! ```

mod checkpoint;
mod logging;
mod split;

pub use checkpoint::{Checkpoint, CheckpointHook, CheckpointReason};
pub use logging::LoggingHook;
pub use split::{EvaluationHook, TrainHook, ValidationHook};
