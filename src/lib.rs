//! Hookloop: a model-agnostic training loop driven by lifecycle hooks.
//!
//! The crate separates *how to iterate* (epochs, batches, splits, the global
//! step, checkpoints, shutdown) from *what the model computes*. A
//! [`ModelIterator`] pulls batches from named [`stream`] splits, offers each
//! tick to [`Hook`]s as lazy per-split thunks, and evaluates a split's fetch
//! structure only when some hook asks for it.
//!
//! # Example
//!
//! ```rust
//! use hookloop::hooks::TrainHook;
//! use hookloop::stream::{DatasetStream, SplitRegistry};
//! use hookloop::{FetchOp, IterConfig, ModelIterator, Nested};
//!
//! #[derive(Default)]
//! struct Counter {
//!     total: i64,
//! }
//!
//! let config = IterConfig::new().with_num_epochs(2).with_hook_freq(1);
//! let mut iterator = ModelIterator::new(config, Counter::default(), |_: &Counter| {
//!     Nested::map().with(
//!         "add",
//!         FetchOp::new(|model: &mut Counter, feeds: &Nested<i64>| {
//!             model.total += feeds.leaves().into_iter().sum::<i64>();
//!             Ok(model.total)
//!         }),
//!     )
//! })?;
//! iterator.add_hook(TrainHook::new());
//!
//! let data: Vec<Nested<i64>> = (1..=4).map(Nested::Leaf).collect();
//! let mut splits = SplitRegistry::new(DatasetStream::new(data, 2)?);
//! let summary = iterator.iterate(&mut splits)?;
//!
//! assert_eq!(summary.global_step, 4);
//! assert_eq!(iterator.model().total, 20);
//! # Ok::<(), hookloop::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod iterator;
pub mod nested;
pub mod stream;

pub use config::IterConfig;
pub use error::{Error, Result};
pub use iterator::{
    FetchOp, Fetches, Hook, HookScope, IterateSummary, ModelIterator, ShutdownController,
    StepResults, StepState,
};
pub use nested::Nested;
