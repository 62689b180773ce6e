//! Step state shared with hooks
//!
//! The driver owns a single [`StepState`] and hands hooks a shared reference
//! on every call. Fields use interior mutability because hooks run while the
//! driver still needs to advance the state (a thunk invoked from a hook
//! records the split it is processing).

use std::cell::{Cell, RefCell};

/// Where the iterator currently is
#[derive(Debug, Default)]
pub struct StepState {
    global_step: Cell<u64>,
    epoch_step: Cell<usize>,
    batch_step: Cell<usize>,
    split: RefCell<Option<String>>,
    frozen: Cell<bool>,
    started: Cell<bool>,
}

impl StepState {
    /// Create state at global step zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of training ticks processed, including restored steps
    pub fn global_step(&self) -> u64 {
        self.global_step.get()
    }

    /// Current epoch index
    pub fn epoch_step(&self) -> usize {
        self.epoch_step.get()
    }

    /// Current batch index within the running loop
    pub fn batch_step(&self) -> usize {
        self.batch_step.get()
    }

    /// Split of the most recently materialized thunk
    pub fn split(&self) -> Option<String> {
        self.split.borrow().clone()
    }

    /// Whether the global step is frozen (dry-run mode)
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// Whether iteration has started
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    pub(crate) fn set_global_step(&self, step: u64) {
        self.global_step.set(step);
    }

    /// Advance the global step by one unless frozen; returns the new value
    pub(crate) fn increment_global_step(&self) -> u64 {
        if !self.frozen.get() {
            self.global_step.set(self.global_step.get() + 1);
        }
        self.global_step.get()
    }

    pub(crate) fn set_epoch_step(&self, epoch: usize) {
        self.epoch_step.set(epoch);
    }

    pub(crate) fn set_batch_step(&self, batch: usize) {
        self.batch_step.set(batch);
    }

    pub(crate) fn set_split(&self, split: &str) {
        *self.split.borrow_mut() = Some(split.to_string());
    }

    pub(crate) fn start(&self, frozen: bool) {
        self.frozen.set(frozen);
        self.started.set(true);
    }
}
