//! Hook trait and dispatch
//!
//! Hooks observe the iterator and decide policy: which splits to evaluate,
//! when to log, when to checkpoint. All methods have default no-op
//! implementations, so a hook only implements the events it cares about.
//!
//! Hook methods take `&self`. A hook that pulls a split from inside
//! `after_step` re-enters `before_step` on every registered hook (itself
//! included) while its own call is still running, so mutable hook state
//! belongs in a `Cell` or `RefCell` that is not held across a pull.

use super::fetch::Fetches;
use super::lazy::StepResults;
use super::state::StepState;
use crate::error::{Error, Result};
use crate::nested::Nested;

/// Which of the two hook lists a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    /// Offered every registered split on each tick of the fast training loop
    Step,
    /// Offered one split per tick in the per-split epoch loop
    Epoch,
}

/// Whether a skipped step callback replaces `before_step` or `after_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Before,
    After,
}

/// Trait for iterator hooks
pub trait Hook<M, L, O> {
    /// Called at the start of an epoch (and, for epoch hooks, of each split pass)
    fn before_epoch(&self, _state: &StepState, _epoch: usize) -> Result<()> {
        Ok(())
    }

    /// Called at the end of an epoch (and, for epoch hooks, of each split pass)
    fn after_epoch(&self, _state: &StepState, _epoch: usize) -> Result<()> {
        Ok(())
    }

    /// Called after a batch was pulled, before the fetches are evaluated.
    ///
    /// Hooks may add, replace or remove fetches.
    fn before_step(
        &self,
        _state: &StepState,
        _index: usize,
        _fetches: &mut Fetches<M, L, O>,
        _feeds: &Nested<L>,
        _batch: &Nested<L>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once per tick with the per-split results.
    ///
    /// Splits are evaluated only when a hook materializes them.
    fn after_step(&self, _state: &StepState, _index: usize, _results: &StepResults<'_, M, L, O>) -> Result<()> {
        Ok(())
    }

    /// Called instead of `before_step`/`after_step` when the global step is
    /// not a multiple of the hook frequency.
    fn skipped_step(&self, _state: &StepState, _index: usize, _phase: StepPhase) -> Result<()> {
        Ok(())
    }

    /// Called when iteration fails or a shutdown is requested
    fn at_exception(&self, _state: &StepState, _error: &Error) {}

    /// Get hook name for logging
    fn name(&self) -> &'static str {
        "Hook"
    }
}

type BoxedHook<M, L, O> = Box<dyn Hook<M, L, O>>;

/// Ordered step and epoch hook lists with frequency-gated dispatch
pub struct HookRunner<M, L, O> {
    step_hooks: Vec<BoxedHook<M, L, O>>,
    epoch_hooks: Vec<BoxedHook<M, L, O>>,
    hook_freq: u64,
}

impl<M, L, O> HookRunner<M, L, O> {
    /// Create an empty runner sampling step hooks every `hook_freq` global steps
    pub fn new(hook_freq: u64) -> Self {
        Self { step_hooks: Vec::new(), epoch_hooks: Vec::new(), hook_freq: hook_freq.max(1) }
    }

    /// Add a hook to the end of a list
    pub fn register<H: Hook<M, L, O> + 'static>(&mut self, hook: H, scope: HookScope) {
        self.register_boxed(Box::new(hook), scope);
    }

    /// Add an already boxed hook to the end of a list
    pub fn register_boxed(&mut self, hook: BoxedHook<M, L, O>, scope: HookScope) {
        self.list_mut(scope).push(hook);
    }

    /// Hooks of one scope, in registration order
    pub fn hooks(&self, scope: HookScope) -> &[BoxedHook<M, L, O>] {
        match scope {
            HookScope::Step => &self.step_hooks,
            HookScope::Epoch => &self.epoch_hooks,
        }
    }

    /// Total number of registered hooks
    pub fn len(&self) -> usize {
        self.step_hooks.len() + self.epoch_hooks.len()
    }

    /// Check if no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sampling divisor for step callbacks
    pub fn hook_freq(&self) -> u64 {
        self.hook_freq
    }

    /// Whether step callbacks carry their full payload at `global_step`
    pub fn is_sampled(&self, global_step: u64) -> bool {
        global_step % self.hook_freq == 0
    }

    /// Fire `before_epoch`
    pub fn dispatch_before_epoch(&self, scope: HookScope, state: &StepState, epoch: usize) -> Result<()> {
        self.hooks(scope).iter().try_for_each(|hook| hook.before_epoch(state, epoch))
    }

    /// Fire `after_epoch`
    pub fn dispatch_after_epoch(&self, scope: HookScope, state: &StepState, epoch: usize) -> Result<()> {
        self.hooks(scope).iter().try_for_each(|hook| hook.after_epoch(state, epoch))
    }

    /// Fire `before_step`, or `skipped_step` when the global step is not sampled
    pub fn dispatch_before_step(
        &self,
        scope: HookScope,
        state: &StepState,
        index: usize,
        fetches: &mut Fetches<M, L, O>,
        feeds: &Nested<L>,
        batch: &Nested<L>,
    ) -> Result<()> {
        let sampled = self.is_sampled(state.global_step());
        for hook in self.hooks(scope) {
            if sampled {
                hook.before_step(state, index, fetches, feeds, batch)?;
            } else {
                hook.skipped_step(state, index, StepPhase::Before)?;
            }
        }
        Ok(())
    }

    /// Fire `after_step`, or `skipped_step` when the global step is not sampled
    pub fn dispatch_after_step(
        &self,
        scope: HookScope,
        state: &StepState,
        index: usize,
        results: &StepResults<'_, M, L, O>,
    ) -> Result<()> {
        let sampled = self.is_sampled(state.global_step());
        for hook in self.hooks(scope) {
            if sampled {
                hook.after_step(state, index, results)?;
            } else {
                hook.skipped_step(state, index, StepPhase::After)?;
            }
        }
        Ok(())
    }

    /// Fire `at_exception` on every hook: step hooks first, then epoch hooks
    pub fn dispatch_exception(&self, state: &StepState, error: &Error) {
        for hook in self.step_hooks.iter().chain(&self.epoch_hooks) {
            log::debug!("Notifying {} of: {error}", hook.name());
            hook.at_exception(state, error);
        }
    }

    fn list_mut(&mut self, scope: HookScope) -> &mut Vec<BoxedHook<M, L, O>> {
        match scope {
            HookScope::Step => &mut self.step_hooks,
            HookScope::Epoch => &mut self.epoch_hooks,
        }
    }
}
