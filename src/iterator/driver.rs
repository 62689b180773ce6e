//! Training loop driver
//!
//! Each epoch has two phases:
//!
//! 1. A fast loop over the train split. Every tick offers step hooks one
//!    thunk per registered split and advances the global step. The loop ends
//!    when the train stream crosses an epoch boundary, when the step budget
//!    is reached, or after `len(train)` ticks.
//! 2. A per-split pass for epoch hooks. Each split is offered one thunk per
//!    tick for as long as some hook keeps invoking it.

use super::fetch::Fetches;
use super::hooks::{Hook, HookRunner, HookScope};
use super::lazy::{RunContext, StepResults};
use super::shutdown::{ShutdownController, ShutdownRequest};
use super::state::StepState;
use crate::config::{validate_config, IterConfig};
use crate::error::{Error, Result};
use crate::hooks::Checkpoint;
use crate::stream::{SplitRegistry, TRAIN, VALIDATION};
use std::cell::{Ref, RefCell};
use std::path::Path;

type StepOpsFn<M, L, O> = dyn Fn(&M) -> Fetches<M, L, O>;

/// Outcome of [`ModelIterator::iterate`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IterateSummary {
    /// Epochs that ran to completion
    pub epochs: usize,
    /// Global step when iteration stopped
    pub global_step: u64,
    /// Whether validation was defaulted to the train split (dry run)
    pub validation_fallback: bool,
    /// Set when iteration stopped because of a termination signal
    pub shutdown: Option<ShutdownRequest>,
}

/// Drives a model over its data splits, notifying hooks along the way
pub struct ModelIterator<M, L, O> {
    config: IterConfig,
    model: RefCell<M>,
    hooks: HookRunner<M, L, O>,
    state: StepState,
    step_ops: Box<StepOpsFn<M, L, O>>,
    shutdown: Option<ShutdownController>,
}

impl<M, L: Clone, O> ModelIterator<M, L, O> {
    /// Create an iterator.
    ///
    /// `step_ops` builds the fetch structure evaluated on every tick. It is
    /// called once at the start of [`iterate`](Self::iterate).
    pub fn new<F>(config: IterConfig, model: M, step_ops: F) -> Result<Self>
    where
        F: Fn(&M) -> Fetches<M, L, O> + 'static,
    {
        validate_config(&config)?;
        Ok(Self {
            hooks: HookRunner::new(config.hook_freq),
            config,
            model: RefCell::new(model),
            state: StepState::new(),
            step_ops: Box::new(step_ops),
            shutdown: None,
        })
    }

    /// Attach a shutdown controller checked at every tick boundary
    pub fn with_shutdown(mut self, controller: ShutdownController) -> Self {
        self.shutdown = Some(controller);
        self
    }

    /// Register a step-scoped hook
    pub fn add_hook<H: Hook<M, L, O> + 'static>(&mut self, hook: H) {
        self.hooks.register(hook, HookScope::Step);
    }

    /// Register an epoch-scoped hook
    pub fn add_epoch_hook<H: Hook<M, L, O> + 'static>(&mut self, hook: H) {
        self.hooks.register(hook, HookScope::Epoch);
    }

    /// Register a boxed hook in either list
    pub fn register(&mut self, hook: Box<dyn Hook<M, L, O>>, scope: HookScope) {
        self.hooks.register_boxed(hook, scope);
    }

    /// Registered hooks
    pub fn hooks(&self) -> &HookRunner<M, L, O> {
        &self.hooks
    }

    /// Iteration settings
    pub fn config(&self) -> &IterConfig {
        &self.config
    }

    /// Borrow the model
    pub fn model(&self) -> Ref<'_, M> {
        self.model.borrow()
    }

    /// Mutable access to the model between runs
    pub fn model_mut(&mut self) -> &mut M {
        self.model.get_mut()
    }

    /// Consume the iterator and return the model
    pub fn into_model(self) -> M {
        self.model.into_inner()
    }

    /// Current step state
    pub fn state(&self) -> &StepState {
        &self.state
    }

    /// Number of training steps taken, including restored steps
    pub fn global_step(&self) -> u64 {
        self.state.global_step()
    }

    /// Seed the global step, typically from a checkpoint.
    ///
    /// Only allowed before iteration starts.
    pub fn set_global_step(&mut self, step: u64) -> Result<()> {
        if self.state.is_started() {
            return Err(Error::AlreadyStarted);
        }
        self.state.set_global_step(step);
        Ok(())
    }

    /// Reset the global step to zero
    pub fn reset_global_step(&mut self) -> Result<()> {
        self.set_global_step(0)
    }

    /// Split of the most recently evaluated thunk
    pub fn split(&self) -> Option<String> {
        self.state.split()
    }

    /// Batch index within the running loop
    pub fn batch_step(&self) -> usize {
        self.state.batch_step()
    }

    /// Current epoch index
    pub fn epoch_step(&self) -> usize {
        self.state.epoch_step()
    }

    /// Restore from a checkpoint written by [`CheckpointHook`](crate::hooks::CheckpointHook).
    ///
    /// Without a path, iteration starts from the current state.
    pub fn initialize(&mut self, checkpoint: Option<&Path>) -> Result<()> {
        let Some(path) = checkpoint else {
            return Ok(());
        };
        let restored = Checkpoint::load(path)?;
        self.set_global_step(restored.global_step)?;
        log::info!("Restored global step {} from {}", restored.global_step, path.display());
        Ok(())
    }

    /// Drive the model over `splits`.
    ///
    /// Any failure is first reported to every hook through `at_exception`
    /// and then returned unchanged. A termination signal takes the same path
    /// and then either exits the process with status 0 or, if the controller
    /// was told not to exit, ends iteration with
    /// [`IterateSummary::shutdown`] set.
    ///
    /// In test mode a missing validation split is served by the train stream
    /// for this call only; `splits` is left as it was passed in.
    pub fn iterate(&mut self, splits: &mut SplitRegistry<L>) -> Result<IterateSummary> {
        let mut summary = IterateSummary::default();
        let outcome = self
            .prepare(splits, &mut summary)
            .and_then(|()| self.run_epochs(&*splits, &mut summary));
        summary.global_step = self.state.global_step();
        if summary.validation_fallback {
            splits.unalias(VALIDATION);
        }

        let Err(err) = outcome else {
            return Ok(summary);
        };
        self.hooks.dispatch_exception(&self.state, &err);

        match err {
            Error::Shutdown(request) => {
                if self.shutdown.as_ref().is_some_and(ShutdownController::exits_process) {
                    log::info!("Hooks notified, exiting");
                    std::process::exit(0);
                }
                summary.shutdown = Some(request);
                Ok(summary)
            }
            err => Err(err),
        }
    }

    fn prepare(&self, splits: &mut SplitRegistry<L>, summary: &mut IterateSummary) -> Result<()> {
        if self.config.test_mode && !splits.contains(VALIDATION) {
            log::warn!("No validation split specified, defaulting to train split");
            splits.alias(VALIDATION, TRAIN)?;
            summary.validation_fallback = true;
        }
        splits.check_contract()?;
        self.state.start(self.config.test_mode);
        Ok(())
    }

    fn run_epochs(&self, splits: &SplitRegistry<L>, summary: &mut IterateSummary) -> Result<()> {
        let step_ops = (self.step_ops)(&self.model.borrow());
        let ctx = RunContext {
            model: &self.model,
            hooks: &self.hooks,
            state: &self.state,
            splits,
            step_ops: &step_ops,
        };
        let names = splits.names();

        for epoch in 0..self.config.effective_epochs() {
            if !self.config.test_mode && self.config.step_budget_reached(self.state.global_step()) {
                log::info!("Step budget of {:?} reached", self.config.num_steps);
                break;
            }
            self.check_shutdown()?;
            self.state.set_epoch_step(epoch);

            self.run_train_phase(&ctx, &names, epoch)?;
            for split in &names {
                self.run_split_phase(&ctx, split, epoch)?;
            }
            summary.epochs = epoch + 1;
        }
        self.check_shutdown()
    }

    fn run_train_phase(
        &self,
        ctx: &RunContext<'_, M, L, O>,
        names: &[String],
        epoch: usize,
    ) -> Result<()> {
        self.hooks.dispatch_before_epoch(HookScope::Step, &self.state, epoch)?;

        let ticks = if self.config.test_mode { 0 } else { ctx.splits.len_of(TRAIN)? };
        for index in 0..ticks {
            self.check_shutdown()?;
            self.state.set_batch_step(index);

            let results = StepResults::new(ctx, names, index, HookScope::Step);
            let dispatched =
                self.hooks.dispatch_after_step(HookScope::Step, &self.state, index, &results);
            results.settle(dispatched)?;
            drop(results);

            let global_step = self.state.increment_global_step();
            let new_epoch = ctx.splits.stream(TRAIN)?.is_new_epoch();
            if new_epoch || self.config.step_budget_reached(global_step) || index + 1 == ticks {
                log::info!("Done with epoch");
                ctx.splits.stream_mut(TRAIN)?.reset();
                break;
            }
        }

        self.hooks.dispatch_after_epoch(HookScope::Step, &self.state, epoch)?;
        self.check_shutdown()
    }

    fn run_split_phase(&self, ctx: &RunContext<'_, M, L, O>, split: &str, epoch: usize) -> Result<()> {
        self.hooks.dispatch_before_epoch(HookScope::Epoch, &self.state, epoch)?;

        let ticks = ctx.splits.len_of(split)?;
        let single = [split.to_string()];
        for index in 0..ticks {
            self.check_shutdown()?;
            self.state.set_batch_step(index);

            let results = StepResults::new(ctx, &single, index, HookScope::Epoch);
            let dispatched =
                self.hooks.dispatch_after_step(HookScope::Epoch, &self.state, index, &results);
            results.settle(dispatched)?;
            let active = results.is_active();
            drop(results);

            if !active || ctx.splits.stream(split)?.is_new_epoch() || index + 1 == ticks {
                log::info!("Done with {split}");
                ctx.splits.stream_mut(split)?.reset();
                break;
            }
        }

        self.hooks.dispatch_after_epoch(HookScope::Epoch, &self.state, epoch)?;
        self.check_shutdown()
    }

    fn check_shutdown(&self) -> Result<()> {
        match &self.shutdown {
            Some(controller) => controller.check(),
            None => Ok(()),
        }
    }
}

impl<M, L, O> std::fmt::Debug for ModelIterator<M, L, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelIterator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
