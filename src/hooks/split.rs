//! Hooks that decide which splits get evaluated

use crate::config::IterConfig;
use crate::error::Result;
use crate::iterator::{Hook, StepResults, StepState};
use crate::stream::{TRAIN, VALIDATION};

/// Evaluates the train split on every sampled tick of the fast loop
#[derive(Clone, Debug, Default)]
pub struct TrainHook;

impl TrainHook {
    /// Create train hook
    pub fn new() -> Self {
        Self
    }
}

impl<M, L: Clone, O> Hook<M, L, O> for TrainHook {
    fn after_step(
        &self,
        _state: &StepState,
        _index: usize,
        results: &StepResults<'_, M, L, O>,
    ) -> Result<()> {
        if let Some(train) = results.split(TRAIN) {
            train.materialize()?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TrainHook"
    }
}

/// Evaluates the validation split every `every` global steps
#[derive(Clone, Debug)]
pub struct ValidationHook {
    every: Option<u64>,
}

impl ValidationHook {
    /// Validate every `every` global steps
    pub fn new(every: u64) -> Self {
        Self { every: Some(every.max(1)) }
    }

    /// Use the config's validation cadence (`val_freq`, then `log_freq`).
    ///
    /// Without either setting the hook never validates.
    pub fn from_config(config: &IterConfig) -> Self {
        Self { every: config.validation_frequency().map(|n| n.max(1)) }
    }

    /// Validation cadence in global steps
    pub fn every(&self) -> Option<u64> {
        self.every
    }

    fn is_due(&self, global_step: u64) -> bool {
        self.every.is_some_and(|n| global_step % n == 0)
    }
}

impl<M, L: Clone, O> Hook<M, L, O> for ValidationHook {
    fn after_step(
        &self,
        state: &StepState,
        _index: usize,
        results: &StepResults<'_, M, L, O>,
    ) -> Result<()> {
        if !self.is_due(state.global_step()) {
            return Ok(());
        }
        if let Some(validation) = results.split(VALIDATION) {
            validation.materialize()?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ValidationHook"
    }
}

/// Runs every offered split during the per-split pass.
///
/// Register as an epoch hook. Evaluation of a split stops at its epoch
/// boundary, or after `max_batches` ticks when a limit is set.
#[derive(Clone, Debug, Default)]
pub struct EvaluationHook {
    max_batches: Option<usize>,
}

impl EvaluationHook {
    /// Evaluate each split for a full epoch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop each split after `max_batches` ticks
    pub fn max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }
}

impl<M, L: Clone, O> Hook<M, L, O> for EvaluationHook {
    fn after_step(
        &self,
        _state: &StepState,
        index: usize,
        results: &StepResults<'_, M, L, O>,
    ) -> Result<()> {
        if self.max_batches.is_some_and(|max| index >= max) {
            return Ok(());
        }
        for split in results.splits() {
            split.materialize()?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EvaluationHook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::{FetchOp, Fetches, ModelIterator};
    use crate::nested::Nested;
    use crate::stream::{DatasetStream, SplitRegistry};

    /// Records the sum of every batch it is fed
    #[derive(Default)]
    struct Recorder {
        seen: Vec<i32>,
    }

    fn step_ops(_: &Recorder) -> Fetches<Recorder, i32, i32> {
        Nested::map().with(
            "x",
            FetchOp::new(|model: &mut Recorder, feeds: &Nested<i32>| {
                let x: i32 = feeds.leaves().into_iter().sum();
                model.seen.push(x);
                Ok(x)
            }),
        )
    }

    fn splits(train: i32, validation: i32) -> SplitRegistry<i32> {
        let stream = |start: i32, n: i32| {
            DatasetStream::new((start..start + n).map(Nested::Leaf).collect::<Vec<_>>(), 1).unwrap()
        };
        SplitRegistry::new(stream(0, train)).with_split(VALIDATION, stream(100, validation))
    }

    fn iterator(config: IterConfig) -> ModelIterator<Recorder, i32, i32> {
        ModelIterator::new(config, Recorder::default(), step_ops).unwrap()
    }

    #[test]
    fn test_train_hook_pulls_every_tick() {
        let mut it = iterator(IterConfig::new().with_num_epochs(1).with_hook_freq(1));
        it.add_hook(TrainHook::new());

        it.iterate(&mut splits(3, 2)).unwrap();

        assert_eq!(it.model().seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_validation_hook_cadence() {
        let config = IterConfig::new().with_num_epochs(1).with_hook_freq(1).with_log_freq(2);
        let mut it = iterator(config.clone());
        it.add_hook(TrainHook::new());
        it.add_hook(ValidationHook::from_config(&config));

        it.iterate(&mut splits(4, 5)).unwrap();

        // Validation runs at global steps 0 and 2
        assert_eq!(it.model().seen, vec![0, 100, 1, 2, 101, 3]);
    }

    #[test]
    fn test_validation_hook_without_cadence_is_idle() {
        let hook = ValidationHook::from_config(&IterConfig::new());
        assert_eq!(hook.every(), None);
        assert!(!hook.is_due(0));
        assert_eq!(ValidationHook::new(0).every(), Some(1));
    }

    #[test]
    fn test_evaluation_hook_limits_batches() {
        let mut it = iterator(IterConfig::new().with_num_epochs(1).with_hook_freq(1));
        it.add_epoch_hook(EvaluationHook::new().max_batches(2));

        it.iterate(&mut splits(3, 4)).unwrap();

        assert_eq!(it.model().seen, vec![0, 1, 100, 101]);
    }
}
