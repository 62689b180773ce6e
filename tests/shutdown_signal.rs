//! SIGTERM delivered mid-run: hooks persist a final checkpoint
//!
//! Kept in its own test binary so the raised signal cannot reach another
//! test's iterator.

#![cfg(unix)]

use hookloop::hooks::{Checkpoint, CheckpointHook, CheckpointReason, TrainHook};
use hookloop::stream::{DatasetStream, SplitRegistry};
use hookloop::{
    FetchOp, Fetches, Hook, IterConfig, ModelIterator, Nested, Result, ShutdownController,
    StepResults, StepState,
};

fn step_ops(_: &()) -> Fetches<(), i32, i32> {
    Nested::map().with("noop", FetchOp::new(|_: &mut (), _: &Nested<i32>| Ok(0)))
}

/// Raises SIGTERM at a given global step
struct RaiseAt(u64);

impl Hook<(), i32, i32> for RaiseAt {
    fn after_step(
        &self,
        state: &StepState,
        _index: usize,
        _results: &StepResults<'_, (), i32, i32>,
    ) -> Result<()> {
        if state.global_step() == self.0 {
            signal_hook::low_level::raise(signal_hook::consts::SIGTERM)
                .expect("raising SIGTERM should succeed");
        }
        Ok(())
    }
}

#[test]
fn test_sigterm_writes_final_checkpoint() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let controller = ShutdownController::install()
        .expect("signal handlers should install")
        .exit_on_shutdown(false);
    let config = IterConfig::new().with_num_epochs(3).with_hook_freq(1);
    let mut it = ModelIterator::new(config, (), step_ops)
        .expect("config should be valid")
        .with_shutdown(controller);
    it.add_hook(TrainHook::new());
    it.add_hook(RaiseAt(4));
    it.add_hook(CheckpointHook::new(temp_dir.path()));
    let data: Vec<Nested<i32>> = (0..3).map(Nested::Leaf).collect();
    let mut splits = SplitRegistry::new(DatasetStream::new(data, 1).expect("batch size"));

    let summary = it.iterate(&mut splits).expect("shutdown is not a failure");

    let request = summary.shutdown.expect("signal should stop iteration");
    assert_eq!(request.signal(), signal_hook::consts::SIGTERM);
    // The tick that raised still completes; the next boundary stops
    assert_eq!(summary.global_step, 5);
    assert_eq!(summary.epochs, 1);

    let checkpoint = Checkpoint::load(temp_dir.path().join("checkpoint.json"))
        .expect("final checkpoint should exist");
    assert_eq!(checkpoint.reason, CheckpointReason::Shutdown);
    assert_eq!(checkpoint.global_step, 5);
    assert_eq!(checkpoint.epoch_step, 1);
}
