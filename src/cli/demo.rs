//! Built-in demo model for the `run` command
//!
//! A one-dimensional linear regression fitted by plain gradient descent on
//! synthetic points from `y = 3x + 1`. Small enough to run anywhere, and it
//! exercises every part of the iterator: lazy train and validation splits,
//! fetch edits in `before_step`, epoch evaluation and checkpointing.

use crate::config::IterConfig;
use crate::error::{Error, Result};
use crate::hooks::{CheckpointHook, EvaluationHook, LoggingHook, TrainHook, ValidationHook};
use crate::iterator::{FetchOp, Fetches, Hook, ModelIterator, StepResults, StepState};
use crate::nested::Nested;
use crate::stream::{DatasetStream, SplitRegistry, TRAIN, VALIDATION};
use std::cell::RefCell;
use std::path::Path;

const TRUE_WEIGHT: f64 = 3.0;
const TRUE_BIAS: f64 = 1.0;

/// Demo iterator type
pub type DemoIterator = ModelIterator<LinearModel, f64, f64>;

/// `y = weight * x + bias`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub weight: f64,
    pub bias: f64,
    pub lr: f64,
    /// Gradient steps applied so far
    pub updates: usize,
}

impl Default for LinearModel {
    fn default() -> Self {
        Self { weight: 0.0, bias: 0.0, lr: 0.1, updates: 0 }
    }
}

impl LinearModel {
    fn mse(&self, points: &[(f64, f64)]) -> f64 {
        let sum: f64 =
            points.iter().map(|(x, y)| (self.weight * x + self.bias - y).powi(2)).sum();
        sum / points.len().max(1) as f64
    }

    /// Apply one gradient step, returning the gradient norm
    fn step(&mut self, points: &[(f64, f64)]) -> f64 {
        let n = points.len().max(1) as f64;
        let (mut dw, mut db) = (0.0, 0.0);
        for (x, y) in points {
            let err = self.weight * x + self.bias - y;
            dw += 2.0 * err * x / n;
            db += 2.0 * err / n;
        }
        self.weight -= self.lr * dw;
        self.bias -= self.lr * db;
        self.updates += 1;
        (dw * dw + db * db).sqrt()
    }
}

/// Read `(x, y)` pairs out of a batch of `{x, y}` examples
fn points(op: &str, batch: &Nested<f64>) -> Result<Vec<(f64, f64)>> {
    let Nested::Seq(examples) = batch else {
        return Err(Error::fetch(op, "batch is not a sequence of examples"));
    };
    examples
        .iter()
        .map(|example| {
            let x = example.get("x").and_then(Nested::as_leaf);
            let y = example.get("y").and_then(Nested::as_leaf);
            x.zip(y)
                .map(|(x, y)| (*x, *y))
                .ok_or_else(|| Error::fetch(op, "example needs numeric 'x' and 'y'"))
        })
        .collect()
}

/// Fetch ops run on every tick: the loss, then a gradient step
pub fn step_ops(_model: &LinearModel) -> Fetches<LinearModel, f64, f64> {
    Nested::map()
        .with(
            "loss",
            FetchOp::new(|model: &mut LinearModel, feeds: &Nested<f64>| {
                Ok(model.mse(&points("loss", feeds)?))
            }),
        )
        .with(
            "train_op",
            FetchOp::new(|model: &mut LinearModel, feeds: &Nested<f64>| {
                Ok(model.step(&points("train_op", feeds)?))
            }),
        )
}

/// `n` synthetic examples; `offset` decorrelates splits
fn examples(n: usize, offset: usize) -> Vec<Nested<f64>> {
    (0..n)
        .map(|i| {
            let x = ((i * 7919 + offset) % 1000) as f64 / 500.0 - 1.0;
            Nested::<f64>::map().with("x", x).with("y", TRUE_WEIGHT * x + TRUE_BIAS)
        })
        .collect()
}

/// In-memory train split, plus a validation split when `val_batches` is set
pub fn splits(
    train_batches: usize,
    val_batches: Option<usize>,
    batch_size: usize,
) -> Result<SplitRegistry<f64>> {
    let train = DatasetStream::new(examples(train_batches * batch_size, 0), batch_size)?;
    let mut registry = SplitRegistry::new(train);
    if let Some(batches) = val_batches {
        let validation = DatasetStream::new(examples(batches * batch_size, 500), batch_size)?;
        registry.insert(VALIDATION, Box::new(validation));
    }
    Ok(registry)
}

/// Removes `train_op` from the fetches so evaluation never updates the model.
///
/// As a step hook, pass `train_allowed = true` to keep updates for the train
/// split. As an epoch hook, pass `false`.
#[derive(Debug, Clone)]
pub struct FreezeHook {
    train_allowed: bool,
}

impl FreezeHook {
    pub fn new(train_allowed: bool) -> Self {
        Self { train_allowed }
    }
}

impl Hook<LinearModel, f64, f64> for FreezeHook {
    fn before_step(
        &self,
        state: &StepState,
        _index: usize,
        fetches: &mut Fetches<LinearModel, f64, f64>,
        _feeds: &Nested<f64>,
        _batch: &Nested<f64>,
    ) -> Result<()> {
        let training = self.train_allowed && state.split().as_deref() == Some(TRAIN);
        if !training {
            if let Some(ops) = fetches.get_mut("step_ops") {
                ops.remove("train_op");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FreezeHook"
    }
}

/// Averages the loss per split over an evaluation pass
#[derive(Debug, Default)]
pub struct MeanLossHook {
    current: RefCell<Option<(String, f64, usize)>>,
    history: RefCell<Vec<(String, f64)>>,
}

impl MeanLossHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean loss of every finished pass, oldest first
    pub fn history(&self) -> Vec<(String, f64)> {
        self.history.borrow().clone()
    }
}

impl Hook<LinearModel, f64, f64> for MeanLossHook {
    fn after_step(
        &self,
        _state: &StepState,
        _index: usize,
        results: &StepResults<'_, LinearModel, f64, f64>,
    ) -> Result<()> {
        for split in results.splits() {
            let loss = split.peek().and_then(|r| r.path(&["step_ops", "loss"]));
            if let Some(loss) = loss.and_then(Nested::as_leaf) {
                let mut current = self.current.borrow_mut();
                let entry = current.get_or_insert_with(|| (split.split().to_string(), 0.0, 0));
                entry.1 += loss;
                entry.2 += 1;
            }
        }
        Ok(())
    }

    fn after_epoch(&self, _state: &StepState, epoch: usize) -> Result<()> {
        if let Some((split, total, count)) = self.current.borrow_mut().take() {
            let mean = total / count as f64;
            log::info!("Epoch {epoch} {split} mean loss: {mean:.6}");
            self.history.borrow_mut().push((split, mean));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MeanLossHook"
    }
}

/// Wire the demo model with the stock hooks
pub fn iterator(config: IterConfig, checkpoint_dir: Option<&Path>) -> Result<DemoIterator> {
    let log_every = config.log_freq.unwrap_or(config.hook_freq);
    let validation = ValidationHook::from_config(&config);
    let mut iterator = ModelIterator::new(config, LinearModel::default(), step_ops)?;

    iterator.add_hook(FreezeHook::new(true));
    iterator.add_hook(TrainHook::new());
    iterator.add_hook(validation);
    iterator.add_hook(LoggingHook::new(log_every).keys(["step_ops/loss"]));
    if let Some(dir) = checkpoint_dir {
        iterator.add_hook(CheckpointHook::new(dir));
    }

    iterator.add_epoch_hook(FreezeHook::new(false));
    iterator.add_epoch_hook(EvaluationHook::new());
    iterator.add_epoch_hook(MeanLossHook::new());
    Ok(iterator)
}
