//! Checkpoint hook for persisting step state

use crate::error::{Error, Result};
use crate::iterator::{Hook, StepState};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Why a checkpoint was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    /// Regular save at the end of an epoch
    EpochEnd,
    /// Final save after a termination signal
    Shutdown,
    /// Final save after a failure
    Failure,
}

/// Step state persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Global step when the checkpoint was written
    pub global_step: u64,
    /// Epoch index when the checkpoint was written
    pub epoch_step: usize,
    /// What triggered the write
    pub reason: CheckpointReason,
}

impl Checkpoint {
    /// Create checkpoint
    pub fn new(global_step: u64, epoch_step: usize, reason: CheckpointReason) -> Self {
        Self { global_step, epoch_step, reason }
    }

    /// Snapshot the current step state
    pub fn capture(state: &StepState, reason: CheckpointReason) -> Self {
        Self::new(state.global_step(), state.epoch_step(), reason)
    }

    /// Write as JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let fail = |message: String| Error::Checkpoint { path: path.display().to_string(), message };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| fail(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| fail(e.to_string()))
    }

    /// Read a checkpoint written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fail = |message: String| Error::Checkpoint { path: path.display().to_string(), message };

        let json = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| fail(e.to_string()))
    }
}

/// Writes a [`Checkpoint`] at the end of every epoch and when iteration
/// stops early.
///
/// Every write goes to the same file, so the latest state always wins and
/// can be handed to [`ModelIterator::initialize`](crate::iterator::ModelIterator::initialize).
/// Register it as a step hook to save once per epoch.
#[derive(Debug)]
pub struct CheckpointHook {
    /// Directory to save checkpoints
    checkpoint_dir: PathBuf,
    /// Save every N epochs
    save_every: usize,
    /// Number of checkpoints written
    saves: Cell<usize>,
}

impl CheckpointHook {
    /// Create checkpoint hook saving to directory
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into(), save_every: 1, saves: Cell::new(0) }
    }

    /// Configure to save every N epochs
    pub fn save_every(mut self, epochs: usize) -> Self {
        self.save_every = epochs.max(1);
        self
    }

    /// Path of the checkpoint file
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_dir.join("checkpoint.json")
    }

    /// Number of checkpoints written so far
    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    fn save(&self, state: &StepState, reason: CheckpointReason) -> Result<()> {
        let path = self.checkpoint_path();
        Checkpoint::capture(state, reason).save(&path)?;
        self.saves.set(self.saves.get() + 1);
        log::info!("Saved checkpoint at global step {} to {}", state.global_step(), path.display());
        Ok(())
    }
}

impl<M, L, O> Hook<M, L, O> for CheckpointHook {
    fn after_epoch(&self, state: &StepState, epoch: usize) -> Result<()> {
        if (epoch + 1) % self.save_every == 0 {
            self.save(state, CheckpointReason::EpochEnd)?;
        }
        Ok(())
    }

    fn at_exception(&self, state: &StepState, error: &Error) {
        let reason =
            if error.is_shutdown() { CheckpointReason::Shutdown } else { CheckpointReason::Failure };
        if let Err(e) = self.save(state, reason) {
            log::error!("Final checkpoint failed: {e}");
        }
    }

    fn name(&self) -> &'static str {
        "CheckpointHook"
    }
}
