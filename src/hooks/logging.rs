//! Logging hook for evaluated results

use crate::error::Result;
use crate::iterator::{Hook, StepResults, StepState};
use crate::nested::Nested;
use std::fmt::Debug;

/// Logs the results of every split some other hook evaluated.
///
/// Register it after the hooks that pull splits; it never evaluates a split
/// itself, so it does not change what the iterator computes.
#[derive(Clone, Debug)]
pub struct LoggingHook {
    /// Log every N global steps
    every: u64,
    /// Result paths to log; empty logs everything
    keys: Vec<String>,
}

impl LoggingHook {
    /// Log every `every` global steps
    pub fn new(every: u64) -> Self {
        Self { every: every.max(1), keys: Vec::new() }
    }

    /// Only log results at these paths (e.g. `"step_ops/loss"`)
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    fn render<O: Debug>(
        &self,
        split: &str,
        global_step: u64,
        results: &Nested<O>,
    ) -> Option<String> {
        let fields: Vec<String> = results
            .flatten()
            .into_iter()
            .filter(|(path, _)| self.keys.is_empty() || self.keys.iter().any(|k| k == path))
            .map(|(path, value)| format!("{path}={value:?}"))
            .collect();
        if fields.is_empty() {
            return None;
        }
        Some(format!("[{split}] step {global_step}: {}", fields.join(", ")))
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new(100)
    }
}

impl<M, L: Clone, O: Debug> Hook<M, L, O> for LoggingHook {
    fn after_epoch(&self, state: &StepState, epoch: usize) -> Result<()> {
        log::info!("Epoch {epoch} done at global step {}", state.global_step());
        Ok(())
    }

    fn after_step(
        &self,
        state: &StepState,
        _index: usize,
        results: &StepResults<'_, M, L, O>,
    ) -> Result<()> {
        if results.global_step() % self.every != 0 {
            return Ok(());
        }
        for split in results.splits() {
            let Some(evaluated) = split.peek() else {
                continue;
            };
            if let Some(line) = self.render(split.split(), state.global_step(), evaluated) {
                log::info!("{line}");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingHook"
    }
}
