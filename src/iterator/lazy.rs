//! Lazy per-split thunks
//!
//! Each tick the driver offers hooks one [`LazySplit`] per split instead of
//! evaluated results. Evaluating a split (pull a batch, copy it into feeds,
//! run `before_step`, evaluate the fetches) happens only when a hook calls
//! [`LazySplit::materialize`]. A thunk materializes at most once; later
//! calls return the cached outcome.

use super::fetch::{run, Fetches};
use super::hooks::{HookRunner, HookScope};
use super::state::StepState;
use crate::error::{Error, Result};
use crate::nested::Nested;
use crate::stream::SplitRegistry;
use std::cell::{OnceCell, RefCell};

/// Everything a thunk needs to evaluate its split, borrowed from the driver
pub(crate) struct RunContext<'a, M, L, O> {
    pub(crate) model: &'a RefCell<M>,
    pub(crate) hooks: &'a HookRunner<M, L, O>,
    pub(crate) state: &'a StepState,
    pub(crate) splits: &'a SplitRegistry<L>,
    pub(crate) step_ops: &'a Fetches<M, L, O>,
}

impl<M, L: Clone, O> RunContext<'_, M, L, O> {
    fn evaluate(&self, split: &str, index: usize, scope: HookScope) -> Result<Nested<O>> {
        self.state.set_split(split);
        let batch = self.splits.stream_mut(split)?.next_batch()?;
        let feeds = batch.walk(Clone::clone);
        let mut fetches: Fetches<M, L, O> = Nested::map().with("step_ops", self.step_ops.clone());

        self.hooks.dispatch_before_step(scope, self.state, index, &mut fetches, &feeds, &batch)?;

        let mut model = self.model.borrow_mut();
        run(&mut *model, &fetches, &feeds)
    }
}

/// A deferred evaluation of one split for one tick
pub struct LazySplit<'a, M, L, O> {
    split: String,
    index: usize,
    scope: HookScope,
    ctx: &'a RunContext<'a, M, L, O>,
    outcome: OnceCell<Result<Nested<O>>>,
}

impl<'a, M, L: Clone, O> LazySplit<'a, M, L, O> {
    pub(crate) fn new(
        ctx: &'a RunContext<'a, M, L, O>,
        split: &str,
        index: usize,
        scope: HookScope,
    ) -> Self {
        Self { split: split.to_string(), index, scope, ctx, outcome: OnceCell::new() }
    }

    /// Name of the split this thunk evaluates
    pub fn split(&self) -> &str {
        &self.split
    }

    /// Whether a hook has invoked this thunk
    pub fn is_materialized(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Evaluate the split, or return the cached outcome.
    ///
    /// The results have the shape `{"step_ops": <results of step_ops>, ...}`
    /// plus any fetches hooks added in `before_step`.
    pub fn materialize(&self) -> Result<&Nested<O>> {
        self.outcome
            .get_or_init(|| self.ctx.evaluate(&self.split, self.index, self.scope))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Results if some hook already materialized this thunk
    pub fn peek(&self) -> Option<&Nested<O>> {
        self.outcome.get().and_then(|outcome| outcome.as_ref().ok())
    }

    pub(crate) fn failure(&self) -> Option<&Error> {
        self.outcome.get().and_then(|outcome| outcome.as_ref().err())
    }
}

/// Per-tick results handed to `after_step`
pub struct StepResults<'a, M, L, O> {
    global_step: u64,
    splits: Vec<LazySplit<'a, M, L, O>>,
}

impl<'a, M, L: Clone, O> StepResults<'a, M, L, O> {
    pub(crate) fn new(
        ctx: &'a RunContext<'a, M, L, O>,
        splits: &[String],
        index: usize,
        scope: HookScope,
    ) -> Self {
        Self {
            global_step: ctx.state.global_step(),
            splits: splits.iter().map(|split| LazySplit::new(ctx, split, index, scope)).collect(),
        }
    }

    /// Global step when the tick started
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// The thunk for a split, if offered this tick
    pub fn split(&self, name: &str) -> Option<&LazySplit<'a, M, L, O>> {
        self.splits.iter().find(|thunk| thunk.split == name)
    }

    /// Whether a split is offered this tick
    pub fn contains(&self, name: &str) -> bool {
        self.split(name).is_some()
    }

    /// All offered thunks, in split registration order
    pub fn splits(&self) -> impl Iterator<Item = &LazySplit<'a, M, L, O>> {
        self.splits.iter()
    }

    /// Materialize a split by name
    pub fn get(&self, name: &str) -> Result<&Nested<O>> {
        self.split(name).ok_or_else(|| Error::MissingSplit(name.to_string()))?.materialize()
    }

    /// Whether any hook invoked a thunk this tick
    pub(crate) fn is_active(&self) -> bool {
        self.splits.iter().any(LazySplit::is_materialized)
    }

    /// Combine the dispatch outcome with thunk failures.
    ///
    /// A failed thunk's own error wins over whatever the dispatch returned,
    /// so a hook that wraps or swallows it cannot hide the original.
    pub(crate) fn settle(&self, dispatched: Result<()>) -> Result<()> {
        match self.splits.iter().find_map(LazySplit::failure) {
            Some(err) => Err(err.clone()),
            None => dispatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::fetch::FetchOp;
    use crate::iterator::hooks::Hook;
    use crate::stream::{DatasetStream, TRAIN, VALIDATION};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Model {
        evaluations: usize,
    }

    fn registry() -> SplitRegistry<i32> {
        let train: Vec<Nested<i32>> = (0..4).map(Nested::Leaf).collect();
        let val: Vec<Nested<i32>> = (100..102).map(Nested::Leaf).collect();
        SplitRegistry::new(DatasetStream::new(train, 1).unwrap())
            .with_split(VALIDATION, DatasetStream::new(val, 1).unwrap())
    }

    fn step_ops() -> Fetches<Model, i32, i32> {
        Nested::map().with(
            "sum",
            FetchOp::new(|model: &mut Model, feeds: &Nested<i32>| {
                model.evaluations += 1;
                let sum: i32 = feeds.leaves().into_iter().sum();
                Ok(sum)
            }),
        )
    }

    struct CountBefore(Rc<Cell<usize>>);

    impl Hook<Model, i32, i32> for CountBefore {
        fn before_step(
            &self,
            _: &StepState,
            _: usize,
            fetches: &mut Fetches<Model, i32, i32>,
            _: &Nested<i32>,
            _: &Nested<i32>,
        ) -> Result<()> {
            self.0.set(self.0.get() + 1);
            fetches.insert("constant", FetchOp::new(|_: &mut Model, _: &Nested<i32>| Ok(7)));
            Ok(())
        }
    }

    #[test]
    fn test_materialize_once_per_thunk() {
        let model = RefCell::new(Model { evaluations: 0 });
        let before = Rc::new(Cell::new(0));
        let mut hooks = HookRunner::new(1);
        hooks.register(CountBefore(Rc::clone(&before)), HookScope::Step);
        let state = StepState::new();
        let splits = registry();
        let ops = step_ops();
        let ctx = RunContext {
            model: &model,
            hooks: &hooks,
            state: &state,
            splits: &splits,
            step_ops: &ops,
        };

        let results = StepResults::new(&ctx, &splits.names(), 0, HookScope::Step);
        assert!(!results.is_active());
        assert!(results.split(TRAIN).and_then(LazySplit::peek).is_none());

        let first = results.get(TRAIN).unwrap().clone();
        let second = results.get(TRAIN).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(first.path(&["step_ops", "sum"]).and_then(Nested::as_leaf), Some(&0));
        assert_eq!(first.get("constant").and_then(Nested::as_leaf), Some(&7));
        assert_eq!(model.borrow().evaluations, 1);
        assert_eq!(before.get(), 1);
        assert!(results.is_active());
        assert_eq!(state.split().as_deref(), Some(TRAIN));

        // The validation thunk stays lazy until asked for
        assert!(!results.split(VALIDATION).unwrap().is_materialized());
        assert_eq!(
            results.get(VALIDATION).unwrap().path(&["step_ops", "sum"]).and_then(Nested::as_leaf),
            Some(&100)
        );
        assert_eq!(state.split().as_deref(), Some(VALIDATION));
    }

    #[test]
    fn test_missing_split() {
        let model = RefCell::new(Model { evaluations: 0 });
        let hooks = HookRunner::new(1);
        let state = StepState::new();
        let splits = registry();
        let ops = step_ops();
        let ctx = RunContext {
            model: &model,
            hooks: &hooks,
            state: &state,
            splits: &splits,
            step_ops: &ops,
        };

        let results = StepResults::new(&ctx, &[TRAIN.to_string()], 0, HookScope::Epoch);

        assert!(!results.contains(VALIDATION));
        assert_eq!(results.get(VALIDATION).unwrap_err(), Error::MissingSplit(VALIDATION.to_string()));
    }

    #[test]
    fn test_settle_prefers_thunk_failure() {
        let model = RefCell::new(Model { evaluations: 0 });
        let hooks = HookRunner::new(1);
        let state = StepState::new();
        let splits = registry();
        let ops: Fetches<Model, i32, i32> = Nested::map().with(
            "loss",
            FetchOp::new(|_: &mut Model, _: &Nested<i32>| -> Result<i32> {
                Err(Error::fetch("loss", "diverged"))
            }),
        );
        let ctx = RunContext {
            model: &model,
            hooks: &hooks,
            state: &state,
            splits: &splits,
            step_ops: &ops,
        };
        let results = StepResults::new(&ctx, &splits.names(), 0, HookScope::Step);

        // A hook that swallows the failure does not hide it
        assert!(results.get(TRAIN).is_err());
        assert_eq!(results.settle(Ok(())), Err(Error::fetch("loss", "diverged")));
        assert_eq!(
            results.settle(Err(Error::hook("wrapper", "failed"))),
            Err(Error::fetch("loss", "diverged"))
        );
        // Cached failure: the op is not re-run
        assert_eq!(results.get(TRAIN).unwrap_err(), Error::fetch("loss", "diverged"));
    }
}
