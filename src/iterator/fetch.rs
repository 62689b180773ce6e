//! Fetch ops and the fetch graph evaluator

use crate::error::Result;
use crate::nested::Nested;
use std::fmt;
use std::rc::Rc;

type FetchFn<M, L, O> = dyn Fn(&mut M, &Nested<L>) -> Result<O>;

/// A callable evaluated against the model and the feed payload
pub struct FetchOp<M, L, O> {
    op: Rc<FetchFn<M, L, O>>,
}

impl<M, L, O> FetchOp<M, L, O> {
    /// Wrap a closure as a fetch op
    pub fn new<F>(op: F) -> Self
    where
        F: Fn(&mut M, &Nested<L>) -> Result<O> + 'static,
    {
        Self { op: Rc::new(op) }
    }

    /// Invoke the op
    pub fn call(&self, model: &mut M, feeds: &Nested<L>) -> Result<O> {
        (self.op)(model, feeds)
    }
}

impl<M, L, O> Clone for FetchOp<M, L, O> {
    fn clone(&self) -> Self {
        Self { op: Rc::clone(&self.op) }
    }
}

impl<M, L, O> fmt::Debug for FetchOp<M, L, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FetchOp")
    }
}

/// A nested structure of fetch ops
pub type Fetches<M, L, O> = Nested<FetchOp<M, L, O>>;

/// Evaluate every op in `fetches` against the model and feeds.
///
/// Ops run depth-first in declaration order, each exactly once. The first
/// failing op aborts evaluation and its error is returned unchanged.
pub fn run<M, L, O>(
    model: &mut M,
    fetches: &Fetches<M, L, O>,
    feeds: &Nested<L>,
) -> Result<Nested<O>> {
    fetches.try_walk(|_, op| op.call(model, feeds))
}
