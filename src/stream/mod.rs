//! Split streams
//!
//! A split stream produces batches for one named data split (train,
//! validation, ...). The iterator only talks to data through the
//! [`SplitStream`] contract; dataset acquisition and decoding live outside
//! this crate.

mod dataset;
mod registry;

pub use dataset::{Dataset, DatasetStream};
pub use registry::{SplitRegistry, TRAIN, VALIDATION};

use crate::error::Result;
use crate::nested::Nested;

/// A resettable batch source for one data split
pub trait SplitStream<L> {
    /// Pull the next batch
    fn next_batch(&mut self) -> Result<Nested<L>>;

    /// Whether the last pull completed an epoch
    fn is_new_epoch(&self) -> bool;

    /// Rewind to the start of an epoch
    fn reset(&mut self);

    /// Batches per epoch
    fn len(&self) -> usize;

    /// Whether the stream yields no batches
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L, S: SplitStream<L> + ?Sized> SplitStream<L> for Box<S> {
    fn next_batch(&mut self) -> Result<Nested<L>> {
        (**self).next_batch()
    }

    fn is_new_epoch(&self) -> bool {
        (**self).is_new_epoch()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
