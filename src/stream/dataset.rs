//! Batching adapter over random-access datasets

use super::SplitStream;
use crate::error::{Error, Result};
use crate::nested::Nested;

/// A random-access, length-reporting collection of examples
pub trait Dataset<L> {
    /// Number of examples
    fn len(&self) -> usize;

    /// Load example `index`
    fn example(&self, index: usize) -> Result<Nested<L>>;

    /// Whether the dataset has no examples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: Clone> Dataset<L> for Vec<Nested<L>> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn example(&self, index: usize) -> Result<Nested<L>> {
        self.get(index).cloned().ok_or_else(|| {
            Error::stream_contract("dataset", format!("example {index} out of range"))
        })
    }
}

/// Streams a [`Dataset`] as batches of consecutive examples
///
/// Each batch is a sequence of examples. The final batch of an epoch may be
/// short; pulling it sets the new-epoch flag and wraps around.
#[derive(Debug, Clone)]
pub struct DatasetStream<D> {
    dataset: D,
    batch_size: usize,
    position: usize,
    epoch: usize,
    new_epoch: bool,
}

impl<D> DatasetStream<D> {
    /// Create a stream over `dataset` with `batch_size` examples per batch
    pub fn new(dataset: D, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("Invalid batch size: 0 (must be > 0)".to_string()));
        }
        Ok(Self { dataset, batch_size, position: 0, epoch: 0, new_epoch: false })
    }

    /// Examples per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Completed epochs since the last reset
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Underlying dataset
    pub fn dataset(&self) -> &D {
        &self.dataset
    }
}

impl<L, D: Dataset<L>> SplitStream<L> for DatasetStream<D> {
    fn next_batch(&mut self) -> Result<Nested<L>> {
        let total = self.dataset.len();
        if total == 0 {
            return Err(Error::stream_contract("dataset", "cannot pull from an empty dataset"));
        }

        let end = (self.position + self.batch_size).min(total);
        let examples =
            (self.position..end).map(|i| self.dataset.example(i)).collect::<Result<Vec<_>>>()?;

        if end == total {
            self.position = 0;
            self.epoch += 1;
            self.new_epoch = true;
        } else {
            self.position = end;
            self.new_epoch = false;
        }

        Ok(Nested::Seq(examples))
    }

    fn is_new_epoch(&self) -> bool {
        self.new_epoch
    }

    fn reset(&mut self) {
        self.position = 0;
        self.epoch = 0;
        self.new_epoch = false;
    }

    fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples(n: i32) -> Vec<Nested<i32>> {
        (0..n).map(|i| Nested::<i32>::map().with("x", i)).collect()
    }

    fn batch_xs(batch: &Nested<i32>) -> Vec<i32> {
        batch.leaves().into_iter().copied().collect()
    }

    #[test]
    fn test_len_rounds_up() {
        assert_eq!(DatasetStream::new(examples(10), 3).unwrap().len(), 4);
        assert_eq!(DatasetStream::new(examples(9), 3).unwrap().len(), 3);
        assert_eq!(DatasetStream::new(examples(0), 3).unwrap().len(), 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(DatasetStream::new(examples(4), 0), Err(Error::Config(_))));
    }

    #[test]
    fn test_epoch_flag_set_on_last_batch() {
        let mut stream = DatasetStream::new(examples(5), 2).unwrap();

        assert_eq!(batch_xs(&stream.next_batch().unwrap()), vec![0, 1]);
        assert!(!stream.is_new_epoch());
        assert_eq!(batch_xs(&stream.next_batch().unwrap()), vec![2, 3]);
        assert!(!stream.is_new_epoch());
        assert_eq!(batch_xs(&stream.next_batch().unwrap()), vec![4]);
        assert!(stream.is_new_epoch());
        assert_eq!(stream.epoch(), 1);

        // Wraps around into the next epoch
        assert_eq!(batch_xs(&stream.next_batch().unwrap()), vec![0, 1]);
        assert!(!stream.is_new_epoch());
    }

    #[test]
    fn test_reset_rewinds() {
        let mut stream = DatasetStream::new(examples(4), 2).unwrap();
        stream.next_batch().unwrap();
        stream.reset();
        assert_eq!(batch_xs(&stream.next_batch().unwrap()), vec![0, 1]);
        assert_eq!(stream.epoch(), 0);
    }

    #[test]
    fn test_pull_from_empty_dataset_fails() {
        let mut stream = DatasetStream::new(examples(0), 2).unwrap();
        assert!(matches!(stream.next_batch(), Err(Error::StreamContract { .. })));
    }
}
