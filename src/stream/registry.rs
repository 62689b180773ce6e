//! Named split registry

use super::SplitStream;
use crate::error::{Error, Result};
use std::cell::{Ref, RefCell, RefMut};

/// Name of the mandatory training split
pub const TRAIN: &str = "train";

/// Name of the optional validation split
pub const VALIDATION: &str = "validation";

type BoxedStream<L> = Box<dyn SplitStream<L>>;

/// Ordered mapping from split names to streams
///
/// The train split is always present and always first. A name may alias
/// another split's stream, in which case both names pull from the same
/// underlying stream.
pub struct SplitRegistry<L> {
    streams: Vec<RefCell<BoxedStream<L>>>,
    names: Vec<(String, usize)>,
}

impl<L> SplitRegistry<L> {
    /// Create a registry holding only the train split
    pub fn new(train: impl SplitStream<L> + 'static) -> Self {
        Self {
            streams: vec![RefCell::new(Box::new(train))],
            names: vec![(TRAIN.to_string(), 0)],
        }
    }

    /// Create a registry from a train stream and an optional validation stream
    pub fn with_validation(
        train: impl SplitStream<L> + 'static,
        validation: Option<BoxedStream<L>>,
    ) -> Self {
        let mut registry = Self::new(train);
        if let Some(stream) = validation {
            registry.insert(VALIDATION, stream);
        }
        registry
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_split(mut self, name: impl Into<String>, stream: impl SplitStream<L> + 'static) -> Self {
        self.insert(name, Box::new(stream));
        self
    }

    /// Register a stream under `name`, replacing any previous stream of that name.
    ///
    /// Replacing `train` swaps the train stream in place.
    pub fn insert(&mut self, name: impl Into<String>, stream: BoxedStream<L>) {
        let name = name.into();
        self.streams.push(RefCell::new(stream));
        let slot = self.streams.len() - 1;
        match self.names.iter_mut().find(|(n, _)| *n == name) {
            Some((_, index)) => *index = slot,
            None => self.names.push((name, slot)),
        }
    }

    /// Make `name` pull from the same stream as `target`
    pub fn alias(&mut self, name: impl Into<String>, target: &str) -> Result<()> {
        let slot = self.slot(target)?;
        let name = name.into();
        match self.names.iter_mut().find(|(n, _)| *n == name) {
            Some((_, index)) => *index = slot,
            None => self.names.push((name, slot)),
        }
        Ok(())
    }

    /// Remove a name added by [`alias`](Self::alias).
    ///
    /// Only names sharing their stream with another name are removed, so the
    /// train split and splits with their own stream stay registered.
    pub fn unalias(&mut self, name: &str) -> bool {
        let Some(position) = self.names.iter().position(|(n, _)| n == name) else {
            return false;
        };
        let slot = self.names[position].1;
        let shared = self.names.iter().any(|(n, s)| n != name && *s == slot);
        if name == TRAIN || !shared {
            return false;
        }
        self.names.remove(position);
        true
    }

    /// Whether a split is registered
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|(n, _)| n == name)
    }

    /// Registered split names, train first
    pub fn names(&self) -> Vec<String> {
        self.names.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Number of registered splits
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the train split is mandatory
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Batches per epoch of a split
    pub fn len_of(&self, name: &str) -> Result<usize> {
        Ok(self.stream(name)?.len())
    }

    /// Borrow a split's stream
    pub fn stream(&self, name: &str) -> Result<Ref<'_, BoxedStream<L>>> {
        let slot = self.slot(name)?;
        Ok(self.streams[slot].borrow())
    }

    /// Mutably borrow a split's stream
    pub fn stream_mut(&self, name: &str) -> Result<RefMut<'_, BoxedStream<L>>> {
        let slot = self.slot(name)?;
        Ok(self.streams[slot].borrow_mut())
    }

    /// Check every registered split against the stream contract
    pub fn check_contract(&self) -> Result<()> {
        for (name, slot) in &self.names {
            if self.streams[*slot].borrow().is_empty() {
                return Err(Error::stream_contract(name, "reports zero batches per epoch"));
            }
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
            .ok_or_else(|| Error::MissingSplit(name.to_string()))
    }
}

impl<L> std::fmt::Debug for SplitRegistry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitRegistry").field("splits", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nested::Nested;
    use crate::stream::DatasetStream;

    fn stream(n: i32) -> DatasetStream<Vec<Nested<i32>>> {
        DatasetStream::new((0..n).map(Nested::Leaf).collect(), 1).unwrap()
    }

    #[test]
    fn test_train_is_first_and_mandatory() {
        let registry = SplitRegistry::new(stream(3)).with_split("test", stream(2));
        assert_eq!(registry.names(), vec!["train", "test"]);
        assert!(!registry.is_empty());
        assert_eq!(registry.len_of(TRAIN).unwrap(), 3);
        assert_eq!(registry.len_of("test").unwrap(), 2);
    }

    #[test]
    fn test_absent_validation_is_pruned() {
        let registry = SplitRegistry::with_validation(stream(3), None);
        assert_eq!(registry.names(), vec!["train"]);
        assert!(!registry.contains(VALIDATION));
    }

    #[test]
    fn test_alias_shares_stream() {
        let mut registry = SplitRegistry::new(stream(3));
        registry.alias(VALIDATION, TRAIN).unwrap();

        registry.stream_mut(VALIDATION).unwrap().next_batch().unwrap();
        let batch = registry.stream_mut(TRAIN).unwrap().next_batch().unwrap();
        assert_eq!(batch.leaves(), vec![&1]);
    }

    #[test]
    fn test_unalias_keeps_target_stream() {
        let mut registry = SplitRegistry::new(stream(3));
        registry.alias(VALIDATION, TRAIN).unwrap();

        assert!(registry.unalias(VALIDATION));
        assert_eq!(registry.names(), vec!["train"]);
        assert_eq!(registry.len_of(TRAIN).unwrap(), 3);
        assert!(!registry.unalias(VALIDATION));
    }

    #[test]
    fn test_unalias_only_drops_shared_names() {
        let mut registry = SplitRegistry::new(stream(3)).with_split(VALIDATION, stream(2));
        registry.alias("holdout", VALIDATION).unwrap();

        assert!(!registry.unalias(TRAIN));
        assert!(registry.unalias(VALIDATION));
        // The stream now belongs to "holdout" alone
        assert!(!registry.unalias("holdout"));
        assert_eq!(registry.len_of("holdout").unwrap(), 2);
    }

    #[test]
    fn test_alias_to_missing_split_fails() {
        let mut registry = SplitRegistry::new(stream(3));
        assert_eq!(registry.alias("x", "nope"), Err(Error::MissingSplit("nope".to_string())));
    }

    #[test]
    fn test_missing_split_lookup() {
        let registry = SplitRegistry::new(stream(1));
        assert!(matches!(registry.len_of(VALIDATION), Err(Error::MissingSplit(_))));
    }

    #[test]
    fn test_contract_rejects_empty_split() {
        let registry = SplitRegistry::new(stream(2)).with_split(VALIDATION, stream(0));
        assert_eq!(
            registry.check_contract(),
            Err(Error::stream_contract(VALIDATION, "reports zero batches per epoch"))
        );
    }
}
