//! Nested mapping/sequence structures
//!
//! Batches, feeds, fetch structures and results all share one shape: a tree
//! of ordered mappings and sequences with values at the leaves. Mappings keep
//! insertion order so that walking a fetch structure invokes its ops in the
//! order they were declared.

/// An ordered tree of mappings and sequences with `T` at the leaves.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested<T> {
    /// A single value
    Leaf(T),
    /// An ordered sequence
    Seq(Vec<Nested<T>>),
    /// An ordered mapping from names to subtrees
    Map(Vec<(String, Nested<T>)>),
}

impl<T> Nested<T> {
    /// Create an empty mapping
    pub fn map() -> Self {
        Nested::Map(Vec::new())
    }

    /// Builder-style insert into a mapping.
    ///
    /// Replaces the value of an existing key in place. Has no effect on
    /// leaves and sequences.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Nested<T>>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert into a mapping, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Nested<T>>,
    ) -> Option<Nested<T>> {
        let Nested::Map(entries) = self else {
            return None;
        };
        let key = key.into();
        let value = value.into();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                entries.push((key, value));
                None
            }
        }
    }

    /// Remove a key from a mapping
    pub fn remove(&mut self, key: &str) -> Option<Nested<T>> {
        let Nested::Map(entries) = self else {
            return None;
        };
        let pos = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(pos).1)
    }

    /// Look up a key in a mapping
    pub fn get(&self, key: &str) -> Option<&Nested<T>> {
        match self {
            Nested::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Mutable lookup of a key in a mapping
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Nested<T>> {
        match self {
            Nested::Map(entries) => entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Look up a position in a sequence
    pub fn at(&self, index: usize) -> Option<&Nested<T>> {
        match self {
            Nested::Seq(items) => items.get(index),
            _ => None,
        }
    }

    /// Follow a path of mapping keys
    pub fn path(&self, keys: &[&str]) -> Option<&Nested<T>> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// The value if this node is a leaf
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Nested::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// All leaves, depth-first in declaration order
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    /// All leaves paired with their slash-joined paths
    pub fn flatten(&self) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        self.flatten_inner(&mut String::new(), &mut out);
        out
    }

    fn flatten_inner<'a>(&'a self, path: &mut String, out: &mut Vec<(String, &'a T)>) {
        match self {
            Nested::Leaf(value) => out.push((path.clone(), value)),
            Nested::Seq(items) => {
                for (i, item) in items.iter().enumerate() {
                    let len = push_segment(path, &i.to_string());
                    item.flatten_inner(path, out);
                    path.truncate(len);
                }
            }
            Nested::Map(entries) => {
                for (key, value) in entries {
                    let len = push_segment(path, key);
                    value.flatten_inner(path, out);
                    path.truncate(len);
                }
            }
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Nested::Leaf(value) => out.push(value),
            Nested::Seq(items) => items.iter().for_each(|item| item.collect_leaves(out)),
            Nested::Map(entries) => entries.iter().for_each(|(_, v)| v.collect_leaves(out)),
        }
    }

    /// Build an isomorphic structure by applying `f` to every leaf,
    /// depth-first in declaration order.
    pub fn walk<U, F>(&self, mut f: F) -> Nested<U>
    where
        F: FnMut(&T) -> U,
    {
        self.walk_inner(&mut f)
    }

    fn walk_inner<U, F>(&self, f: &mut F) -> Nested<U>
    where
        F: FnMut(&T) -> U,
    {
        match self {
            Nested::Leaf(value) => Nested::Leaf(f(value)),
            Nested::Seq(items) => Nested::Seq(items.iter().map(|item| item.walk_inner(f)).collect()),
            Nested::Map(entries) => Nested::Map(
                entries.iter().map(|(k, v)| (k.clone(), v.walk_inner(f))).collect(),
            ),
        }
    }

    /// Like [`walk`](Self::walk) but stops at the first failing leaf.
    ///
    /// The closure also receives the slash-joined path of the leaf.
    pub fn try_walk<U, E, F>(&self, mut f: F) -> Result<Nested<U>, E>
    where
        F: FnMut(&str, &T) -> Result<U, E>,
    {
        let mut path = String::new();
        self.try_walk_inner(&mut path, &mut f)
    }

    fn try_walk_inner<U, E, F>(&self, path: &mut String, f: &mut F) -> Result<Nested<U>, E>
    where
        F: FnMut(&str, &T) -> Result<U, E>,
    {
        match self {
            Nested::Leaf(value) => Ok(Nested::Leaf(f(path.as_str(), value)?)),
            Nested::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let len = push_segment(path, &i.to_string());
                    out.push(item.try_walk_inner(path, f)?);
                    path.truncate(len);
                }
                Ok(Nested::Seq(out))
            }
            Nested::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let len = push_segment(path, key);
                    out.push((key.clone(), value.try_walk_inner(path, f)?));
                    path.truncate(len);
                }
                Ok(Nested::Map(out))
            }
        }
    }
}

/// Append `/segment` (or `segment` at the root), returning the length to
/// truncate back to.
fn push_segment(path: &mut String, segment: &str) -> usize {
    let len = path.len();
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(segment);
    len
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Nested::Leaf(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Nested<i32> {
        Nested::<i32>::map()
            .with("image", Nested::Seq(vec![Nested::Leaf(1), Nested::Leaf(2)]))
            .with("labels", Nested::<i32>::map().with("identity", 7).with("attr", 3))
    }

    #[test]
    fn test_walk_preserves_shape_and_order() {
        let doubled = sample().walk(|v| v * 2);
        assert_eq!(doubled.leaves(), vec![&2, &4, &14, &6]);
        assert_eq!(doubled.path(&["labels", "identity"]).and_then(Nested::as_leaf), Some(&14));
    }

    #[test]
    fn test_walk_clone_is_deep_copy() {
        let original = sample();
        let mut copy = original.walk(Clone::clone);
        copy.insert("image", 0);
        assert_eq!(original.get("image").and_then(|n| n.at(1)).and_then(Nested::as_leaf), Some(&2));
    }

    #[test]
    fn test_insert_replaces_existing_key_in_place() {
        let mut tree = sample();
        let previous = tree.insert("image", 9);
        assert!(matches!(previous, Some(Nested::Seq(_))));
        assert_eq!(tree.leaves(), vec![&9, &7, &3]);
    }

    #[test]
    fn test_remove_and_flatten() {
        let mut tree = sample();
        assert!(tree.remove("image").is_some());
        assert!(tree.remove("image").is_none());
        let flat: Vec<(String, i32)> = tree.flatten().into_iter().map(|(p, v)| (p, *v)).collect();
        assert_eq!(
            flat,
            vec![("labels/identity".to_string(), 7), ("labels/attr".to_string(), 3)]
        );
    }

    #[test]
    fn test_get_mut_edits_subtree() {
        let mut tree = sample();
        if let Some(labels) = tree.get_mut("labels") {
            labels.remove("attr");
        }
        assert_eq!(tree.leaves(), vec![&1, &2, &7]);
        assert!(tree.get_mut("missing").is_none());
    }

    #[test]
    fn test_insert_on_leaf_is_ignored() {
        let mut leaf: Nested<i32> = Nested::Leaf(1);
        assert!(leaf.insert("k", 2).is_none());
        assert_eq!(leaf, Nested::Leaf(1));
    }

    #[test]
    fn test_try_walk_reports_path_and_stops() {
        let mut visited = Vec::new();
        let result: Result<Nested<i32>, String> = sample().try_walk(|path, v| {
            visited.push(path.to_string());
            if *v == 7 {
                Err(format!("bad leaf at {path}"))
            } else {
                Ok(*v)
            }
        });
        assert_eq!(result, Err("bad leaf at labels/identity".to_string()));
        assert_eq!(visited, vec!["image/0", "image/1", "labels/identity"]);
    }
}
