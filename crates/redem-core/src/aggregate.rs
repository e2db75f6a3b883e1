//! Insertion-ordered grouping with occurrence counts.
//!
//! [`Aggregator`] is a fold over an explicit sequence: each pushed item is
//! mapped to a key and a value, and values are appended to their key's
//! group in the order observed. Groups themselves keep first-seen order.
//!
//! The only mutable state is the aggregator's own map, so independent
//! workers can each build a partial aggregate and the caller can
//! [`merge`](Aggregator::merge) them in sequence order afterwards.

use std::hash::Hash;

use indexmap::IndexMap;

/// Groups items by key, keeping every value in observation order.
pub struct Aggregator<T, K, V> {
    groups: IndexMap<K, Vec<V>>,
    total: usize,
    key_fn: fn(&T) -> K,
    value_fn: fn(T) -> V,
}

impl<T, K, V> Aggregator<T, K, V>
where
    K: Hash + Eq,
{
    pub fn new(key_fn: fn(&T) -> K, value_fn: fn(T) -> V) -> Self {
        Self {
            groups: IndexMap::new(),
            total: 0,
            key_fn,
            value_fn,
        }
    }

    /// Fresh, empty aggregator with the same key and value functions.
    pub fn empty_like(&self) -> Self {
        Self::new(self.key_fn, self.value_fn)
    }

    pub fn push(&mut self, item: T) {
        let key = (self.key_fn)(&item);
        let value = (self.value_fn)(item);
        self.groups.entry(key).or_default().push(value);
        self.total += 1;
    }

    /// Lazy `(key, count, refs)` triples in group-insertion order.
    pub fn counts(&self) -> impl Iterator<Item = (&K, usize, &[V])> + '_ {
        self.groups
            .iter()
            .map(|(key, refs)| (key, refs.len(), refs.as_slice()))
    }

    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Number of items pushed so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append another aggregate as if its items had been pushed here after
    /// everything already seen.
    pub fn merge(&mut self, other: Self) {
        self.total += other.total;
        for (key, refs) in other.groups {
            self.groups.entry(key).or_default().extend(refs);
        }
    }
}

impl<T, K, V> Extend<T> for Aggregator<T, K, V>
where
    K: Hash + Eq,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<T, K, V> std::fmt::Debug for Aggregator<T, K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("groups", &self.groups)
            .field("total", &self.total)
            .finish()
    }
}

/// Build a fresh aggregator from `items`.
pub fn group_and_count<T, K, V, I>(
    items: I,
    key_fn: fn(&T) -> K,
    value_fn: fn(T) -> V,
) -> Aggregator<T, K, V>
where
    K: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    let mut aggregator = Aggregator::new(key_fn, value_fn);
    aggregator.extend(items);
    aggregator
}
