//! Error aggregation for parallel map calls.
//!
//! A parallel map never fails as a whole; individual items do. [`ErrMap`]
//! records which input indices failed and with what, and renders the whole
//! batch deterministically no matter what order the failures arrived in.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A single failed item, tagged with its position in the input sequence.
///
/// Renders as `"<index>: <error>"` and exposes the original error through
/// [`std::error::Error::source`], so callers can downcast or inspect the
/// cause of any individual failure.
#[derive(Debug, Error)]
#[error("{index}: {source}")]
pub struct IndexedError<E>
where
    E: std::error::Error,
{
    /// Position of the failed item in the original input sequence
    pub index: usize,
    /// The error the transform produced at that position
    #[source]
    pub source: E,
}

/// Map from original input index to the error produced at that index.
///
/// Returned by [`try_map`](crate::try_map) when at least one item failed.
/// Keys are unique by construction: each input is processed exactly once, so
/// each index fails at most once.
///
/// Rendering is deterministic. [`fmt::Display`] (and [`ErrMap::join`]) format
/// the entries in ascending index order, one `"<index>: <error>"` line per
/// entry, regardless of the order in which the failures were recorded.
///
/// `ErrMap` implements [`std::error::Error`] whenever the entry type does, so
/// the aggregate composes with ordinary error-handling code:
///
/// ```
/// use parmap::ErrMap;
///
/// let errors: ErrMap<std::num::ParseIntError> =
///     ["7", "x", "9", "y"].iter().enumerate()
///         .filter_map(|(i, s)| s.parse::<i64>().err().map(|e| (i, e)))
///         .collect();
///
/// assert_eq!(errors.len(), 2);
/// assert!(errors.get(1).is_some());
/// let boxed: Box<dyn std::error::Error> = Box::new(errors);
/// assert!(boxed.to_string().starts_with("1: "));
/// ```
#[derive(Debug, Clone)]
pub struct ErrMap<E> {
    entries: BTreeMap<usize, E>,
}

impl<E> ErrMap<E> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Records `error` under `index`, replacing any previous entry.
    pub fn insert(&mut self, index: usize, error: E) {
        self.entries.insert(index, error);
    }

    /// Returns the error recorded at `index`, if that item failed.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(&index)
    }

    /// Number of failed items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no item failed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(index, error)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &E)> {
        self.entries.iter().map(|(&index, error)| (index, error))
    }

    /// The failed indices, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    /// Renders the map as its deterministic joined form.
    ///
    /// Identical to the [`fmt::Display`] output: one `"<index>: <error>"`
    /// line per entry, ascending by index, newline-separated. Calling this
    /// twice on the same map yields identical strings.
    pub fn join(&self) -> String
    where
        E: fmt::Display,
    {
        self.to_string()
    }

    /// Consumes the map into per-entry [`IndexedError`] values, ascending by
    /// index. Each value keeps its cause reachable via `source()`.
    pub fn into_indexed(self) -> Vec<IndexedError<E>>
    where
        E: std::error::Error,
    {
        self.entries
            .into_iter()
            .map(|(index, source)| IndexedError { index, source })
            .collect()
    }
}

impl<E> Default for ErrMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<(usize, E)> for ErrMap<E> {
    fn from_iter<T: IntoIterator<Item = (usize, E)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for ErrMap<E> {
    type Item = (usize, E);
    type IntoIter = std::collections::btree_map::IntoIter<usize, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ErrMap<E> {
    type Item = (&'a usize, &'a E);
    type IntoIter = std::collections::btree_map::Iter<'a, usize, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<E: fmt::Display> fmt::Display for ErrMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // BTreeMap iterates in key order, which is what makes the join
        // deterministic across runs.
        for (i, (index, error)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{index}: {error}")?;
        }
        Ok(())
    }
}

impl<E> std::error::Error for ErrMap<E> where E: std::error::Error {}
