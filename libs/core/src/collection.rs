use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::item::NamedItem;

/// Snapshot of one collection-valued attribute of a remote parent resource.
///
/// Order is kept exactly as fetched; the remote API treats it as opaque but
/// rewrites must not shuffle untouched items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Collection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: NamedItem> Collection<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub(crate) fn position_of_id(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Position of the single item keyed `key`, or `None`.
    ///
    /// More than one match means the snapshot is corrupt and is reported
    /// instead of picking one.
    pub fn position_of_key(&self, key: &str) -> Result<Option<usize>, ReconcileError> {
        let mut matches = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.key() == key)
            .map(|(index, _)| index);
        let first = matches.next();
        let extra = matches.count();
        if extra > 0 {
            return Err(ReconcileError::DataIntegrity {
                key: key.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    pub fn find_key(&self, key: &str) -> Result<Option<&T>, ReconcileError> {
        Ok(self.position_of_key(key)?.map(|index| &self.items[index]))
    }

    /// Like [`Collection::find_key`] but absence is an error.
    pub fn require_key(&self, key: &str) -> Result<&T, ReconcileError> {
        self.find_key(key)?
            .ok_or_else(|| ReconcileError::not_found(format!("item '{key}'")))
    }

    /// Reports the first key that appears more than once.
    pub fn ensure_unique_keys(&self) -> Result<(), ReconcileError> {
        for (index, item) in self.items.iter().enumerate() {
            let count = self.items[index..]
                .iter()
                .filter(|other| other.key() == item.key())
                .count();
            if count > 1 {
                return Err(ReconcileError::DataIntegrity {
                    key: item.key().to_string(),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Lazily yields every item matching `predicate`. The iterator is
    /// cloneable, so a caller can walk the matches more than once.
    pub fn find_by<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a T> + Clone + 'a
    where
        P: Fn(&T) -> bool + Clone + 'a,
    {
        find_by_predicate(&self.items, predicate)
    }
}

/// Slice form of [`Collection::find_by`]. No match is an empty iterator,
/// never an error.
pub fn find_by_predicate<'a, T, P>(
    items: &'a [T],
    predicate: P,
) -> impl Iterator<Item = &'a T> + Clone + 'a
where
    T: 'a,
    P: Fn(&T) -> bool + Clone + 'a,
{
    items.iter().filter(move |item: &&T| predicate(*item))
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
