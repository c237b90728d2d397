//! Insertion-ordered map that keeps every value added under a key.

use std::slice;
use std::vec;

/// An ordered multi-valued map used for decoded form fields and uploaded files.
///
/// Adding a key that is already present appends a new entry instead of
/// replacing the old one, and iteration yields entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for FormMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> FormMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>>(&mut self, key: K, value: V) {
        self.entries.push((key.into(), value));
    }

    /// Returns the first value added under `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns every value added under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a V> + 'a {
        self.entries.iter().filter(move |(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter { inner: self.entries.iter() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Borrowing iterator over the entries of a [`FormMap`].
#[derive(Debug)]
pub struct Iter<'a, V> {
    inner: slice::Iter<'a, (String, V)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, V> IntoIterator for &'a FormMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V> IntoIterator for FormMap<V> {
    type Item = (String, V);
    type IntoIter = vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for FormMap<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}
