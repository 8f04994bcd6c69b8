//! Summing monetary values by key

use std::collections::HashMap;
use std::hash::Hash;

/// Running totals keyed by `K`, iterated in the order keys were first seen
#[derive(Debug, Clone)]
pub struct Totals<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, f64)>,
}

impl<K> Default for Totals<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Totals<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the total for `key`, creating it at the end if unseen
    pub fn add(&mut self, key: K, value: f64) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Sum over every key
    pub fn grand_total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    pub fn into_entries(self) -> Vec<(K, f64)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone> FromIterator<(K, f64)> for Totals<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (key, value) in iter {
            totals.add(key, value);
        }
        totals
    }
}
