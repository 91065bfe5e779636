//! Placeholder store: the committed value of every canonical placeholder.
//!
//! The store is the only owner of committed values. Its key set is fixed at
//! [`initialize`](PlaceholderStore::initialize) time from the ordered name
//! list and never grows or shrinks afterwards; a new document replaces the
//! whole store.

use std::collections::HashMap;
use std::sync::Arc;

use docfill_core::placeholder::CanonicalPlaceholder;
use tracing::warn;

/// Result of [`PlaceholderStore::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The committed value changed.
    Changed,
    /// The value was already committed.
    Unchanged,
    /// No placeholder has that name; nothing happened.
    Unknown,
}

/// Canonical placeholders in first-occurrence order.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderStore {
    entries: Vec<CanonicalPlaceholder>,
    index: Arc<HashMap<String, usize>>,
}

impl PlaceholderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire store. Every name starts empty.
    ///
    /// Repeated names collapse onto their first occurrence.
    pub fn initialize(&mut self, names: &[String], descriptions: &HashMap<String, String>) {
        let mut entries = Vec::with_capacity(names.len());
        let mut index = HashMap::with_capacity(names.len());
        for name in names {
            if index.contains_key(name) {
                continue;
            }
            index.insert(name.clone(), entries.len());
            let description = descriptions.get(name).cloned().unwrap_or_default();
            entries.push(CanonicalPlaceholder::new(name.clone(), description));
        }
        self.entries = entries;
        self.index = Arc::new(index);
    }

    /// Set the committed value of an existing placeholder.
    pub fn commit(&mut self, name: &str, value: &str) -> CommitOutcome {
        let Some(&i) = self.index.get(name) else {
            warn!(name = %name, "Commit for unknown placeholder ignored");
            return CommitOutcome::Unknown;
        };
        let entry = &mut self.entries[i];
        if entry.value == value {
            CommitOutcome::Unchanged
        } else {
            entry.value = value.to_string();
            CommitOutcome::Changed
        }
    }

    pub fn get(&self, name: &str) -> Option<&CanonicalPlaceholder> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// The committed value, or `None` for an unknown name.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|p| p.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalPlaceholder> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filled_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_filled()).count()
    }

    /// An immutable copy for rendering, export, or comparison.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.entries.clone().into(),
            index: Arc::clone(&self.index),
        }
    }
}

/// A read-only view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    entries: Arc<[CanonicalPlaceholder]>,
    index: Arc<HashMap<String, usize>>,
}

impl StoreSnapshot {
    pub fn get(&self, name: &str) -> Option<&CanonicalPlaceholder> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalPlaceholder> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
