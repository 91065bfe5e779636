//! Draft reconciler: local edit buffers on top of committed values.
//!
//! Each placeholder has a draft string the user types into. Whether a
//! placeholder is dirty is never stored: it is always recomputed as
//! `draft != committed`. When committed values change, from an apply or from
//! an external push, [`DraftReconciler::reconcile`] moves every clean draft
//! along with its committed value and leaves dirty drafts alone, so an
//! unsaved edit is never overwritten and the merge gives the same result
//! whichever asynchronous update lands first.

use std::collections::HashMap;

use docfill_core::placeholder::NamedValue;
use tracing::{debug, warn};

use crate::store::{PlaceholderStore, StoreSnapshot};

/// `true` when the draft differs from the committed value, absence counting
/// as the empty string on both sides.
pub fn is_dirty(draft: Option<&str>, committed: Option<&str>) -> bool {
    draft.unwrap_or("") != committed.unwrap_or("")
}

#[derive(Debug, Clone, Default)]
pub struct DraftReconciler {
    drafts: HashMap<String, String>,
}

impl DraftReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every draft to the store's committed value.
    pub fn initialize(&mut self, store: &PlaceholderStore) {
        self.drafts = store
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
    }

    /// Overwrite a draft. Returns `false` for an unknown name.
    pub fn edit(&mut self, name: &str, text: &str) -> bool {
        match self.drafts.get_mut(name) {
            Some(draft) => {
                draft.clear();
                draft.push_str(text);
                true
            }
            None => {
                warn!(name = %name, "Edit for unknown placeholder ignored");
                false
            }
        }
    }

    pub fn draft(&self, name: &str) -> Option<&str> {
        self.drafts.get(name).map(String::as_str)
    }

    pub fn is_dirty(&self, name: &str, store: &PlaceholderStore) -> bool {
        is_dirty(self.draft(name), store.value(name))
    }

    /// Dirty names in store order.
    pub fn dirty_names(&self, store: &PlaceholderStore) -> Vec<String> {
        store
            .names()
            .filter(|name| self.is_dirty(name, store))
            .map(str::to_string)
            .collect()
    }

    /// Commit the draft of `name` and return the pair to synchronize.
    ///
    /// `None` when the name is unknown.
    pub fn apply(&mut self, name: &str, store: &mut PlaceholderStore) -> Option<NamedValue> {
        let value = self.draft(name)?.to_string();
        let before = store.snapshot();
        store.commit(name, &value);
        self.reconcile(&before, store);
        Some(NamedValue::new(name, value))
    }

    /// Throw away an unsaved edit. Returns `false` for an unknown name.
    pub fn discard(&mut self, name: &str, store: &PlaceholderStore) -> bool {
        match (self.drafts.get_mut(name), store.value(name)) {
            (Some(draft), Some(committed)) => {
                *draft = committed.to_string();
                true
            }
            _ => false,
        }
    }

    /// Bring clean drafts up to date after the store changed from `before`.
    ///
    /// Returns the names whose committed value changed underneath an
    /// unsaved edit that still differs from it; those drafts are left
    /// untouched.
    pub fn reconcile(&mut self, before: &StoreSnapshot, after: &PlaceholderStore) -> Vec<String> {
        let mut kept = Vec::new();
        for placeholder in after.iter() {
            let old = before.value(&placeholder.name);
            if old == Some(placeholder.value.as_str()) {
                continue;
            }
            let draft = self.drafts.entry(placeholder.name.clone()).or_default();
            if is_dirty(Some(draft.as_str()), old) {
                if *draft != placeholder.value {
                    debug!(name = %placeholder.name, "Committed value changed under an unsaved edit; keeping draft");
                    kept.push(placeholder.name.clone());
                }
            } else {
                *draft = placeholder.value.clone();
            }
        }
        kept
    }
}
