//! Update protocol adapter: turns external update records into commits.
//!
//! Records come from bulk edits and from agent replies. A record names its
//! placeholder directly, or by its 1-based position in the ordered name list.
//! The service may use one name for several occurrences; such a record is
//! narrowed by its position or written to all of them.
//! Records that resolve to nothing are dropped; they never fail the batch.

use docfill_core::error::UnresolvedUpdateError;
use docfill_core::placeholder::UpdateRecord;
use tracing::debug;

use crate::binder::BoundDocument;
use crate::draft::DraftReconciler;
use crate::store::{CommitOutcome, PlaceholderStore};

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Names whose committed value changed, in first-change order.
    pub applied: Vec<String>,
    /// Names whose committed value changed under an unsaved edit.
    pub kept_drafts: Vec<String>,
    /// Records that named nothing.
    pub dropped: Vec<UnresolvedUpdateError>,
}

/// Resolve a record to the canonical names it writes.
///
/// A non-blank `name` the store knows wins over `order`. When the service
/// used that name for several occurrences, `order` picks one of them if it
/// points inside the group; otherwise every occurrence is written. Without a
/// usable name, `order` is looked up in the bound document's ordered names.
pub fn resolve(
    record: &UpdateRecord,
    bound: &BoundDocument,
    store: &PlaceholderStore,
) -> Result<Vec<String>, UnresolvedUpdateError> {
    let by_order = record
        .order
        .and_then(|order| (order as usize).checked_sub(1))
        .and_then(|i| bound.names().get(i))
        .filter(|name| store.contains(name));

    if let Some(name) = record.named() {
        let siblings: Vec<&str> = bound
            .siblings(name)
            .into_iter()
            .filter(|sibling| store.contains(sibling))
            .collect();

        if siblings.len() > 1 {
            if let Some(target) = by_order.filter(|n| siblings.contains(&n.as_str())) {
                return Ok(vec![target.clone()]);
            }
            debug!(name = %name, count = siblings.len(), "Update fans out to every occurrence");
            return Ok(siblings.into_iter().map(str::to_string).collect());
        }
        if store.contains(name) {
            return Ok(vec![name.to_string()]);
        }
        if let [only] = siblings.as_slice() {
            return Ok(vec![only.to_string()]);
        }
    }

    by_order
        .map(|name| vec![name.clone()])
        .ok_or_else(|| UnresolvedUpdateError {
            name: record.name.clone(),
            order: record.order,
        })
}

/// Apply a batch in record order; later records win for the same name.
///
/// Drafts are reconciled once against the store as it was before the batch.
pub fn apply_batch(
    records: &[UpdateRecord],
    bound: &BoundDocument,
    store: &mut PlaceholderStore,
    drafts: &mut DraftReconciler,
) -> UpdateReport {
    let before = store.snapshot();
    let mut report = UpdateReport::default();

    for record in records {
        match resolve(record, bound, store) {
            Ok(targets) => {
                for name in targets {
                    if store.commit(&name, &record.value) == CommitOutcome::Changed
                        && !report.applied.contains(&name)
                    {
                        report.applied.push(name);
                    }
                }
            }
            Err(unresolved) => {
                debug!(%unresolved, "Dropping update record");
                report.dropped.push(unresolved);
            }
        }
    }

    // A name changed and changed back within the batch is not an update.
    report
        .applied
        .retain(|name| before.value(name) != store.value(name));
    report.kept_drafts = drafts.reconcile(&before, store);
    report
}
