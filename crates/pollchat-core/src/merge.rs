//! Merge of the local cache and the remote store into one list
//!
//! Remote records are authoritative for every entity they know about. Local
//! records that match no remote record (by id or back-reference) are
//! not-yet-synced conversations and stay visible.

use crate::identity::same_entity;
use crate::models::Conversation;

/// Counts collected while merging, logged at debug level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Remote records kept
    pub remote: usize,
    /// Local records kept because no other record matched them
    pub local_only: usize,
    /// Records discarded because an earlier record was the same entity
    pub duplicates_dropped: usize,
    /// Records discarded because they belong to another (or no) owner
    pub foreign_owner_dropped: usize,
}

/// Merge `remote` and `local` conversations owned by `owner_id`.
///
/// Output order is remote records in input order, then local-only records in
/// input order. No two output records are the same entity.
#[must_use]
pub fn merge(remote: &[Conversation], local: &[Conversation], owner_id: &str) -> Vec<Conversation> {
    merge_with_report(remote, local, owner_id).0
}

/// Same as [`merge`], also returning what was kept and dropped.
#[must_use]
pub fn merge_with_report(
    remote: &[Conversation],
    local: &[Conversation],
    owner_id: &str,
) -> (Vec<Conversation>, MergeReport) {
    let mut report = MergeReport::default();
    let mut merged: Vec<Conversation> = Vec::with_capacity(remote.len() + local.len());

    for conversation in remote {
        if !conversation.is_owned_by(owner_id) {
            report.foreign_owner_dropped += 1;
            continue;
        }
        // The remote store keys by id, so only exact id repeats can occur here.
        if merged.iter().any(|existing| existing.id == conversation.id) {
            report.duplicates_dropped += 1;
            continue;
        }
        merged.push(conversation.clone());
        report.remote += 1;
    }

    for conversation in local {
        if !conversation.is_owned_by(owner_id) {
            report.foreign_owner_dropped += 1;
            continue;
        }
        if merged
            .iter()
            .any(|existing| same_entity(existing, conversation))
        {
            report.duplicates_dropped += 1;
            continue;
        }
        merged.push(conversation.clone());
        report.local_only += 1;
    }

    tracing::debug!(
        owner_id,
        remote = report.remote,
        local_only = report.local_only,
        duplicates_dropped = report.duplicates_dropped,
        foreign_owner_dropped = report.foreign_owner_dropped,
        "Merged conversation sources"
    );

    (merged, report)
}
