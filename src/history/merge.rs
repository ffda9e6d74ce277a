//! Identifier-keyed merge of remote and local history

use std::collections::HashSet;

use crate::types::GenerationRecord;

/// Remote records in their original order, followed by the local records
/// whose id the remote list does not contain.
pub fn merge_records(remote: Vec<GenerationRecord>, local: Vec<GenerationRecord>) -> Vec<GenerationRecord> {
    let remote_ids: HashSet<String> = remote.iter().map(|r| r.id.clone()).collect();
    let mut merged = remote;
    merged.extend(local.into_iter().filter(|l| !remote_ids.contains(&l.id)));
    merged
}
