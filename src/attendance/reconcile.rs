//! Reconciliation of a candidate batch against one date's attendance log.

use std::collections::HashMap;

use super::merge::MergePolicy;
use super::types::*;

/// `employeeCode -> storageKey` over a stored record set.
///
/// Built once per ingestion call and discarded with it.
#[derive(Debug, Clone, Default)]
pub struct EmployeeIndex {
    by_code: HashMap<String, String>,
}

impl EmployeeIndex {
    pub fn build(records: &RecordSet<AttendanceRecord>) -> Self {
        let mut by_code = HashMap::with_capacity(records.len());
        for (key, record) in records {
            // First key in storage order wins if the set is already inconsistent
            by_code
                .entry(record.employee_code.clone())
                .or_insert_with(|| key.clone());
        }
        EmployeeIndex { by_code }
    }

    pub fn get(&self, employee_code: &str) -> Option<&str> {
        self.by_code.get(employee_code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Collapse candidates sharing an employee code; the later row replaces the
/// earlier one wholesale but keeps its position.
pub fn collapse_batch(candidates: &[CandidateRow]) -> (Vec<&CandidateRow>, usize) {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut collapsed: Vec<&CandidateRow> = Vec::with_capacity(candidates.len());
    let mut duplicates = 0;

    for candidate in candidates {
        match positions.get(candidate.record.employee_code.as_str()) {
            Some(&pos) => {
                collapsed[pos] = candidate;
                duplicates += 1;
            }
            None => {
                positions.insert(candidate.record.employee_code.as_str(), collapsed.len());
                collapsed.push(candidate);
            }
        }
    }

    (collapsed, duplicates)
}

/// Merge a batch into the stored day log, inserting under fresh UUID keys
pub fn reconcile(
    stored: RecordSet<AttendanceRecord>,
    candidates: &[CandidateRow],
    policy: &MergePolicy,
) -> Reconciliation {
    reconcile_with_keys(stored, candidates, policy, || uuid::Uuid::new_v4().to_string())
}

/// Same as [`reconcile`] with a caller-supplied key generator
pub fn reconcile_with_keys<F>(
    stored: RecordSet<AttendanceRecord>,
    candidates: &[CandidateRow],
    policy: &MergePolicy,
    mut next_key: F,
) -> Reconciliation
where
    F: FnMut() -> String,
{
    let index = EmployeeIndex::build(&stored);
    let (batch, batch_duplicates) = collapse_batch(candidates);

    let mut records = stored;
    let mut inserted_count = 0;
    let mut updated_count = 0;

    for candidate in batch {
        let incoming = &candidate.record;

        match index
            .get(&incoming.employee_code)
            .and_then(|key| records.get_mut(key))
        {
            Some(existing) => {
                policy.apply(existing, incoming);
                // Sequence numbers are always present on a candidate
                existing.sequence_number = incoming.sequence_number;
                updated_count += 1;
            }
            None => {
                let mut key = next_key();
                while records.contains_key(&key) {
                    key = next_key();
                }
                records.insert(key, incoming.clone());
                inserted_count += 1;
            }
        }
    }

    Reconciliation {
        records,
        inserted_count,
        updated_count,
        batch_duplicates,
    }
}
