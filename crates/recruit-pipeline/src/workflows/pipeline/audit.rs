use std::sync::{Arc, Mutex};

use super::domain::{CandidateId, TransitionRecord};

/// Append-only sink for committed transitions.
pub trait TransitionLog: Send + Sync {
    fn append(&self, record: TransitionRecord);
    fn for_candidate(&self, id: &CandidateId) -> Vec<TransitionRecord>;
    fn all(&self) -> Vec<TransitionRecord>;
}

/// Process-local transition log. Entries are never mutated or removed.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransitionLog {
    records: Arc<Mutex<Vec<TransitionRecord>>>,
}

impl InMemoryTransitionLog {
    fn with_records<T>(&self, f: impl FnOnce(&mut Vec<TransitionRecord>) -> T) -> T {
        // push is the only mutation, so a poisoned log still holds whole entries
        let mut guard = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn len(&self) -> usize {
        self.with_records(|records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransitionLog for InMemoryTransitionLog {
    fn append(&self, record: TransitionRecord) {
        self.with_records(|records| records.push(record));
    }

    fn for_candidate(&self, id: &CandidateId) -> Vec<TransitionRecord> {
        self.with_records(|records| {
            records
                .iter()
                .filter(|record| &record.candidate_id == id)
                .cloned()
                .collect()
        })
    }

    fn all(&self) -> Vec<TransitionRecord> {
        self.with_records(|records| records.clone())
    }
}
