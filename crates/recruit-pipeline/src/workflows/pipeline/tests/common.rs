use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::pipeline::audit::InMemoryTransitionLog;
use crate::workflows::pipeline::domain::{Candidate, CandidateId, Position, PositionId, Stage};
use crate::workflows::pipeline::selection::SelectionContext;
use crate::workflows::pipeline::service::PipelineService;
use crate::workflows::pipeline::stage::resolve;
use crate::workflows::pipeline::store::{
    CandidatePatch, CandidateStore, PositionDirectory, StoreError, StoreFilter,
};

pub(super) fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    ts(20) + Duration::hours(3)
}

pub(super) fn candidate(id: &str, name: &str, position: &str, stage: Stage, day: u32) -> Candidate {
    Candidate::new(id, name, position, ts(day)).with_stage(stage)
}

pub(super) fn roster() -> Vec<Candidate> {
    vec![
        candidate("c1", "Ada Lovelace", "p1", Stage::Applied, 1)
            .with_position_title("Backend Engineer"),
        candidate("c2", "Alan Turing", "p1", Stage::Shortlisted, 2)
            .with_position_title("Backend Engineer"),
        candidate("c3", "Grace Hopper", "p2", Stage::Applied, 3)
            .with_position_title("Data Analyst"),
        candidate("c4", "Edsger Dijkstra", "p1", Stage::Screened, 4)
            .with_position_title("Backend Engineer"),
        candidate("c5", "Barbara Liskov", "p2", Stage::Screened, 5)
            .with_position_title("Data Analyst"),
        Candidate::new("c6", "Donald Knuth", "p1", ts(6))
            .with_status("screening")
            .with_position_title("Backend Engineer"),
        candidate("c7", "Frances Allen", "p1", Stage::Hired, 7),
        candidate("c8", "Ken Thompson", "p1", Stage::Rejected, 8),
    ]
}

/// In-memory store that honours the expected-origin check and counts every call.
#[derive(Default)]
pub(super) struct MockStore {
    records: Mutex<BTreeMap<CandidateId, Candidate>>,
    pub(super) list_calls: AtomicUsize,
    pub(super) get_calls: AtomicUsize,
    pub(super) update_calls: AtomicUsize,
    fail_list: Mutex<Option<StoreError>>,
    fail_update: Mutex<Option<StoreError>>,
    ignore_filters: bool,
}

impl MockStore {
    pub(super) fn with(records: Vec<Candidate>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.records.lock().expect("store mutex poisoned");
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        store
    }

    /// Store that returns every record regardless of the filter.
    pub(super) fn unfiltered(records: Vec<Candidate>) -> Self {
        Self {
            ignore_filters: true,
            ..Self::with(records)
        }
    }

    pub(super) fn fail_list_with(&self, error: Option<StoreError>) {
        *self.fail_list.lock().expect("store mutex poisoned") = error;
    }

    pub(super) fn fail_update_with(&self, error: Option<StoreError>) {
        *self.fail_update.lock().expect("store mutex poisoned") = error;
    }

    pub(super) fn record(&self, id: &str) -> Candidate {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(&CandidateId(id.to_string()))
            .cloned()
            .expect("record present")
    }

    /// Simulate another reviewer moving the record.
    pub(super) fn force_stage(&self, id: &str, stage: Stage) {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard
            .get_mut(&CandidateId(id.to_string()))
            .expect("record present");
        record.stage = Some(stage.as_str().to_string());
    }

    pub(super) fn calls(&self) -> (usize, usize, usize) {
        (
            self.list_calls.load(Ordering::SeqCst),
            self.get_calls.load(Ordering::SeqCst),
            self.update_calls.load(Ordering::SeqCst),
        )
    }
}

fn matches_filter(candidate: &Candidate, filter: &StoreFilter) -> bool {
    filter.stage.map_or(true, |stage| resolve(candidate) == stage)
        && filter
            .position_id
            .as_ref()
            .map_or(true, |position| &candidate.position_id == position)
}

#[async_trait]
impl CandidateStore for MockStore {
    async fn list(&self, filter: &StoreFilter) -> Result<Vec<Candidate>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.fail_list.lock().expect("store mutex poisoned").clone();
        if let Some(error) = failure {
            return Err(error);
        }
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|candidate| self.ignore_filters || matches_filter(candidate, filter))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &CandidateId) -> Result<Candidate, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .fail_update
            .lock()
            .expect("store mutex poisoned")
            .clone();
        if let Some(error) = failure {
            return Err(error);
        }
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(expected) = patch.expected_stage {
            let current = resolve(record);
            if current != expected {
                return Err(StoreError::Rejected {
                    message: format!("candidate is at {current}, not {expected}"),
                });
            }
        }
        record.stage = Some(patch.stage.as_str().to_string());
        record.status = Some(patch.status);
        record.updated_at = patch.updated_at;
        Ok(record.clone())
    }

    async fn delete(&self, id: &CandidateId) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MockDirectory {
    pub(super) positions: Vec<Position>,
    pub(super) offline: bool,
}

impl MockDirectory {
    pub(super) fn standard() -> Self {
        Self {
            positions: vec![
                Position {
                    id: PositionId("p1".to_string()),
                    title: "Backend Engineer".to_string(),
                    event_name: Some("Spring Hiring Fair".to_string()),
                },
                Position {
                    id: PositionId("p2".to_string()),
                    title: "Data Analyst".to_string(),
                    event_name: None,
                },
            ],
            offline: false,
        }
    }
}

#[async_trait]
impl PositionDirectory for MockDirectory {
    async fn positions(&self) -> Result<Vec<Position>, StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("directory offline".to_string()));
        }
        Ok(self.positions.clone())
    }
}

pub(super) type TestService = PipelineService<MockStore, InMemoryTransitionLog>;

pub(super) fn build_service_with(
    store: MockStore,
    directory: MockDirectory,
) -> (Arc<TestService>, Arc<MockStore>, Arc<InMemoryTransitionLog>) {
    let store = Arc::new(store);
    let log = Arc::new(InMemoryTransitionLog::default());
    let service = PipelineService::new(
        Arc::clone(&store),
        Arc::clone(&log),
        Arc::new(directory),
        SelectionContext::new(),
    )
    .with_clock(fixed_now);
    (Arc::new(service), store, log)
}

pub(super) fn build_service() -> (Arc<TestService>, Arc<MockStore>, Arc<InMemoryTransitionLog>) {
    build_service_with(MockStore::with(roster()), MockDirectory::standard())
}

/// Store whose list calls return queued responses; the first call waits for `release`.
pub(super) struct GatedStore {
    responses: Mutex<VecDeque<Vec<Candidate>>>,
    calls: AtomicUsize,
    pub(super) requested: Notify,
    gate: Notify,
}

impl GatedStore {
    pub(super) fn new(responses: Vec<Vec<Candidate>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            requested: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub(super) fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CandidateStore for GatedStore {
    async fn list(&self, _filter: &StoreFilter) -> Result<Vec<Candidate>, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .expect("gate mutex poisoned")
            .pop_front()
            .unwrap_or_default();
        if call == 0 {
            self.requested.notify_one();
            self.gate.notified().await;
        }
        Ok(response)
    }

    async fn get(&self, _id: &CandidateId) -> Result<Candidate, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn update(
        &self,
        _id: &CandidateId,
        _patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        Err(StoreError::Unavailable("read only".to_string()))
    }

    async fn delete(&self, _id: &CandidateId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read only".to_string()))
    }
}

pub(super) fn ids(items: &[Candidate]) -> Vec<&str> {
    items
        .iter()
        .map(|candidate| candidate.id.0.as_str())
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
