use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use recruit_pipeline::workflows::pipeline::{
    resolve, Candidate, CandidateId, CandidatePatch, CandidateStore, Position, PositionDirectory,
    PositionId, Stage, StoreError, StoreFilter,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local candidate store used when no remote store is configured.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateStore {
    records: Arc<Mutex<BTreeMap<CandidateId, Candidate>>>,
}

impl InMemoryCandidateStore {
    pub(crate) fn seeded(records: Vec<Candidate>) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.records.lock() {
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        store
    }

    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<CandidateId, Candidate>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("candidate store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn list(&self, filter: &StoreFilter) -> Result<Vec<Candidate>, StoreError> {
        let guard = self.records()?;
        let mut matches: Vec<Candidate> = guard
            .values()
            .filter(|candidate| filter.stage.map_or(true, |stage| resolve(candidate) == stage))
            .filter(|candidate| {
                filter
                    .position_id
                    .as_ref()
                    .map_or(true, |position| &candidate.position_id == position)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn get(&self, id: &CandidateId) -> Result<Candidate, StoreError> {
        self.records()?.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        let mut guard = self.records()?;
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(expected) = patch.expected_stage {
            let current = resolve(record);
            if current != expected {
                return Err(StoreError::Rejected {
                    message: format!("candidate moved to {current} before this update"),
                });
            }
        }
        record.stage = Some(patch.stage.as_str().to_string());
        record.status = Some(patch.status);
        record.updated_at = patch.updated_at;
        Ok(record.clone())
    }

    async fn delete(&self, id: &CandidateId) -> Result<(), StoreError> {
        self.records()?
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPositionDirectory {
    positions: Vec<Position>,
}

impl InMemoryPositionDirectory {
    pub(crate) fn new(positions: Vec<Position>) -> Self {
        Self { positions }
    }
}

#[async_trait]
impl PositionDirectory for InMemoryPositionDirectory {
    async fn positions(&self) -> Result<Vec<Position>, StoreError> {
        Ok(self.positions.clone())
    }
}

pub(crate) fn seed_positions() -> Vec<Position> {
    vec![
        Position {
            id: PositionId("pos-backend".to_string()),
            title: "Backend Engineer".to_string(),
            event_name: Some("Autumn Tech Career Fair".to_string()),
        },
        Position {
            id: PositionId("pos-data".to_string()),
            title: "Data Analyst".to_string(),
            event_name: Some("Autumn Tech Career Fair".to_string()),
        },
        Position {
            id: PositionId("pos-design".to_string()),
            title: "Product Designer".to_string(),
            event_name: None,
        },
    ]
}

/// Demo roster mixing canonical stages with legacy status values.
pub(crate) fn seed_candidates(now: DateTime<Utc>) -> Vec<Candidate> {
    let applied_at = |days: i64| now - Duration::days(days);
    let backend = |id: &str, name: &str, days: i64| {
        Candidate::new(id, name, "pos-backend", applied_at(days))
            .with_position_title("Backend Engineer")
    };
    let data = |id: &str, name: &str, days: i64| {
        Candidate::new(id, name, "pos-data", applied_at(days)).with_position_title("Data Analyst")
    };
    let design = |id: &str, name: &str, days: i64| {
        Candidate::new(id, name, "pos-design", applied_at(days))
            .with_position_title("Product Designer")
    };

    let mut scored = backend("cand-1001", "Amara Okafor", 9).with_stage(Stage::Applied);
    scored.email = Some("amara.okafor@example.com".to_string());
    scored.evaluation_data = vec![json!({ "overallScore": 82, "recommendation": "advance" })];

    vec![
        scored,
        backend("cand-1002", "Luis Ortega", 8).with_status("pending"),
        backend("cand-1003", "Mei Tanaka", 12).with_stage(Stage::Screened),
        backend("cand-1004", "Jonas Berg", 15).with_status("Interview Scheduled"),
        backend("cand-1005", "Priya Raman", 20).with_stage(Stage::OfferPending),
        data("cand-2001", "Noah Williams", 4).with_stage(Stage::Applied),
        data("cand-2002", "Fatima Zahra", 11).with_status("under_review"),
        data("cand-2003", "Oliver Chen", 18).with_stage(Stage::OnHold),
        data("cand-2004", "Sofia Rossi", 30).with_status("declined"),
        design("cand-3001", "Hannah Müller", 6).with_stage(Stage::Shortlisted),
        design("cand-3002", "Kwame Mensah", 25).with_status("offer accepted"),
    ]
}
