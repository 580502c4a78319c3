use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::WorkflowAction;
use super::domain::{Candidate, CandidateId, PerformerId, Position, PositionId, Stage};

/// Server-side scoping accepted by [`CandidateStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(
        default,
        rename = "positionId",
        skip_serializing_if = "Option::is_none"
    )]
    pub position_id: Option<PositionId>,
}

/// Partial update sent to the store when a transition commits.
///
/// `expected_stage` is the origin the caller validated against; the store must refuse the
/// patch when the authoritative record has moved on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePatch {
    pub stage: Stage,
    pub status: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_stage: Option<Stage>,
}

/// Response of the remote action authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub message: String,
    pub candidate: Candidate,
}

/// Authoritative candidate persistence.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn list(&self, filter: &StoreFilter) -> Result<Vec<Candidate>, StoreError>;
    async fn get(&self, id: &CandidateId) -> Result<Candidate, StoreError>;
    async fn update(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError>;
    async fn delete(&self, id: &CandidateId) -> Result<(), StoreError>;
}

/// Remote authority that validates and commits a named action in one call.
#[async_trait]
pub trait ActionPerformer: Send + Sync {
    async fn perform_action(
        &self,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<ActionReceipt, StoreError>;
}

/// Read-only list of positions the selection context can point at.
#[async_trait]
pub trait PositionDirectory: Send + Sync {
    async fn positions(&self) -> Result<Vec<Position>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("candidate not found")]
    NotFound,
    #[error("store rejected the request: {message}")]
    Rejected { message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Message suitable for showing to the reviewer.
    pub fn message(&self) -> String {
        match self {
            StoreError::Rejected { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
