use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::audit::TransitionLog;
use super::catalog::{ActionRule, WorkflowAction};
use super::domain::{Candidate, CandidateId, PerformerId, Stage, TransitionRecord};
use super::stage::resolve;
use super::store::{CandidatePatch, CandidateStore, StoreError};

/// Failures surfaced by the pipeline workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {action} candidate {candidate_id} while at stage {stage}")]
    InvalidTransition {
        candidate_id: CandidateId,
        stage: Stage,
        action: WorkflowAction,
    },
    #[error("candidate store refused the update for {candidate_id}: {message}")]
    RemoteUpdateFailed {
        candidate_id: CandidateId,
        message: String,
    },
    #[error("failed to load candidates: {message}")]
    FetchFailed { message: String },
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub candidate: Candidate,
    pub record: TransitionRecord,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Validates an action against the locally known stage and commits it through the store.
///
/// Each call makes at most one store update and never retries; a second attempt is a new,
/// user-triggered call.
pub struct TransitionExecutor<S, L> {
    store: Arc<S>,
    log: Arc<L>,
    clock: Clock,
}

impl<S, L> Clone for TransitionExecutor<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            log: Arc::clone(&self.log),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, L> TransitionExecutor<S, L>
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    pub fn new(store: Arc<S>, log: Arc<L>) -> Self {
        Self {
            store,
            log,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// Synchronous legality check against the candidate's resolved stage.
    pub fn validate(
        candidate: &Candidate,
        action: WorkflowAction,
    ) -> Result<(Stage, ActionRule), WorkflowError> {
        let stage = resolve(candidate);
        let rule = action.rule();
        if rule.allows(stage) {
            Ok((stage, rule))
        } else {
            Err(WorkflowError::InvalidTransition {
                candidate_id: candidate.id.clone(),
                stage,
                action,
            })
        }
    }

    /// Load the candidate directly from the store, then apply the action.
    pub async fn apply(
        &self,
        candidate_id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let candidate = self
            .store
            .get(candidate_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => WorkflowError::CandidateNotFound(candidate_id.clone()),
                other => WorkflowError::FetchFailed {
                    message: other.message(),
                },
            })?;

        self.apply_to(&candidate, action, performer, note).await
    }

    /// Apply the action to the last locally known copy of the candidate.
    ///
    /// The store receives the origin stage this copy resolved to, so a record that moved on
    /// elsewhere comes back as [`WorkflowError::RemoteUpdateFailed`] instead of being
    /// overwritten.
    pub async fn apply_to(
        &self,
        candidate: &Candidate,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let (origin, rule) = Self::validate(candidate, action).map_err(|err| {
            info!(candidate = %candidate.id, %action, "rejected transition before commit");
            err
        })?;

        let at = (self.clock)();
        let patch = CandidatePatch {
            stage: rule.destination,
            status: rule.status.to_string(),
            updated_at: at,
            expected_stage: Some(origin),
        };

        let updated = match self.store.update(&candidate.id, patch).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(candidate = %candidate.id, %action, error = %err, "store refused transition");
                return Err(WorkflowError::RemoteUpdateFailed {
                    candidate_id: candidate.id.clone(),
                    message: err.message(),
                });
            }
        };

        let record = TransitionRecord {
            candidate_id: candidate.id.clone(),
            action,
            performer: performer.clone(),
            note: note.trim().to_string(),
            at,
            from_stage: origin,
            to_stage: rule.destination,
        };
        self.log.append(record.clone());

        info!(
            candidate = %candidate.id,
            %action,
            from = %origin,
            to = %rule.destination,
            performer = %performer,
            "transition committed"
        );

        Ok(TransitionOutcome {
            candidate: updated,
            record,
        })
    }
}
