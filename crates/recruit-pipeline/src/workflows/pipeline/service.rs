use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use super::audit::TransitionLog;
use super::catalog::WorkflowAction;
use super::domain::{
    Candidate, CandidateId, PerformerId, Position, PositionId, Stage, TransitionRecord,
};
use super::executor::{TransitionExecutor, TransitionOutcome, WorkflowError};
use super::filter::{CandidateFilterService, CandidateView, ExtraFilters, StageCount};
use super::selection::{choices, SelectionContext};
use super::stage::resolve;
use super::store::{ActionPerformer, ActionReceipt, CandidateStore, PositionDirectory, StoreError};

/// Service composing the executor, filter service, selection context and directory.
pub struct PipelineService<S, L> {
    store: Arc<S>,
    executor: TransitionExecutor<S, L>,
    filters: CandidateFilterService<S>,
    directory: Arc<dyn PositionDirectory>,
}

impl<S, L> PipelineService<S, L>
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    pub fn new(
        store: Arc<S>,
        log: Arc<L>,
        directory: Arc<dyn PositionDirectory>,
        selection: SelectionContext,
    ) -> Self {
        let executor = TransitionExecutor::new(Arc::clone(&store), log);
        let filters = CandidateFilterService::new(Arc::clone(&store), selection);
        Self {
            store,
            executor,
            filters,
            directory,
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.executor = self.executor.with_clock(clock);
        self
    }

    pub fn executor(&self) -> &TransitionExecutor<S, L> {
        &self.executor
    }

    pub fn filters(&self) -> &CandidateFilterService<S> {
        &self.filters
    }

    pub fn selection(&self) -> &SelectionContext {
        self.filters.selection()
    }

    /// Stage-scoped list with its first fetch done.
    pub async fn query(&self, stage: Stage, extra: ExtraFilters) -> CandidateView<S> {
        self.filters.query(stage, extra).await
    }

    pub async fn stage_counts(
        &self,
        position_id: Option<PositionId>,
    ) -> Result<Vec<StageCount>, WorkflowError> {
        self.filters.stage_counts(position_id).await
    }

    pub async fn candidate(&self, id: &CandidateId) -> Result<Candidate, WorkflowError> {
        self.store.get(id).await.map_err(|err| match err {
            StoreError::NotFound => WorkflowError::CandidateNotFound(id.clone()),
            other => WorkflowError::FetchFailed {
                message: other.message(),
            },
        })
    }

    /// Direct-load transition, used when no screen cache is involved.
    pub async fn transition(
        &self,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.executor.apply(id, action, performer, note).await
    }

    /// Apply an action from a screen, then refresh that screen.
    ///
    /// Validation uses the screen's cached copy when it has one. The view is only refreshed
    /// after the store confirmed the transition; a failed refresh keeps the stale list and
    /// does not undo the committed transition.
    pub async fn perform(
        &self,
        view: &CandidateView<S>,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let outcome = match view.find(id) {
            Some(cached) => {
                self.executor
                    .apply_to(&cached, action, performer, note)
                    .await?
            }
            None => self.executor.apply(id, action, performer, note).await?,
        };

        if let Err(err) = view.refresh().await {
            warn!(candidate = %id, error = %err, "view refresh after transition failed");
        }

        Ok(outcome)
    }

    pub fn history(&self, id: &CandidateId) -> Vec<TransitionRecord> {
        self.executor.log().for_candidate(id)
    }

    pub async fn positions(&self) -> Result<Vec<Position>, PipelineServiceError> {
        Ok(choices(self.directory.as_ref()).await?)
    }

    /// Replace the active position after checking it exists in the directory.
    pub async fn select_position(
        &self,
        position_id: Option<PositionId>,
    ) -> Result<Option<Position>, PipelineServiceError> {
        let Some(position_id) = position_id else {
            self.selection().clear();
            return Ok(None);
        };

        let position = self
            .positions()
            .await?
            .into_iter()
            .find(|position| position.id == position_id)
            .ok_or_else(|| PipelineServiceError::UnknownPosition(position_id.clone()))?;

        self.selection().set(Some(position_id));
        Ok(Some(position))
    }
}

#[async_trait]
impl<S, L> ActionPerformer for PipelineService<S, L>
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    async fn perform_action(
        &self,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<ActionReceipt, StoreError> {
        match self.transition(id, action, performer, note).await {
            Ok(outcome) => Ok(ActionReceipt {
                message: receipt_message(&outcome.candidate),
                candidate: outcome.candidate,
            }),
            Err(WorkflowError::CandidateNotFound(_)) => Err(StoreError::NotFound),
            Err(WorkflowError::FetchFailed { message }) => Err(StoreError::Unavailable(message)),
            Err(rejected) => Err(StoreError::Rejected {
                message: rejected.to_string(),
            }),
        }
    }
}

pub fn receipt_message(candidate: &Candidate) -> String {
    format!("{} moved to {}", candidate.name, resolve(candidate).label())
}

/// Error raised by the pipeline service outside the transition path.
#[derive(Debug, thiserror::Error)]
pub enum PipelineServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("position {0} is not in the directory")]
    UnknownPosition(PositionId),
}
