//! Candidate pipeline: stage resolution, the action catalog, transition execution, and the
//! stage/position scoped candidate views dashboard screens are built on.

pub mod audit;
pub mod catalog;
pub mod domain;
pub mod executor;
pub mod filter;
pub mod remote;
pub mod router;
pub mod selection;
pub mod service;
pub mod stage;
pub mod store;

#[cfg(test)]
mod tests;

pub use audit::{InMemoryTransitionLog, TransitionLog};
pub use catalog::{
    available_actions, available_actions_for, color, label, ActionRule, UnknownAction,
    WorkflowAction,
};
pub use domain::{
    Candidate, CandidateId, PerformerId, Position, PositionId, Stage, TransitionRecord,
};
pub use executor::{TransitionExecutor, TransitionOutcome, WorkflowError};
pub use filter::{
    CandidateFilterService, CandidateView, ExtraFilters, FilterSpec, SortKey, StageCount,
    ViewSnapshot,
};
pub use remote::HttpCandidateStore;
pub use router::{pipeline_router, ActionView, CandidateCard};
pub use selection::SelectionContext;
pub use service::{PipelineService, PipelineServiceError};
pub use stage::{resolve, resolve_status};
pub use store::{
    ActionPerformer, ActionReceipt, CandidatePatch, CandidateStore, PositionDirectory,
    StoreError, StoreFilter,
};
