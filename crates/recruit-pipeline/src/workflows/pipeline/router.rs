use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit::TransitionLog;
use super::catalog::{available_actions, color, WorkflowAction};
use super::domain::{
    Candidate, CandidateId, PerformerId, Position, PositionId, Stage, TransitionRecord,
};
use super::executor::{TransitionOutcome, WorkflowError};
use super::filter::{ExtraFilters, SortKey};
use super::service::{receipt_message, PipelineService, PipelineServiceError};
use super::stage::resolve;
use super::store::CandidateStore;

/// Router builder exposing the pipeline over HTTP.
pub fn pipeline_router<S, L>(service: Arc<PipelineService<S, L>>) -> Router
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    Router::new()
        .route("/api/v1/candidates", get(list_handler::<S, L>))
        .route(
            "/api/v1/candidates/:candidate_id",
            get(candidate_handler::<S, L>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/actions/:action",
            post(action_handler::<S, L>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/transitions",
            get(history_handler::<S, L>),
        )
        .route("/api/v1/stages", get(catalog_handler))
        .route("/api/v1/stages/summary", get(summary_handler::<S, L>))
        .route(
            "/api/v1/selection",
            get(selection_handler::<S, L>).put(select_handler::<S, L>),
        )
        .route("/api/v1/positions", get(positions_handler::<S, L>))
        .with_state(service)
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub action: WorkflowAction,
    pub label: &'static str,
    pub destination: Stage,
}

impl ActionView {
    fn from_action(action: WorkflowAction) -> Self {
        Self {
            action,
            label: action.label(),
            destination: action.rule().destination,
        }
    }

    fn for_stage(stage: Stage) -> Vec<Self> {
        available_actions(stage)
            .iter()
            .copied()
            .map(Self::from_action)
            .collect()
    }
}

/// Candidate as rendered on a dashboard card: the raw record plus its resolved stage and
/// the buttons to show.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateCard {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(rename = "resolvedStage")]
    pub resolved_stage: Stage,
    #[serde(rename = "stageLabel")]
    pub stage_label: &'static str,
    #[serde(rename = "stageColor")]
    pub stage_color: &'static str,
    pub actions: Vec<ActionView>,
}

impl From<Candidate> for CandidateCard {
    fn from(candidate: Candidate) -> Self {
        let stage = resolve(&candidate);
        Self {
            candidate,
            resolved_stage: stage,
            stage_label: stage.label(),
            stage_color: color(stage),
            actions: ActionView::for_stage(stage),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    stage: String,
    #[serde(default, rename = "positionId", alias = "position_id")]
    position_id: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryParams {
    #[serde(default, rename = "positionId", alias = "position_id")]
    position_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionRequest {
    #[serde(rename = "performerId", alias = "performer_id")]
    performer_id: PerformerId,
    #[serde(default)]
    note: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    #[serde(default, rename = "positionId", alias = "position_id")]
    position_id: Option<PositionId>,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    message: String,
    candidate: CandidateCard,
    transition: TransitionRecord,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn workflow_error_response(error: WorkflowError) -> Response {
    match &error {
        WorkflowError::InvalidTransition { stage, .. } => {
            let payload = json!({
                "error": error.to_string(),
                "stage": stage,
                "availableActions": ActionView::for_stage(*stage),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        WorkflowError::RemoteUpdateFailed { .. } => {
            error_response(StatusCode::CONFLICT, error.to_string())
        }
        WorkflowError::CandidateNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        WorkflowError::FetchFailed { .. } => {
            error_response(StatusCode::BAD_GATEWAY, error.to_string())
        }
    }
}

pub(crate) async fn list_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    Query(params): Query<ListParams>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let Some(stage) = Stage::parse(&params.stage) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unknown stage '{}'", params.stage),
        );
    };

    let sort = match non_empty(params.sort) {
        Some(raw) => match SortKey::parse(&raw) {
            Some(sort) => Some(sort),
            None => {
                return error_response(StatusCode::BAD_REQUEST, format!("unknown sort '{raw}'"))
            }
        },
        None => None,
    };

    let extra = ExtraFilters {
        position_id: non_empty(params.position_id).map(PositionId),
        search: non_empty(params.q),
        sort,
    };

    let view = service.query(stage, extra).await;
    let spec = view.spec();
    let snapshot = view.snapshot();
    view.close();

    if let Some(error) = snapshot.error {
        return workflow_error_response(error);
    }

    let items: Vec<CandidateCard> = snapshot
        .items
        .into_iter()
        .map(CandidateCard::from)
        .collect();
    let payload = json!({
        "stage": stage,
        "positionId": spec.position_id,
        "count": items.len(),
        "items": items,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn candidate_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    match service.candidate(&CandidateId(candidate_id)).await {
        Ok(candidate) => {
            let card = CandidateCard::from(candidate);
            (StatusCode::OK, axum::Json(card)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn action_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    Path((candidate_id, action)): Path<(String, String)>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let Some(action) = WorkflowAction::parse(&action) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unknown workflow action '{action}'"),
        );
    };

    let id = CandidateId(candidate_id);
    match service
        .transition(&id, action, &request.performer_id, &request.note)
        .await
    {
        Ok(TransitionOutcome { candidate, record }) => {
            let body = ActionResponse {
                message: receipt_message(&candidate),
                candidate: CandidateCard::from(candidate),
                transition: record,
            };
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn history_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let id = CandidateId(candidate_id);
    let history = service.history(&id);
    let payload = json!({ "candidateId": id, "transitions": history });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn catalog_handler() -> Response {
    let stages: Vec<_> = Stage::ordered()
        .into_iter()
        .map(|stage| {
            json!({
                "stage": stage,
                "label": stage.label(),
                "color": color(stage),
                "terminal": stage.is_terminal(),
                "actions": ActionView::for_stage(stage),
            })
        })
        .collect();
    (StatusCode::OK, axum::Json(json!({ "stages": stages }))).into_response()
}

pub(crate) async fn summary_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    Query(params): Query<SummaryParams>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let position = non_empty(params.position_id).map(PositionId);
    match service.stage_counts(position).await {
        Ok(counts) => (StatusCode::OK, axum::Json(json!({ "stages": counts }))).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn selection_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let payload = json!({ "positionId": service.selection().get() });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn select_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
    axum::Json(request): axum::Json<SelectionRequest>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    let requested = request
        .position_id
        .filter(|position| !position.0.trim().is_empty());

    match service.select_position(requested).await {
        Ok(position) => {
            let payload = json!({
                "positionId": position.as_ref().map(|entry: &Position| entry.id.clone()),
                "position": position,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(PipelineServiceError::UnknownPosition(id)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("position {id} is not in the directory"),
        ),
        Err(other) => error_response(StatusCode::BAD_GATEWAY, other.to_string()),
    }
}

pub(crate) async fn positions_handler<S, L>(
    State(service): State<Arc<PipelineService<S, L>>>,
) -> Response
where
    S: CandidateStore + 'static,
    L: TransitionLog + 'static,
{
    match service.positions().await {
        Ok(positions) => {
            let payload = json!({
                "selected": service.selection().get(),
                "positions": positions,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(StatusCode::BAD_GATEWAY, error.to_string()),
    }
}
