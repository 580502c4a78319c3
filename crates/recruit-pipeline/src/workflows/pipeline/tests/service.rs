use super::common::*;
use crate::workflows::pipeline::catalog::WorkflowAction;
use crate::workflows::pipeline::domain::{CandidateId, PerformerId, PositionId, Stage};
use crate::workflows::pipeline::executor::WorkflowError;
use crate::workflows::pipeline::filter::ExtraFilters;
use crate::workflows::pipeline::service::PipelineServiceError;
use crate::workflows::pipeline::stage::resolve;
use crate::workflows::pipeline::store::{ActionPerformer, StoreError};

fn id(raw: &str) -> CandidateId {
    CandidateId(raw.to_string())
}

fn reviewer() -> PerformerId {
    PerformerId("reviewer-7".to_string())
}

#[tokio::test]
async fn perform_uses_the_cached_copy_then_refreshes_the_screen() {
    let (service, store, log) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);

    let outcome = service
        .perform(&view, &id("c1"), WorkflowAction::Shortlist, &reviewer(), "")
        .await
        .expect("shortlist succeeds");

    assert_eq!(resolve(&outcome.candidate), Stage::Shortlisted);
    assert_eq!(ids(&view.items()), vec!["c3"]);
    assert_eq!(store.calls(), (2, 0, 1));
    assert_eq!(log.len(), 1);

    let shortlisted = service
        .query(Stage::Shortlisted, ExtraFilters::default())
        .await;
    assert_eq!(ids(&shortlisted.items()), vec!["c1", "c2"]);
}

#[tokio::test]
async fn perform_loads_candidates_missing_from_the_screen() {
    let (service, store, _) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;

    service
        .perform(
            &view,
            &id("c2"),
            WorkflowAction::ScheduleInterview,
            &reviewer(),
            "",
        )
        .await
        .expect("interview scheduled");

    assert_eq!(store.calls(), (2, 1, 1));
    assert_eq!(resolve(&store.record("c2")), Stage::Interviewing);
}

#[tokio::test]
async fn rejected_action_leaves_the_screen_untouched() {
    let (service, store, log) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;

    let error = service
        .perform(&view, &id("c3"), WorkflowAction::Hire, &reviewer(), "")
        .await
        .expect_err("hire is not legal from applied");

    assert!(matches!(error, WorkflowError::InvalidTransition { .. }));
    assert_eq!(store.calls(), (1, 0, 0));
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);
    assert!(log.is_empty());
}

#[tokio::test]
async fn failed_refresh_after_commit_keeps_the_transition() {
    let (service, store, log) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;
    store.fail_list_with(Some(StoreError::Unavailable("list timed out".to_string())));

    let outcome = service
        .perform(
            &view,
            &id("c1"),
            WorkflowAction::Reject,
            &reviewer(),
            "not a fit",
        )
        .await
        .expect("transition committed");

    assert_eq!(resolve(&outcome.candidate), Stage::Rejected);
    assert_eq!(log.len(), 1);
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);
    assert!(matches!(
        view.error(),
        Some(WorkflowError::FetchFailed { .. })
    ));
}

#[tokio::test]
async fn history_lists_transitions_in_commit_order() {
    let (service, _, _) = build_service();

    service
        .transition(&id("c1"), WorkflowAction::StartScreening, &reviewer(), "")
        .await
        .expect("screening starts");
    service
        .transition(&id("c1"), WorkflowAction::Shortlist, &reviewer(), "")
        .await
        .expect("shortlisted");
    service
        .transition(&id("c3"), WorkflowAction::Reject, &reviewer(), "")
        .await
        .expect("rejected");

    let history = service.history(&id("c1"));
    let actions: Vec<WorkflowAction> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![WorkflowAction::StartScreening, WorkflowAction::Shortlist]
    );
    assert!(service.history(&id("c5")).is_empty());
}

#[tokio::test]
async fn candidate_lookup_maps_missing_records() {
    let (service, _, _) = build_service();

    let found = service.candidate(&id("c6")).await.expect("c6 exists");
    assert_eq!(resolve(&found), Stage::Screened);

    let missing = service.candidate(&id("c404")).await.expect_err("absent");
    assert_eq!(missing, WorkflowError::CandidateNotFound(id("c404")));
}

#[tokio::test]
async fn selecting_a_known_position_updates_the_shared_context() {
    let (service, store, _) = build_service();

    let position = service
        .select_position(Some(PositionId("p1".to_string())))
        .await
        .expect("p1 is listed")
        .expect("position returned");

    assert_eq!(position.title, "Backend Engineer");
    assert_eq!(
        service.selection().get(),
        Some(PositionId("p1".to_string()))
    );
    assert_eq!(store.calls().0, 0);

    let cleared = service.select_position(None).await.expect("clearing works");
    assert!(cleared.is_none());
    assert_eq!(service.selection().get(), None);
}

#[tokio::test]
async fn selecting_an_unknown_position_is_refused() {
    let (service, _, _) = build_service();
    service.selection().set(Some(PositionId("p2".to_string())));

    let error = service
        .select_position(Some(PositionId("p9".to_string())))
        .await
        .expect_err("p9 is not listed");

    assert!(matches!(
        error,
        PipelineServiceError::UnknownPosition(ref position) if position.0 == "p9"
    ));
    assert_eq!(
        service.selection().get(),
        Some(PositionId("p2".to_string()))
    );
}

#[tokio::test]
async fn offline_directory_surfaces_a_store_error() {
    let (service, _, _) = build_service_with(
        MockStore::with(roster()),
        MockDirectory {
            offline: true,
            ..MockDirectory::standard()
        },
    );

    let error = service
        .select_position(Some(PositionId("p1".to_string())))
        .await
        .expect_err("directory unavailable");

    assert!(matches!(
        error,
        PipelineServiceError::Store(StoreError::Unavailable(_))
    ));
    assert_eq!(service.selection().get(), None);
}

#[tokio::test]
async fn action_performer_returns_a_receipt() {
    let (service, _, _) = build_service();

    let receipt = service
        .perform_action(&id("c1"), WorkflowAction::Shortlist, &reviewer(), "")
        .await
        .expect("action accepted");

    assert_eq!(
        receipt.message,
        format!("Ada Lovelace moved to {}", Stage::Shortlisted.label())
    );
    assert_eq!(resolve(&receipt.candidate), Stage::Shortlisted);

    let refused = service
        .perform_action(&id("c7"), WorkflowAction::Reject, &reviewer(), "")
        .await
        .expect_err("hired is terminal");
    assert!(matches!(refused, StoreError::Rejected { .. }));

    let missing = service
        .perform_action(&id("c404"), WorkflowAction::Reject, &reviewer(), "")
        .await
        .expect_err("absent");
    assert_eq!(missing, StoreError::NotFound);
}
