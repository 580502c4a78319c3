use std::sync::Arc;

use super::common::*;
use crate::workflows::pipeline::domain::{CandidateId, PositionId, Stage};
use crate::workflows::pipeline::executor::WorkflowError;
use crate::workflows::pipeline::filter::{CandidateFilterService, ExtraFilters, FilterSpec, SortKey};
use crate::workflows::pipeline::selection::SelectionContext;
use crate::workflows::pipeline::store::StoreError;

fn for_position(position: &str) -> ExtraFilters {
    ExtraFilters {
        position_id: Some(PositionId(position.to_string())),
        ..ExtraFilters::default()
    }
}

#[tokio::test]
async fn screened_query_scoped_to_position_returns_legacy_and_canonical_records() {
    let (service, _, _) = build_service();

    let view = service.query(Stage::Screened, for_position("p1")).await;

    assert_eq!(ids(&view.items()), vec!["c4", "c6"]);
    assert!(!view.is_loading());
    assert!(view.error().is_none());
}

#[tokio::test]
async fn queries_do_not_influence_each_other() {
    let (service, _, _) = build_service();

    let applied_first = service.query(Stage::Applied, ExtraFilters::default()).await;
    let screened = service.query(Stage::Screened, for_position("p1")).await;
    let applied_again = service.query(Stage::Applied, ExtraFilters::default()).await;

    assert_eq!(ids(&applied_first.items()), vec!["c1", "c3"]);
    assert_eq!(applied_first.items(), applied_again.items());
    assert_eq!(ids(&screened.items()), vec!["c4", "c6"]);

    screened.refresh().await.expect("refresh succeeds");
    assert_eq!(ids(&screened.items()), vec!["c4", "c6"]);
}

#[tokio::test]
async fn records_outside_the_scope_are_dropped_even_if_the_store_returns_them() {
    let (service, store, _) =
        build_service_with(MockStore::unfiltered(roster()), MockDirectory::standard());

    let view = service.query(Stage::Screened, for_position("p1")).await;

    assert_eq!(ids(&view.items()), vec!["c4", "c6"]);
    assert_eq!(store.calls().0, 1);
}

#[tokio::test]
async fn search_is_case_insensitive_and_never_refetches() {
    let (service, store, _) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(store.calls().0, 1);

    view.set_search(Some("GRACE".to_string()));
    assert_eq!(ids(&view.items()), vec!["c3"]);

    view.set_search(Some("backend".to_string()));
    assert_eq!(ids(&view.items()), vec!["c1"]);

    view.set_search(Some("p2".to_string()));
    assert_eq!(ids(&view.items()), vec!["c3"]);

    view.set_search(Some("   ".to_string()));
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);

    view.set_search(Some("nobody".to_string()));
    assert!(view.items().is_empty());

    view.set_search(None);
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);
    assert_eq!(store.calls().0, 1);
}

#[tokio::test]
async fn sorting_reorders_the_cached_set() {
    let (service, store, _) = build_service();
    let view = service
        .query(
            Stage::Screened,
            ExtraFilters {
                sort: Some(SortKey::NameAsc),
                ..ExtraFilters::default()
            },
        )
        .await;

    assert_eq!(ids(&view.items()), vec!["c5", "c6", "c4"]);

    view.set_sort(Some(SortKey::NameDesc));
    assert_eq!(ids(&view.items()), vec!["c4", "c6", "c5"]);

    view.set_sort(Some(SortKey::Newest));
    assert_eq!(ids(&view.items()), vec!["c6", "c5", "c4"]);

    view.set_sort(Some(SortKey::Oldest));
    assert_eq!(ids(&view.items()), vec!["c4", "c5", "c6"]);

    assert_eq!(store.calls().0, 1);
}

#[test]
fn sort_keys_parse_from_query_strings() {
    assert_eq!(SortKey::parse("newest"), Some(SortKey::Newest));
    assert_eq!(SortKey::parse("Name"), Some(SortKey::NameAsc));
    assert_eq!(SortKey::parse("name-desc"), Some(SortKey::NameDesc));
    assert_eq!(
        SortKey::parse("recently_updated"),
        Some(SortKey::RecentlyUpdated)
    );
    assert_eq!(SortKey::parse("updated"), Some(SortKey::RecentlyUpdated));
    assert_eq!(SortKey::parse("random"), None);
}

#[test]
fn filter_spec_search_covers_name_title_and_position() {
    let mut spec = FilterSpec::new(Stage::Applied);
    let ada = roster().remove(0);

    spec.search = Some("lovelace".to_string());
    assert!(spec.matches_search(&ada));
    spec.search = Some("ENGINEER".to_string());
    assert!(spec.matches_search(&ada));
    spec.search = Some("analyst".to_string());
    assert!(!spec.matches_search(&ada));
    spec.search = None;
    assert!(spec.matches_search(&ada));
}

#[tokio::test]
async fn failed_fetch_keeps_previous_items_and_records_the_error() {
    let (service, store, _) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);

    store.fail_list_with(Some(StoreError::Unavailable("gateway timeout".to_string())));
    let error = view.refresh().await.expect_err("fetch fails");

    assert!(matches!(error, WorkflowError::FetchFailed { .. }));
    let snapshot = view.snapshot();
    assert_eq!(ids(&snapshot.items), vec!["c1", "c3"]);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, Some(error));

    store.fail_list_with(None);
    view.refresh().await.expect("fetch recovers");
    assert!(view.error().is_none());
}

#[tokio::test]
async fn failed_first_fetch_is_reported_on_the_view() {
    let store = MockStore::with(roster());
    store.fail_list_with(Some(StoreError::Unavailable("dns failure".to_string())));
    let (service, _, _) = build_service_with(store, MockDirectory::standard());

    let view = service.query(Stage::Applied, ExtraFilters::default()).await;

    assert!(view.items().is_empty());
    match view.error() {
        Some(WorkflowError::FetchFailed { message }) => assert!(message.contains("dns failure")),
        other => panic!("expected fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn selection_is_read_at_query_time_and_does_not_trigger_fetches() {
    let (service, store, _) = build_service();

    service.selection().set(Some(PositionId("p2".to_string())));
    assert_eq!(store.calls().0, 0);

    let scoped = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(ids(&scoped.items()), vec!["c3"]);
    assert_eq!(
        scoped.spec().position_id,
        Some(PositionId("p2".to_string()))
    );

    service.selection().set(Some(PositionId("p1".to_string())));
    assert_eq!(store.calls().0, 1);
    assert_eq!(ids(&scoped.items()), vec!["c3"]);

    let requeried = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(ids(&requeried.items()), vec!["c1"]);

    let explicit = service.query(Stage::Applied, for_position("p2")).await;
    assert_eq!(ids(&explicit.items()), vec!["c3"]);

    service.selection().clear();
    let everything = service.query(Stage::Applied, ExtraFilters::default()).await;
    assert_eq!(ids(&everything.items()), vec!["c1", "c3"]);
}

#[tokio::test]
async fn results_arriving_after_close_are_discarded() {
    let store = Arc::new(GatedStore::new(vec![vec![candidate(
        "c1",
        "Ada Lovelace",
        "p1",
        Stage::Applied,
        1,
    )]]));
    let filters = CandidateFilterService::new(Arc::clone(&store), SelectionContext::new());
    let view = filters.view(Stage::Applied, ExtraFilters::default());

    let in_flight = tokio::spawn({
        let view = view.clone();
        async move { view.refresh().await }
    });
    store.requested.notified().await;
    assert!(view.is_loading());

    view.close();
    store.release();
    in_flight
        .await
        .expect("refresh task joins")
        .expect("discarded refresh is not an error");

    assert!(view.is_closed());
    assert!(view.items().is_empty());

    view.refresh()
        .await
        .expect("refresh on closed view is a no-op");
    assert!(view.items().is_empty());
}

#[tokio::test]
async fn superseded_refresh_cannot_overwrite_newer_results() {
    let stale = vec![candidate("c1", "Ada Lovelace", "p1", Stage::Applied, 1)];
    let fresh = vec![
        candidate("c1", "Ada Lovelace", "p1", Stage::Applied, 1),
        candidate("c3", "Grace Hopper", "p2", Stage::Applied, 3),
    ];
    let store = Arc::new(GatedStore::new(vec![stale, fresh]));
    let filters = CandidateFilterService::new(Arc::clone(&store), SelectionContext::new());
    let view = filters.view(Stage::Applied, ExtraFilters::default());

    let slow = tokio::spawn({
        let view = view.clone();
        async move { view.refresh().await }
    });
    store.requested.notified().await;

    view.refresh().await.expect("second refresh succeeds");
    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);

    store.release();
    let superseded = slow.await.expect("refresh task joins");
    superseded.expect("superseded refresh is not an error");

    assert_eq!(ids(&view.items()), vec!["c1", "c3"]);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn stage_counts_cover_every_stage() {
    let (service, _, _) = build_service();

    let counts = service.stage_counts(None).await.expect("counts load");
    assert_eq!(counts.len(), Stage::COUNT);
    let count_of = |stage: Stage| {
        counts
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .expect("stage present")
    };
    assert_eq!(count_of(Stage::Applied), 2);
    assert_eq!(count_of(Stage::Screened), 3);
    assert_eq!(count_of(Stage::Shortlisted), 1);
    assert_eq!(count_of(Stage::Interviewing), 0);
    assert_eq!(count_of(Stage::Hired), 1);
    assert_eq!(count_of(Stage::Rejected), 1);
    assert_eq!(counts[0].label, Stage::Applied.label());

    let scoped = service
        .stage_counts(Some(PositionId("p2".to_string())))
        .await
        .expect("counts load");
    let total: usize = scoped.iter().map(|entry| entry.count).sum();
    assert_eq!(total, 2);

    service.selection().set(Some(PositionId("p1".to_string())));
    let selected = service.stage_counts(None).await.expect("counts load");
    let total: usize = selected.iter().map(|entry| entry.count).sum();
    assert_eq!(total, 6);
}

#[tokio::test]
async fn stage_counts_surface_fetch_failures() {
    let (service, store, _) = build_service();
    store.fail_list_with(Some(StoreError::Unavailable("down".to_string())));

    let error = service.stage_counts(None).await.expect_err("fetch fails");
    assert!(matches!(error, WorkflowError::FetchFailed { .. }));
}

#[tokio::test]
async fn find_uses_the_scoped_cache_and_ignores_search() {
    let (service, _, _) = build_service();
    let view = service.query(Stage::Applied, ExtraFilters::default()).await;

    view.set_search(Some("grace".to_string()));

    assert!(view.find(&CandidateId("c1".to_string())).is_some());
    assert!(view.find(&CandidateId("c2".to_string())).is_none());
}
