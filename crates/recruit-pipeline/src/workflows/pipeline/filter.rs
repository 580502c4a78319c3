//! Stage and position scoped candidate lists shared by every dashboard screen.
//!
//! A [`CandidateView`] is bound to one screen. It fetches once per `refresh`, never polls,
//! keeps the last good item set when a fetch fails, and drops results that arrive after the
//! screen closed or after a newer refresh started.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::color;
use super::domain::{Candidate, CandidateId, PositionId, Stage};
use super::executor::WorkflowError;
use super::selection::SelectionContext;
use super::stage::resolve;
use super::store::{CandidateStore, StoreFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
    RecentlyUpdated,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "name" | "name_asc" => Some(Self::NameAsc),
            "name_desc" => Some(Self::NameDesc),
            "updated" | "recently_updated" => Some(Self::RecentlyUpdated),
            _ => None,
        }
    }

    fn compare(self, a: &Candidate, b: &Candidate) -> CmpOrdering {
        let primary = match self {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            SortKey::RecentlyUpdated => b.updated_at.cmp(&a.updated_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Filters a screen adds on top of its stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFilters {
    /// Overrides the selection context when set.
    pub position_id: Option<PositionId>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

/// Fully resolved filter for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub stage: Stage,
    pub position_id: Option<PositionId>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

impl FilterSpec {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            position_id: None,
            search: None,
            sort: None,
        }
    }

    pub fn store_filter(&self) -> StoreFilter {
        StoreFilter {
            stage: Some(self.stage),
            position_id: self.position_id.clone(),
        }
    }

    /// Stage and position scope, re-checked locally so a store that only matches raw fields
    /// cannot leak records from another stage.
    pub fn in_scope(&self, candidate: &Candidate) -> bool {
        resolve(candidate) == self.stage
            && self
                .position_id
                .as_ref()
                .map_or(true, |position| &candidate.position_id == position)
    }

    pub fn matches_search(&self, candidate: &Candidate) -> bool {
        let Some(needle) = normalized_search(self.search.as_deref()) else {
            return true;
        };

        let haystacks = [
            Some(candidate.name.as_str()),
            candidate.position_title.as_deref(),
            Some(candidate.position_id.0.as_str()),
        ];
        haystacks
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
    }

    /// Apply search and sort to an already scoped set.
    pub fn derive(&self, scoped: &[Candidate]) -> Vec<Candidate> {
        let mut items: Vec<Candidate> = scoped
            .iter()
            .filter(|candidate| self.matches_search(candidate))
            .cloned()
            .collect();
        if let Some(sort) = self.sort {
            items.sort_by(|a, b| sort.compare(a, b));
        }
        items
    }
}

fn normalized_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

/// Point-in-time copy of a view's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub items: Vec<Candidate>,
    pub loading: bool,
    pub error: Option<WorkflowError>,
}

#[derive(Debug)]
struct ViewState {
    spec: FilterSpec,
    scoped: Vec<Candidate>,
    items: Vec<Candidate>,
    loading: bool,
    error: Option<WorkflowError>,
}

#[derive(Debug)]
struct ViewShared {
    state: Mutex<ViewState>,
    generation: AtomicU64,
    closed: AtomicBool,
}

/// Refreshable candidate list bound to one screen.
///
/// Clones share state, so a handle can be given to the task doing the refresh while the
/// screen keeps reading snapshots.
pub struct CandidateView<S> {
    store: Arc<S>,
    shared: Arc<ViewShared>,
}

impl<S> Clone for CandidateView<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> CandidateView<S>
where
    S: CandidateStore + 'static,
{
    fn new(store: Arc<S>, spec: FilterSpec) -> Self {
        Self {
            store,
            shared: Arc::new(ViewShared {
                state: Mutex::new(ViewState {
                    spec,
                    scoped: Vec::new(),
                    items: Vec::new(),
                    loading: false,
                    error: None,
                }),
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn spec(&self) -> FilterSpec {
        self.state().spec.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state();
        ViewSnapshot {
            items: state.items.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn items(&self) -> Vec<Candidate> {
        self.state().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<WorkflowError> {
        self.state().error.clone()
    }

    /// Cached copy of a candidate in this view's scope, ignoring search.
    pub fn find(&self, id: &CandidateId) -> Option<Candidate> {
        self.state()
            .scoped
            .iter()
            .find(|candidate| &candidate.id == id)
            .cloned()
    }

    /// Re-derive items from the cached set; no fetch.
    pub fn set_search(&self, search: Option<String>) {
        let mut state = self.state();
        state.spec.search = search;
        state.items = state.spec.derive(&state.scoped);
    }

    /// Re-sort the cached set; no fetch.
    pub fn set_sort(&self, sort: Option<SortKey>) {
        let mut state = self.state();
        state.spec.sort = sort;
        state.items = state.spec.derive(&state.scoped);
    }

    /// Mark the owning screen as gone. In-flight and later refreshes leave state untouched.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Fetch the scoped set once.
    ///
    /// On failure the previous items stay visible and the error is recorded on the view as
    /// well as returned.
    pub async fn refresh(&self) -> Result<(), WorkflowError> {
        if self.is_closed() {
            debug!("refresh skipped for closed view");
            return Ok(());
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (filter, stage) = {
            let mut state = self.state();
            state.loading = true;
            (state.spec.store_filter(), state.spec.stage)
        };

        let result = self.store.list(&filter).await;

        if self.is_closed() || self.shared.generation.load(Ordering::Acquire) != generation {
            debug!(%stage, generation, "discarding superseded candidate fetch");
            return Ok(());
        }

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(records) => {
                let fetched = records.len();
                let scoped: Vec<Candidate> = records
                    .into_iter()
                    .filter(|candidate| state.spec.in_scope(candidate))
                    .collect();
                if scoped.len() != fetched {
                    debug!(
                        %stage,
                        dropped = fetched - scoped.len(),
                        "store returned records outside the requested scope"
                    );
                }
                state.items = state.spec.derive(&scoped);
                state.scoped = scoped;
                state.error = None;
                debug!(%stage, count = state.items.len(), "candidate view refreshed");
                Ok(())
            }
            Err(err) => {
                let error = WorkflowError::FetchFailed {
                    message: err.message(),
                };
                debug!(%stage, error = %error, "candidate fetch failed, keeping previous items");
                state.error = Some(error.clone());
                Err(error)
            }
        }
    }
}

/// Per-stage totals for dashboard tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

/// Builds views that merge a screen's filters with the shared position selection.
pub struct CandidateFilterService<S> {
    store: Arc<S>,
    selection: SelectionContext,
}

impl<S> Clone for CandidateFilterService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            selection: self.selection.clone(),
        }
    }
}

impl<S> CandidateFilterService<S>
where
    S: CandidateStore + 'static,
{
    pub fn new(store: Arc<S>, selection: SelectionContext) -> Self {
        Self { store, selection }
    }

    pub fn selection(&self) -> &SelectionContext {
        &self.selection
    }

    /// Resolve the filter spec, reading the selection context at call time.
    pub fn spec_for(&self, stage: Stage, extra: ExtraFilters) -> FilterSpec {
        FilterSpec {
            stage,
            position_id: extra.position_id.or_else(|| self.selection.get()),
            search: extra.search,
            sort: extra.sort,
        }
    }

    /// Unfetched view; the screen decides when to `refresh`.
    pub fn view(&self, stage: Stage, extra: ExtraFilters) -> CandidateView<S> {
        CandidateView::new(Arc::clone(&self.store), self.spec_for(stage, extra))
    }

    /// View with its first fetch done. A failed first fetch is recorded on the view.
    pub async fn query(&self, stage: Stage, extra: ExtraFilters) -> CandidateView<S> {
        let view = self.view(stage, extra);
        // the failure is kept on the view for the screen to render
        let _ = view.refresh().await;
        view
    }

    /// Totals per stage (zeros included) for the explicit or selected position.
    pub async fn stage_counts(
        &self,
        position_id: Option<PositionId>,
    ) -> Result<Vec<StageCount>, WorkflowError> {
        let filter = StoreFilter {
            stage: None,
            position_id: position_id.or_else(|| self.selection.get()),
        };
        let records = self
            .store
            .list(&filter)
            .await
            .map_err(|err| WorkflowError::FetchFailed {
                message: err.message(),
            })?;

        let mut counts = [0usize; Stage::COUNT];
        for candidate in records.iter().filter(|candidate| {
            filter
                .position_id
                .as_ref()
                .map_or(true, |position| &candidate.position_id == position)
        }) {
            counts[resolve(candidate).index()] += 1;
        }

        Ok(Stage::ordered()
            .into_iter()
            .map(|stage| StageCount {
                stage,
                label: stage.label(),
                color: color(stage),
                count: counts[stage.index()],
            })
            .collect())
    }
}
