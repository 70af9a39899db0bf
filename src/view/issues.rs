//! The issue list / board view.
//!
//! Data flow: a page fetch seeds the canonical collection, stream events and
//! optimistic moves mutate it, and every mutation re-derives the matched list
//! and the three board columns.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::IssueApi;
use crate::error::{Error, Result};
use crate::model::{Issue, IssueStatus};
use crate::stream::{ConnectionKey, EventTransport, SseEndpoints, StreamRegistry};

use super::collection::{Applied, Change, ReconciliationEngine};
use super::materialize::{FilterCriteria, Materialized, SortCriteria, materialize};
use super::optimistic::{MutationTicket, OptimisticCoordinator, Resolution};
use super::pagination::{PageState, PaginationController};
use super::{Delivery, Subscription};

/// Shown when a page fetch fails without a server message.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load issues";

/// A live, paginated, filtered view of issues.
pub struct IssueView<A: IssueApi, T: EventTransport> {
    api: Arc<A>,
    registry: StreamRegistry<T>,
    endpoints: SseEndpoints,
    engine: ReconciliationEngine<Issue>,
    pagination: PaginationController,
    optimistic: OptimisticCoordinator,
    subscription: Option<Subscription>,
    materialized: Materialized,
    error: Option<String>,
    loading: bool,
    active: bool,
}

impl<A: IssueApi, T: EventTransport> IssueView<A, T> {
    /// Create an inactive view. The registry is owned by the view and all of
    /// its connections close when the view is torn down or dropped.
    pub fn new(
        api: Arc<A>,
        registry: StreamRegistry<T>,
        endpoints: SseEndpoints,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            registry,
            endpoints,
            engine: ReconciliationEngine::new(),
            pagination: PaginationController::new(page_size),
            optimistic: OptimisticCoordinator::new(),
            subscription: None,
            materialized: Materialized::default(),
            error: None,
            loading: false,
            active: false,
        }
    }

    /// Start with the given criteria instead of the defaults.
    #[must_use]
    pub fn with_criteria(mut self, filter: FilterCriteria, sort: SortCriteria, page: u32) -> Self {
        self.pagination.set_filter(filter);
        self.pagination.set_sort(sort);
        self.pagination.start_at(page);
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Fetch the first page, then subscribe to the matching stream.
    ///
    /// # Errors
    ///
    /// Returns the fetch error (also kept as the view's error state) or
    /// `AuthMissing` when no credential is available for the stream.
    pub async fn activate(&mut self) -> Result<()> {
        self.active = true;
        self.reload().await?;
        self.subscribe()
    }

    /// Fetch once without opening a stream.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn load_once(&mut self) -> Result<()> {
        self.active = true;
        self.reload().await
    }

    /// Close every stream and drop all state. Late results are ignored.
    pub fn teardown(&mut self) {
        self.active = false;
        self.subscription = None;
        self.registry.close_all();
        self.engine.clear();
        self.optimistic.clear();
        self.materialized = Materialized::default();
        debug!("Issue view torn down");
    }

    /// Refetch the current page and replace the collection with it.
    ///
    /// On failure the collection keeps its previous contents.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn reload(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        self.loading = true;
        let request = self.pagination.request();
        let api = Arc::clone(&self.api);
        let result = api.list_issues(&request).await;
        self.loading = false;

        if !self.active {
            debug!("Discarding page fetched after teardown");
            return Ok(());
        }

        match result {
            Ok(page) => {
                self.pagination.apply_response(&page);
                self.engine.seed(page.content);
                self.error = None;
                self.rederive();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load issues");
                self.error = Some(err.user_message(LOAD_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    /// Subscribe to the stream for the current project filter, superseding a
    /// subscription for a different scope.
    fn subscribe(&mut self) -> Result<()> {
        let (key, url) = self
            .endpoints
            .issues(self.pagination.filter().project_id.as_deref());

        if self.subscription.as_ref().is_some_and(|s| *s.key() == key) {
            return Ok(());
        }
        if let Some(old) = self.subscription.take() {
            self.registry.close(old.key());
        }

        let channel = self.registry.open(key, &url)?;
        self.subscription = Some(Subscription::new(channel));
        Ok(())
    }

    // ── Stream ────────────────────────────────────────────────

    /// Wait for the next stream item and apply it.
    ///
    /// Returns `Some(Ok(true))` when the display state (including the error
    /// state) changed, `Some(Ok(false))` for items with no visible effect,
    /// `Some(Err(_))` once when the stream fails, and `None` when there is no
    /// open stream. A failed resync fetch is not a stream failure: it sets
    /// [`Self::error`] and keeps the subscription.
    pub async fn pump(&mut self) -> Option<Result<bool>> {
        let item = self.subscription.as_mut()?.next().await;
        match item {
            None => {
                self.subscription = None;
                None
            }
            Some(Err(err)) => {
                self.subscription = None;
                self.error = Some(err.to_string());
                Some(Err(err))
            }
            Some(Ok(Delivery::Handshake | Delivery::Project(_))) => Some(Ok(false)),
            Some(Ok(Delivery::Resync)) => {
                // A failed refetch is kept as the view's error; the stream stays up
                if let Err(err) = self.reload().await {
                    debug!(error = %err, "Resync fetch failed, keeping previous issues");
                }
                Some(Ok(true))
            }
            Some(Ok(Delivery::Issue(change))) => Some(Ok(self.apply_change(change))),
        }
    }

    /// Apply one issue change and re-derive. Returns whether anything was applied.
    pub fn apply_change(&mut self, change: Change<Issue>) -> bool {
        if !self.active {
            return false;
        }

        let filter = self.pagination.filter().clone();
        let incoming_matches = match change {
            Change::Created(ref issue) | Change::Updated(ref issue) => filter.matches(issue),
            Change::Deleted { .. } => false,
        };

        debug!(id = change.id(), "Applying issue change");
        match self.engine.apply(change) {
            Applied::Inserted if incoming_matches => self.pagination.nudge_created(),
            Applied::Removed(ref previous) if filter.matches(previous) => {
                self.pagination.nudge_deleted();
            }
            _ => {}
        }

        self.rederive();
        true
    }

    // ── Criteria & paging ─────────────────────────────────────

    /// Replace the filter; a change resets to page 0, refetches and, if the
    /// project scope changed, re-subscribes.
    ///
    /// # Errors
    ///
    /// Returns the fetch or subscribe error.
    pub async fn set_filter(&mut self, filter: FilterCriteria) -> Result<bool> {
        if !self.pagination.set_filter(filter) {
            return Ok(false);
        }
        self.rederive();
        if self.active {
            if self.subscription.is_some() {
                self.subscribe()?;
            }
            self.reload().await?;
        }
        Ok(true)
    }

    /// Reset every filter criterion.
    ///
    /// # Errors
    ///
    /// Returns the fetch or subscribe error.
    pub async fn clear_filters(&mut self) -> Result<bool> {
        self.set_filter(FilterCriteria::default()).await
    }

    /// Replace the sort; a change resets to page 0 and refetches.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_sort(&mut self, sort: SortCriteria) -> Result<bool> {
        if !self.pagination.set_sort(sort) {
            return Ok(false);
        }
        self.rederive();
        self.reload().await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn next_page(&mut self) -> Result<bool> {
        if !self.pagination.next() {
            return Ok(false);
        }
        self.reload().await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn previous_page(&mut self) -> Result<bool> {
        if !self.pagination.previous() {
            return Ok(false);
        }
        self.reload().await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn go_to_page(&mut self, page: u32) -> Result<bool> {
        if !self.pagination.go_to(page) {
            return Ok(false);
        }
        self.reload().await?;
        Ok(true)
    }

    // ── Optimistic moves ──────────────────────────────────────

    /// Move an issue to a new status locally, before the server confirms.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue is not loaded, or an error if the
    /// view is not active.
    pub fn begin_move(&mut self, issue_id: &str, status: IssueStatus) -> Result<MutationTicket> {
        if !self.active {
            return Err(Error::Other("issue view is not active".to_string()));
        }
        let ticket = self.optimistic.begin(&mut self.engine, issue_id, status)?;
        self.rederive();
        Ok(ticket)
    }

    /// Resolve a move with the server's answer. A failure refetches the
    /// current page and leaves the failure message as the view's error.
    ///
    /// # Errors
    ///
    /// Only errors from the rollback refetch are returned; the mutation
    /// failure itself is reported through [`Resolution::Refetch`].
    pub async fn finish_move(
        &mut self,
        ticket: &MutationTicket,
        outcome: Result<Issue>,
    ) -> Result<Resolution> {
        if !self.active {
            debug!(mutation_id = %ticket.mutation_id, "Discarding mutation result after teardown");
            return Ok(Resolution::Stale);
        }

        let resolution = self.optimistic.resolve(&mut self.engine, ticket, outcome);
        self.optimistic.prune();

        match resolution {
            Resolution::Committed => self.rederive(),
            Resolution::Refetch { ref message } => {
                let reloaded = self.reload().await;
                self.error = Some(message.clone());
                reloaded?;
            }
            Resolution::Stale => {}
        }
        Ok(resolution)
    }

    /// Optimistically move an issue and send the update.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_move`] and [`Self::finish_move`].
    pub async fn move_issue(&mut self, issue_id: &str, status: IssueStatus) -> Result<Resolution> {
        let ticket = self.begin_move(issue_id, status)?;
        let api = Arc::clone(&self.api);
        let outcome = api.update_issue(&ticket.issue_id, &ticket.request).await;
        self.finish_move(&ticket, outcome).await
    }

    // ── Read side ─────────────────────────────────────────────

    fn rederive(&mut self) {
        self.materialized = materialize(
            self.engine.records(),
            self.pagination.filter(),
            self.pagination.sort(),
        );
    }

    /// Current display state.
    #[must_use]
    pub const fn snapshot(&self) -> &Materialized {
        &self.materialized
    }

    #[must_use]
    pub const fn page(&self) -> &PageState {
        self.pagination.state()
    }

    #[must_use]
    pub const fn filter(&self) -> &FilterCriteria {
        self.pagination.filter()
    }

    #[must_use]
    pub const fn sort(&self) -> &SortCriteria {
        self.pagination.sort()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.engine.get(id)
    }

    /// User-visible error from the last failed operation.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Scope of the live subscription, if one is open.
    #[must_use]
    pub fn subscription(&self) -> Option<&ConnectionKey> {
        self.subscription.as_ref().map(Subscription::key)
    }

    /// Live connection count, for diagnostics.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.registry.active_count()
    }
}

impl<A: IssueApi, T: EventTransport> std::fmt::Debug for IssueView<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueView")
            .field("active", &self.active)
            .field("records", &self.engine.len())
            .field("page", self.pagination.state())
            .field("subscription", &self.subscription().map(ConnectionKey::as_str))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssuePriority, PageResponse};
    use crate::stream::{SseMessage, StaticToken};
    use crate::testing::{MockApi, ScriptedTransport};

    type TestView = IssueView<MockApi, ScriptedTransport>;

    fn setup() -> (Arc<MockApi>, Arc<ScriptedTransport>, TestView) {
        let api = Arc::new(MockApi::new());
        let transport = Arc::new(ScriptedTransport::new());
        let registry = StreamRegistry::new(Arc::clone(&transport), Arc::new(StaticToken::new("t")));
        let view = IssueView::new(
            Arc::clone(&api),
            registry,
            SseEndpoints::new("http://api.test/api"),
            20,
        );
        (api, transport, view)
    }

    fn issue(id: &str, status: IssueStatus) -> Issue {
        Issue::new(id, "1", format!("Issue {id}"))
            .with_status(status)
            .with_priority(IssuePriority::High)
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_status_change_moves_card_between_columns() {
        let (api, transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        let feed = transport.push_stream();

        view.activate().await.unwrap();
        assert_eq!(ids(&view.snapshot().partitions.open), vec!["1"]);

        feed.send(Ok(SseMessage::new("connected", "Connected to issue updates")))
            .await
            .unwrap();
        feed.send(Ok(SseMessage::new(
            "issue.status.changed",
            r#"{"id":1,"projectId":1,"title":"Issue 1","status":"IN_PROGRESS","priority":"HIGH"}"#,
        )))
        .await
        .unwrap();

        assert!(matches!(view.pump().await, Some(Ok(false))));
        assert!(matches!(view.pump().await, Some(Ok(true))));

        let partitions = &view.snapshot().partitions;
        assert!(partitions.open.is_empty());
        assert_eq!(ids(&partitions.in_progress), vec!["1"]);
        assert_eq!(view.subscription(), Some(&ConnectionKey::all_issues()));
    }

    #[tokio::test]
    async fn test_delete_of_absent_issue_is_noop() {
        let (api, _transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        view.load_once().await.unwrap();
        let before = view.snapshot().clone();
        let page = *view.page();

        view.apply_change(Change::Deleted {
            id: "2".to_string(),
            record: None,
        });

        assert_eq!(view.snapshot(), &before);
        assert_eq!(view.page(), &page);
    }

    #[tokio::test]
    async fn test_optimistic_move_commits_server_record() {
        let (api, _transport, mut view) = setup();
        api.push_issues(vec![issue("3", IssueStatus::Open)]);
        api.push_update(Ok(issue("3", IssueStatus::Closed)));
        view.load_once().await.unwrap();

        let resolution = view.move_issue("3", IssueStatus::Closed).await.unwrap();

        assert_eq!(resolution, Resolution::Committed);
        assert_eq!(view.get("3").map(|i| i.status), Some(IssueStatus::Closed));
        assert_eq!(ids(&view.snapshot().partitions.closed), vec!["3"]);
        assert_eq!(
            api.update_requests(),
            vec![("3".to_string(), crate::model::UpdateIssueRequest::status(IssueStatus::Closed))]
        );
    }

    #[tokio::test]
    async fn test_failed_move_reverts_to_refetched_state() {
        let (api, _transport, mut view) = setup();
        api.push_issues(vec![issue("3", IssueStatus::Open)]);
        view.load_once().await.unwrap();

        api.push_update(Err(Error::Api {
            status: 500,
            message: None,
        }));
        // Meanwhile someone else started the issue
        api.push_issues(vec![issue("3", IssueStatus::InProgress)]);

        let ticket = view.begin_move("3", IssueStatus::Closed).unwrap();
        assert_eq!(ids(&view.snapshot().partitions.closed), vec!["3"]);

        let outcome = api.update_issue(&ticket.issue_id, &ticket.request).await;
        let resolution = view.finish_move(&ticket, outcome).await.unwrap();

        assert!(matches!(resolution, Resolution::Refetch { .. }));
        assert_eq!(view.get("3").map(|i| i.status), Some(IssueStatus::InProgress));
        assert_eq!(view.error(), Some("Failed to update issue status"));
        assert_eq!(api.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_collection() {
        let (api, _transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open), issue("2", IssueStatus::Closed)]);
        view.load_once().await.unwrap();

        api.push_page(Err(Error::Api {
            status: 503,
            message: None,
        }));
        let sort: SortCriteria = "title,asc".parse().unwrap();
        assert!(view.set_sort(sort).await.is_err());

        assert_eq!(view.error(), Some(LOAD_FAILED_MESSAGE));
        assert_eq!(view.snapshot().matched.len(), 2);
        assert!(view.get("1").is_some());
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn test_filter_change_resets_page_and_resubscribes() {
        let (api, transport, mut view) = setup();
        let mut first = PageResponse::new(vec![issue("1", IssueStatus::Open)], 0, 20, 60);
        first.total_pages = 3;
        api.push_page(Ok(first));
        let _all = transport.push_stream();
        let _project = transport.push_stream();
        view.activate().await.unwrap();

        api.push_issues(Vec::new());
        assert!(view.next_page().await.unwrap());
        assert_eq!(api.page_requests()[1].page, 1);

        api.push_issues(vec![issue("7", IssueStatus::Open)]);
        let filter = FilterCriteria {
            project_id: Some("9".to_string()),
            ..FilterCriteria::default()
        };
        assert!(view.set_filter(filter.clone()).await.unwrap());

        let last = api.page_requests().pop().unwrap();
        assert_eq!(last.page, 0);
        assert_eq!(last.filter, filter);
        assert_eq!(view.subscription(), Some(&ConnectionKey::project("9")));
        assert_eq!(view.active_connections(), 1);

        // Same filter again: nothing refetched
        assert!(!view.set_filter(filter).await.unwrap());
        assert_eq!(api.page_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_totals_are_nudged_for_matching_records() {
        let (api, _transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        view.load_once().await.unwrap();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        let open_only = FilterCriteria {
            status: Some(IssueStatus::Open),
            ..FilterCriteria::default()
        };
        view.set_filter(open_only).await.unwrap();
        assert_eq!(view.page().total_elements, 1);

        view.apply_change(Change::Created(issue("2", IssueStatus::Open)));
        view.apply_change(Change::Created(issue("3", IssueStatus::Closed)));
        assert_eq!(view.page().total_elements, 2);
        assert_eq!(ids(&view.snapshot().matched).len(), 2);

        view.apply_change(Change::Deleted {
            id: "3".to_string(),
            record: None,
        });
        assert_eq!(view.page().total_elements, 2);
        view.apply_change(Change::Deleted {
            id: "1".to_string(),
            record: None,
        });
        assert_eq!(view.page().total_elements, 1);
    }

    #[tokio::test]
    async fn test_repeated_handshake_triggers_resync() {
        let (api, transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        let feed = transport.push_stream();
        view.activate().await.unwrap();

        api.push_issues(vec![issue("1", IssueStatus::Closed), issue("4", IssueStatus::Open)]);
        feed.send(Ok(SseMessage::new("connected", "first"))).await.unwrap();
        feed.send(Ok(SseMessage::new("connected", "again"))).await.unwrap();

        assert!(matches!(view.pump().await, Some(Ok(false))));
        assert!(matches!(view.pump().await, Some(Ok(true))));
        assert_eq!(view.snapshot().matched.len(), 2);
        assert_eq!(api.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_stream_and_collection() {
        let (api, transport, mut view) = setup();
        api.push_issues(vec![issue("1", IssueStatus::Open)]);
        let feed = transport.push_stream();
        view.activate().await.unwrap();

        api.push_page(Err(Error::Api {
            status: 503,
            message: None,
        }));
        feed.send(Ok(SseMessage::new("connected", "first"))).await.unwrap();
        feed.send(Ok(SseMessage::new("connected", "again"))).await.unwrap();

        assert!(matches!(view.pump().await, Some(Ok(false))));
        assert!(matches!(view.pump().await, Some(Ok(true))));
        assert_eq!(view.error(), Some(LOAD_FAILED_MESSAGE));
        assert_eq!(ids(&view.snapshot().matched), vec!["1"]);
        assert_eq!(view.subscription(), Some(&ConnectionKey::all_issues()));
        assert_eq!(view.active_connections(), 1);

        // Later events still apply
        feed.send(Ok(SseMessage::new(
            "issue.created",
            r#"{"id":2,"projectId":1,"title":"Issue 2","status":"OPEN","priority":"HIGH"}"#,
        )))
        .await
        .unwrap();
        assert!(matches!(view.pump().await, Some(Ok(true))));
        assert_eq!(view.snapshot().matched.len(), 2);
    }

    fn three_pages(number: u32) -> PageResponse<Issue> {
        let mut page = PageResponse::new(vec![issue("1", IssueStatus::Open)], number, 20, 60);
        page.total_pages = 3;
        page
    }

    #[tokio::test]
    async fn test_clear_filters_resets_to_first_page() {
        let (api, _transport, mut view) = setup();
        api.push_page(Ok(three_pages(0)));
        view.load_once().await.unwrap();

        api.push_page(Ok(three_pages(0)));
        let filter = FilterCriteria {
            status: Some(IssueStatus::Open),
            search: Some("login".to_string()),
            ..FilterCriteria::default()
        };
        assert!(view.set_filter(filter).await.unwrap());
        api.push_page(Ok(three_pages(2)));
        assert!(view.go_to_page(2).await.unwrap());
        assert_eq!(view.page().page, 2);

        api.push_page(Ok(three_pages(0)));
        assert!(view.clear_filters().await.unwrap());

        let last = api.page_requests().pop().unwrap();
        assert_eq!(last.page, 0);
        assert!(last.filter.is_empty());
        assert_eq!(view.page().page, 0);

        // Already clear: nothing refetched
        assert!(!view.clear_filters().await.unwrap());
        assert_eq!(api.page_requests().len(), 4);
    }

    #[tokio::test]
    async fn test_previous_page_stops_at_first() {
        let (api, _transport, mut view) = setup();
        api.push_page(Ok(three_pages(1)));
        view = view.with_criteria(FilterCriteria::default(), SortCriteria::default(), 1);
        view.load_once().await.unwrap();
        assert_eq!(api.page_requests()[0].page, 1);

        api.push_page(Ok(three_pages(0)));
        assert!(view.previous_page().await.unwrap());
        assert_eq!(api.page_requests()[1].page, 0);
        assert_eq!(view.page().page, 0);

        assert!(!view.previous_page().await.unwrap());
        assert_eq!(api.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_go_to_page_ignores_out_of_range() {
        let (api, _transport, mut view) = setup();
        api.push_page(Ok(three_pages(0)));
        view.load_once().await.unwrap();

        assert!(!view.go_to_page(3).await.unwrap());
        assert!(!view.go_to_page(99).await.unwrap());
        assert_eq!(api.page_requests().len(), 1);

        api.push_page(Ok(three_pages(2)));
        assert!(view.go_to_page(2).await.unwrap());
        assert_eq!(api.page_requests()[1].page, 2);

        // Same page again refreshes it
        api.push_page(Ok(three_pages(2)));
        assert!(view.go_to_page(2).await.unwrap());
        assert_eq!(api.page_requests()[2].page, 2);
        assert_eq!(view.page().page, 2);
    }

    #[tokio::test]
    async fn test_stream_failure_surfaces_once() {
        let (api, transport, mut view) = setup();
        api.push_issues(Vec::new());
        let feed = transport.push_stream();
        view.activate().await.unwrap();
        drop(feed);

        assert!(matches!(view.pump().await, Some(Err(Error::StreamClosed { .. }))));
        assert!(view.error().is_some());
        assert!(view.pump().await.is_none());
        assert_eq!(view.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_teardown_discards_late_results() {
        let (api, transport, mut view) = setup();
        api.push_issues(vec![issue("3", IssueStatus::Open)]);
        let _feed = transport.push_stream();
        view.activate().await.unwrap();

        let ticket = view.begin_move("3", IssueStatus::Closed).unwrap();
        view.teardown();

        assert_eq!(view.active_connections(), 0);
        let resolution = view
            .finish_move(&ticket, Ok(issue("3", IssueStatus::Closed)))
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::Stale);
        assert!(view.get("3").is_none());
        assert!(!view.apply_change(Change::Created(issue("5", IssueStatus::Open))));
        assert!(view.snapshot().matched.is_empty());
        assert!(view.begin_move("3", IssueStatus::Open).is_err());
    }
}
