//! The project list view, kept live by the user event stream.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ProjectApi;
use crate::error::Result;
use crate::model::Project;
use crate::stream::{ConnectionKey, EventTransport, SseEndpoints, StreamRegistry};

use super::collection::{Change, ReconciliationEngine};
use super::materialize::materialize_projects;
use super::{Delivery, Subscription};

/// Shown when the project fetch fails without a server message.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load projects";

/// Projects the current user belongs to.
pub struct ProjectView<A: ProjectApi, T: EventTransport> {
    api: Arc<A>,
    registry: StreamRegistry<T>,
    endpoints: SseEndpoints,
    engine: ReconciliationEngine<Project>,
    subscription: Option<Subscription>,
    projects: Vec<Project>,
    error: Option<String>,
    active: bool,
}

impl<A: ProjectApi, T: EventTransport> ProjectView<A, T> {
    pub fn new(api: Arc<A>, registry: StreamRegistry<T>, endpoints: SseEndpoints) -> Self {
        Self {
            api,
            registry,
            endpoints,
            engine: ReconciliationEngine::new(),
            subscription: None,
            projects: Vec::new(),
            error: None,
            active: false,
        }
    }

    /// Load the project list and subscribe to user events.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or `AuthMissing`.
    pub async fn activate(&mut self) -> Result<()> {
        self.active = true;
        self.reload().await?;
        let (key, url) = self.endpoints.user();
        let channel = self.registry.open(key, &url)?;
        self.subscription = Some(Subscription::new(channel));
        Ok(())
    }

    /// Load the list without subscribing.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn load_once(&mut self) -> Result<()> {
        self.active = true;
        self.reload().await
    }

    pub fn teardown(&mut self) {
        self.active = false;
        self.subscription = None;
        self.registry.close_all();
        self.engine.clear();
        self.projects.clear();
    }

    /// Refetch the full list.
    ///
    /// # Errors
    ///
    /// Returns the API error; the previous list stays in place.
    pub async fn reload(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let api = Arc::clone(&self.api);
        let result = api.list_projects().await;
        if !self.active {
            return Ok(());
        }

        match result {
            Ok(projects) => {
                self.engine.seed(projects);
                self.error = None;
                self.rederive();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load projects");
                self.error = Some(err.user_message(LOAD_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    /// Wait for the next stream item and apply it. Same contract as
    /// [`super::IssueView::pump`].
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
            Some(Ok(Delivery::Handshake | Delivery::Issue(_))) => Some(Ok(false)),
            Some(Ok(Delivery::Resync)) => {
                // A failed refetch is kept as the view's error; the stream stays up
                if let Err(err) = self.reload().await {
                    debug!(error = %err, "Resync fetch failed, keeping previous projects");
                }
                Some(Ok(true))
            }
            Some(Ok(Delivery::Project(change))) => Some(Ok(self.apply_change(change))),
        }
    }

    /// Apply one project change.
    pub fn apply_change(&mut self, change: Change<Project>) -> bool {
        if !self.active {
            return false;
        }
        debug!(id = change.id(), "Applying project change");
        self.engine.apply(change);
        self.rederive();
        true
    }

    fn rederive(&mut self) {
        self.projects = materialize_projects(self.engine.records());
    }

    /// Projects ordered by name.
    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn subscription(&self) -> Option<&ConnectionKey> {
        self.subscription.as_ref().map(Subscription::key)
    }

    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.registry.active_count()
    }
}
