//! Live event streams.
//!
//! - **sse**: byte-level server-sent events framing
//! - **decoder**: named event + payload to [`StreamEvent`]
//! - **transport**: connecting to a stream endpoint (reqwest in production)
//! - **backoff**: optional reconnect policy
//! - **registry**: at most one live connection per [`ConnectionKey`]

pub mod backoff;
pub mod decoder;
pub mod registry;
pub mod sse;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use decoder::{DecodeError, EventKind, decode};
pub use registry::{EventChannel, StaticToken, StreamRegistry, TokenSource};
pub use sse::{SseMessage, SseParser};
pub use transport::{EventTransport, HttpTransport, MessageStream};

use crate::model::{Issue, Project};
use crate::view::collection::Change;

/// A decoded stream item.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Handshake text sent when a stream opens; never applied to a collection.
    Connected(String),
    Issue(Change<Issue>),
    Project(Change<Project>),
}

/// Identifies one logical subscription scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    /// Every issue the user can see.
    #[must_use]
    pub fn all_issues() -> Self {
        Self("all-issues".to_string())
    }

    /// Issues of one project.
    #[must_use]
    pub fn project(project_id: &str) -> Self {
        Self(format!("project-{project_id}"))
    }

    /// Membership and project events addressed to the current user.
    #[must_use]
    pub fn user_events() -> Self {
        Self("user-events".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds stream endpoint URLs from the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEndpoints {
    base: String,
}

impl SseEndpoints {
    pub fn new(api_url: &str) -> Self {
        Self {
            base: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Key and source URL for an issue subscription, scoped to a project when given.
    #[must_use]
    pub fn issues(&self, project_id: Option<&str>) -> (ConnectionKey, String) {
        match project_id {
            Some(id) => (
                ConnectionKey::project(id),
                format!("{}/sse/issues?projectId={id}", self.base),
            ),
            None => (ConnectionKey::all_issues(), format!("{}/sse/issues", self.base)),
        }
    }

    /// Key and source URL for the user event subscription.
    #[must_use]
    pub fn user(&self) -> (ConnectionKey, String) {
        (ConnectionKey::user_events(), format!("{}/sse/user", self.base))
    }
}
