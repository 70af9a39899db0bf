//! Event decoder: wire event name + payload text to a typed stream event.
//!
//! The eleven named events collapse into three operations. Decoding never
//! touches the channel; callers log and drop a `DecodeError` and keep reading.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::{Issue, Project, Record, id_from_value};
use crate::view::collection::Change;

use super::StreamEvent;

/// Why a message could not be turned into a stream event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown event type '{0}'")]
    UnknownEvent(String),

    #[error("malformed '{event}' payload: {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{event}' payload carries no record id")]
    MissingId { event: &'static str },
}

/// Result alias for decoding.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Which collection an event targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Issue,
    Project,
}

/// The operation an event maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Created,
    Updated,
    Deleted,
}

/// The recognized event catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    IssueCreated,
    IssueUpdated,
    IssueDeleted,
    IssueStatusChanged,
    IssuePriorityChanged,
    IssueAssigned,
    ProjectMemberAdded,
    ProjectMemberRemoved,
    ProjectUpdated,
    ProjectDeleted,
}

impl EventKind {
    pub const ALL: [Self; 11] = [
        Self::Connected,
        Self::IssueCreated,
        Self::IssueUpdated,
        Self::IssueDeleted,
        Self::IssueStatusChanged,
        Self::IssuePriorityChanged,
        Self::IssueAssigned,
        Self::ProjectMemberAdded,
        Self::ProjectMemberRemoved,
        Self::ProjectUpdated,
        Self::ProjectDeleted,
    ];

    /// Look up a wire event name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::IssueCreated => "issue.created",
            Self::IssueUpdated => "issue.updated",
            Self::IssueDeleted => "issue.deleted",
            Self::IssueStatusChanged => "issue.status.changed",
            Self::IssuePriorityChanged => "issue.priority.changed",
            Self::IssueAssigned => "issue.assigned",
            Self::ProjectMemberAdded => "project.member.added",
            Self::ProjectMemberRemoved => "project.member.removed",
            Self::ProjectUpdated => "project.updated",
            Self::ProjectDeleted => "project.deleted",
        }
    }

    /// Target collection and operation; `None` for the handshake.
    #[must_use]
    pub const fn target(self) -> Option<(Entity, Op)> {
        match self {
            Self::Connected => None,
            Self::IssueCreated => Some((Entity::Issue, Op::Created)),
            Self::IssueUpdated
            | Self::IssueStatusChanged
            | Self::IssuePriorityChanged
            | Self::IssueAssigned => Some((Entity::Issue, Op::Updated)),
            Self::IssueDeleted => Some((Entity::Issue, Op::Deleted)),
            // Membership changes decide whether the project is visible at all
            Self::ProjectMemberAdded => Some((Entity::Project, Op::Created)),
            Self::ProjectUpdated => Some((Entity::Project, Op::Updated)),
            Self::ProjectMemberRemoved | Self::ProjectDeleted => {
                Some((Entity::Project, Op::Deleted))
            }
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode one named event.
///
/// # Errors
///
/// Returns `DecodeError` for unknown event names, payloads that do not parse
/// as the expected record, and deletions without an identifiable id.
pub fn decode(event: &str, payload: &str) -> DecodeResult<StreamEvent> {
    let kind = EventKind::from_wire(event).ok_or_else(|| DecodeError::UnknownEvent(event.to_string()))?;

    let Some((entity, op)) = kind.target() else {
        return Ok(StreamEvent::Connected(payload.to_string()));
    };

    Ok(match entity {
        Entity::Issue => StreamEvent::Issue(decode_change::<Issue>(kind, op, payload)?),
        Entity::Project => StreamEvent::Project(decode_change::<Project>(kind, op, payload)?),
    })
}

fn decode_change<R: Record>(kind: EventKind, op: Op, payload: &str) -> DecodeResult<Change<R>> {
    match op {
        Op::Created => parse_record(kind, payload).map(Change::Created),
        Op::Updated => parse_record(kind, payload).map(Change::Updated),
        Op::Deleted => decode_deletion(kind, payload),
    }
}

fn parse_record<R: DeserializeOwned>(kind: EventKind, payload: &str) -> DecodeResult<R> {
    serde_json::from_str(payload).map_err(|source| DecodeError::Payload {
        event: kind.as_str(),
        source,
    })
}

/// Deletions carry a full record, `{"id": ..}`, or a bare id.
fn decode_deletion<R: Record>(kind: EventKind, payload: &str) -> DecodeResult<Change<R>> {
    let trimmed = payload.trim();
    let value = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value,
        // Unquoted ids (e.g. a UUID written straight into the data line)
        Err(_) if is_bare_id(trimmed) => serde_json::Value::String(trimmed.to_string()),
        Err(source) => {
            return Err(DecodeError::Payload {
                event: kind.as_str(),
                source,
            });
        }
    };

    let id = id_from_value(&value).ok_or(DecodeError::MissingId {
        event: kind.as_str(),
    })?;
    let record = serde_json::from_value::<R>(value).ok();

    Ok(Change::Deleted { id, record })
}

fn is_bare_id(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
