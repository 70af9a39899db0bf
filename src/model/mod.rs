//! Data models for the live issue tracker.
//!
//! This module contains all domain models:
//! - Issue (plus status / priority enums)
//! - Project and ProjectMember
//! - User
//! - PageResponse / PageRequest

pub mod issue;
pub mod page;
pub mod project;

pub use issue::{CreateIssueRequest, Issue, IssuePriority, IssueStatus, UpdateIssueRequest, User};
pub use page::{PageRequest, PageResponse};
pub use project::{Project, ProjectMember, ProjectRole};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// A server-owned entity held in a canonical collection.
///
/// Every record carries an opaque, stable identifier; the collection keeps
/// at most one record per identifier.
pub trait Record: Clone + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable entity name used in logs ("issue", "project").
    const ENTITY: &'static str;

    /// The record's stable identifier.
    fn id(&self) -> &str;
}

/// Wire form of an identifier: numeric primary keys and UUID strings both occur.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(i64),
    Str(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Num(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

/// Deserialize an identifier that may be a JSON number or string.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Extract an identifier from a loose JSON value (bare id or object with `id`).
pub(crate) fn id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(map) => map.get("id").and_then(id_from_value),
        _ => None,
    }
}
