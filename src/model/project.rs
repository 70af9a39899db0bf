//! Project model.
//!
//! Projects group issues and carry the membership list that decides which
//! users receive a project's events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Record, User, deserialize_id};

/// Role of a member within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectRole {
    Owner,
    Member,
}

impl Default for ProjectRole {
    fn default() -> Self {
        Self::Member
    }
}

/// A membership entry on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub user: User,
    #[serde(default)]
    pub role: ProjectRole,
    #[serde(default)]
    pub joined_at: Option<NaiveDateTime>,
}

/// A project visible to the current user.
///
/// Projects provide:
/// - The scope for per-project issue streams
/// - Membership (who receives the project's events)
/// - An issue count for the list screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable identifier
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: Option<User>,

    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub members: Vec<ProjectMember>,

    #[serde(default)]
    pub issue_count: Option<i32>,
}

impl Project {
    /// Create a bare project.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            owner: None,
            created_at: None,
            updated_at: None,
            members: Vec::new(),
            issue_count: None,
        }
    }

    /// Whether the given user is listed as a member.
    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user.id == user_id)
    }
}

impl Record for Project {
    const ENTITY: &'static str = "project";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_from_server_payload() {
        let payload = r#"{
            "id": 4,
            "name": "Platform",
            "description": null,
            "owner": {"id": 1, "email": "o@x.io", "fullName": "Owner"},
            "members": [
                {"id": 10, "user": {"id": 1, "email": "o@x.io", "fullName": "Owner"}, "role": "OWNER"},
                {"id": 11, "user": {"id": 2, "email": "m@x.io", "fullName": "Member"}, "role": "MEMBER", "joinedAt": "2024-02-01T09:00:00"}
            ],
            "issueCount": 17
        }"#;
        let project: Project = serde_json::from_str(payload).unwrap();
        assert_eq!(project.id(), "4");
        assert_eq!(project.members.len(), 2);
        assert_eq!(project.members[0].role, ProjectRole::Owner);
        assert!(project.has_member("2"));
        assert!(!project.has_member("3"));
        assert_eq!(project.issue_count, Some(17));
    }

    #[test]
    fn test_members_default_to_empty() {
        let project: Project = serde_json::from_str(r#"{"id":"p-9","name":"Docs"}"#).unwrap();
        assert!(project.members.is_empty());
        assert_eq!(project, Project::new("p-9", "Docs"));
    }
}
