//! Filter, sort and board partitioning.
//!
//! Everything here is a pure function of (records, criteria): the displayed
//! list and the three board columns are re-derived from the canonical
//! collection on every change rather than patched in place.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Issue, IssuePriority, IssueStatus, Project};

/// Filter criteria; a `None` field is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub project_id: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

impl FilterCriteria {
    /// Whether every specified criterion equals the issue's field.
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(ref project_id) = self.project_id {
            if issue.project_id != *project_id {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != issue.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != issue.priority) {
            return false;
        }
        // The needle is used verbatim, as the server receives it
        match self.search.as_deref() {
            Some(needle) if !needle.is_empty() => issue
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.search.as_deref().is_none_or(str::is_empty)
    }
}

/// Field an issue list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    Priority,
    Title,
    Status,
}

impl SortField {
    /// Name used in the REST `sort` parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Priority => "priority",
            Self::Title => "title",
            Self::Status => "status",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Field selector plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCriteria {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortCriteria {
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// REST form, e.g. `createdAt,desc`.
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{}", self.field.as_str(), self.direction.as_str())
    }

    /// Compare two issues by the selected field, then apply the direction.
    ///
    /// Priority and status use their fixed total orders, not lexical order.
    /// Ties compare `Equal`; callers rely on a stable sort for tie order.
    #[must_use]
    pub fn compare(&self, a: &Issue, b: &Issue) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl Default for SortCriteria {
    fn default() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Desc)
    }
}

impl FromStr for SortCriteria {
    type Err = Error;

    /// Parse `field[,direction]`; direction defaults to ascending.
    fn from_str(s: &str) -> Result<Self> {
        let (field, direction) = s.split_once(',').unwrap_or((s, "asc"));

        let field = match field.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "createdat" | "created" => SortField::CreatedAt,
            "priority" => SortField::Priority,
            "title" => SortField::Title,
            "status" => SortField::Status,
            other => {
                return Err(Error::InvalidArgument(format!("unknown sort field '{other}'")));
            }
        };

        let direction = match direction.trim().to_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Asc,
            "desc" | "descending" => SortDirection::Desc,
            other => {
                return Err(Error::InvalidArgument(format!("unknown sort direction '{other}'")));
            }
        };

        Ok(Self { field, direction })
    }
}

/// The three status columns of the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPartitions {
    pub open: Vec<Issue>,
    pub in_progress: Vec<Issue>,
    pub closed: Vec<Issue>,
}

impl BoardPartitions {
    /// Column for a status.
    #[must_use]
    pub fn column(&self, status: IssueStatus) -> &[Issue] {
        match status {
            IssueStatus::Open => &self.open,
            IssueStatus::InProgress => &self.in_progress,
            IssueStatus::Closed => &self.closed,
        }
    }

    /// Total cards across all columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len() + self.in_progress.len() + self.closed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derived display state: the only thing a presentation layer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Materialized {
    pub matched: Vec<Issue>,
    pub partitions: BoardPartitions,
}

/// Derive the matched list and board columns from a set of issues.
///
/// Matching issues are ordered by id first so that the stable comparator sort
/// yields the same tie order on every call, whatever the iteration order of
/// the source collection.
pub fn materialize<'a, I>(records: I, filter: &FilterCriteria, sort: &SortCriteria) -> Materialized
where
    I: IntoIterator<Item = &'a Issue>,
{
    let mut matched: Vec<Issue> = records
        .into_iter()
        .filter(|issue| filter.matches(issue))
        .cloned()
        .collect();

    matched.sort_by(|a, b| a.id.cmp(&b.id));
    matched.sort_by(|a, b| sort.compare(a, b));

    let partitions = partition(&matched, sort);

    Materialized {
        matched,
        partitions,
    }
}

/// Split a matched list into status columns, each sorted with `sort`.
fn partition(matched: &[Issue], sort: &SortCriteria) -> BoardPartitions {
    let mut partitions = BoardPartitions::default();
    for issue in matched {
        match issue.status {
            IssueStatus::Open => partitions.open.push(issue.clone()),
            IssueStatus::InProgress => partitions.in_progress.push(issue.clone()),
            IssueStatus::Closed => partitions.closed.push(issue.clone()),
        }
    }

    // Splitting a sorted list keeps each column sorted; the stable re-sort
    // only matters if `matched` was produced some other way.
    for column in [
        &mut partitions.open,
        &mut partitions.in_progress,
        &mut partitions.closed,
    ] {
        column.sort_by(|a, b| sort.compare(a, b));
    }

    partitions
}

/// Order projects for the project list: case-insensitive name, then id.
pub fn materialize_projects<'a, I>(records: I) -> Vec<Project>
where
    I: IntoIterator<Item = &'a Project>,
{
    let mut projects: Vec<Project> = records.into_iter().cloned().collect();
    projects.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    projects
}
