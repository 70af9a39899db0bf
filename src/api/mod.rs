//! REST collaborator contracts.
//!
//! Views depend on these traits only; [`HttpApi`] is the reqwest-backed
//! implementation used by the CLI.

pub mod http;

pub use http::HttpApi;

use std::future::Future;

use crate::error::Result;
use crate::model::{CreateIssueRequest, Issue, PageRequest, PageResponse, Project, UpdateIssueRequest};

/// Issue endpoints.
pub trait IssueApi: Send + Sync {
    /// Fetch one filtered, sorted page.
    fn list_issues(&self, request: &PageRequest) -> impl Future<Output = Result<PageResponse<Issue>>> + Send;

    fn get_issue(&self, id: &str) -> impl Future<Output = Result<Issue>> + Send;

    fn create_issue(&self, request: &CreateIssueRequest) -> impl Future<Output = Result<Issue>> + Send;

    /// Apply a partial update; the response is the full updated record.
    fn update_issue(
        &self,
        id: &str,
        request: &UpdateIssueRequest,
    ) -> impl Future<Output = Result<Issue>> + Send;

    fn delete_issue(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Project endpoints.
pub trait ProjectApi: Send + Sync {
    /// Every project the current user is a member of.
    fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>>> + Send;

    fn get_project(&self, id: &str) -> impl Future<Output = Result<Project>> + Send;
}
