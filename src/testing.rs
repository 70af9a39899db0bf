//! In-memory doubles for the network seams, used by unit tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use proptest::prelude::*;
use reqwest::Url;
use tokio::sync::mpsc;

use crate::api::{IssueApi, ProjectApi};
use crate::error::{Error, Result};
use crate::model::{
    CreateIssueRequest, Issue, IssuePriority, IssueStatus, PageRequest, PageResponse, Project,
    UpdateIssueRequest,
};
use crate::stream::{EventTransport, MessageStream, SseMessage};
use crate::view::{Change, FilterCriteria, SortCriteria, SortDirection, SortField};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A message stream fed by a test through an mpsc sender.
pub type ScriptedStream = mpsc::Receiver<Result<SseMessage>>;

impl MessageStream for ScriptedStream {
    async fn next_message(&mut self) -> Option<Result<SseMessage>> {
        self.recv().await
    }
}

enum Script {
    Stream(ScriptedStream),
    Refuse(Error),
}

/// Transport that hands out queued streams in connect order.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream for the next connect; the sender feeds it.
    /// Dropping the sender ends the stream.
    pub fn push_stream(&self) -> mpsc::Sender<Result<SseMessage>> {
        let (tx, rx) = mpsc::channel(64);
        guard(&self.scripts).push_back(Script::Stream(rx));
        tx
    }

    /// Queue a refused connect.
    pub fn push_refusal(&self, err: Error) {
        guard(&self.scripts).push_back(Script::Refuse(err));
    }

    /// URLs of every connect attempt so far.
    pub fn connected_urls(&self) -> Vec<Url> {
        guard(&self.urls).clone()
    }
}

impl EventTransport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn connect(&self, url: &Url) -> Result<ScriptedStream> {
        guard(&self.urls).push(url.clone());
        let script = guard(&self.scripts).pop_front();
        match script {
            Some(Script::Stream(rx)) => Ok(rx),
            Some(Script::Refuse(err)) => Err(err),
            None => Err(Error::Other("no scripted stream".to_string())),
        }
    }
}

/// API double with queued page responses and update outcomes.
#[derive(Default)]
pub struct MockApi {
    pages: Mutex<VecDeque<Result<PageResponse<Issue>>>>,
    updates: Mutex<VecDeque<Result<Issue>>>,
    projects: Mutex<VecDeque<Result<Vec<Project>>>>,
    page_requests: Mutex<Vec<PageRequest>>,
    update_requests: Mutex<Vec<(String, UpdateIssueRequest)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: Result<PageResponse<Issue>>) {
        guard(&self.pages).push_back(page);
    }

    /// Queue a single-page response holding `issues`.
    pub fn push_issues(&self, issues: Vec<Issue>) {
        let total = issues.len() as u64;
        self.push_page(Ok(PageResponse::new(issues, 0, 20, total)));
    }

    pub fn push_update(&self, outcome: Result<Issue>) {
        guard(&self.updates).push_back(outcome);
    }

    pub fn push_projects(&self, projects: Result<Vec<Project>>) {
        guard(&self.projects).push_back(projects);
    }

    pub fn page_requests(&self) -> Vec<PageRequest> {
        guard(&self.page_requests).clone()
    }

    pub fn update_requests(&self) -> Vec<(String, UpdateIssueRequest)> {
        guard(&self.update_requests).clone()
    }
}

impl IssueApi for MockApi {
    async fn list_issues(&self, request: &PageRequest) -> Result<PageResponse<Issue>> {
        guard(&self.page_requests).push(request.clone());
        guard(&self.pages)
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("no scripted page".to_string())))
    }

    async fn get_issue(&self, id: &str) -> Result<Issue> {
        Err(Error::IssueNotFound { id: id.to_string() })
    }

    async fn create_issue(&self, request: &CreateIssueRequest) -> Result<Issue> {
        Ok(Issue::new("new", request.project_id.clone(), request.title.clone()))
    }

    async fn update_issue(&self, id: &str, request: &UpdateIssueRequest) -> Result<Issue> {
        guard(&self.update_requests).push((id.to_string(), request.clone()));
        guard(&self.updates)
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("no scripted update".to_string())))
    }

    async fn delete_issue(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

impl ProjectApi for MockApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        guard(&self.projects)
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("no scripted projects".to_string())))
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        Err(Error::ProjectNotFound { id: id.to_string() })
    }
}

// ── Generators ────────────────────────────────────────────────
//
// Ids, projects and titles come from small alphabets so that generated
// changes collide on ids and sorts hit ties.

pub fn arb_status() -> impl Strategy<Value = IssueStatus> {
    prop_oneof![
        Just(IssueStatus::Open),
        Just(IssueStatus::InProgress),
        Just(IssueStatus::Closed),
    ]
}

pub fn arb_priority() -> impl Strategy<Value = IssuePriority> {
    prop_oneof![
        Just(IssuePriority::Low),
        Just(IssuePriority::Medium),
        Just(IssuePriority::High),
        Just(IssuePriority::Critical),
    ]
}

fn arb_id() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| n.to_string())
}

fn arb_project_id() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["p1", "p2"]).prop_map(str::to_string)
}

pub fn arb_issue() -> impl Strategy<Value = Issue> {
    (
        arb_id(),
        arb_project_id(),
        "[abAB ]{0,5}",
        arb_status(),
        arb_priority(),
        prop::option::of(1u32..=5),
    )
        .prop_map(|(id, project_id, title, status, priority, day)| {
            let issue = Issue::new(id, project_id, title)
                .with_status(status)
                .with_priority(priority);
            match day.and_then(|d| NaiveDate::from_ymd_opt(2024, 3, d)?.and_hms_opt(9, 0, 0)) {
                Some(created_at) => issue.with_created_at(created_at),
                None => issue,
            }
        })
}

/// Issues with distinct ids, as a canonical collection holds them.
pub fn arb_issue_set() -> impl Strategy<Value = Vec<Issue>> {
    prop::collection::vec(arb_issue(), 0..12).prop_map(|issues| {
        let mut by_id = std::collections::BTreeMap::new();
        for issue in issues {
            by_id.insert(issue.id.clone(), issue);
        }
        by_id.into_values().collect()
    })
}

pub fn arb_change() -> impl Strategy<Value = Change<Issue>> {
    prop_oneof![
        arb_issue().prop_map(Change::Created),
        arb_issue().prop_map(Change::Updated),
        (arb_id(), prop::option::of(arb_issue())).prop_map(|(id, record)| Change::Deleted {
            id,
            record,
        }),
    ]
}

pub fn arb_filter() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::option::of(arb_project_id()),
        prop::option::of(arb_status()),
        prop::option::of(arb_priority()),
        prop::option::of("[abAB ]{0,2}"),
    )
        .prop_map(|(project_id, status, priority, search)| FilterCriteria {
            project_id,
            status,
            priority,
            search,
        })
}

pub fn arb_sort() -> impl Strategy<Value = SortCriteria> {
    (
        prop_oneof![
            Just(SortField::CreatedAt),
            Just(SortField::Priority),
            Just(SortField::Title),
            Just(SortField::Status),
        ],
        prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)],
    )
        .prop_map(|(field, direction)| SortCriteria::new(field, direction))
}
