//! Issue command implementations.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::api::{HttpApi, IssueApi};
use crate::cli::{IssueCreateArgs, IssueQueryArgs, IssuesCommands};
use crate::config::{Overrides, Settings, SettingsToken};
use crate::error::{Error, Result};
use crate::model::{CreateIssueRequest, Issue, IssuePriority, IssueStatus};
use crate::stream::{HttpTransport, SseEndpoints, StreamRegistry};
use crate::validate::{normalize_priority, normalize_status};
use crate::view::{Change, IssueView, Materialized, PageState, Resolution};

type LiveIssueView = IssueView<HttpApi, HttpTransport>;

/// JSON shape for one rendering of the view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewOutput<'a> {
    page: &'a PageState,
    #[serde(flatten)]
    snapshot: &'a Materialized,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Execute issue commands.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved or the API call fails.
pub fn execute(command: &IssuesCommands, overrides: &Overrides, json: bool) -> Result<()> {
    let settings = Settings::load(overrides)?;
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    match command {
        IssuesCommands::Watch(args) => rt.block_on(watch(&settings, args, json)),
        IssuesCommands::List(args) => rt.block_on(list(&settings, args, json)),
        IssuesCommands::Show { id } => rt.block_on(show(&settings, id, json)),
        IssuesCommands::Move { id, status } => rt.block_on(move_issue(&settings, id, status, json)),
        IssuesCommands::Create(args) => rt.block_on(create(&settings, args, json)),
        IssuesCommands::Delete { id } => rt.block_on(delete(&settings, id, json)),
    }
}

fn build_view(settings: &Settings, api: Arc<HttpApi>) -> LiveIssueView {
    let registry = StreamRegistry::new(
        Arc::new(HttpTransport::new()),
        Arc::new(SettingsToken::from(settings)),
    )
    .with_policy(settings.reconnect);

    IssueView::new(
        api,
        registry,
        SseEndpoints::new(&settings.api_url),
        settings.page_size,
    )
}

fn query_view(settings: &Settings, args: &IssueQueryArgs) -> Result<(Arc<HttpApi>, LiveIssueView)> {
    let api = Arc::new(HttpApi::new(&settings.api_url, settings.token.clone())?);
    let filter = args.filter()?;
    let sort = args.sort()?;

    let mut view_settings = settings.clone();
    view_settings.page_size = args.page_size(settings.page_size);
    let view = build_view(&view_settings, Arc::clone(&api)).with_criteria(filter, sort, args.page);
    Ok((api, view))
}

async fn watch(settings: &Settings, args: &IssueQueryArgs, json: bool) -> Result<()> {
    let (_api, mut view) = query_view(settings, args)?;
    view.activate().await?;
    if let Some(key) = view.subscription() {
        info!(scope = %key, "Watching for issue changes");
    }
    render(&view, args.board, json)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            item = view.pump() => match item {
                Some(Ok(true)) => render(&view, args.board, json)?,
                Some(Ok(false)) => {}
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            },
            _ = &mut ctrl_c => break Ok(()),
        }
    };

    view.teardown();
    outcome
}

async fn list(settings: &Settings, args: &IssueQueryArgs, json: bool) -> Result<()> {
    let (_api, mut view) = query_view(settings, args)?;
    view.load_once().await?;
    render(&view, args.board, json)?;
    view.teardown();
    Ok(())
}

async fn show(settings: &Settings, id: &str, json: bool) -> Result<()> {
    let api = HttpApi::new(&settings.api_url, settings.token.clone())?;
    let issue = api.get_issue(id).await?;

    if json {
        println!("{}", serde_json::to_string(&issue)?);
    } else {
        print_issue_detail(&issue);
    }
    Ok(())
}

async fn move_issue(settings: &Settings, id: &str, status: &str, json: bool) -> Result<()> {
    let status = normalize_status(status)?;
    let api = Arc::new(HttpApi::new(&settings.api_url, settings.token.clone())?);
    let mut view = build_view(settings, Arc::clone(&api));
    view.load_once().await?;

    // The issue may live on another page
    if view.get(id).is_none() {
        let issue = api.get_issue(id).await?;
        view.apply_change(Change::Updated(issue));
    }

    let resolution = view.move_issue(id, status).await?;
    let moved = view.get(id).cloned();
    view.teardown();

    match resolution {
        Resolution::Refetch { message } => Err(Error::Other(message)),
        Resolution::Committed | Resolution::Stale => {
            let issue = moved.ok_or_else(|| Error::IssueNotFound { id: id.to_string() })?;
            if json {
                println!("{}", serde_json::to_string(&issue)?);
            } else {
                println!("Moved [{}] {} to {}", issue.id, issue.title, issue.status.label());
            }
            Ok(())
        }
    }
}

async fn create(settings: &Settings, args: &IssueCreateArgs, json: bool) -> Result<()> {
    if args.title.trim().is_empty() {
        return Err(Error::InvalidArgument("title must not be empty".to_string()));
    }
    let priority = args.priority.as_deref().map(normalize_priority).transpose()?;
    let request = CreateIssueRequest {
        project_id: args.project.clone(),
        title: args.title.clone(),
        description: args.description.clone(),
        priority,
        assignee_id: args.assignee.clone(),
    };

    let api = HttpApi::new(&settings.api_url, settings.token.clone())?;
    let issue = api.create_issue(&request).await?;

    if json {
        println!("{}", serde_json::to_string(&issue)?);
    } else {
        println!("Created issue [{}]: {}", issue.id, issue.title);
    }
    Ok(())
}

async fn delete(settings: &Settings, id: &str, json: bool) -> Result<()> {
    let api = HttpApi::new(&settings.api_url, settings.token.clone())?;
    api.delete_issue(id).await?;

    if json {
        println!("{}", serde_json::to_string(&DeleteOutput { id, deleted: true })?);
    } else {
        println!("Deleted issue [{id}]");
    }
    Ok(())
}

// ── Rendering ─────────────────────────────────────────────────

fn render(view: &LiveIssueView, board: bool, json: bool) -> Result<()> {
    if json {
        let output = ViewOutput {
            page: view.page(),
            snapshot: view.snapshot(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if let Some(error) = view.error() {
        use colored::Colorize;
        eprintln!("{}", error.red());
    }

    if board {
        print_board(view.snapshot());
    } else {
        print_issue_list(view.snapshot(), view.page());
    }
    Ok(())
}

fn status_icon(status: IssueStatus) -> &'static str {
    match status {
        IssueStatus::Open => "○",
        IssueStatus::InProgress => "●",
        IssueStatus::Closed => "✓",
    }
}

const fn priority_mark(priority: IssuePriority) -> &'static str {
    match priority {
        IssuePriority::Critical => "!!",
        IssuePriority::High => "! ",
        IssuePriority::Medium => "  ",
        IssuePriority::Low => "- ",
    }
}

fn issue_line(issue: &Issue) -> String {
    let project = issue.project_name.as_deref().unwrap_or(&issue.project_id);
    format!(
        "{} [{}] {} {} ({project})",
        status_icon(issue.status),
        issue.id,
        priority_mark(issue.priority),
        issue.title
    )
}

fn print_issue_list(snapshot: &Materialized, page: &PageState) {
    use colored::Colorize;

    let total_pages = page.total_pages.max(1);
    println!(
        "{} (page {}/{total_pages}, {} total):",
        "Issues".bold(),
        page.page + 1,
        page.total_elements
    );
    println!();

    if snapshot.matched.is_empty() {
        println!("No issues found.");
        return;
    }
    for issue in &snapshot.matched {
        println!("{}", issue_line(issue));
    }
}

fn print_board(snapshot: &Materialized) {
    use colored::Colorize;

    for status in IssueStatus::ALL {
        let column = snapshot.partitions.column(status);
        println!("{} ({})", status.label().bold(), column.len());
        if column.is_empty() {
            println!("  {}", "(empty)".dimmed());
        }
        for issue in column {
            println!("  {}", issue_line(issue));
        }
        println!();
    }
}

fn print_issue_detail(issue: &Issue) {
    use colored::Colorize;

    println!("{} {}", status_icon(issue.status), issue.title.bold());
    println!("  ID:       {}", issue.id);
    println!(
        "  Project:  {}",
        issue.project_name.as_deref().unwrap_or(&issue.project_id)
    );
    println!("  Status:   {}", issue.status.label());
    println!("  Priority: {}", issue.priority.as_str());
    if let Some(ref assignee) = issue.assignee {
        println!("  Assignee: {}", assignee.full_name);
    }
    if let Some(created_at) = issue.created_at {
        println!("  Created:  {}", created_at.format("%Y-%m-%d %H:%M"));
    }
    if let Some(ref desc) = issue.description {
        if !desc.is_empty() {
            println!();
            println!("{desc}");
        }
    }
}
