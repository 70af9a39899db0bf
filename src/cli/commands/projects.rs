//! Project command implementations.

use std::sync::Arc;

use serde::Serialize;

use crate::api::HttpApi;
use crate::cli::ProjectsCommands;
use crate::config::{Overrides, Settings, SettingsToken};
use crate::error::{Error, Result};
use crate::model::Project;
use crate::stream::{HttpTransport, SseEndpoints, StreamRegistry};
use crate::view::ProjectView;

#[derive(Serialize)]
struct ProjectListOutput<'a> {
    projects: &'a [Project],
    count: usize,
}

/// Execute project commands.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved or the fetch fails.
pub fn execute(command: &ProjectsCommands, overrides: &Overrides, json: bool) -> Result<()> {
    let settings = Settings::load(overrides)?;
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    rt.block_on(async {
        match command {
            ProjectsCommands::List => list(&settings, json).await,
            ProjectsCommands::Watch => watch(&settings, json).await,
        }
    })
}

async fn list(settings: &Settings, json: bool) -> Result<()> {
    let mut view = build_view(settings)?;
    view.load_once().await?;
    print_projects(view.projects(), json)?;
    view.teardown();
    Ok(())
}

async fn watch(settings: &Settings, json: bool) -> Result<()> {
    let mut view = build_view(settings)?;
    view.activate().await?;
    print_projects(view.projects(), json)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            item = view.pump() => match item {
                Some(Ok(true)) => print_projects(view.projects(), json)?,
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

fn build_view(settings: &Settings) -> Result<ProjectView<HttpApi, HttpTransport>> {
    let api = Arc::new(HttpApi::new(&settings.api_url, settings.token.clone())?);
    let registry = StreamRegistry::new(
        Arc::new(HttpTransport::new()),
        Arc::new(SettingsToken::from(settings)),
    )
    .with_policy(settings.reconnect);
    Ok(ProjectView::new(api, registry, SseEndpoints::new(&settings.api_url)))
}

fn print_projects(projects: &[Project], json: bool) -> Result<()> {
    use colored::Colorize;

    if json {
        let output = ProjectListOutput {
            projects,
            count: projects.len(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("{} ({} found):", "Projects".bold(), projects.len());
    println!();
    for project in projects {
        let issues = project
            .issue_count
            .map(|n| format!(" - {n} issues"))
            .unwrap_or_default();
        println!("  [{}] {}{}", project.id, project.name.bold(), issues.dimmed());
        if let Some(ref desc) = project.description {
            let truncated: String = desc.chars().take(60).collect();
            if truncated.len() < desc.len() {
                println!("        {truncated}...");
            } else if !desc.is_empty() {
                println!("        {desc}");
            }
        }
    }
    Ok(())
}
