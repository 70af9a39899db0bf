//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Overrides;
use crate::error::Result;
use crate::validate::{normalize_priority, normalize_status};
use crate::view::{DEFAULT_PAGE_SIZE, FilterCriteria, SortCriteria};

pub mod commands;

/// Output format for list/watch commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
}

/// Live issue tracker client
#[derive(Parser, Debug)]
#[command(name = "itl", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (default: http://localhost:8080/api)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides ITL_TOKEN and the config file)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Settings given on the command line.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue list, board and status moves
    Issues {
        #[command(subcommand)]
        command: IssuesCommands,
    },

    /// Project list
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },

    /// Manage ~/.issuetracker/config.json
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Issue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IssuesCommands {
    /// Show a live view that updates as issues change
    Watch(IssueQueryArgs),

    /// Fetch and print one page
    List(IssueQueryArgs),

    /// Show one issue
    Show {
        /// Issue ID
        id: String,
    },

    /// Move an issue to another status (accepts synonyms: done, wip, todo)
    Move {
        /// Issue ID
        id: String,

        /// Target status
        status: String,
    },

    /// Create an issue
    Create(IssueCreateArgs),

    /// Delete an issue
    Delete {
        /// Issue ID
        id: String,
    },
}

/// Filter, sort and paging flags shared by `watch` and `list`.
#[derive(Args, Debug, Clone)]
pub struct IssueQueryArgs {
    /// Only issues of this project (also scopes the live stream)
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Filter by priority (LOW..CRITICAL or P0-P3)
    #[arg(long)]
    pub priority: Option<String>,

    /// Case-insensitive title search (whitespace-only counts as none)
    #[arg(long)]
    pub search: Option<String>,

    /// Sort as <field>,<direction>
    #[arg(long, default_value = "createdAt,desc")]
    pub sort: String,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: u32,

    /// Page size (default from config, else 20)
    #[arg(long)]
    pub size: Option<u32>,

    /// Show status columns instead of a flat list
    #[arg(long)]
    pub board: bool,
}

impl IssueQueryArgs {
    /// Filter criteria from the flags.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown statuses or priorities.
    pub fn filter(&self) -> Result<FilterCriteria> {
        Ok(FilterCriteria {
            project_id: self.project.clone(),
            status: self.status.as_deref().map(normalize_status).transpose()?,
            priority: self.priority.as_deref().map(normalize_priority).transpose()?,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    /// Sort criteria from `--sort`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unknown field or direction.
    pub fn sort(&self) -> Result<SortCriteria> {
        self.sort.parse()
    }

    #[must_use]
    pub fn page_size(&self, configured: u32) -> u32 {
        self.size.filter(|s| *s > 0).unwrap_or(if configured == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            configured
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct IssueCreateArgs {
    /// Owning project ID
    #[arg(long, short = 'p')]
    pub project: String,

    /// Issue title
    pub title: String,

    /// Description
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Priority (LOW..CRITICAL or P0-P3)
    #[arg(long)]
    pub priority: Option<String>,

    /// Assignee user ID
    #[arg(long)]
    pub assignee: Option<String>,
}

// ============================================================================
// Project Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// Show a live project list (membership changes appear immediately)
    Watch,

    /// Print the project list once
    List,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where they come from
    Show,

    /// Store the bearer token
    SetToken {
        /// Token issued at login
        #[arg(value_name = "TOKEN")]
        value: String,
    },

    /// Store the API base URL
    SetUrl {
        /// e.g. https://tracker.example.com/api
        url: String,
    },

    /// Delete the config file
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssuePriority, IssueStatus};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_args_to_criteria() {
        let cli = Cli::parse_from([
            "itl", "issues", "list", "--project", "4", "--status", "wip", "--priority", "P1",
            "--sort", "priority,asc",
        ]);
        let Commands::Issues {
            command: IssuesCommands::List(args),
        } = cli.command
        else {
            panic!("expected issues list");
        };

        let filter = args.filter().unwrap();
        assert_eq!(filter.project_id.as_deref(), Some("4"));
        assert_eq!(filter.status, Some(IssueStatus::InProgress));
        assert_eq!(filter.priority, Some(IssuePriority::High));
        assert_eq!(args.sort().unwrap().to_query(), "priority,asc");
        assert_eq!(args.page_size(50), 50);
    }

    #[test]
    fn test_bad_status_is_rejected() {
        let cli = Cli::parse_from(["itl", "issues", "watch", "--status", "blocked"]);
        let Commands::Issues {
            command: IssuesCommands::Watch(args),
        } = cli.command
        else {
            panic!("expected issues watch");
        };
        assert!(args.filter().is_err());
    }

    #[test]
    fn test_search_flag_normalization() {
        let cli = Cli::parse_from(["itl", "issues", "list", "--search", "   "]);
        let Commands::Issues {
            command: IssuesCommands::List(args),
        } = cli.command
        else {
            panic!("expected issues list");
        };
        assert_eq!(args.filter().unwrap().search, None);

        let cli = Cli::parse_from(["itl", "issues", "list", "--search", "fix "]);
        let Commands::Issues {
            command: IssuesCommands::List(args),
        } = cli.command
        else {
            panic!("expected issues list");
        };
        assert_eq!(args.filter().unwrap().search.as_deref(), Some("fix "));
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from(["itl", "projects", "list", "--api-url", "http://x/api", "--token", "t"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.api_url.as_deref(), Some("http://x/api"));
        assert_eq!(overrides.token.as_deref(), Some("t"));
    }
}
