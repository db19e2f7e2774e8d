//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::{
    FeedbackType, IdeaCategory, IdeaStatus, Impact, InviteStatus, LinkType, MemberRole, SettingKey,
    SprintStatus, TimeCategory,
};
use crate::sync::MergeStrategy;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// PlanUp CLI - Issues, sprints, epics and ideas from the terminal
#[derive(Parser, Debug)]
#[command(name = "pu", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.planup/data/planup.db)
    #[arg(long, global = true, env = "PU_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "PU_ACTOR")]
    pub actor: Option<String>,

    /// Project key to operate on (default: current project)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Output as JSON
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID/key (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Preview changes without writing to the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Flags shared by every command handler.
#[derive(Debug, Clone, Copy)]
pub struct Globals<'a> {
    pub db: Option<&'a PathBuf>,
    pub actor: Option<&'a str>,
    pub project: Option<&'a str>,
    pub json: bool,
}

impl Cli {
    /// Borrow the global flags, with the resolved JSON mode.
    #[must_use]
    pub fn globals(&self, json: bool) -> Globals<'_> {
        Globals {
            db: self.db.as_ref(),
            actor: self.actor.as_deref(),
            project: self.project.as_deref(),
            json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the PlanUp database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Issue management
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Sprint planning
    Sprint {
        #[command(subcommand)]
        command: SprintCommands,
    },

    /// Epic management
    Epic {
        #[command(subcommand)]
        command: EpicCommands,
    },

    /// Organizations, members and invites
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Idea incubator
    Idea {
        #[command(subcommand)]
        command: IdeaCommands,
    },

    /// Sprint retrospectives
    Retro {
        #[command(subcommand)]
        command: RetroCommands,
    },

    /// Workflows (status lists and transitions)
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommands,
    },

    /// Saved and quick filters
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// Issue templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Recent activity feed
    Activity(ActivityArgs),

    /// Project reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Preferences (theme, current project, current organization)
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Sync with JSONL files
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
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
// Project Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create(ProjectCreateArgs),

    /// List all projects
    List,

    /// Show project details
    Show {
        /// Project key or ID
        key: String,
    },

    /// Update project settings
    Update(ProjectUpdateArgs),

    /// Delete a project and everything in it
    Delete {
        /// Project key or ID
        key: String,

        /// Skip confirmation and delete
        #[arg(short, long)]
        force: bool,
    },

    /// Make a project the current one
    Use {
        /// Project key or ID
        key: String,
    },
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project name
    pub name: String,

    /// Issue key prefix (default: derived from the name)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Project description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Project lead
    #[arg(long)]
    pub lead: Option<String>,

    /// Workflow ID (agile, bug, feature or a custom one)
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Owning organization (name or ID)
    #[arg(long)]
    pub org: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProjectUpdateArgs {
    /// Project key or ID
    pub key: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New lead
    #[arg(long, conflicts_with = "no_lead")]
    pub lead: Option<String>,

    /// Clear the lead
    #[arg(long)]
    pub no_lead: bool,

    /// Owning organization (name or ID)
    #[arg(long, conflicts_with = "no_org")]
    pub org: Option<String>,

    /// Detach from its organization
    #[arg(long)]
    pub no_org: bool,
}

// ============================================================================
// Issue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// Create a new issue
    Create(IssueCreateArgs),

    /// List issues
    List(IssueListArgs),

    /// Show issue details
    Show {
        /// Issue key or ID
        id: String,
    },

    /// Update an issue
    Update(IssueUpdateArgs),

    /// Delete issue(s)
    Delete {
        /// Issue keys (one or more)
        ids: Vec<String>,
    },

    /// Search issues by text
    Search {
        /// Text to look for in title, description, key and assignee
        text: String,

        /// Search every project
        #[arg(long)]
        all: bool,

        /// Maximum results
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Run a query over the project's issues
    Query {
        /// Query (e.g. `status = "In Progress" AND priority != High`)
        query: String,

        /// Reject malformed clauses instead of ignoring them
        #[arg(long)]
        strict: bool,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Move an issue through its workflow
    Transition {
        /// Issue key or ID
        id: String,

        /// Target status or transition label
        target: String,
    },

    /// List transitions available from an issue's status
    Transitions {
        /// Issue key or ID
        id: String,
    },

    /// Issue comments
    Comment {
        #[command(subcommand)]
        command: IssueCommentCommands,
    },

    /// Log time against an issue
    Log(IssueLogArgs),

    /// Time log entries
    Timelog {
        #[command(subcommand)]
        command: TimelogCommands,
    },

    /// Attach a file or URL to an issue
    Attach(IssueAttachArgs),

    /// Issue attachments
    Attachment {
        #[command(subcommand)]
        command: AttachmentCommands,
    },

    /// Decision log
    Decision {
        #[command(subcommand)]
        command: DecisionCommands,
    },

    /// Links between issues
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// Sub-tasks
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
}

#[derive(Args, Debug, Default)]
pub struct IssueCreateArgs {
    /// Issue title
    pub title: String,

    /// Issue description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Issue type (bug, story, task)
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// Priority (high, medium, low)
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Initial status (default: the workflow's first status)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Assignee
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Estimated hours
    #[arg(short, long)]
    pub estimate: Option<f64>,

    /// Story points
    #[arg(long)]
    pub points: Option<i64>,

    /// Labels (-l ui -l auth or -l ui,auth)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Components (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Epic key or ID
    #[arg(long)]
    pub epic: Option<String>,

    /// Sprint name or ID
    #[arg(long)]
    pub sprint: Option<String>,

    /// Apply a template by name
    #[arg(long)]
    pub template: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct IssueListArgs {
    /// Filter by status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by priority
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Filter by type
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// Filter by assignee
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Filter by label
    #[arg(long)]
    pub label: Option<String>,

    /// Filter by sprint name
    #[arg(long)]
    pub sprint: Option<String>,

    /// Filter by epic key
    #[arg(long)]
    pub epic: Option<String>,

    /// Extra query clauses
    #[arg(long)]
    pub query: Option<String>,

    /// Saved or quick filter name
    #[arg(short, long)]
    pub filter: Option<String>,

    /// List issues from every project
    #[arg(long)]
    pub all: bool,

    /// Maximum issues to return
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct IssueUpdateArgs {
    /// Issue key or ID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New status (direct write; must belong to the workflow)
    #[arg(short, long)]
    pub status: Option<String>,

    /// New priority
    #[arg(short, long)]
    pub priority: Option<String>,

    /// New type
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// New assignee
    #[arg(short, long, conflicts_with = "unassign")]
    pub assignee: Option<String>,

    /// Clear the assignee
    #[arg(long)]
    pub unassign: bool,

    /// Due date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "no_due")]
    pub due: Option<String>,

    /// Clear the due date
    #[arg(long)]
    pub no_due: bool,

    /// Estimated hours
    #[arg(short, long)]
    pub estimate: Option<f64>,

    /// Story points
    #[arg(long)]
    pub points: Option<i64>,

    /// Labels to add
    #[arg(long, value_delimiter = ',')]
    pub add_label: Vec<String>,

    /// Labels to remove
    #[arg(long, value_delimiter = ',')]
    pub remove_label: Vec<String>,

    /// Replace components (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub components: Option<Vec<String>>,

    /// Move to an epic (key or ID)
    #[arg(long, conflicts_with = "no_epic")]
    pub epic: Option<String>,

    /// Detach from its epic
    #[arg(long)]
    pub no_epic: bool,

    /// Move to a sprint (name or ID)
    #[arg(long, conflicts_with = "no_sprint")]
    pub sprint: Option<String>,

    /// Move back to the backlog
    #[arg(long)]
    pub no_sprint: bool,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommentCommands {
    /// Add a comment
    Add {
        /// Issue key or ID
        id: String,

        /// Comment text
        content: String,
    },

    /// List comments
    List {
        /// Issue key or ID
        id: String,
    },

    /// Edit your comment
    Edit {
        /// Comment ID
        comment_id: String,

        /// New text
        content: String,
    },

    /// Delete your comment
    Delete {
        /// Comment ID
        comment_id: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueLogArgs {
    /// Issue key or ID
    pub id: String,

    /// Hours worked (> 0)
    pub hours: f64,

    /// What was done
    #[arg(short, long)]
    pub description: Option<String>,

    /// Work category
    #[arg(short, long, value_enum, default_value_t)]
    pub category: TimeCategory,

    /// Work date (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TimelogCommands {
    /// List time logged on an issue
    List {
        /// Issue key or ID
        id: String,
    },

    /// Delete a time log entry
    Delete {
        /// Time log ID
        log_id: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueAttachArgs {
    /// Issue key or ID
    pub id: String,

    /// File path or URL
    pub location: String,

    /// Display name (default: the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AttachmentCommands {
    /// List attachments
    List {
        /// Issue key or ID
        id: String,
    },

    /// Remove an attachment
    Remove {
        /// Attachment ID
        attachment_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DecisionCommands {
    /// Append a decision
    Add {
        /// Issue key or ID
        id: String,

        /// Decision text
        entry: String,
    },

    /// List decisions
    List {
        /// Issue key or ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Link two issues
    Add {
        /// Source issue key or ID
        source: String,

        /// Target issue key or ID
        target: String,

        /// Link type
        #[arg(short = 't', long = "type", value_enum, default_value = "relates-to")]
        link_type: LinkType,
    },

    /// List links in both directions
    List {
        /// Issue key or ID
        id: String,
    },

    /// Remove a link
    Remove {
        /// Link ID
        link_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommands {
    /// Add a sub-task
    Add {
        /// Parent issue key or ID
        id: String,

        /// Sub-task title
        title: String,

        /// Assignee
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// List sub-tasks
    List {
        /// Parent issue key or ID
        id: String,
    },

    /// Mark a sub-task in progress
    Start {
        /// Sub-task ID
        subtask_id: String,
    },

    /// Mark a sub-task done
    Done {
        /// Sub-task ID
        subtask_id: String,
    },

    /// Reopen a sub-task
    Reopen {
        /// Sub-task ID
        subtask_id: String,
    },

    /// Delete a sub-task
    Delete {
        /// Sub-task ID
        subtask_id: String,
    },
}

// ============================================================================
// Sprint Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SprintCommands {
    /// Create a sprint
    Create(SprintCreateArgs),

    /// List sprints
    List {
        /// Filter by status
        #[arg(short, long, value_enum)]
        status: Option<SprintStatus>,
    },

    /// Show sprint details and progress
    Show {
        /// Sprint name or ID
        sprint: String,
    },

    /// Update a sprint
    Update(SprintUpdateArgs),

    /// Delete a sprint (its issues return to the backlog)
    Delete {
        /// Sprint name or ID
        sprint: String,
    },

    /// Add issues to a sprint
    AddIssue {
        /// Sprint name or ID
        sprint: String,

        /// Issue keys
        #[arg(required = true)]
        issues: Vec<String>,
    },

    /// Remove issues from a sprint
    RemoveIssue {
        /// Sprint name or ID
        sprint: String,

        /// Issue keys
        #[arg(required = true)]
        issues: Vec<String>,
    },

    /// Start a planned sprint
    Start {
        /// Sprint name or ID
        sprint: String,
    },

    /// Complete the active sprint
    Complete {
        /// Sprint name or ID
        sprint: String,

        /// Move unfinished issues to this sprint instead of the backlog
        #[arg(long)]
        move_to: Option<String>,
    },

    /// Show the active sprint
    Active,
}

#[derive(Args, Debug)]
pub struct SprintCreateArgs {
    /// Sprint name
    pub name: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Sprint goal
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Capacity in story points
    #[arg(short, long)]
    pub capacity: Option<i64>,

    /// Team members (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub members: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SprintUpdateArgs {
    /// Sprint name or ID
    pub sprint: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New goal
    #[arg(short, long)]
    pub goal: Option<String>,

    /// New start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// New end date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// New capacity
    #[arg(short, long)]
    pub capacity: Option<i64>,

    /// Replace team members (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub members: Option<Vec<String>>,
}

// ============================================================================
// Epic Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum EpicCommands {
    /// Create an epic
    Create {
        /// Epic title
        title: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Status (To Do, In Progress, Done)
        #[arg(short, long)]
        status: Option<String>,

        /// Assignee
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// List epics
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by assignee
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// Show an epic with its issues
    Show {
        /// Epic key or ID
        id: String,
    },

    /// Update an epic
    Update {
        /// Epic key or ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,

        /// New assignee
        #[arg(short, long, conflicts_with = "unassign")]
        assignee: Option<String>,

        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Delete an epic (its issues are detached)
    Delete {
        /// Epic key or ID
        id: String,
    },

    /// Add issues to an epic
    AddIssue {
        /// Epic key or ID
        epic: String,

        /// Issue keys
        #[arg(required = true)]
        issues: Vec<String>,
    },

    /// Remove issues from an epic
    RemoveIssue {
        /// Epic key or ID
        epic: String,

        /// Issue keys
        #[arg(required = true)]
        issues: Vec<String>,
    },
}

// ============================================================================
// Organization Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    /// Create an organization (you become its owner)
    Create {
        /// Organization name
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List your organizations
    List {
        /// List every organization
        #[arg(long)]
        all: bool,
    },

    /// Show an organization
    Show {
        /// Organization name or ID (default: current)
        org: Option<String>,
    },

    /// List members
    Members {
        /// Organization name or ID (default: current)
        org: Option<String>,
    },

    /// Join an organization
    Join {
        /// Organization name or ID
        org: String,
    },

    /// Leave an organization
    Leave {
        /// Organization name or ID
        org: String,
    },

    /// Make an organization the current one
    Switch {
        /// Organization name or ID
        org: String,
    },

    /// Show the current organization
    Current,

    /// Invite someone by email
    Invite {
        /// Email address
        email: String,

        /// Organization name or ID (default: current)
        #[arg(long)]
        org: Option<String>,

        /// Role granted on acceptance
        #[arg(short, long, value_enum, default_value_t)]
        role: MemberRole,
    },

    /// List invites
    Invites {
        /// Organization name or ID (default: current)
        #[arg(long)]
        org: Option<String>,

        /// Invites addressed to you
        #[arg(long)]
        mine: bool,

        /// Filter by status
        #[arg(short, long, value_enum)]
        status: Option<InviteStatus>,
    },

    /// Accept an invite
    Accept {
        /// Invite ID
        invite_id: String,
    },

    /// Decline an invite
    Decline {
        /// Invite ID
        invite_id: String,
    },

    /// Cancel a pending invite
    Cancel {
        /// Invite ID
        invite_id: String,
    },
}

// ============================================================================
// Idea Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IdeaCommands {
    /// Submit an idea
    Create {
        /// Idea title
        title: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Category
        #[arg(short, long, value_enum, default_value_t)]
        category: IdeaCategory,

        /// Impact
        #[arg(short, long, value_enum, default_value_t)]
        impact: Impact,

        /// Tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List ideas, most upvoted first
    List {
        /// Filter by status
        #[arg(short, long, value_enum)]
        status: Option<IdeaStatus>,

        /// Filter by category
        #[arg(short, long, value_enum)]
        category: Option<IdeaCategory>,
    },

    /// Show an idea with its comments
    Show {
        /// Idea ID
        id: String,
    },

    /// Upvote an idea
    Upvote {
        /// Idea ID
        id: String,
    },

    /// Idea comments
    Comment {
        #[command(subcommand)]
        command: IdeaCommentCommands,
    },

    /// Set an idea's status
    Status {
        /// Idea ID
        id: String,

        /// New status
        #[arg(value_enum)]
        status: IdeaStatus,
    },

    /// Toggle your endorsement
    Endorse {
        /// Idea ID
        id: String,
    },

    /// Promote an idea (with --project, also create a Story issue)
    Promote {
        /// Idea ID
        id: String,
    },

    /// Delete an idea
    Delete {
        /// Idea ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdeaCommentCommands {
    /// Comment on an idea
    Add {
        /// Idea ID
        id: String,

        /// Comment text
        content: String,
    },

    /// Edit your comment
    Edit {
        /// Comment ID
        comment_id: String,

        /// New text
        content: String,
    },
}

// ============================================================================
// Retrospective Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RetroCommands {
    /// Add feedback
    Add {
        /// Feedback type
        #[arg(value_enum)]
        feedback_type: FeedbackType,

        /// Feedback text
        text: String,

        /// Sprint name or ID
        #[arg(long)]
        sprint: Option<String>,
    },

    /// List feedback grouped by type
    List {
        /// Sprint name or ID
        #[arg(long)]
        sprint: Option<String>,

        /// Filter by type
        #[arg(short = 't', long = "type", value_enum)]
        feedback_type: Option<FeedbackType>,

        /// Only unresolved items
        #[arg(long)]
        unresolved: bool,
    },

    /// Edit feedback text
    Edit {
        /// Feedback ID
        id: String,

        /// New text
        text: String,
    },

    /// Mark feedback resolved
    Resolve {
        /// Feedback ID
        id: String,
    },

    /// Mark feedback unresolved
    Unresolve {
        /// Feedback ID
        id: String,
    },

    /// Delete feedback
    Delete {
        /// Feedback ID
        id: String,
    },
}

// ============================================================================
// Workflow Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List workflows
    List,

    /// Show a workflow (default: the current project's)
    Show {
        /// Workflow ID or name
        id: Option<String>,
    },

    /// Create a custom workflow
    Create(WorkflowCreateArgs),

    /// Delete a custom workflow
    Delete {
        /// Workflow ID or name
        id: String,
    },

    /// Switch the current project to a workflow
    Use {
        /// Workflow ID or name
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct WorkflowCreateArgs {
    /// Workflow name
    pub name: String,

    /// Ordered statuses; the first is the initial status
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub statuses: Vec<String>,

    /// Transitions as `Label:From->To` (repeatable)
    #[arg(short = 't', long = "transition")]
    pub transitions: Vec<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Display color (e.g. #4CAF50)
    #[arg(long)]
    pub color: Option<String>,
}

// ============================================================================
// Filter Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FilterCommands {
    /// List quick and saved filters
    List,

    /// Show a filter
    Show {
        /// Filter name or ID
        name: String,
    },

    /// Save a filter
    Save {
        /// Filter name
        name: String,

        /// Query
        query: String,

        /// Scope the filter to the current project
        #[arg(long)]
        scoped: bool,
    },

    /// Delete a saved filter
    Delete {
        /// Filter name or ID
        name: String,
    },

    /// Run a filter over the project's issues
    Run {
        /// Filter name or ID
        name: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

// ============================================================================
// Template Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Create a template
    Create(TemplateCreateArgs),

    /// List templates
    List,

    /// Show a template
    Show {
        /// Template name or ID
        name: String,
    },

    /// Delete a template
    Delete {
        /// Template name or ID
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct TemplateCreateArgs {
    /// Template name
    pub name: String,

    /// Description of when to use it
    #[arg(short, long)]
    pub description: Option<String>,

    /// Issue type
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// Priority
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Prefix prepended to issue titles (e.g. "[Bug] ")
    #[arg(long)]
    pub title_prefix: Option<String>,

    /// Description body for new issues
    #[arg(short, long)]
    pub body: Option<String>,

    /// Labels (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,
}

// ============================================================================
// Activity / Report / Settings
// ============================================================================

#[derive(Args, Debug)]
pub struct ActivityArgs {
    /// Only events for this issue (key or ID)
    #[arg(long)]
    pub issue: Option<String>,

    /// Only this entity type (issue, sprint, epic, idea, ...)
    #[arg(long)]
    pub entity: Option<String>,

    /// Only events by this actor
    #[arg(long)]
    pub by: Option<String>,

    /// Maximum events
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Counts, hours, sprint and epic progress for the project
    Summary,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Read a setting
    Get {
        #[arg(value_enum)]
        key: SettingKey,
    },

    /// Write a setting
    Set {
        #[arg(value_enum)]
        key: SettingKey,

        /// New value
        value: String,
    },

    /// Remove a setting
    Unset {
        #[arg(value_enum)]
        key: SettingKey,
    },

    /// List all settings
    List,
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Export the database to JSONL files
    Export {
        /// Output directory (default: `sync/` next to the database)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite files even if records would be lost
        #[arg(long)]
        force: bool,
    },

    /// Import JSONL files into the database
    Import {
        /// Input directory (default: `sync/` next to the database)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Conflict resolution strategy
        #[arg(short, long, value_enum, default_value_t)]
        strategy: MergeStrategy,
    },

    /// Compare database and JSONL record counts
    Status {
        /// Sync directory (default: `sync/` next to the database)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_issue_create() {
        let cli = Cli::try_parse_from([
            "pu", "issue", "create", "Login crash", "-t", "bug", "-l", "auth,ui", "--project", "MOB",
        ])
        .unwrap();
        assert_eq!(cli.project.as_deref(), Some("MOB"));
        match cli.command {
            Commands::Issue {
                command: IssueCommands::Create(args),
            } => {
                assert_eq!(args.title, "Login crash");
                assert_eq!(args.issue_type.as_deref(), Some("bug"));
                assert_eq!(args.labels, vec!["auth", "ui"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_sync_strategy() {
        let cli = Cli::try_parse_from(["pu", "sync", "import", "--strategy", "keep-local"]).unwrap();
        match cli.command {
            Commands::Sync {
                command: SyncCommands::Import { strategy, .. },
            } => assert_eq!(strategy, MergeStrategy::KeepLocal),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
