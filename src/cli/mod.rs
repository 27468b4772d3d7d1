//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod completions;
pub mod config;
pub mod context;
pub mod task;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// offtask - offline-first task list with a versioned response cache
#[derive(Parser, Debug)]
#[command(name = "offtask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "OFFTASK_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "OFFTASK_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "OFFTASK_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Manage the offline response cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks, newest first
    #[command(visible_alias = "ls")]
    List {
        /// Only completed tasks
        #[arg(long, conflicts_with = "pending")]
        completed: bool,

        /// Only tasks not yet completed
        #[arg(long)]
        pending: bool,
    },

    /// Show one task
    Show {
        /// Task ID
        id: String,
    },

    /// Add a task
    Add {
        /// Task title (1-100 characters)
        title: String,

        /// Optional description (up to 500 characters)
        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// Change fields of an existing task
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Completion flag
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Mark a task completed
    Done {
        /// Task ID
        id: String,
    },

    /// Delete a task (unknown IDs are ignored)
    #[command(visible_alias = "rm")]
    Delete {
        /// Task ID
        id: String,
    },

    /// Delete every task
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Offline cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Install the current version: warm its snapshot with the precache list
    Install,

    /// Activate the current version and delete stale snapshots
    Activate,

    /// Fetch a resource through the controller
    Fetch {
        /// Path on the configured origin, or an absolute URL
        target: String,

        /// Request as a document navigation (accept: text/html)
        #[arg(long)]
        html: bool,

        /// HTTP method; anything but GET bypasses the cache
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Print only headers and source, not the body
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Post a control message, e.g. '{"type":"SKIP_WAITING"}'
    Message {
        /// JSON message
        json: String,
    },

    /// Show snapshot storage status
    Status,

    /// List entries of a snapshot (defaults to the current version)
    Snapshots {
        /// Snapshot name
        name: Option<String>,
    },

    /// Delete every snapshot
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Print the data directory
    Path,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
