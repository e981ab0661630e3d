use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
#[command(group(
    ArgGroup::new("target")
        .args(["dir", "area"])
))]
/// Top-level CLI options for vcstore.
pub struct Cli {
    /// Configuration file describing svn credentials and storage areas
    #[arg(long, global = true, value_name = "FILE", env = "VCSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage directory to operate on (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Named storage area from the configuration file
    #[arg(long, global = true, value_name = "NAME")]
    pub area: Option<String>,

    /// Repository username; without one the directory is pass-through
    #[arg(long, global = true, env = "VCSTORE_SVN_USERNAME")]
    pub username: Option<String>,

    /// Repository password
    #[arg(long, global = true, env = "VCSTORE_SVN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Write to disk only, never touching version control
    #[arg(long, global = true)]
    pub pass_through: bool,

    /// Append svn commands to a script instead of committing
    #[arg(long, global = true)]
    pub export_script: bool,

    /// Seconds between background commit checks
    #[arg(long, global = true, value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Suppress all output
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

#[derive(Subcommand)]
/// CLI subcommands supported by vcstore.
pub enum Commands {
    /// Commit the current contents of a file
    Commit {
        /// File to commit, absolute or relative to the storage directory
        path: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Move a file and commit both its old and new location
    #[command(alias = "mv")]
    Move {
        /// Current location
        old: PathBuf,

        /// New location
        new: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Delete a file or directory and commit the deletion
    #[command(alias = "rm")]
    Delete {
        /// File or directory to delete
        path: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Write a file from another file (or stdin) and commit it
    Write {
        /// Destination inside the storage directory
        path: PathBuf,

        /// Source of the new contents; `-` reads stdin
        #[arg(long, value_name = "FILE")]
        from: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Show the working-copy status of paths
    #[command(alias = "st")]
    Status {
        /// Paths to inspect
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
