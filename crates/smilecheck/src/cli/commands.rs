//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::model::AttendanceStatus;

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Full name
    #[arg(short, long)]
    pub name: String,

    /// Email address (must not already be registered)
    #[arg(short, long)]
    pub email: String,

    /// Department or team
    #[arg(short, long)]
    pub department: String,

    /// Image file holding the face capture
    #[arg(short, long, value_name = "FILE")]
    pub face: PathBuf,
}

/// User management commands.
#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List registered users
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one user
    Show {
        /// User id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change fields of a user
    Update {
        /// User id
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New email address
        #[arg(long)]
        email: Option<String>,

        /// New department
        #[arg(long)]
        department: Option<String>,

        /// New face capture image
        #[arg(long, value_name = "FILE")]
        face: Option<PathBuf>,
    },

    /// Delete a user and all of their attendance records
    Delete {
        /// User id
        id: String,
    },
}

/// Mark command arguments.
#[derive(Debug, Args)]
pub struct MarkCommand {
    /// User id
    pub user_id: String,

    /// Status to record for today
    #[arg(short, long, value_enum, default_value = "present")]
    pub status: StatusArg,
}

/// Identify command arguments.
#[derive(Debug, Args)]
pub struct IdentifyCommand {
    /// Image file holding the face capture
    #[arg(short, long, value_name = "FILE")]
    pub face: PathBuf,
}

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Image files replayed as camera frames, in order
    #[arg(short, long = "frame", value_name = "FILE", required = true)]
    pub frames: Vec<PathBuf>,

    /// Recognize the first registered user after the configured delay
    #[arg(long)]
    pub simulate: bool,
}

/// Attendance listing arguments.
#[derive(Debug, Args)]
pub struct AttendanceCommand {
    /// Only records of this user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only records on this day (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// User id
    pub user_id: String,

    /// Only list records from the last N days (0 lists all)
    #[arg(long, default_value = "0")]
    pub days: u32,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Attendance status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Present
    Present,
    /// Absent
    Absent,
    /// Late
    Late,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Present => Self::Present,
            StatusArg::Absent => Self::Absent,
            StatusArg::Late => Self::Late,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
