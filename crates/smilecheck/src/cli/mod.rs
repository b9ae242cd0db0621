//! Command-line interface for smilecheck.
//!
//! This module provides the CLI structure for the `smilecheck` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AttendanceCommand, ConfigCommand, DashboardCommand, IdentifyCommand, MarkCommand,
    OutputFormat, RegisterCommand, ScanCommand, StatusArg, StatusCommand, UsersCommand,
};

/// smilecheck - Face-matched attendance tracking
///
/// Registers people with a face capture, recognizes them from camera frames
/// and keeps one attendance record per person per day.
#[derive(Debug, Parser)]
#[command(name = "smilecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a new user with a face capture
    Register(RegisterCommand),

    /// Manage registered users
    #[command(subcommand)]
    Users(UsersCommand),

    /// Mark a user's attendance for today
    Mark(MarkCommand),

    /// Find the user matching a face capture
    Identify(IdentifyCommand),

    /// Scan camera frames until a registered face is recognized
    Scan(ScanCommand),

    /// List attendance records
    Attendance(AttendanceCommand),

    /// Show a user's attendance summary
    Dashboard(DashboardCommand),

    /// Show store status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
