//! Command-line interface for the `attendance` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::Verbosity;

/// attendance - face-recognition check-in
///
/// Shows the camera feed, recognizes people from the roster database and
/// logs their check-in time.
#[derive(Debug, Parser)]
#[command(name = "attendance")]
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

    /// The command to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the check-in window
    Run,

    /// Add a person and their reference photo to the roster
    Enroll(EnrollCommand),

    /// List the roster records
    Roster,
}

#[derive(Debug, Args)]
pub struct EnrollCommand {
    /// Display name of the person
    #[arg(short, long)]
    pub name: String,

    /// Image file with the person's face
    #[arg(short, long, value_name = "FILE")]
    pub picture: PathBuf,
}
