//! CLI type definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::domain::models::HealingScope;

#[derive(Parser, Debug)]
#[command(name = "apiheal")]
#[command(about = "Generate, run, triage and heal API test suites", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Identity attached to every backend call
    #[arg(short, long, global = true, env = "APIHEAL_USER")]
    pub user: Option<String>,

    /// Answer from the built-in demo backend instead of the remote service
    #[arg(long, global = true)]
    pub offline: bool,

    /// Settle stages left in progress by a process that exited mid-call
    #[arg(long, global = true)]
    pub recover: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the workflow state of the active project
    Status,

    /// Upload a project archive and discover its endpoints
    Upload {
        /// Path to the archive
        file: PathBuf,
    },

    /// Clone a remote repository and discover its endpoints
    Clone {
        /// Repository URL
        url: String,
        /// Access token for private repositories
        #[arg(long, env = "APIHEAL_GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Generate a test suite for the ingested project
    Generate {
        /// Base URL of the API under test (remembered for later runs)
        #[arg(long)]
        base_url: Option<String>,
        /// Retry even though the last attempt hit the usage limit
        #[arg(long)]
        force: bool,
    },

    /// Process a pending automatic generation request
    Tick,

    /// Run the generated test suite
    Run,

    /// Show failures (or the raw log) of the last run
    Failures,

    /// Ask the remote agent to repair the test file or diagnose the code
    Heal {
        /// What to heal
        #[arg(value_enum)]
        target: HealTarget,
        /// Only heal this failing test id
        #[arg(long)]
        failure: Option<String>,
        /// Re-run the suite after a successful test heal
        #[arg(long)]
        retest: bool,
    },

    /// List previous test runs, newest first
    History,

    /// Show dashboard statistics and analytics
    Stats,

    /// Clear the generation log
    ClearLog,

    /// End the session and erase local state for the user
    Logout,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealTarget {
    /// Rewrite the generated test file
    Test,
    /// Diagnose the application code under test
    Code,
}

impl From<HealTarget> for HealingScope {
    fn from(target: HealTarget) -> Self {
        match target {
            HealTarget::Test => Self::Test,
            HealTarget::Code => Self::Code,
        }
    }
}
