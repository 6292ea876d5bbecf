//! CLI argument parsing for the patch workflow.
//!
//! The CLI is intentionally thin: every subcommand resolves a manifest and
//! hands it to the engine, so the same core logic can be reused elsewhere.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manifest file name looked up under the run root when `--config` is absent.
pub const DEFAULT_MANIFEST_NAME: &str = "interventions.json";

/// Root CLI entrypoint.
///
/// Keeping a single `RootArgs` type makes command routing obvious and avoids
/// hidden defaults in subcommand constructors.
#[derive(Parser, Debug)]
#[command(
    name = "dotpatch",
    version,
    about = "Manifest-driven idempotent text patcher for dotfiles",
    after_help = "Commands:\n  apply   [--config <path>] [--root <dir>]  Apply every intervention transactionally\n  remove  [--config <path>] [--root <dir>]  Take every intervention back out\n  status  [--config <path>] [--root <dir>]  Report per-intervention state, read-only\n\nExamples:\n  dotpatch apply --config interventions.json\n  dotpatch remove --root ~/dotfiles\n  dotpatch status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Apply(RunArgs),
    Remove(RunArgs),
    Status(StatusArgs),
}

/// Inputs shared by the mutating subcommands.
#[derive(Parser, Debug)]
#[command(about = "Apply or remove a manifest of interventions, all-or-nothing")]
pub struct RunArgs {
    /// Manifest location; defaults to interventions.json under the root,
    /// then the user config directory
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that manifest-relative target paths resolve against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Summarize intervention state without mutating anything")]
pub struct StatusArgs {
    /// Manifest location; defaults to interventions.json under the root,
    /// then the user config directory
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that manifest-relative target paths resolve against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
