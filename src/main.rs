use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod engine;
mod manifest;
mod status;
mod txn;

use cli::{Command, RootArgs, RunArgs, StatusArgs, DEFAULT_MANIFEST_NAME};
use txn::RunMode;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match RootArgs::parse().command {
        Command::Apply(args) => cmd_run(args, RunMode::Apply),
        Command::Remove(args) => cmd_run(args, RunMode::Remove),
        Command::Status(args) => cmd_status(args),
    }
}

fn cmd_run(args: RunArgs, mode: RunMode) -> Result<()> {
    let manifest_path = resolve_manifest_path(args.config, &args.root)?;
    let records = manifest::load_records(&manifest_path)?;
    let interventions = manifest::resolve_all(&records)
        .with_context(|| format!("validate manifest {}", manifest_path.display()))?;

    let report = txn::run(&args.root, &interventions, mode)?;
    println!(
        "{} changed, {} skipped",
        report.changed.len(),
        report.skipped.len()
    );
    Ok(())
}

fn cmd_status(args: StatusArgs) -> Result<()> {
    let manifest_path = resolve_manifest_path(args.config, &args.root)?;
    let records = manifest::load_records(&manifest_path)?;
    let summary = status::summarize(&args.root, &records);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", status::render_text(&summary));
    }
    Ok(())
}

/// Manifest resolution order: explicit flag, then the root-local file, then
/// the user config directory.
fn resolve_manifest_path(config: Option<PathBuf>, root: &Path) -> Result<PathBuf> {
    if let Some(path) = config {
        return Ok(path);
    }
    let local = root.join(DEFAULT_MANIFEST_NAME);
    if local.is_file() {
        return Ok(local);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let fallback = config_dir.join("dotpatch").join(DEFAULT_MANIFEST_NAME);
        if fallback.is_file() {
            return Ok(fallback);
        }
    }
    bail!(
        "no manifest found: pass --config or create {}",
        local.display()
    )
}
