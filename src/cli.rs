//! Command-line surface
//!
//! Thin coordinator over `ReorgSession`: parses arguments, runs one command
//! and renders its report as text or JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;
use crate::error::Result;
use crate::index::TreeSnapshot;
use crate::proposal::{FolderOrigin, ProposedFolder};
use crate::session::{Analysis, CycleReport, PlanPreview, ReorgSession};

/// Exit code for a run that finished with per-item failures
const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "folder-reorg")]
#[command(about = "Propose, apply and undo folder reorganizations", long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/folder-reorg/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the current and proposed structure of a directory
    Analyze { dir: PathBuf },
    /// Show the moves a reorganization would make
    Preview { dir: PathBuf },
    /// Reorganize a directory (previews unless --yes is given)
    Apply {
        dir: PathBuf,
        /// Actually move files
        #[arg(long)]
        yes: bool,
    },
    /// Reverse the last reorganization
    Undo {
        /// Directory passed to post-undo plugins
        dir: Option<PathBuf>,
    },
    /// List loaded plugins
    Plugins,
}

/// Run one parsed command against a session built from `config`
pub async fn execute(cli: Cli, config: Config) -> Result<ExitCode> {
    let session = ReorgSession::from_config(config);
    let json = cli.json;

    match cli.command {
        Commands::Analyze { dir } => {
            let analysis = session.analyze(&dir).await?;
            if json {
                print_json(&analysis)?;
            } else {
                print!("{}", render_analysis(&analysis));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Preview { dir } => {
            let analysis = session.analyze(&dir).await?;
            let preview = session.preview(&analysis);
            if json {
                print_json(&preview)?;
            } else {
                print!("{}", render_preview(&analysis.root, &preview));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply { dir, yes } => {
            let analysis = session.analyze(&dir).await?;
            if !yes {
                let preview = session.preview(&analysis);
                if json {
                    print_json(&preview)?;
                } else {
                    print!("{}", render_preview(&analysis.root, &preview));
                    println!("\nNothing was moved. Re-run with --yes to apply.");
                }
                return Ok(ExitCode::SUCCESS);
            }

            let report = session.reorganize(&analysis).await?;
            finish(&report, json)
        }
        Commands::Undo { dir } => {
            let report = session.undo(dir.as_deref()).await?;
            finish(&report, json)
        }
        Commands::Plugins => {
            let plugins: Vec<_> = session.plugins().iter().map(|p| p.info()).collect();
            if json {
                print_json(&plugins)?;
            } else if plugins.is_empty() {
                println!("No plugins loaded from {}", session.config().plugin_dir.display());
            } else {
                for plugin in plugins {
                    let executable = if plugin.executable { "" } else { " (no program)" };
                    println!("{} [{}]{} {}", plugin.name, plugin.kind, executable, plugin.description);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn finish(report: &CycleReport, json: bool) -> Result<ExitCode> {
    if json {
        print_json(report)?;
    } else {
        print!("{}", render_report(report));
    }

    if report.has_failures() {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{}", json);
    Ok(())
}

fn render_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Current structure of {}:", analysis.root.display());
    render_snapshot(&analysis.snapshot, 1, &mut out);
    let _ = writeln!(out, "\nProposed structure:");
    render_proposed(analysis.proposed.root(), 1, &mut out);
    let _ = writeln!(out, "\nSuggestion:\n{}", analysis.annotation);
    out
}

fn render_snapshot(node: &TreeSnapshot, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (name, child) in node.children() {
        let _ = writeln!(out, "{}{}/", indent, name);
        render_snapshot(child, depth + 1, out);
    }
    for file in node.files() {
        let _ = writeln!(out, "{}{}", indent, file);
    }
}

fn render_proposed(folder: &ProposedFolder, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (name, child) in &folder.children {
        let marker = match child.origin {
            FolderOrigin::Existing => "",
            FolderOrigin::Synthesized => " (new)",
            FolderOrigin::Renamed => " (new, renamed)",
        };
        let _ = writeln!(out, "{}{}/{}", indent, name, marker);
        render_proposed(child, depth + 1, out);
    }
    for file in &folder.files {
        let _ = writeln!(out, "{}{}", indent, file);
    }
}

fn render_preview(root: &Path, preview: &PlanPreview) -> String {
    let mut out = String::new();
    let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).display().to_string();

    let _ = writeln!(out, "Planned moves ({}):", preview.plan.effective_moves());
    for op in preview.plan.iter().filter(|op| !op.is_noop()) {
        let _ = writeln!(out, "  {} -> {}", relative(&op.source), relative(&op.destination));
    }
    if !preview.failures.is_empty() {
        let _ = writeln!(out, "Excluded ({}):", preview.failures.len());
        for failure in &preview.failures {
            let _ = writeln!(out, "  {} ({})", relative(&failure.path), failure.reason);
        }
    }
    out
}

fn render_report(report: &CycleReport) -> String {
    let mut out = String::new();
    let execution = &report.execution;
    let _ = writeln!(
        out,
        "{} moved, {} failed, {} unchanged, {} excluded",
        execution.succeeded.len(),
        execution.failed.len(),
        execution.skipped.len(),
        report.planning_failures.len()
    );
    for failed in &execution.failed {
        let _ = writeln!(out, "  failed: {} ({})", failed.operation.description(), failed.kind);
    }
    for plugin in &report.plugins {
        match (&plugin.output, &plugin.error) {
            (_, Some(error)) => {
                let _ = writeln!(out, "  plugin {}: error: {}", plugin.plugin, error);
            }
            (Some(output), None) => {
                let _ = writeln!(out, "  plugin {}: {}", plugin.plugin, output);
            }
            (None, None) => {}
        }
    }
    out
}
