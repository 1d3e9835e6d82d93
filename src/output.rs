use crate::mode::RunMode;
use crate::store::{RunRecord, RunStats};
use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::path::PathBuf;

/// Everything reported at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub roots: Vec<String>,
    pub store: PathBuf,
    pub log: PathBuf,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub store: PathBuf,
    pub records: u64,
    pub last_run: Option<RunRecord>,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn divider(width: usize) -> String {
    "─".repeat(width).dimmed().to_string()
}

fn row(label: &str, value: usize) {
    let value = value.to_string();
    let value = if value == "0" { value.dimmed() } else { value.bold() };
    println!("  {:<22} {:>10}", label, value);
}

pub fn print_run(report: &RunReport) {
    let stats = &report.stats;

    println!();
    println!("{}", format!("{} finished", report.mode).green().bold());
    println!("{}", divider(40));
    row("Files fingerprinted", stats.scanned);
    row("New records", stats.inserted);
    row("Unchanged", stats.unchanged);
    row("Changed", stats.drifted);
    if report.mode == RunMode::Renew {
        row("Renewed", stats.renewed);
    }
    if report.mode == RunMode::Check {
        row("Alerts", stats.alerts);
    }
    row("Skipped files", stats.skipped);
    row("Unreadable directories", stats.failed_dirs);
    println!(
        "  {:<22} {:>10}",
        "Content hashed",
        bytesize::to_string(stats.bytes_hashed, true)
    );
    println!("{}", divider(40));

    if report.mode == RunMode::Baseline && stats.drifted > 0 {
        println!(
            "{} {} changed file(s) left untouched. Use {} to alert or {} to accept them.",
            "Note:".yellow(),
            stats.drifted,
            "check".cyan(),
            "renew".cyan()
        );
    }
    if stats.has_errors() {
        println!("{} some files or directories were skipped.", "Warning:".yellow());
    }

    let log = report.log.display().to_string();
    println!("You can see the result in {} or with:", log.cyan());
    println!();
    println!("  {}", format!("tail {}", log).cyan());
    println!();
}

pub fn print_status(report: &StatusReport) {
    println!();
    println!("{}", "Baseline status".bold());
    println!("{}", divider(40));
    println!("  {:<22} {}", "Store", report.store.display());
    println!("  {:<22} {}", "Records", report.records.to_string().bold());

    match &report.last_run {
        Some(run) => {
            println!(
                "  {:<22} {} at {}",
                "Last run",
                run.mode.to_string().cyan(),
                run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            match run.finished_at {
                Some(_) => {
                    row("  files", run.stats.scanned);
                    row("  new", run.stats.inserted);
                    row("  changed", run.stats.drifted);
                    row("  alerts", run.stats.alerts);
                }
                None => println!("  {}", "(did not finish)".yellow()),
            }
        }
        None => println!("  {:<22} {}", "Last run", "never".dimmed()),
    }
    println!();
}
