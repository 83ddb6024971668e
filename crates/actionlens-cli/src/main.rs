mod display;

use actionlens_core::{classifier, report, ReferenceExtractor, SecurityStats};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "actionlens",
    version,
    about = "actionlens — GitHub Actions inventory & security risk classification",
    long_about = "Inventory every GitHub Actions reference across a collected corpus of \
                  repositories, score each invocation for supply-chain risk, and render \
                  security assessment reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract action references from a collected workflow corpus
    Extract {
        /// Directory holding per-repository workflows.json records
        #[arg(long, default_value = "data/raw")]
        data_dir: PathBuf,

        /// Output directory for the inventory and summary files
        #[arg(long, default_value = "processed")]
        out_dir: PathBuf,
    },

    /// Classify a previously extracted inventory and render reports
    Report {
        /// Directory holding actions_inventory.json from the extract step
        #[arg(long, default_value = "processed")]
        processed_dir: PathBuf,

        /// Output directory for the rendered reports
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
    },

    /// Extract, classify, and render reports in one pass
    Scan {
        #[arg(long, default_value = "data/raw")]
        data_dir: PathBuf,

        #[arg(long, default_value = "processed")]
        out_dir: PathBuf,

        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { data_dir, out_dir } => cmd_extract(&data_dir, &out_dir),
        Commands::Report {
            processed_dir,
            reports_dir,
        } => cmd_report(&processed_dir, &reports_dir),
        Commands::Scan {
            data_dir,
            out_dir,
            reports_dir,
        } => cmd_scan(&data_dir, &out_dir, &reports_dir),
    }
}

fn cmd_extract(data_dir: &Path, out_dir: &Path) -> Result<()> {
    let inventory = extract_inventory(data_dir, out_dir)?;
    display::print_extraction_summary(&inventory.summary());
    Ok(())
}

fn cmd_report(processed_dir: &Path, reports_dir: &Path) -> Result<()> {
    let inventory_path = processed_dir.join("actions_inventory.json");
    let mut references = actionlens_core::load_references(&inventory_path)?;

    classifier::classify_all(&mut references);
    let stats = SecurityStats::compute(&references);
    write_reports(reports_dir, &stats, &references)?;
    display::print_security_overview(&stats);
    Ok(())
}

fn cmd_scan(data_dir: &Path, out_dir: &Path, reports_dir: &Path) -> Result<()> {
    let inventory = extract_inventory(data_dir, out_dir)?;
    let summary = inventory.summary();

    let mut references = inventory.into_references();
    classifier::classify_all(&mut references);
    let stats = SecurityStats::compute(&references);
    write_reports(reports_dir, &stats, &references)?;

    display::print_extraction_summary(&summary);
    display::print_security_overview(&stats);
    Ok(())
}

fn extract_inventory(data_dir: &Path, out_dir: &Path) -> Result<actionlens_core::Inventory> {
    let repos = actionlens_core::load_corpus(data_dir)?;
    if repos.is_empty() {
        anyhow::bail!(
            "No repository records found under '{}'. \
             Expected per-repository workflows.json files.",
            data_dir.display()
        );
    }

    let inventory = ReferenceExtractor::scan_corpus(&repos);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    inventory.write_json(&out_dir.join("actions_inventory.json"))?;
    inventory.write_csv(&out_dir.join("actions_inventory.csv"))?;
    inventory.write_summary(&out_dir.join("actions_summary.json"))?;

    Ok(inventory)
}

fn write_reports(
    reports_dir: &Path,
    stats: &SecurityStats,
    references: &[actionlens_core::ActionReference],
) -> Result<()> {
    std::fs::create_dir_all(reports_dir)
        .with_context(|| format!("Failed to create {}", reports_dir.display()))?;

    let markdown = report::generate_markdown_report(stats, references);
    let markdown_path = reports_dir.join("github_actions_security_report.md");
    std::fs::write(&markdown_path, markdown)
        .with_context(|| format!("Failed to write {}", markdown_path.display()))?;

    let html = report::generate_html_report(stats, references);
    let html_path = reports_dir.join("github_actions_security_report.html");
    std::fs::write(&html_path, html)
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    println!("Reports written:");
    println!("  - Markdown: {}", markdown_path.display());
    println!("  - HTML:     {}", html_path.display());
    Ok(())
}
