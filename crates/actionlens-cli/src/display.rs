use actionlens_core::stats::percentage;
use actionlens_core::{SecurityStats, Summary};
use colored::*;

/// Print the extraction-phase summary to the terminal.
pub fn print_extraction_summary(summary: &Summary) {
    println!();
    println!(
        "{}",
        format!(
            " actionlens v{} — GitHub Actions Inventory",
            env!("CARGO_PKG_VERSION")
        )
        .bold()
    );
    println!();

    println!(" {}", "Corpus".bold().underline());
    println!(
        " {} {} repositories processed, {} with workflows",
        "|-".dimmed(),
        summary.total_repositories,
        summary.repos_with_workflows
    );
    println!(" {} {} workflows", "|-".dimmed(), summary.total_workflows);
    println!(
        " {} {} action references ({} unique)",
        "|-".dimmed(),
        summary.total_actions,
        summary.unique_actions.len()
    );
    println!(
        " {} Pinned: {} ({:.1}%), unpinned: {} ({:.1}%)",
        "|-".dimmed(),
        summary.pinned_actions.to_string().green(),
        percentage(summary.pinned_actions, summary.total_actions),
        summary.unpinned_actions.to_string().yellow(),
        percentage(summary.unpinned_actions, summary.total_actions)
    );
    println!();

    if !summary.top_actions.is_empty() {
        println!(" {}", "Top 10 most used actions".bold().underline());
        for (name, count) in summary.top_actions.iter().take(10) {
            println!(" {} {}: {} uses", "|-".dimmed(), name.cyan(), count);
        }
        println!();
    }
}

/// Print the classified-corpus security overview to the terminal.
pub fn print_security_overview(stats: &SecurityStats) {
    println!();
    println!(" {}", "Risk Overview".bold().underline());
    println!(
        " {} High: {}  Medium: {}  Low: {}",
        "|-".dimmed(),
        stats.risk_distribution.high.to_string().red().bold(),
        stats.risk_distribution.medium.to_string().yellow(),
        stats.risk_distribution.low.to_string().green()
    );
    println!(
        " {} Using secrets: {} ({:.1}%)",
        "|-".dimmed(),
        stats.actions_with_secrets,
        percentage(stats.actions_with_secrets, stats.total_actions)
    );
    println!(
        " {} Potentially privileged: {}, filesystem: {}, network: {}",
        "|-".dimmed(),
        stats.privileged_actions,
        stats.file_system_access_actions,
        stats.network_access_actions
    );
    println!();

    println!(" {}", "Production".bold().underline());
    println!(
        " {} {} production workflow actions, {} high risk",
        "|-".dimmed(),
        stats.production_workflow_actions,
        stats.production_high_risk.to_string().red()
    );
    println!(
        " {} Unpinned in production: {}, using secrets: {}",
        "|-".dimmed(),
        stats.production_unpinned,
        stats.production_with_secrets
    );
    println!();

    if !stats.high_risk_repositories.is_empty() {
        println!(" {}", "Top repositories by risk".bold().underline());
        for (repo, avg) in &stats.high_risk_repositories {
            let avg_display = format!("{:.1}", avg);
            let colored_avg = if *avg >= 60.0 {
                avg_display.red()
            } else if *avg >= 40.0 {
                avg_display.yellow()
            } else {
                avg_display.green()
            };
            println!(" {} {}: {}", "|-".dimmed(), repo.cyan(), colored_avg);
        }
        println!();
    }
}
