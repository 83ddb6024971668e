use crate::reference::{ActionReference, Classification, RiskLevel};
use crate::stats::{percentage, SecurityStats};

const MARKDOWN_ROW_LIMIT: usize = 30;
const HTML_ROW_LIMIT: usize = 50;

/// References carrying a classification, sorted by descending risk
/// score. Ties keep inventory order (stable sort).
fn by_risk_desc<'a, F>(references: &'a [ActionReference], keep: F) -> Vec<&'a ActionReference>
where
    F: Fn(&ActionReference, &Classification) -> bool,
{
    let mut selected: Vec<&ActionReference> = references
        .iter()
        .filter(|r| {
            r.classification
                .as_ref()
                .is_some_and(|c| keep(r, c))
        })
        .collect();
    selected.sort_by_key(|r| {
        std::cmp::Reverse(r.classification.as_ref().map(|c| c.risk_score).unwrap_or(0))
    });
    selected
}

fn score_of(reference: &ActionReference) -> u8 {
    reference
        .classification
        .as_ref()
        .map(|c| c.risk_score)
        .unwrap_or(0)
}

fn level_of(reference: &ActionReference) -> &'static str {
    reference
        .classification
        .as_ref()
        .map(|c| c.risk_level.label())
        .unwrap_or("Low")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn truncated_secrets(reference: &ActionReference) -> String {
    let shown: Vec<&str> = reference
        .required_secrets
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    let suffix = if reference.required_secrets.len() > 3 {
        "..."
    } else {
        ""
    };
    format!("{}{}", shown.join(", "), suffix)
}

/// Render the full security assessment as Markdown.
pub fn generate_markdown_report(
    stats: &SecurityStats,
    references: &[ActionReference],
) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let total = stats.total_actions;
    let mut md = String::new();

    md.push_str(&format!(
        "# GitHub Actions Security Assessment Report\n\n\
         Generated on {timestamp}\n\n\
         ## Executive Summary\n\n\
         This report provides a security assessment of GitHub Actions usage across {repos} repositories. \
         A total of {total} action references were analyzed, representing {unique} unique actions.\n\n\
         Key findings:\n\n\
         - **{high}** high-risk action references identified ({high_pct:.1}% of total)\n\
         - **{unpinned}** unpinned action references ({unpinned_pct:.1}% of total)\n\
         - **{secrets}** actions using secrets ({secrets_pct:.1}% of total)\n\
         - **{prod}** actions in production workflows ({prod_pct:.1}% of total)\n\
         - **{prod_high}** high-risk actions in production workflows\n\n",
        repos = stats.repositories,
        total = total,
        unique = stats.unique_actions,
        high = stats.risk_distribution.high,
        high_pct = percentage(stats.risk_distribution.high, total),
        unpinned = stats.unpinned_actions,
        unpinned_pct = percentage(stats.unpinned_actions, total),
        secrets = stats.actions_with_secrets,
        secrets_pct = percentage(stats.actions_with_secrets, total),
        prod = stats.production_workflow_actions,
        prod_pct = percentage(stats.production_workflow_actions, total),
        prod_high = stats.production_high_risk,
    ));

    md.push_str(&format!(
        "## Risk Overview\n\n\
         | Metric | Count | Percentage |\n\
         |--------|-------|------------|\n\
         | Total Action References | {total} | 100% |\n\
         | Unique Actions | {unique} | - |\n\
         | High Risk | {high} | {high_pct:.1}% |\n\
         | Medium Risk | {medium} | {medium_pct:.1}% |\n\
         | Low Risk | {low} | {low_pct:.1}% |\n\n",
        unique = stats.unique_actions,
        high = stats.risk_distribution.high,
        high_pct = percentage(stats.risk_distribution.high, total),
        medium = stats.risk_distribution.medium,
        medium_pct = percentage(stats.risk_distribution.medium, total),
        low = stats.risk_distribution.low,
        low_pct = percentage(stats.risk_distribution.low, total),
    ));

    md.push_str(&format!(
        "## Action Security Metrics\n\n\
         | Metric | Count | Percentage |\n\
         |--------|-------|------------|\n\
         | Pinned Actions | {pinned} | {pinned_pct:.1}% |\n\
         | Unpinned Actions | {unpinned} | {unpinned_pct:.1}% |\n\
         | Using Secrets | {secrets} | {secrets_pct:.1}% |\n\
         | Potentially Privileged | {privileged} | {privileged_pct:.1}% |\n\
         | File System Access | {fs} | {fs_pct:.1}% |\n\
         | Network Access | {net} | {net_pct:.1}% |\n\
         | Potentially Deprecated | {depr} | {depr_pct:.1}% |\n\n",
        pinned = stats.pinned_actions,
        pinned_pct = percentage(stats.pinned_actions, total),
        unpinned = stats.unpinned_actions,
        unpinned_pct = percentage(stats.unpinned_actions, total),
        secrets = stats.actions_with_secrets,
        secrets_pct = percentage(stats.actions_with_secrets, total),
        privileged = stats.privileged_actions,
        privileged_pct = percentage(stats.privileged_actions, total),
        fs = stats.file_system_access_actions,
        fs_pct = percentage(stats.file_system_access_actions, total),
        net = stats.network_access_actions,
        net_pct = percentage(stats.network_access_actions, total),
        depr = stats.deprecated_actions,
        depr_pct = percentage(stats.deprecated_actions, total),
    ));

    md.push_str(&format!(
        "## Production Environment Status\n\n\
         | Metric | Count | Percentage |\n\
         |--------|-------|------------|\n\
         | Production Workflow Actions | {prod} | {prod_pct:.1}% |\n\
         | High Risk in Production | {prod_high} | {prod_high_pct:.1}% |\n\
         | Unpinned in Production | {prod_unpinned} | {prod_unpinned_pct:.1}% |\n\
         | Using Secrets in Production | {prod_secrets} | {prod_secrets_pct:.1}% |\n\n",
        prod = stats.production_workflow_actions,
        prod_pct = percentage(stats.production_workflow_actions, total),
        prod_high = stats.production_high_risk,
        prod_high_pct = percentage(stats.production_high_risk, stats.production_workflow_actions),
        prod_unpinned = stats.production_unpinned,
        prod_unpinned_pct =
            percentage(stats.production_unpinned, stats.production_workflow_actions),
        prod_secrets = stats.production_with_secrets,
        prod_secrets_pct =
            percentage(stats.production_with_secrets, stats.production_workflow_actions),
    ));

    md.push_str(
        "## Top 10 Repositories by Risk\n\n\
         | Repository | Risk Score | Action Count |\n\
         |------------|------------|--------------|\n",
    );
    let repo_counts = SecurityStats::repo_action_counts(references);
    for (repo, avg) in &stats.high_risk_repositories {
        md.push_str(&format!(
            "| {} | {:.1} | {} |\n",
            repo,
            avg,
            repo_counts.get(repo).copied().unwrap_or(0)
        ));
    }

    md.push_str(
        "\n## Top 20 Most Used Actions\n\n\
         | Action | Usage Count | Pinned Ratio | Average Risk |\n\
         |--------|-------------|--------------|--------------|\n",
    );
    for row in &stats.top_actions {
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {:.1} |\n",
            row.action_name,
            row.count,
            row.pinned_ratio * 100.0,
            row.average_risk
        ));
    }

    md.push_str(
        "\n## Critical Production Risks\n\n\
         The following actions represent the highest security risk: they are used in production \
         workflows, are high risk, use secrets, and are not pinned to specific commits.\n\n\
         | Repository | Workflow | Action | Production Indicator | Secrets Used | Risk Score |\n\
         |------------|----------|--------|---------------------|--------------|------------|\n",
    );
    let critical = by_risk_desc(references, |r, c| {
        c.production_workflow && c.risk_level == RiskLevel::High && r.has_secrets && !r.is_pinned
    });
    for reference in critical.iter().take(MARKDOWN_ROW_LIMIT) {
        let c = reference.classification.as_ref().unwrap();
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            c.production_indicators.join(", "),
            truncated_secrets(reference),
            c.risk_score
        ));
    }

    md.push_str(
        "\n## High Risk Actions\n\n\
         | Repository | Workflow | Action | Version | Pinned | Uses Secrets | Risk Score |\n\
         |------------|----------|--------|---------|--------|--------------|------------|\n",
    );
    let high = by_risk_desc(references, |_, c| c.risk_level == RiskLevel::High);
    for reference in high.iter().take(MARKDOWN_ROW_LIMIT) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            reference.action_version,
            yes_no(reference.is_pinned),
            yes_no(reference.has_secrets),
            score_of(reference)
        ));
    }

    md.push_str(
        "\n## Unpinned Actions\n\n\
         | Repository | Workflow | Action | Version | Risk Level |\n\
         |------------|----------|--------|---------|------------|\n",
    );
    let unpinned = by_risk_desc(references, |r, _| !r.is_pinned);
    for reference in unpinned.iter().take(MARKDOWN_ROW_LIMIT) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            reference.action_version,
            level_of(reference)
        ));
    }

    md.push_str(
        "\n## Actions With Secrets\n\n\
         | Repository | Workflow | Action | Secrets Used | Risk Level |\n\
         |------------|----------|--------|--------------|------------|\n",
    );
    let with_secrets = by_risk_desc(references, |r, _| r.has_secrets);
    for reference in with_secrets.iter().take(MARKDOWN_ROW_LIMIT) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            truncated_secrets(reference),
            level_of(reference)
        ));
    }

    md.push_str(
        "\n## Actions in Production Workflows\n\n\
         | Repository | Workflow | Action | Production Indicator | Pinned | Uses Secrets | Risk Level |\n\
         |------------|----------|--------|---------------------|--------|--------------|------------|\n",
    );
    let production = by_risk_desc(references, |_, c| c.production_workflow);
    for reference in production.iter().take(MARKDOWN_ROW_LIMIT) {
        let c = reference.classification.as_ref().unwrap();
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            c.production_indicators.join(", "),
            yes_no(reference.is_pinned),
            yes_no(reference.has_secrets),
            c.risk_level.label()
        ));
    }

    md.push_str(
        "\n## Key Recommendations\n\n\
         1. **Pin all actions to specific SHA commits** for predictable, secure builds\n\
         2. **Review high-risk actions** that have access to secrets\n\
         3. **Implement organization-wide policy** for GitHub Actions usage\n\
         4. **Set up continuous monitoring** to detect new unpinned or high-risk actions\n\
         5. **Validate third-party actions** are from trusted sources and recent commits\n",
    );

    md
}

/// Render the security assessment as a self-contained HTML page.
pub fn generate_html_report(stats: &SecurityStats, references: &[ActionReference]) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let total = stats.total_actions;

    let mut repo_rows = String::new();
    let repo_counts = SecurityStats::repo_action_counts(references);
    for (repo, avg) in &stats.high_risk_repositories {
        repo_rows.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{:.1}</td><td>{}</td></tr>\n",
            row_class(*avg),
            repo,
            avg,
            repo_counts.get(repo).copied().unwrap_or(0)
        ));
    }

    let mut action_rows = String::new();
    for row in &stats.top_actions {
        action_rows.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}</td></tr>\n",
            row_class(row.average_risk),
            row.action_name,
            row.count,
            row.pinned_ratio * 100.0,
            row.average_risk
        ));
    }

    let mut high_risk_rows = String::new();
    let high = by_risk_desc(references, |_, c| c.risk_level == RiskLevel::High);
    for reference in high.iter().take(HTML_ROW_LIMIT) {
        high_risk_rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><span class=\"badge badge-high\">{}</span></td></tr>\n",
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            reference.action_version,
            yes_no(reference.is_pinned),
            yes_no(reference.has_secrets),
            score_of(reference)
        ));
    }

    let mut production_rows = String::new();
    let production = by_risk_desc(references, |_, c| c.production_workflow);
    for reference in production.iter().take(HTML_ROW_LIMIT) {
        let c = reference.classification.as_ref().unwrap();
        production_rows.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            c.risk_level.label().to_lowercase(),
            reference.repository,
            reference.workflow_file,
            reference.action_name,
            c.production_indicators.join(", "),
            yes_no(reference.is_pinned),
            yes_no(reference.has_secrets),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GitHub Actions Security Assessment Report</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}

        :root {{
            --bg-primary: #ffffff;
            --bg-card: #f8fafc;
            --text-primary: #1e293b;
            --text-secondary: #64748b;
            --border-color: #e2e8f0;
            --accent-color: #3b82f6;
            --danger-color: #ef4444;
            --warning-color: #f59e0b;
            --success-color: #22c55e;
        }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
            padding: 2rem;
        }}

        .container {{ max-width: 1200px; margin: 0 auto; }}
        h1 {{ margin-bottom: 0.25rem; }}
        h2 {{ margin: 2rem 0 1rem; }}
        .timestamp {{ color: var(--text-secondary); font-size: 0.875rem; margin-bottom: 2rem; }}

        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 1rem;
            margin-bottom: 1rem;
        }}
        .stat-card {{
            background: var(--bg-card);
            padding: 1.25rem;
            border-radius: 0.75rem;
            border: 1px solid var(--border-color);
        }}
        .stat-card.alert {{ border-left: 4px solid var(--danger-color); }}
        .stat-label {{ font-size: 0.875rem; color: var(--text-secondary); }}
        .stat-value {{ font-size: 2rem; font-weight: 700; color: var(--accent-color); }}

        table {{ width: 100%; border-collapse: collapse; margin: 1rem 0; }}
        th, td {{ padding: 0.6rem 0.9rem; text-align: left; border-bottom: 1px solid var(--border-color); }}
        th {{ background: var(--bg-card); }}
        tr.high {{ background: #fee2e2; }}
        tr.medium {{ background: #fef9c3; }}
        tr.low {{ background: #dcfce7; }}

        .badge {{
            display: inline-block;
            padding: 0.15rem 0.5rem;
            border-radius: 0.25rem;
            font-size: 0.75rem;
            font-weight: 700;
            color: white;
        }}
        .badge-high {{ background: var(--danger-color); }}
    </style>
</head>
<body>
    <div class="container">
        <h1>GitHub Actions Security Assessment Report</h1>
        <p class="timestamp">Generated on {timestamp}</p>

        <h2>Risk Overview</h2>
        <div class="stats-grid">
            <div class="stat-card"><div class="stat-value">{total}</div><div class="stat-label">Total Action References</div></div>
            <div class="stat-card"><div class="stat-value">{unique}</div><div class="stat-label">Unique Actions</div></div>
            <div class="stat-card alert"><div class="stat-value">{high}</div><div class="stat-label">High Risk</div></div>
            <div class="stat-card"><div class="stat-value">{medium}</div><div class="stat-label">Medium Risk</div></div>
            <div class="stat-card"><div class="stat-value">{low}</div><div class="stat-label">Low Risk</div></div>
        </div>

        <h2>Action Security Metrics</h2>
        <div class="stats-grid">
            <div class="stat-card"><div class="stat-value">{pinned}</div><div class="stat-label">Pinned Actions</div></div>
            <div class="stat-card alert"><div class="stat-value">{unpinned}</div><div class="stat-label">Unpinned Actions</div></div>
            <div class="stat-card"><div class="stat-value">{secrets}</div><div class="stat-label">Using Secrets</div></div>
            <div class="stat-card"><div class="stat-value">{privileged}</div><div class="stat-label">Potentially Privileged</div></div>
            <div class="stat-card"><div class="stat-value">{fs}</div><div class="stat-label">File System Access</div></div>
            <div class="stat-card"><div class="stat-value">{network}</div><div class="stat-label">Network Access</div></div>
        </div>

        <h2>Production Environment Status</h2>
        <div class="stats-grid">
            <div class="stat-card alert"><div class="stat-value">{prod}</div><div class="stat-label">Production Workflow Actions</div></div>
            <div class="stat-card alert"><div class="stat-value">{prod_high}</div><div class="stat-label">High Risk in Production</div></div>
            <div class="stat-card"><div class="stat-value">{prod_unpinned}</div><div class="stat-label">Unpinned in Production</div></div>
            <div class="stat-card"><div class="stat-value">{prod_secrets}</div><div class="stat-label">Using Secrets in Production</div></div>
        </div>

        <h2>Top 10 Repositories by Risk</h2>
        <table>
            <tr><th>Repository</th><th>Risk Score</th><th>Action Count</th></tr>
{repo_rows}        </table>

        <h2>Top 20 Most Used Actions</h2>
        <table>
            <tr><th>Action</th><th>Usage Count</th><th>Pinned Ratio</th><th>Average Risk</th></tr>
{action_rows}        </table>

        <h2>High Risk Actions</h2>
        <table>
            <tr><th>Repository</th><th>Workflow</th><th>Action</th><th>Version</th><th>Pinned</th><th>Uses Secrets</th><th>Risk Score</th></tr>
{high_risk_rows}        </table>

        <h2>Actions in Production Workflows</h2>
        <table>
            <tr><th>Repository</th><th>Workflow</th><th>Action</th><th>Production Indicator</th><th>Pinned</th><th>Uses Secrets</th></tr>
{production_rows}        </table>
    </div>
</body>
</html>
"#,
        timestamp = timestamp,
        total = total,
        unique = stats.unique_actions,
        high = stats.risk_distribution.high,
        medium = stats.risk_distribution.medium,
        low = stats.risk_distribution.low,
        pinned = stats.pinned_actions,
        unpinned = stats.unpinned_actions,
        secrets = stats.actions_with_secrets,
        privileged = stats.privileged_actions,
        fs = stats.file_system_access_actions,
        network = stats.network_access_actions,
        prod = stats.production_workflow_actions,
        prod_high = stats.production_high_risk,
        prod_unpinned = stats.production_unpinned,
        prod_secrets = stats.production_with_secrets,
        repo_rows = repo_rows,
        action_rows = action_rows,
        high_risk_rows = high_risk_rows,
        production_rows = production_rows,
    )
}

fn row_class(score: f64) -> &'static str {
    if score >= 60.0 {
        "high"
    } else if score >= 40.0 {
        "medium"
    } else {
        "low"
    }
}
