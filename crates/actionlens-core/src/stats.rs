use crate::reference::{ActionReference, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const TOP_ACTIONS: usize = 20;
const TOP_RISK_REPOSITORIES: usize = 10;

/// Risk-tier histogram.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// One row of the top-actions ranking, with per-action rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionUsageRow {
    pub action_name: String,
    pub count: usize,
    pub pinned_ratio: f64,
    pub average_risk: f64,
}

/// Corpus-wide rollups over the classified inventory. Purely derived:
/// always recomputable from the reference list, never independently
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityStats {
    pub total_actions: usize,
    pub unique_actions: usize,
    pub pinned_actions: usize,
    pub unpinned_actions: usize,
    pub actions_with_secrets: usize,
    pub privileged_actions: usize,
    pub file_system_access_actions: usize,
    pub network_access_actions: usize,
    pub deprecated_actions: usize,
    pub risk_distribution: RiskDistribution,
    pub repositories: usize,
    pub action_usage_count: BTreeMap<String, usize>,
    pub top_actions: Vec<ActionUsageRow>,
    pub production_workflow_actions: usize,
    pub production_high_risk: usize,
    pub production_unpinned: usize,
    pub production_with_secrets: usize,
    pub repository_risk: BTreeMap<String, f64>,
    pub high_risk_repositories: Vec<(String, f64)>,
}

impl SecurityStats {
    /// Compute all rollups from a classified inventory.
    pub fn compute(references: &[ActionReference]) -> SecurityStats {
        let mut usage: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        let mut repositories: HashSet<&str> = HashSet::new();
        let mut repo_scores: BTreeMap<&str, Vec<u8>> = BTreeMap::new();
        let mut distribution = RiskDistribution::default();

        let mut pinned = 0usize;
        let mut with_secrets = 0usize;
        let mut privileged = 0usize;
        let mut fs_access = 0usize;
        let mut network = 0usize;
        let mut deprecated = 0usize;
        let mut production = 0usize;
        let mut production_high = 0usize;
        let mut production_unpinned = 0usize;
        let mut production_secrets = 0usize;

        for reference in references {
            if !usage.contains_key(reference.action_name.as_str()) {
                first_seen.push(&reference.action_name);
            }
            *usage.entry(&reference.action_name).or_insert(0) += 1;
            repositories.insert(&reference.repository);

            if reference.is_pinned {
                pinned += 1;
            }
            if reference.has_secrets {
                with_secrets += 1;
            }

            let Some(classification) = &reference.classification else {
                continue;
            };
            repo_scores
                .entry(&reference.repository)
                .or_default()
                .push(classification.risk_score);
            match classification.risk_level {
                RiskLevel::High => distribution.high += 1,
                RiskLevel::Medium => distribution.medium += 1,
                RiskLevel::Low => distribution.low += 1,
            }
            if classification.privileged {
                privileged += 1;
            }
            if classification.file_system_access {
                fs_access += 1;
            }
            if classification.network_access {
                network += 1;
            }
            if classification.deprecated {
                deprecated += 1;
            }
            if classification.production_workflow {
                production += 1;
                if classification.risk_level == RiskLevel::High {
                    production_high += 1;
                }
                if !reference.is_pinned {
                    production_unpinned += 1;
                }
                if reference.has_secrets {
                    production_secrets += 1;
                }
            }
        }

        let top_actions = rank_actions(references, &usage, &first_seen);

        let repository_risk: BTreeMap<String, f64> = repo_scores
            .iter()
            .map(|(repo, scores)| (repo.to_string(), average(scores)))
            .collect();

        let mut high_risk_repositories: Vec<(String, f64)> = repository_risk
            .iter()
            .map(|(repo, avg)| (repo.clone(), *avg))
            .collect();
        // Descending by average; BTreeMap iteration already gives the
        // name-ascending tie order.
        high_risk_repositories
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        high_risk_repositories.truncate(TOP_RISK_REPOSITORIES);

        SecurityStats {
            total_actions: references.len(),
            unique_actions: usage.len(),
            pinned_actions: pinned,
            unpinned_actions: references.len() - pinned,
            actions_with_secrets: with_secrets,
            privileged_actions: privileged,
            file_system_access_actions: fs_access,
            network_access_actions: network,
            deprecated_actions: deprecated,
            risk_distribution: distribution,
            repositories: repositories.len(),
            action_usage_count: usage
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
            top_actions,
            production_workflow_actions: production,
            production_high_risk: production_high,
            production_unpinned: production_unpinned,
            production_with_secrets: production_secrets,
            repository_risk,
            high_risk_repositories,
        }
    }

    /// Count of references per repository, for report tables.
    pub fn repo_action_counts(references: &[ActionReference]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for reference in references {
            *counts.entry(reference.repository.clone()).or_insert(0) += 1;
        }
        counts
    }
}

fn rank_actions(
    references: &[ActionReference],
    usage: &HashMap<&str, usize>,
    first_seen: &[&str],
) -> Vec<ActionUsageRow> {
    let mut ranked: Vec<(&str, usize)> = first_seen
        .iter()
        .map(|name| (*name, usage[name]))
        .collect();
    // Stable sort keeps first-encountered order within equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_ACTIONS);

    ranked
        .into_iter()
        .map(|(name, count)| {
            let instances: Vec<&ActionReference> = references
                .iter()
                .filter(|r| r.action_name == name)
                .collect();
            let pinned = instances.iter().filter(|r| r.is_pinned).count();
            let total_risk: u64 = instances
                .iter()
                .filter_map(|r| r.classification.as_ref())
                .map(|c| c.risk_score as u64)
                .sum();
            ActionUsageRow {
                action_name: name.to_string(),
                count,
                pinned_ratio: percentage(pinned, count) / 100.0,
                average_risk: if count == 0 {
                    0.0
                } else {
                    total_risk as f64 / count as f64
                },
            }
        })
        .collect()
}

fn average(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64
}

/// Ratio as a percentage, defined as 0 when the denominator is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
