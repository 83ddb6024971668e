use crate::reference::ActionReference;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Number of entries reported in the extraction summary's usage ranking.
const SUMMARY_TOP_ACTIONS: usize = 50;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory file '{path}' not found; run the extract step first")]
    Missing { path: String },
    #[error("failed to read inventory file '{path}'")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("inventory file '{path}' is not valid JSON")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },
}

/// Corpus-wide extraction snapshot, serialized alongside the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_repositories: usize,
    pub repos_with_workflows: usize,
    pub total_workflows: usize,
    pub total_actions: usize,
    pub unique_actions: Vec<String>,
    pub actions_usage_count: BTreeMap<String, usize>,
    pub pinned_actions: usize,
    pub unpinned_actions: usize,
    pub top_actions: Vec<(String, usize)>,
}

/// Accumulates action references and running corpus counters during
/// extraction. Merging two inventories is associative, so a sharded
/// extraction pass can combine per-shard accumulators.
#[derive(Debug, Default)]
pub struct Inventory {
    references: Vec<ActionReference>,
    total_repositories: usize,
    repos_with_workflows: usize,
    total_workflows: usize,
    pinned_actions: usize,
    unpinned_actions: usize,
    usage_counts: HashMap<String, usize>,
    // Unique action names in first-encountered order; tie order in
    // rankings follows this.
    first_seen: Vec<String>,
}

impl Inventory {
    pub fn observe_repository(&mut self, has_workflows: bool) {
        self.total_repositories += 1;
        if has_workflows {
            self.repos_with_workflows += 1;
        }
    }

    pub fn add_workflows(&mut self, count: usize) {
        self.total_workflows += count;
    }

    pub fn record(&mut self, reference: ActionReference) {
        if reference.is_pinned {
            self.pinned_actions += 1;
        } else {
            self.unpinned_actions += 1;
        }
        if !self.usage_counts.contains_key(&reference.action_name) {
            self.first_seen.push(reference.action_name.clone());
        }
        *self
            .usage_counts
            .entry(reference.action_name.clone())
            .or_insert(0) += 1;
        self.references.push(reference);
    }

    /// Combine another accumulator into this one. Counters are
    /// commutative; first-encounter order follows merge order.
    pub fn merge(&mut self, other: Inventory) {
        self.total_repositories += other.total_repositories;
        self.repos_with_workflows += other.repos_with_workflows;
        self.total_workflows += other.total_workflows;
        self.pinned_actions += other.pinned_actions;
        self.unpinned_actions += other.unpinned_actions;
        for name in other.first_seen {
            if !self.usage_counts.contains_key(&name) {
                self.first_seen.push(name);
            }
        }
        for (name, count) in other.usage_counts {
            *self.usage_counts.entry(name).or_insert(0) += count;
        }
        self.references.extend(other.references);
    }

    pub fn references(&self) -> &[ActionReference] {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut [ActionReference] {
        &mut self.references
    }

    pub fn into_references(self) -> Vec<ActionReference> {
        self.references
    }

    pub fn total_actions(&self) -> usize {
        self.references.len()
    }

    pub fn summary(&self) -> Summary {
        let mut ranked: Vec<(String, usize)> = self
            .first_seen
            .iter()
            .map(|name| (name.clone(), self.usage_counts[name]))
            .collect();
        // Stable sort keeps first-encountered order within equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(SUMMARY_TOP_ACTIONS);

        Summary {
            total_repositories: self.total_repositories,
            repos_with_workflows: self.repos_with_workflows,
            total_workflows: self.total_workflows,
            total_actions: self.references.len(),
            unique_actions: self.first_seen.clone(),
            actions_usage_count: self
                .usage_counts
                .iter()
                .map(|(name, count)| (name.clone(), *count))
                .collect(),
            pinned_actions: self.pinned_actions,
            unpinned_actions: self.unpinned_actions,
            top_actions: ranked,
        }
    }

    /// Serialize the full reference list as a JSON array.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.references)
            .with_context(|| format!("Failed to write inventory JSON to {}", path.display()))?;
        Ok(())
    }

    /// Serialize the reference list as a flat-column CSV table. List
    /// fields are joined with `;`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record([
            "repository",
            "workflow_file",
            "workflow_path",
            "job_name",
            "step_name",
            "action_name",
            "action_version",
            "full_reference",
            "is_pinned",
            "is_third_party",
            "has_secrets",
            "required_secrets",
        ])?;
        for reference in &self.references {
            writer.write_record([
                reference.repository.as_str(),
                reference.workflow_file.as_str(),
                reference.workflow_path.as_str(),
                reference.job_name.as_str(),
                reference.step_name.as_str(),
                reference.action_name.as_str(),
                reference.action_version.as_str(),
                reference.full_reference.as_str(),
                if reference.is_pinned { "true" } else { "false" },
                if reference.is_third_party { "true" } else { "false" },
                if reference.has_secrets { "true" } else { "false" },
                reference.required_secrets.join(";").as_str(),
            ])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write inventory CSV to {}", path.display()))?;
        Ok(())
    }

    pub fn write_summary(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.summary())
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        Ok(())
    }
}

/// Load a previously serialized inventory. A missing file is fatal for
/// the classification stage, with a diagnostic pointing at the extract
/// step.
pub fn load_references(path: &Path) -> Result<Vec<ActionReference>, InventoryError> {
    let display = path.display().to_string();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(InventoryError::Missing { path: display });
        }
        Err(err) => {
            return Err(InventoryError::Io {
                path: display,
                source: err,
            });
        }
    };
    serde_json::from_str(&content).map_err(|err| InventoryError::Malformed {
        path: display,
        source: err,
    })
}
