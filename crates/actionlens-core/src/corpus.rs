use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// One workflow file as collected from a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFile {
    pub name: String,
    pub path: String,
    pub content: String,
}

/// A repository and its collected workflow files. Absence of a record
/// for a repository is equivalent to "no workflows".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    #[serde(default)]
    pub workflows: Vec<WorkflowFile>,
}

/// Load a pre-collected corpus from `<dir>/*/workflows.json`.
///
/// Repositories whose record is missing or malformed are logged and
/// skipped; the rest of the corpus loads normally. Paths are sorted so
/// repeated runs see repositories in the same order.
pub fn load_corpus(dir: &Path) -> Result<Vec<RepoRecord>> {
    let pattern = format!("{}/*/workflows.json", dir.display());
    let mut paths: Vec<_> = glob::glob(&pattern)
        .context("Failed to read corpus glob pattern")?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();

    let mut repos = Vec::new();
    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable repository record");
                continue;
            }
        };
        match serde_json::from_str::<RepoRecord>(&content) {
            Ok(record) => repos.push(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping malformed repository record");
            }
        }
    }

    Ok(repos)
}
