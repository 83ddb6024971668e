use crate::corpus::RepoRecord;
use crate::inventory::Inventory;
use crate::reference::{ActionReference, Invocation, JOB_LEVEL_STEP};
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Extracts normalized action references from workflow documents.
///
/// A single malformed document or job never aborts a corpus pass: it is
/// logged and skipped, and extraction continues with the rest.
pub struct ReferenceExtractor;

impl ReferenceExtractor {
    /// Scan a whole corpus of repository records into an inventory.
    pub fn scan_corpus(repos: &[RepoRecord]) -> Inventory {
        let mut inventory = Inventory::default();
        for repo in repos {
            Self::scan_repository(repo, &mut inventory);
        }
        inventory
    }

    /// Scan one repository record, accumulating into `inventory`.
    pub fn scan_repository(repo: &RepoRecord, inventory: &mut Inventory) {
        inventory.observe_repository(!repo.workflows.is_empty());
        inventory.add_workflows(repo.workflows.len());

        for workflow in &repo.workflows {
            let references = Self::extract_references(
                &repo.name,
                &workflow.name,
                &workflow.path,
                &workflow.content,
            );
            for reference in references {
                inventory.record(reference);
            }
        }
    }

    /// Extract every action reference from one workflow document.
    ///
    /// Empty content, unparseable YAML, and documents without a `jobs`
    /// mapping all yield zero references.
    pub fn extract_references(
        repository: &str,
        workflow_file: &str,
        workflow_path: &str,
        content: &str,
    ) -> Vec<ActionReference> {
        let mut references = Vec::new();

        let doc = match Self::parse_document(content) {
            Some(doc) => doc,
            None => {
                debug!(repository, workflow_file, "skipping empty or unparseable workflow");
                return references;
            }
        };

        let jobs = match doc.get("jobs").and_then(|v| v.as_mapping()) {
            Some(jobs) => jobs,
            None => return references,
        };

        for (job_key, job_config) in jobs {
            let job_name = job_key.as_str().unwrap_or("unknown");
            if !job_config.is_mapping() {
                warn!(repository, workflow_file, job_name, "skipping malformed job entry");
                continue;
            }

            // Job-level `uses` is a reusable workflow call: one reference,
            // distinct from any step-level invocations in the same job.
            if let Some(reference) = job_config.get("uses").and_then(|v| v.as_str()) {
                let invocation = Invocation::ReusableWorkflow {
                    reference,
                    with: job_config.get("with").and_then(|v| v.as_mapping()),
                    secrets: job_config.get("secrets"),
                };
                references.push(Self::build_reference(
                    repository,
                    workflow_file,
                    workflow_path,
                    job_name,
                    JOB_LEVEL_STEP,
                    &invocation,
                ));
            }

            let steps = match job_config.get("steps").and_then(|v| v.as_sequence()) {
                Some(steps) => steps,
                None => continue,
            };

            for (idx, step) in steps.iter().enumerate() {
                let reference = match step.get("uses").and_then(|v| v.as_str()) {
                    Some(reference) => reference,
                    None => continue,
                };
                let step_name = step
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("step-{}", idx + 1));
                let invocation = Invocation::Action {
                    reference,
                    with: step.get("with").and_then(|v| v.as_mapping()),
                    env: step.get("env").and_then(|v| v.as_mapping()),
                };
                references.push(Self::build_reference(
                    repository,
                    workflow_file,
                    workflow_path,
                    job_name,
                    &step_name,
                    &invocation,
                ));
            }
        }

        references
    }

    fn build_reference(
        repository: &str,
        workflow_file: &str,
        workflow_path: &str,
        job_name: &str,
        step_name: &str,
        invocation: &Invocation<'_>,
    ) -> ActionReference {
        let required_secrets = extract_secrets(invocation);
        ActionReference::from_invocation(
            repository,
            workflow_file,
            workflow_path,
            job_name,
            step_name,
            invocation,
            required_secrets,
        )
    }

    fn parse_document(content: &str) -> Option<Value> {
        if content.trim().is_empty() {
            return None;
        }
        match serde_yaml::from_str::<Value>(content) {
            Ok(Value::Null) => None,
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(error = %err, "workflow is not valid YAML");
                None
            }
        }
    }
}

/// Collect the secret names an invocation requires.
///
/// `${{ secrets.NAME }}` expressions are scanned in string-typed `with`
/// and `env` values; a job-level `secrets:` declaration contributes its
/// keys (mapping) or its elements (sequence) directly. The result is
/// deduplicated and sorted.
pub fn extract_secrets(invocation: &Invocation<'_>) -> Vec<String> {
    let secret_re = Regex::new(r"\$\{\{\s*secrets\.([A-Za-z0-9_-]+)\s*\}\}").unwrap();
    let mut names = BTreeSet::new();

    scan_expressions(invocation.with_params(), &secret_re, &mut names);

    match invocation {
        Invocation::Action { env, .. } => scan_expressions(*env, &secret_re, &mut names),
        Invocation::ReusableWorkflow { secrets, .. } => {
            match secrets {
                Some(Value::Mapping(mapping)) => {
                    // Keys of an explicit secrets mapping are the names.
                    for (key, _) in mapping {
                        if let Some(name) = key.as_str() {
                            names.insert(name.to_string());
                        }
                    }
                }
                Some(Value::Sequence(items)) => {
                    for item in items {
                        if let Some(name) = item.as_str() {
                            names.insert(name.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    names.into_iter().collect()
}

fn scan_expressions(
    mapping: Option<&serde_yaml::Mapping>,
    secret_re: &Regex,
    names: &mut BTreeSet<String>,
) {
    let Some(mapping) = mapping else { return };
    for (_, value) in mapping {
        // Only string-typed values can carry an expression.
        if let Some(text) = value.as_str() {
            for capture in secret_re.captures_iter(text) {
                names.insert(capture[1].to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn extract(content: &str) -> Vec<ActionReference> {
        ReferenceExtractor::extract_references(
            "acme/api",
            "ci.yml",
            ".github/workflows/ci.yml",
            content,
        )
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        assert!(extract("").is_empty());
        assert!(extract("   \n").is_empty());
    }

    #[test]
    fn test_invalid_yaml_yields_nothing() {
        assert!(extract("jobs: [unclosed").is_empty());
    }

    #[test]
    fn test_document_without_jobs_yields_nothing() {
        assert!(extract("name: CI\non: push\n").is_empty());
    }

    #[test]
    fn test_step_references_in_document_order() {
        let refs = extract(
            r#"
name: CI
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Setup
        uses: actions/setup-node@v4
      - run: npm test
"#,
        );
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].action_name, "actions/checkout");
        assert_eq!(refs[0].step_name, "step-1");
        assert_eq!(refs[1].action_name, "actions/setup-node");
        assert_eq!(refs[1].step_name, "Setup");
        assert!(refs.iter().all(|r| r.job_name == "build"));
    }

    #[test]
    fn test_job_level_reusable_workflow_call() {
        let refs = extract(
            r#"
jobs:
  deploy:
    uses: octo-org/shared/.github/workflows/deploy.yml@main
    secrets:
      DEPLOY_KEY: ${{ secrets.DEPLOY_KEY }}
"#,
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].step_name, "job-level");
        assert_eq!(refs[0].action_version, "main");
        assert!(!refs[0].is_pinned);
        assert_eq!(refs[0].required_secrets, vec!["DEPLOY_KEY"]);
    }

    #[test]
    fn test_job_level_and_step_level_are_distinct() {
        let refs = extract(
            r#"
jobs:
  release:
    uses: octo-org/shared/.github/workflows/release.yml@v2
  build:
    steps:
      - uses: actions/checkout@v4
"#,
        );
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_malformed_job_is_skipped() {
        let refs = extract(
            r#"
jobs:
  broken: just-a-string
  build:
    steps:
      - uses: actions/checkout@v4
"#,
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].job_name, "build");
    }

    #[test]
    fn test_extract_secrets_from_with_params() {
        let yaml: Value = serde_yaml::from_str(
            r#"
token: ${{ secrets.GH_TOKEN }}
plain: not-a-secret
"#,
        )
        .unwrap();
        let with = yaml.as_mapping().unwrap();
        let invocation = Invocation::Action {
            reference: "some/action@v1",
            with: Some(with),
            env: None,
        };
        assert_eq!(extract_secrets(&invocation), vec!["GH_TOKEN"]);
    }

    #[test]
    fn test_extract_secrets_empty_params() {
        let empty = Mapping::new();
        let invocation = Invocation::Action {
            reference: "some/action@v1",
            with: Some(&empty),
            env: None,
        };
        assert!(extract_secrets(&invocation).is_empty());
    }

    #[test]
    fn test_extract_secrets_deduplicates_across_sources() {
        let refs = extract(
            r#"
jobs:
  publish:
    steps:
      - uses: docker/login-action@v3
        with:
          username: bot
          password: ${{ secrets.REGISTRY_TOKEN }}
        env:
          TOKEN: ${{ secrets.REGISTRY_TOKEN }}
          OTHER: ${{ secrets.NPM_TOKEN }}
"#,
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].required_secrets, vec!["NPM_TOKEN", "REGISTRY_TOKEN"]);
        assert!(refs[0].has_secrets);
    }

    #[test]
    fn test_secrets_sequence_contributes_names_verbatim() {
        let refs = extract(
            r#"
jobs:
  deploy:
    uses: octo-org/shared/.github/workflows/deploy.yml@v1
    secrets: [KUBE_CONFIG, REGISTRY_TOKEN]
"#,
        );
        assert_eq!(refs[0].required_secrets, vec!["KUBE_CONFIG", "REGISTRY_TOKEN"]);
    }

    #[test]
    fn test_non_string_values_are_not_scanned() {
        let refs = extract(
            r#"
jobs:
  build:
    steps:
      - uses: some/action@v1
        with:
          retries: 3
          verbose: true
"#,
        );
        assert!(refs[0].required_secrets.is_empty());
        assert!(!refs[0].has_secrets);
    }
}
