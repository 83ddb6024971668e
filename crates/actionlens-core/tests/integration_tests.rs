use actionlens_core::classifier;
use actionlens_core::report;
use actionlens_core::{
    load_corpus, load_references, ActionReference, Inventory, InventoryError, ReferenceExtractor,
    RepoRecord, RiskLevel, SecurityStats, WorkflowFile,
};
use std::path::{Path, PathBuf};

/// Get the workspace root (two levels up from CARGO_MANIFEST_DIR of actionlens-core).
fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .unwrap() // crates/
        .parent()
        .unwrap() // workspace root
        .join("tests/fixtures")
}

fn workflow_fixture(name: &str) -> WorkflowFile {
    let path = fixtures_dir().join("workflows").join(name);
    WorkflowFile {
        name: name.to_string(),
        path: format!(".github/workflows/{}", name),
        content: std::fs::read_to_string(path).unwrap(),
    }
}

fn fixture_corpus() -> Vec<RepoRecord> {
    vec![
        RepoRecord {
            name: "acme/api".to_string(),
            workflows: vec![workflow_fixture("ci.yml"), workflow_fixture("deploy.yml")],
        },
        RepoRecord {
            name: "acme/shared".to_string(),
            workflows: vec![
                workflow_fixture("release.yml"),
                workflow_fixture("broken.yml"),
            ],
        },
        RepoRecord {
            name: "acme/empty".to_string(),
            workflows: vec![],
        },
    ]
}

fn classified_fixture_references() -> Vec<ActionReference> {
    let inventory = ReferenceExtractor::scan_corpus(&fixture_corpus());
    let mut references = inventory.into_references();
    classifier::classify_all(&mut references);
    references
}

#[test]
fn test_corpus_extraction_counts() {
    let inventory = ReferenceExtractor::scan_corpus(&fixture_corpus());
    let summary = inventory.summary();

    assert_eq!(summary.total_repositories, 3);
    assert_eq!(summary.repos_with_workflows, 2);
    assert_eq!(summary.total_workflows, 4);
    // ci.yml: 3, deploy.yml: 3, release.yml: 2 (job-level + step),
    // broken.yml: 0 (skipped, never aborts the pass).
    assert_eq!(summary.total_actions, 8);
    assert!(summary
        .unique_actions
        .iter()
        .any(|name| name == "acme/shared-workflows/.github/workflows/publish.yml"));
}

#[test]
fn test_job_level_call_is_distinct_reference() {
    let references = classified_fixture_references();
    let publish: Vec<&ActionReference> = references
        .iter()
        .filter(|r| r.repository == "acme/shared" && r.job_name == "publish")
        .collect();
    assert_eq!(publish.len(), 1);
    assert_eq!(publish[0].step_name, "job-level");
    assert_eq!(publish[0].required_secrets, vec!["CRATES_TOKEN", "NPM_TOKEN"]);
}

#[test]
fn test_deploy_scenario_scores_maximum() {
    let references = classified_fixture_references();
    let docker = references
        .iter()
        .find(|r| r.action_name == "docker/build-push-action")
        .unwrap();

    assert!(!docker.is_pinned);
    assert!(docker.is_third_party);
    assert!(docker.has_secrets);
    assert_eq!(docker.required_secrets, vec!["DOCKER_PW"]);

    let classification = docker.classification.as_ref().unwrap();
    assert_eq!(classification.risk_score, 100);
    assert_eq!(classification.risk_level, RiskLevel::High);
    assert!(classification.production_workflow);
    assert!(classification
        .production_indicators
        .contains(&"deploy".to_string()));
}

#[test]
fn test_pinned_checkout_stays_low_risk() {
    let references = classified_fixture_references();
    let pinned = references
        .iter()
        .find(|r| r.action_version == "a81bbbf8298c0fa03ea29cdc473d45769f953675")
        .unwrap();
    assert!(pinned.is_pinned);
    assert!(!pinned.is_third_party);
    let classification = pinned.classification.as_ref().unwrap();
    assert_eq!(classification.risk_level, RiskLevel::Low);
}

#[test]
fn test_stats_are_reproducible() {
    let references = classified_fixture_references();
    let first = SecurityStats::compute(&references);
    let second = SecurityStats::compute(&references);

    assert_eq!(first.total_actions, second.total_actions);
    assert_eq!(first.high_risk_repositories, second.high_risk_repositories);
    assert_eq!(
        first
            .top_actions
            .iter()
            .map(|row| row.action_name.clone())
            .collect::<Vec<_>>(),
        second
            .top_actions
            .iter()
            .map(|row| row.action_name.clone())
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_full_pipeline_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data/raw");
    let processed_dir = dir.path().join("processed");
    std::fs::create_dir_all(&processed_dir).unwrap();

    // Lay the corpus out the way the collector does: one directory per
    // repository with a workflows.json record.
    for repo in fixture_corpus() {
        let repo_dir = data_dir.join(repo.name.replace('/', "_"));
        std::fs::create_dir_all(&repo_dir).unwrap();
        std::fs::write(
            repo_dir.join("workflows.json"),
            serde_json::to_string_pretty(&repo).unwrap(),
        )
        .unwrap();
    }

    let repos = load_corpus(&data_dir).unwrap();
    assert_eq!(repos.len(), 3);

    let inventory = ReferenceExtractor::scan_corpus(&repos);
    let inventory_path = processed_dir.join("actions_inventory.json");
    inventory.write_json(&inventory_path).unwrap();
    inventory
        .write_csv(&processed_dir.join("actions_inventory.csv"))
        .unwrap();
    inventory
        .write_summary(&processed_dir.join("actions_summary.json"))
        .unwrap();

    let mut references = load_references(&inventory_path).unwrap();
    assert_eq!(references.len(), 8);
    assert!(references.iter().all(|r| r.classification.is_none()));

    classifier::classify_all(&mut references);
    let stats = SecurityStats::compute(&references);
    assert_eq!(stats.total_actions, 8);
    assert!(stats.risk_distribution.high >= 1);

    let markdown = report::generate_markdown_report(&stats, &references);
    assert!(markdown.contains("docker/build-push-action"));
    let html = report::generate_html_report(&stats, &references);
    assert!(html.contains("docker/build-push-action"));
}

#[test]
fn test_report_stage_without_inventory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_references(&dir.path().join("actions_inventory.json")).unwrap_err();
    assert!(matches!(err, InventoryError::Missing { .. }));
}

#[test]
fn test_classified_inventory_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classified.json");

    let references = classified_fixture_references();
    let mut inventory = Inventory::default();
    for reference in references.clone() {
        inventory.record(reference);
    }
    inventory.write_json(&path).unwrap();

    let loaded = load_references(&path).unwrap();
    assert_eq!(loaded.len(), references.len());
    let docker = loaded
        .iter()
        .find(|r| r.action_name == "docker/build-push-action")
        .unwrap();
    assert_eq!(
        docker.classification.as_ref().unwrap().risk_score,
        100
    );
}
