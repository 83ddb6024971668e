use crate::reference::{ActionReference, Classification, RiskLevel};
use regex::Regex;

/// Score weights for the additive risk model. The final score is capped
/// at [`MAX_SCORE`].
const UNPINNED_WEIGHT: u32 = 30;
const SECRETS_WEIGHT: u32 = 25;
const HIGH_RISK_PATTERN_WEIGHT: u32 = 15;
const THIRD_PARTY_WEIGHT: u32 = 20;
const PRODUCTION_WEIGHT: u32 = 10;
const MAX_SCORE: u32 = 100;

/// Ordered high-risk name patterns; the first match contributes
/// [`HIGH_RISK_PATTERN_WEIGHT`] once, no matter how many would match.
pub const HIGH_RISK_PATTERNS: &[&str] = &[
    "docker://",
    "run:",
    "setup-",
    "checkout@",
    "upload-",
    "download-",
    "deploy-",
    "aws-",
    "gcp-",
    "azure-",
    "terraform-",
    "kubernetes-",
    "docker",
    "ssh-",
];

/// Naming heuristics suggesting a workflow or job touches a live
/// environment.
pub const PRODUCTION_INDICATORS: &[&str] = &[
    "prod",
    "release",
    "deploy",
    "publish",
    "main",
    "master",
    "live",
    "kubesealer",
    "docker-publish",
    "delivery",
];

const PRIVILEGED_PATTERNS: &[(&str, &str)] = &[
    ("docker", "container manipulation privileges"),
    ("kube", "kubernetes api access"),
    ("admin", "administrative access"),
    ("root", "root/elevated permissions"),
    ("privileged", "explicitly marked as privileged"),
    ("sudo", "sudo/superuser execution"),
];

const FS_ACCESS_PATTERNS: &[(&str, &str)] = &[
    ("checkout", "source code access"),
    ("upload", "file upload capabilities"),
    ("download", "file download capabilities"),
    ("artifact", "artifact manipulation"),
    ("cache", "cache access"),
    ("file", "file operations"),
    ("path", "path manipulation"),
    ("dir", "directory operations"),
    ("directory", "directory operations"),
];

const NETWORK_PATTERNS: &[(&str, &str)] = &[
    ("http", "http requests"),
    ("curl", "curl commands"),
    ("wget", "wget downloads"),
    ("api", "api access"),
    ("request", "network requests"),
    ("fetch", "data fetching"),
    ("download", "download capability"),
    ("deploy", "deployment (potentially remote)"),
    ("publish", "publishing (potentially remote)"),
];

// The `v[0-9]+.*` pattern matches nearly every versioned action name,
// so `deprecated` over-flags heavily. Kept as-is: downstream reports
// treat it as a weak hint, not a finding.
const DEPRECATED_PATTERNS: &[&str] = &["deprecated", "v[0-9]+.*", "legacy"];

/// Classify one reference in place. Pure over the extraction fields, so
/// re-running produces identical output.
pub fn classify(reference: &mut ActionReference) {
    let score = risk_score(reference);
    let params_text = reference.params_text();

    let privileged_reasons = detect_capabilities(PRIVILEGED_PATTERNS, reference, &params_text);
    let fs_access_reasons = detect_capabilities(FS_ACCESS_PATTERNS, reference, &params_text);
    let network_access_reasons = detect_capabilities(NETWORK_PATTERNS, reference, &params_text);
    let production_indicators = production_indicators(reference);

    reference.classification = Some(Classification {
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        privileged: !privileged_reasons.is_empty(),
        privileged_reasons,
        file_system_access: !fs_access_reasons.is_empty(),
        fs_access_reasons,
        network_access: !network_access_reasons.is_empty(),
        network_access_reasons,
        deprecated: is_deprecated(&reference.action_name),
        production_workflow: !production_indicators.is_empty(),
        production_indicators,
    });
}

/// Classify every reference in the inventory.
pub fn classify_all(references: &mut [ActionReference]) {
    for reference in references {
        classify(reference);
    }
}

/// Additive, capped risk score. Each factor only ever adds, so the
/// score is monotonic in every individual signal.
pub fn risk_score(reference: &ActionReference) -> u8 {
    let mut score = 0u32;

    if !reference.is_pinned {
        score += UNPINNED_WEIGHT;
    }
    if reference.has_secrets {
        score += SECRETS_WEIGHT;
    }
    if HIGH_RISK_PATTERNS.iter().any(|pattern| {
        contains_ci(&reference.action_name, pattern)
            || contains_ci(&reference.full_reference, pattern)
    }) {
        score += HIGH_RISK_PATTERN_WEIGHT;
    }
    if reference.is_third_party {
        score += THIRD_PARTY_WEIGHT;
    }
    if PRODUCTION_INDICATORS.iter().any(|indicator| {
        contains_ci(&reference.workflow_file, indicator)
            || contains_ci(&reference.workflow_path, indicator)
            || contains_ci(&reference.job_name, indicator)
    }) {
        score += PRODUCTION_WEIGHT;
    }

    score.min(MAX_SCORE) as u8
}

/// Scan a capability dictionary against the action name and stringified
/// parameters. Every matching pattern contributes its reason.
fn detect_capabilities(
    patterns: &[(&str, &str)],
    reference: &ActionReference,
    params_text: &str,
) -> Vec<String> {
    let mut reasons = Vec::new();
    for (pattern, reason) in patterns {
        if contains_ci(&reference.action_name, pattern) || contains_ci(params_text, pattern) {
            reasons.push(format!("{} ({})", reason, pattern));
        }
    }
    reasons
}

/// Deduplicated production indicators matched by the workflow file
/// name, path, or job name.
fn production_indicators(reference: &ActionReference) -> Vec<String> {
    PRODUCTION_INDICATORS
        .iter()
        .filter(|indicator| {
            contains_ci(&reference.workflow_file, indicator)
                || contains_ci(&reference.workflow_path, indicator)
                || contains_ci(&reference.job_name, indicator)
        })
        .map(|indicator| indicator.to_string())
        .collect()
}

fn is_deprecated(action_name: &str) -> bool {
    DEPRECATED_PATTERNS.iter().any(|pattern| {
        if let Ok(re) = Regex::new(&format!("(?i){}", pattern)) {
            re.is_match(action_name)
        } else {
            false
        }
    })
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ReferenceExtractor;
    use crate::reference::Invocation;

    fn plain_reference(action: &str, workflow_file: &str, job_name: &str) -> ActionReference {
        let invocation = Invocation::Action {
            reference: action,
            with: None,
            env: None,
        };
        ActionReference::from_invocation(
            "acme/api",
            workflow_file,
            &format!(".github/workflows/{}", workflow_file),
            job_name,
            "step-1",
            &invocation,
            Vec::new(),
        )
    }

    #[test]
    fn test_pinned_first_party_benign_name_scores_low() {
        // Pinned, no secrets, first-party, no production naming. The
        // checkout@ pattern still matches the full reference.
        let r = plain_reference(
            "actions/checkout@a81bbbf8298c0fa03ea29cdc473d45769f953675",
            "lint.yml",
            "lint",
        );
        assert_eq!(risk_score(&r), 15);
        assert_eq!(RiskLevel::from_score(risk_score(&r)), RiskLevel::Low);
    }

    #[test]
    fn test_high_risk_pattern_applies_once() {
        // Matches docker, deploy-, download- — still one +15.
        let r = plain_reference(
            "acme/docker-deploy-download@a81bbbf8298c0fa03ea29cdc473d45769f953675",
            "lint.yml",
            "lint",
        );
        // 15 (pattern) + 20 (third party)
        assert_eq!(risk_score(&r), 35);
    }

    #[test]
    fn test_full_scenario_scores_maximum() {
        let mut r = plain_reference("docker/build-push-action@v5", "deploy.yml", "build");
        r.required_secrets = vec!["DOCKER_PW".into()];
        r.has_secrets = true;

        // 30 unpinned + 25 secrets + 15 pattern + 20 third party + 10 production
        assert_eq!(risk_score(&r), 100);
        classify(&mut r);
        let classification = r.classification.as_ref().unwrap();
        assert_eq!(classification.risk_level, RiskLevel::High);
        assert!(classification.production_workflow);
        assert_eq!(classification.production_indicators, vec!["deploy"]);
    }

    #[test]
    fn test_score_monotonic_in_each_factor() {
        let base = plain_reference(
            "acme/quiet-tool@a81bbbf8298c0fa03ea29cdc473d45769f953675",
            "lint.yml",
            "lint",
        );
        let base_score = risk_score(&base);

        let mut unpinned = base.clone();
        unpinned.is_pinned = false;
        assert!(risk_score(&unpinned) >= base_score);

        let mut with_secrets = base.clone();
        with_secrets.has_secrets = true;
        assert!(risk_score(&with_secrets) >= base_score);

        let mut in_prod = base.clone();
        in_prod.workflow_file = "release.yml".into();
        assert!(risk_score(&in_prod) >= base_score);
    }

    #[test]
    fn test_production_indicator_in_job_name_counts() {
        let quiet = plain_reference(
            "acme/quiet-tool@a81bbbf8298c0fa03ea29cdc473d45769f953675",
            "ci.yml",
            "build",
        );
        let prod_job = plain_reference(
            "acme/quiet-tool@a81bbbf8298c0fa03ea29cdc473d45769f953675",
            "ci.yml",
            "deploy-staging",
        );
        assert_eq!(risk_score(&prod_job), risk_score(&quiet) + 10);
    }

    #[test]
    fn test_capability_detectors_collect_all_reasons() {
        let mut r = plain_reference("docker/build-push-action@v5", "ci.yml", "build");
        classify(&mut r);
        let c = r.classification.as_ref().unwrap();

        assert!(c.privileged);
        assert!(c
            .privileged_reasons
            .iter()
            .any(|reason| reason.contains("(docker)")));
        // "push" in the name does not trigger network, but detectors
        // overlap elsewhere by design.
        assert!(c.fs_access_reasons.is_empty());
        assert!(!c.file_system_access);
    }

    #[test]
    fn test_capability_detectors_scan_params() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("script: curl https://example.com/install.sh | sh").unwrap();
        let invocation = Invocation::Action {
            reference: "acme/runner@v1",
            with: yaml.as_mapping(),
            env: None,
        };
        let mut r = ActionReference::from_invocation(
            "acme/api",
            "ci.yml",
            ".github/workflows/ci.yml",
            "build",
            "step-1",
            &invocation,
            Vec::new(),
        );
        classify(&mut r);
        let c = r.classification.as_ref().unwrap();
        assert!(c.network_access);
        assert!(c
            .network_access_reasons
            .iter()
            .any(|reason| reason.contains("(curl)")));
    }

    #[test]
    fn test_deprecation_heuristic_is_permissive() {
        assert!(is_deprecated("acme/legacy-build"));
        assert!(is_deprecated("acme/deprecated-tool"));
        // Over-broad version pattern: any vN in the name matches.
        assert!(is_deprecated("acme/v2-migrator"));
        assert!(!is_deprecated("acme/quiet-tool"));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let refs = ReferenceExtractor::extract_references(
            "acme/api",
            "deploy.yml",
            ".github/workflows/deploy.yml",
            r#"
jobs:
  build:
    steps:
      - uses: docker/build-push-action@v5
        with:
          password: ${{ secrets.DOCKER_PW }}
"#,
        );
        let mut first = refs[0].clone();
        classify(&mut first);
        let mut second = first.clone();
        classify(&mut second);
        assert_eq!(first.classification, second.classification);
    }

    #[test]
    fn test_classifier_tolerates_sparse_references() {
        let mut r = plain_reference("tool", "x.yml", "y");
        r.action_version = String::new();
        r.with_params = Default::default();
        classify(&mut r);
        assert!(r.classification.is_some());
    }
}
