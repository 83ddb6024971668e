use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Namespaces whose actions are considered first-party (GitHub-owned).
pub const FIRST_PARTY_PREFIXES: &[&str] = &["actions/", "github/"];

/// Version placeholder for references without an `@` component.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// Step label used for job-level reusable workflow calls.
pub const JOB_LEVEL_STEP: &str = "job-level";

/// One `uses:` invocation site, before it is normalized into an
/// [`ActionReference`]. Job-level calls and step-level calls are shaped
/// differently in workflow YAML, so each variant carries only the fields
/// it can legitimately have.
#[derive(Debug, Clone)]
pub enum Invocation<'a> {
    /// Job-level `uses:` of a reusable workflow. May declare an explicit
    /// `secrets:` mapping or list.
    ReusableWorkflow {
        reference: &'a str,
        with: Option<&'a Mapping>,
        secrets: Option<&'a Value>,
    },
    /// Step-level `uses:` of an action.
    Action {
        reference: &'a str,
        with: Option<&'a Mapping>,
        env: Option<&'a Mapping>,
    },
}

impl<'a> Invocation<'a> {
    pub fn reference(&self) -> &'a str {
        match self {
            Invocation::ReusableWorkflow { reference, .. } => reference,
            Invocation::Action { reference, .. } => reference,
        }
    }

    pub fn with_params(&self) -> Option<&'a Mapping> {
        match self {
            Invocation::ReusableWorkflow { with, .. } => *with,
            Invocation::Action { with, .. } => *with,
        }
    }
}

/// Risk tier derived from the numeric risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Tier boundaries are inclusive-lower: 70 -> High, 40 -> Medium.
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskLevel::High
        } else if score >= 40 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

/// Classifier output attached to a reference. Written once by the
/// classifier; every field is a pure function of the extraction fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub privileged: bool,
    pub privileged_reasons: Vec<String>,
    pub file_system_access: bool,
    pub fs_access_reasons: Vec<String>,
    pub network_access: bool,
    pub network_access_reasons: Vec<String>,
    pub deprecated: bool,
    pub production_workflow: bool,
    pub production_indicators: Vec<String>,
}

/// One concrete invocation of an action or reusable workflow inside a
/// workflow job or step. Created once during extraction; the classifier
/// later fills in `classification` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReference {
    pub repository: String,
    pub workflow_file: String,
    pub workflow_path: String,
    pub job_name: String,
    pub step_name: String,
    pub action_name: String,
    pub action_version: String,
    pub full_reference: String,
    pub is_pinned: bool,
    pub is_third_party: bool,
    pub required_secrets: Vec<String>,
    pub has_secrets: bool,
    #[serde(default)]
    pub with_params: Mapping,
    #[serde(flatten)]
    pub classification: Option<Classification>,
}

impl ActionReference {
    /// Normalize one invocation site into a reference record.
    pub fn from_invocation(
        repository: &str,
        workflow_file: &str,
        workflow_path: &str,
        job_name: &str,
        step_name: &str,
        invocation: &Invocation<'_>,
        required_secrets: Vec<String>,
    ) -> Self {
        let raw = invocation.reference();
        let (action_name, action_version) = split_reference(raw);

        ActionReference {
            repository: repository.to_string(),
            workflow_file: workflow_file.to_string(),
            workflow_path: workflow_path.to_string(),
            job_name: job_name.to_string(),
            step_name: step_name.to_string(),
            action_name: action_name.to_string(),
            action_version: action_version.to_string(),
            full_reference: raw.to_string(),
            is_pinned: is_pinned(action_version),
            is_third_party: is_third_party(action_name),
            has_secrets: !required_secrets.is_empty(),
            required_secrets,
            with_params: invocation.with_params().cloned().unwrap_or_default(),
            classification: None,
        }
    }

    /// Stringified parameter mapping, as scanned by the capability
    /// detectors. Falls back to empty on unserializable values.
    pub fn params_text(&self) -> String {
        if self.with_params.is_empty() {
            return String::new();
        }
        serde_yaml::to_string(&Value::Mapping(self.with_params.clone())).unwrap_or_default()
    }
}

/// Split a raw `uses:` string into (name, version) on the last `@`.
/// GitHub's `uses:` syntax has no escape sequence for `@`, so the last
/// occurrence is always the version separator. No `@` means the version
/// was left unspecified.
pub fn split_reference(raw: &str) -> (&str, &str) {
    match raw.rsplit_once('@') {
        Some((name, version)) => (name, version),
        None => (raw, UNSPECIFIED_VERSION),
    }
}

/// A reference is pinned iff its version is a full 40-char lowercase hex
/// commit hash. Tags, branches, and short hashes are all mutable.
pub fn is_pinned(version: &str) -> bool {
    let sha_re = Regex::new(r"^[0-9a-f]{40}$").unwrap();
    sha_re.is_match(version)
}

pub fn is_third_party(action_name: &str) -> bool {
    !FIRST_PARTY_PREFIXES
        .iter()
        .any(|prefix| action_name.starts_with(prefix))
}
