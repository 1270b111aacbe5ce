//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::diagnostic::{Issue, IssueCategory};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What happened with the prior snapshot of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineStatus {
    /// No baseline location was given
    NotConfigured,

    /// No baseline file exists yet; diff skipped
    Missing { path: String },

    /// Baseline loaded and compared
    Compared { path: String, sha256: String },

    /// Baseline could not be read or parsed; diff skipped
    Failed { path: String },
}

/// A condition that stopped part of a module's analysis
///
/// Faults are not issues: they describe analysis that could not run, not
/// problems found in the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisFault {
    /// A snapshot file exists but is not a valid snapshot
    MalformedSnapshot { path: String, message: String },

    /// The baseline exists but could not be read
    UnreadableBaseline { path: String, message: String },

    /// The help records exist but could not be read; help checks skipped
    UnreadableHelp { path: String, message: String },

    /// One rule failed for one command; the rest of the pass continued
    RuleEvaluation {
        rule: String,
        problem_id: u32,
        target: String,
        message: String,
    },
}

impl std::fmt::Display for AnalysisFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSnapshot { path, message } => {
                write!(f, "malformed snapshot {}: {}", path, message)
            }
            Self::UnreadableBaseline { path, message } => {
                write!(f, "unreadable baseline {}: {}", path, message)
            }
            Self::UnreadableHelp { path, message } => {
                write!(f, "unreadable help records {}: {}", path, message)
            }
            Self::RuleEvaluation { rule, problem_id, target, message } => {
                write!(f, "rule {} ({}) failed for {}: {}", rule, problem_id, target, message)
            }
        }
    }
}

/// All results for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub module: String,

    pub baseline: BaselineStatus,

    /// Number of commands analyzed after filtering
    pub commands_analyzed: usize,

    pub breaking_changes: Vec<Issue>,

    pub signature_issues: Vec<Issue>,

    pub help_issues: Vec<Issue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<AnalysisFault>,
}

impl ModuleReport {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            baseline: BaselineStatus::NotConfigured,
            commands_analyzed: 0,
            breaking_changes: Vec::new(),
            signature_issues: Vec::new(),
            help_issues: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Issues of one category, in emission order
    pub fn issues(&self, category: IssueCategory) -> &[Issue] {
        match category {
            IssueCategory::BreakingChange => &self.breaking_changes,
            IssueCategory::Signature => &self.signature_issues,
            IssueCategory::Help => &self.help_issues,
        }
    }

    pub fn has_breaking_changes(&self) -> bool {
        !self.breaking_changes.is_empty()
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub modules_analyzed: usize,

    /// Modules with no baseline to compare against
    pub baselines_missing: usize,

    pub commands_analyzed: usize,

    pub breaking_changes: usize,

    pub signature_issues: usize,

    pub help_issues: usize,

    pub faults: usize,
}

/// Analysis report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    pub summary: ReportSummary,

    /// Per-module results, in input order
    pub modules: Vec<ModuleReport>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            modules: Vec::new(),
        }
    }

    /// Create a report from module results
    pub fn from_modules(modules: Vec<ModuleReport>) -> Self {
        let mut report = Self::new();
        for module in modules {
            report.add_module(module);
        }
        report
    }

    /// Append one module's results as a contiguous unit
    pub fn add_module(&mut self, module: ModuleReport) {
        self.summary.modules_analyzed += 1;
        if matches!(module.baseline, BaselineStatus::Missing { .. }) {
            self.summary.baselines_missing += 1;
        }
        self.summary.commands_analyzed += module.commands_analyzed;
        self.summary.breaking_changes += module.breaking_changes.len();
        self.summary.signature_issues += module.signature_issues.len();
        self.summary.help_issues += module.help_issues.len();
        self.summary.faults += module.faults.len();
        self.modules.push(module);
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.summary.breaking_changes > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Render one category as a CSV table
    pub fn to_csv(&self, category: IssueCategory) -> String {
        let mut out = String::from("Module,ClassName,Target,Severity,ProblemId,Description,Remediation\n");

        for module in &self.modules {
            for issue in module.issues(category) {
                let row = [
                    csv_field(&module.module),
                    csv_field(&issue.implementing_class_name),
                    csv_field(&issue.target),
                    issue.severity.to_string(),
                    issue.problem_id.to_string(),
                    csv_field(&issue.description),
                    csv_field(&issue.remediation),
                ];
                out.push_str(&row.join(","));
                out.push('\n');
            }
        }

        out
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a field when it contains a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
