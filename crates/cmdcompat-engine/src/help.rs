//! Help coverage checks
//!
//! Same registry shape as the signature rules, but the input is the set of
//! documented command names rather than anything in the snapshot.

use crate::rules::{Rule, RuleEngine, RuleEvaluation};
use cmdcompat_core::{CommandMetadata, Issue, MetadataSnapshot, ProblemId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Documented command names, compared case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpRecords {
    names: HashSet<String>,
}

impl HelpRecords {
    pub fn new<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// Parse one command name per line; blank lines and `#` comments are skipped
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().filter(|line| !line.trim_start().starts_with('#')))
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn contains(&self, command: &str) -> bool {
        self.names.contains(&command.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Where a module's help records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpSource {
    Records(HelpRecords),

    /// Help was expected at `path` but nothing was there
    Missing { path: PathBuf },
}

impl HelpSource {
    /// Load help records, treating a missing file as `Missing`
    pub fn load(path: &Path) -> std::io::Result<Self> {
        match HelpRecords::from_file(path) {
            Ok(records) => Ok(Self::Records(records)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::Missing {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Help rules, in registration order
pub static HELP_RULES: &[Rule<HelpRecords>] = &[Rule {
    name: "missing-help",
    problem_id: ProblemId::MissingHelp,
    check: missing_help,
}];

fn missing_help(command: &CommandMetadata, records: &HelpRecords) -> Vec<String> {
    if records.contains(&command.name) {
        Vec::new()
    } else {
        vec![format!(
            "Help missing for command {} implemented by class {}",
            command.name, command.implementing_class_name
        )]
    }
}

pub struct HelpAnalyzer;

impl HelpAnalyzer {
    /// Check every command of `snapshot` against the module's help source
    ///
    /// A missing help source yields a single module-level issue instead of one
    /// issue per command.
    pub fn analyze(module: &str, snapshot: &MetadataSnapshot, source: &HelpSource) -> RuleEvaluation {
        match source {
            HelpSource::Records(records) => RuleEngine::new(HELP_RULES).evaluate(snapshot, records),
            HelpSource::Missing { path } => {
                tracing::warn!(module = module, path = %path.display(), "Help file not found");
                RuleEvaluation {
                    issues: vec![Issue::new(
                        ProblemId::MissingHelpFile,
                        module,
                        module,
                        format!("Help file {} for module {} was not found", path.display(), module),
                    )],
                    faults: Vec::new(),
                }
            }
        }
    }
}
