//! Per-module analysis
//!
//! Ties baseline loading, the diff engine and the rule registries together.
//! Modules are independent, so a batch is analyzed in parallel and each
//! module's results come back as one contiguous [`ModuleReport`].

use crate::cmdlet_diff::CmdletDiff;
use crate::conventions::Conventions;
use crate::help::{HelpAnalyzer, HelpSource};
use crate::rules::RuleEngine;
use cmdcompat_core::{
    AnalysisFault, BaselineStatus, CommandFilter, Config, MetadataSnapshot, ModuleReport,
    SnapshotError,
};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Everything needed to analyze one module
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub name: String,

    /// The new build's snapshot
    pub snapshot: MetadataSnapshot,

    /// Where the prior snapshot should be, if anywhere
    pub baseline_path: Option<PathBuf>,

    pub help: Option<HelpSource>,
}

impl ModuleInput {
    pub fn new(name: impl Into<String>, snapshot: MetadataSnapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
            baseline_path: None,
            help: None,
        }
    }

    pub fn with_baseline(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline_path = Some(path.into());
        self
    }

    pub fn with_help(mut self, help: HelpSource) -> Self {
        self.help = Some(help);
        self
    }
}

/// A prior snapshot, if one exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// No file at the baseline path: nothing to compare against yet
    Missing,

    Loaded {
        snapshot: MetadataSnapshot,

        /// Hex SHA-256 of the file contents
        sha256: String,
    },
}

/// Load a prior snapshot; a missing file is `Baseline::Missing`, not an error
pub fn load_baseline(path: &Path) -> Result<Baseline, SnapshotError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Baseline::Missing),
        Err(e) => {
            return Err(SnapshotError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let sha256 = hex::encode(Sha256::digest(&bytes));
    let json = std::str::from_utf8(&bytes).map_err(|e| SnapshotError::Parse(e.to_string()))?;
    let snapshot = MetadataSnapshot::from_json(json)?;

    Ok(Baseline::Loaded { snapshot, sha256 })
}

/// Breaking changes of `new` against the baseline at `path`
///
/// Returns no issues when the baseline does not exist.
pub fn compare_with_baseline(
    path: &Path,
    new: &MetadataSnapshot,
) -> Result<CmdletDiff, SnapshotError> {
    match load_baseline(path)? {
        Baseline::Missing => Ok(CmdletDiff::default()),
        Baseline::Loaded { snapshot, .. } => Ok(CmdletDiff::compare(&snapshot, new)),
    }
}

/// Runs the full analysis for modules
#[derive(Debug, Clone, Default)]
pub struct ModuleAnalyzer {
    conventions: Conventions,
    filter: CommandFilter,
}

impl ModuleAnalyzer {
    pub fn new(conventions: Conventions, filter: CommandFilter) -> Self {
        Self { conventions, filter }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Conventions::from_config(&config.conventions), config.filter.clone())
    }

    /// Analyze one module
    ///
    /// Baseline problems only skip the diff; rules and help always run.
    pub fn analyze(&self, input: &ModuleInput) -> ModuleReport {
        let mut report = ModuleReport::new(&input.name);
        let snapshot = self.apply_filter(&input.snapshot);
        report.commands_analyzed = snapshot.commands.len();

        if let Some(path) = &input.baseline_path {
            self.run_diff(&input.name, path, &snapshot, &mut report);
        }

        let signature = RuleEngine::signature().evaluate(&snapshot, &self.conventions);
        report.signature_issues = signature.issues;
        report.faults.extend(signature.faults);

        if let Some(help) = &input.help {
            let help = HelpAnalyzer::analyze(&input.name, &snapshot, help);
            report.help_issues = help.issues;
            report.faults.extend(help.faults);
        }

        tracing::info!(
            module = %input.name,
            commands = report.commands_analyzed,
            breaking = report.breaking_changes.len(),
            signature = report.signature_issues.len(),
            help = report.help_issues.len(),
            "Module analyzed"
        );

        report
    }

    /// Analyze modules in parallel; results keep input order
    pub fn analyze_all(&self, inputs: &[ModuleInput]) -> Vec<ModuleReport> {
        inputs.par_iter().map(|input| self.analyze(input)).collect()
    }

    fn apply_filter(&self, snapshot: &MetadataSnapshot) -> MetadataSnapshot {
        snapshot.filtered(|command| {
            let skipped = self.filter.is_skipped(&command.name);
            if skipped {
                tracing::debug!(command = %command.name, "Skipping filtered command");
            }
            !skipped
        })
    }

    fn run_diff(&self, module: &str, path: &Path, snapshot: &MetadataSnapshot, report: &mut ModuleReport) {
        let shown = path.display().to_string();

        match load_baseline(path) {
            Ok(Baseline::Missing) => {
                tracing::warn!(module, path = %shown, "No baseline snapshot, skipping breaking change analysis");
                report.baseline = BaselineStatus::Missing { path: shown };
            }
            Ok(Baseline::Loaded { snapshot: old, sha256 }) => {
                let old = self.apply_filter(&old);
                report.breaking_changes = CmdletDiff::compare(&old, snapshot).into_issues();
                report.baseline = BaselineStatus::Compared { path: shown, sha256 };
            }
            Err(e @ SnapshotError::Io { .. }) => {
                tracing::error!(module, path = %shown, error = %e, "Failed to read baseline snapshot");
                report.faults.push(AnalysisFault::UnreadableBaseline {
                    path: shown.clone(),
                    message: e.to_string(),
                });
                report.baseline = BaselineStatus::Failed { path: shown };
            }
            Err(e) => {
                tracing::error!(module, path = %shown, error = %e, "Malformed baseline snapshot");
                report.faults.push(AnalysisFault::MalformedSnapshot {
                    path: shown.clone(),
                    message: e.to_string(),
                });
                report.baseline = BaselineStatus::Failed { path: shown };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdcompat_core::{CommandMetadata, ProblemId};

    fn write_baseline(dir: &Path, name: &str, snapshot: &MetadataSnapshot) -> PathBuf {
        let path = dir.join(format!("{}.json", name));
        std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();
        path
    }

    #[test]
    fn missing_baseline_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert_eq!(load_baseline(&path).unwrap(), Baseline::Missing);
        assert!(compare_with_baseline(&path, &MetadataSnapshot::default())
            .unwrap()
            .issues
            .is_empty());
    }

    #[test]
    fn loaded_baseline_records_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_baseline(dir.path(), "Contoso", &MetadataSnapshot::default());

        match load_baseline(&path).unwrap() {
            Baseline::Loaded { sha256, .. } => assert_eq!(sha256.len(), 64),
            other => panic!("unexpected baseline {:?}", other),
        }
    }

    #[test]
    fn malformed_baseline_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ \"commands\": 7 }").unwrap();

        assert!(matches!(load_baseline(&path), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn unreadable_baseline_is_a_fault() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = MetadataSnapshot::new(vec![
            CommandMetadata::new("Get-Widget", "GetWidgetCommand").with_output_type("Contoso.Widget"),
        ]);

        // A directory cannot be read as a file
        let report = ModuleAnalyzer::default()
            .analyze(&ModuleInput::new("Contoso", snapshot).with_baseline(dir.path()));

        assert!(matches!(report.faults[..], [AnalysisFault::UnreadableBaseline { .. }]));
        assert!(matches!(report.baseline, BaselineStatus::Failed { .. }));
        assert!(report.breaking_changes.is_empty());
    }

    #[test]
    fn filter_applies_to_both_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let old = MetadataSnapshot::new(vec![
            CommandMetadata::new("Get-Widget", "GetWidgetCommand").with_output_type("Contoso.Widget"),
            CommandMetadata::new("Get-InternalWidget", "GetInternalWidgetCommand"),
        ]);
        let path = write_baseline(dir.path(), "Contoso", &old);

        // The internal command disappears, but it is filtered out
        let new = MetadataSnapshot::new(vec![old.commands[0].clone()]);
        let analyzer = ModuleAnalyzer::new(
            Conventions::default(),
            CommandFilter {
                skip_commands: vec!["*-Internal*".into()],
            },
        );

        let report = analyzer.analyze(&ModuleInput::new("Contoso", new).with_baseline(path));
        assert!(report.breaking_changes.is_empty());
        assert_eq!(report.commands_analyzed, 1);
        assert!(matches!(report.baseline, BaselineStatus::Compared { .. }));
    }

    #[test]
    fn help_runs_only_when_configured() {
        let snapshot = MetadataSnapshot::new(vec![
            CommandMetadata::new("Get-Widget", "GetWidgetCommand").with_output_type("Contoso.Widget"),
        ]);
        let analyzer = ModuleAnalyzer::default();

        let without = analyzer.analyze(&ModuleInput::new("Contoso", snapshot.clone()));
        assert!(without.help_issues.is_empty());
        assert_eq!(without.baseline, BaselineStatus::NotConfigured);

        let with = analyzer.analyze(
            &ModuleInput::new("Contoso", snapshot)
                .with_help(HelpSource::Records(crate::help::HelpRecords::default())),
        );
        assert_eq!(with.help_issues.len(), 1);
        assert_eq!(with.help_issues[0].problem_id, ProblemId::MissingHelp);
    }
}
