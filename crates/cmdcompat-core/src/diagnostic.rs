//! Problem ids and issue records
//!
//! IMPORTANT: Problem ids are versioned and stable.
//! NEVER reassign or remove an id - they are part of the public API.
//! Add new problems with new numbers only.

use crate::metadata::CommandMetadata;
use serde::{Deserialize, Serialize};

/// Problem id registry (v1)
///
/// Numbering:
/// - 1xxx: command-level breaking changes
/// - 2xxx: parameter-level breaking changes
/// - 3xxx: parameter-set breaking changes
/// - 6xxx: help
/// - 8xxx: signature conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ProblemId {
    // Command-level breaking changes (1xxx)
    /// A command present in the old module is gone
    RemovedCommand,

    /// The command no longer supports the confirmation protocol
    RemovedConfirmationSupport,

    /// The default parameter set moved to another set
    ChangedDefaultParameterSet,

    /// An output type is no longer produced
    RemovedOutputType,

    /// An output type is still named but no longer interchangeable
    ChangedOutputType,

    // Parameter-level breaking changes (2xxx)
    /// A parameter was removed from a parameter set
    RemovedParameter,

    /// An alias of a parameter was removed
    RemovedParameterAlias,

    /// A parameter's type changed incompatibly
    ChangedParameterType,

    /// An optional parameter became mandatory
    ParameterBecameMandatory,

    /// A parameter's position changed
    ChangedParameterPosition,

    /// A parameter no longer accepts pipeline input
    RemovedPipelineBinding,

    /// A mandatory parameter was added to an existing parameter set
    AddedMandatoryParameter,

    /// A member of a type used by a command was removed
    RemovedTypeMember,

    // Parameter-set breaking changes (3xxx)
    /// A parameter set was removed
    RemovedParameterSet,

    // Help (6xxx)
    /// The help source for a module could not be found
    MissingHelpFile,

    /// A command has no help record
    MissingHelp,

    // Signature conventions (8xxx)
    /// Force option without confirmation support
    ForceWithoutConfirmation,

    /// Non-default confirm impact without confirmation support
    ConfirmImpactWithoutConfirmation,

    /// State-changing verb without confirmation support
    VerbImpliesConfirmation,

    /// Confirm impact differs from the default
    ConfirmImpactChanged,

    /// Verb not on the approved list
    UnapprovedVerb,

    /// Command noun is plural
    PluralCommandNoun,

    /// No declared output type
    NoOutputType,

    /// Parameter name is plural
    PluralParameterName,

    /// Parameter set name contains whitespace
    ParameterSetNameWithWhitespace,

    /// Parameter set uses a position of four or more
    ParameterPositionOutOfRange,

    /// Several parameter sets but no explicit default
    AmbiguousDefaultParameterSet,
}

/// Which report an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    BreakingChange,
    Signature,
    Help,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 3] = [Self::BreakingChange, Self::Signature, Self::Help];

    /// Report destination name for this category
    pub fn report_name(&self) -> &'static str {
        match self {
            Self::BreakingChange => "BreakingChangeIssues",
            Self::Signature => "SignatureIssues",
            Self::Help => "HelpIssues",
        }
    }
}

const CONFIRMATION_REMEDIATION: &str = "Determine if the command should support confirmation and, \
     if so, whether it should also offer a force option.";

impl ProblemId {
    /// Every problem id, in numeric order
    pub const ALL: [ProblemId; 27] = [
        Self::RemovedCommand,
        Self::RemovedConfirmationSupport,
        Self::ChangedDefaultParameterSet,
        Self::RemovedOutputType,
        Self::ChangedOutputType,
        Self::RemovedParameter,
        Self::RemovedParameterAlias,
        Self::ChangedParameterType,
        Self::ParameterBecameMandatory,
        Self::ChangedParameterPosition,
        Self::RemovedPipelineBinding,
        Self::AddedMandatoryParameter,
        Self::RemovedTypeMember,
        Self::RemovedParameterSet,
        Self::MissingHelpFile,
        Self::MissingHelp,
        Self::ForceWithoutConfirmation,
        Self::ConfirmImpactWithoutConfirmation,
        Self::VerbImpliesConfirmation,
        Self::ConfirmImpactChanged,
        Self::UnapprovedVerb,
        Self::PluralCommandNoun,
        Self::NoOutputType,
        Self::PluralParameterName,
        Self::ParameterSetNameWithWhitespace,
        Self::ParameterPositionOutOfRange,
        Self::AmbiguousDefaultParameterSet,
    ];

    /// Stable numeric key
    pub fn code(&self) -> u32 {
        match self {
            Self::RemovedCommand => 1000,
            Self::RemovedConfirmationSupport => 1010,
            Self::ChangedDefaultParameterSet => 1020,
            Self::RemovedOutputType => 1030,
            Self::ChangedOutputType => 1040,
            Self::RemovedParameter => 2000,
            Self::RemovedParameterAlias => 2010,
            Self::ChangedParameterType => 2020,
            Self::ParameterBecameMandatory => 2030,
            Self::ChangedParameterPosition => 2040,
            Self::RemovedPipelineBinding => 2050,
            Self::AddedMandatoryParameter => 2060,
            Self::RemovedTypeMember => 2070,
            Self::RemovedParameterSet => 3000,
            Self::MissingHelpFile => 6000,
            Self::MissingHelp => 6050,
            Self::ForceWithoutConfirmation => 8100,
            Self::ConfirmImpactWithoutConfirmation => 8200,
            Self::VerbImpliesConfirmation => 8210,
            Self::ConfirmImpactChanged => 8300,
            Self::UnapprovedVerb => 8400,
            Self::PluralCommandNoun => 8410,
            Self::NoOutputType => 8420,
            Self::PluralParameterName => 8500,
            Self::ParameterSetNameWithWhitespace => 8510,
            Self::ParameterPositionOutOfRange => 8600,
            Self::AmbiguousDefaultParameterSet => 8700,
        }
    }

    /// Look up a problem id by its numeric key
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.code() == code)
    }

    pub fn category(&self) -> IssueCategory {
        match self.code() {
            6000..=6999 => IssueCategory::Help,
            8000..=8999 => IssueCategory::Signature,
            _ => IssueCategory::BreakingChange,
        }
    }

    /// Severity an issue of this kind is reported with
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::RemovedCommand
            | Self::RemovedConfirmationSupport
            | Self::ChangedDefaultParameterSet
            | Self::RemovedOutputType
            | Self::ChangedOutputType
            | Self::RemovedParameter
            | Self::RemovedParameterAlias
            | Self::ChangedParameterType
            | Self::ParameterBecameMandatory
            | Self::ChangedParameterPosition
            | Self::RemovedPipelineBinding
            | Self::AddedMandatoryParameter
            | Self::RemovedParameterSet
            | Self::ForceWithoutConfirmation => Severity::CRITICAL,
            Self::RemovedTypeMember
            | Self::MissingHelpFile
            | Self::MissingHelp
            | Self::VerbImpliesConfirmation
            | Self::UnapprovedVerb
            | Self::PluralCommandNoun
            | Self::NoOutputType
            | Self::PluralParameterName
            | Self::ParameterSetNameWithWhitespace
            | Self::ParameterPositionOutOfRange
            | Self::AmbiguousDefaultParameterSet => Severity::HIGH,
            Self::ConfirmImpactWithoutConfirmation | Self::ConfirmImpactChanged => Severity::MEDIUM,
        }
    }

    /// Fixed remediation text for this kind of issue
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::RemovedCommand => "Add this command back to the module.",
            Self::RemovedConfirmationSupport => "Add confirmation support back to the command.",
            Self::ChangedDefaultParameterSet => "Change the default parameter set back to its previous value.",
            Self::RemovedOutputType => "Add the output type back to the command.",
            Self::ChangedOutputType => "Change the output type back to its previous shape.",
            Self::RemovedParameter => "Add this parameter back to the parameter set.",
            Self::RemovedParameterAlias => "Add this alias back to the parameter.",
            Self::ChangedParameterType => "Change the parameter type back to its previous type.",
            Self::ParameterBecameMandatory => "Make this parameter optional again.",
            Self::ChangedParameterPosition => "Change the parameter position back to its previous value.",
            Self::RemovedPipelineBinding => "Restore pipeline input for this parameter.",
            Self::AddedMandatoryParameter => "Make the new parameter optional or move it to a new parameter set.",
            Self::RemovedTypeMember => "Add this member back to the type.",
            Self::RemovedParameterSet => "Add this parameter set back to the command.",
            Self::MissingHelpFile => "Add a help file for this module.",
            Self::MissingHelp => "Add a help record for this command to the help file.",
            Self::ForceWithoutConfirmation
            | Self::ConfirmImpactWithoutConfirmation
            | Self::VerbImpliesConfirmation => CONFIRMATION_REMEDIATION,
            Self::ConfirmImpactChanged => {
                "Verify that the confirm impact is changed appropriately by the command. \
                 It is very rare for a command to change the confirm impact."
            }
            Self::UnapprovedVerb => "Consider renaming the command to use an approved verb.",
            Self::PluralCommandNoun => "Consider using a singular noun for the command name.",
            Self::NoOutputType => {
                "Declare the type of the object(s) returned by this command. If the command \
                 returns no output, declare a boolean output and implement a pass-through option."
            }
            Self::PluralParameterName => "Consider using a singular noun for the parameter name.",
            Self::ParameterSetNameWithWhitespace => "Remove the whitespace in the parameter set name.",
            Self::ParameterPositionOutOfRange => {
                "Limit the number of positional parameters in a single parameter set to four or fewer."
            }
            Self::AmbiguousDefaultParameterSet => "Define a default parameter set for the command.",
        }
    }
}

impl From<ProblemId> for u32 {
    fn from(id: ProblemId) -> Self {
        id.code()
    }
}

impl TryFrom<u32> for ProblemId {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown problem id {}", code))
    }
}

impl std::fmt::Display for ProblemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Ordinal issue severity; lower is more severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(pub u8);

impl Severity {
    pub const CRITICAL: Severity = Severity(0);
    pub const HIGH: Severity = Severity(1);
    pub const MEDIUM: Severity = Severity(2);
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A detected problem
///
/// Issues are values: built once and appended to a report, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub implementing_class_name: String,

    /// Command (or module) the issue is about
    pub target: String,

    pub description: String,

    pub remediation: String,

    pub severity: Severity,

    pub problem_id: ProblemId,
}

impl Issue {
    /// Build an issue; remediation and severity come from the problem id
    pub fn new(
        problem_id: ProblemId,
        implementing_class_name: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            implementing_class_name: implementing_class_name.into(),
            target: target.into(),
            description: description.into(),
            remediation: problem_id.remediation().to_string(),
            severity: problem_id.default_severity(),
            problem_id,
        }
    }

    /// Build an issue targeting a command
    pub fn for_command(
        problem_id: ProblemId,
        command: &CommandMetadata,
        description: impl Into<String>,
    ) -> Self {
        Self::new(problem_id, &command.implementing_class_name, &command.name, description)
    }

    pub fn category(&self) -> IssueCategory {
        self.problem_id.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_id_stability() {
        // Published numbers; a failure here means an id was reassigned
        assert_eq!(ProblemId::RemovedCommand.code(), 1000);
        assert_eq!(ProblemId::RemovedParameter.code(), 2000);
        assert_eq!(ProblemId::RemovedParameterSet.code(), 3000);
        assert_eq!(ProblemId::MissingHelp.code(), 6050);
        assert_eq!(ProblemId::ForceWithoutConfirmation.code(), 8100);
        assert_eq!(ProblemId::AmbiguousDefaultParameterSet.code(), 8700);
    }

    #[test]
    fn problem_ids_are_unique_and_ordered() {
        let codes: Vec<u32> = ProblemId::ALL.iter().map(|id| id.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn from_code_roundtrips_every_id() {
        for id in ProblemId::ALL {
            assert_eq!(ProblemId::from_code(id.code()), Some(id));
        }
        assert_eq!(ProblemId::from_code(42), None);
    }

    #[test]
    fn categories_follow_numbering() {
        assert_eq!(ProblemId::RemovedTypeMember.category(), IssueCategory::BreakingChange);
        assert_eq!(ProblemId::MissingHelpFile.category(), IssueCategory::Help);
        assert_eq!(ProblemId::NoOutputType.category(), IssueCategory::Signature);
    }

    #[test]
    fn issue_serializes_problem_id_as_number() {
        let issue = Issue::new(
            ProblemId::RemovedCommand,
            "GetWidgetCommand",
            "Get-Widget",
            "The command 'Get-Widget' has been removed",
        );

        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"problem_id\":1000"));
        assert!(json.contains("\"severity\":0"));

        let parsed: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, issue);
    }

    #[test]
    fn unknown_problem_id_fails_to_deserialize() {
        let json = r#"{"implementing_class_name":"A","target":"B","description":"","remediation":"","severity":0,"problem_id":4242}"#;
        assert!(serde_json::from_str::<Issue>(json).is_err());
    }

    #[test]
    fn lower_severity_is_more_severe() {
        assert!(Severity::CRITICAL < Severity::HIGH);
        assert!(Severity::HIGH < Severity::MEDIUM);
        assert_eq!(ProblemId::RemovedCommand.default_severity(), Severity::CRITICAL);
    }
}
