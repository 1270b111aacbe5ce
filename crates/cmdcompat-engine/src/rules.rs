//! Convention rule registry
//!
//! A rule pairs a stable problem id with a pure check over one command. The
//! engine walks commands in snapshot order and, for each command, every rule
//! in registration order. Rules never see each other's results, so adding a
//! rule at the end of a registry leaves earlier output untouched.

use crate::conventions::Conventions;
use cmdcompat_core::{
    AnalysisFault, CommandMetadata, ConfirmImpact, Issue, MetadataSnapshot, ProblemId,
    ALL_PARAMETER_SETS,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Highest position a parameter may take before it is flagged
pub const MAX_POSITION: i32 = 3;

/// Check over one command; returns one description per finding
pub type RuleCheck<I> = fn(&CommandMetadata, &I) -> Vec<String>;

/// A registered rule
pub struct Rule<I> {
    /// Short stable name, used in fault records
    pub name: &'static str,

    pub problem_id: ProblemId,

    pub check: RuleCheck<I>,
}

impl<I> Clone for Rule<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Rule<I> {}

impl<I> std::fmt::Debug for Rule<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("problem_id", &self.problem_id)
            .finish()
    }
}

/// Signature rules, in registration order
pub static SIGNATURE_RULES: &[Rule<Conventions>] = &[
    Rule {
        name: "force-without-confirmation",
        problem_id: ProblemId::ForceWithoutConfirmation,
        check: force_without_confirmation,
    },
    Rule {
        name: "confirm-impact-without-confirmation",
        problem_id: ProblemId::ConfirmImpactWithoutConfirmation,
        check: confirm_impact_without_confirmation,
    },
    Rule {
        name: "verb-implies-confirmation",
        problem_id: ProblemId::VerbImpliesConfirmation,
        check: verb_implies_confirmation,
    },
    Rule {
        name: "confirm-impact-changed",
        problem_id: ProblemId::ConfirmImpactChanged,
        check: confirm_impact_changed,
    },
    Rule {
        name: "unapproved-verb",
        problem_id: ProblemId::UnapprovedVerb,
        check: unapproved_verb,
    },
    Rule {
        name: "plural-command-noun",
        problem_id: ProblemId::PluralCommandNoun,
        check: plural_command_noun,
    },
    Rule {
        name: "no-output-type",
        problem_id: ProblemId::NoOutputType,
        check: no_output_type,
    },
    Rule {
        name: "plural-parameter-name",
        problem_id: ProblemId::PluralParameterName,
        check: plural_parameter_name,
    },
    Rule {
        name: "parameter-set-name-whitespace",
        problem_id: ProblemId::ParameterSetNameWithWhitespace,
        check: parameter_set_name_whitespace,
    },
    Rule {
        name: "parameter-position-out-of-range",
        problem_id: ProblemId::ParameterPositionOutOfRange,
        check: parameter_position_out_of_range,
    },
    Rule {
        name: "ambiguous-default-parameter-set",
        problem_id: ProblemId::AmbiguousDefaultParameterSet,
        check: ambiguous_default_parameter_set,
    },
];

/// Issues and faults from one pass over a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEvaluation {
    pub issues: Vec<Issue>,
    pub faults: Vec<AnalysisFault>,
}

/// Evaluates a rule registry against a snapshot
#[derive(Debug)]
pub struct RuleEngine<'r, I> {
    rules: &'r [Rule<I>],
}

impl RuleEngine<'static, Conventions> {
    /// Engine over the built-in signature rules
    pub fn signature() -> Self {
        Self::new(SIGNATURE_RULES)
    }
}

impl<'r, I> RuleEngine<'r, I> {
    pub fn new(rules: &'r [Rule<I>]) -> Self {
        Self { rules }
    }

    /// Run every rule over every command
    ///
    /// A rule that panics for a command is recorded as a fault for that
    /// rule/command pair; evaluation carries on with the next rule.
    pub fn evaluate(&self, snapshot: &MetadataSnapshot, input: &I) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::default();

        for command in &snapshot.commands {
            tracing::debug!(command = %command.name, "Evaluating rules");

            for rule in self.rules {
                match catch_unwind(AssertUnwindSafe(|| (rule.check)(command, input))) {
                    Ok(findings) => evaluation.issues.extend(
                        findings
                            .into_iter()
                            .map(|description| Issue::for_command(rule.problem_id, command, description)),
                    ),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(
                            rule = rule.name,
                            command = %command.name,
                            %message,
                            "Rule evaluation failed"
                        );
                        evaluation.faults.push(AnalysisFault::RuleEvaluation {
                            rule: rule.name.to_string(),
                            problem_id: rule.problem_id.code(),
                            target: command.name.clone(),
                            message,
                        });
                    }
                }
            }
        }

        evaluation
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

fn force_without_confirmation(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if command.has_force_option && !command.supports_confirmation {
        vec![format!(
            "{} has a force option but does not support confirmation.",
            command.name
        )]
    } else {
        Vec::new()
    }
}

fn confirm_impact_without_confirmation(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if command.confirm_impact != ConfirmImpact::Medium && !command.supports_confirmation {
        vec![format!(
            "{} changes the confirm impact to {} but does not support confirmation.",
            command.name, command.confirm_impact
        )]
    } else {
        Vec::new()
    }
}

fn verb_implies_confirmation(command: &CommandMetadata, conventions: &Conventions) -> Vec<String> {
    if !command.supports_confirmation && conventions.implies_confirmation(&command.verb) {
        vec![format!(
            "{} does not support confirmation but the verb '{}' indicates that it should.",
            command.name, command.verb
        )]
    } else {
        Vec::new()
    }
}

fn confirm_impact_changed(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if command.confirm_impact != ConfirmImpact::Medium {
        vec![format!(
            "{} changes the confirm impact to {}. Please ensure that the change is justified.",
            command.name, command.confirm_impact
        )]
    } else {
        Vec::new()
    }
}

fn unapproved_verb(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if !command.is_approved_verb {
        vec![format!(
            "{} uses the verb '{}', which is not on the list of approved verbs.",
            command.name, command.verb
        )]
    } else {
        Vec::new()
    }
}

fn plural_command_noun(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if !command.has_singular_noun {
        vec![format!(
            "{} uses the noun '{}', which does not follow the convention of using a singular noun.",
            command.name, command.noun
        )]
    } else {
        Vec::new()
    }
}

fn no_output_type(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if command.output_types.is_empty() {
        vec![format!("Command '{}' has no declared output type.", command.name)]
    } else {
        Vec::new()
    }
}

fn plural_parameter_name(command: &CommandMetadata, conventions: &Conventions) -> Vec<String> {
    command
        .unique_parameters()
        .into_iter()
        .filter(|p| conventions.is_plural_noun(&p.name))
        .map(|p| {
            format!(
                "Parameter {} of command {} does not follow the convention of using a singular noun.",
                p.name, command.name
            )
        })
        .collect()
}

fn parameter_set_name_whitespace(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    command
        .parameter_sets
        .iter()
        .filter(|set| set.name.chars().any(char::is_whitespace))
        .map(|set| {
            format!(
                "Parameter set '{}' of command '{}' contains whitespace.",
                set.name, command.name
            )
        })
        .collect()
}

fn parameter_position_out_of_range(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    command
        .parameter_sets
        .iter()
        .filter(|set| set.parameters.iter().any(|p| p.position > MAX_POSITION))
        .map(|set| {
            format!(
                "Parameter set '{}' of command '{}' has a parameter at position {} or higher.",
                set.name,
                command.name,
                MAX_POSITION + 1
            )
        })
        .collect()
}

fn ambiguous_default_parameter_set(command: &CommandMetadata, _: &Conventions) -> Vec<String> {
    if command.parameter_sets.len() > 2 && command.default_parameter_set_name == ALL_PARAMETER_SETS {
        vec![format!(
            "Command '{}' has multiple parameter sets but no default parameter set.",
            command.name
        )]
    } else {
        Vec::new()
    }
}
