//! Breaking change detection between two module snapshots
//!
//! Commands are matched by name (case-insensitive). Each matched pair is
//! checked in a fixed order so that the same inputs always produce the same
//! issue sequence:
//!
//! 1. confirmation support
//! 2. output types (old order)
//! 3. default parameter set
//! 4. removed parameter sets (old order)
//! 5. per surviving parameter set (new order): removed parameters (old
//!    order), then each new parameter (new order)

use crate::type_resolver::TypeResolver;
use cmdcompat_core::{
    CommandMetadata, Issue, MetadataSnapshot, ParameterMetadata, ParameterSetMetadata, ProblemId,
    TypeRef,
};
use std::collections::HashSet;

/// Result of comparing an old snapshot against a new one
#[derive(Debug, Clone, Default)]
pub struct CmdletDiff {
    /// Breaking changes, in detection order
    pub issues: Vec<Issue>,

    /// Commands present in both snapshots
    pub commands_compared: usize,

    pub commands_removed: usize,

    pub commands_added: usize,
}

impl CmdletDiff {
    /// Compare two snapshots of the same module
    pub fn compare(old: &MetadataSnapshot, new: &MetadataSnapshot) -> Self {
        let resolver = TypeResolver::new(old, new);
        let mut diff = Self::default();

        for old_command in &old.commands {
            match new.find_command(&old_command.name) {
                Some(new_command) => {
                    tracing::debug!(command = %old_command.name, "Comparing command");
                    diff.commands_compared += 1;
                    CommandComparison {
                        resolver,
                        command: new_command,
                        issues: &mut diff.issues,
                        reported_members: HashSet::new(),
                    }
                    .compare(old_command);
                }
                None => {
                    diff.commands_removed += 1;
                    diff.issues.push(Issue::for_command(
                        ProblemId::RemovedCommand,
                        old_command,
                        format!("The command '{}' has been removed.", old_command.name),
                    ));
                }
            }
        }

        diff.commands_added = new
            .commands
            .iter()
            .filter(|c| old.find_command(&c.name).is_none())
            .count();

        diff
    }

    pub fn has_breaking_changes(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Number of issues with the given problem id
    pub fn count(&self, problem_id: ProblemId) -> usize {
        self.issues.iter().filter(|i| i.problem_id == problem_id).count()
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

/// Checks for one matched command pair
struct CommandComparison<'a, 'o> {
    resolver: TypeResolver<'a>,

    /// The new command; issues are attributed to it
    command: &'a CommandMetadata,

    issues: &'o mut Vec<Issue>,

    /// (type, member) pairs already reported for this command
    reported_members: HashSet<(String, String)>,
}

impl CommandComparison<'_, '_> {
    fn report(&mut self, problem_id: ProblemId, description: String) {
        self.issues.push(Issue::for_command(problem_id, self.command, description));
    }

    fn compare(&mut self, old: &CommandMetadata) {
        let new = self.command;

        if old.supports_confirmation && !new.supports_confirmation {
            self.report(
                ProblemId::RemovedConfirmationSupport,
                format!("The command '{}' no longer supports confirmation.", new.name),
            );
        }

        self.compare_output_types(old);

        if !old.default_parameter_set_name.eq_ignore_ascii_case(&new.default_parameter_set_name)
            && new.find_parameter_set(&old.default_parameter_set_name).is_some()
        {
            self.report(
                ProblemId::ChangedDefaultParameterSet,
                format!(
                    "The default parameter set of command '{}' changed from '{}' to '{}'.",
                    new.name, old.default_parameter_set_name, new.default_parameter_set_name
                ),
            );
        }

        for old_set in &old.parameter_sets {
            if new.find_parameter_set(&old_set.name).is_none() {
                self.report(
                    ProblemId::RemovedParameterSet,
                    format!(
                        "The parameter set '{}' has been removed from command '{}'.",
                        old_set.name, new.name
                    ),
                );
            }
        }

        for new_set in &new.parameter_sets {
            if let Some(old_set) = old.find_parameter_set(&new_set.name) {
                self.compare_parameter_set(old_set, new_set);
            }
        }
    }

    fn compare_output_types(&mut self, old: &CommandMetadata) {
        let new = self.command;

        for old_type in &old.output_types {
            match new.output_types.get(old_type) {
                None => self.report(
                    ProblemId::RemovedOutputType,
                    format!(
                        "The command '{}' no longer has output type '{}'.",
                        new.name, old_type
                    ),
                ),
                Some(new_type) if !self.resolver.equivalent(old_type, new_type) => self.report(
                    ProblemId::ChangedOutputType,
                    format!(
                        "The output type '{}' of command '{}' has changed incompatibly.",
                        old_type, new.name
                    ),
                ),
                Some(new_type) => self.report_removed_members(old_type, new_type),
            }
        }
    }

    fn compare_parameter_set(&mut self, old_set: &ParameterSetMetadata, new_set: &ParameterSetMetadata) {
        for old_param in &old_set.parameters {
            if find_new_parameter(new_set, &old_param.name).is_none() {
                self.report(
                    ProblemId::RemovedParameter,
                    format!(
                        "The parameter '{}' has been removed from parameter set '{}' of command '{}'.",
                        old_param.name, new_set.name, self.command.name
                    ),
                );
            }
        }

        for new_param in &new_set.parameters {
            match find_old_parameter(old_set, new_set, new_param) {
                Some(old_param) => self.compare_parameter(&new_set.name, old_param, new_param),
                None if new_param.mandatory => self.report(
                    ProblemId::AddedMandatoryParameter,
                    format!(
                        "The mandatory parameter '{}' has been added to parameter set '{}' of command '{}'.",
                        new_param.name, new_set.name, self.command.name
                    ),
                ),
                None => {}
            }
        }
    }

    fn compare_parameter(&mut self, set_name: &str, old: &ParameterMetadata, new: &ParameterMetadata) {
        let owner = self.command;
        let command = &owner.name;

        if !old.mandatory && new.mandatory {
            self.report(
                ProblemId::ParameterBecameMandatory,
                format!(
                    "The parameter '{}' in parameter set '{}' of command '{}' became mandatory.",
                    new.name, set_name, command
                ),
            );
        }

        if old.position != new.position {
            self.report(
                ProblemId::ChangedParameterPosition,
                format!(
                    "The position of parameter '{}' in parameter set '{}' of command '{}' changed from {} to {}.",
                    new.name, set_name, command, old.position, new.position
                ),
            );
        }

        if old.pipeline_bindable && !new.pipeline_bindable {
            self.report(
                ProblemId::RemovedPipelineBinding,
                format!(
                    "The parameter '{}' in parameter set '{}' of command '{}' no longer accepts pipeline input.",
                    new.name, set_name, command
                ),
            );
        }

        if self.resolver.equivalent(&old.type_ref, &new.type_ref) {
            self.report_removed_members(&old.type_ref, &new.type_ref);
        } else {
            self.report(
                ProblemId::ChangedParameterType,
                format!(
                    "The type of parameter '{}' of command '{}' changed from '{}' to '{}'.",
                    new.name, command, old.type_ref, new.type_ref
                ),
            );
        }

        for alias in &old.aliases {
            if !new.has_alias(alias) && !new.name.eq_ignore_ascii_case(alias) {
                self.report(
                    ProblemId::RemovedParameterAlias,
                    format!(
                        "The alias '{}' of parameter '{}' of command '{}' has been removed.",
                        alias, new.name, command
                    ),
                );
            }
        }
    }

    /// Report members lost by a type the command still uses, once per command
    fn report_removed_members(&mut self, old: &TypeRef, new: &TypeRef) {
        for removal in self.resolver.removed_members(old, new) {
            let key = (removal.type_name.clone(), removal.member.clone());
            if self.reported_members.insert(key) {
                self.report(
                    ProblemId::RemovedTypeMember,
                    format!(
                        "The member '{}' of type '{}' used by command '{}' has been removed.",
                        removal.member, removal.type_name, self.command.name
                    ),
                );
            }
        }
    }
}

/// The new parameter that stands for old parameter `old_name`: same name, or
/// a parameter that kept `old_name` as an alias
fn find_new_parameter<'s>(new_set: &'s ParameterSetMetadata, old_name: &str) -> Option<&'s ParameterMetadata> {
    new_set
        .find_parameter(old_name)
        .or_else(|| new_set.parameters.iter().find(|p| p.has_alias(old_name)))
}

/// Inverse of [`find_new_parameter`]
fn find_old_parameter<'s>(
    old_set: &'s ParameterSetMetadata,
    new_set: &ParameterSetMetadata,
    new_param: &ParameterMetadata,
) -> Option<&'s ParameterMetadata> {
    old_set.find_parameter(&new_param.name).or_else(|| {
        old_set.parameters.iter().find(|old| {
            new_param.has_alias(&old.name) && new_set.find_parameter(&old.name).is_none()
        })
    })
}
