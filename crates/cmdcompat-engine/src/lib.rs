//! cmdcompat engine - analysis logic
//!
//! This crate implements the checks run over command metadata snapshots:
//! - Breaking change diff against a prior snapshot
//! - Structural type equivalence
//! - Signature convention rules
//! - Help coverage
//! - Per-module orchestration

pub mod analysis;
pub mod cmdlet_diff;
pub mod conventions;
pub mod help;
pub mod rules;
pub mod type_resolver;

pub use analysis::{compare_with_baseline, load_baseline, Baseline, ModuleAnalyzer, ModuleInput};
pub use cmdlet_diff::CmdletDiff;
pub use conventions::Conventions;
pub use help::{HelpAnalyzer, HelpRecords, HelpSource, HELP_RULES};
pub use rules::{Rule, RuleEngine, RuleEvaluation, SIGNATURE_RULES};
pub use type_resolver::{MemberRemoval, TypeResolver};
