//! cmdcompat core
//!
//! Core domain model with stable, versioned types.
//! Never reassign problem ids - they are part of the public API.

pub mod diagnostic;
pub mod metadata;
pub mod report;
pub mod config;

pub use diagnostic::{Issue, IssueCategory, ProblemId, Severity};
pub use metadata::{
    CommandMetadata, ConfirmImpact, MetadataSnapshot, ParameterMetadata, ParameterSetMetadata,
    SnapshotError, TypeKind, TypeMetadata, TypeRef, ALL_PARAMETER_SETS,
};
pub use report::{AnalysisFault, BaselineStatus, ModuleReport, Report, ReportSummary, ReportVersion};
pub use config::{CommandFilter, Config, ConfigError, ConventionsConfig};
