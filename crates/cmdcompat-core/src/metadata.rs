//! Module metadata snapshot types
//!
//! A snapshot is an immutable description of a module's command surface and
//! the catalog of types its commands reference. Snapshots are produced by an
//! external loader; this crate only models, parses and queries them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// Default parameter set name meaning "no explicit default"
pub const ALL_PARAMETER_SETS: &str = "__AllParameterSets";

/// Name-based reference into a snapshot's type catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self(full_name.into())
    }

    /// Full type name this reference points at
    pub fn full_name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Declared risk level of a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmImpact {
    None,
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for ConfirmImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Kind of a catalog type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
    Interface,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Struct => write!(f, "struct"),
            Self::Enum => write!(f, "enum"),
            Self::Interface => write!(f, "interface"),
        }
    }
}

/// A type in a snapshot's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    /// Full type name (catalog key)
    pub full_name: String,

    pub kind: TypeKind,

    /// Member name -> member type
    #[serde(default)]
    pub members: BTreeMap<String, TypeRef>,

    #[serde(default)]
    pub base_type: Option<TypeRef>,

    #[serde(default)]
    pub generic_arguments: Vec<TypeRef>,
}

impl TypeMetadata {
    pub fn new(full_name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
            members: BTreeMap::new(),
            base_type: None,
            generic_arguments: Vec::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, type_ref: impl Into<TypeRef>) -> Self {
        self.members.insert(name.into(), type_ref.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<TypeRef>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    pub fn with_generic_arguments(mut self, args: Vec<TypeRef>) -> Self {
        self.generic_arguments = args;
        self
    }
}

/// A single parameter of a parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    pub name: String,

    /// Positional index, -1 when the parameter is named-only
    #[serde(default = "not_positional")]
    pub position: i32,

    #[serde(default)]
    pub mandatory: bool,

    /// Whether the parameter accepts pipeline input
    #[serde(default)]
    pub pipeline_bindable: bool,

    #[serde(rename = "type")]
    pub type_ref: TypeRef,

    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

fn not_positional() -> i32 {
    -1
}

impl ParameterMetadata {
    /// Create an optional, named-only parameter
    pub fn new(name: impl Into<String>, type_ref: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            position: -1,
            mandatory: false,
            pipeline_bindable: false,
            type_ref: type_ref.into(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_pipeline(mut self, pipeline_bindable: bool) -> Self {
        self.pipeline_bindable = pipeline_bindable;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Whether `name` is one of this parameter's aliases (case-insensitive)
    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// A named group of parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSetMetadata {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
}

impl ParameterSetMetadata {
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterMetadata>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Find a parameter by exact name (case-insensitive)
    pub fn find_parameter(&self, name: &str) -> Option<&ParameterMetadata> {
        self.parameters.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A single invocable command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub name: String,

    pub implementing_class_name: String,

    pub verb: String,

    pub noun: String,

    #[serde(default)]
    pub supports_confirmation: bool,

    #[serde(default)]
    pub has_force_option: bool,

    #[serde(default)]
    pub confirm_impact: ConfirmImpact,

    /// Defaults to true when absent, as does `has_singular_noun`
    #[serde(default = "default_true")]
    pub is_approved_verb: bool,

    #[serde(default = "default_true")]
    pub has_singular_noun: bool,

    #[serde(default)]
    pub output_types: BTreeSet<TypeRef>,

    #[serde(default)]
    pub parameter_sets: Vec<ParameterSetMetadata>,

    #[serde(default = "all_parameter_sets")]
    pub default_parameter_set_name: String,
}

fn all_parameter_sets() -> String {
    ALL_PARAMETER_SETS.to_string()
}

fn default_true() -> bool {
    true
}

impl CommandMetadata {
    /// Create a command from a `Verb-Noun` name
    ///
    /// The verb is treated as approved and the noun as singular; use the
    /// struct fields to override.
    pub fn new(name: impl Into<String>, implementing_class_name: impl Into<String>) -> Self {
        let name = name.into();
        let (verb, noun) = match name.split_once('-') {
            Some((verb, noun)) => (verb.to_string(), noun.to_string()),
            None => (name.clone(), String::new()),
        };

        Self {
            name,
            implementing_class_name: implementing_class_name.into(),
            verb,
            noun,
            supports_confirmation: false,
            has_force_option: false,
            confirm_impact: ConfirmImpact::Medium,
            is_approved_verb: true,
            has_singular_noun: true,
            output_types: BTreeSet::new(),
            parameter_sets: Vec::new(),
            default_parameter_set_name: all_parameter_sets(),
        }
    }

    pub fn with_parameter_set(mut self, set: ParameterSetMetadata) -> Self {
        self.parameter_sets.push(set);
        self
    }

    pub fn with_output_type(mut self, type_ref: impl Into<TypeRef>) -> Self {
        self.output_types.insert(type_ref.into());
        self
    }

    pub fn with_default_parameter_set(mut self, name: impl Into<String>) -> Self {
        self.default_parameter_set_name = name.into();
        self
    }

    /// Find a parameter set by name (case-insensitive)
    pub fn find_parameter_set(&self, name: &str) -> Option<&ParameterSetMetadata> {
        self.parameter_sets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// All parameters across sets, de-duplicated by name in first-appearance order
    pub fn unique_parameters(&self) -> Vec<&ParameterMetadata> {
        let mut seen = HashSet::new();
        self.parameter_sets
            .iter()
            .flat_map(|s| s.parameters.iter())
            .filter(|p| seen.insert(p.name.to_ascii_lowercase()))
            .collect()
    }
}

/// Immutable description of a module's command surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    #[serde(default)]
    pub commands: Vec<CommandMetadata>,

    /// Full type name -> type metadata
    #[serde(default)]
    pub types: BTreeMap<String, TypeMetadata>,
}

impl MetadataSnapshot {
    pub fn new(commands: Vec<CommandMetadata>) -> Self {
        Self {
            commands,
            types: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, type_metadata: TypeMetadata) -> Self {
        self.types.insert(type_metadata.full_name.clone(), type_metadata);
        self
    }

    /// Load and validate a snapshot from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&contents)
    }

    /// Parse and validate a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| SnapshotError::Parse(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the uniqueness invariants that serde alone cannot enforce
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut command_names = HashSet::new();
        for command in &self.commands {
            if !command_names.insert(command.name.to_ascii_lowercase()) {
                return Err(SnapshotError::DuplicateCommand(command.name.clone()));
            }

            let mut set_names = HashSet::new();
            for set in &command.parameter_sets {
                if !set_names.insert(set.name.to_ascii_lowercase()) {
                    return Err(SnapshotError::DuplicateParameterSet {
                        command: command.name.clone(),
                        parameter_set: set.name.clone(),
                    });
                }
            }
        }

        for (key, type_metadata) in &self.types {
            if key != &type_metadata.full_name {
                return Err(SnapshotError::CatalogKeyMismatch {
                    key: key.clone(),
                    full_name: type_metadata.full_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Find a command by name (case-insensitive)
    pub fn find_command(&self, name: &str) -> Option<&CommandMetadata> {
        self.commands.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Look up a type in this snapshot's catalog
    pub fn resolve_type(&self, name: &str) -> Option<&TypeMetadata> {
        self.types.get(name)
    }

    /// Copy of this snapshot holding only the commands accepted by `keep`
    pub fn filtered(&self, mut keep: impl FnMut(&CommandMetadata) -> bool) -> Self {
        Self {
            commands: self.commands.iter().filter(|c| keep(c)).cloned().collect(),
            types: self.types.clone(),
        }
    }
}

/// Snapshot loading errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    #[error("Duplicate command name '{0}'")]
    DuplicateCommand(String),

    #[error("Duplicate parameter set '{parameter_set}' in command '{command}'")]
    DuplicateParameterSet {
        command: String,
        parameter_set: String,
    },

    #[error("Type catalog key '{key}' does not match full name '{full_name}'")]
    CatalogKeyMismatch { key: String, full_name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_snapshot_applies_defaults() {
        let json = r#"{
            "commands": [{
                "name": "Get-Widget",
                "implementing_class_name": "GetWidgetCommand",
                "verb": "Get",
                "noun": "Widget",
                "parameter_sets": [{
                    "name": "__AllParameterSets",
                    "parameters": [{ "name": "Name", "type": "System.String" }]
                }]
            }]
        }"#;

        let snapshot = MetadataSnapshot::from_json(json).unwrap();
        let command = &snapshot.commands[0];
        assert_eq!(command.confirm_impact, ConfirmImpact::Medium);
        assert_eq!(command.default_parameter_set_name, ALL_PARAMETER_SETS);
        assert!(command.is_approved_verb);
        assert!(command.has_singular_noun);
        assert!(!command.supports_confirmation);

        let param = &command.parameter_sets[0].parameters[0];
        assert_eq!(param.position, -1);
        assert!(!param.mandatory);
        assert_eq!(param.type_ref.full_name(), "System.String");
    }

    #[test]
    fn duplicate_command_names_are_rejected() {
        let snapshot = MetadataSnapshot::new(vec![
            CommandMetadata::new("Get-Widget", "A"),
            CommandMetadata::new("get-widget", "B"),
        ]);

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateCommand(name)) if name == "get-widget"
        ));
    }

    #[test]
    fn duplicate_parameter_sets_are_rejected() {
        let command = CommandMetadata::new("Get-Widget", "A")
            .with_parameter_set(ParameterSetMetadata::new("ByName", vec![]))
            .with_parameter_set(ParameterSetMetadata::new("BYNAME", vec![]));

        let result = MetadataSnapshot::new(vec![command]).validate();
        assert!(matches!(result, Err(SnapshotError::DuplicateParameterSet { .. })));
    }

    #[test]
    fn catalog_key_must_match_full_name() {
        let json = r#"{
            "commands": [],
            "types": { "A.Widget": { "full_name": "B.Widget", "kind": "class" } }
        }"#;

        assert!(matches!(
            MetadataSnapshot::from_json(json),
            Err(SnapshotError::CatalogKeyMismatch { .. })
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            MetadataSnapshot::from_json("{ not json"),
            Err(SnapshotError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MetadataSnapshot::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn find_command_ignores_case() {
        let snapshot = MetadataSnapshot::new(vec![CommandMetadata::new("Get-Widget", "A")]);
        assert!(snapshot.find_command("GET-WIDGET").is_some());
        assert!(snapshot.find_command("Set-Widget").is_none());
    }

    #[test]
    fn unique_parameters_dedups_across_sets() {
        let command = CommandMetadata::new("Get-Widget", "A")
            .with_parameter_set(ParameterSetMetadata::new(
                "ByName",
                vec![
                    ParameterMetadata::new("Name", "System.String"),
                    ParameterMetadata::new("Force", "System.Boolean"),
                ],
            ))
            .with_parameter_set(ParameterSetMetadata::new(
                "ById",
                vec![
                    ParameterMetadata::new("Id", "System.Int32"),
                    ParameterMetadata::new("force", "System.Boolean"),
                ],
            ));

        let names: Vec<_> = command.unique_parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Force", "Id"]);
    }

    #[test]
    fn filtered_leaves_original_untouched() {
        let snapshot = MetadataSnapshot::new(vec![
            CommandMetadata::new("Get-Widget", "A"),
            CommandMetadata::new("Get-InternalWidget", "B"),
        ]);

        let filtered = snapshot.filtered(|c| !c.name.contains("Internal"));
        assert_eq!(filtered.commands.len(), 1);
        assert_eq!(snapshot.commands.len(), 2);
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let snapshot = MetadataSnapshot::new(vec![CommandMetadata::new("Get-Widget", "A")
            .with_output_type("Contoso.Widget")
            .with_parameter_set(ParameterSetMetadata::new(
                "ByName",
                vec![ParameterMetadata::new("Name", "System.String")
                    .with_position(0)
                    .with_alias("N")],
            ))])
        .with_type(
            TypeMetadata::new("Contoso.Widget", TypeKind::Class).with_member("Name", "System.String"),
        );

        let json = snapshot.to_json().unwrap();
        assert_eq!(MetadataSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
