//! Configuration schema (cmdcompat.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Commands excluded from analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFilter {
    /// Command name patterns to skip (`*` wildcard, case-insensitive)
    #[serde(default)]
    pub skip_commands: Vec<String>,
}

impl CommandFilter {
    /// Check if a command should be skipped
    pub fn is_skipped(&self, command: &str) -> bool {
        self.skip_commands.iter().any(|pattern| glob_match(pattern, command))
    }
}

/// Additions to the built-in naming convention tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionsConfig {
    /// Extra verbs that imply a state change and so require confirmation
    #[serde(default)]
    pub confirmation_verbs: Vec<String>,

    /// Extra words ending in `s` that are nevertheless singular
    #[serde(default)]
    pub singular_nouns: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the new module snapshots (`<module>.json`)
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,

    /// Directory holding the prior module snapshots (`<module>.json`)
    #[serde(default)]
    pub baseline_dir: Option<PathBuf>,

    /// Directory holding documented command lists (`<module>.txt`)
    #[serde(default)]
    pub help_dir: Option<PathBuf>,

    /// Where reports are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub filter: CommandFilter,

    #[serde(default)]
    pub conventions: ConventionsConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            baseline_dir: None,
            help_dir: None,
            output_dir: default_output_dir(),
            filter: CommandFilter::default(),
            conventions: ConventionsConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Resolve a configured path against the project root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Simple glob matching (supports `*` anywhere, ASCII case-insensitive)
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let text = text.to_ascii_lowercase();

    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };

    if !pattern.contains('*') {
        return pattern == text;
    }

    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = parts.collect();
    let Some((last, middle)) = middle.split_last() else {
        return true;
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
