//! Naming convention tables
//!
//! Pure lookups over names; nothing here inspects a live module.

use cmdcompat_core::ConventionsConfig;
use std::collections::BTreeSet;

/// Verbs whose commands change state and should support confirmation
pub const CONFIRMATION_VERBS: &[&str] = &[
    "Add", "Clear", "Close", "Copy", "Disable", "Enable", "Install", "Move", "New", "Register",
    "Remove", "Rename", "Reset", "Restart", "Restore", "Resume", "Set", "Start", "Stop", "Suspend",
    "Uninstall", "Unregister", "Update",
];

/// Words that end in `s` but are singular
pub const SINGULAR_NOUNS: &[&str] = &[
    "Status", "Alias", "Address", "Access", "Process", "Progress", "Class", "Series", "Analysis",
    "Basis", "Axis", "Canvas", "Bus", "Dns", "Os", "News", "Https", "Tls", "Ssl",
];

/// Convention tables used by the signature rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    confirmation_verbs: BTreeSet<String>,
    singular_nouns: BTreeSet<String>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            confirmation_verbs: lowercase_set(CONFIRMATION_VERBS.iter().copied()),
            singular_nouns: lowercase_set(SINGULAR_NOUNS.iter().copied()),
        }
    }
}

impl Conventions {
    /// Built-in tables extended with configured entries
    pub fn from_config(config: &ConventionsConfig) -> Self {
        let mut conventions = Self::default();
        conventions
            .confirmation_verbs
            .extend(lowercase_set(config.confirmation_verbs.iter().map(String::as_str)));
        conventions
            .singular_nouns
            .extend(lowercase_set(config.singular_nouns.iter().map(String::as_str)));
        conventions
    }

    /// Whether a verb implies the command changes state
    pub fn implies_confirmation(&self, verb: &str) -> bool {
        self.confirmation_verbs.contains(&verb.to_ascii_lowercase())
    }

    /// Whether a PascalCase name ends in a plural noun
    ///
    /// `ResourceGroupNames` and `VMs` are plural; `IPAddress`, `Status` and
    /// `Force` are not.
    pub fn is_plural_noun(&self, name: &str) -> bool {
        let word = last_word(name).to_ascii_lowercase();

        if self.singular_nouns.contains(&name.to_ascii_lowercase()) || self.singular_nouns.contains(&word) {
            return false;
        }

        word.len() >= 3
            && word.ends_with('s')
            && !word.ends_with("ss")
            && !word.ends_with("us")
            && !word.ends_with("is")
    }
}

fn lowercase_set<'a>(words: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    words.map(str::to_ascii_lowercase).collect()
}

/// Last PascalCase word of a name; runs of capitals stay together (`VMs`)
fn last_word(name: &str) -> &str {
    let name = name.trim_end_matches(|c: char| !c.is_ascii_alphabetic());
    let mut start = 0;
    let mut prev_upper = false;

    for (idx, c) in name.char_indices() {
        if !c.is_ascii_alphabetic() {
            start = idx + c.len_utf8();
            prev_upper = false;
            continue;
        }
        if c.is_ascii_uppercase() && !prev_upper {
            start = idx;
        }
        prev_upper = c.is_ascii_uppercase();
    }

    &name[start..]
}
