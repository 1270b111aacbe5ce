//! Cross-snapshot type equivalence
//!
//! Type references from two snapshots are never compared by identity. Each
//! side is resolved through its own snapshot's catalog and the results are
//! compared structurally; when a side has no catalog entry the comparison
//! falls back to the type name alone.

use cmdcompat_core::{MetadataSnapshot, TypeMetadata, TypeRef};
use std::collections::HashSet;

/// A member present on an old type but missing from its new counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRemoval {
    /// Type that lost the member
    pub type_name: String,

    pub member: String,
}

/// Decides whether old and new type references are interchangeable
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    old: &'a MetadataSnapshot,
    new: &'a MetadataSnapshot,
}

impl<'a> TypeResolver<'a> {
    pub fn new(old: &'a MetadataSnapshot, new: &'a MetadataSnapshot) -> Self {
        Self { old, new }
    }

    /// Look up a type name in one snapshot's catalog
    pub fn resolve<'s>(snapshot: &'s MetadataSnapshot, name: &str) -> Option<&'s TypeMetadata> {
        snapshot.resolve_type(name)
    }

    /// Whether `old` (from the old snapshot) and `new` (from the new snapshot)
    /// can be used interchangeably in a command signature
    ///
    /// - Names must match at every level.
    /// - If either side is missing from its catalog, matching names suffice.
    /// - Otherwise kinds must match, base types must be equivalent (or both
    ///   absent) and generic arguments must be pairwise equivalent.
    pub fn equivalent(&self, old: &TypeRef, new: &TypeRef) -> bool {
        let mut visited = HashSet::new();
        self.equivalent_in(old, new, &mut visited)
    }

    fn equivalent_in(&self, old: &TypeRef, new: &TypeRef, visited: &mut HashSet<String>) -> bool {
        if old.full_name() != new.full_name() {
            return false;
        }

        // Already being compared further up: assume equivalent so cycles terminate.
        // Every step is a conjunction, so a false anywhere still fails the root.
        if !visited.insert(old.full_name().to_string()) {
            return true;
        }

        let (Some(old_type), Some(new_type)) = (
            Self::resolve(self.old, old.full_name()),
            Self::resolve(self.new, new.full_name()),
        ) else {
            return true;
        };

        if old_type.kind != new_type.kind {
            return false;
        }

        let bases_match = match (&old_type.base_type, &new_type.base_type) {
            (None, None) => true,
            (Some(old_base), Some(new_base)) => self.equivalent_in(old_base, new_base, visited),
            _ => false,
        };

        bases_match
            && old_type.generic_arguments.len() == new_type.generic_arguments.len()
            && old_type
                .generic_arguments
                .iter()
                .zip(&new_type.generic_arguments)
                .all(|(o, n)| self.equivalent_in(o, n, visited))
    }

    /// Members of the old type (and of its base and generic arguments) that
    /// the new type no longer has
    ///
    /// Only types resolvable on both sides contribute; member types are not
    /// descended into.
    pub fn removed_members(&self, old: &TypeRef, new: &TypeRef) -> Vec<MemberRemoval> {
        let mut removals = Vec::new();
        let mut visited = HashSet::new();
        self.collect_removed_members(old, new, &mut visited, &mut removals);
        removals
    }

    fn collect_removed_members(
        &self,
        old: &TypeRef,
        new: &TypeRef,
        visited: &mut HashSet<(String, String)>,
        removals: &mut Vec<MemberRemoval>,
    ) {
        if !visited.insert((old.full_name().to_string(), new.full_name().to_string())) {
            return;
        }

        let (Some(old_type), Some(new_type)) = (
            Self::resolve(self.old, old.full_name()),
            Self::resolve(self.new, new.full_name()),
        ) else {
            return;
        };

        removals.extend(
            old_type
                .members
                .keys()
                .filter(|member| !new_type.members.contains_key(*member))
                .map(|member| MemberRemoval {
                    type_name: old_type.full_name.clone(),
                    member: member.clone(),
                }),
        );

        // Inherited members are reachable through the derived type
        if let (Some(old_base), Some(new_base)) = (&old_type.base_type, &new_type.base_type) {
            self.collect_removed_members(old_base, new_base, visited, removals);
        }

        for (old_arg, new_arg) in old_type.generic_arguments.iter().zip(&new_type.generic_arguments) {
            self.collect_removed_members(old_arg, new_arg, visited, removals);
        }
    }
}
