//! Language-neutral entity model shared by every source and target
//! provider: `User`, `Group`, `Project`, `GroupMember`, `ProjectMember`,
//! and the `TargetKnri` namespacing scheme.

pub mod knri;

pub use knri::{owned_knri, RoleKind, TargetKnri};

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque entity identity. Newtype over `String` so identities sort and
/// hash deterministically without accidentally comparing equal to an
/// unrelated `String` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Identity(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity(s)
    }
}

/// `Group.Kind`: source groups are hierarchical (`Group`); target role
/// stores are flat and use this to distinguish a group role, a per-user
/// namespace role, and a project-binding role, all stored the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Group,
    User,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub identity: Identity,
    pub name: String,
    pub description: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub mobile: String,
    pub namespace_id: Identity,
    /// Target-local; empty whenever this value was produced by a source read.
    pub role_ids: Vec<Identity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    pub identity: Identity,
    pub name: String,
    pub description: String,
    pub kind: GroupKind,
    pub parent_id: Identity,
    pub child_ids: Vec<Identity>,
}

impl Default for GroupKind {
    fn default() -> Self {
        GroupKind::Group
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectNamespace {
    pub identity: Identity,
    pub kind: GroupKind,
    pub parent_id: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Project {
    pub identity: Identity,
    pub name: String,
    pub description: String,
    pub namespace: ProjectNamespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: Identity,
    pub group_id: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: Identity,
    pub project_id: Identity,
}

/// Partition a target user's role-ids into group-membership roles owned by
/// `(source_kind, source_name)` and everything else ("foreign"), per
/// data-model invariant 4. Only role-kind `group` counts as owned here —
/// a user's namespace role (role-kind `user`) is minted by the same
/// source but is not a group membership, so member-sync must leave it
/// alone like any other foreign role. Preserves relative order within each
/// partition.
pub fn partition_owned_roles<'a>(
    role_ids: &'a [Identity],
    source_kind: &str,
    source_name: &str,
) -> (Vec<&'a Identity>, Vec<&'a Identity>) {
    let mut owned = Vec::new();
    let mut foreign = Vec::new();
    for id in role_ids {
        match owned_knri(id.as_str(), source_kind, source_name) {
            Some(knri) if knri.role_kind == RoleKind::Group => owned.push(id),
            _ => foreign.push(id),
        }
    }
    (owned, foreign)
}
