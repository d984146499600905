//! Target KNRI (Kind-Name-RoleKind-Identity): the namespacing scheme that
//! lets entities imported from a source coexist with a target's native
//! entities in a single flat identifier space.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{GroupKind, Identity};

/// Role-kind segment of a KNRI. `Group`/`Project` namespace group and
/// project roles; `User` namespaces the per-user namespace role minted
/// alongside a user (see orchestrator step 5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Group,
    User,
    Project,
}

impl RoleKind {
    fn as_str(self) -> &'static str {
        match self {
            RoleKind::Group => "group",
            RoleKind::User => "user",
            RoleKind::Project => "project",
        }
    }

    fn parse(s: &str) -> Option<RoleKind> {
        match s {
            "group" => Some(RoleKind::Group),
            "user" => Some(RoleKind::User),
            "project" => Some(RoleKind::Project),
            _ => None,
        }
    }
}

impl From<GroupKind> for RoleKind {
    fn from(k: GroupKind) -> Self {
        match k {
            GroupKind::Group => RoleKind::Group,
            GroupKind::User => RoleKind::User,
            GroupKind::Project => RoleKind::Project,
        }
    }
}

/// A namespaced identity: `<sourceKind>-<sourceName>-<roleKind>-<identity>`
/// for groups/projects, `<sourceKind>-<sourceName>-<identity>` for users.
///
/// The parser only accepts the four-segment form. Anything else (including
/// the three-segment user form parsed back through this type) yields an
/// empty KNRI, which callers must treat as "not sourced from any known
/// source" and filter out of diffs rather than erroring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TargetKnri {
    pub source_kind: String,
    pub source_name: String,
    pub role_kind: RoleKind,
    pub identity: String,
}

impl Default for RoleKind {
    fn default() -> Self {
        RoleKind::Group
    }
}

impl TargetKnri {
    pub fn new(
        source_kind: impl Into<String>,
        source_name: impl Into<String>,
        role_kind: RoleKind,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            source_kind: source_kind.into(),
            source_name: source_name.into(),
            role_kind,
            identity: identity.into(),
        }
    }

    /// Mint the three-segment user form: `<sourceKind>-<sourceName>-<identity>`.
    pub fn user(source_kind: impl Into<String>, source_name: impl Into<String>, identity: impl Into<String>) -> Identity {
        Identity::new(format!("{}-{}-{}", source_kind.into(), source_name.into(), identity.into()))
    }

    /// Mint the four-segment group/project form.
    pub fn minted(&self) -> Identity {
        Identity::new(self.to_string())
    }

    /// Parse a raw identity string as a four-segment KNRI. Any shape other
    /// than exactly four `-`-separated segments with a recognized role-kind
    /// yields `None` ("not sourced from any known source").
    pub fn parse(raw: &str) -> Option<TargetKnri> {
        let parts: Vec<&str> = raw.split('-').collect();
        if parts.len() != 4 {
            return None;
        }
        let role_kind = RoleKind::parse(parts[2])?;
        Some(TargetKnri {
            source_kind: parts[0].to_string(),
            source_name: parts[1].to_string(),
            role_kind,
            identity: parts[3].to_string(),
        })
    }

    /// True when this KNRI was minted by source `(kind, name)` — i.e. is
    /// "owned" by that source. Per invariant 1, only owned entities
    /// participate in a diff for that source's run.
    pub fn owned_by(&self, source_kind: &str, source_name: &str) -> bool {
        self.source_kind == source_kind && self.source_name == source_name
    }
}

impl fmt::Display for TargetKnri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.source_kind,
            self.source_name,
            self.role_kind.as_str(),
            self.identity
        )
    }
}

/// Parse `raw` and check ownership by `(source_kind, source_name)` in one
/// step; `None` both for unparsable identities and for identities owned by
/// a different source.
pub fn owned_knri(raw: &str, source_kind: &str, source_name: &str) -> Option<TargetKnri> {
    TargetKnri::parse(raw).filter(|k| k.owned_by(source_kind, source_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_segment_form() {
        let k = TargetKnri::parse("gitlab-prod-group-42").unwrap();
        assert_eq!(k.source_kind, "gitlab");
        assert_eq!(k.source_name, "prod");
        assert_eq!(k.role_kind, RoleKind::Group);
        assert_eq!(k.identity, "42");
        assert_eq!(k.to_string(), "gitlab-prod-group-42");
    }

    #[test]
    fn rejects_three_segment_user_form() {
        // Users mint a 3-segment identity; parsing it back as a 4-segment
        // KNRI must fail, not silently misparse.
        assert!(TargetKnri::parse("gitlab-prod-7").is_none());
    }

    #[test]
    fn rejects_unknown_role_kind() {
        assert!(TargetKnri::parse("gitlab-prod-widget-7").is_none());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(TargetKnri::parse("admin").is_none());
        assert!(TargetKnri::parse("a-b-c-d-e").is_none());
    }

    #[test]
    fn native_role_is_never_owned() {
        assert!(owned_knri("admin", "gitlab", "prod").is_none());
    }

    #[test]
    fn ownership_checks_both_kind_and_name() {
        let k = TargetKnri::new("gitlab", "prod", RoleKind::Group, "1");
        assert!(k.owned_by("gitlab", "prod"));
        assert!(!k.owned_by("gitlab", "staging"));
        assert!(!k.owned_by("github", "prod"));
    }
}
