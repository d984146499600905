//! Source provider: pluggable capability exposing a source IdP's
//! users/groups/projects/group-members.

pub mod paginate;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Group, GroupMember, Identity, Project, User};

/// A source identity provider. Implementations own their own pagination
/// (typically via [`paginate::fetch_all`]) and concurrency; every list
/// operation here is expected to already have fanned out and merged pages.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// The provider kind this instance was constructed for, e.g. `"gitlab"`.
    fn kind(&self) -> &str;

    /// The bound name of this source instance, e.g. `"prod"`. Together with
    /// `kind()` this is the `(sourceKind, sourceName)` pair every KNRI is
    /// minted against.
    fn name(&self) -> &str;

    async fn get_users(&self) -> Result<Vec<User>>;
    async fn get_groups(&self) -> Result<Vec<Group>>;
    async fn get_projects(&self) -> Result<Vec<Project>>;

    /// All group-members across every group, source-wide.
    async fn get_all_group_members(&self) -> Result<Vec<GroupMember>>;

    /// Group-members for one group. Used by providers whose transport does
    /// not expose a source-wide listing.
    async fn get_group_members(&self, group: &Group) -> Result<Vec<GroupMember>>;

    /// Look up a user by its *original* (un-namespaced) source identity
    /// over an already-loaded user list — no network call (data-model
    /// invariant 3).
    fn get_static_user_by_id<'a>(&self, users: &'a [User], id: &Identity) -> Option<&'a User> {
        users.iter().find(|u| &u.identity == id)
    }
}

/// Populate each group's `child_ids` by inverting the `parent_id` edge:
/// one pass builds `parent -> children`, a second pass assigns. O(n).
pub fn render_child_group_ids(mut groups: Vec<Group>) -> Vec<Group> {
    let mut children_by_parent: HashMap<Identity, Vec<Identity>> = HashMap::new();
    for g in &groups {
        if g.parent_id.as_str().is_empty() {
            continue;
        }
        children_by_parent
            .entry(g.parent_id.clone())
            .or_default()
            .push(g.identity.clone());
    }
    for g in &mut groups {
        if let Some(children) = children_by_parent.remove(&g.identity) {
            g.child_ids = children;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupKind;

    fn group(id: &str, parent: &str) -> Group {
        Group {
            identity: Identity::new(id),
            name: id.to_string(),
            description: String::new(),
            kind: GroupKind::Group,
            parent_id: Identity::new(parent),
            child_ids: vec![],
        }
    }

    #[test]
    fn inverts_parent_edges_into_child_ids() {
        let groups = vec![group("root", ""), group("a", "root"), group("b", "root"), group("c", "a")];
        let rendered = render_child_group_ids(groups);
        let by_id: HashMap<_, _> = rendered.into_iter().map(|g| (g.identity.clone(), g)).collect();

        let mut root_children: Vec<String> = by_id[&Identity::new("root")]
            .child_ids
            .iter()
            .map(|i| i.to_string())
            .collect();
        root_children.sort();
        assert_eq!(root_children, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(by_id[&Identity::new("a")].child_ids, vec![Identity::new("c")]);
        assert!(by_id[&Identity::new("c")].child_ids.is_empty());
    }
}
