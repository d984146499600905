//! The three diff algorithms: users, groups, projects. Pure
//! functions of already-minted source/target entity lists so they can be
//! unit-tested without a live provider.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Group, GroupKind, Identity, Project, User};

/// Create-set / update-set pair produced by one `compare_*` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff<T> {
    pub creates: Vec<T>,
    pub updates: Vec<T>,
}

/// A `ChildIds` entry is a project link when its minted KNRI's identity
/// segment contains the substring `"project"`.
/// This is a documented sharp edge: it is a substring test, not a parsed
/// role-kind check, and could in principle collide with a native role
/// whose id happens to contain that text.
pub fn is_project_link(id: &Identity) -> bool {
    id.as_str().contains("project")
}

fn user_changed(t: &User, candidate: &User) -> bool {
    t.name != candidate.name
        || t.description != candidate.description
        || t.username != candidate.username
        || t.email != candidate.email
        || t.avatar_url != candidate.avatar_url
        || t.mobile != candidate.mobile
}

/// `CompareUsers`: diff idp users against a target's current users.
/// `mint` maps a source user identity to its target KNRI.
pub fn compare_users(idp_users: &[User], target_users: &[User], mint: impl Fn(&Identity) -> Identity) -> Diff<User> {
    let by_identity: HashMap<&Identity, &User> = target_users.iter().map(|u| (&u.identity, u)).collect();
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    for u in idp_users {
        let minted = mint(&u.identity);
        match by_identity.get(&minted) {
            None => {
                let mut created = u.clone();
                created.identity = minted;
                created.role_ids = Vec::new();
                creates.push(created);
            }
            Some(t) => {
                let mut candidate = u.clone();
                candidate.identity = minted;
                candidate.role_ids = t.role_ids.clone();
                if user_changed(t, &candidate) {
                    updates.push(candidate);
                }
            }
        }
    }

    Diff { creates, updates }
}

fn group_owned_children(child_ids: &[Identity]) -> BTreeSet<&Identity> {
    child_ids.iter().filter(|c| !is_project_link(c)).collect()
}

fn group_changed(t: &Group, minted_children: &[Identity], name: &str, description: &str, kind: GroupKind) -> bool {
    if t.name != name || t.description != description || t.kind != kind {
        return true;
    }
    let target_owned: BTreeSet<&Identity> = group_owned_children(&t.child_ids);
    let source_owned: BTreeSet<&Identity> = minted_children.iter().collect();
    target_owned != source_owned
}

/// Net effect of "union source children into the target's list, then
/// intersect with source's list, then re-append preserved project links":
/// replace the target's owned-group children with the source's set,
/// carrying the target's project links through untouched, computed
/// directly rather than performing the set operations literally.
fn merge_child_ids(target_current: &[Identity], minted_source_children: &[Identity]) -> Vec<Identity> {
    let project_links: Vec<Identity> = target_current.iter().filter(|c| is_project_link(c)).cloned().collect();
    let mut merged = minted_source_children.to_vec();
    merged.extend(project_links);
    merged
}

/// `CompareGroups`: diff idp groups against a target's current groups.
/// `mint` maps a source group identity (the group's own id, or one of its
/// child ids) to its target KNRI — children are always minted as
/// role-kind `group` since the source hierarchy links groups to groups.
pub fn compare_groups(idp_groups: &[Group], target_groups: &[Group], mint: impl Fn(&Identity) -> Identity) -> Diff<Group> {
    let by_identity: HashMap<&Identity, &Group> = target_groups.iter().map(|g| (&g.identity, g)).collect();
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    for g in idp_groups {
        let minted_id = mint(&g.identity);
        let minted_children: Vec<Identity> = g.child_ids.iter().map(&mint).collect();

        match by_identity.get(&minted_id) {
            None => creates.push(Group {
                identity: minted_id,
                name: g.name.clone(),
                description: g.description.clone(),
                kind: g.kind,
                parent_id: Identity::default(),
                child_ids: minted_children,
            }),
            Some(t) => {
                if group_changed(t, &minted_children, &g.name, &g.description, g.kind) {
                    updates.push(Group {
                        identity: minted_id,
                        name: g.name.clone(),
                        description: g.description.clone(),
                        kind: g.kind,
                        parent_id: t.parent_id.clone(),
                        child_ids: merge_child_ids(&t.child_ids, &minted_children),
                    });
                }
            }
        }
    }

    Diff { creates, updates }
}

fn project_changed(t: &Project, name: &str, description: &str) -> bool {
    t.name != name || t.description != description
}

/// `CompareProjects`: diff idp projects against a target's current
/// projects. `Namespace` is never reconciled field-by-field here; binding
/// is handled by the orchestrator's group-binding-projects fix-up.
pub fn compare_projects(idp_projects: &[Project], target_projects: &[Project], mint: impl Fn(&Identity) -> Identity) -> Diff<Project> {
    let by_identity: HashMap<&Identity, &Project> = target_projects.iter().map(|p| (&p.identity, p)).collect();
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    for p in idp_projects {
        let minted_id = mint(&p.identity);
        match by_identity.get(&minted_id) {
            None => creates.push(Project {
                identity: minted_id,
                name: p.name.clone(),
                description: p.description.clone(),
                namespace: p.namespace.clone(),
            }),
            Some(t) => {
                if project_changed(t, &p.name, &p.description) {
                    updates.push(Project {
                        identity: minted_id,
                        name: p.name.clone(),
                        description: p.description.clone(),
                        namespace: t.namespace.clone(),
                    });
                }
            }
        }
    }

    Diff { creates, updates }
}
