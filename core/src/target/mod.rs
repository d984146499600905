//! Target provider: pluggable capability exposing a target application's
//! users/groups/projects and accepting writes, plus diff, fix-up, and
//! member-sync logic.

pub mod diff;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{partition_owned_roles, Group, GroupKind, GroupMember, Identity, Project, RoleKind, TargetKnri, User};

pub use diff::Diff;

/// A target application. Implementations are single-run scoped: a fresh
/// instance is minted by the registry for each reconciliation tick, bound
/// to one source via [`TargetProvider::source_kind`]/[`TargetProvider::source_name`].
#[async_trait]
pub trait TargetProvider: Send + Sync {
    /// This target instance's own kind, e.g. `"artifactory"`.
    fn kind(&self) -> &str;
    /// This target instance's own bound name, e.g. `"prod-artifactory"`.
    fn name(&self) -> &str;
    /// Key used to index per-target state in the orchestrator's maps.
    fn identity_key(&self) -> String {
        format!("{}/{}", self.kind(), self.name())
    }

    /// The bound source's kind/name — every KNRI this target mints uses
    /// this pair. Set via the registry before first use (`SetSource`).
    fn source_kind(&self) -> &str;
    fn source_name(&self) -> &str;

    // ---- readers --------------------------------------------------------
    async fn get_users(&self) -> Result<Vec<User>>;
    async fn get_groups(&self) -> Result<Vec<Group>>;
    async fn get_projects(&self) -> Result<Vec<Project>>;
    async fn get_group_members(&self) -> Result<Vec<GroupMember>>;

    // ---- writers ----------------------------------------------------------
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn create_group(&self, group: &Group) -> Result<Group>;
    async fn update_group(&self, group: &Group) -> Result<()>;
    async fn create_project(&self, project: &Project) -> Result<Project>;
    async fn update_project(&self, project: &Project) -> Result<()>;

    /// No-op by default (deletion is a non-goal). Targets that want to
    /// clean up their own source-owned entities on `SyncConfig` deletion
    /// override this to list entities whose KNRI matches this source and
    /// delete each.
    async fn clear_target_app_data(&self) -> Result<()> {
        Ok(())
    }

    // ---- identity generators --------------------------------------------
    fn generate_idp_user_identity(&self, id: &Identity) -> Identity {
        TargetKnri::user(self.source_kind(), self.source_name(), id.as_str())
    }

    fn generate_idp_group_identity(&self, kind: GroupKind, id: &Identity) -> Identity {
        TargetKnri::new(self.source_kind(), self.source_name(), RoleKind::from(kind), id.as_str()).minted()
    }

    fn generate_idp_project_identity(&self, id: &Identity) -> Identity {
        self.generate_idp_group_identity(GroupKind::Project, id)
    }

    /// Create a user's private namespace role before the user itself, then
    /// create the user with that role's minted identity prepended to its
    /// `role_ids`. Every user gets one such role, keyed by the user's own
    /// (un-minted) `namespace_id` rather than its source identity.
    async fn create_user_with_namespace(&self, user: &User) -> Result<User> {
        let namespace_role_id = self.generate_idp_group_identity(GroupKind::User, &user.namespace_id);
        let namespace_role = Group {
            identity: namespace_role_id.clone(),
            name: user.username.clone(),
            description: user.description.clone(),
            kind: GroupKind::User,
            parent_id: Identity::default(),
            child_ids: Vec::new(),
        };
        self.create_group(&namespace_role).await?;

        let mut namespaced_user = user.clone();
        namespaced_user.role_ids.insert(0, namespace_role_id);
        self.create_user(&namespaced_user).await
    }

    // ---- diff -------------------------------------------------------------
    fn compare_users(&self, idp_users: &[User], target_users: &[User]) -> Diff<User> {
        diff::compare_users(idp_users, target_users, |id| self.generate_idp_user_identity(id))
    }

    fn compare_groups(&self, idp_groups: &[Group], target_groups: &[Group]) -> Diff<Group> {
        diff::compare_groups(idp_groups, target_groups, |id| self.generate_idp_group_identity(GroupKind::Group, id))
    }

    fn compare_projects(&self, idp_projects: &[Project], target_projects: &[Project]) -> Diff<Project> {
        diff::compare_projects(idp_projects, target_projects, |id| self.generate_idp_project_identity(id))
    }

    // ---- post-write fix-ups ------------------------------------------------

    /// Re-read the target's groups and establish parent→child links that a
    /// flat create call cannot express, per source group `idp_group_child_ids`
    /// (source group identity -> its source child identities, already
    /// passed through [`crate::source::render_child_group_ids`]).
    async fn wrapping_up_after_group_sync(&self, idp_group_child_ids: &HashMap<Identity, Vec<Identity>>) -> Result<usize> {
        let fresh_groups = self.get_groups().await?;
        let by_identity: HashMap<&Identity, &Group> = fresh_groups.iter().map(|g| (&g.identity, g)).collect();
        let mut updated = 0;

        for (source_group_id, source_children) in idp_group_child_ids {
            let minted_id = self.generate_idp_group_identity(GroupKind::Group, source_group_id);
            let Some(t) = by_identity.get(&minted_id) else {
                continue;
            };
            let minted_children: Vec<Identity> = source_children
                .iter()
                .map(|c| self.generate_idp_group_identity(GroupKind::Group, c))
                .collect();

            let owned_current: HashSet<&Identity> = t.child_ids.iter().filter(|c| !diff::is_project_link(c)).collect();
            let expected: HashSet<&Identity> = minted_children.iter().collect();
            if owned_current == expected {
                continue;
            }

            let project_links: Vec<Identity> = t.child_ids.iter().filter(|c| diff::is_project_link(c)).cloned().collect();
            let mut new_children = minted_children;
            new_children.extend(project_links);

            let mut updated_group = (*t).clone();
            updated_group.child_ids = new_children;
            self.update_group(&updated_group).await?;
            updated += 1;
        }

        Ok(updated)
    }

    /// For each source project, append its minted identity to its owning
    /// group's `child_ids` if not already present, and persist the groups
    /// that gained a new child.
    async fn group_binding_projects(&self, idp_projects: &[Project]) -> Result<usize> {
        let fresh_groups = self.get_groups().await?;
        let mut groups_by_id: HashMap<Identity, Group> = fresh_groups.into_iter().map(|g| (g.identity.clone(), g)).collect();
        let mut touched: HashSet<Identity> = HashSet::new();

        for p in idp_projects {
            let project_knri = self.generate_idp_project_identity(&p.identity);
            let group_knri = self.generate_idp_group_identity(p.namespace.kind, &p.namespace.identity);
            if let Some(group) = groups_by_id.get_mut(&group_knri) {
                if !group.child_ids.contains(&project_knri) {
                    group.child_ids.push(project_knri);
                    touched.insert(group_knri);
                }
            }
        }

        let touched_count = touched.len();
        for id in touched {
            if let Some(g) = groups_by_id.get(&id) {
                self.update_group(g).await?;
            }
        }
        Ok(touched_count)
    }

    /// Reconcile user↔group edges: for each source user appearing in the
    /// target's current user list, make their owned (role-kind `group`,
    /// this source) role-ids equal the minted set of their source group
    /// memberships, leaving foreign role-ids untouched.
    async fn sync_group_members(&self, source_users: &[User], source_group_members: &[GroupMember]) -> Result<usize> {
        let mut expected_by_user: HashMap<&Identity, Vec<Identity>> = HashMap::new();
        for m in source_group_members {
            expected_by_user
                .entry(&m.user_id)
                .or_default()
                .push(self.generate_idp_group_identity(GroupKind::Group, &m.group_id));
        }

        let except = std::env::var("EXCEPT_GROUP_MEMBER_ID").ok();
        let target_users = self.get_users().await?;
        let target_by_id: HashMap<&Identity, &User> = target_users.iter().map(|u| (&u.identity, u)).collect();
        let mut updated = 0;

        for (source_user_id, expected) in expected_by_user {
            let target_user_id = self.generate_idp_user_identity(source_user_id);
            let Some(t) = target_by_id.get(&target_user_id) else {
                continue;
            };

            let (owned, foreign) = partition_owned_roles(&t.role_ids, self.source_kind(), self.source_name());
            let expected_set: HashSet<&Identity> = expected.iter().collect();
            let owned_set: HashSet<&Identity> = owned.iter().copied().collect();

            let mut owned_sorted: Vec<&Identity> = owned.clone();
            owned_sorted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            let mut expected_sorted: Vec<&Identity> = expected.iter().collect();
            expected_sorted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            if owned_sorted == expected_sorted {
                continue;
            }

            let mut new_roles: Vec<Identity> = owned
                .iter()
                .filter(|o| expected_set.contains(**o))
                .map(|o| (*o).clone())
                .collect();
            new_roles.extend(expected.iter().filter(|e| !owned_set.contains(*e)).cloned());
            new_roles.extend(foreign.into_iter().cloned());
            if let Some(except) = &except {
                new_roles.retain(|r| r.as_str() != except);
            }

            if let Some(src_user) = source_users.iter().find(|u| &u.identity == source_user_id) {
                let mut updated_user = src_user.clone();
                updated_user.identity = target_user_id;
                updated_user.role_ids = new_roles;
                updated_user.namespace_id = t.namespace_id.clone();
                self.update_user(&updated_user).await?;
                updated += 1;
            }
        }

        Ok(updated)
    }
}
