//! In-memory reference `SourceProvider`/`TargetProvider` pair used by the
//! integration test suite to exercise the orchestrator and reconciler
//! end-to-end without a real IdP or target system. Not a
//! stand-in for any concrete production provider — it ships no HTTP code.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine_config::RetryPolicy;
use crate::error::Result;
use crate::model::{Group, GroupMember, Project, User};
use crate::secret::SecretStore;
use crate::setup::{ConfigurableSource, ConfigurableTarget};
use crate::source::{paginate, render_child_group_ids, SourceProvider};
use crate::target::TargetProvider;

/// Default page size small enough that a handful of seeded entities still
/// exercises the prime-page-then-fan-out pagination path.
const DEFAULT_PAGE_SIZE: usize = 2;

pub struct MemorySource {
    kind: String,
    name: String,
    page_size: usize,
    retry: RetryPolicy,
    users: Vec<User>,
    groups: Vec<Group>,
    projects: Vec<Project>,
    group_members: Vec<GroupMember>,
}

impl MemorySource {
    pub fn empty(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::no_retry(),
            users: Vec::new(),
            groups: Vec::new(),
            projects: Vec::new(),
            group_members: Vec::new(),
        }
    }

    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        users: Vec<User>,
        groups: Vec<Group>,
        projects: Vec<Project>,
        group_members: Vec<GroupMember>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::no_retry(),
            users,
            groups,
            projects,
            group_members,
        }
    }

    async fn paginate<T: Clone + Send + Sync>(&self, all: &[T]) -> Result<Vec<T>> {
        paginate::fetch_all(self.page_size, &self.retry, |page, page_size| async move {
            let start = (page - 1) * page_size;
            let items = all
                .iter()
                .skip(start)
                .take(page_size)
                .cloned()
                .collect::<Vec<_>>();
            Ok(paginate::Page {
                items,
                total_count: all.len(),
            })
        })
        .await
    }
}

#[async_trait]
impl SourceProvider for MemorySource {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        self.paginate(&self.users).await
    }

    async fn get_groups(&self) -> Result<Vec<Group>> {
        let raw = self.paginate(&self.groups).await?;
        Ok(render_child_group_ids(raw))
    }

    async fn get_projects(&self) -> Result<Vec<Project>> {
        self.paginate(&self.projects).await
    }

    async fn get_all_group_members(&self) -> Result<Vec<GroupMember>> {
        self.paginate(&self.group_members).await
    }

    async fn get_group_members(&self, group: &Group) -> Result<Vec<GroupMember>> {
        Ok(self
            .group_members
            .iter()
            .filter(|m| m.group_id == group.identity)
            .cloned()
            .collect())
    }
}

impl ConfigurableSource for MemorySource {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set_api_server_url(&mut self, _url: &str) {
        // no transport to configure
    }

    fn set_secret_store(&mut self, _store: Arc<dyn SecretStore>) {
        // no credentials to resolve
    }
}

pub struct MemoryTarget {
    kind: String,
    name: String,
    source_kind: String,
    source_name: String,
    users: RwLock<Vec<User>>,
    groups: RwLock<Vec<Group>>,
    projects: RwLock<Vec<Project>>,
}

impl MemoryTarget {
    pub fn empty(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: String::new(),
            source_kind: String::new(),
            source_name: String::new(),
            users: RwLock::new(Vec::new()),
            groups: RwLock::new(Vec::new()),
            projects: RwLock::new(Vec::new()),
        }
    }

    pub fn new(kind: impl Into<String>, name: impl Into<String>, source_kind: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            source_kind: source_kind.into(),
            source_name: source_name.into(),
            users: RwLock::new(Vec::new()),
            groups: RwLock::new(Vec::new()),
            projects: RwLock::new(Vec::new()),
        }
    }

    pub fn seed_native_role(&mut self, user_identity: crate::model::Identity, role_ids: Vec<crate::model::Identity>) {
        self.users.get_mut().push(User {
            identity: user_identity,
            role_ids,
            ..Default::default()
        });
    }
}

#[async_trait]
impl TargetProvider for MemoryTarget {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source_kind(&self) -> &str {
        &self.source_kind
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn get_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.read().await.clone())
    }

    async fn get_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().await.clone())
    }

    async fn get_group_members(&self) -> Result<Vec<GroupMember>> {
        let groups = self.groups.read().await;
        let users = self.users.read().await;
        let mut members = Vec::new();
        for u in users.iter() {
            for role in &u.role_ids {
                if groups.iter().any(|g| &g.identity == role) {
                    members.push(GroupMember {
                        user_id: u.identity.clone(),
                        group_id: role.clone(),
                    });
                }
            }
        }
        Ok(members)
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.iter_mut().find(|u| u.identity == user.identity) {
            *existing = user.clone();
        }
        Ok(())
    }

    async fn create_group(&self, group: &Group) -> Result<Group> {
        let mut groups = self.groups.write().await;
        groups.push(group.clone());
        Ok(group.clone())
    }

    async fn update_group(&self, group: &Group) -> Result<()> {
        let mut groups = self.groups.write().await;
        if let Some(existing) = groups.iter_mut().find(|g| g.identity == group.identity) {
            *existing = group.clone();
        }
        Ok(())
    }

    async fn create_project(&self, project: &Project) -> Result<Project> {
        let mut projects = self.projects.write().await;
        projects.push(project.clone());
        Ok(project.clone())
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        if let Some(existing) = projects.iter_mut().find(|p| p.identity == project.identity) {
            *existing = project.clone();
        }
        Ok(())
    }
}

impl ConfigurableTarget for MemoryTarget {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set_api_server_url(&mut self, _url: &str) {}

    fn set_secret_store(&mut self, _store: Arc<dyn SecretStore>) {}

    fn set_source(&mut self, source_kind: &str, source_name: &str) {
        self.source_kind = source_kind.to_string();
        self.source_name = source_name.to_string();
    }
}
