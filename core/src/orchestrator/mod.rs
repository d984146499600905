//! Per-run orchestrator: reads source and every target
//! concurrently, computes per-target diffs, then writes to each target
//! independently in the order users → groups → hierarchy fix-up →
//! projects → project binding → project updates → member sync. A
//! per-target failure isolates that target; a source-read failure aborts
//! the whole run.

pub mod result;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::devfilter::DevFilters;
use crate::error::{EngineError, Result};
use crate::model::{Group, GroupMember, Identity, Project, User};
use crate::setup::{ConfigurableSource, ConfigurableTarget};
use crate::target::Diff;

pub use result::{BriefEntry, DetailEntry, SyncLogicResult, SyncStepKind};

struct SourceSnapshot {
    users: Vec<User>,
    groups: Vec<Group>,
    projects: Vec<Project>,
    group_members: Vec<GroupMember>,
}

struct PerTargetState {
    key: String,
    user_diff: Diff<User>,
    group_diff: Diff<Group>,
    project_diff: Diff<Project>,
}

/// One orchestrated run, bound to a single resolved source and its targets.
/// Single-run-scoped: construct fresh per reconciliation tick.
pub struct Orchestrator {
    source: Box<dyn ConfigurableSource>,
    targets: Vec<Box<dyn ConfigurableTarget>>,
    dev_filters: DevFilters,
}

impl Orchestrator {
    pub fn new(source: Box<dyn ConfigurableSource>, targets: Vec<Box<dyn ConfigurableTarget>>, dev_filters: DevFilters) -> Self {
        Self {
            source,
            targets,
            dev_filters,
        }
    }

    /// Run `ClearTargetAppData` against every target. Invoked by the
    /// reconciler instead of [`Orchestrator::run`] when the bound
    /// `SyncConfig` is being deleted. A no-op for targets that don't
    /// override the default (non-goal: purge).
    pub async fn clear_target_app_data(&self) -> SyncLogicResult {
        let mut result = SyncLogicResult::default();
        let outcomes = join_all(self.targets.iter().map(|t| async move {
            let key = t.identity_key();
            let ok = t.clear_target_app_data().await;
            (key, ok)
        }))
        .await;

        let mut all_ok = true;
        for (key, outcome) in outcomes {
            match outcome {
                Ok(()) => result.record_detail(&key, SyncStepKind::ReadResource, true, None),
                Err(e) => {
                    all_ok = false;
                    result.record_detail(&key, SyncStepKind::ReadResource, false, Some(e.to_string()));
                }
            }
        }
        result.record_brief(SyncStepKind::ReadResource, all_ok, None);
        result
    }

    pub async fn run(&self, cancel: CancellationToken) -> SyncLogicResult {
        let span = info_span!("sync_run", source_kind = self.source.kind(), source_name = self.source.name());
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(&self, cancel: CancellationToken) -> SyncLogicResult {
        let mut result = SyncLogicResult::default();

        let source_snapshot = match self.read_source(&cancel).await {
            Ok(snapshot) => {
                result.record_brief(SyncStepKind::ReadResource, true, None);
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "source read failed, aborting run");
                result.record_brief(SyncStepKind::ReadResource, false, Some(e.to_string()));
                return result;
            }
        };

        if cancel.is_cancelled() {
            result.record_brief(SyncStepKind::ReadResource, false, Some("cancelled".to_string()));
            return result;
        }

        let target_reads = join_all(self.targets.iter().map(|t| self.read_target(t.as_ref()))).await;

        let mut healthy: Vec<(usize, Vec<User>, Vec<Group>, Vec<Project>)> = Vec::new();
        for (idx, read) in target_reads.into_iter().enumerate() {
            let key = self.targets[idx].identity_key();
            match read {
                Ok((u, g, p)) => {
                    result.record_detail(&key, SyncStepKind::ReadResource, true, None);
                    healthy.push((idx, u, g, p));
                }
                Err(e) => {
                    warn!(target = %key, error = %e, "target read failed, isolating target for this run");
                    result.record_detail(&key, SyncStepKind::ReadResource, false, Some(e.to_string()));
                }
            }
        }

        let mut states = Vec::new();
        for (idx, target_users, target_groups, target_projects) in &healthy {
            let target = self.targets[*idx].as_ref();
            let key = target.identity_key();
            let user_diff = target.compare_users(&source_snapshot.users, target_users);
            let group_diff = target.compare_groups(&source_snapshot.groups, target_groups);
            let project_diff = target.compare_projects(&source_snapshot.projects, target_projects);
            states.push((
                *idx,
                PerTargetState {
                    key,
                    user_diff,
                    group_diff,
                    project_diff,
                },
            ));
        }

        let idp_group_child_ids: HashMap<Identity, Vec<Identity>> =
            source_snapshot.groups.iter().map(|g| (g.identity.clone(), g.child_ids.clone())).collect();
        let source_snapshot = Arc::new(source_snapshot);

        let outcomes = join_all(states.into_iter().map(|(idx, state)| {
            let source_snapshot = Arc::clone(&source_snapshot);
            let target = self.targets[idx].as_ref();
            let idp_group_child_ids = &idp_group_child_ids;
            let cancel = cancel.clone();
            async move { write_target(target, state, &source_snapshot, idp_group_child_ids, &self.dev_filters, &cancel).await }
        }))
        .await;

        let mut user_ok = true;
        let mut group_ok = true;
        let mut project_ok = true;
        let mut member_ok = true;
        for details in outcomes {
            for d in details {
                match d.step {
                    SyncStepKind::SyncUser if !d.ok => user_ok = false,
                    SyncStepKind::SyncGroup if !d.ok => group_ok = false,
                    SyncStepKind::SyncProject if !d.ok => project_ok = false,
                    SyncStepKind::SyncGroupMember if !d.ok => member_ok = false,
                    _ => {}
                }
                result.detail.entry(d.target.clone()).or_default().push(d);
            }
        }
        result.record_brief(SyncStepKind::SyncUser, user_ok, None);
        result.record_brief(SyncStepKind::SyncGroup, group_ok, None);
        result.record_brief(SyncStepKind::SyncProject, project_ok, None);
        result.record_brief(SyncStepKind::SyncGroupMember, member_ok, None);

        info!(succeeded = result.succeeded(), "sync run finished");
        result
    }

    async fn read_source(&self, cancel: &CancellationToken) -> Result<SourceSnapshot> {
        if cancel.is_cancelled() {
            return Err(EngineError::Validation {
                message: "cancelled before source read".to_string(),
            });
        }
        let (users, groups, projects) =
            tokio::try_join!(self.source.get_users(), self.source.get_groups(), self.source.get_projects())?;
        let group_members = self.source.get_all_group_members().await?;
        Ok(SourceSnapshot {
            users,
            groups,
            projects,
            group_members,
        })
    }

    async fn read_target(&self, target: &dyn ConfigurableTarget) -> Result<(Vec<User>, Vec<Group>, Vec<Project>)> {
        tokio::try_join!(target.get_users(), target.get_groups(), target.get_projects())
    }

    /// Read back one target's current users/groups/projects by its position
    /// in the bound target list, for introspection after a run.
    pub async fn target_state(&self, index: usize) -> Result<(Vec<User>, Vec<Group>, Vec<Project>)> {
        self.read_target(self.targets[index].as_ref()).await
    }
}

/// Run the 8-substep write phase for one target. A
/// failure at any substep aborts the remaining substeps for *this* target
/// only; the caller runs one of these per target, concurrently.
async fn write_target(
    target: &dyn ConfigurableTarget,
    state: PerTargetState,
    source: &SourceSnapshot,
    idp_group_child_ids: &HashMap<Identity, Vec<Identity>>,
    dev_filters: &DevFilters,
    cancel: &CancellationToken,
) -> Vec<DetailEntry> {
    let key = state.key.clone();
    let mut details = Vec::new();

    macro_rules! bail_if_cancelled {
        () => {
            if cancel.is_cancelled() {
                details.push(DetailEntry {
                    target: key.clone(),
                    step: SyncStepKind::SyncUser,
                    ok: false,
                    message: Some("cancelled".to_string()),
                });
                return details;
            }
        };
    }

    bail_if_cancelled!();

    // 1. users
    let mut step_ok = true;
    'users: {
        for u in &state.user_diff.creates {
            if !dev_filters.keep_user(u) {
                continue;
            }
            if let Err(e) = target.create_user_with_namespace(u).await {
                warn!(target = %key, error = %e, "user create failed, aborting target");
                details.push(DetailEntry {
                    target: key.clone(),
                    step: SyncStepKind::SyncUser,
                    ok: false,
                    message: Some(e.to_string()),
                });
                step_ok = false;
                break 'users;
            }
        }
        for u in &state.user_diff.updates {
            if !dev_filters.keep_user(u) {
                continue;
            }
            if let Err(e) = target.update_user(u).await {
                warn!(target = %key, error = %e, "user update failed, aborting target");
                details.push(DetailEntry {
                    target: key.clone(),
                    step: SyncStepKind::SyncUser,
                    ok: false,
                    message: Some(e.to_string()),
                });
                step_ok = false;
                break 'users;
            }
        }
    }
    if step_ok {
        details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncUser,
            ok: true,
            message: None,
        });
    } else {
        return details;
    }

    // 2. groups
    let mut step_ok = true;
    'groups: {
        for g in &state.group_diff.creates {
            if !dev_filters.keep_group(g) {
                continue;
            }
            if let Err(e) = target.create_group(g).await {
                warn!(target = %key, error = %e, "group create failed, aborting target");
                details.push(DetailEntry {
                    target: key.clone(),
                    step: SyncStepKind::SyncGroup,
                    ok: false,
                    message: Some(e.to_string()),
                });
                step_ok = false;
                break 'groups;
            }
        }
        for g in &state.group_diff.updates {
            if !dev_filters.keep_group(g) {
                continue;
            }
            if let Err(e) = target.update_group(g).await {
                warn!(target = %key, error = %e, "group update failed, aborting target");
                details.push(DetailEntry {
                    target: key.clone(),
                    step: SyncStepKind::SyncGroup,
                    ok: false,
                    message: Some(e.to_string()),
                });
                step_ok = false;
                break 'groups;
            }
        }
    }
    if step_ok {
        details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncGroup,
            ok: true,
            message: None,
        });
    } else {
        return details;
    }

    // 3. hierarchy fix-up
    if let Err(e) = target.wrapping_up_after_group_sync(idp_group_child_ids).await {
        warn!(target = %key, error = %e, "group hierarchy fix-up failed, aborting target");
        details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncGroup,
            ok: false,
            message: Some(e.to_string()),
        });
        return details;
    }

    // 4. project creates
    let mut step_ok = true;
    for p in &state.project_diff.creates {
        if !dev_filters.keep_project(p) {
            continue;
        }
        if let Err(e) = target.create_project(p).await {
            warn!(target = %key, error = %e, "project create failed, aborting target");
            details.push(DetailEntry {
                target: key.clone(),
                step: SyncStepKind::SyncProject,
                ok: false,
                message: Some(e.to_string()),
            });
            step_ok = false;
            break;
        }
    }
    if !step_ok {
        return details;
    }

    // 5. project binding
    if let Err(e) = target.group_binding_projects(&source.projects).await {
        warn!(target = %key, error = %e, "project binding failed, aborting target");
        details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncProject,
            ok: false,
            message: Some(e.to_string()),
        });
        return details;
    }

    // 6. project updates
    for p in &state.project_diff.updates {
        if !dev_filters.keep_project(p) {
            continue;
        }
        if let Err(e) = target.update_project(p).await {
            warn!(target = %key, error = %e, "project update failed, aborting target");
            details.push(DetailEntry {
                target: key.clone(),
                step: SyncStepKind::SyncProject,
                ok: false,
                message: Some(e.to_string()),
            });
            return details;
        }
    }
    details.push(DetailEntry {
        target: key.clone(),
        step: SyncStepKind::SyncProject,
        ok: true,
        message: None,
    });

    // 7 + 8. member re-read and sync
    if let Err(e) = target.get_group_members().await {
        warn!(target = %key, error = %e, "group-member re-read failed, aborting target");
        details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncGroupMember,
            ok: false,
            message: Some(e.to_string()),
        });
        return details;
    }
    match target.sync_group_members(&source.users, &source.group_members).await {
        Ok(_) => details.push(DetailEntry {
            target: key.clone(),
            step: SyncStepKind::SyncGroupMember,
            ok: true,
            message: None,
        }),
        Err(e) => {
            warn!(target = %key, error = %e, "member sync failed");
            details.push(DetailEntry {
                target: key.clone(),
                step: SyncStepKind::SyncGroupMember,
                ok: false,
                message: Some(e.to_string()),
            });
        }
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupKind, Identity, ProjectNamespace};
    use crate::providers::memory::{MemorySource, MemoryTarget};
    use crate::setup::{ConfigurableSource, ConfigurableTarget};

    fn user(id: &str, name: &str) -> User {
        User {
            identity: Identity::new(id),
            name: name.to_string(),
            username: name.to_lowercase(),
            namespace_id: Identity::new(format!("{id}ns")),
            ..Default::default()
        }
    }

    fn group(id: &str) -> Group {
        Group {
            identity: Identity::new(id),
            name: id.to_string(),
            kind: GroupKind::Group,
            ..Default::default()
        }
    }

    fn project(id: &str, namespace: &str) -> Project {
        Project {
            identity: Identity::new(id),
            name: id.to_string(),
            namespace: ProjectNamespace {
                identity: Identity::new(namespace),
                kind: GroupKind::Group,
                parent_id: Identity::default(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn initial_sync_populates_empty_target() {
        let mut source = MemorySource::new(
            "gitlab",
            "",
            vec![user("u1", "Alice")],
            vec![group("g1")],
            vec![project("p1", "g1")],
            vec![GroupMember {
                user_id: Identity::new("u1"),
                group_id: Identity::new("g1"),
            }],
        );
        source.set_name("prod");

        let mut target = MemoryTarget::empty("artifactory");
        target.set_name("prod-artifactory");
        target.set_source("gitlab", "prod");

        let orchestrator = Orchestrator::new(Box::new(source), vec![Box::new(target)], DevFilters::default());
        let result = orchestrator.run(CancellationToken::new()).await;

        assert!(result.succeeded(), "{:?}", result.brief);
        let detail = &result.detail["artifactory/prod-artifactory"];
        assert!(detail.iter().all(|d| d.ok));
    }

    #[tokio::test]
    async fn empty_source_produces_zero_writes() {
        let mut source = MemorySource::empty("gitlab");
        source.set_name("prod");
        let mut target = MemoryTarget::empty("artifactory");
        target.set_name("prod-artifactory");
        target.set_source("gitlab", "prod");

        let orchestrator = Orchestrator::new(Box::new(source), vec![Box::new(target)], DevFilters::default());
        let result = orchestrator.run(CancellationToken::new()).await;
        assert!(result.succeeded());
    }

    #[tokio::test]
    async fn idempotent_second_run_has_no_failing_steps() {
        let mut source = MemorySource::new(
            "gitlab",
            "",
            vec![user("u1", "Alice")],
            vec![group("g1")],
            vec![],
            vec![GroupMember {
                user_id: Identity::new("u1"),
                group_id: Identity::new("g1"),
            }],
        );
        source.set_name("prod");
        let source = Box::new(source);

        let mut target = MemoryTarget::empty("artifactory");
        target.set_name("prod-artifactory");
        target.set_source("gitlab", "prod");
        let target: Box<dyn ConfigurableTarget> = Box::new(target);

        let orchestrator = Orchestrator::new(source, vec![target], DevFilters::default());
        let first = orchestrator.run(CancellationToken::new()).await;
        assert!(first.succeeded());
        let second = orchestrator.run(CancellationToken::new()).await;
        assert!(second.succeeded());
    }

    #[tokio::test]
    async fn dev_filter_suppresses_non_matching_user_creates() {
        let mut source = MemorySource::new(
            "gitlab",
            "",
            vec![user("u1", "Alice"), user("u2", "dev-Bob")],
            vec![],
            vec![],
            vec![],
        );
        source.set_name("prod");

        let mut target = MemoryTarget::empty("artifactory");
        target.set_name("prod-artifactory");
        target.set_source("gitlab", "prod");

        let dev_filters = DevFilters {
            username_contains: Some("dev-".to_string()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(Box::new(source), vec![Box::new(target)], dev_filters);
        let result = orchestrator.run(CancellationToken::new()).await;
        assert!(result.succeeded(), "{:?}", result.brief);

        let written = orchestrator.targets[0].get_users().await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].name, "dev-Bob");
    }
}
