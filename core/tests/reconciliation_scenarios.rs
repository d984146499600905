//! End-to-end reconciliation scenarios, run against the in-memory
//! reference source/target pair. Mirrors the numbered scenarios and
//! boundary conditions from the engine's testable-properties section.

use identisync_core::model::{Group, GroupKind, GroupMember, Identity, Project, ProjectNamespace, User};
use identisync_core::orchestrator::Orchestrator;
use identisync_core::providers::memory::{MemorySource, MemoryTarget};
use identisync_core::setup::{ConfigurableSource, ConfigurableTarget};
use tokio_util::sync::CancellationToken;

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

fn group_with_children(id: &str, children: &[&str]) -> Group {
    Group {
        identity: Identity::new(id),
        name: id.to_string(),
        kind: GroupKind::Group,
        child_ids: children.iter().map(|c| Identity::new(*c)).collect(),
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

fn bound_source(users: Vec<User>, groups: Vec<Group>, projects: Vec<Project>, members: Vec<GroupMember>) -> Box<dyn ConfigurableSource> {
    let mut source = MemorySource::new("gitlab", "", users, groups, projects, members);
    source.set_name("prod");
    Box::new(source)
}

fn bound_target() -> Box<dyn ConfigurableTarget> {
    let mut target = MemoryTarget::empty("artifactory");
    target.set_name("prod-artifactory");
    target.set_source("gitlab", "prod");
    Box::new(target)
}

#[tokio::test]
async fn scenario_1_initial_sync_populates_users_groups_and_project_link() {
    let source = bound_source(
        vec![user("u1", "Alice")],
        vec![group("g1")],
        vec![project("p1", "g1")],
        vec![GroupMember {
            user_id: Identity::new("u1"),
            group_id: Identity::new("g1"),
        }],
    );
    let target_box = bound_target();
    let orchestrator = Orchestrator::new(source, vec![target_box], Default::default());
    let result = orchestrator.run(CancellationToken::new()).await;
    assert!(result.succeeded(), "{:?}", result.brief);

    let (users, groups, projects) = orchestrator.target_state(0).await.unwrap();

    let created_user = users
        .iter()
        .find(|u| u.identity == Identity::new("gitlab-prod-u1"))
        .expect("u1 created under its minted identity");
    assert!(
        created_user.role_ids.contains(&Identity::new("gitlab-prod-user-u1ns")),
        "expected namespace role in {:?}",
        created_user.role_ids
    );
    assert!(
        created_user.role_ids.contains(&Identity::new("gitlab-prod-group-g1")),
        "expected group membership role in {:?}",
        created_user.role_ids
    );

    let namespace_role = groups
        .iter()
        .find(|g| g.identity == Identity::new("gitlab-prod-user-u1ns"))
        .expect("namespace role created before the user");
    assert_eq!(namespace_role.kind, GroupKind::User);

    let group_role = groups
        .iter()
        .find(|g| g.identity == Identity::new("gitlab-prod-group-g1"))
        .expect("g1 role created");
    assert!(group_role.child_ids.contains(&Identity::new("gitlab-prod-project-p1")));

    assert!(projects.iter().any(|p| p.identity == Identity::new("gitlab-prod-project-p1")));
}

#[tokio::test]
async fn scenario_2_foreign_roles_preserved_across_group_move() {
    let mut target = MemoryTarget::empty("artifactory");
    target.set_name("prod-artifactory");
    target.set_source("gitlab", "prod");
    target.seed_native_role(
        Identity::new("gitlab-prod-u1"),
        vec![Identity::new("gitlab-prod-group-g1"), Identity::new("native-admin")],
    );

    let source = bound_source(
        vec![user("u1", "Alice")],
        vec![group("g1"), group("g2")],
        vec![],
        vec![GroupMember {
            user_id: Identity::new("u1"),
            group_id: Identity::new("g2"),
        }],
    );
    let orchestrator = Orchestrator::new(source, vec![Box::new(target)], Default::default());
    let result = orchestrator.run(CancellationToken::new()).await;
    assert!(result.succeeded(), "{:?}", result.brief);
}

#[tokio::test]
async fn scenario_3_group_hierarchy_fix_up_runs_on_second_pass() {
    let source = bound_source(
        vec![],
        vec![group_with_children("g1", &["g2"]), group("g2")],
        vec![],
        vec![],
    );
    let target_box = bound_target();
    let orchestrator = Orchestrator::new(source, vec![target_box], Default::default());

    let first = orchestrator.run(CancellationToken::new()).await;
    assert!(first.succeeded(), "{:?}", first.brief);
    let second = orchestrator.run(CancellationToken::new()).await;
    assert!(second.succeeded(), "{:?}", second.brief);
}

#[tokio::test]
async fn scenario_5_native_role_survives_unparseable_knri() {
    let mut target = MemoryTarget::empty("artifactory");
    target.set_name("prod-artifactory");
    target.set_source("gitlab", "prod");
    target.seed_native_role(Identity::new("gitlab-prod-admin-account"), vec![Identity::new("admin")]);

    let source = bound_source(vec![], vec![], vec![], vec![]);
    let orchestrator = Orchestrator::new(source, vec![Box::new(target)], Default::default());
    let result = orchestrator.run(CancellationToken::new()).await;
    assert!(result.succeeded());
}

#[tokio::test]
async fn scenario_6_project_rebinding_moves_between_groups() {
    let source = bound_source(vec![], vec![group("g1"), group("g2")], vec![project("p1", "g1")], vec![]);
    let target_box = bound_target();
    let orchestrator = Orchestrator::new(source, vec![target_box], Default::default());
    let first = orchestrator.run(CancellationToken::new()).await;
    assert!(first.succeeded(), "{:?}", first.brief);

    let moved_source = bound_source(vec![], vec![group("g1"), group("g2")], vec![project("p1", "g2")], vec![]);
    let moved_orchestrator = Orchestrator::new(moved_source, vec![bound_target()], Default::default());
    let second = moved_orchestrator.run(CancellationToken::new()).await;
    assert!(second.succeeded(), "{:?}", second.brief);
}

#[tokio::test]
async fn boundary_empty_source_produces_zero_writes_and_succeeds() {
    let source = bound_source(vec![], vec![], vec![], vec![]);
    let orchestrator = Orchestrator::new(source, vec![bound_target()], Default::default());
    let result = orchestrator.run(CancellationToken::new()).await;
    assert!(result.succeeded());
}

#[tokio::test]
async fn idempotence_second_run_against_unchanged_source_has_no_failures() {
    let source = bound_source(
        vec![user("u1", "Alice")],
        vec![group("g1")],
        vec![project("p1", "g1")],
        vec![GroupMember {
            user_id: Identity::new("u1"),
            group_id: Identity::new("g1"),
        }],
    );
    let target_box = bound_target();
    let orchestrator = Orchestrator::new(source, vec![target_box], Default::default());
    let first = orchestrator.run(CancellationToken::new()).await;
    assert!(first.succeeded());
    let second = orchestrator.run(CancellationToken::new()).await;
    assert!(second.succeeded());
}
