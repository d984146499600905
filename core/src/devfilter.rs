//! Optional dev-environment filters applied before every write.
//! When the corresponding environment variable is set, only entities whose
//! `name` contains the given substring are written; unset means no
//! filtering for that entity kind.

use crate::model::{Group, Project, User};

#[derive(Debug, Clone, Default)]
pub struct DevFilters {
    pub username_contains: Option<String>,
    pub groupname_contains: Option<String>,
    pub projectname_contains: Option<String>,
}

impl DevFilters {
    /// Read `DEV_USERNAME_PREFIX`, `DEV_GROUPNAME_PREFIX`,
    /// `DEV_PROJECTNAME_PREFIX` from the process environment.
    pub fn from_env() -> Self {
        Self {
            username_contains: std::env::var("DEV_USERNAME_PREFIX").ok(),
            groupname_contains: std::env::var("DEV_GROUPNAME_PREFIX").ok(),
            projectname_contains: std::env::var("DEV_PROJECTNAME_PREFIX").ok(),
        }
    }

    pub fn keep_user(&self, user: &User) -> bool {
        match &self.username_contains {
            Some(needle) => user.name.contains(needle.as_str()),
            None => true,
        }
    }

    pub fn keep_group(&self, group: &Group) -> bool {
        match &self.groupname_contains {
            Some(needle) => group.name.contains(needle.as_str()),
            None => true,
        }
    }

    pub fn keep_project(&self, project: &Project) -> bool {
        match &self.projectname_contains {
            Some(needle) => project.name.contains(needle.as_str()),
            None => true,
        }
    }
}
