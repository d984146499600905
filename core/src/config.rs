//! `SyncConfig` schema and related external-interface types.
//! These are plain data; resolving them into live provider instances is
//! the reconciler's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    pub namespace: String,
    pub name: String,
}

impl ConfigKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfigMetadata {
    pub name: String,
    pub namespace: String,
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// `applicationRef`: indirect reference to a provider record by GVK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRef {
    pub name: String,
    pub namespace: String,
    pub group: String,
    pub version: String,
    pub kind: String,
}

/// `applicationSpec`: direct inline application binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    pub api_server_url: String,
    pub provider_type: String,
}

/// One source or target binding. `application_spec` takes precedence over
/// `application_ref` when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Application {
    pub application_ref: Option<ApplicationRef>,
    pub application_spec: Option<ApplicationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfigSpec {
    pub source: Application,
    pub targets: Vec<Application>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    pub kind: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfigStatus {
    pub conditions: Vec<Condition>,
    pub target_status: std::collections::HashMap<String, Vec<Condition>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub metadata: SyncConfigMetadata,
    pub spec: SyncConfigSpec,
    #[serde(default)]
    pub status: SyncConfigStatus,
}

impl SyncConfig {
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(self.metadata.namespace.clone(), self.metadata.name.clone())
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

/// A resolved `(apiServerUrl, providerType)` pair, as returned either
/// directly from an `ApplicationSpec` or indirectly through a
/// `ReferenceResource` lookup of a provider record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApplication {
    pub name: String,
    pub api_server_url: String,
    pub provider_type: String,
}

/// `CodeRepoProvider { spec: { url, apiserver, providertype } }` and
/// `ArtifactRepoProvider { spec: { url, apiserver, providertype } }` share
/// this shape; the distinguishing factor is the `kind` segment
/// of the `ApplicationRef` GVK that named the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecordSpec {
    pub url: String,
    pub apiserver: String,
    pub providertype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub spec: ProviderRecordSpec,
}
