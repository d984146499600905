//! `ConfigWatcher`: the declarative configuration store's delivery
//! contract. A lazy, at-least-once sequence of `SyncConfig`
//! change events; the reconciler loop is the only consumer.

use async_trait::async_trait;

use crate::config::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEventKind {
    Add,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ConfigEvent {
    pub kind: ConfigEventKind,
    pub object: SyncConfig,
}

/// Delivers `SyncConfig` change events. At-least-once: the reconciler must
/// tolerate seeing the same event key more than once, which it already
/// does by nature of being a reconciling loop rather than an edge-driven
/// one.
#[async_trait]
pub trait ConfigWatcher: Send + Sync {
    /// Block until the next event is available.
    async fn next(&mut self) -> Option<ConfigEvent>;
}
