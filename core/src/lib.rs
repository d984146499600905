//! Reconciling synchronization engine core: projects a source identity
//! provider's user/group/project graph onto one or more target
//! applications. See module docs for the reconciliation loop
//! ([`reconciler`]), the per-run orchestrator ([`orchestrator`]), the
//! entity model and namespacing scheme ([`model`]), and the provider
//! capability traits ([`source`], [`target`]).

pub mod config;
pub mod devfilter;
pub mod engine_config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod providers;
pub mod reconciler;
pub mod reference;
pub mod registry;
pub mod secret;
pub mod setup;
pub mod source;
pub mod target;
pub mod watcher;

pub use error::{EngineError, Result};
pub use orchestrator::{Orchestrator, SyncLogicResult};
pub use reconciler::Reconciler;
pub use registry::Registry;
