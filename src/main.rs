//! `identisync` — reconciling synchronization engine binary entry point.
//!
//! This binary wires the ambient runtime (tracing) and the engine's own
//! configuration, then hands off to a [`identisync_core::Reconciler`]. A
//! concrete deployment supplies its own `ConfigWatcher`, `SecretStore`,
//! `ReferenceResource`, and `SourceProvider`/`TargetProvider`
//! registrations — those are external collaborators this crate only
//! defines contracts for, not CLI flags or a config file format.

use std::sync::Arc;

use anyhow::Result;
use identisync_core::engine_config::EngineConfig;
use identisync_core::registry::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let engine_config = EngineConfig::default();
    let _registry: Arc<Registry> = Arc::new(Registry::builder().build());

    tracing::info!(
        requeue_interval_secs = engine_config.requeue_interval.as_secs(),
        "identisync starting with no providers registered; link a deployment crate that registers SourceProvider/TargetProvider implementations and supplies a ConfigWatcher"
    );

    Ok(())
}
