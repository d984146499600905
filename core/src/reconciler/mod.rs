//! Reconciler loop: consumes `ConfigWatcher` events, resolves
//! source/target bindings, instantiates providers via the registry, runs
//! the orchestrator, and always requeues after a fixed delay.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Application, ApplicationRef, ConfigKey, ResolvedApplication, SyncConfig};
use crate::engine_config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::orchestrator::{Orchestrator, SyncLogicResult};
use crate::reference::ReferenceResource;
use crate::registry::Registry;
use crate::secret::{CredentialIdentity, SecretStore};
use crate::setup::{ConfigurableSource, ConfigurableTarget};
use crate::watcher::{ConfigEvent, ConfigEventKind, ConfigWatcher};

/// GVK the fixed set of provider records this engine knows how to resolve
/// an `applicationRef` against — mirrors the record shapes `ProviderRecord`
/// models (`CodeRepoProvider`, `ArtifactRepoProvider`).
const PROVIDER_RECORD_GROUP: &str = "sync.identisync.io";
const PROVIDER_RECORD_VERSION: &str = "v1alpha1";
const KNOWN_PROVIDER_RECORD_KINDS: [&str; 2] = ["CodeRepoProvider", "ArtifactRepoProvider"];

/// Reject an `applicationRef` whose GVK doesn't name one of the known
/// provider records, before ever calling out to a `ReferenceResource`.
fn check_known_gvk(reference_spec: &ApplicationRef) -> Result<()> {
    let recognized = reference_spec.group == PROVIDER_RECORD_GROUP
        && reference_spec.version == PROVIDER_RECORD_VERSION
        && KNOWN_PROVIDER_RECORD_KINDS.contains(&reference_spec.kind.as_str());
    if recognized {
        Ok(())
    } else {
        Err(EngineError::UnknownGvk {
            group: reference_spec.group.clone(),
            version: reference_spec.version.clone(),
            kind: reference_spec.kind.clone(),
        })
    }
}

/// Resolves an `Application` binding to a concrete `(name, apiServerUrl,
/// providerType)` triple, following `applicationSpec` over `applicationRef`
///.
pub async fn resolve_application(app: &Application, reference: &dyn ReferenceResource) -> Result<ResolvedApplication> {
    if let Some(spec) = &app.application_spec {
        return Ok(ResolvedApplication {
            name: spec.name.clone(),
            api_server_url: spec.api_server_url.clone(),
            provider_type: spec.provider_type.clone(),
        });
    }
    if let Some(reference_spec) = &app.application_ref {
        check_known_gvk(reference_spec)?;
        return reference.get(&reference_spec.name, &reference_spec.namespace).await;
    }
    Err(EngineError::Validation {
        message: "application has neither applicationSpec nor applicationRef".to_string(),
    })
}

/// Drives one `ConfigWatcher` to completion, serializing reconciliation
/// ticks per `(namespace, name)` key and always requeuing after
/// `engine_config.requeue_interval` regardless of outcome.
pub struct Reconciler {
    registry: Arc<Registry>,
    reference: Arc<dyn ReferenceResource>,
    secrets: Arc<dyn SecretStore>,
    engine_config: EngineConfig,
    locks: Mutex<HashMap<ConfigKey, Arc<Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(registry: Arc<Registry>, reference: Arc<dyn ReferenceResource>, secrets: Arc<dyn SecretStore>, engine_config: EngineConfig) -> Self {
        Self {
            registry,
            reference,
            secrets,
            engine_config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Consume `watcher` until it yields no further events, spawning a
    /// reconciliation for every `Add`/`Update` event and a clear-data run
    /// for every `Delete`. Returns once the watcher is exhausted.
    pub async fn run(&self, mut watcher: Box<dyn ConfigWatcher>, cancel: CancellationToken) {
        while let Some(event) = watcher.next().await {
            if cancel.is_cancelled() {
                info!("reconciler cancelled, stopping before next event");
                return;
            }
            self.handle_event(event, &cancel).await;
        }
    }

    async fn key_lock(&self, key: &ConfigKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn handle_event(&self, event: ConfigEvent, cancel: &CancellationToken) {
        let key = event.object.key();
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let outcome = self.reconcile_once(&event.object, event.kind, cancel).await;
        match outcome {
            Ok(result) => {
                if result.succeeded() {
                    info!(namespace = %key.namespace, name = %key.name, "reconciliation succeeded");
                } else {
                    warn!(namespace = %key.namespace, name = %key.name, failed_targets = ?result.failed_targets(), "reconciliation completed with failures");
                }
            }
            Err(e) => {
                error!(namespace = %key.namespace, name = %key.name, error = %e, "reconciliation aborted");
            }
        }

        tokio::time::sleep(self.engine_config.requeue_interval).await;
    }

    async fn reconcile_once(&self, config: &SyncConfig, kind: ConfigEventKind, cancel: &CancellationToken) -> Result<SyncLogicResult> {
        let source_app = resolve_application(&config.spec.source, self.reference.as_ref()).await?;
        let mut targets_app = Vec::with_capacity(config.spec.targets.len());
        for t in &config.spec.targets {
            targets_app.push(resolve_application(t, self.reference.as_ref()).await?);
        }

        let mut source = self.registry.new_source(&source_app.provider_type)?;
        source.set_name(&source_app.name);
        source.set_api_server_url(&source_app.api_server_url);
        source.set_secret_store(Arc::clone(&self.secrets));

        let mut targets: Vec<Box<dyn ConfigurableTarget>> = Vec::with_capacity(targets_app.len());
        for target_app in &targets_app {
            let mut target = self.registry.new_target(&target_app.provider_type)?;
            target.set_name(&target_app.name);
            target.set_api_server_url(&target_app.api_server_url);
            target.set_secret_store(Arc::clone(&self.secrets));
            target.set_source(source.kind(), source.name());
            targets.push(target);
        }

        let orchestrator = Orchestrator::new(source, targets, self.engine_config.dev_filters.clone());
        if kind == ConfigEventKind::Delete || config.is_being_deleted() {
            return Ok(orchestrator.clear_target_app_data().await);
        }
        Ok(orchestrator.run(cancel.clone()).await)
    }
}
