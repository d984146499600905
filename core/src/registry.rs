//! Provider registry: maps a `kind` string to a factory for source/target
//! providers. Populated once at process start by provider implementations
//! registering themselves; read-only thereafter — no reflection, no
//! global mutable state, just name-keyed boxed constructors over a
//! `HashMap<String, Fn>` of named capabilities.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::setup::{ConfigurableSource, ConfigurableTarget};

pub type SourceFactory = Arc<dyn Fn() -> Box<dyn ConfigurableSource> + Send + Sync>;
pub type TargetFactory = Arc<dyn Fn() -> Box<dyn ConfigurableTarget> + Send + Sync>;

/// Write-once provider registry. Built via [`RegistryBuilder`], then
/// shared read-only across every reconciliation tick.
pub struct Registry {
    sources: HashMap<String, SourceFactory>,
    targets: HashMap<String, TargetFactory>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Mint a fresh, zero-initialized source instance for `kind`. Callers
    /// apply setters (name, API URL, credentials) before first use.
    pub fn new_source(&self, kind: &str) -> Result<Box<dyn ConfigurableSource>> {
        self.sources
            .get(kind)
            .map(|f| f())
            .ok_or_else(|| EngineError::UnsupportedProviderKind { kind: kind.to_string() })
    }

    /// Mint a fresh, zero-initialized target instance for `kind`.
    pub fn new_target(&self, kind: &str) -> Result<Box<dyn ConfigurableTarget>> {
        self.targets
            .get(kind)
            .map(|f| f())
            .ok_or_else(|| EngineError::UnsupportedProviderKind { kind: kind.to_string() })
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    sources: HashMap<String, SourceFactory>,
    targets: HashMap<String, TargetFactory>,
}

impl RegistryBuilder {
    pub fn register_source(mut self, kind: impl Into<String>, factory: SourceFactory) -> Self {
        self.sources.insert(kind.into(), factory);
        self
    }

    pub fn register_target(mut self, kind: impl Into<String>, factory: TargetFactory) -> Self {
        self.targets.insert(kind.into(), factory);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            sources: self.sources,
            targets: self.targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::{MemorySource, MemoryTarget};

    #[test]
    fn unknown_kind_fails_with_unsupported_provider_kind() {
        let registry = Registry::builder().build();
        match registry.new_source("nonexistent") {
            Err(err) => assert!(matches!(err, EngineError::UnsupportedProviderKind { .. })),
            Ok(_) => panic!("expected UnsupportedProviderKind"),
        }
        match registry.new_target("nonexistent") {
            Err(err) => assert!(matches!(err, EngineError::UnsupportedProviderKind { .. })),
            Ok(_) => panic!("expected UnsupportedProviderKind"),
        }
    }

    #[test]
    fn registered_kind_mints_fresh_instances() {
        let registry = Registry::builder()
            .register_source("memory", Arc::new(|| Box::new(MemorySource::empty("memory")) as Box<dyn ConfigurableSource>))
            .register_target("memory", Arc::new(|| Box::new(MemoryTarget::empty("memory")) as Box<dyn ConfigurableTarget>))
            .build();

        let mut a = registry.new_source("memory").unwrap();
        let mut b = registry.new_source("memory").unwrap();
        a.set_name("alpha");
        b.set_name("beta");
        assert_eq!(a.kind(), "memory");
        assert_eq!(a.name(), "alpha");
        assert_eq!(b.name(), "beta");
    }
}
