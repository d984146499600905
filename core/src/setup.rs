//! Setup surface a reconciler uses to bind a freshly-minted provider
//! instance before first use (`SetName`, `SetApiServerUrl`,
//! `SetSecretStore`, and for targets `SetSource`). Kept separate from
//! [`crate::source::SourceProvider`]/[`crate::target::TargetProvider`]
//! themselves since those capability sets are read/write-only — binding is
//! a registry-time concern, not something a diff or write call needs.

use std::sync::Arc;

use crate::secret::SecretStore;
use crate::source::SourceProvider;
use crate::target::TargetProvider;

pub trait ConfigurableSource: SourceProvider {
    fn set_name(&mut self, name: &str);
    fn set_api_server_url(&mut self, url: &str);
    fn set_secret_store(&mut self, store: Arc<dyn SecretStore>);
}

pub trait ConfigurableTarget: TargetProvider {
    fn set_name(&mut self, name: &str);
    fn set_api_server_url(&mut self, url: &str);
    fn set_secret_store(&mut self, store: Arc<dyn SecretStore>);
    /// Bind the source this target projects from; every KNRI the target
    /// mints afterward uses this `(kind, name)` pair.
    fn set_source(&mut self, source_kind: &str, source_name: &str);
}
