//! `ReferenceResource`: resolves a provider record named by an
//! `ApplicationRef` GVK lookup.

use async_trait::async_trait;

use crate::config::ResolvedApplication;
use crate::error::Result;

#[async_trait]
pub trait ReferenceResource: Send + Sync {
    async fn get(&self, name: &str, namespace: &str) -> Result<ResolvedApplication>;
}
