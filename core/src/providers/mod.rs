//! Concrete provider implementations shipped by this crate. Production
//! deployments register their own `SourceProvider`/`TargetProvider`
//! implementations with the [`crate::registry::Registry`]; `memory` is the
//! only one this crate ships, used by the integration test suite.

pub mod memory;
