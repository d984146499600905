//! Crate-wide error type for identisync-core.
//!
//! One flat, richly-fielded enum rather than a nested error type per
//! module, following the documented error taxonomy (ConfigError, ProviderError,
//! CredentialError, TransportError, RemoteError, ValidationError) one
//! variant group at a time.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // ---- ConfigError --------------------------------------------------
    #[error("sync config is missing a source/target application: {message}")]
    MissingApplication { message: String },

    #[error("unknown applicationRef group/version/kind: {group}/{version}/{kind}")]
    UnknownGvk {
        group: String,
        version: String,
        kind: String,
    },

    // ---- ProviderError --------------------------------------------------
    #[error("unsupported provider kind: {kind}")]
    UnsupportedProviderKind { kind: String },

    // ---- CredentialError ------------------------------------------------
    #[error("no credential for identity ({kind}, {name})")]
    UnknownCredentialIdentity { kind: String, name: String },

    // ---- TransportError -------------------------------------------------
    #[error("transport error talking to {provider}: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    // ---- RemoteError ------------------------------------------------
    #[error("{provider} returned {status}: {body}")]
    Remote {
        provider: String,
        status: u16,
        body: String,
    },

    // ---- ValidationError ------------------------------------------------
    #[error("identity did not parse as a KNRI where one was expected: {identity}")]
    UnparsableIdentity { identity: String },

    #[error("invalid entity: {message}")]
    Validation { message: String },

    // ---- ambient IO / serialization -------------------------------------
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Classifies the error for propagation purposes.
    /// Transport/remote 5xx/429 failures are transient; everything else
    /// (bad config, unknown identities, 4xx remote errors, validation) is
    /// terminal for the current attempt. The engine never retries within a
    /// run on this basis — retry only happens via the next reconciliation
    /// tick — but the classification still drives what gets logged as
    /// "will self-heal" versus "needs operator attention".
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { .. } => true,
            EngineError::Remote { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
