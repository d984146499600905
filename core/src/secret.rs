//! `SecretStore`: credential resolution abstraction consumed at
//! orchestrator construction. The core only depends on the
//! trait; `FileSecretStore` is the one concrete implementation this crate
//! ships.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, Result};

/// `(type, name)` pair a credential is looked up by — e.g. `("gitlab",
/// "prod")` for a source, or `("artifactory", "prod-artifactory")` for a
/// target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialIdentity {
    pub kind: String,
    pub name: String,
}

impl CredentialIdentity {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_token(&self, identity: &CredentialIdentity) -> Result<String>;
    async fn get_basic_auth(&self, identity: &CredentialIdentity) -> Result<(String, String)>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AuthenticationType {
    Token,
    BasicAuth,
}

#[derive(Debug, Deserialize)]
struct RawIdentity {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticationData {
    token: Option<String>,
    username: Option<String>,
    passwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialRecord {
    identity: RawIdentity,
    authentication_type: AuthenticationType,
    authentication_data: AuthenticationData,
}

/// Loads the credential-file JSON sequence once at construction
/// and indexes it in memory by `(authentication_type, identity)` — a
/// token credential and a basic-auth credential may coexist for the same
/// `(type, name)` identity, so both are kept under distinct buckets.
pub struct FileSecretStore {
    tokens: HashMap<CredentialIdentity, String>,
    basic_auth: HashMap<CredentialIdentity, (String, String)>,
}

impl FileSecretStore {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents, path)
    }

    fn from_json(contents: &str, path: &Path) -> Result<Self> {
        let records: Vec<CredentialRecord> = serde_json::from_str(contents).map_err(|source| EngineError::Json {
            path: path.display().to_string(),
            source,
        })?;

        let mut tokens = HashMap::new();
        let mut basic_auth = HashMap::new();
        for record in records {
            let id = CredentialIdentity::new(record.identity.kind, record.identity.name);
            match record.authentication_type {
                AuthenticationType::Token => {
                    if let Some(token) = record.authentication_data.token {
                        tokens.insert(id, token);
                    }
                }
                AuthenticationType::BasicAuth => {
                    if let (Some(user), Some(pass)) = (record.authentication_data.username, record.authentication_data.passwd) {
                        basic_auth.insert(id, (user, pass));
                    }
                }
            }
        }

        Ok(Self { tokens, basic_auth })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_token(&self, identity: &CredentialIdentity) -> Result<String> {
        self.tokens
            .get(identity)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCredentialIdentity {
                kind: identity.kind.clone(),
                name: identity.name.clone(),
            })
    }

    async fn get_basic_auth(&self, identity: &CredentialIdentity) -> Result<(String, String)> {
        self.basic_auth
            .get(identity)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCredentialIdentity {
                kind: identity.kind.clone(),
                name: identity.name.clone(),
            })
    }
}
