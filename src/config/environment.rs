//! Environment Resolver
//!
//! Turns a snapshot of the process environment into a Vault endpoint, the CA
//! trust material and exactly one credential set. Resolution is a pure
//! function of the snapshot and never touches the network or the filesystem.
//!
//! # Environment Variables
//!
//! Always required:
//! - `VAULT_ADDR`: Vault base URL
//! - `VAULT_CACERT`: path of the CA bundle used to verify Vault
//!
//! Credential groups, checked in this order:
//! - Token: `VAULT_TOKEN`
//! - AppRole: `ANSIBLE_HASHI_VAULT_ROLE_ID`, `ANSIBLE_HASHI_VAULT_SECRET_ID`
//! - JWT: `ANSIBLE_HASHI_VAULT_JWT`, `ANSIBLE_HASHI_VAULT_JWT_ROLE`

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::secret::SecretString;
use crate::errors::{Error, Result};

pub const VAULT_ADDR: &str = "VAULT_ADDR";
pub const VAULT_CACERT: &str = "VAULT_CACERT";
pub const VAULT_TOKEN: &str = "VAULT_TOKEN";
pub const ROLE_ID: &str = "ANSIBLE_HASHI_VAULT_ROLE_ID";
pub const SECRET_ID: &str = "ANSIBLE_HASHI_VAULT_SECRET_ID";
pub const JWT: &str = "ANSIBLE_HASHI_VAULT_JWT";
pub const JWT_ROLE: &str = "ANSIBLE_HASHI_VAULT_JWT_ROLE";

/// Immutable copy of the environment variables relevant to a run.
///
/// Empty values are treated the same as unset ones.
#[derive(Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Look up a variable, ignoring empty values.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| Error::missing_env(name))
    }
}

// Values may hold credentials, so only names are shown.
impl std::fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSnapshot").field("vars", &self.vars.keys().collect::<Vec<_>>()).finish()
    }
}

/// The one credential set selected for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(SecretString),
    AppRole { role_id: String, secret_id: SecretString },
    Jwt { jwt: SecretString, role: String },
}

impl Credentials {
    /// Short name of the login flow, safe to log.
    pub fn method(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::AppRole { .. } => "approle",
            Credentials::Jwt { .. } => "jwt",
        }
    }
}

/// Fully resolved connection inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEnvironment {
    pub endpoint: String,
    pub ca_cert: PathBuf,
    pub credentials: Credentials,
}

/// Credential groups in precedence order. The first variable of each group
/// is its leading variable.
const CREDENTIAL_GROUPS: [&[&str]; 3] =
    [&[VAULT_TOKEN], &[ROLE_ID, SECRET_ID], &[JWT, JWT_ROLE]];

/// Pick the credential set from the snapshot.
///
/// The first complete group wins. When none is complete, the first group
/// whose leading variable is set names its missing variable; a stray
/// trailing variable on its own selects nothing.
pub fn select_credentials(env: &EnvSnapshot) -> Result<Credentials> {
    let complete =
        CREDENTIAL_GROUPS.iter().position(|group| group.iter().all(|name| env.contains(name)));

    match complete {
        Some(0) => Ok(Credentials::Token(env.require(VAULT_TOKEN)?.into())),
        Some(1) => {
            let role_id = env.require(ROLE_ID)?.to_string();
            let secret_id = env.require(SECRET_ID)?.into();
            Ok(Credentials::AppRole { role_id, secret_id })
        }
        Some(_) => {
            let jwt = env.require(JWT)?.into();
            let role = env.require(JWT_ROLE)?.to_string();
            Ok(Credentials::Jwt { jwt, role })
        }
        None => Err(CREDENTIAL_GROUPS
            .iter()
            .find(|group| env.contains(group[0]))
            .and_then(|group| group.iter().find(|name| !env.contains(name)))
            .map(|name| Error::missing_env(*name))
            .unwrap_or(Error::NoAuthenticationMethod)),
    }
}

/// Resolve endpoint, trust material and credentials, failing on the first
/// missing variable.
pub fn resolve(env: &EnvSnapshot) -> Result<VaultEnvironment> {
    let endpoint = env.require(VAULT_ADDR)?.trim_end_matches('/').to_string();
    let ca_cert = PathBuf::from(env.require(VAULT_CACERT)?);
    let credentials = select_credentials(env)?;

    tracing::debug!(
        endpoint = %endpoint,
        method = credentials.method(),
        "Resolved Vault environment"
    );

    Ok(VaultEnvironment { endpoint, ca_cert, credentials })
}
