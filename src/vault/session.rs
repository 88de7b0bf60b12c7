//! Authenticator
//!
//! Builds a `vaultrs` client bound to the resolved endpoint, runs the login
//! flow for the selected credentials and confirms the resulting token with
//! `auth/token/lookup-self`.
//!
//! Failures are split in two: Vault answering with a refusal (HTTP 400, 401
//! or 403) is [`Error::AuthenticationRejected`]; anything else, including
//! transport errors and timeouts, is [`Error::AuthenticationUnreachable`].

use std::time::Duration;

use tracing::{debug, info};
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;

use super::trust::{self, TrustPolicy};
use crate::config::environment::EnvSnapshot;
use crate::config::{Credentials, InventoryConfig, VaultEnvironment};
use crate::errors::{Error, Result};

/// Per-run client settings that do not come from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Bound applied to every request
    pub timeout: Duration,
    /// Vault Enterprise namespace
    pub namespace: Option<String>,
    /// Mount of the AppRole auth method
    pub approle_mount: String,
    /// Mount of the JWT auth method
    pub jwt_mount: String,
    pub trust: TrustPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            namespace: None,
            approle_mount: "approle".to_string(),
            jwt_mount: "jwt".to_string(),
            trust: TrustPolicy::Attach,
        }
    }
}

impl SessionOptions {
    /// Options taken from the inventory file.
    pub fn from_config(config: &InventoryConfig, env: &EnvSnapshot) -> Result<Self> {
        Ok(Self {
            timeout: config.timeout,
            namespace: config.namespace.clone(),
            approle_mount: config.approle_mount.clone(),
            jwt_mount: config.jwt_mount.clone(),
            trust: config.trust_policy(env)?,
        })
    }
}

/// A Vault client holding a verified token.
pub struct AuthenticatedSession {
    client: VaultClient,
    endpoint: String,
}

impl std::fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("endpoint", &self.endpoint)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl AuthenticatedSession {
    pub fn client(&self) -> &VaultClient {
        &self.client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Establishes an [`AuthenticatedSession`] from resolved inputs.
#[derive(Debug)]
pub struct Authenticator {
    environment: VaultEnvironment,
    options: SessionOptions,
}

impl Authenticator {
    pub fn new(environment: VaultEnvironment, options: SessionOptions) -> Self {
        Self { environment, options }
    }

    /// Log in and verify the session.
    ///
    /// # Errors
    ///
    /// - [`Error::TrustMaterial`] if the CA file is unusable
    /// - [`Error::AuthenticationUnreachable`] if Vault cannot be reached
    /// - [`Error::AuthenticationRejected`] if Vault refuses the credentials or
    ///   the token does not verify
    pub async fn authenticate(&self) -> Result<AuthenticatedSession> {
        let env = &self.environment;
        let ca_certs = trust::prepare_trust(
            &env.endpoint,
            &env.ca_cert,
            &self.options.trust,
            self.options.timeout,
        )
        .await?;

        let mut client = self.build_client(ca_certs)?;

        match &env.credentials {
            Credentials::Token(_) => {}
            Credentials::AppRole { role_id, secret_id } => {
                let auth = vaultrs::auth::approle::login(
                    &client,
                    &self.options.approle_mount,
                    role_id,
                    secret_id.expose_secret(),
                )
                .await
                .map_err(|e| classify("AppRole login", e))?;
                client.set_token(&auth.client_token);
            }
            Credentials::Jwt { jwt, role } => {
                let auth = vaultrs::auth::oidc::login(
                    &client,
                    &self.options.jwt_mount,
                    jwt.expose_secret(),
                    Some(role.clone()),
                )
                .await
                .map_err(|e| classify("JWT login", e))?;
                client.set_token(&auth.client_token);
            }
        }

        vaultrs::token::lookup_self(&client).await.map_err(|e| classify("token verification", e))?;

        info!(
            address = %env.endpoint,
            method = env.credentials.method(),
            "Authenticated to Vault"
        );

        Ok(AuthenticatedSession { client, endpoint: env.endpoint.clone() })
    }

    fn build_client(&self, ca_certs: Vec<String>) -> Result<VaultClient> {
        let env = &self.environment;
        let token = match &env.credentials {
            Credentials::Token(token) => token.expose_secret().to_string(),
            // Set explicitly so the builder does not fall back to VAULT_TOKEN.
            _ => String::new(),
        };

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder
            .address(&env.endpoint)
            .token(token)
            .ca_certs(ca_certs)
            .timeout(Some(self.options.timeout))
            .namespace(self.options.namespace.clone());

        let settings = settings_builder
            .build()
            .map_err(|e| Error::config(format!("Invalid Vault client settings: {}", e)))?;

        debug!(
            address = %env.endpoint,
            timeout_secs = self.options.timeout.as_secs(),
            "Building Vault client"
        );

        // Construction only fails on CA/identity loading or TLS backend setup.
        VaultClient::new(settings)
            .map_err(|e| Error::trust(format!("Failed to create Vault client: {}", e)))
    }
}

/// Map a `vaultrs` error from the authentication stage onto the taxonomy.
pub(crate) fn classify(stage: &str, err: ClientError) -> Error {
    match err {
        ClientError::APIError { code, errors } if matches!(code, 400 | 401 | 403) => {
            Error::rejected(format!("{} refused (HTTP {}): {}", stage, code, errors.join("; ")))
        }
        other => Error::unreachable(format!("{} failed: {}", stage, other)),
    }
}
