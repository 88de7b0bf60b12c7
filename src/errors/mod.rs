//! # Error Handling
//!
//! Every failure in an inventory run is fatal and surfaces to the host as one
//! of these variants. Messages name the first violated precondition or the
//! first failing remote call.

/// Custom result type for inventory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Vault inventory source
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required environment variable is unset or empty
    #[error("Please ensure {0} is set in your environment")]
    MissingEnvironmentVariable(String),

    /// None of the credential variable groups is present
    #[error(
        "No Vault authentication method configured: set VAULT_TOKEN, \
         ANSIBLE_HASHI_VAULT_ROLE_ID and ANSIBLE_HASHI_VAULT_SECRET_ID, \
         or ANSIBLE_HASHI_VAULT_JWT and ANSIBLE_HASHI_VAULT_JWT_ROLE"
    )]
    NoAuthenticationMethod,

    /// A required key is absent from the inventory file
    #[error("Please ensure '{0}' is set in your inventory file")]
    MissingConfigurationKey(String),

    /// The inventory file is malformed or holds an invalid value
    #[error("Invalid inventory configuration: {0}")]
    InvalidConfiguration(String),

    /// The CA certificate or trust bundle could not be used
    #[error("Trust material error: {0}")]
    TrustMaterial(String),

    /// Vault could not be reached during authentication
    #[error("Unable to reach the Vault service: {0}")]
    AuthenticationUnreachable(String),

    /// Vault answered but refused the credentials
    #[error("Unable to authenticate to the Vault service: {0}")]
    AuthenticationRejected(String),

    /// The top-level secret listing failed
    #[error("Failed to list secrets under '{path}': {reason}")]
    SecretListingFailed { path: String, reason: String },

    /// Reading a single host's secret failed
    #[error("Failed to read secret for host '{host}': {reason}")]
    SecretFetchFailed { host: String, reason: String },

    /// A graph mutation referenced a host that was never added
    #[error("Unknown host '{0}' in inventory")]
    UnknownHost(String),

    /// A graph mutation referenced a group that was never added
    #[error("Unknown group '{0}' in inventory")]
    UnknownGroup(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a missing environment variable error
    pub fn missing_env<S: Into<String>>(name: S) -> Self {
        Self::MissingEnvironmentVariable(name.into())
    }

    /// Create a missing configuration key error
    pub fn missing_key<S: Into<String>>(name: S) -> Self {
        Self::MissingConfigurationKey(name.into())
    }

    /// Create an invalid configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a trust material error
    pub fn trust<S: Into<String>>(message: S) -> Self {
        Self::TrustMaterial(message.into())
    }

    /// Create an authentication unreachable error
    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::AuthenticationUnreachable(message.into())
    }

    /// Create an authentication rejected error
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::AuthenticationRejected(message.into())
    }

    /// Create a secret listing error
    pub fn listing_failed<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::SecretListingFailed { path: path.into(), reason: reason.into() }
    }

    /// Create a secret fetch error
    pub fn fetch_failed<H: Into<String>, R: Into<String>>(host: H, reason: R) -> Self {
        Self::SecretFetchFailed { host: host.into(), reason: reason.into() }
    }
}
