//! HashiCorp Vault access.
//!
//! - [`trust`]: how the custom CA reaches the HTTP client
//! - [`session`]: login and token verification
//! - [`enumerator`]: KV v2 listing and per-secret reads

pub mod enumerator;
pub mod session;
pub mod trust;

pub use enumerator::{is_folder_key, SecretEnumerator};
pub use session::{AuthenticatedSession, Authenticator, SessionOptions};
pub use trust::TrustPolicy;
