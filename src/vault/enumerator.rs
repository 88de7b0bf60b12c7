//! Secret Enumerator
//!
//! Lists the immediate children of a KV v2 path and reads the latest version
//! of every leaf secret, one at a time, as a lazy stream. Folder keys are
//! skipped, never descended into.

use std::collections::BTreeMap;

use futures::Stream;
use tracing::debug;
use vaultrs::kv2;

use super::session::AuthenticatedSession;
use crate::errors::{Error, Result};
use crate::inventory::SecretEntry;

/// Keys containing a path separator name sub-folders, not secrets.
pub fn is_folder_key(key: &str) -> bool {
    key.contains('/')
}

/// Streams [`SecretEntry`] values for one path of a KV v2 mount.
#[derive(Debug)]
pub struct SecretEnumerator<'a> {
    session: &'a AuthenticatedSession,
    mount: &'a str,
    path: &'a str,
}

impl<'a> SecretEnumerator<'a> {
    pub fn new(session: &'a AuthenticatedSession, mount: &'a str, path: &'a str) -> Self {
        Self { session, mount, path }
    }

    /// Lazily list and fetch the secrets under the path.
    ///
    /// The listing happens when the stream is first polled. A failed listing
    /// yields [`Error::SecretListingFailed`] before any entry; a failed read
    /// yields [`Error::SecretFetchFailed`] and ends the stream. Entries come
    /// out in listing order.
    pub fn entries(&self) -> impl Stream<Item = Result<SecretEntry>> + 'a {
        let session: &'a AuthenticatedSession = self.session;
        let client = session.client();
        let endpoint = session.endpoint();
        let mount = self.mount;
        let path = self.path;

        async_stream::try_stream! {
            let keys: Vec<String> = kv2::list(client, mount, path).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    endpoint = %endpoint,
                    mount = %mount,
                    path = %path,
                    "Failed to list secrets from Vault"
                );
                Error::listing_failed(path, e.to_string())
            })?;

            debug!(
                endpoint = %endpoint,
                mount = %mount,
                path = %path,
                keys = keys.len(),
                "Listed secrets"
            );

            for key in keys {
                if is_folder_key(&key) {
                    debug!(key = %key, "Skipping folder key");
                    continue;
                }

                let secret_path = format!("{}/{}", path, key);
                let variables: BTreeMap<String, serde_json::Value> =
                    kv2::read(client, mount, &secret_path).await.map_err(|e| {
                        tracing::error!(
                            error = %e,
                            host = %key,
                            "Failed to read secret from Vault"
                        );
                        Error::fetch_failed(key.as_str(), e.to_string())
                    })?;

                yield SecretEntry { host_name: key, variables };
            }
        }
    }
}
