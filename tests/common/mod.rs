//! Shared fixtures for integration tests
//!
//! Provides a wiremock-based stand-in for Vault (token, AppRole and JWT auth,
//! KV v2 list/read), an HTTPS front end for it, and throwaway CA material and
//! inventory files.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use vault_inventory::config::environment::EnvSnapshot;
use vault_inventory::InventoryConfig;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "s.test-token";
pub const MOUNT: &str = "secret";

/// Mock Vault server with helpers for the endpoints the inventory touches.
pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// `auth/token/lookup-self` succeeding for `token`.
    pub async fn accept_token(&self, token: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/auth/token/lookup-self"))
            .and(header("X-Vault-Token", token))
            .respond_with(ok(envelope(lookup_self_data(token), Value::Null)))
            .mount(&self.server)
            .await;
    }

    /// `auth/token/lookup-self` refusing every token.
    pub async fn reject_token(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/auth/token/lookup-self"))
            .respond_with(permission_denied())
            .mount(&self.server)
            .await;
    }

    /// AppRole login exchanging the given ids for `issued`.
    pub async fn approle_login(&self, role_id: &str, secret_id: &str, issued: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(body_partial_json(json!({ "role_id": role_id, "secret_id": secret_id })))
            .respond_with(ok(envelope(Value::Null, auth_info(issued))))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// JWT login against `mount` exchanging `jwt`/`role` for `issued`.
    pub async fn jwt_login(&self, mount: &str, jwt: &str, role: &str, issued: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/auth/{}/login", mount)))
            .and(body_partial_json(json!({ "jwt": jwt, "role": role })))
            .respond_with(ok(envelope(Value::Null, auth_info(issued))))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Any login on `auth/<mount>/login` refused.
    pub async fn reject_login(&self, mount: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/auth/{}/login", mount)))
            .respond_with(permission_denied())
            .mount(&self.server)
            .await;
    }

    /// Listing of `<mount>/metadata/<secret_path>`.
    pub async fn list(&self, secret_path: &str, keys: &[&str]) {
        // vaultrs issues LIST; match on path only.
        Mock::given(path(format!("/v1/{}/metadata/{}", MOUNT, secret_path)))
            .respond_with(ok(envelope(json!({ "keys": keys }), Value::Null)))
            .mount(&self.server)
            .await;
    }

    /// Listing of `<mount>/metadata/<secret_path>` answered with `status`.
    pub async fn fail_list(&self, secret_path: &str, status: u16) {
        Mock::given(path(format!("/v1/{}/metadata/{}", MOUNT, secret_path)))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "errors": [] })))
            .mount(&self.server)
            .await;
    }

    /// Latest version of `<secret_path>/<key>`.
    pub async fn secret(&self, secret_path: &str, key: &str, data: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}/data/{}/{}", MOUNT, secret_path, key)))
            .respond_with(ok(envelope(
                json!({
                    "data": data,
                    "metadata": {
                        "created_time": "2024-01-01T00:00:00.000000Z",
                        "custom_metadata": null,
                        "deletion_time": "",
                        "destroyed": false,
                        "version": 1
                    }
                }),
                Value::Null,
            )))
            .mount(&self.server)
            .await;
    }

    /// Read of `<secret_path>/<key>` refused.
    pub async fn deny_secret(&self, secret_path: &str, key: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}/data/{}/{}", MOUNT, secret_path, key)))
            .respond_with(permission_denied())
            .mount(&self.server)
            .await;
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn permission_denied() -> ResponseTemplate {
    ResponseTemplate::new(403).set_body_json(json!({ "errors": ["permission denied"] }))
}

fn envelope(data: Value, auth: Value) -> Value {
    json!({
        "request_id": "8d3f0f4e-0000-0000-0000-000000000000",
        "lease_id": "",
        "lease_duration": 0,
        "renewable": false,
        "data": data,
        "wrap_info": null,
        "warnings": null,
        "auth": auth
    })
}

fn auth_info(client_token: &str) -> Value {
    json!({
        "client_token": client_token,
        "accessor": "accessor-1",
        "policies": ["default", "inventory"],
        "token_policies": ["default", "inventory"],
        "metadata": {},
        "lease_duration": 3600,
        "renewable": true,
        "entity_id": "entity-1",
        "token_type": "service",
        "orphan": true
    })
}

fn lookup_self_data(token: &str) -> Value {
    json!({
        "accessor": "accessor-1",
        "creation_time": 1_700_000_000u64,
        "creation_ttl": 3600,
        "display_name": "token",
        "entity_id": "entity-1",
        "expire_time": "2030-01-01T00:00:00Z",
        "explicit_max_ttl": 0,
        "id": token,
        "identity_policies": [],
        "issue_time": "2024-01-01T00:00:00Z",
        "meta": {},
        "num_uses": 0,
        "orphan": true,
        "path": "auth/token/create",
        "policies": ["default", "inventory"],
        "renewable": true,
        "ttl": 3600,
        "type": "service"
    })
}

/// Certificate authority able to issue server certificates.
pub struct TestCa {
    cert: rcgen::Certificate,
    key: rcgen::KeyPair,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params.distinguished_name.push(rcgen::DnType::CommonName, name);
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Server certificate valid for `localhost` and 127.0.0.1.
    pub fn issue_localhost(&self) -> (CertificateDer<'static>, PrivateKeyDer<'static>) {
        let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.distinguished_name.push(rcgen::DnType::CommonName, "vault.test");
        params.subject_alt_names.push(rcgen::SanType::IpAddress(Ipv4Addr::LOCALHOST.into()));

        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (cert.der().clone(), PrivatePkcs8KeyDer::from(key.serialize_der()).into())
    }
}

/// HTTPS listener terminating TLS in front of a [`MockVault`].
pub struct TlsFrontEnd {
    address: SocketAddr,
    task: JoinHandle<()>,
}

impl TlsFrontEnd {
    pub async fn start(ca: &TestCa, vault: &MockVault) -> Self {
        let (cert, key) = ca.issue_localhost();
        let provider = rustls::crypto::ring::default_provider();
        let server_config = rustls::ServerConfig::builder_with_provider(provider.into())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(server_config));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let address = listener.local_addr().unwrap();
        let backend = *vault.server.address();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // Clients without the CA abort the handshake.
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    if let Ok(mut upstream) = TcpStream::connect(backend).await {
                        let _ = tokio::io::copy_bidirectional(&mut tls, &mut upstream).await;
                    }
                });
            }
        });

        Self { address, task }
    }

    pub fn uri(&self) -> String {
        format!("https://{}", self.address)
    }
}

impl Drop for TlsFrontEnd {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Temporary directory holding a freshly minted CA certificate.
pub struct Fixture {
    pub dir: TempDir,
    pub ca: TestCa,
    pub ca_cert: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new("Inventory Test CA");
        let ca_cert = dir.path().join("vault-ca.pem");
        std::fs::write(&ca_cert, ca.pem()).unwrap();
        Self { dir, ca, ca_cert }
    }

    /// Write an inventory file and return its path.
    pub fn inventory_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Environment with the endpoint and CA set, plus `extra`.
    pub fn env(&self, address: &str, extra: &[(&str, &str)]) -> EnvSnapshot {
        self.env_with_ca(address, &self.ca_cert, extra)
    }

    /// Like [`Fixture::env`] with a different CA file.
    pub fn env_with_ca(
        &self,
        address: &str,
        ca_cert: &Path,
        extra: &[(&str, &str)],
    ) -> EnvSnapshot {
        let mut pairs = vec![
            ("VAULT_ADDR".to_string(), address.to_string()),
            ("VAULT_CACERT".to_string(), ca_cert.display().to_string()),
        ];
        pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        EnvSnapshot::from_pairs(pairs)
    }
}

pub fn config(secret_path: &str) -> InventoryConfig {
    InventoryConfig::from_yaml_str(&format!(
        "plugin: inventory_vault\nvault_secret_path: {}\nvault_mount_point: {}\nvault_timeout: 5\n",
        secret_path, MOUNT
    ))
    .unwrap()
}

/// `append_bundle` configuration for `secret_path` writing to `bundle`.
pub fn append_bundle_config(
    secret_path: &str,
    bundle: &Path,
    timeout_secs: u64,
) -> InventoryConfig {
    InventoryConfig::from_yaml_str(&format!(
        "vault_secret_path: {}\n\
         vault_mount_point: {}\n\
         vault_trust_policy: append_bundle\n\
         vault_trust_bundle: {}\n\
         vault_timeout: {}\n",
        secret_path,
        MOUNT,
        bundle.display(),
        timeout_secs
    ))
    .unwrap()
}

/// Use ring for every TLS client built in the test binary.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
