//! Trust material for the Vault TLS connection.
//!
//! The default policy attaches the custom CA to the session's own HTTP
//! client and leaves every shared trust store alone. The bundle-append policy
//! exists for deployments that relied on the CA being added to a shared
//! bundle file; it is opt-in, logs a warning, and never appends the same CA
//! twice.

use std::error::Error as StdError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rustls::pki_types::{pem::PemObject, CertificateDer};
use rustls::{CertificateError, RootCertStore};
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};

/// How the custom CA is made available to the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Pass the CA path to this session's client only
    #[default]
    Attach,
    /// Append the CA to a shared bundle file when Vault's chain turns out
    /// not to be trusted by the default roots, then trust that bundle
    AppendToBundle { bundle: PathBuf },
}

/// How the default roots judge the endpoint's certificate chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointTrust {
    /// The TLS handshake succeeded with the default roots
    Trusted,
    /// The handshake failed because the server chain is not trusted
    UntrustedCertificate,
}

/// CA file contents: the raw PEM and the certificates it holds.
#[derive(Debug, Clone)]
pub struct CaMaterial {
    pub pem: Vec<u8>,
    pub certificates: Vec<CertificateDer<'static>>,
}

/// Read the CA file and parse every certificate in it.
///
/// Fails on unreadable files, malformed PEM, files without certificates and
/// certificates that cannot serve as trust anchors.
pub fn read_ca_cert(path: &Path) -> Result<CaMaterial> {
    let pem = std::fs::read(path).map_err(|e| {
        Error::trust(format!("cannot read CA certificate {}: {}", path.display(), e))
    })?;

    let certificates = parse_certificates(&pem)
        .map_err(|e| Error::trust(format!("{}: {}", path.display(), e)))?;
    if certificates.is_empty() {
        return Err(Error::trust(format!("{} contains no PEM certificates", path.display())));
    }

    let mut roots = RootCertStore::empty();
    for cert in &certificates {
        roots.add(cert.clone()).map_err(|e| {
            Error::trust(format!("{} holds an unusable certificate: {}", path.display(), e))
        })?;
    }

    Ok(CaMaterial { pem, certificates })
}

fn parse_certificates(pem: &[u8]) -> std::result::Result<Vec<CertificateDer<'static>>, String> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid PEM certificate data: {:?}", e))
}

/// Returns the CA paths the Vault client must add to its roots.
///
/// An empty list means the client's built-in roots are sufficient.
pub async fn prepare_trust(
    endpoint: &str,
    ca_cert: &Path,
    policy: &TrustPolicy,
    timeout: Duration,
) -> Result<Vec<String>> {
    let ca = read_ca_cert(ca_cert)?;

    match policy {
        TrustPolicy::Attach => {
            debug!(ca_cert = %ca_cert.display(), "Attaching CA certificate to Vault client");
            Ok(vec![ca_cert.display().to_string()])
        }
        TrustPolicy::AppendToBundle { bundle } => {
            warn!(
                bundle = %bundle.display(),
                "Using shared trust bundle policy; prefer vault_trust_policy: attach"
            );

            match check_endpoint_trust(endpoint, timeout).await? {
                EndpointTrust::Trusted => {
                    debug!(endpoint = %endpoint, "Vault certificate chain already trusted");
                    Ok(Vec::new())
                }
                EndpointTrust::UntrustedCertificate => {
                    if append_ca_if_absent(bundle, &ca)? {
                        info!(bundle = %bundle.display(), "Appended custom CA to trust bundle");
                    }
                    Ok(vec![bundle.display().to_string()])
                }
            }
        }
    }
}

/// Unauthenticated GET against the endpoint using the default roots.
pub async fn check_endpoint_trust(endpoint: &str, timeout: Duration) -> Result<EndpointTrust> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::unreachable(format!("failed to build TLS check client: {}", e)))?;

    match client.get(endpoint).send().await {
        Ok(_) => Ok(EndpointTrust::Trusted),
        Err(e) if is_untrusted_certificate(&e) => Ok(EndpointTrust::UntrustedCertificate),
        Err(e) => Err(Error::unreachable(format!("TLS check of {} failed: {}", endpoint, e))),
    }
}

/// True when the error chain carries a rustls verdict that the server's
/// issuer is unknown. Hostname mismatches, expiry and other certificate
/// errors are not trust failures.
fn is_untrusted_certificate(err: &(dyn StdError + 'static)) -> bool {
    matches!(
        find_rustls_error(err),
        Some(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))
    )
}

fn find_rustls_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a rustls::Error> {
    if let Some(tls) = err.downcast_ref::<rustls::Error>() {
        return Some(tls);
    }
    // io::Error::source skips the wrapped error itself.
    if let Some(inner) = err.downcast_ref::<std::io::Error>().and_then(|io| io.get_ref()) {
        if let Some(tls) = find_rustls_error(inner) {
            return Some(tls);
        }
    }
    err.source().and_then(find_rustls_error)
}

/// Append the CA to the bundle unless every one of its certificates is
/// already there. Certificates are compared in DER form.
///
/// Returns whether the bundle was modified.
pub fn append_ca_if_absent(bundle: &Path, ca: &CaMaterial) -> Result<bool> {
    let existing = match std::fs::read(bundle) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(Error::trust(format!(
                "cannot read trust bundle {}: {}",
                bundle.display(),
                e
            )))
        }
    };

    let present = parse_certificates(&existing)
        .map_err(|e| Error::trust(format!("trust bundle {}: {}", bundle.display(), e)))?;
    if ca.certificates.iter().all(|cert| present.contains(cert)) {
        return Ok(false);
    }

    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(bundle).map_err(
        |e| Error::trust(format!("cannot open trust bundle {}: {}", bundle.display(), e)),
    )?;

    if !existing.is_empty() && !existing.ends_with(b"\n") {
        file.write_all(b"\n")?;
    }
    file.write_all(&ca.pem)?;
    Ok(true)
}
