//! TLS termination with automatically provisioned certificates.
//!
//! The TLS listener depends only on the [`CertificateProvider`] trait. Certificates are looked
//! up per connection from the SNI name of the client hello, so the first handshake for a host
//! may wait on issuance. Renewal runs in the background through [`renewal_loop`].
//!
//! [`acme::AcmeCertificateProvider`] is the provider used in production. It answers
//! [HTTP-01] challenges through [`CertificateProvider::challenge_response`], served by the
//! plaintext [responder][crate::api::responder], and persists issued certificates to a
//! [`cache::DirCache`].
//!
//! [HTTP-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.3

use crate::error::Error;
use rustls::server::Acceptor;
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;

pub mod acme;
pub mod cache;
pub mod cert;
pub mod challenge;

#[allow(clippy::module_name_repetitions)]
pub use acme::AcmeCertificateProvider;
pub use cache::DirCache;
pub use cert::CachedCertificate;
pub use challenge::ChallengeStore;

/// `DynCertificateProvider` is a type alias for a [`CertificateProvider`] shared by the TLS
/// listener, the plaintext challenge responder and the renewal task.
pub type DynCertificateProvider = Arc<dyn CertificateProvider + Send + Sync>;

const RENEWAL_RETRY: Duration = Duration::from_secs(60);

/// An async trait describing a source of TLS certificates that handles issuance, storage and
/// renewal on its own.
#[async_trait::async_trait]
pub trait CertificateProvider {
    /// Get a certificate for `hostname`, obtaining one first if none is cached or the cached one
    /// has expired.
    async fn certificate_for(&self, hostname: &str) -> Result<Arc<CertifiedKey>, Error>;

    /// Get the HTTP-01 key authorization for an in-flight challenge `token` (if any).
    async fn challenge_response(&self, token: &str) -> Option<String>;

    /// Renew the certificate if it is close to expiry. Returns how long to wait before the next
    /// check.
    async fn renew_due(&self) -> Result<Duration, Error>;
}

/// Drive [`CertificateProvider::renew_due`] forever. Failed renewals are logged and retried
/// after a minute.
pub async fn renewal_loop(provider: DynCertificateProvider) {
    loop {
        let wait = match provider.renew_due().await {
            Ok(wait) => wait,
            Err(err) => {
                tracing::error!("certificate renewal failed: {err:?}");
                RENEWAL_RETRY
            }
        };
        tokio::time::sleep(wait).await;
    }
}

/// Complete a TLS handshake on `stream` with the certificate the provider holds for the SNI name
/// the client asked for.
///
/// # Errors
///
/// Returns [`Error::MissingServerName`] if the client hello has no SNI name, any error of
/// [`CertificateProvider::certificate_for`], or [`Error::IO`] if the handshake fails.
pub async fn accept(
    stream: TcpStream,
    provider: &DynCertificateProvider,
) -> Result<TlsStream<TcpStream>, Error> {
    let start = LazyConfigAcceptor::new(Acceptor::default(), stream).await?;
    let server_name = start
        .client_hello()
        .server_name()
        .map(str::to_owned)
        .ok_or(Error::MissingServerName)?;
    let key = provider.certificate_for(&server_name).await?;
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(cert::FixedCert(key)));
    Ok(start.into_stream(Arc::new(config)).await?)
}
