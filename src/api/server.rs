use crate::api::outcome::ResponseMode;
use crate::doh::DynResolver;
use crate::error::Error;
use crate::tls::{self, DynCertificateProvider};
use axum::Router;
use hyper::server::conn::Http;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub(super) struct AppState {
    pub resolver: DynResolver,
    pub response_mode: ResponseMode,
}

/// Serve `router` over plaintext HTTP on `addr` until the server fails.
///
/// # Errors
///
/// Returns [`Error::Http`] if `addr` can't be bound or the server stops with an error.
pub async fn serve(addr: SocketAddr, router: Router) -> Result<(), Error> {
    axum::Server::try_bind(&addr)?
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

/// Serve `router` over TLS on `listener`, taking certificates from `provider` as clients
/// connect. Failed handshakes only drop their own connection.
///
/// # Errors
///
/// Never returns while the listener accepts connections.
pub async fn serve_tls(
    listener: TcpListener,
    router: Router,
    provider: DynCertificateProvider,
) -> Result<(), Error> {
    let protocol = Arc::new(Http::new());
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!("TLS accept failed: {err}");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };
        let (protocol, router, provider) = (protocol.clone(), router.clone(), provider.clone());
        tokio::spawn(async move {
            let stream = match tls::accept(stream, &provider).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!("TLS handshake with {peer} failed: {err}");
                    return;
                }
            };
            if let Err(err) = protocol.serve_connection(stream, router).await {
                tracing::debug!("connection with {peer} failed: {err}");
            }
        });
    }
}
