//! Process topology, chosen once at startup.
//!
//! * [`Topology::Dev`] serves the lookup API over plaintext HTTP on
//!   [`Config::dev_bind_addr`][`crate::config::Config::dev_bind_addr`].
//! * [`Topology::Prod`] serves the lookup API over TLS on
//!   [`Config::https_bind_addr`][`crate::config::Config::https_bind_addr`] with certificates from
//!   an [`AcmeCertificateProvider`], while a plaintext responder on
//!   [`Config::http_bind_addr`][`crate::config::Config::http_bind_addr`] answers ACME challenges
//!   and redirects everything else to HTTPS.
//!
//! There is no reload or graceful shutdown. Either mode serves until a listener fails, which is
//! fatal.

use crate::api::{self, ResponseMode};
use crate::config::SharedConfig;
use crate::doh::{DohResolver, DynResolver};
use crate::error::Error;
use crate::tls::{self, AcmeCertificateProvider, DynCertificateProvider};
use anyhow::{anyhow, Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Dev,
    Prod,
}

impl Topology {
    #[must_use]
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Self::Dev
        } else {
            Self::Prod
        }
    }

    /// Start the listeners for this topology and serve until one of them fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream resolver can't be set up, if a listener can't bind or
    /// stops, or (in [`Topology::Prod`]) if the first certificate can't be obtained.
    pub async fn run(self, config: SharedConfig) -> Result<()> {
        let resolver: DynResolver = Arc::new(DohResolver::new(&config)?);
        let router = api::router(resolver, ResponseMode::from_flag(config.error_status_codes));
        match self {
            Self::Dev => run_dev(&config, router).await,
            Self::Prod => run_prod(&config, router).await,
        }
    }
}

async fn run_dev(config: &SharedConfig, router: Router) -> Result<()> {
    tracing::info!("starting dev server on {}", config.dev_bind_addr);
    api::serve(config.dev_bind_addr, router)
        .await
        .context("dev server failed")
}

async fn run_prod(config: &SharedConfig, router: Router) -> Result<()> {
    let provider: DynCertificateProvider = Arc::new(AcmeCertificateProvider::new(config));

    tracing::info!("challenge responder listening on {}", config.http_bind_addr);
    let mut responder = tokio::spawn(api::serve(
        config.http_bind_addr,
        api::responder(provider.clone(), config.allowed_host.clone()),
    ));

    // The first certificate is validated through the responder, so it has to be running.
    tokio::select! {
        res = &mut responder => return listener_exit("challenge responder", res),
        res = provider.certificate_for(&config.allowed_host) => {
            res.with_context(|| format!("obtaining certificate for \"{}\"", config.allowed_host))?;
        }
    }
    tokio::spawn(tls::renewal_loop(provider.clone()));

    let listener = TcpListener::bind(config.https_bind_addr)
        .await
        .with_context(|| format!("binding {}", config.https_bind_addr))?;
    tracing::info!("starting prod server on {}", config.https_bind_addr);
    let tls_server = tokio::spawn(api::serve_tls(listener, router, provider));

    tokio::select! {
        res = responder => listener_exit("challenge responder", res),
        res = tls_server => listener_exit("TLS server", res),
    }
}

fn listener_exit(name: &str, res: Result<Result<(), Error>, JoinError>) -> Result<()> {
    match res {
        Ok(Ok(())) => Err(anyhow!("{name} stopped")),
        Ok(Err(err)) => Err(err).with_context(|| format!("{name} failed")),
        Err(err) => Err(err).with_context(|| format!("{name} panicked")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_flag_selects_topology() {
        assert_eq!(Topology::from_dev_flag(true), Topology::Dev);
        assert_eq!(Topology::from_dev_flag(false), Topology::Prod);
    }

    #[test]
    fn listener_exit_is_always_an_error() {
        let stopped = listener_exit("dev server", Ok(Ok(()))).unwrap_err();
        assert_eq!(stopped.to_string(), "dev server stopped");

        let failed = listener_exit(
            "challenge responder",
            Ok(Err(Error::MissingServerName)),
        )
        .unwrap_err();
        assert_eq!(failed.to_string(), "challenge responder failed");
        assert_eq!(failed.root_cause().to_string(), "missing server name");
    }

    #[tokio::test]
    async fn dev_bind_failure_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = crate::config::Config {
            dev_bind_addr: taken.local_addr().unwrap(),
            ..crate::config::Config::default()
        };
        let res = Topology::Dev.run(Arc::new(config)).await;
        assert!(res.is_err());
    }
}
