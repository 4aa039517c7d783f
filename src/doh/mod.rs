//! Client for upstream DNS-over-HTTPS resolvers speaking the `application/dns-json` format.
//!
//! Each lookup is a single `GET` of the configured
//! [`Config::upstream_url`][`crate::config::Config::upstream_url`] with the query parameters
//! `ct=application/dns-json`, `type` and `name`. There are no retries. The only timeout is
//! [`Config::upstream_timeout`][`crate::config::Config::upstream_timeout`], unset by default, so
//! a hanging upstream holds the request open indefinitely.

use crate::config::Config;
use crate::error::Error;
use std::sync::Arc;

pub mod model;

pub use model::AnswerEnvelope;

/// `DynResolver` is a type alias for a [`Resolver`] shared between request handlers.
pub type DynResolver = Arc<dyn Resolver + Send + Sync>;

const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";

/// An async trait describing an upstream DNS resolver.
#[async_trait::async_trait]
pub trait Resolver {
    /// Resolve records of `record_type` for `domain_name`.
    async fn resolve(&self, record_type: &str, domain_name: &str) -> Result<AnswerEnvelope, Error>;
}

#[derive(Debug, Clone)]
pub struct DohResolver {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl DohResolver {
    /// Build a resolver for the configured upstream URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUpstreamUrl`] if the upstream URL doesn't parse, or
    /// [`Error::HttpClient`] if the HTTP client can't be constructed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let url = reqwest::Url::parse(&config.upstream_url)
            .map_err(|_| Error::InvalidUpstreamUrl(config.upstream_url.clone()))?;
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::HttpClient)?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl Resolver for DohResolver {
    async fn resolve(&self, record_type: &str, domain_name: &str) -> Result<AnswerEnvelope, Error> {
        let response = self
            .client
            .get(self.url.clone())
            .query(&[
                ("ct", DNS_JSON_CONTENT_TYPE),
                ("type", record_type),
                ("name", domain_name),
            ])
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;

        // The HTTP status is not checked, error bodies are decoded like any other answer.
        tracing::debug!("upstream answered {} for {record_type} {domain_name}", response.status());
        let body = response.bytes().await.map_err(Error::UpstreamUnavailable)?;
        serde_json::from_slice(&body).map_err(Error::UpstreamDecode)
    }
}
