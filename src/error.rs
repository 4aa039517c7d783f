//! Error types.

/// Error enumerates the possible relay error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the `text` of a [`/1111` lookup][crate::api#1111-post] doesn't split into
    /// a record type and a domain name.
    ///
    /// The message is returned verbatim to clients, don't change it.
    #[error("Missing required args [type name]")]
    MalformedCommand,

    /// Returned when the upstream DoH resolver can't be reached, or the connection fails before
    /// the full response body is read.
    #[error("upstream resolver unavailable")]
    UpstreamUnavailable(#[source] reqwest::Error),

    /// Returned when the upstream DoH resolver responds with a body that isn't a JSON answer
    /// envelope.
    #[error("upstream resolver returned an invalid answer")]
    UpstreamDecode(#[source] serde_json::Error),

    /// Returned when [`Config::upstream_url`][`crate::config::Config::upstream_url`] isn't an
    /// absolute `http` or `https` URL.
    #[error("invalid upstream URL \"{0}\"")]
    InvalidUpstreamUrl(String),

    /// Returned when [`Config::allowed_host`][`crate::config::Config::allowed_host`] is empty.
    #[error("allowed host must not be empty")]
    EmptyAllowedHost,

    /// Returned when [`Config::renew_before`][`crate::config::Config::renew_before`] is longer
    /// than the 90 day lifetime of an issued certificate.
    #[error("renewal window of {0:?} exceeds 90 days")]
    InvalidRenewWindow(std::time::Duration),

    /// Returned when the HTTP client for the upstream resolver can't be built.
    #[error("could not build upstream HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// Returned when a certificate is requested for a host other than
    /// [`Config::allowed_host`][`crate::config::Config::allowed_host`].
    #[error("host \"{0}\" is not allowed")]
    HostNotAllowed(String),

    /// Returned when a TLS client hello carries no SNI server name.
    #[error("missing server name")]
    MissingServerName,

    /// Returned when the ACME directory rejects an account, order, or finalization request.
    #[error("ACME error")]
    Acme(#[from] instant_acme::Error),

    /// Returned when an ACME order ends in a state other than valid.
    #[error("ACME order for \"{0}\" failed: {1}")]
    OrderFailed(String, String),

    /// Returned when a private key or CSR can't be generated for a new certificate.
    #[error("certificate generation failed")]
    CertificateGeneration(#[from] rcgen::RcgenError),

    /// Returned when cached or issued PEM data doesn't hold a usable key and certificate chain.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. when
    /// [trying to load a `Config`][crate::config::Config::try_from_file], or cached ACME
    /// account credentials) fails due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when an HTTP listener can't bind or fails while serving.
    #[error("HTTP server error")]
    Http(#[from] hyper::Error),
}
