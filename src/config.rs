use crate::error::Error;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

pub const DEFAULT_UPSTREAM_URL: &str = "https://cloudflare-dns.com/dns-query";
pub const LETS_ENCRYPT_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";

// Matches the renewal window of the Let's Encrypt issued 90 day certificates.
const DEFAULT_RENEW_BEFORE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const MAX_RENEW_BEFORE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub dev_bind_addr: SocketAddr,
    pub http_bind_addr: SocketAddr,
    pub https_bind_addr: SocketAddr,
    pub allowed_host: String,
    pub cert_cache_dir: PathBuf,
    pub acme_directory_url: String,
    pub acme_contact: Vec<String>,
    pub upstream_url: String,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub upstream_timeout: Option<Duration>,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub renew_before: Duration,
    pub error_status_codes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dev_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 4545)),
            http_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 80)),
            https_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 443)),
            allowed_host: "www.paizelnut.com".to_string(),
            cert_cache_dir: PathBuf::from("certs"),
            acme_directory_url: LETS_ENCRYPT_DIRECTORY_URL.to_string(),
            acme_contact: Vec::new(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_timeout: None,
            renew_before: DEFAULT_RENEW_BEFORE,
            error_status_codes: false,
        }
    }
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Returns an error if the upstream URL isn't an absolute `http(s)` URL, if no allowed
    /// host is set, or if the renewal window is longer than a certificate's 90 day lifetime.
    pub fn validate(&self) -> Result<(), Error> {
        match reqwest::Url::parse(&self.upstream_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => return Err(Error::InvalidUpstreamUrl(self.upstream_url.clone())),
        }
        if self.allowed_host.trim().is_empty() {
            return Err(Error::EmptyAllowedHost);
        }
        if self.renew_before > MAX_RENEW_BEFORE {
            return Err(Error::InvalidRenewWindow(self.renew_before));
        }
        Ok(())
    }
}
