//! An ACME (RFC 8555) backed implementation of the [`CertificateProvider`] trait.
//!
//! Certificates are issued for exactly one host,
//! [`Config::allowed_host`][`crate::config::Config::allowed_host`], using [HTTP-01] challenges.
//! The account credentials and the issued key and chain are kept in a [`DirCache`] so restarts
//! reuse them instead of issuing again.
//!
//! [HTTP-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.3
use crate::config::Config;
use crate::error::Error;
use crate::tls::cache::DirCache;
use crate::tls::cert::CachedCertificate;
use crate::tls::challenge::ChallengeStore;
use crate::tls::CertificateProvider;
use instant_acme::{
    Account, AccountCredentials, AuthorizationStatus, ChallengeType, Identifier, NewAccount,
    NewOrder, Order, OrderStatus,
};
use rcgen::{CertificateParams, DistinguishedName};
use rustls::sign::CertifiedKey;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;

const ACCOUNT_KEY: &str = "acme_account.json";
const RENEWAL_CHECK_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
const ORDER_POLL_ATTEMPTS: usize = 10;
const ORDER_POLL_MAX_DELAY: Duration = Duration::from_secs(10);
const CERTIFICATE_POLL_ATTEMPTS: usize = 30;

#[allow(clippy::module_name_repetitions)]
pub struct AcmeCertificateProvider {
    allowed_host: String,
    directory_url: String,
    contact: Vec<String>,
    renew_before: Duration,
    cache: DirCache,
    challenges: ChallengeStore,
    current: RwLock<Option<CachedCertificate>>,
    // Held for the whole of a cache load or issuance so concurrent handshakes wait for one order.
    issuing: Mutex<()>,
}

impl AcmeCertificateProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            allowed_host: config.allowed_host.to_ascii_lowercase(),
            directory_url: config.acme_directory_url.clone(),
            contact: config.acme_contact.clone(),
            renew_before: config.renew_before,
            cache: DirCache::new(&config.cert_cache_dir),
            challenges: ChallengeStore::default(),
            current: RwLock::new(None),
            issuing: Mutex::new(()),
        }
    }

    fn check_host(&self, hostname: &str) -> Result<(), Error> {
        if hostname
            .trim_end_matches('.')
            .eq_ignore_ascii_case(&self.allowed_host)
        {
            Ok(())
        } else {
            Err(Error::HostNotAllowed(hostname.to_string()))
        }
    }

    /// When `cert` enters its renewal window. The window is capped at half the certificate's
    /// lifetime so a freshly issued certificate is never already due.
    fn renew_at(&self, cert: &CachedCertificate) -> OffsetDateTime {
        let lifetime: time::Duration = cert.not_after - cert.not_before;
        let half_lifetime = (lifetime / 2_i32).max(time::Duration::ZERO);
        let window = time::Duration::try_from(self.renew_before)
            .map_or(half_lifetime, |window| window.min(half_lifetime));
        cert.not_after.checked_sub(window).unwrap_or(cert.not_before)
    }

    fn until_renewal(&self, cert: &CachedCertificate, now: OffsetDateTime) -> Duration {
        Duration::try_from(self.renew_at(cert) - now).unwrap_or(Duration::ZERO)
    }

    /// Return the current certificate, loading it from the cache or issuing a new one when it is
    /// missing or expired. With `renew` set, a certificate inside the renewal window is replaced.
    async fn obtain(&self, renew: bool) -> Result<CachedCertificate, Error> {
        let _issuing = self.issuing.lock().await;
        let now = OffsetDateTime::now_utc();

        // Another task may have finished while we waited for the lock.
        if let Some(current) = self.current.read().await.clone() {
            let usable = if renew {
                now < self.renew_at(&current)
            } else {
                current.is_valid_at(now)
            };
            if usable {
                return Ok(current);
            }
        }

        if !renew {
            if let Some(cached) = self.load_cached(now).await? {
                *self.current.write().await = Some(cached.clone());
                return Ok(cached);
            }
        }

        let issued = self.issue().await?;
        *self.current.write().await = Some(issued.clone());
        Ok(issued)
    }

    async fn load_cached(&self, now: OffsetDateTime) -> Result<Option<CachedCertificate>, Error> {
        let Some(pem) = self.cache.get(&self.allowed_host).await? else {
            return Ok(None);
        };
        match CachedCertificate::from_pem(&pem) {
            Ok(cached) if cached.is_valid_at(now) => {
                tracing::info!(
                    "loaded certificate for \"{}\" from {}, expires {}",
                    self.allowed_host,
                    self.cache.dir().display(),
                    cached.not_after
                );
                Ok(Some(cached))
            }
            Ok(cached) => {
                tracing::info!(
                    "cached certificate for \"{}\" expired {}",
                    self.allowed_host,
                    cached.not_after
                );
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(
                    "ignoring unusable cached certificate for \"{}\": {err}",
                    self.allowed_host
                );
                Ok(None)
            }
        }
    }

    async fn account(&self) -> Result<Account, Error> {
        if let Some(data) = self.cache.get(ACCOUNT_KEY).await? {
            let credentials: AccountCredentials = serde_json::from_slice(&data)?;
            return Ok(Account::from_credentials(credentials).await?);
        }

        let contact: Vec<&str> = self.contact.iter().map(String::as_str).collect();
        let (account, credentials) = Account::create(
            &NewAccount {
                contact: &contact,
                terms_of_service_agreed: true,
                only_return_existing: false,
            },
            &self.directory_url,
            None,
        )
        .await?;
        self.cache
            .put(ACCOUNT_KEY, &serde_json::to_vec_pretty(&credentials)?)
            .await?;
        tracing::info!("registered ACME account with {}", self.directory_url);
        Ok(account)
    }

    async fn issue(&self) -> Result<CachedCertificate, Error> {
        tracing::info!("requesting certificate for \"{}\"", self.allowed_host);
        let account = self.account().await?;
        let mut order = account
            .new_order(&NewOrder {
                identifiers: &[Identifier::Dns(self.allowed_host.clone())],
            })
            .await?;

        let mut tokens = Vec::new();
        let validated = self.validate(&mut order, &mut tokens).await;
        for token in &tokens {
            self.challenges.remove(token).await;
        }
        validated?;

        let mut params = CertificateParams::new(vec![self.allowed_host.clone()]);
        params.distinguished_name = DistinguishedName::new();
        let key = rcgen::Certificate::from_params(params)?;
        order.finalize(&key.serialize_request_der()?).await?;
        let chain_pem = self.download_chain(&mut order).await?;

        let mut bundle = key.serialize_private_key_pem();
        bundle.push_str(&chain_pem);
        let issued = CachedCertificate::from_pem(bundle.as_bytes())?;
        self.cache.put(&self.allowed_host, bundle.as_bytes()).await?;
        tracing::info!(
            "issued certificate for \"{}\", expires {}",
            self.allowed_host,
            issued.not_after
        );
        Ok(issued)
    }

    /// Publish HTTP-01 responses for every pending authorization and wait for the order to become
    /// ready. Published tokens are pushed to `tokens` so the caller can withdraw them.
    async fn validate(&self, order: &mut Order, tokens: &mut Vec<String>) -> Result<(), Error> {
        if order.state().status == OrderStatus::Ready {
            return Ok(());
        }

        let authorizations = order.authorizations().await?;
        let mut challenge_urls = Vec::with_capacity(authorizations.len());
        for authz in &authorizations {
            match authz.status {
                AuthorizationStatus::Pending => {}
                AuthorizationStatus::Valid => continue,
                ref status => {
                    return Err(self.order_failed(format!("authorization is {status:?}")));
                }
            }
            let challenge = authz
                .challenges
                .iter()
                .find(|c| c.r#type == ChallengeType::Http01)
                .ok_or_else(|| self.order_failed("no http-01 challenge offered".to_string()))?;
            let key_authorization = order.key_authorization(challenge);
            self.challenges
                .put(
                    challenge.token.clone(),
                    key_authorization.as_str().to_string(),
                )
                .await;
            tokens.push(challenge.token.clone());
            challenge_urls.push(challenge.url.clone());
        }

        for url in &challenge_urls {
            order.set_challenge_ready(url).await?;
        }

        let mut delay = Duration::from_millis(250);
        for _ in 0..ORDER_POLL_ATTEMPTS {
            sleep(delay).await;
            let state = order.refresh().await?;
            match state.status {
                OrderStatus::Ready => return Ok(()),
                OrderStatus::Invalid => {
                    return Err(self.order_failed("order is invalid".to_string()));
                }
                _ => {
                    tracing::debug!("order for \"{}\" not ready yet", self.allowed_host);
                }
            }
            delay = (delay * 2).min(ORDER_POLL_MAX_DELAY);
        }
        Err(self.order_failed("order did not become ready".to_string()))
    }

    async fn download_chain(&self, order: &mut Order) -> Result<String, Error> {
        for _ in 0..CERTIFICATE_POLL_ATTEMPTS {
            if let Some(chain_pem) = order.certificate().await? {
                return Ok(chain_pem);
            }
            sleep(Duration::from_secs(1)).await;
        }
        Err(self.order_failed("certificate was never issued".to_string()))
    }

    fn order_failed(&self, reason: String) -> Error {
        Error::OrderFailed(self.allowed_host.clone(), reason)
    }
}

#[async_trait::async_trait]
impl CertificateProvider for AcmeCertificateProvider {
    async fn certificate_for(&self, hostname: &str) -> Result<Arc<CertifiedKey>, Error> {
        self.check_host(hostname)?;
        if let Some(current) = self.current.read().await.as_ref() {
            if current.is_valid_at(OffsetDateTime::now_utc()) {
                return Ok(current.key.clone());
            }
        }
        Ok(self.obtain(false).await?.key)
    }

    async fn challenge_response(&self, token: &str) -> Option<String> {
        self.challenges.get(token).await
    }

    async fn renew_due(&self) -> Result<Duration, Error> {
        let current = self.current.read().await.clone();
        let Some(current) = current else {
            return Ok(RENEWAL_CHECK_INTERVAL);
        };

        let now = OffsetDateTime::now_utc();
        if now < self.renew_at(&current) {
            return Ok(self.until_renewal(&current, now).min(RENEWAL_CHECK_INTERVAL));
        }

        tracing::info!(
            "renewing certificate for \"{}\", expires {}",
            self.allowed_host,
            current.not_after
        );
        let renewed = self.obtain(true).await?;
        Ok(self
            .until_renewal(&renewed, OffsetDateTime::now_utc())
            .min(RENEWAL_CHECK_INTERVAL))
    }
}
