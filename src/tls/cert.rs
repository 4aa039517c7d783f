//! Conversion of PEM encoded key and chain bundles into rustls signing material.
use crate::error::Error;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls_pemfile::Item;
use std::sync::Arc;
use time::OffsetDateTime;

/// A certificate chain with its signing key, plus the expiry of the leaf certificate.
#[derive(Clone)]
pub struct CachedCertificate {
    pub key: Arc<CertifiedKey>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl std::fmt::Debug for CachedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCertificate")
            .field("chain_len", &self.key.cert.len())
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish()
    }
}

impl CachedCertificate {
    /// Parse a bundle holding one private key followed by a certificate chain, leaf first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCertificate`] if the bundle is missing a key or a certificate, if
    /// the key type isn't supported, or if the leaf can't be parsed.
    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        let mut reader = pem;
        let mut key = None;
        let mut chain = Vec::new();
        for item in rustls_pemfile::read_all(&mut reader)? {
            match item {
                Item::PKCS8Key(der) | Item::ECKey(der) | Item::RSAKey(der) if key.is_none() => {
                    key = Some(rustls::PrivateKey(der));
                }
                Item::X509Certificate(der) => chain.push(rustls::Certificate(der)),
                _ => {}
            }
        }

        let key = key.ok_or_else(|| Error::InvalidCertificate("no private key".to_string()))?;
        let leaf = chain
            .first()
            .ok_or_else(|| Error::InvalidCertificate("no certificate".to_string()))?;
        let (not_before, not_after) = leaf_validity(&leaf.0)?;
        let signing_key = rustls::sign::any_supported_type(&key)
            .map_err(|err| Error::InvalidCertificate(err.to_string()))?;

        Ok(Self {
            key: Arc::new(CertifiedKey::new(chain, signing_key)),
            not_before,
            not_after,
        })
    }

    /// Whether the certificate is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.not_after
    }
}

fn leaf_validity(der: &[u8]) -> Result<(OffsetDateTime, OffsetDateTime), Error> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|err| Error::InvalidCertificate(err.to_string()))?;
    let validity = cert.validity();
    Ok((
        from_timestamp(validity.not_before.timestamp())?,
        from_timestamp(validity.not_after.timestamp())?,
    ))
}

fn from_timestamp(timestamp: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|err| Error::InvalidCertificate(err.to_string()))
}

/// Serves one certificate to every client hello. Built per connection once the SNI name has
/// been matched to a certificate.
pub(crate) struct FixedCert(pub Arc<CertifiedKey>);

impl ResolvesServerCert for FixedCert {
    fn resolve(&self, _client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A self-signed bundle in the cache file layout: key first, then the certificate.
    pub(crate) fn self_signed_pem(host: &str) -> Vec<u8> {
        let cert = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
        let mut pem = cert.serialize_private_key_pem();
        pem.push_str(&cert.serialize_pem().unwrap());
        pem.into_bytes()
    }

    #[test]
    fn parses_key_and_chain() {
        let cached = CachedCertificate::from_pem(&self_signed_pem("localhost")).unwrap();
        assert_eq!(cached.key.cert.len(), 1);
        assert!(cached.not_before < cached.not_after);
        assert!(cached.is_valid_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn expired_after_not_after() {
        let cached = CachedCertificate::from_pem(&self_signed_pem("localhost")).unwrap();
        assert!(!cached.is_valid_at(cached.not_after));
    }

    #[test]
    fn rejects_missing_key() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let pem = cert.serialize_pem().unwrap();
        assert!(matches!(
            CachedCertificate::from_pem(pem.as_bytes()),
            Err(Error::InvalidCertificate(_))
        ));
    }

    #[test]
    fn rejects_missing_certificate() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let pem = cert.serialize_private_key_pem();
        assert!(matches!(
            CachedCertificate::from_pem(pem.as_bytes()),
            Err(Error::InvalidCertificate(_))
        ));
    }
}
