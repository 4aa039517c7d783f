//! DoH Relay
//!
//! A minimal DNS lookup relay. One HTTP endpoint accepts a plain-text command such as
//! `A example.com`, forwards it as a [DNS-over-HTTPS] JSON query to an upstream resolver, and
//! answers with the resolved record values joined into one comma separated string.
//!
//! In development the relay serves plaintext HTTP. In production it terminates TLS with
//! certificates obtained and renewed through [ACME], while a plaintext listener answers
//! HTTP-01 challenges and redirects to HTTPS. See [`topology`].
//!
//! [DNS-over-HTTPS]: https://developers.cloudflare.com/1.1.1.1/encryption/dns-over-https/make-api-requests/dns-json/
//! [ACME]: https://www.rfc-editor.org/rfc/rfc8555
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod command;
pub mod config;
pub mod doh;
pub mod error;
pub mod tls;
pub mod topology;

pub use command::Command;
pub use config::{Config, SharedConfig};
pub use doh::DohResolver;
pub use tls::AcmeCertificateProvider;
pub use topology::Topology;
