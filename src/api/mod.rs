//! HTTP API for relaying DNS lookups to an upstream DoH resolver.
//!
//! # API Endpoints
//!
//! ## `/1111` (POST)
//!
//!   Expects a form encoded request body with a `text` field of the form
//!   `<record-type> <domain-name>`:
//!
//!   ```bash
//!   ❯ curl -d 'text=A example.com' http://localhost:4545/1111
//!   93.184.216.34
//!   ```
//!
//!   The record type is uppercased and passed to the upstream resolver with the domain name, both
//!   unvalidated. The response body is the `data` of every answer record joined with `", "`, or
//!   an empty body when there are no answers.
//!
//!   When `text` doesn't hold two space separated tokens the body is
//!   `Missing required args [type name]`. When the upstream resolver can't be reached or returns
//!   something that isn't a DNS JSON answer the body is `Unknown Error`.
//!
//!   Every response has status 200 unless
//!   [`Config::error_status_codes`][`crate::config::Config::error_status_codes`] is set, in which
//!   case malformed commands are 400 and upstream failures are 502.
//!
//!   Any other method returns HTTP 404 (Not Found), as does any other path.

mod outcome;
pub mod responder;
mod routes;
pub mod server;

use crate::doh::DynResolver;
use crate::tls::DynCertificateProvider;
use axum::Router;
pub use outcome::{LookupOutcome, ResponseMode, UNKNOWN_ERROR};
pub use routes::LOOKUP_PATH;
pub use server::{serve, serve_tls};

/// Build the lookup router, resolving through `resolver`.
pub fn router(resolver: DynResolver, response_mode: ResponseMode) -> Router {
    routes::new(server::AppState {
        resolver,
        response_mode,
    })
}

/// Build the plaintext challenge and redirect router. `fallback_host` is the redirect target for
/// requests without a `Host` header.
pub fn responder(provider: DynCertificateProvider, fallback_host: String) -> Router {
    responder::new(responder::ResponderState {
        provider,
        fallback_host,
    })
}
