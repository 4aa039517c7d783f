//! Plaintext HTTP responder run next to the TLS listener in production.
//!
//! Answers ACME HTTP-01 challenges from the certificate provider and sends everything else to
//! the HTTPS origin.
use crate::tls::DynCertificateProvider;
use axum::extract::{Path, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub const CHALLENGE_PATH: &str = "/.well-known/acme-challenge/:token";

#[derive(Clone)]
pub(super) struct ResponderState {
    pub provider: DynCertificateProvider,
    pub fallback_host: String,
}

pub(super) fn new(state: ResponderState) -> Router {
    Router::new()
        .route(CHALLENGE_PATH, get(challenge).fallback(redirect))
        .fallback(redirect)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn challenge(State(state): State<ResponderState>, Path(token): Path<String>) -> Response {
    match state.provider.challenge_response(&token).await {
        Some(key_authorization) => key_authorization.into_response(),
        None => {
            tracing::debug!("no challenge response for token \"{token}\"");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[allow(clippy::unused_async)]
async fn redirect(
    State(state): State<ResponderState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::BAD_REQUEST, "Use HTTPS").into_response();
    }
    let host = headers
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .map(strip_port)
        .filter(|host| !host.is_empty())
        .unwrap_or(state.fallback_host.as_str());
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    (StatusCode::FOUND, [(LOCATION, format!("https://{host}{path}"))]).into_response()
}

fn strip_port(host: &str) -> &str {
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::tests::StaticProvider;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn responder() -> Router {
        new(ResponderState {
            provider: Arc::new(StaticProvider::self_signed("relay.example.com")),
            fallback_host: "relay.example.com".to_string(),
        })
    }

    async fn send(req: Request<Body>) -> Response {
        responder().oneshot(req).await.unwrap()
    }

    fn get_request(uri: &str, host: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(host) = host {
            builder = builder.header(HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn answers_known_challenge() {
        let res = send(get_request("/.well-known/acme-challenge/known", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"known.thumbprint");
    }

    #[tokio::test]
    async fn unknown_challenge_is_not_found() {
        let res = send(get_request("/.well-known/acme-challenge/other", None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn redirects_to_https_without_port() {
        let res = send(get_request("/1111?x=1", Some("relay.example.com:80"))).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location(&res), "https://relay.example.com/1111?x=1");
    }

    #[tokio::test]
    async fn redirect_falls_back_to_allowed_host() {
        let res = send(get_request("/", None)).await;
        assert_eq!(location(&res), "https://relay.example.com/");
    }

    #[tokio::test]
    async fn post_is_refused() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/1111")
            .body(Body::from("text=A+example.com"))
            .unwrap();
        let res = send(req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:80"), "[::1]");
    }
}
