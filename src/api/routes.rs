use crate::api::outcome::LookupOutcome;
use crate::api::server::AppState;
use crate::command::Command;
use crate::error::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router};
use tower_http::trace::TraceLayer;

pub const LOOKUP_PATH: &str = "/1111";

const NOT_FOUND_BODY: &str = "404 page not found";
const TEXT_FIELD: &str = "text";

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route(LOOKUP_PATH, post(lookup).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

// A missing or unreadable form counts as an empty command. A repeated field uses its first value.
async fn lookup(
    State(state): State<AppState>,
    form: Option<Form<Vec<(String, String)>>>,
) -> Response {
    let text = form
        .and_then(|Form(fields)| {
            fields
                .into_iter()
                .find_map(|(name, value)| (name == TEXT_FIELD).then_some(value))
        })
        .unwrap_or_default();
    let outcome = LookupOutcome::from(resolve_text(&state, &text).await);
    if let LookupOutcome::UpstreamError(reason) = &outcome {
        tracing::warn!("lookup \"{text}\" failed: {reason}");
    }
    state.response_mode.respond(outcome)
}

async fn resolve_text(state: &AppState, text: &str) -> Result<String, Error> {
    let command = Command::parse(text)?;
    let envelope = state
        .resolver
        .resolve(&command.record_type, &command.domain_name)
        .await?;
    tracing::debug!(
        "resolved {} {} with {} answers",
        command.record_type,
        command.domain_name,
        envelope.answers.len()
    );
    Ok(envelope.flatten())
}
