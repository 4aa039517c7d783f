use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body returned for every upstream failure, whatever the cause.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// The result of one lookup, before it is adapted to an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Success(String),
    ClientError(String),
    UpstreamError(String),
}

impl From<Result<String, Error>> for LookupOutcome {
    fn from(res: Result<String, Error>) -> Self {
        match res {
            Ok(flattened) => Self::Success(flattened),
            Err(err @ Error::MalformedCommand) => Self::ClientError(err.to_string()),
            Err(err) => Self::UpstreamError(err.to_string()),
        }
    }
}

/// How a [`LookupOutcome`] maps onto HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Every outcome is a 200, callers tell failures apart by the body text.
    #[default]
    Compat,
    /// Client errors are 400s and upstream errors are 502s. Bodies are unchanged.
    StatusCodes,
}

impl ResponseMode {
    #[must_use]
    pub fn from_flag(error_status_codes: bool) -> Self {
        if error_status_codes {
            Self::StatusCodes
        } else {
            Self::Compat
        }
    }

    pub(super) fn respond(self, outcome: LookupOutcome) -> Response {
        let (status, body) = match outcome {
            LookupOutcome::Success(body) => (StatusCode::OK, body),
            LookupOutcome::ClientError(reason) => (StatusCode::BAD_REQUEST, reason),
            LookupOutcome::UpstreamError(_) => (StatusCode::BAD_GATEWAY, UNKNOWN_ERROR.to_string()),
        };
        match self {
            Self::Compat => (StatusCode::OK, body).into_response(),
            Self::StatusCodes => (status, body).into_response(),
        }
    }
}
