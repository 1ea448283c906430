use thiserror::Error;

use crate::codec::Location;
use crate::http::request::HttpError;
use crate::http::response::StatusCode;

/// Failure of the writer state machine to honor a requested transition.
///
/// Treated as a programmer error by the dispatcher: logged via
/// `tracing::error!` and coerced to `InternalError` on the wire rather than
/// surfaced to the caller directly.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterError {
    /// `commit()` was called while the writer was not `NotCommitted`.
    #[error("writer is not in a state that can be committed")]
    InvalidStateForCommit,
    /// `complete()` was called while the writer was not `Committed`.
    #[error("writer is not in a state that can be completed")]
    InvalidStateForComplete,
    /// A typed writer's one-shot `write` was called a second time.
    #[error("typed writer has already completed")]
    AlreadyCompleted,
}

/// The error taxonomy the dispatcher recovers into an HTTP response.
///
/// The dispatcher is the only component allowed to convert one of these into
/// wire bytes; middleware that wants to short-circuit must write a response
/// itself rather than swallow an error silently.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Input could not be decoded, composed, or semantically validated.
    #[error("validation error{}: {detail}", location.map(|l| format!(" at {l}")).unwrap_or_default())]
    ValidationError {
        /// The input carrier the failing thunk was decoding from, if known.
        location: Option<Location>,
        /// A human-readable description of what failed.
        detail: String,
    },

    /// The router could not resolve an operation for the request.
    #[error("invalid operation")]
    InvalidOperation,

    /// A handler-thrown error matched an `allowedErrors` predicate.
    #[error("allow-listed domain error: {tag}")]
    AllowedDomainError {
        /// The `__type` tag reported to the client.
        tag: String,
        /// The status configured for this predicate match.
        status: StatusCode,
        /// An optional human-readable detail surfaced as `Reason`.
        detail: Option<String>,
    },

    /// Any other handler-thrown error, output encoding failure, or codec
    /// defect.
    #[error("internal error: {0}")]
    InternalError(String),

    /// A writer transition was attempted from the wrong state.
    #[error(transparent)]
    WriterLifecycleError(#[from] WriterError),

    /// The request body exceeded the configured limit.
    #[error("body limit exceeded")]
    BodyLimitExceeded,

    /// The body stream itself failed (malformed framing, IO error, timeout).
    #[error("body stream error: {0}")]
    BodyStreamError(#[from] HttpError),
}

impl DispatchError {
    /// Builds a bodiless `ValidationError` located at `location`.
    #[must_use]
    pub fn validation(location: Location, detail: impl Into<String>) -> Self {
        Self::ValidationError {
            location: Some(location),
            detail: detail.into(),
        }
    }

    /// The `__type` tag this error reports on the wire.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::ValidationError { .. } => "ValidationError",
            Self::InvalidOperation => "InvalidOperation",
            Self::AllowedDomainError { tag, .. } => tag,
            Self::InternalError(_) | Self::WriterLifecycleError(_) | Self::BodyStreamError(_) => {
                "InternalError"
            }
            Self::BodyLimitExceeded => "ValidationError",
        }
    }

    /// The status code this error is recovered into, per the status-code
    /// contract in §6.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. } | Self::InvalidOperation | Self::BodyLimitExceeded => {
                StatusCode::BadRequest
            }
            Self::AllowedDomainError { status, .. } => *status,
            Self::InternalError(_) | Self::WriterLifecycleError(_) | Self::BodyStreamError(_) => {
                StatusCode::InternalServerError
            }
        }
    }

    /// The optional `Reason` detail reported on the wire.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::ValidationError { location, detail } => Some(
                location
                    .map(|l| format!("{l}: {detail}"))
                    .unwrap_or_else(|| detail.clone()),
            ),
            Self::AllowedDomainError { detail, .. } => detail.clone(),
            Self::InvalidOperation
            | Self::InternalError(_)
            | Self::WriterLifecycleError(_)
            | Self::BodyLimitExceeded
            | Self::BodyStreamError(_) => None,
        }
    }
}
