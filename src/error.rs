//! Error types for the media-insight library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`AnalysisError`]: **Fatal** for one request. The pipeline cannot
//!   produce a result (bad upload, provider unreachable, remote processing
//!   failed or ran out of poll budget). Returned as `Err(AnalysisError)` from
//!   every [`crate::Analyzer`] entry point.
//!
//! * [`ValidationError`]: the user-correctable subset of the above. Always
//!   raised before any network call is made, and wrapped in
//!   [`AnalysisError::Validation`] when it crosses the pipeline boundary.
//!
//! * [`NormalizeError`]: **Non-fatal**. The model answered but its output
//!   could not be read as JSON. Stored inside
//!   [`crate::output::AnalysisResult`] next to the raw text so the caller
//!   can still show something useful.
//!
//! "The model found nothing" is not an error at all; see
//! [`crate::output::AnalysisOutcome::NoRecognizableContent`].

use thiserror::Error;

/// All fatal errors returned by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request was rejected before anything was sent upstream.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Provider errors ───────────────────────────────────────────────────
    /// Writing the media to the provider's file store failed.
    #[error("Upload of '{display_name}' failed: {detail}")]
    Upload { display_name: String, detail: String },

    /// The provider reported the uploaded file as failed.
    #[error("Remote processing failed for '{handle_id}'")]
    ProcessingFailed { handle_id: String },

    /// The poll budget ran out before the file became ready.
    ///
    /// The remote job may still complete; pass `handle_id` to
    /// [`crate::Analyzer::resume`] to keep waiting on it.
    #[error("'{handle_id}' still processing after {attempts} polls")]
    ProcessingTimeout { handle_id: String, attempts: u32 },

    /// A status fetch for an uploaded file failed. The file itself may be
    /// fine; `handle_id` can be resumed.
    #[error("Status check for '{handle_id}' failed: {source}")]
    StatusFetch {
        handle_id: String,
        #[source]
        source: ProviderError,
    },

    /// Any other provider failure (generation call).
    #[error("Inference provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Neither YouTube thumbnail size could be downloaded.
    #[error("Could not fetch thumbnail for video '{video_id}': {detail}")]
    Thumbnail { video_id: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Validation(v) => v.code(),
            AnalysisError::Upload { .. } => "upload_failed",
            AnalysisError::ProcessingFailed { .. } => "processing_failed",
            AnalysisError::ProcessingTimeout { .. } => "processing_timeout",
            AnalysisError::StatusFetch { .. } => "status_fetch_failed",
            AnalysisError::Provider(_) => "provider_error",
            AnalysisError::Thumbnail { .. } => "thumbnail_unavailable",
            AnalysisError::InvalidConfig(_) => "invalid_config",
            AnalysisError::Internal(_) => "internal_error",
        }
    }

    /// Whether submitting the same request again could succeed.
    ///
    /// Validation failures need a different input; everything that went
    /// wrong on the far side of the network may clear up by itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Validation(_) | AnalysisError::InvalidConfig(_) => false,
            AnalysisError::Provider(p) | AnalysisError::StatusFetch { source: p, .. } => {
                p.is_transient()
            }
            AnalysisError::Upload { .. }
            | AnalysisError::ProcessingFailed { .. }
            | AnalysisError::ProcessingTimeout { .. }
            | AnalysisError::Thumbnail { .. }
            | AnalysisError::Internal(_) => true,
        }
    }

    /// The remote handle this error refers to, if any.
    pub fn handle_id(&self) -> Option<&str> {
        match self {
            AnalysisError::ProcessingFailed { handle_id }
            | AnalysisError::ProcessingTimeout { handle_id, .. }
            | AnalysisError::StatusFetch { handle_id, .. } => Some(handle_id),
            _ => None,
        }
    }
}

/// Bad input, detected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        kind: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Unsupported {kind} type '{mime_type}'")]
    UnsupportedType {
        kind: &'static str,
        mime_type: String,
    },

    #[error("Image could not be decoded: {detail}")]
    Undecodable { detail: String },

    #[error("No {what} provided")]
    Empty { what: &'static str },

    #[error("This analysis expects {expected} input, got {actual}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Not a recognised YouTube URL: '{url}'")]
    InvalidVideoUrl { url: String },

    #[error("Missing form field '{field}'")]
    MissingField { field: String },

    #[error("Not an uploaded file handle: '{handle_id}'")]
    InvalidHandle { handle_id: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::TooLarge { .. } => "too_large",
            ValidationError::UnsupportedType { .. } => "unsupported_type",
            ValidationError::Undecodable { .. } => "undecodable",
            ValidationError::Empty { .. } => "empty_input",
            ValidationError::WrongKind { .. } => "wrong_media_kind",
            ValidationError::InvalidVideoUrl { .. } => "invalid_video_url",
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::InvalidHandle { .. } => "invalid_handle",
        }
    }
}

/// A non-fatal normalisation failure.
///
/// Stored alongside [`crate::output::AnalysisResult`]; the raw model text is
/// always kept so the caller can fall back to it.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum NormalizeError {
    /// A `{ … }` span was found but is not valid JSON even after repair.
    #[error("Model output is not valid JSON: {detail}")]
    ParseError { detail: String },
}

/// Errors raised by an [`crate::provider::InferenceProvider`] implementation.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    ResponseParsing(String),

    /// A resumable upload session was opened without an upload URL.
    #[error("Upload session did not return an upload URL")]
    MissingUploadUrl,
}

impl ProviderError {
    /// 429 and 5xx are worth retrying; 4xx are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::ResponseParsing(_) | ProviderError::MissingUploadUrl => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = ValidationError::TooLarge {
            kind: "image",
            size: 6 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("6291456"), "got: {msg}");
        assert!(msg.contains("5242880"), "got: {msg}");
    }

    #[test]
    fn validation_wraps_transparently() {
        let e: AnalysisError = ValidationError::Empty { what: "video file" }.into();
        assert_eq!(e.to_string(), "No video file provided");
        assert_eq!(e.code(), "empty_input");
        assert!(!e.is_retryable());
    }

    #[test]
    fn timeout_carries_handle() {
        let e = AnalysisError::ProcessingTimeout {
            handle_id: "files/abc".into(),
            attempts: 30,
        };
        assert_eq!(e.handle_id(), Some("files/abc"));
        assert!(e.to_string().contains("30 polls"));
        assert!(e.is_retryable());
    }

    #[test]
    fn status_fetch_keeps_handle() {
        let e = AnalysisError::StatusFetch {
            handle_id: "files/abc".into(),
            source: ProviderError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        };
        assert_eq!(e.handle_id(), Some("files/abc"));
        assert_eq!(e.code(), "status_fetch_failed");
        assert!(e.is_retryable());
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn provider_transience() {
        let rate = ProviderError::Api {
            status: 429,
            message: "slow down".into(),
        };
        let bad = ProviderError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert!(rate.is_transient());
        assert!(!bad.is_transient());
        assert!(!AnalysisError::Provider(bad).is_retryable());
    }
}
