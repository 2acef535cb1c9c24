//! Response bodies and the mapping from pipeline errors to HTTP.
//!
//! | Error | Status |
//! |-------|--------|
//! | `Validation(TooLarge)` | 413 |
//! | `Validation(UnsupportedType)` | 415 |
//! | other `Validation` | 400 |
//! | `Upload`, `Provider`, `StatusFetch`, `ProcessingFailed`, `Thumbnail` | 502 |
//! | `ProcessingTimeout` | 504 |
//! | `InvalidConfig`, `Internal` | 500 |
//!
//! Error messages come from the bilingual table in [`crate::prompts`]; the
//! English `Display` text of the error is only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::{AnalysisTask, Language, MediaKind};
use crate::error::{AnalysisError, ValidationError};
use crate::output::{AnalysisOutcome, AnalysisReport, ResultKind, Usage, VideoInfo};
use crate::prompts::{self, Messages};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// Parsed JSON for structured results, otherwise the model's text.
    pub analysis: serde_json::Value,
    pub kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polls: Option<u32>,
    pub duration_ms: u64,
}

impl From<AnalysisReport> for AnalysisResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            analysis: report.result.to_json_value(),
            kind: report.result.kind,
            parse_error: report.result.error.map(|e| e.to_string()),
            video_info: report.video,
            usage: report.usage,
            polls: report.polls,
            duration_ms: report.duration_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub success: bool,
}

/// Turn a pipeline outcome into a 200 response.
pub fn outcome_response(outcome: AnalysisOutcome, language: Language) -> Response {
    match outcome {
        AnalysisOutcome::Analysis(report) => {
            (StatusCode::OK, Json(AnalysisResponse::from(report))).into_response()
        }
        AnalysisOutcome::NoRecognizableContent { task, .. } => {
            tracing::info!(task = %task, "No recognizable content");
            (
                StatusCode::OK,
                Json(ErrorResponse {
                    error: no_content_message(task, prompts::messages(language)).to_string(),
                    code: "no_recognizable_content".to_string(),
                    handle_id: None,
                }),
            )
                .into_response()
        }
    }
}

/// A pipeline error rendered in the caller's language.
#[derive(Debug)]
pub struct ApiError {
    pub error: AnalysisError,
    pub language: Language,
}

impl ApiError {
    pub fn new(error: impl Into<AnalysisError>, language: Language) -> Self {
        Self {
            error: error.into(),
            language,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            tracing::error!(error = %self.error, code = self.error.code(), "Request failed");
        } else {
            tracing::warn!(error = %self.error, code = self.error.code(), "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: message_for(&self.error, prompts::messages(self.language)).to_string(),
                code: self.error.code().to_string(),
                handle_id: self.error.handle_id().map(String::from),
            }),
        )
            .into_response()
    }
}

pub fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        AnalysisError::Validation(ValidationError::UnsupportedType { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Upload { .. }
        | AnalysisError::Provider(_)
        | AnalysisError::StatusFetch { .. }
        | AnalysisError::ProcessingFailed { .. }
        | AnalysisError::Thumbnail { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::ProcessingTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AnalysisError::InvalidConfig(_) | AnalysisError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn message_for(error: &AnalysisError, m: &'static Messages) -> &'static str {
    match error {
        AnalysisError::Validation(v) => match v {
            ValidationError::TooLarge { kind, .. } if *kind == MediaKind::Video.as_str() => {
                m.video_too_large
            }
            ValidationError::TooLarge { .. } => m.image_too_large,
            ValidationError::UnsupportedType { .. } => m.unsupported_type,
            ValidationError::Undecodable { .. } => m.undecodable_image,
            ValidationError::Empty { what } => empty_message(what, m),
            ValidationError::MissingField { field } if field == "text" => m.no_text,
            ValidationError::MissingField { field } if field == "url" => m.no_url,
            ValidationError::MissingField { .. } => m.missing_field,
            ValidationError::WrongKind { .. } => m.wrong_media_kind,
            ValidationError::InvalidVideoUrl { .. } => m.invalid_video_url,
            ValidationError::InvalidHandle { .. } => m.invalid_handle,
        },
        AnalysisError::Upload { .. } => m.upload_failed,
        AnalysisError::ProcessingFailed { .. } => m.processing_failed,
        AnalysisError::ProcessingTimeout { .. } => m.processing_timeout,
        AnalysisError::StatusFetch { .. } => m.status_fetch_failed,
        AnalysisError::Provider(_) => m.upstream_error,
        AnalysisError::Thumbnail { .. } => m.thumbnail_unavailable,
        AnalysisError::InvalidConfig(_) | AnalysisError::Internal(_) => m.internal_error,
    }
}

fn empty_message(what: &str, m: &'static Messages) -> &'static str {
    if what == MediaKind::Image.as_str() {
        m.no_image
    } else if what == MediaKind::Video.as_str() {
        m.no_video
    } else if what == MediaKind::RemoteUrl.as_str() {
        m.no_url
    } else {
        m.no_text
    }
}

fn no_content_message(task: AnalysisTask, m: &'static Messages) -> &'static str {
    match task {
        AnalysisTask::FlowchartToCode => m.no_flowchart,
        _ => m.no_chart,
    }
}
