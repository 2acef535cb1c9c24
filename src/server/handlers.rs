//! Route handlers.
//!
//! Upload routes take `multipart/form-data` with one media field (named as
//! the original web client sends it) and an optional `language` field. The
//! YouTube, resume and translate routes take JSON.
//!
//! Extractor rejections (malformed JSON, a missing boundary, a body over the
//! router's limit) are rendered as [`ErrorResponse`] bodies like every other
//! failure. The body has not been read at that point, so they use the
//! default language.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisTask, Language, MediaKind};
use crate::error::ValidationError;
use crate::pipeline::ingest::{AnalysisRequest, Media};
use crate::prompts;
use crate::server::response::{outcome_response, ApiError, ErrorResponse, TranslateResponse};
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            provider: state.analyzer.provider_name().to_string(),
        }),
    )
}

// ── Upload routes ────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, multipart))]
pub async fn analyze_image_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_upload(state, multipart, AnalysisTask::ObjectDetection, "image").await
}

#[tracing::instrument(skip(state, multipart))]
pub async fn analyze_chart_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_upload(state, multipart, AnalysisTask::ChartInsights, "file").await
}

#[tracing::instrument(skip(state, multipart))]
pub async fn flowchart_to_code_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_upload(state, multipart, AnalysisTask::FlowchartToCode, "file").await
}

#[tracing::instrument(skip(state, multipart))]
pub async fn analyze_video_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_upload(state, multipart, AnalysisTask::VideoReport, "video").await
}

#[tracing::instrument(skip(state, multipart))]
pub async fn analyze_video_json_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_upload(state, multipart, AnalysisTask::VideoJson, "video").await
}

/// The parts of an upload form this service reads.
struct UploadForm {
    file: Option<UploadedFile>,
    language: Language,
}

struct UploadedFile {
    bytes: Vec<u8>,
    mime_type: String,
    file_name: String,
}

async fn run_upload(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
    task: AnalysisTask,
    file_field: &str,
) -> Response {
    let kind = task.media_kind();
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected upload form");
            return rejection_response(
                rejection.status(),
                kind,
                Language::default(),
                rejection.body_text(),
            );
        }
    };
    let form = match read_form(multipart, file_field, kind).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let language = form.language;

    let Some(file) = form.file else {
        tracing::warn!(field = file_field, "Upload request with no file");
        return ApiError::new(ValidationError::Empty { what: kind.as_str() }, language)
            .into_response();
    };
    tracing::debug!(
        file_name = %file.file_name,
        content_type = %file.mime_type,
        bytes = file.bytes.len(),
        "File data received"
    );

    let media = match kind {
        MediaKind::Video => Media::Video {
            bytes: file.bytes,
            mime_type: file.mime_type,
            file_name: file.file_name,
        },
        _ => Media::Image {
            bytes: file.bytes,
            mime_type: file.mime_type,
            file_name: file.file_name,
        },
    };

    let request = AnalysisRequest::for_task(task, media, language);
    match state.analyzer.analyze(request, task).await {
        Ok(outcome) => outcome_response(outcome, language),
        Err(e) => ApiError::new(e, language).into_response(),
    }
}

async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    kind: MediaKind,
) -> Result<UploadForm, Response> {
    let mut form = UploadForm {
        file: None,
        language: Language::default(),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e, kind, form.language)),
        };
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, kind, form.language))?;
            form.file = Some(UploadedFile {
                bytes: bytes.to_vec(),
                mime_type,
                file_name,
            });
        } else if name == "language" {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e, kind, form.language))?;
            form.language = Language::parse_lenient(Some(&text));
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, kind: MediaKind, language: Language) -> Response {
    tracing::warn!(error = %e, "Failed to read multipart");
    rejection_response(e.status(), kind, language, e.body_text())
}

/// Error body for a form that could not be read. A body over the router's
/// limit reports the same `too_large` code as an oversized file.
fn rejection_response(
    status: StatusCode,
    kind: MediaKind,
    language: Language,
    detail: String,
) -> Response {
    let m = prompts::messages(language);
    let (code, message) = if status == StatusCode::PAYLOAD_TOO_LARGE {
        let message = if kind == MediaKind::Video {
            m.video_too_large
        } else {
            m.image_too_large
        };
        ("too_large", message)
    } else {
        ("invalid_multipart", m.invalid_form)
    };
    tracing::debug!(status = %status, detail = %detail, "Upload form rejected");
    error_body(status, code, message)
}

fn json_rejection(rejection: JsonRejection) -> Response {
    tracing::warn!(error = %rejection, "Rejected JSON body");
    let status = rejection.status();
    let m = prompts::messages(Language::default());
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return error_body(status, "too_large", m.request_too_large);
    }
    error_body(status, "invalid_json", m.invalid_json)
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            handle_id: None,
        }),
    )
        .into_response()
}

// ── JSON routes ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct YoutubeRequest {
    pub url: Option<String>,
    pub language: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn analyze_youtube_handler(
    State(state): State<AppState>,
    payload: Result<Json<YoutubeRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };
    let language = Language::parse_lenient(body.language.as_deref());
    let url = body.url.unwrap_or_default();
    let task = AnalysisTask::YoutubeReport;

    let request = AnalysisRequest::for_task(task, Media::RemoteUrl(url), language);
    match state.analyzer.analyze(request, task).await {
        Ok(outcome) => outcome_response(outcome, language),
        Err(e) => ApiError::new(e, language).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub handle_id: Option<String>,
    /// `"json"` for the structured report, anything else for prose.
    pub format: Option<String>,
    pub language: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn resume_video_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResumeRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };
    let language = Language::parse_lenient(body.language.as_deref());
    let task = match body.format.as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => AnalysisTask::VideoJson,
        _ => AnalysisTask::VideoReport,
    };
    let handle_id = body.handle_id.unwrap_or_default();

    match state.analyzer.resume(&handle_id, task, language).await {
        Ok(outcome) => outcome_response(outcome, language),
        Err(e) => ApiError::new(e, language).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: Option<String>,
    /// Target language; Arabic when omitted.
    pub language: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
pub async fn translate_handler(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };
    let target = body
        .language
        .as_deref()
        .and_then(|l| l.parse().ok())
        .unwrap_or(Language::Ar);
    let text = body.text.unwrap_or_default();

    match state.analyzer.translate(&text, target).await {
        Ok(generation) => (
            StatusCode::OK,
            Json(TranslateResponse {
                translated_text: generation.text,
                success: true,
            }),
        )
            .into_response(),
        Err(e) => ApiError::new(e, target).into_response(),
    }
}
