//! Gemini adapter tests against a local mock of the REST API.
//!
//! The mock server speaks just enough of `generateContent`, the resumable
//! upload protocol, the file-status endpoint and the YouTube thumbnail host
//! to drive the real `GeminiProvider` over HTTP.

#![cfg(feature = "server")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use media_insight::{
    AnalysisRequest, AnalysisTask, Analyzer, AnalyzerConfig, GeminiProvider, GenerationOptions,
    InferenceProvider, JobState, Language, Media, Part, ProviderError, Sleeper,
};

const API_KEY: &str = "test-key";

// ── Mock server ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MockGemini {
    base: String,
    reply: String,
    fail_status: Option<u16>,
    omit_upload_url: bool,
    generate_bodies: Arc<Mutex<Vec<Value>>>,
    seen_keys: Arc<Mutex<Vec<String>>>,
    uploaded_bytes: Arc<Mutex<usize>>,
}

impl MockGemini {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn record_key(&self, headers: &HeaderMap) {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.seen_keys.lock().unwrap().push(key);
    }
}

async fn generate(
    State(mock): State<MockGemini>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    assert!(model_action.ends_with(":generateContent"), "{model_action}");
    mock.record_key(&headers);
    mock.generate_bodies.lock().unwrap().push(body);

    if let Some(status) = mock.fail_status {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "quota exceeded").into_response();
    }
    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": mock.reply }] } }],
        "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 2 }
    }))
    .into_response()
}

async fn upload_start(State(mock): State<MockGemini>, headers: HeaderMap) -> Response {
    mock.record_key(&headers);
    assert_eq!(headers["x-goog-upload-command"], "start");
    if mock.omit_upload_url {
        return StatusCode::OK.into_response();
    }
    (
        [("x-goog-upload-url", format!("{}/upload-session/1", mock.base))],
        StatusCode::OK,
    )
        .into_response()
}

async fn upload_finalize(
    State(mock): State<MockGemini>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    assert_eq!(headers["x-goog-upload-command"], "upload, finalize");
    *mock.uploaded_bytes.lock().unwrap() = body.len();
    Json(json!({
        "file": {
            "name": "files/abc",
            "uri": format!("{}/v1beta/files/abc", mock.base),
            "mimeType": "video/mp4",
            "state": "PROCESSING"
        }
    }))
}

async fn file_status(State(mock): State<MockGemini>, Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "name": format!("files/{id}"),
        "uri": format!("{}/v1beta/files/{id}", mock.base),
        "mimeType": "video/mp4",
        "state": "ACTIVE"
    }))
}

async fn thumbnail(Path((_id, file)): Path<(String, String)>) -> Response {
    if file == "hqdefault.jpg" {
        ([("content-type", "image/jpeg")], jpeg()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn spawn(mut mock: MockGemini) -> MockGemini {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    mock.base = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/v1beta/models/{model_action}", post(generate))
        .route("/upload/v1beta/files", post(upload_start))
        .route("/upload-session/1", post(upload_finalize))
        .route("/v1beta/files/{id}", get(file_status))
        .route("/vi/{id}/{file}", get(thumbnail))
        .with_state(mock.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    mock
}

fn jpeg() -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([200, 0, 0])));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

struct NoSleep;

#[async_trait::async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn provider(mock: &MockGemini) -> GeminiProvider {
    GeminiProvider::new(API_KEY, &mock.base, Duration::from_secs(5)).unwrap()
}

fn analyzer(mock: &MockGemini) -> Analyzer {
    let config = AnalyzerConfig::builder()
        .api_key(API_KEY)
        .base_url(&mock.base)
        .thumbnail_base_url(format!("{}/vi", mock.base))
        .build()
        .unwrap();
    Analyzer::new(config).unwrap().with_sleeper(Arc::new(NoSleep))
}

const OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.4,
    max_output_tokens: 256,
};

// ── Provider calls ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_sends_rest_shape() {
    let mock = spawn(MockGemini::replying("A red square.")).await;

    let generation = provider(&mock)
        .generate(
            "gemini-2.0-flash",
            vec![
                Part::InlineData {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                },
                Part::Text("Describe this image.".into()),
            ],
            OPTIONS,
        )
        .await
        .unwrap();

    assert_eq!(generation.text, "A red square.");
    assert_eq!(generation.usage.input_tokens, 7);
    assert_eq!(generation.usage.output_tokens, 2);
    assert_eq!(mock.seen_keys.lock().unwrap().as_slice(), [API_KEY]);

    let bodies = mock.generate_bodies.lock().unwrap();
    let body = &bodies[0];
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(body["contents"][0]["parts"][1]["text"], "Describe this image.");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
}

#[tokio::test]
async fn test_api_error_keeps_status() {
    let mock = spawn(MockGemini {
        fail_status: Some(429),
        ..MockGemini::default()
    })
    .await;

    let err = provider(&mock)
        .generate("gemini-2.0-flash", vec![Part::Text("hi".into())], OPTIONS)
        .await
        .unwrap_err();

    match &err {
        ProviderError::Api { status, message } => {
            assert_eq!(*status, 429);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_resumable_upload_and_status() {
    let mock = spawn(MockGemini::default()).await;
    let gemini = provider(&mock);

    let handle = gemini
        .upload_file(vec![1u8; 4096], "video/mp4", "clip.mp4")
        .await
        .unwrap();
    assert_eq!(handle.id, "files/abc");
    assert_eq!(handle.state, JobState::Processing);
    assert_eq!(*mock.uploaded_bytes.lock().unwrap(), 4096);

    let refreshed = gemini.get_file(&handle.id).await.unwrap();
    assert_eq!(refreshed.state, JobState::Ready);
    assert_eq!(refreshed.uri, handle.uri);
}

#[tokio::test]
async fn test_upload_without_session_url_fails() {
    let mock = spawn(MockGemini {
        omit_upload_url: true,
        ..MockGemini::default()
    })
    .await;

    let err = provider(&mock)
        .upload_file(vec![1u8; 16], "video/mp4", "clip.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::MissingUploadUrl));
}

// ── Through the analyzer ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_video_analysis_over_http() {
    let mock = spawn(MockGemini::replying("## Summary\nA short clip.")).await;

    let media = Media::Video {
        bytes: vec![0u8; 2048],
        mime_type: "video/mp4".into(),
        file_name: "clip.mp4".into(),
    };
    let request = AnalysisRequest::for_task(AnalysisTask::VideoReport, media, Language::En);
    let report = analyzer(&mock)
        .analyze(request, AnalysisTask::VideoReport)
        .await
        .unwrap()
        .into_report()
        .unwrap();

    assert_eq!(report.polls, Some(1));
    assert!(report.result.raw.contains("A short clip."));

    let bodies = mock.generate_bodies.lock().unwrap();
    let file_part = &bodies[0]["contents"][0]["parts"][0]["fileData"];
    assert_eq!(file_part["fileUri"], format!("{}/v1beta/files/abc", mock.base));
}

#[tokio::test]
async fn test_youtube_falls_back_to_hq_thumbnail() {
    let mock = spawn(MockGemini::replying("A music video.")).await;

    let request = AnalysisRequest::for_task(
        AnalysisTask::YoutubeReport,
        Media::RemoteUrl("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
        Language::En,
    );
    let report = analyzer(&mock)
        .analyze(request, AnalysisTask::YoutubeReport)
        .await
        .unwrap()
        .into_report()
        .unwrap();

    let video = report.video.unwrap();
    assert_eq!(video.video_id, "dQw4w9WgXcQ");
    assert!(video.thumbnail.ends_with("/dQw4w9WgXcQ/hqdefault.jpg"));

    let bodies = mock.generate_bodies.lock().unwrap();
    let parts = &bodies[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert!(parts[1]["text"]
        .as_str()
        .unwrap()
        .contains("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
}
