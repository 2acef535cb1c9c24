//! Google Gemini REST adapter.
//!
//! Three endpoints are used:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | generate | `POST v1beta/models/{model}:generateContent` |
//! | upload   | `POST upload/v1beta/files` (resumable: start, then upload+finalize) |
//! | status   | `GET v1beta/{files/id}` |
//!
//! The API key travels in the `x-goog-api-key` header rather than the query
//! string so it never shows up in request logs.

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, ProviderError};
use crate::output::{JobState, RemoteJobHandle, Usage};
use crate::provider::{Generation, GenerationOptions, InferenceProvider, Part};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini client holding one pooled `reqwest::Client`.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a provider from the analyzer config.
    ///
    /// Uses `config.api_key` when set, else `GEMINI_API_KEY`.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalysisError> {
        let api_key = match &config.api_key {
            Some(k) if !k.is_empty() => k.clone(),
            _ => std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AnalysisError::InvalidConfig(
                        "No Gemini API key configured.\nSet GEMINI_API_KEY or pass --api-key."
                            .into(),
                    )
                })?,
        };
        Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        error!(status, error = %message, "Gemini API error");
        ProviderError::Api { status, message }
    }
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, parts, options), fields(parts = parts.len()))]
    async fn generate(
        &self,
        model: &str,
        parts: Vec<Part>,
        options: GenerationOptions,
    ) -> Result<Generation, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: parts.into_iter().map(WirePart::from).collect(),
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        let text = parsed.text().ok_or_else(|| {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            ProviderError::ResponseParsing(format!("empty response: {reason}"))
        })?;

        let usage = parsed
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            chars = text.len(),
            "Generation complete"
        );

        Ok(Generation { text, usage })
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteJobHandle, ProviderError> {
        // Step 1: open a resumable session.
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !start.status().is_success() {
            return Err(Self::read_error(start).await);
        }

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ProviderError::MissingUploadUrl)?
            .to_string();

        // Step 2: send the bytes and finalize in one request.
        let response = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        debug!(file = %uploaded.file.name, state = ?uploaded.file.state, "Upload finalized");
        Ok(uploaded.file.into())
    }

    #[instrument(skip(self))]
    async fn get_file(&self, id: &str) -> Result<RemoteJobHandle, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.base_url, id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let file: WireFile = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;
        Ok(file.into())
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileRef,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FileRef {
    mime_type: String,
    file_uri: String,
}

impl From<Part> for WirePart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => WirePart::Text { text },
            Part::InlineData { mime_type, data } => WirePart::Inline {
                inline_data: Blob { mime_type, data },
            },
            Part::FileData {
                mime_type,
                file_uri,
            } => WirePart::File {
                file_data: FileRef {
                    mime_type,
                    file_uri,
                },
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, None when it has no text.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: Option<String>,
}

impl From<WireFile> for RemoteJobHandle {
    fn from(f: WireFile) -> Self {
        RemoteJobHandle {
            state: map_state(f.state.as_deref()),
            id: f.name,
            uri: f.uri,
            mime_type: f.mime_type,
        }
    }
}

/// Gemini file states: `STATE_UNSPECIFIED`, `PROCESSING`, `ACTIVE`, `FAILED`.
fn map_state(state: Option<&str>) -> JobState {
    match state {
        Some("PROCESSING") => JobState::Processing,
        Some("ACTIVE") => JobState::Ready,
        Some("FAILED") => JobState::Failed,
        _ => JobState::Pending,
    }
}
