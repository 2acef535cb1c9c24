//! Configuration types for media analysis.
//!
//! All pipeline behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. One struct for every knob makes it trivial
//! to share a config between the HTTP server and the CLI and to log exactly
//! which limits and models a run used.
//!
//! The task catalogue ([`AnalysisTask`]) and the response language
//! ([`Language`]) live here too: both are plain value enums that the prompt
//! tables, the ingestor and the HTTP layer all key on.

use crate::error::AnalysisError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default public Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default YouTube thumbnail host.
pub const DEFAULT_THUMBNAIL_BASE_URL: &str = "https://img.youtube.com/vi";

/// Configuration for an [`crate::Analyzer`].
///
/// Built via [`AnalyzerConfig::builder()`] or using
/// [`AnalyzerConfig::default()`].
///
/// # Example
/// ```rust
/// use media_insight::AnalyzerConfig;
/// use std::time::Duration;
///
/// let config = AnalyzerConfig::builder()
///     .video_model("gemini-1.5-pro")
///     .poll_max_attempts(60)
///     .poll_interval(Duration::from_secs(2))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Gemini API key. If None, `GEMINI_API_KEY` is read when the provider
    /// is created.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Model used for inline image tasks. Default: "gemini-2.0-flash".
    pub vision_model: String,

    /// Model used for uploaded video and YouTube tasks. Default: "gemini-1.5-pro".
    ///
    /// Long-context models handle minutes of video; the flash tier is
    /// cheaper but drops detail on longer clips.
    pub video_model: String,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 8192.
    ///
    /// The structured video report regularly exceeds 4 000 tokens; a lower
    /// cap truncates the JSON and forces the normaliser into its text
    /// fallback.
    pub max_output_tokens: u32,

    /// Per-HTTP-request timeout in seconds (upload, poll, generate). Default: 120.
    pub request_timeout_secs: u64,

    /// How long to wait for an uploaded file to finish processing.
    pub poll: PollPolicy,

    /// Upload size limits and image recompression settings.
    pub limits: MediaLimits,

    /// Base URL for YouTube thumbnails. Default: [`DEFAULT_THUMBNAIL_BASE_URL`].
    pub thumbnail_base_url: String,

    /// Receives upload and poll events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: "gemini-2.0-flash".to_string(),
            video_model: "gemini-1.5-pro".to_string(),
            temperature: 0.4,
            max_output_tokens: 8192,
            request_timeout_secs: 120,
            poll: PollPolicy::default(),
            limits: MediaLimits::default(),
            thumbnail_base_url: DEFAULT_THUMBNAIL_BASE_URL.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("vision_model", &self.vision_model)
            .field("video_model", &self.video_model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll", &self.poll)
            .field("limits", &self.limits)
            .field("thumbnail_base_url", &self.thumbnail_base_url)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PollProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model a task should run on.
    pub fn model_for(&self, task: AnalysisTask) -> &str {
        match task.media_kind() {
            MediaKind::Image => &self.vision_model,
            MediaKind::Video | MediaKind::RemoteUrl => &self.video_model,
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn video_model(mut self, model: impl Into<String>) -> Self {
        self.config.video_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn poll(mut self, policy: PollPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn poll_max_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = n;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.interval = interval;
        self
    }

    pub fn poll_deadline(mut self, deadline: Duration) -> Self {
        self.config.poll.deadline = Some(deadline);
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.limits.max_image_bytes = n;
        self
    }

    pub fn max_video_bytes(mut self, n: usize) -> Self {
        self.config.limits.max_video_bytes = n;
        self
    }

    pub fn target_width(mut self, px: u32) -> Self {
        self.config.limits.target_width = px.max(16);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.limits.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn thumbnail_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.thumbnail_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalysisError> {
        let c = &self.config;
        if c.poll.max_attempts == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Poll max_attempts must be ≥ 1".into(),
            ));
        }
        if c.limits.max_image_bytes == 0 || c.limits.max_video_bytes == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Upload size limits must be non-zero".into(),
            ));
        }
        if c.vision_model.trim().is_empty() || c.video_model.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "Model names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Bounded, fixed-interval polling policy for handle-based jobs.
///
/// The attempt cap is the primary budget. `deadline` optionally adds a
/// wall-clock ceiling on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of status re-fetches. Default: 30.
    pub max_attempts: u32,
    /// Pause before each re-fetch. Default: 1 s.
    pub interval: Duration,
    /// Optional wall-clock limit for the whole wait. Default: None.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Upload limits and image recompression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLimits {
    /// Default: 5 MiB.
    pub max_image_bytes: usize,
    /// Default: 10 MiB.
    pub max_video_bytes: usize,
    /// Images wider than this are scaled down before upload. Default: 800.
    pub target_width: u32,
    /// JPEG quality for recompressed images. Default: 80.
    pub jpeg_quality: u8,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
            max_video_bytes: 10 * 1024 * 1024,
            target_width: 800,
            jpeg_quality: 80,
        }
    }
}

impl MediaLimits {
    pub fn limit_for(&self, kind: MediaKind) -> Option<usize> {
        match kind {
            MediaKind::Image => Some(self.max_image_bytes),
            MediaKind::Video => Some(self.max_video_bytes),
            MediaKind::RemoteUrl => None,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What kind of media a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    RemoteUrl,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::RemoteUrl => "remote URL",
        }
    }
}

/// Whether a task asks the model for prose or for a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

/// The analyses this service offers.
///
/// | Task | Media | Output | Sentinel |
/// |------|-------|--------|----------|
/// | `ObjectDetection` | image | JSON | – |
/// | `ChartInsights` | image | text | "no chart or data visualization detected" |
/// | `FlowchartToCode` | image | text | "no flowchart detected" |
/// | `VideoReport` | video | text | – |
/// | `VideoJson` | video | JSON | – |
/// | `YoutubeReport` | YouTube URL | text | – |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisTask {
    ObjectDetection,
    ChartInsights,
    FlowchartToCode,
    VideoReport,
    VideoJson,
    YoutubeReport,
}

impl AnalysisTask {
    pub const ALL: [AnalysisTask; 6] = [
        AnalysisTask::ObjectDetection,
        AnalysisTask::ChartInsights,
        AnalysisTask::FlowchartToCode,
        AnalysisTask::VideoReport,
        AnalysisTask::VideoJson,
        AnalysisTask::YoutubeReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTask::ObjectDetection => "object-detection",
            AnalysisTask::ChartInsights => "chart-insights",
            AnalysisTask::FlowchartToCode => "flowchart-to-code",
            AnalysisTask::VideoReport => "video-report",
            AnalysisTask::VideoJson => "video-json",
            AnalysisTask::YoutubeReport => "youtube-report",
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            AnalysisTask::ObjectDetection
            | AnalysisTask::ChartInsights
            | AnalysisTask::FlowchartToCode => MediaKind::Image,
            AnalysisTask::VideoReport | AnalysisTask::VideoJson => MediaKind::Video,
            AnalysisTask::YoutubeReport => MediaKind::RemoteUrl,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        match self {
            AnalysisTask::ObjectDetection | AnalysisTask::VideoJson => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }

    /// Phrase the prompt tells the model to emit when the input does not
    /// contain what the task looks for.
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            AnalysisTask::ChartInsights => Some("no chart or data visualization detected"),
            AnalysisTask::FlowchartToCode => Some("no flowchart detected"),
            _ => None,
        }
    }

    /// Object detection works on a downscaled JPEG; chart and flowchart
    /// reading needs the original pixels.
    pub fn recompress_images(&self) -> bool {
        matches!(self, AnalysisTask::ObjectDetection)
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisTask::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown analysis task: {}", s))
    }
}

/// Language the model should answer in, and the language of error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (default).
    #[default]
    En,
    /// Arabic.
    Ar,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    /// Parse a language tag, falling back to the default for anything
    /// unrecognised. Form fields arrive as free text.
    pub fn parse_lenient(tag: Option<&str>) -> Self {
        tag.and_then(|t| t.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.poll.max_attempts, 30);
        assert_eq!(c.poll.interval, Duration::from_secs(1));
        assert_eq!(c.limits.max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(c.limits.target_width, 800);
        assert_eq!(c.limits.jpeg_quality, 80);
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = AnalyzerConfig::builder().poll_max_attempts(0).build();
        assert!(matches!(err, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn builder_clamps_and_trims() {
        let c = AnalyzerConfig::builder()
            .jpeg_quality(0)
            .temperature(9.0)
            .base_url("http://localhost:9000/")
            .build()
            .unwrap();
        assert_eq!(c.limits.jpeg_quality, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.base_url, "http://localhost:9000");
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = AnalyzerConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn model_selection_follows_media_kind() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.model_for(AnalysisTask::ChartInsights), "gemini-2.0-flash");
        assert_eq!(c.model_for(AnalysisTask::VideoJson), "gemini-1.5-pro");
        assert_eq!(c.model_for(AnalysisTask::YoutubeReport), "gemini-1.5-pro");
    }

    #[test]
    fn task_round_trips_through_str() {
        for task in AnalysisTask::ALL {
            assert_eq!(task.as_str().parse::<AnalysisTask>(), Ok(task));
        }
        assert!("nonsense".parse::<AnalysisTask>().is_err());
    }

    #[test]
    fn language_parsing_is_lenient() {
        assert_eq!(Language::parse_lenient(Some("AR")), Language::Ar);
        assert_eq!(Language::parse_lenient(Some("fr")), Language::En);
        assert_eq!(Language::parse_lenient(None), Language::En);
    }

    #[test]
    fn only_object_detection_recompresses() {
        assert!(AnalysisTask::ObjectDetection.recompress_images());
        assert!(!AnalysisTask::ChartInsights.recompress_images());
        assert!(!AnalysisTask::FlowchartToCode.recompress_images());
    }
}
