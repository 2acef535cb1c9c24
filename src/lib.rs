//! # media-insight
//!
//! Analyse images, charts, flowcharts, videos and YouTube links with a
//! generative vision model (Google Gemini).
//!
//! ## Why this crate?
//!
//! Calling a multimodal model is one HTTP request for an image, but a video
//! has to be uploaded, waited on and referenced by handle, and the answer
//! that comes back is free-form text even when JSON was asked for. This
//! crate puts those steps behind one call: validation before any network
//! I/O, bounded polling for uploads, and best-effort JSON repair of the
//! model's output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! media
//!  │
//!  ├─ 1. Ingest     size / MIME / kind checks, JPEG recompression
//!  ├─ 2. Submit     inline generate, or upload to the file store
//!  ├─ 3. Poll       fixed-interval status checks (uploads only)
//!  ├─ 4. Generate   by reference to the ready file
//!  └─ 5. Normalize  sentinel detection, fence stripping, JSON repair
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use media_insight::{AnalysisRequest, AnalysisTask, Analyzer, AnalyzerConfig, Language, Media};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let analyzer = Analyzer::new(AnalyzerConfig::default())?;
//!     let media = Media::Video {
//!         bytes: std::fs::read("clip.mp4")?,
//!         mime_type: "video/mp4".into(),
//!         file_name: "clip.mp4".into(),
//!     };
//!     let request = AnalysisRequest::for_task(AnalysisTask::VideoReport, media, Language::En);
//!     let outcome = analyzer.analyze(request, AnalysisTask::VideoReport).await?;
//!     if let Some(report) = outcome.report() {
//!         println!("{}", report.result.raw);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP surface ([`server`]) |
//! | `cli`    | on      | The `media-insight` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when using only the library:
//! ```toml
//! media-insight = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::Analyzer;
pub use config::{
    AnalysisTask, AnalyzerConfig, AnalyzerConfigBuilder, Language, MediaKind, MediaLimits,
    OutputFormat, PollPolicy,
};
pub use error::{AnalysisError, NormalizeError, ProviderError, ValidationError};
pub use output::{
    AnalysisOutcome, AnalysisReport, AnalysisResult, JobState, RemoteJobHandle, ResultKind, Usage,
    VideoInfo,
};
pub use pipeline::ingest::{AnalysisRequest, Media, PreparedMedia};
pub use pipeline::normalize::{detect_sentinel, normalize};
pub use pipeline::poll::{PollMachine, PollStep, Poller, ReadyHandle, Sleeper, TokioSleeper};
pub use progress::{NoopProgressCallback, PollProgressCallback, ProgressCallback};
pub use provider::{GeminiProvider, Generation, GenerationOptions, InferenceProvider, Part};
