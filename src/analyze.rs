//! The analysis orchestrator.
//!
//! [`Analyzer`] runs one request through the pipeline stages in order and
//! owns everything the stages share: the provider, the config, the poll
//! sleeper and an HTTP client for thumbnails. It holds no per-request state,
//! so one instance behind an `Arc` serves every request concurrently.

use crate::config::{AnalysisTask, AnalyzerConfig, Language, MediaKind, OutputFormat};
use crate::error::{AnalysisError, ValidationError};
use crate::output::{AnalysisOutcome, AnalysisReport, AnalysisResult, VideoInfo};
use crate::pipeline::ingest::{self, AnalysisRequest, PreparedMedia};
use crate::pipeline::normalize::{detect_sentinel, normalize};
use crate::pipeline::poll::{Poller, Sleeper, TokioSleeper};
use crate::pipeline::submit::{self, Submission};
use crate::pipeline::{encode, youtube};
use crate::prompts;
use crate::provider::{Generation, GeminiProvider, GenerationOptions, InferenceProvider, Part};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Runs analysis requests against an inference provider.
pub struct Analyzer {
    provider: Arc<dyn InferenceProvider>,
    config: AnalyzerConfig,
    sleeper: Arc<dyn Sleeper>,
    http: reqwest::Client,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Create an analyzer backed by Gemini.
    ///
    /// # Errors
    /// [`AnalysisError::InvalidConfig`] when no API key is configured.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let provider = GeminiProvider::from_config(&config)?;
        Self::with_provider(Arc::new(provider), config)
    }

    /// Create an analyzer over any [`InferenceProvider`].
    pub fn with_provider(
        provider: Arc<dyn InferenceProvider>,
        config: AnalyzerConfig,
    ) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            provider,
            config,
            sleeper: Arc::new(TokioSleeper),
            http,
        })
    }

    /// Replace the sleeper used between polls.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run `request` as `task`.
    ///
    /// A task-specific "nothing found" answer is returned as
    /// [`AnalysisOutcome::NoRecognizableContent`], not as an error.
    #[instrument(skip(self, request), fields(task = %task, provider = self.provider.name()))]
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        task: AnalysisTask,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        let (media, instruction, _language) = request.into_parts();
        info!("Starting {} analysis ({} bytes)", task, media.len());

        // ── Step 1: Validate and prepare media ───────────────────────────
        let prepared = self.prepare(media, task).await?;

        // ── Step 2: Resolve YouTube URLs to a thumbnail ──────────────────
        let (prepared, instruction, video) = match prepared {
            PreparedMedia::Remote { url, video_id } => {
                let thumbnail = youtube::fetch_thumbnail(
                    &self.http,
                    &self.config.thumbnail_base_url,
                    &video_id,
                )
                .await?;
                let inline = PreparedMedia::Inline {
                    mime_type: "image/jpeg".to_string(),
                    data: encode::to_base64(&thumbnail.bytes),
                };
                let instruction = format!("{}{}", prompts::youtube_preamble(&url), instruction);
                let info = VideoInfo {
                    video_id,
                    thumbnail: thumbnail.url,
                };
                (inline, instruction, Some(info))
            }
            other => (other, instruction, None),
        };

        // ── Step 3: Submit ───────────────────────────────────────────────
        let model = self.config.model_for(task);
        let submission = submit::submit(
            self.provider.as_ref(),
            prepared,
            &instruction,
            model,
            self.options(),
            self.config.progress_callback.as_ref(),
        )
        .await?;

        // ── Step 4: Poll handle-based jobs, then generate ────────────────
        let (generation, polls) = match submission {
            Submission::Inline(generation) => (generation, None),
            Submission::Handle(handle) => {
                let ready = self.poller().await_ready(self.provider.as_ref(), handle).await?;
                let generation = submit::generate_from_handle(
                    self.provider.as_ref(),
                    &ready.handle,
                    &instruction,
                    model,
                    self.options(),
                )
                .await?;
                (generation, Some(ready.polls))
            }
        };

        // ── Step 5: Sentinel check and normalisation ─────────────────────
        Ok(self.finish(task, generation, video, polls, start))
    }

    /// Keep waiting on a video whose earlier poll ran out of budget, then
    /// finish the analysis with the stock instruction for `task`.
    #[instrument(skip(self), fields(task = %task))]
    pub async fn resume(
        &self,
        handle_id: &str,
        task: AnalysisTask,
        language: Language,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        if task.media_kind() != MediaKind::Video {
            return Err(ValidationError::WrongKind {
                expected: task.media_kind().as_str(),
                actual: MediaKind::Video.as_str(),
            }
            .into());
        }
        let handle_id = ingest::check_handle_id(handle_id)?;

        info!("Resuming {}", handle_id);
        let handle = self
            .provider
            .get_file(handle_id)
            .await
            .map_err(|source| AnalysisError::StatusFetch {
                handle_id: handle_id.to_string(),
                source,
            })?;
        let ready = self.poller().await_ready(self.provider.as_ref(), handle).await?;

        let model = self.config.model_for(task);
        let generation = submit::generate_from_handle(
            self.provider.as_ref(),
            &ready.handle,
            prompts::instruction(task, language),
            model,
            self.options(),
        )
        .await?;
        Ok(self.finish(task, generation, None, Some(ready.polls), start))
    }

    /// Translate `text` into `target`.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> Result<Generation, AnalysisError> {
        if text.trim().is_empty() {
            return Err(ValidationError::Empty { what: "text" }.into());
        }
        let prompt = format!("{}{}", prompts::translation_prompt(target), text);
        let generation = self
            .provider
            .generate(
                &self.config.video_model,
                vec![Part::Text(prompt)],
                self.options(),
            )
            .await?;
        info!(
            "Translated {} chars into {} ({} output tokens)",
            text.len(),
            target.as_str(),
            generation.usage.output_tokens
        );
        Ok(generation)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Image decoding is CPU-bound; recompression runs on the blocking pool.
    async fn prepare(
        &self,
        media: ingest::Media,
        task: AnalysisTask,
    ) -> Result<PreparedMedia, AnalysisError> {
        let limits = self.config.limits;
        if task.recompress_images() && media.kind() == MediaKind::Image {
            let prepared = tokio::task::spawn_blocking(move || ingest::prepare(media, task, &limits))
                .await
                .map_err(|e| AnalysisError::Internal(format!("spawn_blocking panicked: {e}")))??;
            Ok(prepared)
        } else {
            Ok(ingest::prepare(media, task, &limits)?)
        }
    }

    fn poller(&self) -> Poller {
        Poller::new(self.config.poll, Arc::clone(&self.sleeper))
            .with_callback(self.config.progress_callback.clone())
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        }
    }

    fn finish(
        &self,
        task: AnalysisTask,
        generation: Generation,
        video: Option<VideoInfo>,
        polls: Option<u32>,
        start: Instant,
    ) -> AnalysisOutcome {
        if let Some(sentinel) = task.sentinel() {
            if detect_sentinel(&generation.text, sentinel) {
                info!("Model reported no recognizable content for {}", task);
                return AnalysisOutcome::NoRecognizableContent {
                    task,
                    sentinel: sentinel.to_string(),
                };
            }
        }

        let result = match task.output_format() {
            OutputFormat::Json => normalize(&generation.text),
            OutputFormat::Text => AnalysisResult::text(generation.text),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{} finished: {:?}, {} in / {} out tokens",
            task, result.kind, generation.usage.input_tokens, generation.usage.output_tokens
        );
        info!("Analysis complete: {} in {}ms", task, duration_ms);

        AnalysisOutcome::Analysis(AnalysisReport {
            task,
            result,
            video,
            usage: generation.usage,
            polls,
            duration_ms,
        })
    }
}
