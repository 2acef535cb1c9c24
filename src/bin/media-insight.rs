//! CLI binary for media-insight.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, the other
//! subcommands run one pipeline and print the result.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use media_insight::server::{self, AppState};
use media_insight::{
    prompts, AnalysisError, AnalysisOutcome, AnalysisRequest, AnalysisTask, Analyzer,
    AnalyzerConfig, JobState, Language, Media, PollProgressCallback, ProgressCallback,
    RemoteJobHandle,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows an upload through processing.
struct CliPollCallback {
    bar: ProgressBar,
}

impl CliPollCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.set_message("waiting for the model…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PollProgressCallback for CliPollCallback {
    fn on_upload_start(&self, display_name: &str, size: usize) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!(
            "{display_name} {}",
            dim(&format!("({:.1} MiB)", size as f64 / (1024.0 * 1024.0)))
        ));
    }

    fn on_upload_complete(&self, handle: &RemoteJobHandle) {
        self.bar.println(format!(
            "  {} Uploaded as {}",
            green("✓"),
            bold(&handle.id)
        ));
        self.bar.set_prefix("Processing");
        self.bar.set_message(handle.state.to_string());
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, state: JobState) {
        self.bar
            .set_message(format!("{state}  {}", dim(&format!("poll {attempt}/{max_attempts}"))));
    }

    fn on_ready(&self, _handle: &RemoteJobHandle, attempts: u32) {
        self.bar.println(format!(
            "  {} Ready after {} polls",
            green("✓"),
            attempts
        ));
        self.bar.set_prefix("Analyzing");
        self.bar.set_message("waiting for the model…");
    }

    fn on_give_up(&self, handle_id: &str, attempts: u32, reason: &str) {
        self.bar.println(format!(
            "  {} {} gave up after {} polls: {}",
            red("✗"),
            handle_id,
            attempts,
            red(reason)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 3000
  media-insight serve --port 3000

  # Structured report for a local video
  media-insight analyze video-json clip.mp4

  # Object detection, raw JSON outcome
  media-insight analyze object-detection photo.jpg --json

  # Arabic report for a YouTube video
  media-insight analyze youtube-report https://youtu.be/dQw4w9WgXcQ --language ar

  # Keep waiting on a video that timed out earlier
  media-insight resume files/abc123 --format json

  # Translate text into Arabic
  media-insight translate "Quarterly revenue grew by 12%."

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY               Google Gemini API key
  MEDIA_INSIGHT_BASE_URL       Override the Gemini REST endpoint
  MEDIA_INSIGHT_VISION_MODEL   Model for image tasks
  MEDIA_INSIGHT_VIDEO_MODEL    Model for video and YouTube tasks
  RUST_LOG                     Log filter (overrides --verbose / --quiet)
"#;

/// Analyse images, charts, flowcharts and videos with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "media-insight",
    version,
    about = "Analyse images, charts, flowcharts and videos with Gemini",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, env = "MEDIA_INSIGHT_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Model for image tasks.
    #[arg(long, env = "MEDIA_INSIGHT_VISION_MODEL", global = true)]
    vision_model: Option<String>,

    /// Model for video and YouTube tasks.
    #[arg(long, env = "MEDIA_INSIGHT_VIDEO_MODEL", global = true)]
    video_model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "MEDIA_INSIGHT_TEMPERATURE", global = true, default_value_t = 0.4)]
    temperature: f32,

    /// Max output tokens per generation.
    #[arg(long, env = "MEDIA_INSIGHT_MAX_TOKENS", global = true, default_value_t = 8192)]
    max_tokens: u32,

    /// Status fetches before giving up on an uploaded video.
    #[arg(long, env = "MEDIA_INSIGHT_POLL_ATTEMPTS", global = true, default_value_t = 30)]
    poll_attempts: u32,

    /// Milliseconds between status fetches.
    #[arg(long, env = "MEDIA_INSIGHT_POLL_INTERVAL_MS", global = true, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Optional wall-clock limit for the whole wait, in seconds.
    #[arg(long, env = "MEDIA_INSIGHT_POLL_DEADLINE", global = true)]
    poll_deadline: Option<u64>,

    /// Largest accepted image, in bytes.
    #[arg(long, env = "MEDIA_INSIGHT_MAX_IMAGE_BYTES", global = true, default_value_t = 5 * 1024 * 1024)]
    max_image_bytes: usize,

    /// Largest accepted video, in bytes.
    #[arg(long, env = "MEDIA_INSIGHT_MAX_VIDEO_BYTES", global = true, default_value_t = 10 * 1024 * 1024)]
    max_video_bytes: usize,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "MEDIA_INSIGHT_API_TIMEOUT", global = true, default_value_t = 120)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDIA_INSIGHT_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MEDIA_INSIGHT_QUIET", global = true)]
    quiet: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "MEDIA_INSIGHT_JSON_LOGS", global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "MEDIA_INSIGHT_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "MEDIA_INSIGHT_PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Run one analysis on a local file or a YouTube URL.
    Analyze {
        #[arg(value_enum)]
        task: TaskArg,
        /// File path, or a URL for youtube-report.
        input: String,
        /// Answer language: en or ar.
        #[arg(short, long, default_value = "en")]
        language: String,
        /// MIME type of the file; guessed from the extension when omitted.
        #[arg(long)]
        mime_type: Option<String>,
        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
        /// Disable the spinner.
        #[arg(long)]
        no_progress: bool,
    },
    /// Keep waiting on an uploaded video and finish its analysis.
    Resume {
        handle_id: String,
        /// text or json.
        #[arg(long, default_value = "text")]
        format: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        #[arg(long)]
        json: bool,
    },
    /// Translate text.
    Translate {
        text: String,
        /// Target language: ar or en.
        #[arg(short, long, default_value = "ar")]
        language: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TaskArg {
    ObjectDetection,
    ChartInsights,
    FlowchartToCode,
    VideoReport,
    VideoJson,
    YoutubeReport,
}

impl From<TaskArg> for AnalysisTask {
    fn from(v: TaskArg) -> Self {
        match v {
            TaskArg::ObjectDetection => AnalysisTask::ObjectDetection,
            TaskArg::ChartInsights => AnalysisTask::ChartInsights,
            TaskArg::FlowchartToCode => AnalysisTask::FlowchartToCode,
            TaskArg::VideoReport => AnalysisTask::VideoReport,
            TaskArg::VideoJson => AnalysisTask::VideoJson,
            TaskArg::YoutubeReport => AnalysisTask::YoutubeReport,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers one-shot runs; only `serve` logs at INFO by default.
    let serving = matches!(cli.command, Command::Serve { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !serving {
        "error"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }

    match &cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid listen address {host}:{port}"))?;
            let analyzer = Analyzer::new(build_config(&cli, None)?)
                .context("Failed to create analyzer")?;
            if !cli.quiet {
                eprintln!("{} Listening on {}", cyan("◆"), bold(&addr.to_string()));
            }
            server::serve(addr, AppState::new(analyzer))
                .await
                .context("Server error")?;
        }
        Command::Analyze {
            task,
            input,
            language,
            mime_type,
            json,
            no_progress,
        } => {
            let task = AnalysisTask::from(*task);
            let language = Language::parse_lenient(Some(language));
            let media = load_media(task, input, mime_type.as_deref()).await?;

            let spinner = (!cli.quiet && !*no_progress).then(CliPollCallback::new);
            let progress = spinner.clone().map(|s| s as ProgressCallback);
            let analyzer = Analyzer::new(build_config(&cli, progress)?)
                .context("Failed to create analyzer")?;

            let request = AnalysisRequest::for_task(task, media, language);
            let result = analyzer.analyze(request, task).await;
            if let Some(s) = &spinner {
                s.finish();
            }
            print_outcome(result, language, *json, cli.quiet)?;
        }
        Command::Resume {
            handle_id,
            format,
            language,
            json,
        } => {
            let task = if format.eq_ignore_ascii_case("json") {
                AnalysisTask::VideoJson
            } else {
                AnalysisTask::VideoReport
            };
            let language = Language::parse_lenient(Some(language));
            let spinner = (!cli.quiet).then(CliPollCallback::new);
            let progress = spinner.clone().map(|s| s as ProgressCallback);
            let analyzer = Analyzer::new(build_config(&cli, progress)?)
                .context("Failed to create analyzer")?;

            let result = analyzer.resume(handle_id, task, language).await;
            if let Some(s) = &spinner {
                s.finish();
            }
            print_outcome(result, language, *json, cli.quiet)?;
        }
        Command::Translate { text, language } => {
            let target: Language = language
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let analyzer = Analyzer::new(build_config(&cli, None)?)
                .context("Failed to create analyzer")?;
            let generation = analyzer
                .translate(text, target)
                .await
                .context("Translation failed")?;
            println!("{}", generation.text);
        }
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .poll_max_attempts(cli.poll_attempts)
        .poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .max_image_bytes(cli.max_image_bytes)
        .max_video_bytes(cli.max_video_bytes)
        .request_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref m) = cli.vision_model {
        builder = builder.vision_model(m);
    }
    if let Some(ref m) = cli.video_model {
        builder = builder.video_model(m);
    }
    if let Some(secs) = cli.poll_deadline {
        builder = builder.poll_deadline(Duration::from_secs(secs));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn load_media(task: AnalysisTask, input: &str, mime_type: Option<&str>) -> Result<Media> {
    if task == AnalysisTask::YoutubeReport {
        return Ok(Media::RemoteUrl(input.to_string()));
    }

    let path = Path::new(input);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = match mime_type {
        Some(m) => m.to_string(),
        None => match guess_mime(path) {
            Some(m) => m.to_string(),
            None => bail!(
                "Cannot tell the media type of {}; pass --mime-type",
                path.display()
            ),
        },
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    Ok(match task.media_kind() {
        media_insight::MediaKind::Video => Media::Video {
            bytes,
            mime_type,
            file_name,
        },
        _ => Media::Image {
            bytes,
            mime_type,
            file_name,
        },
    })
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mpeg" => "video/mpeg",
        "mpg" => "video/mpg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",
        "3gp" | "3gpp" => "video/3gpp",
        _ => return None,
    })
}

fn print_outcome(
    result: std::result::Result<AnalysisOutcome, AnalysisError>,
    language: Language,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let hint = match &e {
                AnalysisError::ProcessingTimeout { handle_id, .. } => {
                    Some(("Still processing", handle_id))
                }
                AnalysisError::StatusFetch { handle_id, .. } => {
                    Some(("Status check failed", handle_id))
                }
                _ => None,
            };
            if let Some((what, handle_id)) = hint {
                eprintln!(
                    "{} {}. Resume with: {}",
                    cyan("⚠"),
                    what,
                    bold(&format!("media-insight resume {handle_id}"))
                );
            }
            return Err(e).context("Analysis failed");
        }
    };

    if json {
        let out = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{out}");
        return Ok(());
    }

    match outcome {
        AnalysisOutcome::Analysis(report) => {
            let body = match &report.result.parsed {
                Some(v) => serde_json::to_string_pretty(v).context("Failed to serialise JSON")?,
                None => report.result.raw.clone(),
            };
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")?;
            if !body.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }

            if let Some(e) = &report.result.error {
                eprintln!("{} {}", cyan("⚠"), e);
            }
            if !quiet {
                eprintln!(
                    "{} {}  {}ms  {} tokens in / {} tokens out",
                    green("✔"),
                    report.task,
                    report.duration_ms,
                    dim(&report.usage.input_tokens.to_string()),
                    dim(&report.usage.output_tokens.to_string()),
                );
            }
        }
        AnalysisOutcome::NoRecognizableContent { task, .. } => {
            let m = prompts::messages(language);
            let msg = if task == AnalysisTask::FlowchartToCode {
                m.no_flowchart
            } else {
                m.no_chart
            };
            eprintln!("{} {}", cyan("⚠"), msg);
        }
    }
    Ok(())
}
