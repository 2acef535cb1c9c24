//! Media ingestion: validate what the user sent before anything leaves the
//! process.
//!
//! ## Why validate locally?
//!
//! The provider rejects oversized or unsupported uploads too, but only after
//! the bytes have crossed the network and, for video, after an upload slot
//! has been allocated. Every check here is cheap and runs before the first
//! request, so a bad input never costs an API call.
//!
//! Checks run in this order: media kind, emptiness, size, MIME type. Only
//! then are images recompressed (object detection) or base64-wrapped.

use crate::config::{AnalysisTask, Language, MediaKind, MediaLimits};
use crate::error::ValidationError;
use crate::pipeline::{encode, youtube};
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Image MIME types accepted inline.
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Video MIME types accepted for upload.
pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/mpeg",
    "video/mov",
    "video/quicktime",
    "video/avi",
    "video/x-msvideo",
    "video/x-flv",
    "video/mpg",
    "video/webm",
    "video/wmv",
    "video/x-ms-wmv",
    "video/3gpp",
];

/// The media attached to an analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Image {
        bytes: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
    Video {
        bytes: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
    /// A YouTube (or other hosted video) URL.
    RemoteUrl(String),
}

impl Media {
    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Image { .. } => MediaKind::Image,
            Media::Video { .. } => MediaKind::Video,
            Media::RemoteUrl(_) => MediaKind::RemoteUrl,
        }
    }

    /// Payload size in bytes (URL length for remote media).
    pub fn len(&self) -> usize {
        match self {
            Media::Image { bytes, .. } | Media::Video { bytes, .. } => bytes.len(),
            Media::RemoteUrl(url) => url.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Media::RemoteUrl(url) => url.trim().is_empty(),
            _ => self.len() == 0,
        }
    }
}

/// One analysis request: media, the instruction sent with it and the
/// language the answer should be in.
///
/// Fields are private; a request does not change once it has been built.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    media: Media,
    instruction: String,
    language: Language,
}

impl AnalysisRequest {
    /// Build a request with the stock instruction for `task` in `language`.
    pub fn for_task(task: AnalysisTask, media: Media, language: Language) -> Self {
        Self {
            media,
            instruction: prompts::instruction(task, language).to_string(),
            language,
        }
    }

    /// Replace the stock instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn media(&self) -> &Media {
        &self.media
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn into_parts(self) -> (Media, String, Language) {
        (self.media, self.instruction, self.language)
    }
}

/// Media after validation, in the shape the submitter sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedMedia {
    /// Sent inside the generate request as base64.
    Inline { mime_type: String, data: String },
    /// Uploaded to the provider's file store, then polled.
    Upload {
        bytes: Vec<u8>,
        mime_type: String,
        display_name: String,
    },
    /// A YouTube video, referenced by URL.
    Remote { url: String, video_id: String },
}

/// Validate `media` for `task` and turn it into [`PreparedMedia`].
///
/// CPU-bound for recompressed images; callers on an async runtime should
/// run it in `spawn_blocking`.
pub fn prepare(
    media: Media,
    task: AnalysisTask,
    limits: &MediaLimits,
) -> Result<PreparedMedia, ValidationError> {
    let expected = task.media_kind();
    if media.kind() != expected {
        return Err(ValidationError::WrongKind {
            expected: expected.as_str(),
            actual: media.kind().as_str(),
        });
    }

    if media.is_empty() {
        return Err(ValidationError::Empty {
            what: expected.as_str(),
        });
    }

    if let Some(limit) = limits.limit_for(expected) {
        let size = media.len();
        if size > limit {
            return Err(ValidationError::TooLarge {
                kind: expected.as_str(),
                size,
                limit,
            });
        }
    }

    match media {
        Media::Image {
            bytes, mime_type, ..
        } => {
            let mime_type = check_mime(&mime_type, IMAGE_MIME_TYPES, "image")?;
            if task.recompress_images() {
                let jpeg = encode::recompress_jpeg(&bytes, limits.target_width, limits.jpeg_quality)
                    .map_err(|e| ValidationError::Undecodable {
                        detail: e.to_string(),
                    })?;
                Ok(PreparedMedia::Inline {
                    mime_type: "image/jpeg".to_string(),
                    data: encode::to_base64(&jpeg),
                })
            } else {
                Ok(PreparedMedia::Inline {
                    mime_type,
                    data: encode::to_base64(&bytes),
                })
            }
        }
        Media::Video {
            bytes,
            mime_type,
            file_name,
        } => {
            let mime_type = check_mime(&mime_type, VIDEO_MIME_TYPES, "video")?;
            debug!("Prepared video '{}' ({} bytes, {})", file_name, bytes.len(), mime_type);
            Ok(PreparedMedia::Upload {
                bytes,
                mime_type,
                display_name: file_name,
            })
        }
        Media::RemoteUrl(url) => {
            let url = url.trim().to_string();
            let video_id = youtube::extract_video_id(&url)?;
            Ok(PreparedMedia::Remote { url, video_id })
        }
    }
}

/// Uploaded file resource names: `files/` followed by a lower-case id.
static RE_FILE_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^files/[a-z0-9-]+$").unwrap());

/// Check that `handle_id` names an uploaded file before it is used to build
/// a status URL. Anything else (`models/...`, `../`, query strings) would
/// address a different provider resource.
pub fn check_handle_id(handle_id: &str) -> Result<&str, ValidationError> {
    let trimmed = handle_id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: "handle_id".to_string(),
        });
    }
    if !RE_FILE_HANDLE.is_match(trimmed) {
        return Err(ValidationError::InvalidHandle {
            handle_id: trimmed.to_string(),
        });
    }
    Ok(trimmed)
}

/// Lower-case `mime_type`, drop any `; parameters` and check it against
/// `allowed`. Returns the normalised type.
fn check_mime(
    mime_type: &str,
    allowed: &[&str],
    kind: &'static str,
) -> Result<String, ValidationError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    };
    if allowed.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(ValidationError::UnsupportedType {
            kind,
            mime_type: mime_type.to_string(),
        })
    }
}
