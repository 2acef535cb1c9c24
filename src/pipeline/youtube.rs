//! YouTube URL resolution.
//!
//! The model cannot fetch a YouTube page, so a YouTube analysis sends the
//! video's thumbnail inline and names the URL in the instruction. This
//! module extracts the 11-character video id and downloads the thumbnail,
//! preferring `maxresdefault.jpg` and falling back to `hqdefault.jpg`
//! (not every upload has a max-resolution still).

use crate::error::{AnalysisError, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

const VIDEO_ID_LEN: usize = 11;

static RE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").unwrap()
});

/// Extract the video id from any of the common YouTube URL shapes:
/// `youtu.be/<id>`, `/v/<id>`, `/u/<x>/<id>`, `/embed/<id>`, `watch?v=<id>`
/// and `&v=<id>`.
pub fn extract_video_id(url: &str) -> Result<String, ValidationError> {
    RE_VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|id| id.len() == VIDEO_ID_LEN)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::InvalidVideoUrl {
            url: url.to_string(),
        })
}

/// A downloaded thumbnail and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Download the best available thumbnail for `video_id`.
pub async fn fetch_thumbnail(
    client: &Client,
    base_url: &str,
    video_id: &str,
) -> Result<Thumbnail, AnalysisError> {
    let maxres = format!("{}/{}/maxresdefault.jpg", base_url, video_id);
    match fetch(client, &maxres).await {
        Ok(bytes) => return Ok(Thumbnail { url: maxres, bytes }),
        Err(e) => warn!("maxres thumbnail unavailable for {}: {}", video_id, e),
    }

    let hq = format!("{}/{}/hqdefault.jpg", base_url, video_id);
    let bytes = fetch(client, &hq)
        .await
        .map_err(|detail| AnalysisError::Thumbnail {
            video_id: video_id.to_string(),
            detail,
        })?;
    Ok(Thumbnail { url: hq, bytes })
}

async fn fetch(client: &Client, url: &str) -> Result<Vec<u8>, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    debug!("Fetched thumbnail {} ({} bytes)", url, bytes.len());
    Ok(bytes.to_vec())
}
