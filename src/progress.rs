//! Progress-callback trait for upload and polling events.
//!
//! Inject an [`Arc<dyn PollProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to receive
//! events while a video is uploaded and the provider processes it. Only the
//! handle-based path emits events; inline image requests complete in a
//! single call.
//!
//! The callback leaves presentation to the host: the CLI drives a spinner
//! with it, a server could forward the events to a log or a websocket.
//!
//! # Example
//!
//! ```rust
//! use media_insight::{AnalyzerConfig, JobState, PollProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct CountingCallback {
//!     polls: AtomicU32,
//! }
//!
//! impl PollProgressCallback for CountingCallback {
//!     fn on_poll(&self, attempt: u32, max_attempts: u32, state: JobState) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("poll {attempt}/{max_attempts}: {state}");
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { polls: AtomicU32::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{JobState, RemoteJobHandle};
use std::sync::Arc;

/// Called by the pipeline while a handle-based job is in flight.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: the analyzer
/// is shared between request tasks.
pub trait PollProgressCallback: Send + Sync {
    /// Called before the media bytes are sent to the provider's file store.
    fn on_upload_start(&self, display_name: &str, size: usize) {
        let _ = (display_name, size);
    }

    /// Called once the provider has accepted the upload.
    fn on_upload_complete(&self, handle: &RemoteJobHandle) {
        let _ = handle;
    }

    /// Called after each status re-fetch.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed poll number
    /// * `max_attempts`: poll budget
    /// * `state`: state reported by this fetch
    fn on_poll(&self, attempt: u32, max_attempts: u32, state: JobState) {
        let _ = (attempt, max_attempts, state);
    }

    /// Called when the handle reaches `Ready`.
    fn on_ready(&self, handle: &RemoteJobHandle, attempts: u32) {
        let _ = (handle, attempts);
    }

    /// Called when polling stops without a `Ready` handle
    /// (remote failure, exhausted budget or deadline).
    fn on_give_up(&self, handle_id: &str, attempts: u32, reason: &str) {
        let _ = (handle_id, attempts, reason);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PollProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn PollProgressCallback>;
