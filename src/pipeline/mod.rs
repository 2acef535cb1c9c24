//! Pipeline stages for media analysis.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets the orchestrator in
//! [`crate::analyze`] stay a readable list of calls.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ submit ──┬──────────────────────▶ normalize
//! (validate,          │ inline: one generate   (fences, JSON repair)
//!  recompress)        │
//!                     └─▶ poll ──▶ submit::generate_from_handle ──▶ normalize
//!                        (upload state)
//! ```
//!
//! 1. [`ingest`]: validate size, MIME type and media kind; recompress
//!    images for tasks that want it. No network I/O.
//! 2. [`encode`]: JPEG re-encoding and base64 wrapping for inline parts.
//! 3. [`submit`]: one inline generate call, or an upload that yields a
//!    remote handle.
//! 4. [`poll`]: wait for an uploaded file to become usable.
//! 5. [`normalize`]: sentinel detection and best-effort JSON extraction.
//!
//! [`youtube`] resolves a YouTube URL to its id and thumbnail.

pub mod encode;
pub mod ingest;
pub mod normalize;
pub mod poll;
pub mod submit;
pub mod youtube;
