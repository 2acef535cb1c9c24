//! Response normalisation: best-effort JSON extraction from model text.
//!
//! ## Why is normalisation necessary?
//!
//! Even when told to "return only JSON", models wrap the document in
//! ```` ```json ```` fences, add a sentence before or after it, or leave
//! trailing commas behind. Failing the request over that would throw away
//! an otherwise useful answer, so the normaliser:
//!
//! 1. strips fence markers,
//! 2. slices from the first `{` to the last `}`,
//! 3. parses strictly, and only if that fails
//! 4. applies the repair rules below and parses once more.
//!
//! Valid JSON is never rewritten: repairs only run after the strict parse
//! has failed. The repair rules are plain text substitutions, so once they
//! run they also rewrite commas inside string literals (`"a,,b"` becomes
//! `"a,b"`). The untouched model text is always kept in `raw`.
//!
//! Nothing here panics or returns `Err`; a document that cannot be rescued
//! comes back as text with a [`NormalizeError`] attached.
//!
//! ## Repair Order
//!
//! Duplicate commas are collapsed before trailing commas are removed, so
//! `{"a":1,,}` first becomes `{"a":1,}` and then `{"a":1}`.

use crate::error::NormalizeError;
use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Normalise raw model output into an [`AnalysisResult`].
pub fn normalize(raw: &str) -> AnalysisResult {
    let stripped = strip_fences(raw);

    let Some(candidate) = slice_object(&stripped) else {
        debug!("No JSON object in model output; keeping text");
        return AnalysisResult::text(raw);
    };

    if let Ok(value) = serde_json::from_str(candidate) {
        return AnalysisResult::structured(raw, value);
    }

    let repaired = repair(candidate);
    match serde_json::from_str(&repaired) {
        Ok(value) => {
            debug!("JSON parsed after repair");
            AnalysisResult::structured(raw, value)
        }
        Err(e) => {
            warn!("Model output is not valid JSON after repair: {}", e);
            AnalysisResult::unparsed(
                raw,
                NormalizeError::ParseError {
                    detail: e.to_string(),
                },
            )
        }
    }
}

/// Whether the model answered with the task's "nothing found" phrase.
///
/// Case-insensitive containment: models capitalise and punctuate the
/// phrase freely.
pub fn detect_sentinel(raw: &str, sentinel: &str) -> bool {
    raw.to_lowercase().contains(&sentinel.to_lowercase())
}

// ── Step 1: Strip code fences ────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());

fn strip_fences(input: &str) -> String {
    RE_FENCE.replace_all(input, "").to_string()
}

// ── Step 2: Slice the outermost object ───────────────────────────────────

fn slice_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&input[start..=end])
}

// ── Step 4: Repairs ──────────────────────────────────────────────────────

fn repair(input: &str) -> String {
    let s = collapse_duplicate_commas(input);
    remove_trailing_commas(&s)
}

static RE_DUPLICATE_COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:\s*,)+").unwrap());

/// `[1,,2]` → `[1,2]`
fn collapse_duplicate_commas(input: &str) -> String {
    RE_DUPLICATE_COMMAS.replace_all(input, ",").to_string()
}

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// `{"a":1,}` → `{"a":1}`
fn remove_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").to_string()
}
