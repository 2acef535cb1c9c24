//! Values produced by the pipeline: remote job handles, normalised results
//! and the per-request outcome handed back to callers.

use crate::config::AnalysisTask;
use crate::error::NormalizeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl JobState {
    /// `Ready` and `Failed` end polling; nothing moves a handle out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Ready | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Ready => "ready",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to media uploaded to the provider's file store.
///
/// Only the poller replaces a handle's `state`; callers discard the handle
/// once it is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteJobHandle {
    /// Provider resource name, e.g. `files/abc123`.
    pub id: String,
    /// URI used to reference the file from a generation request.
    pub uri: String,
    pub mime_type: String,
    pub state: JobState,
}

/// Whether a result carries parsed JSON or only text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Text,
    StructuredJson,
}

/// Normalised model output.
///
/// `raw` is always the unmodified model text. `parsed` is set only when JSON
/// extraction succeeded, in which case `kind` is `StructuredJson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub kind: ResultKind,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NormalizeError>,
}

impl AnalysisResult {
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Text,
            raw: raw.into(),
            parsed: None,
            error: None,
        }
    }

    pub fn structured(raw: impl Into<String>, parsed: serde_json::Value) -> Self {
        Self {
            kind: ResultKind::StructuredJson,
            raw: raw.into(),
            parsed: Some(parsed),
            error: None,
        }
    }

    pub fn unparsed(raw: impl Into<String>, error: NormalizeError) -> Self {
        Self {
            kind: ResultKind::Text,
            raw: raw.into(),
            parsed: None,
            error: Some(error),
        }
    }

    /// The parsed document when there is one, otherwise the raw text as a
    /// JSON string. This is what the HTTP layer puts under `analysis`.
    pub fn to_json_value(&self) -> serde_json::Value {
        match &self.parsed {
            Some(v) => v.clone(),
            None => serde_json::Value::String(self.raw.clone()),
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Identifies the YouTube video a report was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub thumbnail: String,
}

/// Everything one successful analysis produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub task: AnalysisTask,
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoInfo>,
    pub usage: Usage,
    /// Status fetches spent waiting on an upload; None for inline requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polls: Option<u32>,
    pub duration_ms: u64,
}

/// The outcome of one pipeline invocation that did not fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The model produced an answer.
    Analysis(AnalysisReport),
    /// The model understood the input and reported, via the task's sentinel
    /// phrase, that it contains nothing the task can work with.
    NoRecognizableContent {
        task: AnalysisTask,
        sentinel: String,
    },
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Analysis(r) => Some(r),
            AnalysisOutcome::NoRecognizableContent { .. } => None,
        }
    }

    pub fn into_report(self) -> Option<AnalysisReport> {
        match self {
            AnalysisOutcome::Analysis(r) => Some(r),
            AnalysisOutcome::NoRecognizableContent { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_states() {
        assert!(JobState::Ready.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }

    #[test]
    fn json_value_prefers_parsed() {
        let structured = AnalysisResult::structured("{\"a\":1}", json!({"a": 1}));
        assert_eq!(structured.to_json_value(), json!({"a": 1}));

        let text = AnalysisResult::text("plain words");
        assert_eq!(text.to_json_value(), json!("plain words"));
    }

    #[test]
    fn outcome_serialises_with_tag() {
        let outcome = AnalysisOutcome::NoRecognizableContent {
            task: AnalysisTask::ChartInsights,
            sentinel: "no chart or data visualization detected".into(),
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["outcome"], "no_recognizable_content");
        assert_eq!(v["task"], "chart-insights");
        assert!(outcome.report().is_none());
    }

    #[test]
    fn text_result_omits_empty_fields() {
        let v = serde_json::to_value(AnalysisResult::text("hi")).unwrap();
        assert_eq!(v, json!({"kind": "text", "raw": "hi"}));
    }
}
