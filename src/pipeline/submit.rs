//! Remote job submission.
//!
//! Inline media (images, YouTube thumbnails) goes out in a single generate
//! call. Video goes to the provider's file store first: the model reads it
//! by reference once the provider has finished processing it, which is
//! what [`crate::pipeline::poll`] waits for.
//!
//! ## Part order
//!
//! The media part comes first and the instruction second. Gemini answers
//! the same either way, but media-first matches the provider's examples and
//! keeps long instructions from being read as a caption for the media.

use crate::error::AnalysisError;
use crate::output::{JobState, RemoteJobHandle};
use crate::pipeline::ingest::PreparedMedia;
use crate::progress::ProgressCallback;
use crate::provider::{Generation, GenerationOptions, InferenceProvider, Part};
use tracing::{debug, info};

/// What a submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The model already answered.
    Inline(Generation),
    /// The media was uploaded; poll the handle before generating.
    Handle(RemoteJobHandle),
}

/// Send prepared media to the provider.
///
/// `PreparedMedia::Remote` must be resolved to inline media by the caller
/// (the thumbnail has to be fetched first).
pub async fn submit(
    provider: &dyn InferenceProvider,
    prepared: PreparedMedia,
    instruction: &str,
    model: &str,
    options: GenerationOptions,
    callback: Option<&ProgressCallback>,
) -> Result<Submission, AnalysisError> {
    match prepared {
        PreparedMedia::Inline { mime_type, data } => {
            debug!("Submitting inline {} to {}", mime_type, model);
            let parts = vec![
                Part::InlineData { mime_type, data },
                Part::Text(instruction.to_string()),
            ];
            let generation = provider.generate(model, parts, options).await?;
            Ok(Submission::Inline(generation))
        }
        PreparedMedia::Upload {
            bytes,
            mime_type,
            display_name,
        } => {
            let display_name = if display_name.trim().is_empty() {
                "upload".to_string()
            } else {
                display_name
            };
            if let Some(cb) = callback {
                cb.on_upload_start(&display_name, bytes.len());
            }
            info!("Uploading '{}' ({} bytes, {})", display_name, bytes.len(), mime_type);

            let handle = provider
                .upload_file(bytes, &mime_type, &display_name)
                .await
                .map_err(|e| AnalysisError::Upload {
                    display_name: display_name.clone(),
                    detail: e.to_string(),
                })?;

            info!("Upload accepted as {} (state: {})", handle.id, handle.state);
            if let Some(cb) = callback {
                cb.on_upload_complete(&handle);
            }
            Ok(Submission::Handle(handle))
        }
        PreparedMedia::Remote { url, .. } => Err(AnalysisError::Internal(format!(
            "remote media '{}' must be resolved before submission",
            url
        ))),
    }
}

/// Generate for a handle the poller has reported as ready.
pub async fn generate_from_handle(
    provider: &dyn InferenceProvider,
    handle: &RemoteJobHandle,
    instruction: &str,
    model: &str,
    options: GenerationOptions,
) -> Result<Generation, AnalysisError> {
    if handle.state != JobState::Ready {
        return Err(AnalysisError::Internal(format!(
            "handle {} is {}, not ready",
            handle.id, handle.state
        )));
    }
    debug!("Generating from {} with {}", handle.id, model);
    let parts = vec![
        Part::FileData {
            mime_type: handle.mime_type.clone(),
            file_uri: handle.uri.clone(),
        },
        Part::Text(instruction.to_string()),
    ];
    Ok(provider.generate(model, parts, options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::output::Usage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        parts: Mutex<Vec<Vec<Part>>>,
        fail_upload: bool,
    }

    #[async_trait]
    impl InferenceProvider for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(
            &self,
            _model: &str,
            parts: Vec<Part>,
            _options: GenerationOptions,
        ) -> Result<Generation, ProviderError> {
            self.parts.lock().unwrap().push(parts);
            Ok(Generation {
                text: "ok".into(),
                usage: Usage::default(),
            })
        }

        async fn upload_file(
            &self,
            _bytes: Vec<u8>,
            mime_type: &str,
            _display_name: &str,
        ) -> Result<RemoteJobHandle, ProviderError> {
            if self.fail_upload {
                return Err(ProviderError::Http("connection reset".into()));
            }
            Ok(RemoteJobHandle {
                id: "files/1".into(),
                uri: "https://files/1".into(),
                mime_type: mime_type.into(),
                state: JobState::Processing,
            })
        }

        async fn get_file(&self, _id: &str) -> Result<RemoteJobHandle, ProviderError> {
            unreachable!("submit never polls")
        }
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            temperature: 0.4,
            max_output_tokens: 256,
        }
    }

    #[tokio::test]
    async fn inline_sends_media_then_instruction() {
        let provider = Recorder::default();
        let prepared = PreparedMedia::Inline {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        };
        let sub = submit(&provider, prepared, "describe", "m", options(), None)
            .await
            .unwrap();
        assert!(matches!(sub, Submission::Inline(ref g) if g.text == "ok"));
        let sent = provider.parts.lock().unwrap();
        assert_eq!(sent[0][1], Part::Text("describe".into()));
        assert!(matches!(sent[0][0], Part::InlineData { .. }));
    }

    #[tokio::test]
    async fn upload_returns_handle() {
        let provider = Recorder::default();
        let prepared = PreparedMedia::Upload {
            bytes: vec![1, 2, 3],
            mime_type: "video/mp4".into(),
            display_name: "clip.mp4".into(),
        };
        let sub = submit(&provider, prepared, "describe", "m", options(), None)
            .await
            .unwrap();
        match sub {
            Submission::Handle(h) => assert_eq!(h.state, JobState::Processing),
            other => panic!("expected handle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_failure_maps_to_upload_error() {
        let provider = Recorder {
            fail_upload: true,
            ..Recorder::default()
        };
        let prepared = PreparedMedia::Upload {
            bytes: vec![1],
            mime_type: "video/mp4".into(),
            display_name: "clip.mp4".into(),
        };
        let err = submit(&provider, prepared, "x", "m", options(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "upload_failed");
    }

    #[tokio::test]
    async fn generate_from_handle_refuses_unready_handle() {
        let provider = Recorder::default();
        let handle = RemoteJobHandle {
            id: "files/1".into(),
            uri: "https://files/1".into(),
            mime_type: "video/mp4".into(),
            state: JobState::Processing,
        };
        let err = generate_from_handle(&provider, &handle, "x", "m", options())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Internal(_)));
        assert!(provider.parts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_from_handle_references_file() {
        let provider = Recorder::default();
        let handle = RemoteJobHandle {
            id: "files/1".into(),
            uri: "https://files/1".into(),
            mime_type: "video/mp4".into(),
            state: JobState::Ready,
        };
        generate_from_handle(&provider, &handle, "x", "m", options())
            .await
            .unwrap();
        let sent = provider.parts.lock().unwrap();
        assert_eq!(
            sent[0][0],
            Part::FileData {
                mime_type: "video/mp4".into(),
                file_uri: "https://files/1".into(),
            }
        );
    }
}
