//! The inference-provider port.
//!
//! The pipeline talks to the generative model only through
//! [`InferenceProvider`]. It exposes the two call shapes the pipeline needs:
//!
//! - **inline generation**: instruction plus media bytes in one request;
//! - **handle-based generation**: upload once, poll the file's state, then
//!   generate by reference to the uploaded file.
//!
//! [`gemini::GeminiProvider`] is the production implementation. Tests plug
//! in scripted providers.

pub mod gemini;

use crate::error::ProviderError;
use crate::output::{RemoteJobHandle, Usage};
use async_trait::async_trait;

pub use gemini::GeminiProvider;

/// One piece of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Base64-encoded media embedded in the request.
    InlineData { mime_type: String, data: String },
    /// Media previously uploaded to the provider's file store.
    FileData { mime_type: String, file_uri: String },
}

/// Sampling knobs passed through to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

/// A generative-AI backend.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Short name for logs, e.g. "gemini".
    fn name(&self) -> &str;

    /// Run one generation over `parts` and return the model's text.
    async fn generate(
        &self,
        model: &str,
        parts: Vec<Part>,
        options: GenerationOptions,
    ) -> Result<Generation, ProviderError>;

    /// Store `bytes` in the provider's file store and return a handle
    /// describing the stored file.
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteJobHandle, ProviderError>;

    /// Fetch the current state of an uploaded file.
    async fn get_file(&self, id: &str) -> Result<RemoteJobHandle, ProviderError>;
}
