//! AI service integration for video generation and explanations
//!
//! Each capability the poller and flows need sits behind a small trait so the
//! Gemini implementations can be swapped for the scripted mocks in tests.

pub mod fetch;
pub mod gemini;
pub mod mime;
pub mod mock;

pub use fetch::HttpMediaFetcher;
pub use gemini::{GeminiExplanationClient, GeminiVideoClient};
pub use mock::{MockExplanationClient, MockMediaFetcher, MockVideoClient};

use crate::models::{GenerationRequest, Operation, VisualExplanation};
use crate::Result;
use async_trait::async_trait;

/// Submits long-running generation jobs and reports on their progress.
#[async_trait]
pub trait VideoGenerationService: Send + Sync {
    /// Returns `Ok(None)` when the provider accepted the call but handed back
    /// no operation.
    async fn submit(&self, request: &GenerationRequest) -> Result<Option<Operation>>;
    async fn check_operation(&self, operation: &Operation) -> Result<Operation>;
}

/// Raw outcome of a media download, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl FetchedMedia {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: Some(body),
        }
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

#[async_trait]
pub trait ExplanationService: Send + Sync {
    async fn explain(&self, concept: &str) -> Result<VisualExplanation>;
}
