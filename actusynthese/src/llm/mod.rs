use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

pub mod gemini;
pub mod prompt;

/// Title used when the provider sends a citation without one
pub const DEFAULT_SOURCE_TITLE: &str = "Source Web";

/// Incremental provider output, in arrival order
pub type ChunkStream = BoxStream<'static, Result<ProviderChunk, SummaryError>>;

/// Core trait for web-grounded synthesis providers
#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Start a synthesis for `topic` and return its incremental output.
    ///
    /// Failures detected before streaming starts (missing credential, HTTP
    /// error status) are returned directly; later ones arrive in the stream.
    async fn stream_summary(&self, topic: &str) -> Result<ChunkStream, SummaryError>;
}

/// One citation backing the generated text. Identity is the `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

impl Source {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }

    /// Build a citation from possibly missing or blank provider data
    pub fn with_optional_title(title: Option<String>, uri: impl Into<String>) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_TITLE.to_string());
        Self::new(title, uri)
    }
}

/// Cumulative synthesis: all text and distinct sources seen so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
    pub sources: Vec<Source>,
}

/// A single increment from the provider. Either part may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderChunk {
    pub text: String,
    pub sources: Vec<Source>,
}

impl ProviderChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}
