use anyhow::Context;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use common::ProviderConfig;

use super::{prompt, ChunkStream, ProviderChunk, Source, SummaryProvider};
use crate::error::SummaryError;

const MAX_LINE_BYTES: usize = 1024 * 1024;
const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Gemini `streamGenerateContent` provider with Google Search grounding
pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    request_timeout: Option<Duration>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            temperature: 0.3,
            request_timeout: Some(Duration::from_secs(30)),
            client: reqwest::Client::new(),
        }
    }

    /// `timeout_secs == 0` leaves the initial request unbounded.
    pub fn with_defaults(mut self, timeout_secs: u64, temperature: f32) -> Self {
        self.request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        self.temperature = temperature;
        self
    }

    /// Build a provider from configuration, reading the key from the configured env var.
    /// A missing key is not an error here: it surfaces on the first request instead.
    pub fn from_config(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        url::Url::parse(cfg.api_url())
            .with_context(|| format!("Invalid provider api_url: {}", cfg.api_url()))?;

        let api_key = std::env::var(cfg.api_key_env()).ok();
        if api_key.is_none() {
            warn!(env = cfg.api_key_env(), "provider API key env var not set");
        }

        Ok(Self::new(cfg.api_url(), api_key, cfg.model())
            .with_defaults(cfg.timeout_seconds(), cfg.temperature()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(&self, topic: &str) -> GenerateRequest {
        GenerateRequest {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: prompt::SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![RequestContent {
                role: Some("user".to_string()),
                parts: vec![RequestPart {
                    text: prompt::user_message(topic),
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait::async_trait]
impl SummaryProvider for GeminiProvider {
    async fn stream_summary(&self, topic: &str) -> Result<ChunkStream, SummaryError> {
        let api_key = match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!("refusing to start synthesis: no API key configured");
                return Err(SummaryError::MissingApiKey);
            }
        };

        let req_body = self.build_request(topic);
        info!(model = %self.model, topic, "requesting synthesis stream");

        let send = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&req_body)
            .send();
        let response = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| SummaryError::Timeout(limit))??,
            None => send.await?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(rejection_error(status, response.text().await));
        }

        Ok(sse_chunks(response))
    }
}

/// Classify a non-2xx response. Only a structured provider error carries a
/// message worth showing; any other body is logged and dropped.
fn rejection_error(status: u16, body: reqwest::Result<String>) -> SummaryError {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(status, error = %e, "failed to read rejected response body");
            return SummaryError::from_provider(Some(status), String::new());
        }
    };

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            warn!(status, message = %envelope.error.message, "synthesis request rejected by provider");
            envelope.error.into_summary_error(Some(status))
        }
        Err(_) => {
            let excerpt: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
            warn!(status, body = %excerpt, "synthesis request rejected with unstructured body");
            SummaryError::from_provider(Some(status), String::new())
        }
    }
}

/// Decode an SSE response body into provider chunks, one per `data:` line.
fn sse_chunks(response: reqwest::Response) -> ChunkStream {
    let bytes = response
        .bytes_stream()
        .map(|r| r.map_err(std::io::Error::other));
    let lines = FramedRead::new(
        StreamReader::new(bytes),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    );

    lines
        .filter_map(|line| {
            let item = match line {
                Ok(line) => parse_sse_line(&line).transpose(),
                Err(e) => Some(Err(line_error(e))),
            };
            futures::future::ready(item)
        })
        .boxed()
}

fn line_error(e: LinesCodecError) -> SummaryError {
    match e {
        LinesCodecError::Io(io) => SummaryError::Transport(io.to_string()),
        LinesCodecError::MaxLineLengthExceeded => {
            SummaryError::MalformedPayload("SSE line exceeds maximum length".to_string())
        }
    }
}

/// Parse one SSE line. Non-data lines (comments, `event:`, blank separators) yield `None`.
pub(crate) fn parse_sse_line(line: &str) -> Result<Option<ProviderChunk>, SummaryError> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let payload: StreamPayload = serde_json::from_str(data).map_err(|e| {
        debug!(error = %e, "unparseable stream payload");
        SummaryError::MalformedPayload(e.to_string())
    })?;
    payload.into_chunk().map(Some)
}

// Request structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: RequestContent,
    contents: Vec<RequestContent>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

// Response structures
#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

impl StreamPayload {
    fn into_chunk(self) -> Result<ProviderChunk, SummaryError> {
        if let Some(err) = self.error {
            return Err(err.into_summary_error(None));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(ProviderChunk::default());
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let sources = candidate
            .grounding_metadata
            .map(|g| {
                g.grounding_chunks
                    .into_iter()
                    .filter_map(|c| c.web)
                    .map(|web| Source::with_optional_title(web.title, web.uri))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProviderChunk { text, sources })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl ApiError {
    fn into_summary_error(self, http_status: Option<u16>) -> SummaryError {
        if self.status.as_deref() == Some("RESOURCE_EXHAUSTED") {
            return SummaryError::QuotaExceeded(self.message);
        }
        SummaryError::from_provider(self.code.or(http_status), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let provider = GeminiProvider::new("http://localhost", Some("k".into()), "gemini-test");
        let body = serde_json::to_value(provider.build_request("Inflation zone UEMOA")).unwrap();

        assert_eq!(body["tools"][0]["googleSearch"], serde_json::json!({}));
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .ends_with("Inflation zone UEMOA"));
        assert!(body["systemInstruction"].get("role").is_none());
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("journalisme de synthèse"));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let provider = GeminiProvider::new("http://localhost:8080/v1beta/", None, "gemini-test");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-test:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn parses_text_and_grounding() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Le "},{"text":"scrutin"}],"role":"model"},"groundingMetadata":{"groundingChunks":[{"web":{"uri":"https://rfi.fr/x","title":"RFI"}},{"web":{"uri":"https://bbc.com/y"}},{"retrievedContext":{}}]}}]}"#;

        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.text, "Le scrutin");
        assert_eq!(
            chunk.sources,
            vec![
                Source::new("RFI", "https://rfi.fr/x"),
                Source::new("Source Web", "https://bbc.com/y"),
            ]
        );
    }

    #[test]
    fn thought_parts_are_skipped() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"thinking...","thought":true},{"text":"Résumé"}]}}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.text, "Résumé");
    }

    #[test]
    fn non_data_lines_are_ignored() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line("\r").unwrap(), None);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_sse_line("event: message").unwrap(), None);
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), None);
    }

    #[test]
    fn chunk_without_candidates_is_empty() {
        let chunk = parse_sse_line(r#"data: {"usageMetadata":{"totalTokenCount":12}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk, ProviderChunk::default());
    }

    #[test]
    fn malformed_payloads_fail() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(SummaryError::MalformedPayload(_))
        ));
        // web citation without uri
        assert!(matches!(
            parse_sse_line(r#"data: {"candidates":[{"groundingMetadata":{"groundingChunks":[{"web":{"title":"x"}}]}}]}"#),
            Err(SummaryError::MalformedPayload(_))
        ));
    }

    #[test]
    fn inline_error_is_classified() {
        let err = parse_sse_line(
            r#"data: {"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .unwrap_err();
        assert!(err.is_quota());

        let err = parse_sse_line(r#"data: {"error":{"code":500,"message":"Internal","status":"INTERNAL"}}"#)
            .unwrap_err();
        assert_eq!(
            err,
            SummaryError::Provider {
                status: Some(500),
                message: "Internal".to_string()
            }
        );
    }

    #[test]
    fn zero_request_timeout_means_unbounded() {
        let provider = GeminiProvider::new("http://localhost", None, "gemini-test");
        assert_eq!(provider.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(provider.with_defaults(0, 0.3).request_timeout, None);
    }

    #[test]
    fn unstructured_rejection_body_is_not_surfaced() {
        let html = "<html><body><h1>502 Bad Gateway</h1></body></html>";
        let err = rejection_error(502, Ok(html.to_string()));
        assert_eq!(
            err,
            SummaryError::Provider {
                status: Some(502),
                message: String::new()
            }
        );
        assert!(rejection_error(429, Ok("Too Many Requests".into())).is_quota());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = GeminiProvider::new("http://127.0.0.1:9", Some("  ".into()), "gemini-test");
        let err = provider.stream_summary("Sommet de la CEDEAO").await.err();
        assert_eq!(err, Some(SummaryError::MissingApiKey));
    }
}
