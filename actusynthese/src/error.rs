//! Error types for synthesis requests.

use std::time::Duration;
use thiserror::Error;

/// Shown when the provider fails without a usable message
pub const GENERIC_FAILURE_MESSAGE: &str = "Erreur lors de la génération du flux.";
pub const MISSING_API_KEY_MESSAGE: &str = "Clé API manquante. Veuillez vérifier la configuration.";
pub const QUOTA_MESSAGE: &str = "⚠️ Quota API gratuit dépassé. Veuillez attendre une minute.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Aucune synthèse n'a pu être générée pour ce sujet.";
pub const MALFORMED_MESSAGE: &str = "Réponse du service invalide.";
pub const TIMEOUT_MESSAGE: &str = "Le service ne répond plus. Veuillez réessayer.";

/// Errors that can end a synthesis request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryError {
    /// No API credential configured; raised before any network call
    #[error("API key missing")]
    MissingApiKey,

    /// Rate limiting or quota exhaustion reported by the provider
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other failure reported by the provider
    #[error("provider error (status {status:?}): {message}")]
    Provider { status: Option<u16>, message: String },

    /// Connection or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider completed without producing any text
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Provider payload did not match the expected shape
    #[error("malformed provider payload: {0}")]
    MalformedPayload(String),

    /// No progress within the allowed time
    #[error("no response from provider within {0:?}")]
    Timeout(Duration),
}

impl SummaryError {
    /// Build a provider failure, promoting it to `QuotaExceeded` when the
    /// status or message carries a rate-limit marker.
    pub fn from_provider(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_signal(status, &message) {
            SummaryError::QuotaExceeded(message)
        } else {
            SummaryError::Provider { status, message }
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, SummaryError::QuotaExceeded(_))
    }

    /// Message shown to the user in the error state.
    pub fn user_message(&self) -> String {
        match self {
            SummaryError::MissingApiKey => MISSING_API_KEY_MESSAGE.to_string(),
            SummaryError::QuotaExceeded(_) => QUOTA_MESSAGE.to_string(),
            SummaryError::Provider { message, .. } | SummaryError::Transport(message) => {
                let message = message.trim();
                if message.is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message.to_string()
                }
            }
            SummaryError::EmptyResponse => EMPTY_RESPONSE_MESSAGE.to_string(),
            SummaryError::MalformedPayload(_) => MALFORMED_MESSAGE.to_string(),
            SummaryError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if is_quota_signal(status, &err.to_string()) {
            SummaryError::QuotaExceeded(err.to_string())
        } else {
            SummaryError::Transport(err.to_string())
        }
    }
}

fn is_quota_signal(status: Option<u16>, message: &str) -> bool {
    status == Some(429)
        || message.contains("429")
        || message.contains("RESOURCE_EXHAUSTED")
        || message.to_lowercase().contains("quota")
}

/// Topic rejected before submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,

    #[error("topic must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },
}
