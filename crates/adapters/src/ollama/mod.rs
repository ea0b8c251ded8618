//! Ollama HTTP adapters.
//!
//! One [`OllamaTransport`] (a `reqwest` client plus base URL) is shared by the
//! embedding and model-service adapters. Every request races the request
//! context's cancellation; losing the race drops the in-flight request.

mod embedding;
mod model;

pub use embedding::OllamaEmbedding;
pub use model::OllamaModelService;

use pilot_config::ValidatedPilotConfig;
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Server base URL without trailing slash.
    pub base_url: Box<str>,
    /// Transport timeout in milliseconds.
    pub timeout_ms: u64,
}

impl OllamaConfig {
    /// Take the server URL and timeout from validated config.
    #[must_use]
    pub fn from_config(config: &ValidatedPilotConfig) -> Self {
        Self {
            base_url: config.server_url().as_str().trim_end_matches('/').into(),
            timeout_ms: config.model.timeout_ms,
        }
    }
}

/// Shared HTTP client for one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl OllamaTransport {
    /// Build the client.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Ollama base url must be non-empty",
            ));
        }
        if config.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "timeout must be greater than zero",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("ollama", "client_init_failed"),
                    format!("failed to build Ollama client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON reply.
    pub(crate) async fn post_json<Req, Resp>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &Req,
        operation: &'static str,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        ctx.ensure_not_cancelled(operation)?;
        let url = format!("{}{path}", self.base_url);

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = self.client.post(&url).json(body).send() => {
                result.map_err(|error| map_reqwest_error(&error, operation))?
            }
        };

        let status = response.status();
        let payload = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = response.bytes() => result.map_err(|error| map_reqwest_error(&error, operation))?,
        };

        if !status.is_success() {
            return Err(map_http_error(status, &payload).with_metadata("operation", operation));
        }

        serde_json::from_slice(&payload).map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("ollama", "invalid_response"),
                format!("failed to decode Ollama response: {error}"),
                ErrorClass::NonRetriable,
            )
            .with_metadata("operation", operation)
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct OllamaErrorResponse {
    error: Option<String>,
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: &reqwest::Error, operation: &'static str) -> ErrorEnvelope {
    let envelope = if error.is_timeout() {
        ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "Ollama request timed out",
            ErrorClass::Retriable,
        )
    } else if error.is_connect() {
        ErrorEnvelope::dependency_unavailable(format!("Ollama server unreachable: {error}"))
    } else {
        ErrorEnvelope::unexpected(
            ErrorCode::new("ollama", "request_failed"),
            format!("Ollama request failed: {error}"),
            ErrorClass::NonRetriable,
        )
    };
    envelope.with_metadata("operation", operation)
}

fn map_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let message = serde_json::from_slice::<OllamaErrorResponse>(payload)
        .ok()
        .and_then(|response| response.error)
        .unwrap_or_else(|| format!("Ollama request failed with status {status}"));

    let envelope = match status.as_u16() {
        400 | 422 => ErrorEnvelope::expected(ErrorCode::invalid_input(), message),
        404 => ErrorEnvelope::expected(ErrorCode::new("ollama", "model_not_found"), message),
        401 | 403 => ErrorEnvelope::expected(ErrorCode::permission_denied(), message),
        408 => ErrorEnvelope::unexpected(ErrorCode::timeout(), message, ErrorClass::Retriable),
        _ if status.is_server_error() => ErrorEnvelope::dependency_unavailable(message),
        _ => ErrorEnvelope::unexpected(
            ErrorCode::new("ollama", "http_error"),
            message,
            ErrorClass::NonRetriable,
        ),
    };
    envelope.with_metadata("status", status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_dependency_unavailable() {
        let envelope = map_http_error(StatusCode::SERVICE_UNAVAILABLE, b"");
        assert_eq!(envelope.code, ErrorCode::dependency_unavailable());
        assert_eq!(envelope.class, ErrorClass::Retriable);
    }

    #[test]
    fn server_error_message_is_preserved() {
        let envelope = map_http_error(
            StatusCode::NOT_FOUND,
            br#"{"error":"model 'codellama' not found"}"#,
        );
        assert_eq!(envelope.code, ErrorCode::new("ollama", "model_not_found"));
        assert_eq!(envelope.message, "model 'codellama' not found");
    }

    #[test]
    fn transport_rejects_zero_timeout() {
        let error = OllamaTransport::new(&OllamaConfig {
            base_url: "http://localhost:11434".into(),
            timeout_ms: 0,
        })
        .err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }
}
