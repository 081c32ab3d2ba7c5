//! Credential-injecting relay to the chat-completions provider
//!
//! Browsers and the oracle client post `{messages, temperature?, max_tokens?, n?}`
//! here; the relay adds the secret key and the fixed model, forwards the
//! request and hands back the provider's answer or error as-is.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_N: u32 = 1;

/// Caller-supplied fields that override the defaults
const OVERRIDABLE: [&str; 3] = ["temperature", "max_tokens", "n"];

/// Provider settings for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub provider_url: String,
    pub model: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Relay configuration plus the shared outbound client
#[derive(Clone)]
pub struct Relay {
    config: Arc<RelayConfig>,
    client: reqwest::Client,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Send a shaped request upstream and translate the outcome into a response
    async fn forward(&self, api_key: &str, request: &Value) -> Response {
        let started = std::time::Instant::now();
        let result = self
            .client
            .post(&self.config.provider_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Provider request failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read provider response");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(e.to_string()));
            }
        };

        #[allow(clippy::cast_possible_truncation)] // Durations here are far below u64::MAX ms
        let duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), duration_ms, "Provider returned an error");
            let detail = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            return error_response(status, detail);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => {
                tracing::debug!(duration_ms, "Provider request succeeded");
                (StatusCode::OK, Json(data)).into_response()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Provider returned a non-JSON body");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(e.to_string()))
            }
        }
    }
}

/// Requests the relay refuses before contacting the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRejection {
    MethodNotAllowed,
    MissingApiKey,
    InvalidJson,
    InvalidMessages,
}

impl RelayRejection {
    pub fn status(self) -> StatusCode {
        match self {
            RelayRejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayRejection::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            RelayRejection::InvalidJson | RelayRejection::InvalidMessages => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RelayRejection::MethodNotAllowed => "Method Not Allowed",
            RelayRejection::MissingApiKey => "OpenAI API key not configured",
            RelayRejection::InvalidJson => "Invalid JSON body",
            RelayRejection::InvalidMessages => "Invalid messages format",
        }
    }
}

impl IntoResponse for RelayRejection {
    fn into_response(self) -> Response {
        error_response(self.status(), json!(self.message()))
    }
}

fn error_response(status: StatusCode, error: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        json!({ "error": error }).to_string(),
    )
        .into_response()
}

/// Shape the provider request from a raw caller body
///
/// The model always comes from configuration. Sampling fields present in the
/// body replace the defaults; everything else in the body is ignored.
pub fn build_provider_request(model: &str, body: &[u8]) -> Result<Value, RelayRejection> {
    let parsed: Value = serde_json::from_slice(body).map_err(|_| RelayRejection::InvalidJson)?;

    let messages = parsed
        .get("messages")
        .filter(|m| m.is_array())
        .cloned()
        .ok_or(RelayRejection::InvalidMessages)?;

    let mut request = Map::new();
    request.insert("model".to_string(), json!(model));
    request.insert("messages".to_string(), messages);
    request.insert("max_tokens".to_string(), json!(DEFAULT_MAX_TOKENS));
    request.insert("temperature".to_string(), json!(DEFAULT_TEMPERATURE));
    request.insert("n".to_string(), json!(DEFAULT_N));

    for field in OVERRIDABLE {
        if let Some(value) = parsed.get(field).filter(|v| !v.is_null()) {
            request.insert(field.to_string(), value.clone());
        }
    }

    Ok(Value::Object(request))
}

/// `POST /api/oracle`; any other method is answered with 405
pub async fn relay_handler(State(relay): State<Relay>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return RelayRejection::MethodNotAllowed.into_response();
    }

    let Some(api_key) = relay.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::error!("Relay called without a provider API key configured");
        return RelayRejection::MissingApiKey.into_response();
    };

    let request = match build_provider_request(&relay.config.model, &body) {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };

    relay.forward(api_key, &request).await
}
