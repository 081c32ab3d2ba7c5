//! Oracle client that posts to the chat relay

use super::types::{AskOptions, ChatCompletion, OracleMessage, RelayRequest};
use super::{Oracle, OracleError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Oracle reached through the relay's single POST endpoint
pub struct RelayOracle {
    client: Client,
    url: String,
}

impl RelayOracle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Oracle for RelayOracle {
    async fn ask(
        &self,
        messages: &[OracleMessage],
        options: AskOptions,
    ) -> Result<String, OracleError> {
        if messages.is_empty() {
            return Err(OracleError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest { messages, options })
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    OracleError::unavailable(None, format!("Connection failed: {e}"))
                } else {
                    OracleError::unavailable(None, format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OracleError::unavailable(None, format!("Failed to read response: {e}")))?;

        parse_relay_response(status.as_u16(), &body)
    }

    fn name(&self) -> &str {
        "relay"
    }
}

/// Interpret a relay response: status code plus raw body
pub(crate) fn parse_relay_response(status: u16, body: &str) -> Result<String, OracleError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.to_string()
                }
            });
        return Err(OracleError::unavailable(Some(status), message));
    }

    let value = parsed
        .ok_or_else(|| OracleError::protocol(format!("response is not JSON: {body}")))?;

    if let Some(message) = error_message(&value) {
        return Err(OracleError::unavailable(Some(status), message));
    }

    let completion: ChatCompletion = serde_json::from_value(value)
        .map_err(|e| OracleError::protocol(format!("unexpected response shape: {e}")))?;

    completion
        .first_text()
        .ok_or_else(|| OracleError::protocol("response has no choices[0].message.content"))
}

/// Extract `error` as text; it may be a string or a provider error object
fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(match error {
        Value::String(s) => s.clone(),
        other => other
            .pointer("/message")
            .or_else(|| other.pointer("/error/message"))
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_string),
    })
}
