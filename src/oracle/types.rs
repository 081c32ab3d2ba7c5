//! Common types for oracle interactions

use serde::{Deserialize, Serialize};

/// Role of a chat message sent to the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleRole {
    System,
    User,
    Assistant,
}

/// One role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleMessage {
    pub role: OracleRole,
    pub content: String,
}

impl OracleMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: OracleRole::System,
            content: content.into(),
        }
    }
}

/// Sampling options; unset fields use the relay defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AskOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl AskOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
        }
    }
}

/// Body posted to the relay: `{messages, ...samplingOptions}`
#[derive(Debug, Serialize)]
pub(crate) struct RelayRequest<'a> {
    pub messages: &'a [OracleMessage],
    #[serde(flatten)]
    pub options: AskOptions,
}

/// Subset of a chat-completion body the client reads
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletion {
    /// First choice's content, trimmed
    pub fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
    }
}
