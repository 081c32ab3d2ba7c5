//! Oracle client abstraction
//!
//! The oracle is a language-model chat endpoint reached through the relay.
//! Every call is single-shot: no retry, no batching, no streaming.

mod error;
mod relay_client;
#[cfg(test)]
pub mod testing;
mod types;

pub use error::OracleError;
pub use relay_client::RelayOracle;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for oracle clients
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one ordered message sequence and return the trimmed completion
    async fn ask(&self, messages: &[OracleMessage], options: AskOptions)
        -> Result<String, OracleError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    async fn ask(
        &self,
        messages: &[OracleMessage],
        options: AskOptions,
    ) -> Result<String, OracleError> {
        (**self).ask(messages, options).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for oracle clients
pub struct LoggingOracle {
    inner: Arc<dyn Oracle>,
    name: String,
}

impl LoggingOracle {
    pub fn new(inner: Arc<dyn Oracle>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl Oracle for LoggingOracle {
    async fn ask(
        &self,
        messages: &[OracleMessage],
        options: AskOptions,
    ) -> Result<String, OracleError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask(messages, options).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    oracle = %self.name,
                    duration_ms = %duration.as_millis(),
                    messages = messages.len(),
                    reply_chars = text.chars().count(),
                    "Oracle request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    oracle = %self.name,
                    duration_ms = %duration.as_millis(),
                    status = ?e.status(),
                    error = %e,
                    "Oracle request failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockOracle;
    use super::*;

    #[tokio::test]
    async fn test_logging_oracle_passes_through() {
        let mock = Arc::new(MockOracle::new());
        mock.queue_reply("Yes");
        mock.queue_error(OracleError::unavailable(Some(500), "boom"));
        let oracle = LoggingOracle::new(mock.clone());

        let messages = vec![OracleMessage::system("hello")];
        assert_eq!(
            oracle.ask(&messages, AskOptions::default()).await.unwrap(),
            "Yes"
        );
        let err = oracle
            .ask(&messages, AskOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(mock.recorded_requests().len(), 2);
        assert_eq!(oracle.name(), "mock");
    }
}
