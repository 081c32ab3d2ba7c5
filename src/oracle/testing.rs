//! Mock oracle for testing
//!
//! Returns queued replies in order and records every request.

use super::{AskOptions, Oracle, OracleError, OracleMessage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock oracle that returns queued replies
pub struct MockOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<(Vec<OracleMessage>, AskOptions)>>,
}

#[allow(dead_code)]
impl MockOracle {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: OracleError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<(Vec<OracleMessage>, AskOptions)> {
        self.requests.lock().unwrap().clone()
    }

    /// System prompt text of the nth request
    pub fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].0[0].content.clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn ask(
        &self,
        messages: &[OracleMessage],
        options: AskOptions,
    ) -> Result<String, OracleError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), options));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::unavailable(None, "No mock reply queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
