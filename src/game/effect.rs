//! Effects produced by state transitions

use super::prompts::Prompt;
use super::state::Purpose;

/// Effects to be executed, in order, after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a prompt to the oracle and feed the reply back as an event
    AskOracle { purpose: Purpose, prompt: Prompt },

    /// Count the finished round and persist the score record
    RecordOutcome { won: bool },
}

impl Effect {
    pub fn ask(purpose: Purpose, prompt: Prompt) -> Self {
        Effect::AskOracle { purpose, prompt }
    }

    pub fn purpose(&self) -> Option<Purpose> {
        match self {
            Effect::AskOracle { purpose, .. } => Some(*purpose),
            Effect::RecordOutcome { .. } => None,
        }
    }
}
