//! Events that drive the game

use super::state::{Answer, Difficulty, Mode, Purpose};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Setup events
    SelectMode(Mode),
    SelectGeneralTheme,
    EnterTheme(String),
    SetDifficulty(Difficulty),
    StartRound,

    // User-guesses events
    AskQuestion(String),
    FinalGuess(String),

    // AI-guesses events
    Answer {
        answer: Answer,
        /// Uniform draw in [0, 1) for the guess decision, supplied by the driver
        draw: f64,
    },
    ConfirmGuess,
    DenyGuess,

    // Round control
    GiveUp {
        reveal: Option<String>,
    },
    Retry,
    NewGame,

    // Oracle events
    OracleReplied {
        purpose: Purpose,
        text: String,
    },
    OracleFailed {
        purpose: Purpose,
        message: String,
    },
}

impl Event {
    pub fn is_oracle(&self) -> bool {
        matches!(self, Event::OracleReplied { .. } | Event::OracleFailed { .. })
    }
}
