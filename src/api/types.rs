//! API request and response types

use crate::game::{Answer, Difficulty, GameState, Message, Mode, Phase, Screen};
use crate::score::ScoreRecord;
use serde::{Deserialize, Serialize};

/// Request to choose who holds the secret
#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: Mode,
}

/// Request to set the theme; absent or blank means General
#[derive(Debug, Default, Deserialize)]
pub struct ThemeRequest {
    #[serde(default)]
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DifficultyRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: Answer,
}

#[derive(Debug, Deserialize)]
pub struct FinalGuessRequest {
    pub guess: String,
}

/// Request to end the round early, optionally revealing the user's secret
#[derive(Debug, Default, Deserialize)]
pub struct GiveUpRequest {
    #[serde(default)]
    pub reveal: Option<String>,
}

/// Score record with the derived win rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresView {
    pub games_played: u32,
    pub games_won: u32,
    pub win_percentage: u32,
}

impl From<ScoreRecord> for ScoresView {
    fn from(record: ScoreRecord) -> Self {
        Self {
            games_played: record.games_played,
            games_won: record.games_won,
            win_percentage: record.win_percentage(),
        }
    }
}

/// Everything the front end needs to render the current screen
#[derive(Debug, Serialize)]
pub struct GameView {
    pub screen: Screen,
    pub phase: &'static str,
    pub mode: Option<Mode>,
    pub theme: Option<String>,
    pub theme_feedback: Option<String>,
    pub difficulty: Difficulty,
    pub difficulty_label: &'static str,
    pub can_start: bool,
    pub active: bool,
    /// An oracle call is outstanding
    pub busy: bool,
    /// The last generative call failed and can be retried
    pub can_retry: bool,
    pub question_count: u32,
    pub max_questions: u32,
    pub progress: u8,
    pub conversation: Vec<Message>,
    /// Only revealed once the round is over
    pub secret: Option<String>,
    pub won: Option<bool>,
    pub scores: ScoresView,
}

impl GameView {
    pub fn new(game: &GameState, scores: ScoreRecord) -> Self {
        let won = match game.phase {
            Phase::Ended { won } => Some(won),
            _ => None,
        };
        Self {
            screen: game.phase.screen(),
            phase: game.phase.name(),
            mode: game.mode,
            theme: game.theme.clone(),
            theme_feedback: game.theme_feedback.as_ref().map(|f| f.message()),
            difficulty: game.difficulty,
            difficulty_label: game.difficulty.description(),
            can_start: game.can_start(),
            active: game.active,
            busy: game.phase.is_busy(),
            can_retry: matches!(game.phase, Phase::Interrupted { .. }),
            question_count: game.question_count,
            max_questions: crate::game::state::MAX_QUESTIONS,
            progress: game.progress,
            conversation: game.conversation.clone(),
            secret: won.and(game.secret.clone()),
            won,
            scores: scores.into(),
        }
    }
}

/// Error body shared by all game routes
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
