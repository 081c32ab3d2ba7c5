//! Game state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::interpret::ValidationRejected;

/// Questions available per round
pub const MAX_QUESTIONS: u32 = 20;

/// Theme used when no custom theme is chosen
pub const GENERAL_THEME: &str = "General";

/// Who supplies the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// The oracle picks the secret; the user asks questions
    UserGuesses,
    /// The user holds the secret; the oracle asks questions
    AiGuesses,
}

/// Difficulty level 1..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

#[allow(dead_code)] // Levels other than the default are built from requests
impl Difficulty {
    pub const EASY: Difficulty = Difficulty(1);
    pub const MEDIUM: Difficulty = Difficulty(2);
    pub const HARD: Difficulty = Difficulty(3);

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn description(self) -> &'static str {
        match self.0 {
            1 => "Easy",
            3 => "Hard",
            _ => "Medium",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if (1..=3).contains(&level) {
            Ok(Difficulty(level))
        } else {
            Err(format!("difficulty must be 1, 2 or 3, got {level}"))
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

/// Answer buttons offered while the oracle is guessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Sometimes,
    Idk,
}

impl Answer {
    /// Text echoed into the conversation
    pub fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
            Answer::Sometimes => "Sometimes",
            Answer::Idk => "Idk",
        }
    }
}

/// Who produced a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
    System,
}

/// One entry in the round's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Which oracle call a reply belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    CheckTheme,
    ChooseSecret,
    ClassifyQuestion,
    AnswerQuestion,
    AskQuestion,
    MakeGuess,
    EstimateProgress,
}

impl Purpose {
    /// Generative calls the round cannot proceed without
    pub fn is_generative(self) -> bool {
        matches!(
            self,
            Purpose::ChooseSecret
                | Purpose::AnswerQuestion
                | Purpose::AskQuestion
                | Purpose::MakeGuess
        )
    }
}

/// Generative request to re-issue after a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum PendingRequest {
    ChooseSecret,
    AnswerQuestion { question: String },
    AskQuestion,
    MakeGuess,
}

/// Position in the game state machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Setup,
    CheckingTheme,
    ChoosingSecret,
    AwaitingQuestion,
    ClassifyingQuestion { question: String },
    AnsweringQuestion { question: String },
    GeneratingQuestion,
    AwaitingAnswer,
    GeneratingGuess,
    AwaitingVerdict,
    Interrupted { retry: PendingRequest },
    Ended { won: bool },
}

impl Phase {
    /// The oracle call this phase is waiting on, if any
    pub fn awaiting(&self) -> Option<Purpose> {
        match self {
            Phase::CheckingTheme => Some(Purpose::CheckTheme),
            Phase::ChoosingSecret => Some(Purpose::ChooseSecret),
            Phase::ClassifyingQuestion { .. } => Some(Purpose::ClassifyQuestion),
            Phase::AnsweringQuestion { .. } => Some(Purpose::AnswerQuestion),
            Phase::GeneratingQuestion => Some(Purpose::AskQuestion),
            Phase::GeneratingGuess => Some(Purpose::MakeGuess),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.awaiting().is_some()
    }

    /// Screen the UI should show
    pub fn screen(&self) -> Screen {
        match self {
            Phase::Setup | Phase::CheckingTheme => Screen::Setup,
            Phase::Ended { .. } => Screen::Ended,
            _ => Screen::Game,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::CheckingTheme => "checking_theme",
            Phase::ChoosingSecret => "choosing_secret",
            Phase::AwaitingQuestion => "awaiting_question",
            Phase::ClassifyingQuestion { .. } => "classifying_question",
            Phase::AnsweringQuestion { .. } => "answering_question",
            Phase::GeneratingQuestion => "generating_question",
            Phase::AwaitingAnswer => "awaiting_answer",
            Phase::GeneratingGuess => "generating_guess",
            Phase::AwaitingVerdict => "awaiting_verdict",
            Phase::Interrupted { .. } => "interrupted",
            Phase::Ended { .. } => "ended",
        }
    }
}

/// UI screen identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Setup,
    Game,
    Ended,
}

/// Setup-screen feedback about the theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ThemeFeedback {
    Accepted,
    Rejected(ValidationRejected),
    ReplacedWithGeneral,
}

impl ThemeFeedback {
    pub fn message(&self) -> String {
        match self {
            ThemeFeedback::Accepted => "Theme looks good!".to_string(),
            ThemeFeedback::Rejected(reason) => reason.to_string(),
            ThemeFeedback::ReplacedWithGeneral => {
                "Theme not suitable for family-friendly gameplay. Using General theme instead."
                    .to_string()
            }
        }
    }
}

/// All state of one game, reset at each new game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub mode: Option<Mode>,
    /// `None` while the entered custom theme is invalid
    pub theme: Option<String>,
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub conversation: Vec<Message>,
    pub active: bool,
    pub secret: Option<String>,
    pub progress: u8,
    pub phase: Phase,
    pub round_id: Option<Uuid>,
    pub theme_feedback: Option<ThemeFeedback>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            mode: None,
            theme: Some(GENERAL_THEME.to_string()),
            difficulty: Difficulty::default(),
            question_count: 0,
            conversation: Vec::new(),
            active: false,
            secret: None,
            progress: 0,
            phase: Phase::Setup,
            round_id: None,
            theme_feedback: None,
        }
    }
}

impl GameState {
    /// Start is enabled only with both a mode and a valid theme
    pub fn can_start(&self) -> bool {
        self.mode.is_some() && self.theme.is_some()
    }

    pub fn theme_name(&self) -> &str {
        self.theme.as_deref().unwrap_or(GENERAL_THEME)
    }

    pub fn is_general_theme(&self) -> bool {
        self.theme_name() == GENERAL_THEME
    }

    pub fn push(&mut self, role: Speaker, text: impl Into<String>, at: DateTime<Utc>) {
        self.conversation.push(Message {
            role,
            text: text.into(),
            timestamp: at,
        });
    }

    /// Non-system turns as "AI: ..." / "User: ..." lines
    pub fn transcript(&self, last: Option<usize>) -> String {
        let turns: Vec<&Message> = self
            .conversation
            .iter()
            .filter(|m| m.role != Speaker::System)
            .collect();
        let start = last.map_or(0, |n| turns.len().saturating_sub(n));
        turns[start..]
            .iter()
            .map(|m| {
                let who = if m.role == Speaker::Ai { "AI" } else { "User" };
                format!("{who}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Count-based progress used when the oracle estimate is unusable
    pub fn fallback_progress(&self) -> u8 {
        let pct = (self.question_count * 100 / MAX_QUESTIONS).min(100);
        u8::try_from(pct).unwrap_or(100)
    }

    #[allow(dead_code)] // Used in tests
    pub fn last_message(&self) -> Option<&Message> {
        self.conversation.last()
    }
}
