//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same new
//! state and effects. All oracle traffic and score persistence happen in the
//! controller by executing the returned effects.

use super::effect::Effect;
use super::event::Event;
use super::interpret::{
    detect_correct_guess, is_yes_verdict, judge_final_guess, parse_progress, validate_theme,
    ThemeChoice, ValidationRejected,
};
use super::prompts;
use super::state::{
    Answer, GameState, Mode, PendingRequest, Phase, Purpose, Speaker, ThemeFeedback, GENERAL_THEME,
    MAX_QUESTIONS,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Question count from which the oracle always guesses
pub const GUESS_AFTER_QUESTIONS: u32 = 15;

/// Chance of guessing early after each answer
pub const GUESS_PROBABILITY: f64 = 0.3;

/// Inputs a transition may need that are not part of the state
#[derive(Debug, Clone)]
pub struct GameContext {
    pub now: DateTime<Utc>,
    /// Identifier given to the round if this transition starts one
    pub next_round_id: Uuid,
}

impl GameContext {
    pub fn new(now: DateTime<Utc>, next_round_id: Uuid) -> Self {
        Self { now, next_round_id }
    }

    pub fn now() -> Self {
        Self::new(Utc::now(), Uuid::new_v4())
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: GameState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: GameState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Waiting for the oracle, try again once it has replied")]
    Busy,
    #[error("The round is over, start a new game")]
    RoundInactive,
    #[error("Choose a role and a valid theme before starting")]
    CannotStart,
    #[error("Not available in this game mode")]
    WrongMode,
    #[error(transparent)]
    Rejected(#[from] ValidationRejected),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per edge of the state machine
pub fn transition(
    game: &GameState,
    ctx: &GameContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    // Progress estimates are advisory and land in whatever phase is current
    if let Event::OracleReplied {
        purpose: Purpose::EstimateProgress,
        text,
    } = &event
    {
        let mut next = game.clone();
        next.progress = parse_progress(text).unwrap_or_else(|| game.fallback_progress());
        return Ok(TransitionResult::new(next));
    }
    if let Event::OracleFailed {
        purpose: Purpose::EstimateProgress,
        ..
    } = &event
    {
        let mut next = game.clone();
        next.progress = game.fallback_progress();
        return Ok(TransitionResult::new(next));
    }

    if !event.is_oracle() && game.phase.is_busy() {
        return Err(TransitionError::Busy);
    }
    if let Event::OracleReplied { purpose, .. } | Event::OracleFailed { purpose, .. } = &event {
        if game.phase.awaiting() != Some(*purpose) {
            return Err(TransitionError::InvalidTransition(format!(
                "No {purpose:?} reply expected in {}",
                game.phase.name()
            )));
        }
    }

    if event == Event::NewGame {
        return Ok(TransitionResult::new(GameState::default()));
    }

    if matches!(game.phase, Phase::Ended { .. }) {
        return Err(TransitionError::RoundInactive);
    }

    let mut next = game.clone();
    let now = ctx.now;

    match (&game.phase, event) {
        // ============================================================
        // Setup
        // ============================================================
        (Phase::Setup, Event::SelectMode(mode)) => {
            next.mode = Some(mode);
            Ok(TransitionResult::new(next))
        }

        (Phase::Setup, Event::SelectGeneralTheme) => {
            next.theme = Some(GENERAL_THEME.to_string());
            next.theme_feedback = None;
            Ok(TransitionResult::new(next))
        }

        (Phase::Setup, Event::EnterTheme(raw)) => {
            match validate_theme(&raw) {
                Ok(ThemeChoice::General) => {
                    next.theme = Some(GENERAL_THEME.to_string());
                    next.theme_feedback = None;
                }
                Ok(ThemeChoice::Custom(theme)) => {
                    next.theme = Some(theme);
                    next.theme_feedback = Some(ThemeFeedback::Accepted);
                }
                Err(reason) => {
                    next.theme = None;
                    next.theme_feedback = Some(ThemeFeedback::Rejected(reason));
                }
            }
            Ok(TransitionResult::new(next))
        }

        (Phase::Setup, Event::SetDifficulty(difficulty)) => {
            next.difficulty = difficulty;
            Ok(TransitionResult::new(next))
        }

        (Phase::Setup, Event::StartRound) => {
            if !game.can_start() {
                return Err(TransitionError::CannotStart);
            }
            if game.is_general_theme() {
                Ok(begin_round(next, ctx))
            } else {
                let prompt = prompts::check_theme(game.theme_name());
                next.phase = Phase::CheckingTheme;
                Ok(TransitionResult::new(next).with_effect(Effect::ask(Purpose::CheckTheme, prompt)))
            }
        }

        (Phase::CheckingTheme, Event::OracleReplied { text, .. }) => {
            if !is_yes_verdict(&text) {
                next.theme = Some(GENERAL_THEME.to_string());
                next.theme_feedback = Some(ThemeFeedback::ReplacedWithGeneral);
            }
            Ok(begin_round(next, ctx))
        }

        (Phase::CheckingTheme, Event::OracleFailed { .. }) => {
            next.theme = Some(GENERAL_THEME.to_string());
            next.theme_feedback = Some(ThemeFeedback::ReplacedWithGeneral);
            Ok(begin_round(next, ctx))
        }

        // ============================================================
        // User guesses: oracle holds the secret
        // ============================================================
        (Phase::ChoosingSecret, Event::OracleReplied { text, .. }) => {
            let secret = text.trim();
            if secret.is_empty() {
                return Ok(interrupt(
                    next,
                    PendingRequest::ChooseSecret,
                    "Sorry, I had trouble picking something to guess. Please try again.",
                    now,
                ));
            }
            next.secret = Some(secret.to_string());
            let intro = format!(
                "I'm thinking of something{}. Ask me yes/no questions to figure out what it is! You have {MAX_QUESTIONS} questions.",
                theme_suffix(game)
            );
            next.push(Speaker::System, intro, now);
            next.phase = Phase::AwaitingQuestion;
            Ok(TransitionResult::new(next))
        }

        (Phase::ChoosingSecret, Event::OracleFailed { .. }) => Ok(interrupt(
            next,
            PendingRequest::ChooseSecret,
            "Sorry, I had trouble picking something to guess. Please try again.",
            now,
        )),

        (Phase::AwaitingQuestion, Event::AskQuestion(raw)) => {
            let question = raw.trim();
            if question.is_empty() {
                return Err(ValidationRejected::EmptyInput.into());
            }
            let prompt = prompts::classify_question(question);
            next.phase = Phase::ClassifyingQuestion {
                question: question.to_string(),
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::ask(Purpose::ClassifyQuestion, prompt)))
        }

        (Phase::ClassifyingQuestion { question }, Event::OracleReplied { text, .. }) => {
            if is_yes_verdict(&text) {
                Ok(accept_question(next, question.clone(), now))
            } else {
                next.push(
                    Speaker::System,
                    ValidationRejected::NotYesNoQuestion.to_string(),
                    now,
                );
                next.phase = Phase::AwaitingQuestion;
                Ok(TransitionResult::new(next))
            }
        }

        // Classification failures let the question through
        (Phase::ClassifyingQuestion { question }, Event::OracleFailed { .. }) => {
            Ok(accept_question(next, question.clone(), now))
        }

        (Phase::AnsweringQuestion { question }, Event::OracleReplied { text, .. }) => {
            let secret = game.secret.clone().ok_or_else(|| {
                TransitionError::InvalidTransition("answering without a secret".to_string())
            })?;
            next.push(Speaker::Ai, text.as_str(), now);

            if detect_correct_guess(question, &text, &secret) {
                Ok(end_round(
                    next,
                    true,
                    format!("Congratulations! You guessed it: {secret}"),
                    now,
                ))
            } else if next.question_count >= MAX_QUESTIONS {
                Ok(end_round(
                    next,
                    false,
                    format!("You've used all {MAX_QUESTIONS} questions! The answer was: {secret}"),
                    now,
                ))
            } else {
                next.phase = Phase::AwaitingQuestion;
                let effects = progress_effect(&mut next);
                Ok(TransitionResult::new(next).with_effects(effects))
            }
        }

        (Phase::AnsweringQuestion { question }, Event::OracleFailed { .. }) => Ok(interrupt(
            next,
            PendingRequest::AnswerQuestion {
                question: question.clone(),
            },
            "Sorry, I had trouble responding. Please try again.",
            now,
        )),

        (Phase::AwaitingQuestion | Phase::Interrupted { .. }, Event::FinalGuess(raw)) => {
            if game.mode != Some(Mode::UserGuesses) {
                return Err(TransitionError::WrongMode);
            }
            let guess = raw.trim();
            if guess.is_empty() {
                return Err(ValidationRejected::EmptyInput.into());
            }
            let secret = game.secret.clone().ok_or_else(|| {
                TransitionError::InvalidTransition("no secret has been chosen yet".to_string())
            })?;
            next.push(Speaker::User, format!("My final guess: {guess}"), now);
            if judge_final_guess(guess, &secret) {
                Ok(end_round(next, true, format!("Correct! It was {secret}!"), now))
            } else {
                Ok(end_round(
                    next,
                    false,
                    format!("Sorry, it was {secret}. Better luck next time!"),
                    now,
                ))
            }
        }

        // ============================================================
        // AI guesses: user holds the secret
        // ============================================================
        (Phase::GeneratingQuestion, Event::OracleReplied { text, .. }) => {
            next.push(Speaker::Ai, text, now);
            next.question_count += 1;
            next.phase = Phase::AwaitingAnswer;
            let effects = progress_effect(&mut next);
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        (Phase::GeneratingQuestion, Event::OracleFailed { .. }) => Ok(interrupt(
            next,
            PendingRequest::AskQuestion,
            "Sorry, I had trouble thinking of a question. Please try again.",
            now,
        )),

        (Phase::AwaitingVerdict, Event::Answer { answer: Answer::Idk, .. }) => Err(
            TransitionError::InvalidTransition("A guess needs yes, no or sometimes".to_string()),
        ),

        (Phase::AwaitingAnswer | Phase::AwaitingVerdict, Event::Answer { answer, draw }) => {
            next.push(Speaker::User, answer.label(), now);
            if answer == Answer::Idk {
                return Ok(request_question(next, now));
            }

            let progress = progress_effect(&mut next);
            let decided = if next.question_count >= GUESS_AFTER_QUESTIONS || draw < GUESS_PROBABILITY
            {
                request_guess(next)
            } else {
                request_question(next, now)
            };
            let mut effects = progress;
            effects.extend(decided.effects);
            Ok(TransitionResult::new(decided.new_state).with_effects(effects))
        }

        (Phase::GeneratingGuess, Event::OracleReplied { text, .. }) => {
            next.push(Speaker::Ai, text, now);
            next.phase = Phase::AwaitingVerdict;
            Ok(TransitionResult::new(next))
        }

        (Phase::GeneratingGuess, Event::OracleFailed { .. }) => Ok(interrupt(
            next,
            PendingRequest::MakeGuess,
            "Sorry, I had trouble making a guess. Please try again.",
            now,
        )),

        (Phase::AwaitingVerdict, Event::ConfirmGuess) => {
            next.push(Speaker::User, "Yes, you guessed it!", now);
            Ok(end_round(next, false, "I guessed it! Great game!", now))
        }

        (Phase::AwaitingVerdict, Event::DenyGuess) => {
            next.push(Speaker::User, "No, keep guessing", now);
            Ok(request_question(next, now))
        }

        // ============================================================
        // Round control
        // ============================================================
        (
            Phase::AwaitingQuestion
            | Phase::AwaitingAnswer
            | Phase::AwaitingVerdict
            | Phase::Interrupted { .. },
            Event::GiveUp { reveal },
        ) => {
            let message = match (game.mode, &game.secret) {
                (Some(Mode::UserGuesses), Some(secret)) => format!("The answer was: {secret}"),
                (Some(Mode::AiGuesses), _) => match reveal.as_deref().map(str::trim) {
                    Some(answer) if !answer.is_empty() => format!("Ah, it was {answer}! Good one!"),
                    _ => "Thanks for playing!".to_string(),
                },
                _ => "Thanks for playing!".to_string(),
            };
            Ok(end_round(next, false, message, now))
        }

        (Phase::Interrupted { retry }, Event::Retry) => Ok(reissue(next, retry.clone(), now)),

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {event:?}",
            phase.name()
        ))),
    }
}

// Helper functions

fn theme_suffix(game: &GameState) -> String {
    if game.is_general_theme() {
        String::new()
    } else {
        format!(" related to {}", game.theme_name())
    }
}

/// Reset round fields and enter the mode's first phase
fn begin_round(mut game: GameState, ctx: &GameContext) -> TransitionResult {
    game.question_count = 0;
    game.conversation.clear();
    game.active = true;
    game.progress = 0;
    game.secret = None;
    game.round_id = Some(ctx.next_round_id);

    match game.mode {
        Some(Mode::AiGuesses) => {
            let intro = format!(
                "Think of something{} and I'll try to guess it! I'll ask you yes/no questions.",
                theme_suffix(&game)
            );
            game.push(Speaker::System, intro, ctx.now);
            request_question(game, ctx.now)
        }
        _ => {
            let prompt = prompts::choose_secret(&game);
            game.phase = Phase::ChoosingSecret;
            TransitionResult::new(game).with_effect(Effect::ask(Purpose::ChooseSecret, prompt))
        }
    }
}

fn accept_question(mut game: GameState, question: String, now: DateTime<Utc>) -> TransitionResult {
    game.push(Speaker::User, question.as_str(), now);
    game.question_count += 1;
    let prompt = prompts::answer_question(game.secret.as_deref().unwrap_or_default(), &question);
    game.phase = Phase::AnsweringQuestion { question };
    TransitionResult::new(game).with_effect(Effect::ask(Purpose::AnswerQuestion, prompt))
}

/// Ask the oracle for its next question, or end the round once questions run out
fn request_question(mut game: GameState, now: DateTime<Utc>) -> TransitionResult {
    if game.question_count >= MAX_QUESTIONS {
        return end_round(
            game,
            false,
            format!(
                "I couldn't guess it in {MAX_QUESTIONS} questions! What were you thinking of?"
            ),
            now,
        );
    }
    let prompt = prompts::ask_question(&game);
    game.phase = Phase::GeneratingQuestion;
    TransitionResult::new(game).with_effect(Effect::ask(Purpose::AskQuestion, prompt))
}

fn request_guess(mut game: GameState) -> TransitionResult {
    let prompt = prompts::make_guess(&game);
    game.phase = Phase::GeneratingGuess;
    TransitionResult::new(game).with_effect(Effect::ask(Purpose::MakeGuess, prompt))
}

/// Progress request after an exchange; too short a conversation resets to zero
fn progress_effect(game: &mut GameState) -> Vec<Effect> {
    if game.conversation.len() < 2 {
        game.progress = 0;
        return vec![];
    }
    vec![Effect::ask(
        Purpose::EstimateProgress,
        prompts::estimate_progress(game),
    )]
}

fn interrupt(
    mut game: GameState,
    retry: PendingRequest,
    message: &str,
    now: DateTime<Utc>,
) -> TransitionResult {
    game.push(Speaker::System, message, now);
    game.phase = Phase::Interrupted { retry };
    TransitionResult::new(game)
}

fn reissue(mut game: GameState, request: PendingRequest, now: DateTime<Utc>) -> TransitionResult {
    match request {
        PendingRequest::ChooseSecret => {
            let prompt = prompts::choose_secret(&game);
            game.phase = Phase::ChoosingSecret;
            TransitionResult::new(game).with_effect(Effect::ask(Purpose::ChooseSecret, prompt))
        }
        PendingRequest::AnswerQuestion { question } => {
            let prompt =
                prompts::answer_question(game.secret.as_deref().unwrap_or_default(), &question);
            game.phase = Phase::AnsweringQuestion { question };
            TransitionResult::new(game).with_effect(Effect::ask(Purpose::AnswerQuestion, prompt))
        }
        PendingRequest::AskQuestion => request_question(game, now),
        PendingRequest::MakeGuess => request_guess(game),
    }
}

fn end_round(
    mut game: GameState,
    won: bool,
    message: impl Into<String>,
    now: DateTime<Utc>,
) -> TransitionResult {
    game.active = false;
    game.push(Speaker::System, message, now);
    game.phase = Phase::Ended { won };
    TransitionResult::new(game).with_effect(Effect::RecordOutcome { won })
}
