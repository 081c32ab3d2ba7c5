//! Game controller
//!
//! Owns the game state and the score record, runs the pure transition
//! function and executes its effects one at a time. Oracle replies are fed
//! back as events, so loops such as "ask another question" are ordinary
//! transitions rather than nested calls.
//!
//! Every committed state is published on a watch channel, so readers see
//! busy phases while a call is outstanding without waiting for the action.

use super::effect::Effect;
use super::event::Event;
use super::state::{Answer, Difficulty, GameState, Mode};
use super::transition::{transition, GameContext, TransitionError};
use crate::oracle::Oracle;
use crate::score::{ScoreError, ScoreRecord, ScoreStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::watch;

/// Errors surfaced by controller actions
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Published copy of the game for readers
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub state: GameState,
    pub scores: ScoreRecord,
}

/// One UI control
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectMode(Mode),
    SelectGeneralTheme,
    EnterTheme(String),
    SetDifficulty(Difficulty),
    StartRound,
    AskQuestion(String),
    Answer(Answer),
    ConfirmGuess,
    DenyGuess,
    FinalGuess(String),
    GiveUp { reveal: Option<String> },
    Retry,
    NewGame,
    ResetScores,
}

/// Drives one game against an oracle and a score store
pub struct GameController<O, S>
where
    O: Oracle,
    S: ScoreStore,
{
    state: GameState,
    scores: ScoreRecord,
    oracle: O,
    store: S,
    rng: StdRng,
    snapshot_tx: watch::Sender<GameSnapshot>,
}

impl<O, S> GameController<O, S>
where
    O: Oracle,
    S: ScoreStore,
{
    /// Create a controller, loading the persisted score record
    pub async fn new(oracle: O, store: S) -> Self {
        Self::with_rng(oracle, store, StdRng::from_entropy()).await
    }

    pub async fn with_rng(oracle: O, store: S, rng: StdRng) -> Self {
        let scores = match store.load().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load scores, starting from zero");
                ScoreRecord::default()
            }
        };
        let (snapshot_tx, _) = watch::channel(GameSnapshot {
            state: GameState::default(),
            scores,
        });
        Self {
            state: GameState::default(),
            scores,
            oracle,
            store,
            rng,
            snapshot_tx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub fn scores(&self) -> ScoreRecord {
        self.scores
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            state: self.state.clone(),
            scores: self.scores,
        }
    }

    /// Receiver that always holds the latest committed state
    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    /// Run one UI action to completion
    pub async fn perform(&mut self, action: Action) -> Result<GameSnapshot, GameError> {
        match action {
            Action::SelectMode(mode) => {
                self.select_mode(mode).await?;
            }
            Action::SelectGeneralTheme => {
                self.select_general_theme().await?;
            }
            Action::EnterTheme(theme) => {
                self.enter_theme(&theme).await?;
            }
            Action::SetDifficulty(level) => {
                self.set_difficulty(level).await?;
            }
            Action::StartRound => {
                self.start_round().await?;
            }
            Action::AskQuestion(text) => {
                self.ask_question(&text).await?;
            }
            Action::Answer(answer) => {
                self.answer(answer).await?;
            }
            Action::ConfirmGuess => {
                self.confirm_guess().await?;
            }
            Action::DenyGuess => {
                self.deny_guess().await?;
            }
            Action::FinalGuess(guess) => {
                self.final_guess(&guess).await?;
            }
            Action::GiveUp { reveal } => {
                self.give_up(reveal).await?;
            }
            Action::Retry => {
                self.retry().await?;
            }
            Action::NewGame => {
                self.new_game().await?;
            }
            Action::ResetScores => {
                self.reset_scores().await?;
            }
        }
        Ok(self.snapshot())
    }

    // ============================================================
    // Actions (one per UI control)
    // ============================================================

    pub async fn select_mode(&mut self, mode: Mode) -> Result<&GameState, GameError> {
        self.dispatch(Event::SelectMode(mode)).await
    }

    pub async fn select_general_theme(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::SelectGeneralTheme).await
    }

    pub async fn enter_theme(&mut self, theme: &str) -> Result<&GameState, GameError> {
        self.dispatch(Event::EnterTheme(theme.to_string())).await
    }

    pub async fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<&GameState, GameError> {
        self.dispatch(Event::SetDifficulty(difficulty)).await
    }

    pub async fn start_round(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::StartRound).await
    }

    pub async fn ask_question(&mut self, question: &str) -> Result<&GameState, GameError> {
        self.dispatch(Event::AskQuestion(question.to_string())).await
    }

    pub async fn answer(&mut self, answer: Answer) -> Result<&GameState, GameError> {
        let draw = self.rng.gen::<f64>();
        self.dispatch(Event::Answer { answer, draw }).await
    }

    pub async fn confirm_guess(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::ConfirmGuess).await
    }

    pub async fn deny_guess(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::DenyGuess).await
    }

    pub async fn final_guess(&mut self, guess: &str) -> Result<&GameState, GameError> {
        self.dispatch(Event::FinalGuess(guess.to_string())).await
    }

    pub async fn give_up(&mut self, reveal: Option<String>) -> Result<&GameState, GameError> {
        self.dispatch(Event::GiveUp { reveal }).await
    }

    pub async fn retry(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::Retry).await
    }

    pub async fn new_game(&mut self) -> Result<&GameState, GameError> {
        self.dispatch(Event::NewGame).await
    }

    /// Zero the score record and persist it
    pub async fn reset_scores(&mut self) -> Result<ScoreRecord, GameError> {
        let record = ScoreRecord::default();
        self.store.save(&record).await?;
        self.scores = record;
        self.publish();
        tracing::info!("Scores reset");
        Ok(record)
    }

    // ============================================================
    // Event processing
    // ============================================================

    /// Apply an event and every event its effects produce, in order
    ///
    /// If a generated event is rejected, the state from before the action is
    /// restored so no busy phase is left behind.
    pub async fn dispatch(&mut self, event: Event) -> Result<&GameState, GameError> {
        let before = self.state.clone();
        let mut events = VecDeque::from([event]);

        while let Some(current) = events.pop_front() {
            let result = match transition(&self.state, &GameContext::now(), current) {
                Ok(result) => result,
                Err(e) => {
                    if self.state != before {
                        tracing::warn!(
                            round_id = ?self.state.round_id,
                            phase = self.state.phase.name(),
                            error = %e,
                            "Generated event rejected, restoring state"
                        );
                        self.state = before;
                        self.publish();
                    }
                    return Err(e.into());
                }
            };

            if result.new_state.phase != self.state.phase {
                tracing::debug!(
                    round_id = ?result.new_state.round_id,
                    from = self.state.phase.name(),
                    to = result.new_state.phase.name(),
                    question_count = result.new_state.question_count,
                    "Game phase changed"
                );
            }
            self.state = result.new_state;
            self.publish();

            if !result.effects.is_empty() {
                let oracle_calls: Vec<_> = result.effects.iter().filter_map(Effect::purpose).collect();
                tracing::debug!(
                    round_id = ?self.state.round_id,
                    ?oracle_calls,
                    effects = result.effects.len(),
                    "Executing effects"
                );
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    events.push_back(generated);
                }
            }
        }

        Ok(&self.state)
    }

    /// Execute an effect and optionally return the event it generated
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AskOracle { purpose, prompt } => {
                match self.oracle.ask(&prompt.messages, prompt.options).await {
                    Ok(text) => {
                        tracing::debug!(?purpose, reply = %text, "Oracle replied");
                        Some(Event::OracleReplied { purpose, text })
                    }
                    Err(e) => {
                        tracing::warn!(
                            round_id = ?self.state.round_id,
                            ?purpose,
                            generative = purpose.is_generative(),
                            error = %e,
                            "Oracle call failed"
                        );
                        Some(Event::OracleFailed {
                            purpose,
                            message: e.to_string(),
                        })
                    }
                }
            }

            Effect::RecordOutcome { won } => {
                self.scores.record(won);
                tracing::info!(
                    round_id = ?self.state.round_id,
                    won,
                    games_played = self.scores.games_played,
                    games_won = self.scores.games_won,
                    "Round ended"
                );
                self.publish();
                if let Err(e) = self.store.save(&self.scores).await {
                    tracing::error!(error = %e, "Failed to persist scores");
                }
                None
            }
        }
    }
}
