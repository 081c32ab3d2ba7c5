//! Property-based tests for the game state machine
//!
//! Random event sequences, including oracle replies for any purpose, are fed
//! through the transition function; rejected events leave the state as is.

use super::effect::Effect;
use super::event::Event;
use super::state::*;
use super::transition::*;
use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> GameContext {
    GameContext::new(Utc::now(), Uuid::nil())
}

/// Apply events in order, skipping the ones the machine rejects
fn run(events: Vec<Event>) -> Vec<(GameState, Vec<Effect>)> {
    let mut state = GameState::default();
    let mut trace = vec![];
    for event in events {
        if let Ok(result) = transition(&state, &test_context(), event) {
            state = result.new_state.clone();
            trace.push((result.new_state, result.effects));
        }
    }
    trace
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::UserGuesses), Just(Mode::AiGuesses)]
}

fn arb_answer() -> impl Strategy<Value = Answer> {
    prop_oneof![
        Just(Answer::Yes),
        Just(Answer::No),
        Just(Answer::Sometimes),
        Just(Answer::Idk),
    ]
}

fn arb_purpose() -> impl Strategy<Value = Purpose> {
    prop_oneof![
        Just(Purpose::CheckTheme),
        Just(Purpose::ChooseSecret),
        Just(Purpose::ClassifyQuestion),
        Just(Purpose::AnswerQuestion),
        Just(Purpose::AskQuestion),
        Just(Purpose::MakeGuess),
        Just(Purpose::EstimateProgress),
    ]
}

fn arb_reply_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("YES".to_string()),
        Just("NO".to_string()),
        Just("guitar".to_string()),
        Just("Yes, it is a guitar".to_string()),
        Just("250".to_string()),
        Just("-4".to_string()),
        Just(String::new()),
        "[a-zA-Z0-9 ?]{0,20}",
    ]
}

fn arb_oracle_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (arb_purpose(), arb_reply_text())
            .prop_map(|(purpose, text)| Event::OracleReplied { purpose, text }),
        arb_purpose().prop_map(|purpose| Event::OracleFailed {
            purpose,
            message: "boom".to_string(),
        }),
    ]
}

fn arb_setup_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_mode().prop_map(Event::SelectMode),
        Just(Event::SelectGeneralTheme),
        "[a-zA-Z ]{0,12}".prop_map(Event::EnterTheme),
        (1u8..=3).prop_map(|level| Event::SetDifficulty(
            Difficulty::try_from(level).unwrap_or_default()
        )),
        Just(Event::StartRound),
    ]
}

fn arb_play_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ?]{0,20}".prop_map(Event::AskQuestion),
        "[a-z]{0,10}".prop_map(Event::FinalGuess),
        (arb_answer(), 0.0f64..1.0).prop_map(|(answer, draw)| Event::Answer { answer, draw }),
        Just(Event::ConfirmGuess),
        Just(Event::DenyGuess),
        proptest::option::of("[a-z]{1,8}").prop_map(|reveal| Event::GiveUp { reveal }),
        Just(Event::Retry),
        Just(Event::NewGame),
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![arb_setup_event(), arb_play_event()]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_user_event(),
        4 => arb_oracle_event(),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &GameState) -> bool {
    let inactive_phase = matches!(
        state.phase,
        Phase::Setup | Phase::CheckingTheme | Phase::Ended { .. }
    );
    state.question_count <= MAX_QUESTIONS && state.progress <= 100 && inactive_phase != state.active
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..80)) {
        for (state, _) in run(events) {
            prop_assert!(is_valid_state(&state), "Invalid state: {:?}", state);
        }
    }

    #[test]
    fn prop_outcome_recorded_exactly_on_round_end(events in proptest::collection::vec(arb_event(), 0..80)) {
        let mut previous = GameState::default();
        for (state, effects) in run(events) {
            let records = effects
                .iter()
                .filter(|e| matches!(e, Effect::RecordOutcome { .. }))
                .count();
            let ended_now = matches!(state.phase, Phase::Ended { .. })
                && !matches!(previous.phase, Phase::Ended { .. });
            prop_assert_eq!(records, usize::from(ended_now));
            previous = state;
        }
    }

    #[test]
    fn prop_idk_never_changes_count(
        count in 1u32..MAX_QUESTIONS,
        draw in 0.0f64..1.0,
    ) {
        let game = GameState {
            mode: Some(Mode::AiGuesses),
            question_count: count,
            active: true,
            phase: Phase::AwaitingAnswer,
            ..GameState::default()
        };
        let result = transition(&game, &test_context(), Event::Answer { answer: Answer::Idk, draw });
        prop_assert!(result.is_ok());
        let result = result.unwrap();
        prop_assert_eq!(result.new_state.question_count, count);
        let asks_guess_or_progress = result.effects.iter().any(|e| {
            matches!(
                e,
                Effect::AskOracle { purpose: Purpose::MakeGuess | Purpose::EstimateProgress, .. }
            )
        });
        prop_assert!(!asks_guess_or_progress);
    }

    #[test]
    fn prop_ended_is_absorbing(won in any::<bool>(), event in arb_event()) {
        let game = GameState {
            mode: Some(Mode::UserGuesses),
            phase: Phase::Ended { won },
            ..GameState::default()
        };
        let result = transition(&game, &test_context(), event.clone());
        match event {
            Event::NewGame => {
                prop_assert_eq!(result.unwrap().new_state, GameState::default());
            }
            Event::OracleReplied { purpose: Purpose::EstimateProgress, .. }
            | Event::OracleFailed { purpose: Purpose::EstimateProgress, .. } => {
                let state = result.unwrap().new_state;
                prop_assert_eq!(state.phase, Phase::Ended { won });
            }
            _ => prop_assert!(result.is_err()),
        }
    }

    #[test]
    fn prop_busy_rejects_user_input(event in arb_user_event()) {
        let mut game = GameState {
            mode: Some(Mode::UserGuesses),
            secret: Some("guitar".to_string()),
            active: true,
            ..GameState::default()
        };
        for phase in [
            Phase::CheckingTheme,
            Phase::ChoosingSecret,
            Phase::ClassifyingQuestion { question: "Is it big?".to_string() },
            Phase::AnsweringQuestion { question: "Is it big?".to_string() },
            Phase::GeneratingQuestion,
            Phase::GeneratingGuess,
        ] {
            game.phase = phase;
            prop_assert_eq!(
                transition(&game, &test_context(), event.clone()).unwrap_err(),
                TransitionError::Busy
            );
        }
    }

    #[test]
    fn prop_progress_reply_always_in_range(text in arb_reply_text(), count in 0u32..=MAX_QUESTIONS) {
        let game = GameState {
            question_count: count,
            ..GameState::default()
        };
        let event = Event::OracleReplied { purpose: Purpose::EstimateProgress, text };
        let state = transition(&game, &test_context(), event).unwrap().new_state;
        prop_assert!(state.progress <= 100);
    }
}
