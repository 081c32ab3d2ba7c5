//! Prompt templates sent to the oracle
//!
//! Every prompt is a single system message built from the current game state.

use super::state::{Difficulty, GameState, MAX_QUESTIONS};
use crate::oracle::{AskOptions, OracleMessage};

/// Non-system turns included in a progress estimate
pub const PROGRESS_WINDOW: usize = 6;

/// Sampling temperature for picking the secret
pub const SECRET_TEMPERATURE: f32 = 1.0;

/// A complete oracle request
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<OracleMessage>,
    pub options: AskOptions,
}

impl Prompt {
    fn system(text: String) -> Self {
        Self {
            messages: vec![OracleMessage::system(text)],
            options: AskOptions::default(),
        }
    }

    fn with_options(mut self, options: AskOptions) -> Self {
        self.options = options;
        self
    }
}

fn secret_flavor(difficulty: Difficulty) -> &'static str {
    match difficulty.level() {
        1 => "easy and well-known",
        3 => "difficult and obscure",
        _ => "moderately challenging",
    }
}

fn question_style(difficulty: Difficulty) -> &'static str {
    match difficulty.level() {
        1 => "Ask simple, broad questions",
        3 => "Ask clever, specific questions",
        _ => "Ask strategic questions",
    }
}

pub fn check_theme(theme: &str) -> Prompt {
    Prompt::system(format!(
        "Is \"{theme}\" appropriate for a family-friendly 20 questions game? Consider whether it is:\n\
         1. Family-appropriate (no violence, adult content, etc.)\n\
         2. Playable (has enough variety for 20 questions)\n\
         3. Clear and understandable\n\n\
         Respond with only \"YES\" or \"NO\"."
    ))
}

pub fn choose_secret(game: &GameState) -> Prompt {
    let pool = if game.is_general_theme() {
        "random object, person, place, or concept".to_string()
    } else {
        format!("item from the theme: {}", game.theme_name())
    };
    Prompt::system(format!(
        "You are running a 20 questions game. Pick a {pool} for the user to guess.\n\n\
         Difficulty level: {}\n\n\
         Respond with just the object/item you've chosen, nothing else. Make it {}.",
        game.difficulty.description(),
        secret_flavor(game.difficulty),
    ))
    .with_options(AskOptions::with_temperature(SECRET_TEMPERATURE))
}

pub fn classify_question(question: &str) -> Prompt {
    Prompt::system(format!(
        "Is the following question a yes/no question? Answer with \"YES\" or \"NO\" only.\n\n\
         Question: \"{question}\""
    ))
}

pub fn answer_question(secret: &str, question: &str) -> Prompt {
    Prompt::system(format!(
        "You are the object \"{secret}\" in a 20 questions game. The user asked: \"{question}\"\n\n\
         Respond with only \"Yes\", \"No\", or \"Sometimes\" (if the answer depends on context). \
         Be accurate and helpful. If the question is about guessing the exact object, say if they got it right or wrong."
    ))
}

pub fn ask_question(game: &GameState) -> Prompt {
    let theme = if game.is_general_theme() {
        String::new()
    } else {
        format!(" (theme: {})", game.theme_name())
    };
    Prompt::system(format!(
        "You are playing 20 questions. You need to guess what the user is thinking of{theme}.\n\n\
         Difficulty: {} - {}\n\n\
         Previous conversation:\n{}\n\n\
         Question {}/{MAX_QUESTIONS}. Ask a yes/no question to narrow down what they're thinking of. \
         Be strategic and build on previous answers.",
        game.difficulty.description(),
        question_style(game.difficulty),
        game.transcript(None),
        game.question_count + 1,
    ))
}

pub fn make_guess(game: &GameState) -> Prompt {
    Prompt::system(format!(
        "Based on this 20 questions conversation, make your best guess at what the user is thinking of:\n\n\
         {}\n\n\
         Respond with: \"Is it [your guess]?\" - make only one specific guess.",
        game.transcript(None),
    ))
}

pub fn estimate_progress(game: &GameState) -> Prompt {
    Prompt::system(format!(
        "Analyze this 20 questions conversation and estimate how close we are to the answer. \
         Return only a number between 0-100 representing the percentage of progress toward solving the puzzle.\n\n\
         Conversation:\n{}\n\n\
         Consider: How specific are the questions/answers getting? How much has been narrowed down? Return only the number.",
        game.transcript(Some(PROGRESS_WINDOW)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Speaker, GENERAL_THEME};
    use chrono::Utc;

    #[test]
    fn test_choose_secret_uses_high_temperature() {
        let game = GameState::default();
        let prompt = choose_secret(&game);
        assert_eq!(prompt.options.temperature, Some(SECRET_TEMPERATURE));
        assert!(prompt.messages[0]
            .content
            .contains("random object, person, place, or concept"));
        assert!(prompt.messages[0].content.contains("moderately challenging"));
    }

    #[test]
    fn test_choose_secret_with_theme_and_difficulty() {
        let game = GameState {
            theme: Some("Kitchen tools".to_string()),
            difficulty: Difficulty::HARD,
            ..GameState::default()
        };
        let text = &choose_secret(&game).messages[0].content;
        assert!(text.contains("item from the theme: Kitchen tools"));
        assert!(text.contains("Difficulty level: Hard"));
        assert!(text.contains("difficult and obscure"));
    }

    #[test]
    fn test_ask_question_includes_transcript_and_number() {
        let mut game = GameState {
            theme: Some(GENERAL_THEME.to_string()),
            difficulty: Difficulty::EASY,
            question_count: 1,
            ..GameState::default()
        };
        let now = Utc::now();
        game.push(Speaker::System, "Think of something", now);
        game.push(Speaker::Ai, "Is it alive?", now);
        game.push(Speaker::User, "Yes", now);

        let text = &ask_question(&game).messages[0].content;
        assert!(text.contains("AI: Is it alive?\nUser: Yes"));
        assert!(!text.contains("Think of something"));
        assert!(text.contains("Question 2/20"));
        assert!(text.contains("Ask simple, broad questions"));
        assert!(!text.contains("(theme:"));
    }

    #[test]
    fn test_estimate_progress_uses_last_six_turns() {
        let mut game = GameState::default();
        let now = Utc::now();
        for i in 0..8 {
            game.push(Speaker::Ai, format!("question {i}"), now);
        }
        let text = &estimate_progress(&game).messages[0].content;
        assert!(!text.contains("question 1"));
        assert!(text.contains("question 2"));
        assert!(text.contains("question 7"));
    }
}
