//! Interpretation of free-text input and oracle replies
//!
//! Each decision point the game makes on free text has exactly one function
//! here. All of them normalize by trimming and lowercasing, then match against
//! a small fixed vocabulary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substrings that reject a custom theme locally
pub const THEME_DENYLIST: [&str; 5] = ["violence", "weapon", "drug", "adult", "explicit"];

const MIN_THEME_CHARS: usize = 3;

/// Local validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRejected {
    #[error("Theme too short")]
    ThemeTooShort,
    #[error("Please choose a family-friendly theme")]
    ThemeNotFamilyFriendly,
    #[error("Please ask a yes/no question.")]
    NotYesNoQuestion,
    #[error("Input is empty")]
    EmptyInput,
}

/// Result of local theme validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChoice {
    General,
    Custom(String),
}

/// Local theme gates: blank selects General, then length, then denylist
pub fn validate_theme(raw: &str) -> Result<ThemeChoice, ValidationRejected> {
    let theme = raw.trim();
    if theme.is_empty() {
        return Ok(ThemeChoice::General);
    }
    if theme.chars().count() < MIN_THEME_CHARS {
        return Err(ValidationRejected::ThemeTooShort);
    }
    let lower = theme.to_lowercase();
    if THEME_DENYLIST.iter().any(|word| lower.contains(word)) {
        return Err(ValidationRejected::ThemeNotFamilyFriendly);
    }
    Ok(ThemeChoice::Custom(theme.to_string()))
}

/// A strict YES verdict from a classification prompt
pub fn is_yes_verdict(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case("yes")
}

/// Leading integer of the reply clamped to 0..=100, or `None` if there is none
pub fn parse_progress(reply: &str) -> Option<u8> {
    let trimmed = reply.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let leading: String = digits.chars().take_while(char::is_ascii_digit).collect();
    if leading.is_empty() {
        return None;
    }
    if negative {
        return Some(0);
    }
    // Overlong digit strings saturate rather than fail
    let value = leading.parse::<u64>().unwrap_or(u64::MAX);
    Some(u8::try_from(value.min(100)).unwrap_or(100))
}

/// Whether the secret's answer means the user found it.
///
/// The reply mentioning "correct" or "right" counts, as does a question naming
/// the secret answered with something containing "yes".
pub fn detect_correct_guess(question: &str, reply: &str, secret: &str) -> bool {
    let reply = reply.to_lowercase();
    if reply.contains("correct") || reply.contains("right") {
        return true;
    }
    question.to_lowercase().contains(&secret.to_lowercase()) && reply.contains("yes")
}

/// Final guess is correct when either string contains the other, ignoring case
pub fn judge_final_guess(guess: &str, secret: &str) -> bool {
    let guess = guess.to_lowercase();
    let secret = secret.to_lowercase();
    guess.contains(&secret) || secret.contains(&guess)
}
