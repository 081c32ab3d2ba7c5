//! Twenty Questions game engine
//!
//! Implements the Elm Architecture pattern with pure state transitions and a
//! controller that executes the resulting effects.

mod controller;
mod effect;
pub mod event;
pub mod interpret;
pub mod prompts;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use controller::{Action, GameController, GameError, GameSnapshot};
#[allow(unused_imports)] // Public API re-exports
pub use effect::Effect;
#[allow(unused_imports)] // Public API re-exports
pub use event::Event;
pub use state::{Answer, Difficulty, GameState, Message, Mode, Phase, Screen};
pub use transition::TransitionError;
