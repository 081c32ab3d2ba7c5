//! HTTP API for the game and the oracle relay

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::game::{GameController, GameSnapshot};
use crate::oracle::Oracle;
use crate::relay::Relay;
use crate::score::ScoreStore;
use axum::extract::FromRef;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// The process-wide game
pub type SharedGame = GameController<Arc<dyn Oracle>, Arc<dyn ScoreStore>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Held by the task running an action, including its oracle calls
    pub game: Arc<Mutex<SharedGame>>,
    /// Latest committed state, readable while an action is running
    pub snapshot: watch::Receiver<GameSnapshot>,
    pub relay: Relay,
}

impl AppState {
    pub fn new(game: SharedGame, relay: Relay) -> Self {
        let snapshot = game.subscribe();
        Self {
            game: Arc::new(Mutex::new(game)),
            snapshot,
            relay,
        }
    }
}

impl FromRef<AppState> for Relay {
    fn from_ref(state: &AppState) -> Self {
        state.relay.clone()
    }
}
