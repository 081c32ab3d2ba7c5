//! HTTP request handlers
//!
//! Every game route maps to one button of the front end. Actions take the
//! game lock without waiting: a second action while an oracle call is in
//! flight gets 409 instead of queueing behind it. The action itself runs on
//! its own task, so a client that disconnects mid-call cannot leave the game
//! stuck in a busy phase. Snapshots read the published state and never wait
//! for the lock.

use super::types::{
    AnswerRequest, DifficultyRequest, ErrorResponse, FinalGuessRequest, GameView, GiveUpRequest,
    ModeRequest, QuestionRequest, ScoresView, ThemeRequest,
};
use super::AppState;
use crate::game::{Action, GameError, GameSnapshot, TransitionError};
use crate::relay::relay_handler;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};

type ApiResult<T> = Result<Json<T>, AppError>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Relay to the chat-completions provider
        .route("/api/oracle", any(relay_handler))
        // Snapshot
        .route("/api/game", get(get_game))
        // Setup screen
        .route("/api/game/mode", post(select_mode))
        .route("/api/game/theme", post(enter_theme))
        .route("/api/game/difficulty", post(set_difficulty))
        .route("/api/game/start", post(start_round))
        // User guesses
        .route("/api/game/question", post(ask_question))
        .route("/api/game/final-guess", post(final_guess))
        // AI guesses
        .route("/api/game/answer", post(answer))
        .route("/api/game/guess/confirm", post(confirm_guess))
        .route("/api/game/guess/deny", post(deny_guess))
        // Round control
        .route("/api/game/give-up", post(give_up))
        .route("/api/game/retry", post(retry))
        .route("/api/game/new", post(new_game))
        // Scores
        .route("/api/scores", get(get_scores))
        .route("/api/scores/reset", post(reset_scores))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

/// Run an action on a detached task, or report that one is already running
async fn perform(state: &AppState, action: Action) -> Result<GameSnapshot, AppError> {
    let mut game = state
        .game
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::Busy)?;

    let task = tokio::spawn(async move { game.perform(action).await });
    let snapshot = task.await.map_err(|e| {
        tracing::error!(error = %e, "Game action task failed");
        AppError::Internal(e.to_string())
    })??;
    Ok(snapshot)
}

async fn act(state: &AppState, action: Action) -> ApiResult<GameView> {
    let snapshot = perform(state, action).await?;
    Ok(Json(GameView::new(&snapshot.state, snapshot.scores)))
}

// ============================================================
// Snapshot
// ============================================================

async fn get_game(State(state): State<AppState>) -> Json<GameView> {
    let snapshot = state.snapshot.borrow().clone();
    Json(GameView::new(&snapshot.state, snapshot.scores))
}

// ============================================================
// Setup
// ============================================================

async fn select_mode(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> ApiResult<GameView> {
    act(&state, Action::SelectMode(req.mode)).await
}

async fn enter_theme(
    State(state): State<AppState>,
    req: Option<Json<ThemeRequest>>,
) -> ApiResult<GameView> {
    let theme = req.and_then(|Json(r)| r.theme).unwrap_or_default();
    let action = if theme.trim().is_empty() {
        Action::SelectGeneralTheme
    } else {
        Action::EnterTheme(theme)
    };
    act(&state, action).await
}

async fn set_difficulty(
    State(state): State<AppState>,
    Json(req): Json<DifficultyRequest>,
) -> ApiResult<GameView> {
    act(&state, Action::SetDifficulty(req.difficulty)).await
}

async fn start_round(State(state): State<AppState>) -> ApiResult<GameView> {
    act(&state, Action::StartRound).await
}

// ============================================================
// Play
// ============================================================

async fn ask_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<GameView> {
    act(&state, Action::AskQuestion(req.text)).await
}

async fn final_guess(
    State(state): State<AppState>,
    Json(req): Json<FinalGuessRequest>,
) -> ApiResult<GameView> {
    act(&state, Action::FinalGuess(req.guess)).await
}

async fn answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<GameView> {
    act(&state, Action::Answer(req.answer)).await
}

async fn confirm_guess(State(state): State<AppState>) -> ApiResult<GameView> {
    act(&state, Action::ConfirmGuess).await
}

async fn deny_guess(State(state): State<AppState>) -> ApiResult<GameView> {
    act(&state, Action::DenyGuess).await
}

// ============================================================
// Round control
// ============================================================

async fn give_up(
    State(state): State<AppState>,
    req: Option<Json<GiveUpRequest>>,
) -> ApiResult<GameView> {
    let reveal = req.and_then(|Json(r)| r.reveal);
    act(&state, Action::GiveUp { reveal }).await
}

async fn retry(State(state): State<AppState>) -> ApiResult<GameView> {
    act(&state, Action::Retry).await
}

async fn new_game(State(state): State<AppState>) -> ApiResult<GameView> {
    act(&state, Action::NewGame).await
}

// ============================================================
// Scores
// ============================================================

async fn get_scores(State(state): State<AppState>) -> Json<ScoresView> {
    Json(state.snapshot.borrow().scores.into())
}

async fn reset_scores(State(state): State<AppState>) -> ApiResult<ScoresView> {
    let snapshot = perform(&state, Action::ResetScores).await?;
    Ok(Json(snapshot.scores.into()))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("twenty-questions ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Busy,
    Rejected(String),
    BadRequest(String),
    Internal(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::Transition(TransitionError::Busy) => AppError::Busy,
            GameError::Transition(e @ TransitionError::Rejected(_)) => {
                AppError::Rejected(e.to_string())
            }
            GameError::Transition(e) => AppError::BadRequest(e.to_string()),
            GameError::Score(e) => {
                tracing::error!(error = %e, "Score store failure");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Busy => (
                StatusCode::CONFLICT,
                TransitionError::Busy.to_string(),
            ),
            AppError::Rejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SharedGame;
    use crate::oracle::testing::MockOracle;
    use crate::oracle::{AskOptions, Oracle, OracleError, OracleMessage};
    use crate::relay::{Relay, RelayConfig};
    use crate::score::{MemoryScoreStore, ScoreStore};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::Semaphore;

    struct TestApp {
        base: String,
        client: reqwest::Client,
    }

    impl TestApp {
        async fn start(oracle: Arc<dyn Oracle>) -> Self {
            let store: Arc<dyn ScoreStore> = Arc::new(MemoryScoreStore::default());
            let game = SharedGame::new(oracle, store).await;
            let state = AppState::new(game, Relay::new(RelayConfig::default()));
            let app = create_router(state);
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            Self {
                base: format!("http://{addr}"),
                client: reqwest::Client::new(),
            }
        }

        async fn post(&self, path: &str, body: Value) -> (u16, Value) {
            let response = self
                .client
                .post(format!("{}{path}", self.base))
                .json(&body)
                .send()
                .await
                .unwrap();
            let status = response.status().as_u16();
            (status, response.json().await.unwrap())
        }

        async fn get(&self, path: &str) -> Value {
            self.client
                .get(format!("{}{path}", self.base))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }
    }

    /// Oracle that blocks until released, then answers with a fixed text
    struct GatedOracle {
        gate: Semaphore,
        calls: AtomicUsize,
        reply: &'static str,
    }

    #[async_trait]
    impl Oracle for GatedOracle {
        async fn ask(
            &self,
            _messages: &[OracleMessage],
            _options: AskOptions,
        ) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            Ok(self.reply.to_string())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_user_guesses_round_over_http() {
        let oracle = Arc::new(MockOracle::new());
        let app = TestApp::start(oracle.clone()).await;

        let snapshot = app.get("/api/game").await;
        assert_eq!(snapshot["screen"], "setup");
        assert_eq!(snapshot["can_start"], false);

        let (status, _) = app.post("/api/game/mode", json!({"mode": "user-guesses"})).await;
        assert_eq!(status, 200);
        let (status, view) = app.post("/api/game/difficulty", json!({"difficulty": 3})).await;
        assert_eq!(status, 200);
        assert_eq!(view["difficulty_label"], "Hard");

        oracle.queue_reply("guitar");
        let (status, view) = app.post("/api/game/start", json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(view["screen"], "game");
        assert_eq!(view["secret"], Value::Null);

        oracle.queue_reply("NO");
        let (status, view) = app
            .post("/api/game/question", json!({"text": "What is it made of?"}))
            .await;
        assert_eq!(status, 200);
        assert_eq!(view["question_count"], 0);

        let (status, view) = app.post("/api/game/final-guess", json!({"guess": "Guitar"})).await;
        assert_eq!(status, 200);
        assert_eq!(view["screen"], "ended");
        assert_eq!(view["won"], true);
        assert_eq!(view["secret"], "guitar");
        assert_eq!(
            view["scores"],
            json!({"gamesPlayed": 1, "gamesWon": 1, "winPercentage": 100})
        );

        let (status, body) = app.post("/api/game/question", json!({"text": "Is it red?"})).await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());

        let (status, scores) = app.post("/api/scores/reset", json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(scores["gamesPlayed"], 0);
        assert_eq!(app.get("/api/scores").await["gamesWon"], 0);
    }

    #[tokio::test]
    async fn test_validation_errors_map_to_422() {
        let oracle = Arc::new(MockOracle::new());
        let app = TestApp::start(oracle.clone()).await;

        app.post("/api/game/mode", json!({"mode": "user-guesses"})).await;
        let (_, view) = app.post("/api/game/theme", json!({"theme": "xy"})).await;
        assert_eq!(view["theme_feedback"], "Theme too short");
        assert_eq!(view["can_start"], false);

        let (status, _) = app.post("/api/game/start", json!({})).await;
        assert_eq!(status, 400);

        let (_, view) = app.post("/api/game/theme", json!({"theme": null})).await;
        assert_eq!(view["theme"], "General");

        oracle.queue_reply("kite");
        app.post("/api/game/start", json!({})).await;
        let (status, body) = app.post("/api/game/question", json!({"text": "   "})).await;
        assert_eq!(status, 422);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_action_during_oracle_call_is_409() {
        let oracle = Arc::new(GatedOracle {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            reply: "Is it an animal?",
        });
        let app = TestApp::start(oracle.clone()).await;
        app.post("/api/game/mode", json!({"mode": "ai-guesses"})).await;

        let client = app.client.clone();
        let url = format!("{}/api/game/start", app.base);
        let pending = tokio::spawn(async move { client.post(url).send().await.unwrap().status() });

        while oracle.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let (status, body) = app.post("/api/game/new", json!({})).await;
        assert_eq!(status, 409);
        assert!(body["error"].is_string());

        // One permit for the question, one for the progress estimate after it
        oracle.gate.add_permits(2);
        assert_eq!(pending.await.unwrap().as_u16(), 200);

        let view = app.get("/api/game").await;
        assert_eq!(view["phase"], "awaiting_answer");
        assert_eq!(view["question_count"], 1);
    }

    #[tokio::test]
    async fn test_snapshot_reports_busy_during_oracle_call() {
        let oracle = Arc::new(GatedOracle {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            reply: "Is it an animal?",
        });
        let app = TestApp::start(oracle.clone()).await;
        app.post("/api/game/mode", json!({"mode": "ai-guesses"})).await;

        let client = app.client.clone();
        let url = format!("{}/api/game/start", app.base);
        let pending = tokio::spawn(async move { client.post(url).send().await.unwrap().status() });
        while oracle.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let view = tokio::time::timeout(Duration::from_secs(2), app.get("/api/game"))
            .await
            .expect("snapshot waited for the oracle call");
        assert_eq!(view["busy"], true);
        assert_eq!(view["phase"], "generating_question");
        let scores = tokio::time::timeout(Duration::from_secs(2), app.get("/api/scores"))
            .await
            .expect("scores waited for the oracle call");
        assert_eq!(scores["gamesPlayed"], 0);

        oracle.gate.add_permits(2);
        assert_eq!(pending.await.unwrap().as_u16(), 200);
        assert_eq!(app.get("/api/game").await["busy"], false);
    }

    #[tokio::test]
    async fn test_dropped_request_does_not_wedge_the_game() {
        let oracle = Arc::new(GatedOracle {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            reply: "Is it an animal?",
        });
        let app = TestApp::start(oracle.clone()).await;
        app.post("/api/game/mode", json!({"mode": "ai-guesses"})).await;

        // The client gives up while the question is still being generated
        let dropped = app
            .client
            .post(format!("{}/api/game/start", app.base))
            .timeout(Duration::from_millis(200))
            .send()
            .await;
        assert!(dropped.is_err());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);

        // The round keeps going without anyone waiting on it
        oracle.gate.add_permits(2);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let view = app.get("/api/game").await;
                if view["phase"] == "awaiting_answer" {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("round never left the busy phase");

        // Wait for the progress estimate to release the game
        let mut status = 409;
        for _ in 0..200 {
            let (code, view) = app.post("/api/game/new", json!({})).await;
            status = code;
            if status == 200 {
                assert_eq!(view["screen"], "setup");
                assert_eq!(view["busy"], false);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_give_up_with_reveal() {
        let oracle = Arc::new(MockOracle::new());
        let app = TestApp::start(oracle.clone()).await;
        app.post("/api/game/mode", json!({"mode": "ai-guesses"})).await;

        oracle.queue_reply("Is it bigger than a breadbox?");
        oracle.queue_reply("5");
        app.post("/api/game/start", json!({})).await;

        let (status, view) = app
            .post("/api/game/give-up", json!({"reveal": "a toaster"}))
            .await;
        assert_eq!(status, 200);
        let conversation = view["conversation"].as_array().unwrap();
        assert_eq!(
            conversation.last().unwrap()["text"],
            "Ah, it was a toaster! Good one!"
        );
        assert_eq!(view["scores"]["gamesPlayed"], 1);
    }

    #[tokio::test]
    async fn test_version() {
        let app = TestApp::start(Arc::new(MockOracle::new())).await;
        let text = app
            .client
            .get(format!("{}/version", app.base))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.starts_with("twenty-questions "));
    }
}
