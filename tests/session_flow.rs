//! End-to-end engine tests driving a scripted in-memory API through the
//! polling, event synthesis, countdown, and submission paths.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use mindclash_sync::{
    api::GameApi,
    config::SyncConfig,
    dto::{
        event::{CloseReason, SessionEvent},
        game::{GameSnapshot, GameStatus, PlayerState, QuizSettings},
    },
    error::{ApiError, ApiResult},
    session,
    sync::submission::{AnswerChoice, SubmitOutcome},
};
use tokio::sync::broadcast;

/// One scripted poll response.
enum Step {
    Snapshot(GameSnapshot),
    NotFound,
}

/// Scripted server double. Each fetch consumes the next step; the final step
/// repeats forever. Submissions are recorded at dispatch time.
struct ScriptedApi {
    script: Vec<Step>,
    cursor: AtomicUsize,
    fetches: AtomicUsize,
    submissions: Mutex<Vec<(u32, i64)>>,
    reject_submissions: bool,
}

impl ScriptedApi {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            cursor: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            reject_submissions: false,
        })
    }

    fn rejecting(script: Vec<Step>) -> Arc<Self> {
        let mut api = Self::new(script);
        Arc::get_mut(&mut api).expect("fresh arc").reject_submissions = true;
        api
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn submitted(&self) -> Vec<(u32, i64)> {
        self.submissions.lock().expect("submissions lock").clone()
    }
}

impl GameApi for ScriptedApi {
    fn fetch_snapshot(&self, code: &str) -> BoxFuture<'static, ApiResult<GameSnapshot>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let index = self
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(self.script.len() - 1);
        let result = match &self.script[index] {
            Step::Snapshot(snapshot) => Ok(snapshot.clone()),
            Step::NotFound => Err(ApiError::NotFound { code: code.into() }),
        };
        async move { result }.boxed()
    }

    fn submit_answer(
        &self,
        _code: &str,
        question: u32,
        answer: AnswerChoice,
        _answer_time: Duration,
    ) -> BoxFuture<'static, ApiResult<()>> {
        self.submissions
            .lock()
            .expect("submissions lock")
            .push((question, answer.wire_value()));
        let result = if self.reject_submissions {
            Err(ApiError::Rejected("round already closed".into()))
        } else {
            Ok(())
        };
        async move { result }.boxed()
    }
}

fn snapshot(status: GameStatus, question: u32, answered: &[bool]) -> Step {
    Step::Snapshot(GameSnapshot {
        code: "XK42PZ".into(),
        status,
        host: "alice".into(),
        players: answered
            .iter()
            .enumerate()
            .map(|(i, &done)| PlayerState {
                username: format!("player{i}"),
                score: 0,
                has_answered: done,
                current_streak: 0,
                best_streak: 0,
            })
            .collect(),
        current_question_index: Some(question),
        current_question_data: None,
        quiz_data: Some(QuizSettings {
            time_per_question: Duration::from_secs(10),
        }),
    })
}

fn test_config() -> SyncConfig {
    SyncConfig::default()
}

fn label(event: &SessionEvent) -> String {
    match event {
        SessionEvent::StateUpdated { .. } => "state_updated".into(),
        SessionEvent::GameStarted { .. } => "game_started".into(),
        SessionEvent::QuestionAdvanced { question, .. } => format!("question_advanced:{question}"),
        SessionEvent::AllAnswered { question } => format!("all_answered:{question}"),
        SessionEvent::GameEnded { .. } => "game_ended".into(),
        SessionEvent::SubmitFailed { question, .. } => format!("submit_failed:{question}"),
        SessionEvent::Closed { reason } => format!("closed:{reason:?}"),
    }
}

/// Collect labels of every non-StateUpdated event until the session closes.
async fn collect_transitions(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<String> {
    let mut labels = Vec::new();
    loop {
        let event = events.recv().await.expect("event stream open");
        let closed = matches!(event, SessionEvent::Closed { .. });
        if !matches!(event, SessionEvent::StateUpdated { .. }) {
            labels.push(label(&event));
        }
        if closed {
            return labels;
        }
    }
}

async fn wait_for_advance(events: &mut broadcast::Receiver<SessionEvent>) -> u32 {
    loop {
        if let SessionEvent::QuestionAdvanced { question, .. } =
            events.recv().await.expect("event stream open")
        {
            return question;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_polls_synthesize_push_like_events() {
    let api = ScriptedApi::new(vec![
        snapshot(GameStatus::Waiting, 0, &[false, false]),
        snapshot(GameStatus::InProgress, 0, &[false, false]),
        snapshot(GameStatus::InProgress, 0, &[true, true]),
        snapshot(GameStatus::InProgress, 1, &[false, false]),
        snapshot(GameStatus::Completed, 1, &[true, true]),
    ]);
    let handle = session::connect(api, "XK42PZ", test_config());
    let mut events = handle.subscribe();

    let transitions = collect_transitions(&mut events).await;
    assert_eq!(
        transitions,
        vec![
            "game_started",
            "question_advanced:0",
            "all_answered:0",
            "question_advanced:1",
            "game_ended",
            "closed:Completed",
        ]
    );

    tokio::task::yield_now().await;
    assert!(handle.is_closed());
}

#[tokio::test(start_paused = true)]
async fn state_updated_fires_on_every_poll() {
    let api = ScriptedApi::new(vec![
        snapshot(GameStatus::Waiting, 0, &[false]),
        snapshot(GameStatus::Waiting, 0, &[false]),
        snapshot(GameStatus::Completed, 0, &[true]),
    ]);
    let handle = session::connect(api, "XK42PZ", test_config());
    let mut events = handle.subscribe();

    let mut updates = 0;
    loop {
        match events.recv().await.expect("event stream open") {
            SessionEvent::StateUpdated { .. } => updates += 1,
            SessionEvent::Closed { .. } => break,
            _ => {}
        }
    }
    assert_eq!(updates, 3);
}

#[tokio::test(start_paused = true)]
async fn room_not_found_stops_polling_with_one_terminal_close() {
    let api = ScriptedApi::new(vec![
        snapshot(GameStatus::Waiting, 0, &[false]),
        snapshot(GameStatus::Waiting, 0, &[false]),
        snapshot(GameStatus::Waiting, 0, &[false]),
        Step::NotFound,
    ]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    let mut closes = Vec::new();
    let mut updates = 0;
    loop {
        match events.recv().await.expect("event stream open") {
            SessionEvent::StateUpdated { .. } => updates += 1,
            SessionEvent::Closed { reason } => {
                closes.push(reason);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    assert_eq!(updates, 3);
    assert_eq!(closes, vec![CloseReason::RoomNotFound]);
    assert_eq!(api.fetch_count(), 4);

    // Polling must not resume after the terminal error.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn duplicate_submissions_reach_the_server_once() {
    let api = ScriptedApi::new(vec![snapshot(GameStatus::InProgress, 0, &[false, false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    assert_eq!(wait_for_advance(&mut events).await, 0);

    assert_eq!(
        handle.submit_answer(2).await.expect("session open"),
        SubmitOutcome::Submitted { question: 0 }
    );
    assert_eq!(
        handle.submit_answer(1).await.expect("session open"),
        SubmitOutcome::AlreadySubmitted { question: 0 }
    );

    assert_eq!(api.submitted(), vec![(0, 2)]);
    assert!(handle.has_submitted(0));

    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn expiry_submits_the_timeout_sentinel_once() {
    let api = ScriptedApi::new(vec![snapshot(GameStatus::InProgress, 0, &[false, false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    assert_eq!(wait_for_advance(&mut events).await, 0);
    assert!(handle.remaining_seconds() > 9.0);

    // Past the 10 s round deadline.
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(api.submitted(), vec![(0, -1)]);
    assert_eq!(handle.remaining_seconds(), 0.0);

    // A late user answer is a no-op.
    assert_eq!(
        handle.submit_answer(3).await.expect("session open"),
        SubmitOutcome::AlreadySubmitted { question: 0 }
    );
    assert_eq!(api.submitted(), vec![(0, -1)]);

    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn user_answer_before_expiry_wins_the_race() {
    let api = ScriptedApi::new(vec![snapshot(GameStatus::InProgress, 0, &[false, false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    wait_for_advance(&mut events).await;
    assert_eq!(
        handle.submit_answer(3).await.expect("session open"),
        SubmitOutcome::Submitted { question: 0 }
    );

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(api.submitted(), vec![(0, 3)]);

    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_submission_surfaces_as_warning_not_close() {
    let api = ScriptedApi::rejecting(vec![snapshot(GameStatus::InProgress, 0, &[false, false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    wait_for_advance(&mut events).await;
    assert_eq!(
        handle.submit_answer(1).await.expect("session open"),
        SubmitOutcome::Submitted { question: 0 }
    );

    loop {
        match events.recv().await.expect("event stream open") {
            SessionEvent::SubmitFailed { question, .. } => {
                assert_eq!(question, 0);
                break;
            }
            SessionEvent::Closed { reason } => {
                panic!("session closed instead of warning: {reason:?}")
            }
            _ => {}
        }
    }

    assert!(!handle.is_closed());
    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn submitting_outside_a_round_is_refused_locally() {
    let api = ScriptedApi::new(vec![snapshot(GameStatus::Waiting, 0, &[false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    // First poll has been processed once the lobby update arrives.
    loop {
        if let SessionEvent::StateUpdated { .. } = events.recv().await.expect("event stream open") {
            break;
        }
    }

    assert_eq!(
        handle.submit_answer(0).await.expect("session open"),
        SubmitOutcome::NotInRound
    );
    assert!(api.submitted().is_empty());

    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn question_index_regression_resets_for_a_new_game() {
    let api = ScriptedApi::new(vec![
        snapshot(GameStatus::InProgress, 2, &[false]),
        snapshot(GameStatus::InProgress, 0, &[false]),
        snapshot(GameStatus::Completed, 0, &[true]),
    ]);
    let handle = session::connect(api, "XK42PZ", test_config());
    let mut events = handle.subscribe();

    let transitions = collect_transitions(&mut events).await;
    assert_eq!(
        transitions,
        vec![
            "game_started",
            "question_advanced:2",
            // Index went backwards: same code, fresh game.
            "game_started",
            "question_advanced:0",
            "game_ended",
            "closed:Completed",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn disconnect_broadcasts_a_final_close() {
    let api = ScriptedApi::new(vec![snapshot(GameStatus::Waiting, 0, &[false])]);
    let handle = session::connect(api.clone(), "XK42PZ", test_config());
    let mut events = handle.subscribe();

    handle.disconnect().await;

    loop {
        if let SessionEvent::Closed { reason } = events.recv().await.expect("event stream open") {
            assert_eq!(reason, CloseReason::Disconnected);
            break;
        }
    }

    let fetches = api.fetch_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.fetch_count(), fetches);
}
