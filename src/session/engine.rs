//! The per-session engine task: polls snapshots, synthesizes events, drives
//! the phase machine and the round timer, and arbitrates submissions.

use std::{future, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinError, JoinHandle},
    time::{Instant, MissedTickBehavior, interval},
};
use tracing::{Instrument, debug, info, warn};

use crate::{
    api::GameApi,
    config::SyncConfig,
    dto::{
        event::{CloseReason, SessionEvent},
        game::{GameSnapshot, GameStatus},
    },
    error::{ApiError, ApiResult},
    session::hub::EventHub,
    sync::{
        PhaseMachine, RoomPhase, SyncEvent,
        submission::{AnswerChoice, SubmissionLedger, SubmitOutcome},
        synthesize,
        timer::RoundTimer,
    },
};

/// Requests from the handle to the engine task.
pub(crate) enum Command {
    /// The consumer picked an answer option.
    Submit {
        /// Selected option index.
        choice: u32,
        /// One-shot channel carrying the arbitration outcome back.
        reply: oneshot::Sender<SubmitOutcome>,
    },
    /// Stop polling and shut the session down.
    Disconnect,
}

/// Owns all round-scoped state for one room session. Nothing outside this
/// task mutates the phase machine or the previous snapshot.
pub(crate) struct Engine {
    api: Arc<dyn GameApi>,
    code: Arc<str>,
    config: SyncConfig,
    hub: EventHub,
    timer: Arc<RoundTimer>,
    ledger: Arc<SubmissionLedger>,
    machine: PhaseMachine,
    previous: Option<Arc<GameSnapshot>>,
}

impl Engine {
    pub(crate) fn new(
        api: Arc<dyn GameApi>,
        code: Arc<str>,
        config: SyncConfig,
        hub: EventHub,
        timer: Arc<RoundTimer>,
        ledger: Arc<SubmissionLedger>,
    ) -> Self {
        Self {
            api,
            code,
            config,
            hub,
            timer,
            ledger,
            machine: PhaseMachine::new(),
            previous: None,
        }
    }

    /// Main loop. The first poll tick fires immediately; later ticks are
    /// skipped while a fetch is still in flight, bounding concurrency to one
    /// request. Runs until disconnect, a terminal API error, or a completed
    /// snapshot.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("starting room synchronization");

        let mut poll = interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut expiry_check = interval(self.config.timer_resolution);
        expiry_check.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<ApiResult<GameSnapshot>>> = None;

        let reason = loop {
            tokio::select! {
                _ = poll.tick() => {
                    if in_flight.is_some() {
                        debug!("previous fetch still in flight; skipping poll tick");
                    } else {
                        let api = self.api.clone();
                        let code = self.code.clone();
                        in_flight = Some(tokio::spawn(
                            async move { api.fetch_snapshot(&code).await }.in_current_span(),
                        ));
                    }
                }
                joined = join_fetch(&mut in_flight) => {
                    in_flight = None;
                    match joined {
                        Ok(Ok(snapshot)) => {
                            if let Some(reason) = self.process_snapshot(snapshot) {
                                break reason;
                            }
                        }
                        Ok(Err(ApiError::NotFound { code })) => {
                            warn!(%code, "room no longer exists; stopping synchronization");
                            break CloseReason::RoomNotFound;
                        }
                        Ok(Err(ApiError::Unauthorized(message))) => {
                            warn!(%message, "credentials rejected; stopping synchronization");
                            break CloseReason::Unauthorized;
                        }
                        Ok(Err(err)) => {
                            debug!(error = %err, "transient fetch failure; retrying on next tick");
                        }
                        Err(err) => warn!(error = %err, "snapshot fetch task failed"),
                    }
                }
                _ = expiry_check.tick() => self.check_expiry(),
                command = commands.recv() => match command {
                    Some(Command::Submit { choice, reply }) => {
                        let _ = reply.send(self.handle_submit(choice));
                    }
                    // A dropped handle counts as a disconnect.
                    Some(Command::Disconnect) | None => break CloseReason::Disconnected,
                },
            }
        };

        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
        self.timer.disarm();
        self.hub.broadcast(SessionEvent::Closed { reason });
        info!(?reason, "room synchronization stopped");
    }

    /// Apply one received snapshot: broadcast the raw update, synthesize
    /// transition events, and run their side effects in order. Returns the
    /// close reason once the game is over.
    fn process_snapshot(&mut self, snapshot: GameSnapshot) -> Option<CloseReason> {
        if let Some(previous) = &self.previous
            && is_new_game(previous, &snapshot)
        {
            warn!("room state regressed; resetting for a new game on the same code");
            self.machine.reset();
            self.ledger.reset();
            self.timer.disarm();
            self.previous = None;
        }

        let received_at = Instant::now();
        let snapshot = Arc::new(snapshot);

        self.hub.broadcast(SessionEvent::StateUpdated {
            snapshot: snapshot.clone(),
        });

        if self.machine.phase() == RoomPhase::Idle && snapshot.status == GameStatus::Waiting {
            self.machine.enter_lobby();
        }

        for event in synthesize(self.previous.as_deref(), &snapshot) {
            match self.machine.apply(event) {
                Ok(_) => self.apply_side_effects(event, &snapshot, received_at),
                Err(invalid) => debug!(%invalid, "ignoring event from presumed-stale snapshot"),
            }
        }

        self.previous = Some(snapshot.clone());

        if snapshot.status == GameStatus::Completed {
            return Some(CloseReason::Completed);
        }
        None
    }

    fn apply_side_effects(
        &mut self,
        event: SyncEvent,
        snapshot: &Arc<GameSnapshot>,
        received_at: Instant,
    ) {
        match event {
            SyncEvent::GameStarted => {
                info!("game started");
                self.hub.broadcast(SessionEvent::GameStarted {
                    snapshot: snapshot.clone(),
                });
            }
            SyncEvent::QuestionAdvanced(question) => {
                let duration = snapshot
                    .time_per_question()
                    .unwrap_or(self.config.default_time_per_question);
                self.timer.arm(question, duration, received_at);
                info!(question, duration_secs = duration.as_secs(), "question advanced");
                self.hub.broadcast(SessionEvent::QuestionAdvanced {
                    question,
                    snapshot: snapshot.clone(),
                });
            }
            SyncEvent::AllAnswered(question) => {
                info!(question, "all players answered");
                self.hub.broadcast(SessionEvent::AllAnswered { question });
            }
            SyncEvent::GameEnded => {
                info!("game ended");
                self.timer.disarm();
                self.hub.broadcast(SessionEvent::GameEnded {
                    snapshot: snapshot.clone(),
                });
            }
        }
    }

    /// Fine-grained recurring check that turns a passed deadline into the
    /// one-shot timeout submission.
    fn check_expiry(&mut self) {
        let Some(question) = self.timer.poll_expired(Instant::now()) else {
            return;
        };
        if self.machine.phase() != (RoomPhase::InRound { question }) {
            debug!(question, "timer expired outside its round; ignoring");
            return;
        }
        if !self.ledger.try_claim(question, AnswerChoice::TimedOut) {
            return;
        }
        info!(question, "round expired with no selection; submitting timeout answer");
        self.dispatch_submission(question, AnswerChoice::TimedOut, self.timer.elapsed());
    }

    /// Arbitrate a user submission against the single-submission guarantee.
    fn handle_submit(&mut self, choice: u32) -> SubmitOutcome {
        match self.machine.phase() {
            RoomPhase::InRound { question } => {
                if self.ledger.try_claim(question, AnswerChoice::Option(choice)) {
                    self.dispatch_submission(
                        question,
                        AnswerChoice::Option(choice),
                        self.timer.elapsed(),
                    );
                    SubmitOutcome::Submitted { question }
                } else {
                    SubmitOutcome::AlreadySubmitted { question }
                }
            }
            _ => SubmitOutcome::NotInRound,
        }
    }

    /// Fire-and-forget external submission; failures become warning events,
    /// never session errors. The next snapshot is authoritative regardless.
    fn dispatch_submission(&self, question: u32, answer: AnswerChoice, answer_time: Duration) {
        let request = self.api.submit_answer(&self.code, question, answer, answer_time);
        let hub = self.hub.clone();
        tokio::spawn(
            async move {
                if let Err(err) = request.await {
                    warn!(question, error = %err, "answer submission failed");
                    hub.broadcast(SessionEvent::SubmitFailed {
                        question,
                        message: err.to_string(),
                    });
                }
            }
            .in_current_span(),
        );
    }
}

/// Await the in-flight fetch when there is one; otherwise park this select
/// branch forever so the other arms drive the loop.
async fn join_fetch(
    slot: &mut Option<JoinHandle<ApiResult<GameSnapshot>>>,
) -> Result<ApiResult<GameSnapshot>, JoinError> {
    match slot.as_mut() {
        Some(handle) => handle.await,
        None => future::pending().await,
    }
}

/// A backwards status move or a question index decrease means the server
/// recycled the room code for a fresh game.
fn is_new_game(previous: &GameSnapshot, current: &GameSnapshot) -> bool {
    if current.status.rank() < previous.status.rank() {
        return true;
    }
    matches!(
        (previous.question_index(), current.question_index()),
        (Some(prev), Some(cur)) if cur < prev
    )
}
