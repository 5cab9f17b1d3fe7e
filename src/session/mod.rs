//! Public session surface: connect to a room, receive synchronized events,
//! read the countdown, submit answers, disconnect.

mod engine;
mod hub;

pub use self::hub::EventHub;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::{
    api::GameApi,
    config::SyncConfig,
    dto::event::SessionEvent,
    error::SessionError,
    session::engine::{Command, Engine},
    sync::{
        submission::{SubmissionLedger, SubmitOutcome},
        timer::RoundTimer,
    },
};

/// Events buffered per subscriber before slow consumers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;
/// Pending handle commands before `submit_answer` awaits.
const COMMAND_CHANNEL_CAPACITY: usize = 8;

/// Start synchronizing a room and return the handle the application talks to.
///
/// The engine issues its first fetch immediately, then keeps polling at the
/// configured interval until [`SessionHandle::disconnect`], a terminal API
/// error, or a completed game. Dropping every handle also shuts the session
/// down.
pub fn connect(
    api: Arc<dyn GameApi>,
    room_code: impl Into<String>,
    config: SyncConfig,
) -> SessionHandle {
    let code: Arc<str> = Arc::from(room_code.into());
    let config = config.normalized();

    let hub = EventHub::new(EVENT_CHANNEL_CAPACITY);
    let timer = Arc::new(RoundTimer::new());
    let ledger = Arc::new(SubmissionLedger::new());
    let (commands, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

    let session = Uuid::new_v4();
    let span = info_span!("room_session", %session, code = %code);

    let engine = Engine::new(
        api,
        code,
        config,
        hub.clone(),
        timer.clone(),
        ledger.clone(),
    );
    tokio::spawn(engine.run(commands_rx).instrument(span));

    SessionHandle {
        commands,
        hub,
        timer,
        ledger,
    }
}

/// Consumer-side handle for one room session. Cloneable; all clones drive the
/// same engine.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    hub: EventHub,
    timer: Arc<RoundTimer>,
    ledger: Arc<SubmissionLedger>,
}

impl SessionHandle {
    /// Subscribe to the session's event feed. Each subscriber sees every
    /// event broadcast after the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.hub.subscribe()
    }

    /// The event feed as a [`futures::Stream`], for consumers that prefer
    /// stream combinators over a receiver loop.
    pub fn events(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.hub.subscribe())
    }

    /// Seconds left in the current round, recomputed from the deadline on a
    /// monotonic clock. Zero outside of a round. Never blocks on IO.
    pub fn remaining_seconds(&self) -> f64 {
        self.timer.remaining().as_secs_f64()
    }

    /// Whether this session has already answered the given question.
    pub fn has_submitted(&self, question: u32) -> bool {
        self.ledger.has_submitted(question)
    }

    /// Submit the selected option for the active round.
    ///
    /// The first submission per question wins (whether from here or from the
    /// timeout path); later calls return
    /// [`SubmitOutcome::AlreadySubmitted`] without touching the server.
    pub async fn submit_answer(&self, option_index: u32) -> Result<SubmitOutcome, SessionError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                choice: option_index,
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        outcome.await.map_err(|_| SessionError::Closed)
    }

    /// Stop polling and end the session. Idempotent; the final
    /// [`SessionEvent::Closed`] is broadcast before the engine exits.
    pub async fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect).await;
    }

    /// Whether the engine task has already stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
