//! Events a session fans out to its subscribers.

use std::sync::Arc;

use crate::dto::game::GameSnapshot;

/// Why a session stopped delivering events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The consumer called disconnect.
    Disconnected,
    /// A completed snapshot was observed and broadcast; nothing more will
    /// change server-side.
    Completed,
    /// The server reported the room as gone.
    RoomNotFound,
    /// The server rejected our credentials.
    Unauthorized,
}

/// Event fanned out to session subscribers.
///
/// Snapshots are shared behind an [`Arc`] because every subscriber receives
/// its own clone of the event.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Fired for every processed snapshot, before any synthesized event,
    /// so UIs can refresh the raw player list on each poll.
    StateUpdated {
        /// The snapshot that was just processed.
        snapshot: Arc<GameSnapshot>,
    },
    /// The room left the lobby and the quiz began.
    GameStarted {
        /// Snapshot that triggered the transition.
        snapshot: Arc<GameSnapshot>,
    },
    /// A new question became active (including question 0 at game start).
    QuestionAdvanced {
        /// Zero-based index of the question now active.
        question: u32,
        /// Snapshot that triggered the transition.
        snapshot: Arc<GameSnapshot>,
    },
    /// Every player has answered the active question. Fires once per round.
    AllAnswered {
        /// Question index the round belongs to.
        question: u32,
    },
    /// The quiz finished; final scores are in the last snapshot.
    GameEnded {
        /// Snapshot that triggered the transition.
        snapshot: Arc<GameSnapshot>,
    },
    /// An answer submission failed. Retryable warning only; the next poll's
    /// snapshot is authoritative regardless of this outcome.
    SubmitFailed {
        /// Question the submission targeted.
        question: u32,
        /// Description of the failure.
        message: String,
    },
    /// Final event on every session; no further events follow.
    Closed {
        /// Why the session ended.
        reason: CloseReason,
    },
}
