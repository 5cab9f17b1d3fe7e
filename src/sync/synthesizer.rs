//! Pure diff of two consecutive snapshots into discrete transition events.
//!
//! This is the load-bearing correctness property of the engine: a 1-3 s poll
//! emulates push notifications only because each qualifying transition is
//! synthesized exactly once, and replaying an identical snapshot synthesizes
//! nothing.

use crate::dto::game::{GameSnapshot, GameStatus};

/// Discrete transition derived from a snapshot diff, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The room left the lobby.
    GameStarted,
    /// A new question index became active.
    QuestionAdvanced(u32),
    /// Every player answered the given question.
    AllAnswered(u32),
    /// The quiz reached its completed state.
    GameEnded,
}

/// Diff `previous` against `current` and return the qualifying events.
///
/// `previous` is `None` on the first poll of a session (and after a
/// new-game-on-same-code reset), which makes a mid-game join synthesize the
/// catch-up `GameStarted` + `QuestionAdvanced` pair.
pub fn synthesize(previous: Option<&GameSnapshot>, current: &GameSnapshot) -> Vec<SyncEvent> {
    let mut events = Vec::new();

    let was_in_progress = previous.is_some_and(|prev| prev.status == GameStatus::InProgress);
    let was_completed = previous.is_some_and(|prev| prev.status == GameStatus::Completed);

    let started = !was_in_progress && current.status == GameStatus::InProgress;
    if started {
        events.push(SyncEvent::GameStarted);
    }

    if let Some(index) = current.question_index() {
        let advanced = match previous.and_then(GameSnapshot::question_index) {
            Some(prev_index) => index > prev_index,
            None => false,
        };
        if started || advanced {
            events.push(SyncEvent::QuestionAdvanced(index));
        }

        // Fresh per question index: a poll that keeps reporting all-answered
        // for the same question must not re-fire.
        let previously_all_answered = previous.is_some_and(|prev| {
            prev.question_index() == Some(index) && prev.all_answered()
        });
        if current.all_answered() && !previously_all_answered {
            events.push(SyncEvent::AllAnswered(index));
        }
    }

    if !was_completed && current.status == GameStatus::Completed {
        events.push(SyncEvent::GameEnded);
    }

    events
}
