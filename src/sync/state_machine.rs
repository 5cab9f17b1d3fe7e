//! Room lifecycle phases and the transitions between them.

use thiserror::Error;

use crate::sync::synthesizer::SyncEvent;

/// Local representation of the room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// No snapshot has been processed yet.
    Idle,
    /// Lobby: the game has not started.
    Waiting,
    /// A question is active and accepting answers.
    InRound {
        /// Index of the active question.
        question: u32,
    },
    /// Every player answered; waiting for the host to advance.
    RoundComplete {
        /// Index of the finished question.
        question: u32,
    },
    /// Terminal: the quiz is over.
    Completed,
}

/// Error returned when an event cannot be applied from the current phase.
///
/// The engine treats these as stale-snapshot noise: logged and ignored,
/// never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the machine was in when the event arrived.
    pub from: RoomPhase,
    /// The event that did not apply.
    pub event: SyncEvent,
}

/// State machine driven exclusively by synthesized [`SyncEvent`]s.
///
/// Owns all round-scoped lifecycle state for one session; nothing else
/// mutates it.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: RoomPhase,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Idle,
        }
    }
}

impl PhaseMachine {
    /// Create a machine in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Note that a lobby snapshot was observed before the game started.
    /// Idempotent; only meaningful from the idle phase.
    pub fn enter_lobby(&mut self) {
        if self.phase == RoomPhase::Idle {
            self.phase = RoomPhase::Waiting;
        }
    }

    /// Reset to idle for a new game reusing the same room code.
    pub fn reset(&mut self) {
        self.phase = RoomPhase::Idle;
    }

    /// Apply a synthesized event, returning the phase entered.
    pub fn apply(&mut self, event: SyncEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute the transition for an event if it is valid from the current
    /// phase.
    fn compute_transition(&self, event: SyncEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            // Idle covers a client that joined mid-game and never saw the lobby.
            (RoomPhase::Idle | RoomPhase::Waiting, SyncEvent::GameStarted) => {
                RoomPhase::InRound { question: 0 }
            }
            (RoomPhase::InRound { question }, SyncEvent::QuestionAdvanced(next))
                if next >= question =>
            {
                RoomPhase::InRound { question: next }
            }
            (RoomPhase::RoundComplete { question }, SyncEvent::QuestionAdvanced(next))
                if next > question =>
            {
                RoomPhase::InRound { question: next }
            }
            (RoomPhase::InRound { question }, SyncEvent::AllAnswered(index))
                if index == question =>
            {
                RoomPhase::RoundComplete { question }
            }
            (
                RoomPhase::Idle
                | RoomPhase::Waiting
                | RoomPhase::InRound { .. }
                | RoomPhase::RoundComplete { .. },
                SyncEvent::GameEnded,
            ) => RoomPhase::Completed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(machine: &mut PhaseMachine, event: SyncEvent) -> RoomPhase {
        machine.apply(event).unwrap()
    }

    #[test]
    fn initial_phase_is_idle() {
        assert_eq!(PhaseMachine::new().phase(), RoomPhase::Idle);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut machine = PhaseMachine::new();
        machine.enter_lobby();
        assert_eq!(machine.phase(), RoomPhase::Waiting);

        assert_eq!(
            apply(&mut machine, SyncEvent::GameStarted),
            RoomPhase::InRound { question: 0 }
        );
        assert_eq!(
            apply(&mut machine, SyncEvent::QuestionAdvanced(0)),
            RoomPhase::InRound { question: 0 }
        );
        assert_eq!(
            apply(&mut machine, SyncEvent::AllAnswered(0)),
            RoomPhase::RoundComplete { question: 0 }
        );
        assert_eq!(
            apply(&mut machine, SyncEvent::QuestionAdvanced(1)),
            RoomPhase::InRound { question: 1 }
        );
        assert_eq!(apply(&mut machine, SyncEvent::GameEnded), RoomPhase::Completed);
    }

    #[test]
    fn late_joiner_lands_on_reported_question() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SyncEvent::GameStarted);
        assert_eq!(
            apply(&mut machine, SyncEvent::QuestionAdvanced(5)),
            RoomPhase::InRound { question: 5 }
        );
    }

    #[test]
    fn stale_events_are_rejected() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SyncEvent::GameStarted);
        apply(&mut machine, SyncEvent::QuestionAdvanced(2));

        let err = machine.apply(SyncEvent::QuestionAdvanced(1)).unwrap_err();
        assert_eq!(err.from, RoomPhase::InRound { question: 2 });
        assert_eq!(err.event, SyncEvent::QuestionAdvanced(1));

        let err = machine.apply(SyncEvent::AllAnswered(1)).unwrap_err();
        assert_eq!(err.event, SyncEvent::AllAnswered(1));
    }

    #[test]
    fn nothing_applies_after_completion() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SyncEvent::GameStarted);
        apply(&mut machine, SyncEvent::GameEnded);

        assert!(machine.apply(SyncEvent::QuestionAdvanced(3)).is_err());
        assert!(machine.apply(SyncEvent::GameEnded).is_err());
        assert_eq!(machine.phase(), RoomPhase::Completed);
    }

    #[test]
    fn enter_lobby_is_idempotent_and_scoped_to_idle() {
        let mut machine = PhaseMachine::new();
        machine.enter_lobby();
        machine.enter_lobby();
        assert_eq!(machine.phase(), RoomPhase::Waiting);

        apply(&mut machine, SyncEvent::GameStarted);
        machine.enter_lobby();
        assert_eq!(machine.phase(), RoomPhase::InRound { question: 0 });
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SyncEvent::GameStarted);
        machine.reset();
        assert_eq!(machine.phase(), RoomPhase::Idle);
    }
}
