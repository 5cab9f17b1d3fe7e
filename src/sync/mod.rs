//! Snapshot-to-event synchronization core: the pure diff function, the phase
//! state machine it drives, the round countdown, and the single-submission
//! ledger.

pub mod state_machine;
pub mod submission;
pub mod synthesizer;
pub mod timer;

pub use self::state_machine::{InvalidTransition, PhaseMachine, RoomPhase};
pub use self::synthesizer::{SyncEvent, synthesize};
