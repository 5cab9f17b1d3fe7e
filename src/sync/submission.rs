//! Per-question single-submission guarantee.

use dashmap::{DashMap, mapref::entry::Entry};

/// What a submission carries: a selected option, or the timeout sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerChoice {
    /// Index into the question's option list.
    Option(u32),
    /// The round expired before the player chose; the server receives `-1`.
    TimedOut,
}

impl AnswerChoice {
    /// Wire encoding expected by the answer endpoint.
    pub fn wire_value(&self) -> i64 {
        match self {
            AnswerChoice::Option(index) => i64::from(*index),
            AnswerChoice::TimedOut => -1,
        }
    }
}

/// Outcome of a submission attempt, as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The answer was claimed and dispatched to the server.
    Submitted {
        /// Question the answer was recorded for.
        question: u32,
    },
    /// This question already has an answer (user or timeout); no external
    /// call was made.
    AlreadySubmitted {
        /// Question the earlier answer was recorded for.
        question: u32,
    },
    /// No round is currently accepting answers.
    NotInRound,
}

/// Records which questions this session has answered.
///
/// The first claim per question wins, whether it comes from the user or from
/// the timer expiry path; everything after is a no-op.
#[derive(Debug, Default)]
pub struct SubmissionLedger {
    entries: DashMap<u32, AnswerChoice>,
}

impl SubmissionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the submission slot for `question`. Returns true when this call
    /// won the slot and the answer should be sent externally.
    pub fn try_claim(&self, question: u32, choice: AnswerChoice) -> bool {
        match self.entries.entry(question) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(choice);
                true
            }
        }
    }

    /// Whether an answer has been recorded for `question`.
    pub fn has_submitted(&self, question: u32) -> bool {
        self.entries.contains_key(&question)
    }

    /// The recorded answer for `question`, if any.
    pub fn submitted_choice(&self, question: u32) -> Option<AnswerChoice> {
        self.entries.get(&question).map(|entry| *entry.value())
    }

    /// Forget all claims; used when a new game reuses the room code.
    pub fn reset(&self) {
        self.entries.clear();
    }
}
