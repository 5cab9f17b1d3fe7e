//! Snapshot wire types returned by the status endpoint.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

/// Lifecycle status reported by the server for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Lobby: players are gathering, no question is active.
    Waiting,
    /// A quiz is running; `current_question_index` is meaningful.
    InProgress,
    /// The quiz finished; final scores are in the player list.
    Completed,
}

impl GameStatus {
    /// Position in the forward-only lifecycle, used to detect regressions.
    pub(crate) fn rank(self) -> u8 {
        match self {
            GameStatus::Waiting => 0,
            GameStatus::InProgress => 1,
            GameStatus::Completed => 2,
        }
    }
}

/// One participant as reported by the poll endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerState {
    /// Unique display name; also the key identifying the player.
    pub username: String,
    /// Cumulative score.
    #[serde(default)]
    pub score: i64,
    /// Whether this player has answered the current question.
    #[serde(default)]
    pub has_answered: bool,
    /// Consecutive correct answers so far.
    #[serde(default)]
    pub current_streak: u32,
    /// Best streak achieved this game.
    #[serde(default)]
    pub best_streak: u32,
}

/// The question currently posed, when the server chooses to include it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionData {
    /// Question text.
    pub question: String,
    /// Answer options in display order; submissions reference an index here.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Quiz-wide settings attached to a snapshot.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizSettings {
    /// Seconds each question stays open. The legacy wire field is camelCase.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(alias = "timePerQuestion")]
    pub time_per_question: Duration,
}

/// Full point-in-time description of a room, as returned by each poll.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameSnapshot {
    /// Opaque room identifier.
    pub code: String,
    /// Lifecycle status; only ever moves forward within one game.
    pub status: GameStatus,
    /// Username of the room host.
    pub host: String,
    /// Participants; treated as a set keyed by username.
    #[serde(default)]
    pub players: Vec<PlayerState>,
    /// Zero-based index of the active question. The legacy wire field is
    /// `current_question`. Only meaningful while the game is in progress.
    #[serde(default, alias = "current_question")]
    pub current_question_index: Option<u32>,
    /// Payload of the active question, when included.
    #[serde(default)]
    pub current_question_data: Option<QuestionData>,
    /// Quiz settings; absent on some lobby snapshots.
    #[serde(default)]
    pub quiz_data: Option<QuizSettings>,
}

impl GameSnapshot {
    /// The active question index, defined only while the game is in progress.
    pub fn question_index(&self) -> Option<u32> {
        match self.status {
            GameStatus::InProgress => self.current_question_index,
            _ => None,
        }
    }

    /// Players keyed by username, preserving server order and collapsing
    /// duplicates (last entry wins, matching the server's own keying).
    pub fn roster(&self) -> IndexMap<&str, &PlayerState> {
        self.players
            .iter()
            .map(|player| (player.username.as_str(), player))
            .collect()
    }

    /// Whether every player in a non-empty roster has answered the current
    /// question. Always false outside of an in-progress game.
    pub fn all_answered(&self) -> bool {
        if self.status != GameStatus::InProgress {
            return false;
        }
        let roster = self.roster();
        !roster.is_empty() && roster.values().all(|player| player.has_answered)
    }

    /// Round duration declared by the server, if any.
    pub fn time_per_question(&self) -> Option<Duration> {
        self.quiz_data.as_ref().map(|quiz| quiz.time_per_question)
    }
}
