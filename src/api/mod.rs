//! Collaborator interfaces the engine consumes: snapshot fetch and answer
//! submission. The engine only ever sees these traits, so tests drive it with
//! scripted implementations.

pub mod http;

use std::time::Duration;

use futures::future::BoxFuture;

use crate::{dto::game::GameSnapshot, error::ApiResult, sync::submission::AnswerChoice};

/// Abstraction over the game server endpoints the engine needs.
pub trait GameApi: Send + Sync {
    /// Fetch the authoritative snapshot for a room.
    ///
    /// Fails with [`crate::error::ApiError::NotFound`],
    /// [`crate::error::ApiError::Unauthorized`], or a transient error.
    fn fetch_snapshot(&self, code: &str) -> BoxFuture<'static, ApiResult<GameSnapshot>>;

    /// Submit an answer for the given question, along with how far into the
    /// round it was given.
    ///
    /// Fails with a transient error or
    /// [`crate::error::ApiError::Rejected`]; neither is fatal to the session.
    fn submit_answer(
        &self,
        code: &str,
        question: u32,
        answer: AnswerChoice,
        answer_time: Duration,
    ) -> BoxFuture<'static, ApiResult<()>>;
}
