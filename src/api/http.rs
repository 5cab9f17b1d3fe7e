//! `reqwest` implementation of [`GameApi`] against the MindClash HTTP API.

use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    api::GameApi,
    dto::game::GameSnapshot,
    error::{ApiError, ApiResult},
    sync::submission::AnswerChoice,
};

/// Connection settings for [`HttpGameApi`].
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Server base URL, e.g. `https://mindclash.example.com`.
    pub base_url: String,
    /// Optional bearer token attached to every request.
    pub auth_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl HttpApiConfig {
    /// Config for an anonymous client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the game server. Cheap to clone; the inner
/// [`Client`] is already reference-counted.
#[derive(Clone)]
pub struct HttpGameApi {
    client: Client,
    base_url: Arc<str>,
    auth_token: Option<Arc<str>>,
}

impl HttpGameApi {
    /// Build the client from its configuration.
    pub fn new(config: HttpApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ApiError::transient("failed to build HTTP client", source))?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            auth_token: config.auth_token.map(Arc::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token.as_ref()),
            None => builder,
        }
    }
}

/// Envelope wrapping every status response.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    game: Option<GameSnapshot>,
    #[serde(default)]
    error: Option<String>,
}

/// Body posted when submitting an answer. `answer` is the selected option
/// index, or `-1` when the round timed out with no selection.
#[derive(Debug, Serialize)]
struct SubmitBody {
    question: u32,
    answer: i64,
    answer_time: f64,
}

impl GameApi for HttpGameApi {
    fn fetch_snapshot(&self, code: &str) -> BoxFuture<'static, ApiResult<GameSnapshot>> {
        let this = self.clone();
        let code = code.to_string();
        async move {
            let response = this
                .request(Method::GET, &format!("api/game/{code}/status/"))
                .send()
                .await
                .map_err(|source| ApiError::transient("snapshot request failed", source))?;

            match response.status() {
                StatusCode::NOT_FOUND => Err(ApiError::NotFound { code }),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized(
                    format!("snapshot fetch for `{code}` denied"),
                )),
                status if status.is_success() => {
                    let envelope: StatusEnvelope = response.json().await.map_err(|source| {
                        ApiError::transient("failed to decode snapshot response", source)
                    })?;
                    match (envelope.success, envelope.game) {
                        (true, Some(game)) => Ok(game),
                        _ => Err(ApiError::transient_msg(
                            envelope
                                .error
                                .unwrap_or_else(|| "snapshot response carried no game".into()),
                        )),
                    }
                }
                other => Err(ApiError::transient_msg(format!(
                    "unexpected snapshot status {other}"
                ))),
            }
        }
        .boxed()
    }

    fn submit_answer(
        &self,
        code: &str,
        question: u32,
        answer: AnswerChoice,
        answer_time: Duration,
    ) -> BoxFuture<'static, ApiResult<()>> {
        let this = self.clone();
        let code = code.to_string();
        let body = SubmitBody {
            question,
            answer: answer.wire_value(),
            answer_time: answer_time.as_secs_f64(),
        };
        async move {
            let response = this
                .request(Method::POST, &format!("api/game/{code}/answer/"))
                .json(&body)
                .send()
                .await
                .map_err(|source| ApiError::transient("answer request failed", source))?;

            match response.status() {
                status if status.is_success() => Ok(()),
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                    let message = response
                        .json::<StatusEnvelope>()
                        .await
                        .ok()
                        .and_then(|envelope| envelope.error)
                        .unwrap_or_else(|| "answer refused by server".into());
                    Err(ApiError::Rejected(message))
                }
                StatusCode::NOT_FOUND => Err(ApiError::NotFound { code }),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized(
                    format!("answer submission for `{code}` denied"),
                )),
                other => Err(ApiError::transient_msg(format!(
                    "unexpected answer status {other}"
                ))),
            }
        }
        .boxed()
    }
}
