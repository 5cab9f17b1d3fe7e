//! Connect to a quiz room and log its synchronized event stream until the
//! game ends or Ctrl+C.
//!
//! Usage: `room-watch <ROOM_CODE>` with `MINDCLASH_API_URL` (and optionally
//! `MINDCLASH_AUTH_TOKEN`) in the environment.

use std::{env, sync::Arc};

use anyhow::Context;
use mindclash_sync::{
    api::http::{HttpApiConfig, HttpGameApi},
    config::SyncConfig,
    dto::event::SessionEvent,
    session,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let code = env::args()
        .nth(1)
        .context("usage: room-watch <ROOM_CODE>")?;
    let base_url =
        env::var("MINDCLASH_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());

    let mut api_config = HttpApiConfig::new(base_url);
    api_config.auth_token = env::var("MINDCLASH_AUTH_TOKEN").ok();
    let api = HttpGameApi::new(api_config).context("building API client")?;

    let handle = session::connect(Arc::new(api), code, SyncConfig::from_env());
    let mut events = handle.subscribe();

    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("shutdown requested; disconnecting");
                handle.disconnect().await;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Closed { reason }) => {
                    info!(?reason, "session closed");
                    break;
                }
                Ok(SessionEvent::StateUpdated { snapshot }) => {
                    info!(
                        status = ?snapshot.status,
                        players = snapshot.players.len(),
                        remaining = format!("{:.1}s", handle.remaining_seconds()),
                        "state updated"
                    );
                }
                Ok(event) => info!(?event, "event"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
