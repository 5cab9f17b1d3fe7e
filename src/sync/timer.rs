//! Round countdown reconciled against a server-declared duration.
//!
//! Remaining time is always recomputed from the armed deadline on a monotonic
//! clock, never accumulated by subtracting ticks, so a stalled task or a
//! backgrounded process cannot make the countdown drift.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Armed {
    question: u32,
    duration: Duration,
    started_at: Instant,
    expiry_fired: bool,
}

impl Armed {
    fn deadline(&self) -> Instant {
        self.started_at + self.duration
    }
}

/// One-shot-per-arm countdown shared between the engine task and handle.
///
/// Re-arming for a new question replaces the previous deadline outright, so a
/// stale expiry from an already-advanced round can never fire.
#[derive(Debug, Default)]
pub struct RoundTimer {
    inner: Mutex<Option<Armed>>,
}

impl RoundTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the countdown for `question`, starting at `started_at` (the local
    /// receipt instant of the snapshot that introduced the question).
    pub fn arm(&self, question: u32, duration: Duration, started_at: Instant) {
        let mut slot = self.lock();
        *slot = Some(Armed {
            question,
            duration,
            started_at,
            expiry_fired: false,
        });
    }

    /// Drop any armed deadline; pending expiries are suppressed.
    pub fn disarm(&self) {
        self.lock().take();
    }

    /// Time left before the deadline; zero when disarmed or expired.
    /// Monotonically non-increasing between arms.
    pub fn remaining(&self) -> Duration {
        match *self.lock() {
            Some(armed) => armed.deadline().saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Time elapsed since the round started, capped at the round duration.
    /// Zero when disarmed.
    pub fn elapsed(&self) -> Duration {
        match *self.lock() {
            Some(armed) => (Instant::now() - armed.started_at).min(armed.duration),
            None => Duration::ZERO,
        }
    }

    /// Check whether the deadline has passed. Returns the expired question
    /// index the first time it is observed after each arm, `None` afterwards.
    pub fn poll_expired(&self, now: Instant) -> Option<u32> {
        let mut slot = self.lock();
        let armed = slot.as_mut()?;
        if armed.expiry_fired || now < armed.deadline() {
            return None;
        }
        armed.expiry_fired = true;
        Some(armed.question)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Armed>> {
        // Held only for field reads/writes; poisoning would require a panic
        // inside one of those, so recover the inner value rather than
        // cascading the panic into the engine task.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
