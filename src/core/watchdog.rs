//! # SafetyTimer: the single deadline slot of an ad session.
//!
//! Guards every stage that waits on the ad engine. Armed at fetch start and at
//! play start (12s), re-armed on `LOADED` (8s), cleared on manager-ready and
//! `STARTED`.
//!
//! ## Architecture
//! ```text
//! start(d, reason) ──► clear previous (if armed) ──► generation += 1
//!                                                      │
//!                                 spawn sleeper(d, token, generation)
//!                                      │
//!           token.cancelled() ◄── clear(reason)        │ deadline
//!                 │                                    ▼
//!               exit                        on_expire(generation)
//!                                                      │
//!                                  owner: accept(generation)? ──► stale → drop
//! ```
//!
//! ## Rules
//! - At most **one** deadline is live; `start` on an armed slot clears it first.
//! - `clear` is idempotent.
//! - An expiry is honoured only if its generation is still armed ([`SafetyTimer::accept`]),
//!   so an expiry racing a `clear` is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

type ExpireFn = Arc<dyn Fn(u64) + Send + Sync + 'static>;

struct Armed {
    generation: u64,
    reason: &'static str,
    token: CancellationToken,
}

/// Single-slot deadline with generation-stamped expiries.
pub struct SafetyTimer {
    on_expire: ExpireFn,
    slot: Option<Armed>,
    generation: u64,
}

impl SafetyTimer {
    /// Creates a disarmed timer. `on_expire` receives the generation that fired.
    pub fn new<F>(on_expire: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            on_expire: Arc::new(on_expire),
            slot: None,
            generation: 0,
        }
    }

    /// Arms the slot for `duration`. Returns the new generation.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self, duration: Duration, reason: &'static str) -> u64 {
        if self.slot.is_some() {
            self.clear(reason);
        }
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        let child = token.clone();
        let on_expire = Arc::clone(&self.on_expire);

        tokio::spawn(async move {
            select! {
                _ = child.cancelled() => {}
                _ = time::sleep(duration) => on_expire(generation),
            }
        });

        tracing::debug!(from = reason, ?duration, generation, "Invoked timer");
        self.slot = Some(Armed {
            generation,
            reason,
            token,
        });
        generation
    }

    /// Disarms the slot. Returns `true` if a deadline was live.
    pub fn clear(&mut self, reason: &'static str) -> bool {
        match self.slot.take() {
            Some(armed) => {
                armed.token.cancel();
                tracing::debug!(
                    from = reason,
                    armed_by = armed.reason,
                    generation = armed.generation,
                    "Cleared timer"
                );
                true
            }
            None => false,
        }
    }

    /// Consumes an expiry: `true` (and disarmed) if `generation` is the live one.
    pub fn accept(&mut self, generation: u64) -> bool {
        match &self.slot {
            Some(armed) if armed.generation == generation => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Generation of the live deadline, if any.
    #[inline]
    pub fn armed_generation(&self) -> Option<u64> {
        self.slot.as_ref().map(|a| a.generation)
    }
}

impl Drop for SafetyTimer {
    fn drop(&mut self) {
        if let Some(armed) = self.slot.take() {
            armed.token.cancel();
        }
    }
}
