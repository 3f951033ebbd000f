//! # AdOrchestrator: the public "show an ad" entry point.
//!
//! Validates a request, drives one or more [`AdSession`] attempts and applies the
//! retry/fallback policy. Every call resolves exactly once and the host game is
//! resumed on every terminal path.
//!
//! ## Validation (in order)
//! ```text
//! blocked ─► ads disabled / whitelabel ─► unsupported type ─► rewarded disabled
//!         ─► (interstitial) midroll cooldown not elapsed ─► Throttled
//! ```
//!
//! ## Attempt loop
//! ```text
//! ctx = Initial
//! loop {
//!   position = session.ad_position(ad_type)
//!   outcome  = attempt()                   // scoped listeners, filtered by attempt id
//!   match (ctx, outcome) {
//!     (Initial, Ok)        ─► retry_on_success(position)? ctx = RetryOnSuccess : done
//!     (Initial, Err)       ─► retry_on_failure(position)? ctx = RetryOnFailure : fallback?
//!     (RetryOnSuccess, _)  ─► Ok (first message if the retry failed)
//!     (RetryOnFailure, Ok) ─► done
//!     (RetryOnFailure, Err)─► fallback?
//!   }
//! }
//! ```
//! At most two session attempts and one fallback per call. `reset_for_next` runs
//! before every retry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::core::config::SdkConfig;
use crate::core::fallback::{request_display_ad, PromoFallback};
use crate::core::session::AdSession;
use crate::error::{panic_info, AdError, ConfigError};
use crate::events::{Event, EventBus, EventKind, EventStatus, FailureKind, Scope, SDK_CATEGORY};
use crate::external::{DisplayAdNetwork, DisplayAdRequest, Host};
use crate::policies::{AdType, GameAdPolicy};

/// Scope label prefix of per-attempt outcome listeners.
pub const SHOW_AD_SCOPE: &str = "main.showad";

const HOST_SCOPE: &str = "main.host";

const MSG_DONE: &str = "Advertisement(s) are done. Start / resume the game.";
const MSG_PAUSE: &str = "New advertisements requested and loaded";
const MSG_DISPLAY_OK: &str = "DisplayAd succeded.";
const MSG_DISPLAY_FAILED: &str = "DisplayAd failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptContext {
    Initial,
    RetryOnSuccess,
    RetryOnFailure,
}

impl AttemptContext {
    fn as_str(&self) -> &'static str {
        match self {
            AttemptContext::Initial => "initial",
            AttemptContext::RetryOnSuccess => "retry_on_success",
            AttemptContext::RetryOnFailure => "retry_on_failure",
        }
    }
}

struct ShowState {
    /// Start of the current midroll cooldown.
    last_success: Option<Instant>,
    /// Attempts driven so far; numbers the listener scopes.
    attempts: u64,
}

/// Public ad API of one game.
pub struct AdOrchestrator {
    cfg: SdkConfig,
    policy: GameAdPolicy,
    bus: EventBus,
    session: AdSession,
    host: Arc<dyn Host>,
    display: Option<Arc<dyn DisplayAdNetwork>>,
    fallback: Option<PromoFallback>,
    state: Mutex<ShowState>,
    _host_scope: Scope,
}

impl AdOrchestrator {
    pub(crate) fn new(
        cfg: SdkConfig,
        policy: GameAdPolicy,
        bus: EventBus,
        session: AdSession,
        host: Arc<dyn Host>,
        display: Option<Arc<dyn DisplayAdNetwork>>,
        fallback: Option<PromoFallback>,
    ) -> Self {
        // A disabled preroll starts the cooldown right away.
        let last_success = (!policy.preroll_enabled).then(Instant::now);

        let host_scope = bus.scope(HOST_SCOPE);
        {
            let host = Arc::clone(&host);
            let bus = bus.clone();
            let label = cfg.game_id.clone();
            host_scope.subscribe(EventKind::ContentPauseRequested, move |_| {
                notify_host(&*host, &bus, &label, HostSignal::Pause);
            });
        }

        Self {
            cfg,
            policy,
            bus,
            session,
            host,
            display,
            fallback,
            state: Mutex::new(ShowState {
                last_success,
                attempts: 0,
            }),
            _host_scope: host_scope,
        }
    }

    /// Shows an ad of `ad_type`. Resolves with the outcome message.
    pub async fn show_ad(&self, ad_type: AdType) -> Result<String, AdError> {
        self.show(Ok(ad_type)).await
    }

    /// Like [`show_ad`](Self::show_ad) with a host-facing type name (empty = interstitial).
    pub async fn show_ad_named(&self, name: &str) -> Result<String, AdError> {
        self.show(name.parse::<AdType>()).await
    }

    /// Whether an ad of `ad_type` is ready to play.
    pub async fn preload_ad(&self, ad_type: AdType) -> Result<bool, AdError> {
        if self.policy.blocked {
            return Err(ConfigError::Blocked.into());
        }
        if ad_type == AdType::Rewarded && !self.policy.rewarded_enabled {
            return Err(ConfigError::RewardedDisabled.into());
        }
        Ok(self.session.preload().await)
    }

    /// Like [`preload_ad`](Self::preload_ad) with a type name (empty = rewarded).
    pub async fn preload_ad_named(&self, name: &str) -> Result<bool, AdError> {
        if self.policy.blocked {
            return Err(ConfigError::Blocked.into());
        }
        let ad_type = match name.trim() {
            "" => AdType::Rewarded,
            other => other.parse::<AdType>()?,
        };
        self.preload_ad(ad_type).await
    }

    /// Cancels the ad currently requested or playing. No-op if there is none.
    pub fn cancel_ad(&self) {
        self.session.cancel();
    }

    /// Requests a display ad into `request.container_id`.
    ///
    /// Impression and error are reported on the bus (`DISPLAYAD_IMPRESSION`,
    /// `DISPLAYAD_ERROR`) with the slot as analytics label.
    pub fn show_display_ad(&self, request: &DisplayAdRequest) -> Result<(), AdError> {
        request_display_ad(
            &self.bus,
            self.display.as_deref(),
            self.policy.display_ads_enabled,
            request,
        )
    }

    /// Resizes the ad slot.
    pub fn resize(&self, width: u32, height: u32) {
        self.session.resize(width, height);
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn session(&self) -> &AdSession {
        &self.session
    }

    pub fn policy(&self) -> &GameAdPolicy {
        &self.policy
    }

    async fn show(&self, requested: Result<AdType, ConfigError>) -> Result<String, AdError> {
        let mut state = self.state.lock().await;

        let result = match self.validate(requested, &state) {
            Ok(ad_type) => self.run(ad_type, &mut state).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(message) => {
                let status_msg = if message == MSG_DISPLAY_OK {
                    MSG_DISPLAY_OK
                } else {
                    MSG_DONE
                };
                self.resume_host(status_msg, EventStatus::Success);
            }
            Err(e) => {
                tracing::debug!(error = %e, label = e.as_label(), "show_ad rejected");
                self.resume_host(&e.to_string(), EventStatus::Warning);
            }
        }
        result
    }

    fn validate(
        &self,
        requested: Result<AdType, ConfigError>,
        state: &ShowState,
    ) -> Result<AdType, AdError> {
        if self.policy.blocked {
            return Err(ConfigError::Blocked.into());
        }
        if !self.policy.ads_enabled || self.cfg.whitelabel {
            return Err(ConfigError::AdsDisabled.into());
        }
        let ad_type = requested?;
        if ad_type == AdType::Rewarded && !self.policy.rewarded_enabled {
            return Err(ConfigError::RewardedDisabled.into());
        }
        if ad_type == AdType::Interstitial {
            if let Some(since) = state.last_success {
                let elapsed = since.elapsed();
                if elapsed < self.policy.midroll_cooldown {
                    return Err(AdError::Throttled {
                        remaining: self.policy.midroll_cooldown - elapsed,
                    });
                }
            }
        }
        Ok(ad_type)
    }

    async fn run(&self, ad_type: AdType, state: &mut ShowState) -> Result<String, AdError> {
        let mut ctx = AttemptContext::Initial;
        let mut first_success: Option<String> = None;

        loop {
            let position = self.session.ad_position(ad_type).await?;
            state.attempts += 1;
            tracing::debug!(
                ad_type = ad_type.as_str(),
                position = position.as_str(),
                context = ctx.as_str(),
                n = state.attempts,
                "ad attempt"
            );
            let outcome = self.attempt(ad_type, state.attempts).await;

            match (ctx, outcome) {
                (AttemptContext::Initial, Ok(message)) => {
                    if self.policy.retry_on_success(position) {
                        first_success = Some(message);
                        ctx = AttemptContext::RetryOnSuccess;
                        self.session.reset_for_next();
                        continue;
                    }
                    state.last_success = Some(Instant::now());
                    return Ok(message);
                }
                (AttemptContext::RetryOnSuccess, outcome) => {
                    state.last_success = Some(Instant::now());
                    return match outcome {
                        Ok(message) => Ok(message),
                        Err(e) => {
                            tracing::debug!(error = %e, "retry after success failed");
                            Ok(first_success.take().unwrap_or_default())
                        }
                    };
                }
                (AttemptContext::RetryOnFailure, Ok(message)) => {
                    state.last_success = Some(Instant::now());
                    return Ok(message);
                }
                (AttemptContext::Initial, Err(e)) => {
                    if e.is_attempt_failure() && self.policy.retry_on_failure(position) {
                        ctx = AttemptContext::RetryOnFailure;
                        self.session.reset_for_next();
                        continue;
                    }
                    return self.fall_back(ad_type, e).await;
                }
                (AttemptContext::RetryOnFailure, Err(e)) => {
                    return self.fall_back(ad_type, e).await;
                }
            }
        }
    }

    async fn fall_back(&self, ad_type: AdType, error: AdError) -> Result<String, AdError> {
        if !error.is_attempt_failure() || !self.policy.fallback.fires_for(ad_type) {
            return Err(error);
        }
        let Some(fallback) = &self.fallback else {
            tracing::debug!(error = %error, "fallback promo triggered but not configured");
            return Err(AdError::FallbackExhausted {
                reason: MSG_DISPLAY_FAILED.to_string(),
            });
        };
        match fallback.show_promo_display_ad().await {
            Ok(()) => Ok(MSG_DISPLAY_OK.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, cause = %error, "fallback promo failed");
                Err(AdError::FallbackExhausted {
                    reason: MSG_DISPLAY_FAILED.to_string(),
                })
            }
        }
    }

    /// One session attempt: listen, start, wait for the matching outcome.
    async fn attempt(&self, ad_type: AdType, n: u64) -> Result<String, AdError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let scope = self.bus.scope(format!("{SHOW_AD_SCOPE}#{n}"));
        for kind in [EventKind::AdSuccess, EventKind::AdError, EventKind::AdSdkCanceled] {
            let tx = tx.clone();
            scope.subscribe(kind, move |ev| {
                if ev.attempt.is_some() {
                    let _ = tx.send(ev.clone());
                }
            });
        }
        drop(tx);

        let id = self.session.start_ad(ad_type).await?;
        while let Some(ev) = rx.recv().await {
            if ev.attempt != Some(id) {
                continue;
            }
            drop(scope);
            return match ev.kind {
                EventKind::AdSuccess => Ok(ev.message.to_string()),
                _ => Err(AdError::from_failure(
                    ev.failure.unwrap_or(FailureKind::Engine),
                    &*ev.message,
                )),
            };
        }
        Err(AdError::SessionClosed)
    }

    fn resume_host(&self, message: &str, status: EventStatus) {
        notify_host(
            &*self.host,
            &self.bus,
            &self.cfg.game_id,
            HostSignal::Resume { message, status },
        );
    }
}

enum HostSignal<'a> {
    Pause,
    Resume {
        message: &'a str,
        status: EventStatus,
    },
}

/// Calls the host callback (panics isolated) and broadcasts the matching SDK event.
fn notify_host(host: &dyn Host, bus: &EventBus, label: &str, signal: HostSignal<'_>) {
    let (kind, message, status, callback) = match signal {
        HostSignal::Pause => (EventKind::SdkGamePause, MSG_PAUSE, EventStatus::Success, "pauseGame"),
        HostSignal::Resume { message, status } => {
            (EventKind::SdkGameStart, message, status, "resumeGame")
        }
    };
    let called = catch_unwind(AssertUnwindSafe(|| match kind {
        EventKind::SdkGamePause => host.pause_game(),
        _ => host.resume_game(),
    }));
    if let Err(panic_err) = called {
        tracing::warn!(
            callback,
            info = %panic_info(panic_err.as_ref()),
            "DEVELOPER_ERROR"
        );
    }
    bus.broadcast(
        Event::new(kind, message)
            .with_status(status)
            .with_category(SDK_CATEGORY)
            .with_label(label),
    );
}
