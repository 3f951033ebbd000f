//! # AdSession: the ad-engine state machine.
//!
//! One session owns the ad engine, the safety timer and the request budget. It runs
//! as a tokio actor task: every input (host command, engine notice, resolver result,
//! timer expiry) goes through one unbounded queue and is handled to completion
//! before the next one. [`AdSession`] is the cloneable handle.
//!
//! ## Fetch cycle
//! ```text
//! begin_cycle ──► arm 12s ──► resolve tag ──► engine.request_ads(tag, sink)
//!                                                 │
//!                         LoaderReady ◄───────────┘
//!                              │
//!                         ManagerReady ──► clear timer, attempts = 0 (unless the
//!                              │           pending play already failed once)
//!                              │
//!            start_ad ────────►├──► arm 12s, AD_REQUEST, initialize + start
//!                              ▼
//!        ContentPauseRequested ─► Loaded (arm 8s) ─► Started (clear) ─► ...
//!                              │
//!        ContentResumeRequested ─► teardown ─► AD_SDK_FINISHED ─► AD_SUCCESS | AD_ERROR
//!                              │
//!                              └──► begin_cycle (preload next ad)
//! ```
//!
//! ## Failure handling
//! ```text
//! error before STARTED:  attempts < budget ─► attempts += 1, AD_ERROR, refetch
//!                        attempts = budget ─► Idle, terminal AD_ERROR{attempt}
//! error after STARTED:   terminal AD_ERROR{attempt}, refetch
//! timer expiry:          AD_SAFETY_TIMER, AD_SDK_CANCELED{attempt, Timeout}, counts against budget
//! cancel():              AD_SDK_CANCELED{attempt}, teardown deferred until loader and
//!                        manager settled
//! ```
//!
//! ## Rules
//! - Every play request (attempt id) gets **exactly one** terminal outcome event.
//! - Notices carry the cycle they belong to; notices of a torn-down cycle are dropped.
//! - The engine is destroyed at most once per cycle.
//! - `STARTED` is only honoured after `LOADED`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::core::config::SdkConfig;
use crate::core::watchdog::SafetyTimer;
use crate::error::{panic_info, AdError, EngineError, ResolutionError};
use crate::events::{Event, EventBus, EventKind, EventStatus, FailureKind};
use crate::external::{
    AdContainer, AdEngine, AdsRequest, DisplayAdNetwork, DisplayAdRequest, DisplayNotices,
    EngineNotice, EngineSink,
};
use crate::policies::{AdPosition, AdType, GameInfo};
use crate::resolver::TagResolver;

/// Ad-server slot of the cross-promotion unit loaded after the first completed ad.
pub const CROSS_PROMO_SLOT: &str = "/1015413/Gamedistribution_ingame_1x1_crosspromo";

const MSG_CANCELED: &str = "Advertisement has been canceled.";
const MSG_FINISHED: &str = "IMA is ready for new requests.";
const MSG_SAFETY_TIMER: &str = "Advertisement took too long to load.";
const MSG_MANAGER_READY: &str = "Ads manager is ready.";
const MSG_PLAYED: &str = "Advertisement has been played.";
const MSG_NOT_STARTED: &str = "Advertisement ended before playback started.";
const MSG_BUSY: &str = "An advertisement is already in progress.";

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No fetch in flight (request budget spent).
    Idle,
    TagResolving,
    EngineLoading,
    LoaderReady,
    /// An ad can be played.
    ManagerReady,
    Loaded,
    Started,
    Complete,
    /// An attempt was canceled; teardown may still be pending.
    Canceled,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::TagResolving => "tag_resolving",
            Phase::EngineLoading => "engine_loading",
            Phase::LoaderReady => "loader_ready",
            Phase::ManagerReady => "manager_ready",
            Phase::Loaded => "loaded",
            Phase::Started => "started",
            Phase::Complete => "complete",
            Phase::Canceled => "canceled",
            Phase::Error => "error",
        }
    }
}

/// Point-in-time view of the session, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    /// Fetch cycle generation.
    pub cycle: u64,
    /// Failed fetches since the last manager-ready (or reset). A failed pending
    /// play keeps counting across manager-ready.
    pub request_attempts: u32,
    /// Ads handed to the engine so far.
    pub plays: u64,
    pub timer_armed: bool,
    pub teardown_pending: bool,
}

/// Collaborators a session drives.
pub struct SessionParts {
    pub engine: Arc<dyn AdEngine>,
    pub resolver: TagResolver,
    pub container: Arc<dyn AdContainer>,
    /// Display network for the cross-promotion slot (skipped when `None`).
    pub display: Option<Arc<dyn DisplayAdNetwork>>,
    /// Targeting of the cross-promotion slot.
    pub game: GameInfo,
}

pub(crate) enum Input {
    Command(Command),
    Resolved {
        cycle: u64,
        result: Result<String, ResolutionError>,
    },
    Notice {
        cycle: u64,
        notice: EngineNotice,
    },
    TimerExpired {
        generation: u64,
    },
}

pub(crate) enum Command {
    StartAd {
        ad_type: AdType,
        reply: oneshot::Sender<u64>,
    },
    Cancel,
    ResetForNext,
    Preload {
        reply: oneshot::Sender<bool>,
    },
    Position {
        ad_type: AdType,
        reply: oneshot::Sender<AdPosition>,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Handle to a running ad session.
///
/// Clones address the same session. Dropping every handle stops the actor once
/// the engine and pending tasks let go of their channels.
#[derive(Clone, Debug)]
pub struct AdSession {
    tx: mpsc::UnboundedSender<Input>,
}

impl AdSession {
    /// Spawns the session actor; the first fetch cycle starts immediately.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(config: SdkConfig, bus: EventBus, parts: SessionParts) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SessionActor::new(config, bus, parts, tx.downgrade());
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    /// Queues a play request and returns its attempt id.
    ///
    /// The terminal outcome (`AD_SUCCESS`, `AD_ERROR` or `AD_SDK_CANCELED`) carries
    /// this id; subscribe before calling to not miss it.
    pub async fn start_ad(&self, ad_type: AdType) -> Result<u64, AdError> {
        self.ask(|reply| Command::StartAd { ad_type, reply }).await
    }

    /// Cancels the active play request. No-op if there is none.
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    /// Resets the request budget between two orchestrator attempts.
    pub fn reset_for_next(&self) {
        self.send(Command::ResetForNext);
    }

    /// Whether an ad is ready to play. Waits for the current fetch cycle to settle.
    pub async fn preload(&self) -> bool {
        self.ask(|reply| Command::Preload { reply })
            .await
            .unwrap_or(false)
    }

    /// Classifies a request for `ad_type` given the ads played so far.
    pub async fn ad_position(&self, ad_type: AdType) -> Result<AdPosition, AdError> {
        self.ask(|reply| Command::Position { ad_type, reply }).await
    }

    /// Resizes the ad slot (applied to a live engine immediately).
    pub fn resize(&self, width: u32, height: u32) {
        self.send(Command::Resize { width, height });
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, AdError> {
        self.ask(|reply| Command::Snapshot { reply }).await
    }

    fn send(&self, cmd: Command) {
        if self.tx.send(Input::Command(cmd)).is_err() {
            tracing::debug!("ad session closed; command dropped");
        }
    }

    async fn ask<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, AdError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Input::Command(make(reply)))
            .map_err(|_| AdError::SessionClosed)?;
        rx.await.map_err(|_| AdError::SessionClosed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Pending,
    Ready,
    Failed,
}

impl Settle {
    #[inline]
    fn is_settled(self) -> bool {
        self != Settle::Pending
    }

    fn fail_pending(&mut self) {
        if *self == Settle::Pending {
            *self = Settle::Failed;
        }
    }
}

struct Play {
    id: u64,
    ad_type: AdType,
    running: bool,
    /// A try of this play already failed; the budget then spans fetch cycles.
    retried: bool,
}

struct SessionActor {
    cfg: SdkConfig,
    bus: EventBus,
    engine: Arc<dyn AdEngine>,
    resolver: TagResolver,
    container: Arc<dyn AdContainer>,
    display: Option<Arc<dyn DisplayAdNetwork>>,
    game: GameInfo,
    tx: mpsc::WeakUnboundedSender<Input>,
    timer: SafetyTimer,

    phase: Phase,
    cycle: u64,
    tag: Option<String>,
    loader: Settle,
    manager: Settle,
    engine_live: bool,
    resolving: Option<AbortHandle>,
    request_attempts: u32,
    reached_started: bool,

    play: Option<Play>,
    teardown_pending: bool,
    next_attempt: u64,
    plays: u64,
    cross_promo_done: bool,
    preload_waiters: Vec<oneshot::Sender<bool>>,
    width: u32,
    height: u32,
}

impl SessionActor {
    fn new(
        cfg: SdkConfig,
        bus: EventBus,
        parts: SessionParts,
        tx: mpsc::WeakUnboundedSender<Input>,
    ) -> Self {
        let timer_tx = tx.clone();
        let timer = SafetyTimer::new(move |generation| {
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(Input::TimerExpired { generation });
            }
        });
        let (width, height) = (cfg.width, cfg.height);

        Self {
            cfg,
            bus,
            engine: parts.engine,
            resolver: parts.resolver,
            container: parts.container,
            display: parts.display,
            game: parts.game,
            tx,
            timer,
            phase: Phase::Idle,
            cycle: 0,
            tag: None,
            loader: Settle::Pending,
            manager: Settle::Pending,
            engine_live: false,
            resolving: None,
            request_attempts: 0,
            reached_started: false,
            play: None,
            teardown_pending: false,
            next_attempt: 0,
            plays: 0,
            cross_promo_done: false,
            preload_waiters: Vec::new(),
            width,
            height,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        self.begin_cycle();
        while let Some(input) = rx.recv().await {
            self.handle(input);
        }
        self.teardown();
        tracing::debug!("ad session stopped");
    }

    fn handle(&mut self, input: Input) {
        match input {
            Input::Command(cmd) => self.on_command(cmd),
            Input::Resolved { cycle, result } => {
                if cycle == self.cycle && self.phase == Phase::TagResolving {
                    self.on_resolved(result);
                }
            }
            Input::Notice { cycle, notice } => {
                if cycle == self.cycle && self.engine_live {
                    self.on_notice(notice);
                } else {
                    tracing::trace!(cycle, current = self.cycle, notice = ?notice, "stale engine notice dropped");
                }
            }
            Input::TimerExpired { generation } => {
                if self.timer.accept(generation) {
                    self.on_timeout();
                }
            }
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::StartAd { ad_type, reply } => self.start_ad(ad_type, reply),
            Command::Cancel => self.cancel(),
            Command::ResetForNext => {
                self.request_attempts = 0;
                if self.phase == Phase::Idle {
                    self.begin_cycle();
                }
            }
            Command::Preload { reply } => {
                if self.phase == Phase::Idle {
                    let _ = reply.send(false);
                } else if self.manager == Settle::Ready && !self.teardown_pending {
                    let _ = reply.send(true);
                } else {
                    self.preload_waiters.push(reply);
                }
            }
            Command::Position { ad_type, reply } => {
                let _ = reply.send(AdPosition::classify(ad_type, self.plays));
            }
            Command::Resize { width, height } => {
                self.width = width;
                self.height = height;
                if self.engine_live {
                    self.engine.resize(width, height);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot {
                    phase: self.phase,
                    cycle: self.cycle,
                    request_attempts: self.request_attempts,
                    plays: self.plays,
                    timer_armed: self.timer.is_armed(),
                    teardown_pending: self.teardown_pending,
                });
            }
        }
    }

    // ---- fetch cycle ----

    fn begin_cycle(&mut self) {
        self.cycle += 1;
        self.tag = None;
        self.loader = Settle::Pending;
        self.manager = Settle::Pending;
        self.reached_started = false;
        self.teardown_pending = false;
        self.set_phase(Phase::TagResolving);

        self.timer.clear("begin_cycle");
        self.timer.start(self.cfg.loader_timeout, "start()");

        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let resolver = self.resolver.clone();
        let unit = self.cfg.ad_unit.clone();
        let cycle = self.cycle;
        let task = tokio::spawn(async move {
            let result = resolver.request_ad(&unit).await;
            let _ = tx.send(Input::Resolved { cycle, result });
        });
        self.resolving = Some(task.abort_handle());
    }

    fn on_resolved(&mut self, result: Result<String, ResolutionError>) {
        self.resolving = None;
        let tag = match result {
            Ok(tag) => tag,
            Err(e) => {
                tracing::debug!(error = %e, label = e.as_label(), "ad tag resolution failed");
                self.fail(FailureKind::Resolution, e.to_string());
                return;
            }
        };

        self.set_phase(Phase::EngineLoading);
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let request = AdsRequest {
            tag_url: tag.clone(),
            width: self.width,
            height: self.height,
            force_non_linear_full_slot: true,
        };
        self.tag = Some(tag);
        let sink = EngineSink::new(self.cycle, tx);
        let engine = Arc::clone(&self.engine);
        match guarded(|| engine.request_ads(&request, sink)) {
            Ok(()) => self.engine_live = true,
            Err(e) => self.fail(FailureKind::Engine, e.to_string()),
        }
    }

    // ---- engine notices ----

    fn on_notice(&mut self, notice: EngineNotice) {
        match notice {
            EngineNotice::Error { message } => {
                self.fail(FailureKind::Engine, message);
            }
            EngineNotice::Log { ad_error: None } => {}
            EngineNotice::LoaderReady => {
                self.loader = Settle::Ready;
                self.set_phase(Phase::LoaderReady);
                let tag = self.tag.clone().unwrap_or_default();
                self.broadcast(self.event(EventKind::AdSdkLoaderReady, tag));
                self.try_finish_teardown();
            }
            EngineNotice::ManagerReady => {
                self.loader = Settle::Ready;
                self.manager = Settle::Ready;
                self.timer.clear("AD_SDK_MANAGER_READY");
                if !self.play.as_ref().is_some_and(|p| p.retried) {
                    self.request_attempts = 0;
                }
                self.set_phase(Phase::ManagerReady);
                self.broadcast(self.event(EventKind::AdSdkManagerReady, MSG_MANAGER_READY));

                if self.teardown_pending {
                    self.try_finish_teardown();
                } else {
                    self.wake_preload(true);
                    self.play_now();
                }
            }
            EngineNotice::Loaded { .. } => {
                self.set_phase(Phase::Loaded);
                self.timer.clear("LOADED");
                self.timer.start(self.cfg.loaded_timeout, "LOADED");
                self.forward(&notice);
            }
            EngineNotice::Started => {
                if self.phase == Phase::Loaded {
                    self.set_phase(Phase::Started);
                    self.reached_started = true;
                    self.timer.clear("STARTED");
                } else {
                    tracing::warn!(phase = self.phase.as_str(), "STARTED without LOADED ignored");
                }
                self.forward(&notice);
            }
            EngineNotice::ContentPauseRequested => {
                self.container.show();
                self.forward(&notice);
            }
            EngineNotice::ContentResumeRequested => {
                self.container.hide();
                self.forward(&notice);
                self.finish_playback();
            }
            other => self.forward(&other),
        }
    }

    fn forward(&self, notice: &EngineNotice) {
        self.broadcast(self.event(notice.kind(), notice.message()));
    }

    // ---- play ----

    fn start_ad(&mut self, ad_type: AdType, reply: oneshot::Sender<u64>) {
        self.next_attempt += 1;
        let id = self.next_attempt;
        let _ = reply.send(id);

        if self.play.is_some() {
            let ev = self
                .event(EventKind::AdError, MSG_BUSY)
                .with_status(EventStatus::Warning)
                .with_attempt(id)
                .with_failure(FailureKind::Engine);
            self.broadcast(ev);
            return;
        }

        self.play = Some(Play {
            id,
            ad_type,
            running: false,
            retried: false,
        });
        if self.phase == Phase::Idle {
            self.begin_cycle();
        } else if self.manager == Settle::Ready && !self.teardown_pending {
            self.play_now();
        }
    }

    fn play_now(&mut self) {
        let ad_type = match self.play.as_mut() {
            Some(play) if !play.running => {
                play.running = true;
                play.ad_type
            }
            _ => return,
        };
        self.plays += 1;

        self.timer.clear("play()");
        self.timer.start(self.cfg.loader_timeout, "play()");
        self.broadcast(self.event(EventKind::AdRequest, ad_type.as_str()));

        let (w, h) = (self.width, self.height);
        let engine = Arc::clone(&self.engine);
        if let Err(e) = guarded(|| engine.initialize(w, h).and_then(|()| engine.start())) {
            let msg = e.to_string();
            self.broadcast(
                self.event(EventKind::AdSdkError, msg.as_str())
                    .with_status(EventStatus::Error)
                    .with_label(msg.as_str()),
            );
            self.fail(FailureKind::Engine, msg);
        }
    }

    fn finish_playback(&mut self) {
        let played = self.reached_started;
        self.set_phase(if played { Phase::Complete } else { Phase::Error });
        self.timer.clear("CONTENT_RESUME_REQUESTED");
        self.teardown();
        self.broadcast(self.event(EventKind::AdSdkFinished, MSG_FINISHED));

        if let Some(play) = self.take_running_play() {
            let ev = if played {
                self.event(EventKind::AdSuccess, MSG_PLAYED).with_attempt(play.id)
            } else {
                self.event(EventKind::AdError, MSG_NOT_STARTED)
                    .with_status(EventStatus::Warning)
                    .with_attempt(play.id)
                    .with_failure(FailureKind::Engine)
            };
            self.broadcast(ev);
        }

        if played && !self.cross_promo_done {
            self.cross_promo_done = true;
            self.load_cross_promo();
        }
        self.begin_cycle();
    }

    // ---- failures ----

    fn fail(&mut self, kind: FailureKind, message: String) {
        self.timer.clear("AD_ERROR");
        if self.play.as_ref().is_some_and(|p| p.running) {
            self.container.hide();
        }
        self.loader.fail_pending();
        self.manager.fail_pending();

        let error = self
            .event(EventKind::AdError, message.as_str())
            .with_status(EventStatus::Warning)
            .with_label(message.as_str());

        if self.teardown_pending {
            // Outcome already delivered by cancel().
            self.broadcast(error);
            self.try_finish_teardown();
            return;
        }

        if self.reached_started {
            if let Some(play) = self.play.take() {
                self.broadcast(error.with_attempt(play.id).with_failure(kind));
                self.set_phase(Phase::Error);
                self.teardown();
                self.begin_cycle();
                return;
            }
        }

        self.set_phase(Phase::Error);
        self.teardown();
        if self.request_attempts < self.cfg.request_budget() {
            self.request_attempts += 1;
            if self.request_attempts > 1 {
                tracing::warn!(attempt = self.request_attempts, "AD_SDK_REQUEST_ATTEMPT");
            }
            if let Some(play) = self.play.as_mut() {
                play.running = false;
                play.retried = true;
            }
            self.broadcast(error);
            self.begin_cycle();
        } else {
            let ev = match self.play.take() {
                Some(play) => error.with_attempt(play.id).with_failure(kind),
                None => error,
            };
            self.set_phase(Phase::Idle);
            self.wake_preload(false);
            self.broadcast(ev);
        }
    }

    fn cancel(&mut self) {
        if self.teardown_pending {
            return;
        }
        let Some(play) = self.play.take() else {
            return;
        };

        self.container.hide();
        self.broadcast(self.canceled(play.id, FailureKind::Canceled));
        self.set_phase(Phase::Canceled);
        self.teardown_pending = true;

        if !self.engine_live {
            // Nothing reached the engine yet.
            if let Some(task) = self.resolving.take() {
                task.abort();
            }
            self.loader.fail_pending();
            self.manager.fail_pending();
        }
        self.try_finish_teardown();
    }

    fn try_finish_teardown(&mut self) {
        if !self.teardown_pending || !self.loader.is_settled() || !self.manager.is_settled() {
            return;
        }
        self.teardown_pending = false;
        self.teardown();
        self.begin_cycle();
    }

    fn on_timeout(&mut self) {
        self.broadcast(
            self.event(EventKind::AdSafetyTimer, MSG_SAFETY_TIMER)
                .with_status(EventStatus::Warning),
        );
        self.loader.fail_pending();
        self.manager.fail_pending();

        if let Some(play) = self.play.take() {
            self.container.hide();
            self.broadcast(self.canceled(play.id, FailureKind::Timeout));
        }
        self.set_phase(Phase::Canceled);
        self.teardown_pending = false;
        self.teardown();

        if self.request_attempts < self.cfg.request_budget() {
            self.request_attempts += 1;
            if self.request_attempts > 1 {
                tracing::warn!(attempt = self.request_attempts, "AD_SDK_REQUEST_ATTEMPT");
            }
            self.begin_cycle();
        } else {
            self.set_phase(Phase::Idle);
            self.wake_preload(false);
        }
    }

    fn teardown(&mut self) {
        if let Some(task) = self.resolving.take() {
            task.abort();
        }
        if self.engine_live {
            self.engine_live = false;
            self.engine.destroy();
            self.engine.content_complete();
        }
    }

    // ---- helpers ----

    fn load_cross_promo(&self) {
        let Some(display) = &self.display else {
            return;
        };
        let request = DisplayAdRequest {
            container_id: self.cfg.cross_promo_container(),
            slot_id: Some(CROSS_PROMO_SLOT.to_string()),
            sizes: vec![(1, 1)],
            targeting: vec![
                ("crossid".to_string(), self.game.id.clone()),
                ("crosstags".to_string(), self.game.tags.join(",")),
                ("crosscategory".to_string(), self.game.category.clone()),
            ],
            visible: true,
        };
        let notices = DisplayNotices::new(self.bus.clone(), CROSS_PROMO_SLOT);
        if let Err(e) = display.request(&request, notices) {
            tracing::debug!(error = %e, "cross-promo slot not loaded");
        }
    }

    fn take_running_play(&mut self) -> Option<Play> {
        if self.play.as_ref().is_some_and(|p| p.running) {
            self.play.take()
        } else {
            None
        }
    }

    fn wake_preload(&mut self, ready: bool) {
        for waiter in self.preload_waiters.drain(..) {
            let _ = waiter.send(ready);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::trace!(from = self.phase.as_str(), to = phase.as_str(), cycle = self.cycle, "session phase");
            self.phase = phase;
        }
    }

    fn event(&self, kind: EventKind, message: impl Into<Arc<str>>) -> Event {
        Event::new(kind, message).with_label(self.cfg.game_id.as_str())
    }

    fn canceled(&self, attempt: u64, failure: FailureKind) -> Event {
        self.event(EventKind::AdSdkCanceled, MSG_CANCELED)
            .with_status(EventStatus::Warning)
            .with_attempt(attempt)
            .with_failure(failure)
    }

    fn broadcast(&self, event: Event) {
        self.bus.broadcast(event);
    }
}

/// Runs an engine call, turning a panic into an engine failure.
fn guarded(f: impl FnOnce() -> Result<(), EngineError>) -> Result<(), EngineError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic_err) => Err(EngineError::Failed(panic_info(panic_err.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testkit::{settle, Harness, OnRequest, OnStart};

    #[tokio::test(start_paused = true)]
    async fn test_fetch_cycle_reaches_manager_ready() {
        let h = Harness::new();
        settle().await;

        let snap = h.session.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ManagerReady);
        assert!(!snap.timer_armed);
        assert_eq!(h.engine.request_count(), 1);
        assert_eq!(
            h.recorder.kinds(),
            vec![EventKind::AdSdkLoaderReady, EventKind::AdSdkManagerReady]
        );
        assert!(h.session.preload().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_play_emits_one_outcome_and_refetches() {
        let h = Harness::new();
        settle().await;

        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;

        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdSuccess);
        assert_eq!(outcomes[0].attempt, Some(id));

        let kinds = h.recorder.kinds();
        let finished = kinds.iter().position(|k| *k == EventKind::AdSdkFinished).unwrap();
        let success = kinds.iter().position(|k| *k == EventKind::AdSuccess).unwrap();
        assert!(finished < success);
        assert_eq!(h.engine.destroy_count(), 1);
        assert_eq!(h.engine.content_complete_count(), 1);
        assert_eq!(h.engine.request_count(), 2);
        assert_eq!(h.container.shown(), 1);
        assert!(h.container.hidden() >= 1);
        assert_eq!(
            h.session.ad_position(AdType::Interstitial).await.unwrap(),
            AdPosition::Midroll
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_completion_loads_cross_promo_once() {
        let h = Harness::new();
        settle().await;
        for _ in 0..2 {
            h.session.start_ad(AdType::Interstitial).await.unwrap();
            settle().await;
        }

        let requests = h.display.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].slot_id.as_deref(), Some(CROSS_PROMO_SLOT));
        assert_eq!(requests[0].sizes, vec![(1, 1)]);
        assert!(requests[0]
            .targeting
            .contains(&("crossid".to_string(), "game-1".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_started_within_loaded_deadline_times_out() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Stall);
        settle().await;

        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        tokio::time::sleep(Duration::from_secs(9)).await;

        assert_eq!(h.recorder.count(EventKind::AdSafetyTimer), 1);
        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdSdkCanceled);
        assert_eq!(outcomes[0].attempt, Some(id));
        assert_eq!(outcomes[0].failure, Some(FailureKind::Timeout));
        assert_eq!(h.engine.destroy_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_timer_armed() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Stall);
        settle().await;
        h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;

        // Armed at cycle start, cleared at manager-ready, armed at play, re-armed at LOADED.
        let snap = h.session.snapshot().await.unwrap();
        assert!(snap.timer_armed);
        assert_eq!(snap.phase, Phase::Loaded);

        tokio::time::sleep(Duration::from_secs(30)).await;
        // Only the LOADED deadline could fire.
        assert_eq!(h.recorder.count(EventKind::AdSafetyTimer), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_cancel_destroys_once() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Stall);
        settle().await;

        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;
        h.session.cancel();
        h.session.cancel();
        settle().await;

        assert_eq!(h.engine.destroy_count(), 1);
        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdSdkCanceled);
        assert_eq!(outcomes[0].attempt, Some(id));
        assert_eq!(outcomes[0].failure, Some(FailureKind::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_attempt_is_noop() {
        let h = Harness::new();
        settle().await;
        h.session.cancel();
        settle().await;

        assert_eq!(h.recorder.count(EventKind::AdSdkCanceled), 0);
        assert_eq!(h.engine.destroy_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_manager_ready_defers_teardown() {
        let h = Harness::new();
        h.engine.push_request(OnRequest::LoaderOnly);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        h.session.cancel();
        settle().await;

        // Canceled right away, but the engine is only torn down once the manager settles.
        assert_eq!(h.recorder.outcomes()[0].attempt, Some(id));
        assert_eq!(h.engine.destroy_count(), 0);
        assert!(h.session.snapshot().await.unwrap().teardown_pending);

        h.engine.notify(EngineNotice::ManagerReady);
        settle().await;
        assert_eq!(h.engine.destroy_count(), 1);
        assert_eq!(h.engine.request_count(), 2);
        assert_eq!(h.recorder.outcomes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_teardown_settles_on_safety_deadline() {
        let h = Harness::new();
        h.engine.push_request(OnRequest::LoaderOnly);
        tokio::time::sleep(Duration::from_millis(1)).await;

        h.session.start_ad(AdType::Interstitial).await.unwrap();
        h.session.cancel();
        tokio::time::sleep(Duration::from_secs(13)).await;

        assert_eq!(h.recorder.count(EventKind::AdSafetyTimer), 1);
        assert_eq!(h.engine.destroy_count(), 1);
        assert_eq!(h.recorder.outcomes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_budget_is_bounded() {
        let h = Harness::new();
        h.engine.set_default_request(OnRequest::Error);
        settle().await;

        let snap = h.session.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.request_attempts, 3);
        assert_eq!(h.engine.request_count(), 4);
        assert_eq!(h.recorder.count(EventKind::AdError), 4);
        assert!(!h.session.preload().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_play_fails_after_budget() {
        let h = Harness::new();
        h.engine.set_default_request(OnRequest::Error);
        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;

        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdError);
        assert_eq!(outcomes[0].attempt, Some(id));
        assert_eq!(outcomes[0].failure, Some(FailureKind::Engine));
        assert_eq!(h.engine.start_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried_for_pending_play() {
        let h = Harness::new();
        h.engine.push_request(OnRequest::Error);
        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;

        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdSuccess);
        assert_eq!(outcomes[0].attempt, Some(id));
        // The intermediate error carries no attempt id.
        let errors = h.recorder.of_kind(EventKind::AdError);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].attempt, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_throwing_engine_spends_budget_once() {
        let h = Harness::new();
        for _ in 0..50 {
            h.engine.push_start(OnStart::Throw);
        }
        settle().await;

        let id = h.session.start_ad(AdType::Interstitial).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(h.engine.start_count(), 4);
        assert_eq!(h.engine.request_count(), 4);
        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdError);
        assert_eq!(outcomes[0].attempt, Some(id));
        assert_eq!(outcomes[0].failure, Some(FailureKind::Engine));
        assert_eq!(h.session.snapshot().await.unwrap().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_ready_resets_budget_without_failed_play() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Throw);
        settle().await;

        h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;
        assert_eq!(h.recorder.outcomes()[0].kind, EventKind::AdSuccess);

        // The refetch after the played ad starts from a fresh budget.
        let snap = h.session.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ManagerReady);
        assert_eq!(snap.request_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_waits_out_transient_error() {
        let h = Harness::new();
        h.engine.push_request(OnRequest::Error);

        assert!(h.session.preload().await);
        assert_eq!(h.engine.request_count(), 2);
        assert_eq!(h.recorder.count(EventKind::AdError), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_start_is_terminal() {
        let h = Harness::new();
        h.engine.push_start(OnStart::FailAfterStart("VAST error 400".into()));
        settle().await;

        let id = h.session.start_ad(AdType::Rewarded).await.unwrap();
        settle().await;

        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdError);
        assert_eq!(outcomes[0].attempt, Some(id));
        assert_eq!(&*outcomes[0].message, "VAST error 400");
        assert_eq!(h.engine.destroy_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_throw_reports_sdk_error() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Throw);
        settle().await;

        h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;

        assert_eq!(h.recorder.count(EventKind::AdSdkError), 1);
        // Retried internally on the next cycle, then played.
        assert_eq!(h.recorder.outcomes()[0].kind, EventKind::AdSuccess);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_notices_are_ignored() {
        let h = Harness::new();
        settle().await;
        let old = h.engine.sink(0).unwrap();
        h.session.start_ad(AdType::Interstitial).await.unwrap();
        settle().await;
        let before = h.recorder.events().len();

        old.notify(EngineNotice::Started);
        old.notify(EngineNotice::ContentResumeRequested);
        settle().await;
        assert_eq!(h.recorder.events().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_bidding_counts_as_resolution_failure() {
        let h = Harness::with_bidding(crate::testkit::MockBidding::silent());
        tokio::time::sleep(Duration::from_millis(2600)).await;

        let errors = h.recorder.of_kind(EventKind::AdError);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("did not answer"));
        assert_eq!(h.engine.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_exhausted_session() {
        let h = Harness::new();
        h.engine.set_default_request(OnRequest::Error);
        settle().await;
        assert_eq!(h.session.snapshot().await.unwrap().phase, Phase::Idle);

        h.engine.set_default_request(OnRequest::Ready);
        h.session.reset_for_next();
        settle().await;
        let snap = h.session.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ManagerReady);
        assert_eq!(snap.request_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_reaches_live_engine() {
        let h = Harness::new();
        settle().await;
        h.session.resize(800, 600);
        settle().await;
        assert_eq!(h.engine.last_resize(), Some((800, 600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_ad_is_a_success() {
        let h = Harness::new();
        h.engine.push_start(OnStart::Skip);
        settle().await;

        let id = h.session.start_ad(AdType::Rewarded).await.unwrap();
        settle().await;

        assert_eq!(h.recorder.count(EventKind::Skipped), 1);
        let outcomes = h.recorder.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, EventKind::AdSuccess);
        assert_eq!(outcomes[0].attempt, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_request_counts_against_budget() {
        let h = Harness::new();
        h.engine.push_request(OnRequest::Reject);
        settle().await;

        // Nothing reached the engine, so nothing to destroy.
        assert_eq!(h.engine.destroy_count(), 0);
        assert_eq!(h.engine.request_count(), 2);
        assert_eq!(h.recorder.count(EventKind::AdError), 1);
        let snap = h.session.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ManagerReady);
        assert_eq!(snap.request_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_receives_resolved_tag() {
        let h = Harness::new();
        settle().await;

        let request = h.engine.last_request().unwrap();
        assert!(request.tag_url.starts_with(crate::resolver::targeting::TAG_BASE));
        assert_eq!((request.width, request.height), (640, 360));
        assert!(request.force_non_linear_full_slot);

        let ready = h.recorder.of_kind(EventKind::AdSdkLoaderReady);
        assert_eq!(&*ready[0].message, request.tag_url.as_str());
        assert_eq!(&*ready[0].analytics.label, "game-1");
    }
}
