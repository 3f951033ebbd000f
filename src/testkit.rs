//! Scripted collaborators and recording helpers for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::builder::AdBreakBuilder;
use crate::core::config::SdkConfig;
use crate::core::orchestrator::AdOrchestrator;
use crate::core::session::{AdSession, SessionParts};
use crate::error::{EngineError, ResolutionError};
use crate::events::{Event, EventBus, EventKind};
use crate::external::{
    AdContainer, AdEngine, AdsRequest, Bid, BiddingNetwork, DisplayAdNetwork, DisplayAdRequest,
    DisplayNotices, EngineNotice, EngineSink, Host, MemoryStore, PromoFactory, PromoOverlay,
};
use crate::policies::{GameAdPolicy, GameInfo};
use crate::resolver::{AdUnit, TagResolver};
use crate::subscribers::Subscribe;

/// Lets every runnable task finish (paused clock advances by 1ms at most).
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ---- engine ----

/// What the mock engine does on `request_ads`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OnRequest {
    /// Loader ready then manager ready.
    Ready,
    /// Loader ready only; the test drives the rest.
    LoaderOnly,
    /// Loader ready then an ad error.
    Error,
    /// `request_ads` itself fails.
    Reject,
}

/// What the mock engine does on `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OnStart {
    /// Full playback through content resume.
    Play,
    /// Playback the user skips.
    Skip,
    /// Pause requested and loaded, never started.
    Stall,
    /// Started, then an ad error.
    FailAfterStart(String),
    /// `start` returns an error.
    Throw,
}

#[derive(Default)]
struct EngineState {
    requests: Vec<AdsRequest>,
    sinks: Vec<EngineSink>,
    request_script: VecDeque<OnRequest>,
    start_script: VecDeque<OnStart>,
    default_request: Option<OnRequest>,
    starts: usize,
    destroys: usize,
    completes: usize,
    last_resize: Option<(u32, u32)>,
}

#[derive(Default)]
pub(crate) struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub(crate) fn push_request(&self, step: OnRequest) {
        self.state.lock().unwrap().request_script.push_back(step);
    }

    pub(crate) fn push_start(&self, step: OnStart) {
        self.state.lock().unwrap().start_script.push_back(step);
    }

    pub(crate) fn set_default_request(&self, step: OnRequest) {
        self.state.lock().unwrap().default_request = Some(step);
    }

    pub(crate) fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub(crate) fn start_count(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub(crate) fn destroy_count(&self) -> usize {
        self.state.lock().unwrap().destroys
    }

    pub(crate) fn content_complete_count(&self) -> usize {
        self.state.lock().unwrap().completes
    }

    pub(crate) fn last_resize(&self) -> Option<(u32, u32)> {
        self.state.lock().unwrap().last_resize
    }

    pub(crate) fn last_request(&self) -> Option<AdsRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    pub(crate) fn sink(&self, index: usize) -> Option<EngineSink> {
        self.state.lock().unwrap().sinks.get(index).cloned()
    }

    /// Sends `notice` through the most recent sink.
    pub(crate) fn notify(&self, notice: EngineNotice) {
        let sink = self.state.lock().unwrap().sinks.last().cloned();
        if let Some(sink) = sink {
            sink.notify(notice);
        }
    }

    fn current_sink(&self) -> Option<EngineSink> {
        self.state.lock().unwrap().sinks.last().cloned()
    }
}

impl AdEngine for MockEngine {
    fn request_ads(&self, request: &AdsRequest, sink: EngineSink) -> Result<(), EngineError> {
        let step = {
            let mut st = self.state.lock().unwrap();
            st.requests.push(request.clone());
            let step = st
                .request_script
                .pop_front()
                .or_else(|| st.default_request.clone())
                .unwrap_or(OnRequest::Ready);
            if step != OnRequest::Reject {
                st.sinks.push(sink.clone());
            }
            step
        };
        match step {
            OnRequest::Ready => {
                sink.notify(EngineNotice::LoaderReady);
                sink.notify(EngineNotice::ManagerReady);
            }
            OnRequest::LoaderOnly => {
                sink.notify(EngineNotice::LoaderReady);
            }
            OnRequest::Error => {
                sink.notify(EngineNotice::LoaderReady);
                sink.notify(EngineNotice::Error {
                    message: "VAST error 303: no ads".into(),
                });
            }
            OnRequest::Reject => {
                return Err(EngineError::Rejected("loader unavailable".into()));
            }
        }
        Ok(())
    }

    fn initialize(&self, _width: u32, _height: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn start(&self) -> Result<(), EngineError> {
        let step = {
            let mut st = self.state.lock().unwrap();
            st.starts += 1;
            st.start_script.pop_front().unwrap_or(OnStart::Play)
        };
        let Some(sink) = self.current_sink() else {
            return Err(EngineError::Rejected("no loader".into()));
        };
        let loaded = EngineNotice::Loaded {
            content_type: "video/mp4".into(),
        };
        let script = match step {
            OnStart::Play => vec![
                EngineNotice::ContentPauseRequested,
                loaded,
                EngineNotice::Started,
                EngineNotice::Impression,
                EngineNotice::FirstQuartile,
                EngineNotice::Midpoint,
                EngineNotice::ThirdQuartile,
                EngineNotice::Complete,
                EngineNotice::AllAdsCompleted,
                EngineNotice::ContentResumeRequested,
            ],
            OnStart::Skip => vec![
                EngineNotice::ContentPauseRequested,
                loaded,
                EngineNotice::Started,
                EngineNotice::Skipped,
                EngineNotice::ContentResumeRequested,
            ],
            OnStart::Stall => vec![EngineNotice::ContentPauseRequested, loaded],
            OnStart::FailAfterStart(message) => vec![
                EngineNotice::ContentPauseRequested,
                loaded,
                EngineNotice::Started,
                EngineNotice::Error { message },
            ],
            OnStart::Throw => return Err(EngineError::Rejected("start failed".into())),
        };
        for notice in script {
            sink.notify(notice);
        }
        Ok(())
    }

    fn resize(&self, width: u32, height: u32) {
        self.state.lock().unwrap().last_resize = Some((width, height));
    }

    fn destroy(&self) {
        self.state.lock().unwrap().destroys += 1;
    }

    fn content_complete(&self) {
        self.state.lock().unwrap().completes += 1;
    }
}

// ---- bidding ----

enum BidMode {
    Bids(Vec<Bid>),
    Silent,
    Fail(String),
    Panic,
}

pub(crate) struct MockBidding {
    mode: BidMode,
    calls: AtomicUsize,
}

impl MockBidding {
    pub(crate) fn with_bids(bids: Vec<Bid>) -> Self {
        Self::new(BidMode::Bids(bids))
    }

    pub(crate) fn silent() -> Self {
        Self::new(BidMode::Silent)
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self::new(BidMode::Fail(reason.to_string()))
    }

    pub(crate) fn panicking() -> Self {
        Self::new(BidMode::Panic)
    }

    fn new(mode: BidMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiddingNetwork for MockBidding {
    async fn request_bids(
        &self,
        _unit: &AdUnit,
        _timeout: Duration,
    ) -> Result<Vec<Bid>, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            BidMode::Bids(bids) => Ok(bids.clone()),
            BidMode::Silent => futures::future::pending().await,
            BidMode::Fail(reason) => Err(ResolutionError::Unreachable(reason.clone())),
            BidMode::Panic => panic!("bidder crashed"),
        }
    }
}

// ---- display / promo ----

/// What the mock display network does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DisplayMode {
    Impression,
    Error,
    Reject,
    Silent,
}

pub(crate) struct MockDisplay {
    mode: Mutex<DisplayMode>,
    requests: Mutex<Vec<DisplayAdRequest>>,
}

impl MockDisplay {
    pub(crate) fn new(mode: DisplayMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_mode(&self, mode: DisplayMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub(crate) fn requests(&self) -> Vec<DisplayAdRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DisplayAdNetwork for MockDisplay {
    fn request(
        &self,
        request: &DisplayAdRequest,
        notices: DisplayNotices,
    ) -> Result<(), EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        let mode = *self.mode.lock().unwrap();
        match mode {
            DisplayMode::Impression => notices.impression(),
            DisplayMode::Error => notices.error("No fill."),
            DisplayMode::Reject => return Err(EngineError::Rejected("gpt not loaded".into())),
            DisplayMode::Silent => {}
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct OverlayLog {
    pub(crate) created: AtomicUsize,
    pub(crate) shown: AtomicUsize,
    pub(crate) hidden: AtomicUsize,
}

struct MockOverlay {
    log: Arc<OverlayLog>,
    close_after: Duration,
}

#[async_trait]
impl PromoOverlay for MockOverlay {
    fn container_id(&self) -> String {
        "gdsdk__promo".to_string()
    }

    fn slot_id(&self) -> Option<String> {
        Some("/1015413/promo".to_string())
    }

    fn show(&self) {
        self.log.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.log.hidden.fetch_add(1, Ordering::SeqCst);
    }

    async fn closed(&self) {
        tokio::time::sleep(self.close_after).await;
    }
}

/// Builds overlays the player closes after `close_after`.
pub(crate) struct MockPromo {
    pub(crate) log: Arc<OverlayLog>,
    close_after: Duration,
}

impl MockPromo {
    pub(crate) fn new(close_after: Duration) -> Self {
        Self {
            log: Arc::new(OverlayLog::default()),
            close_after,
        }
    }
}

impl PromoFactory for MockPromo {
    fn create(&self) -> Box<dyn PromoOverlay> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Box::new(MockOverlay {
            log: Arc::clone(&self.log),
            close_after: self.close_after,
        })
    }
}

// ---- host / container ----

#[derive(Default)]
pub(crate) struct MockContainer {
    shown: AtomicUsize,
    hidden: AtomicUsize,
}

impl MockContainer {
    pub(crate) fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub(crate) fn hidden(&self) -> usize {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl AdContainer for MockContainer {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct MockHost {
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    panic_on_resume: bool,
}

impl MockHost {
    pub(crate) fn panicking() -> Self {
        Self {
            panic_on_resume: true,
            ..Self::default()
        }
    }

    pub(crate) fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub(crate) fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl Host for MockHost {
    fn pause_game(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume_game(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_resume {
            panic!("resumeGame is not a function");
        }
    }
}

// ---- recording ----

/// Subscriber recording every event it sees.
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub(crate) fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).len()
    }

    /// Terminal outcome events (those answering an attempt id).
    pub(crate) fn outcomes(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind.is_outcome() && e.attempt.is_some())
            .cloned()
            .collect()
    }
}

impl Subscribe for Recorder {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

pub(crate) fn game_info() -> GameInfo {
    GameInfo {
        id: "game-1".into(),
        title: "Test Game".into(),
        tags: vec!["puzzle".into(), "html5".into()],
        category: "casual".into(),
    }
}

pub(crate) fn test_config() -> SdkConfig {
    SdkConfig {
        game_id: "game-1".into(),
        ..SdkConfig::default()
    }
}

/// Session wired to mocks, with a recorder attached before the first cycle.
pub(crate) struct Harness {
    pub(crate) session: AdSession,
    pub(crate) engine: Arc<MockEngine>,
    pub(crate) container: Arc<MockContainer>,
    pub(crate) display: Arc<MockDisplay>,
    pub(crate) recorder: Arc<Recorder>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_bidding(MockBidding::with_bids(Vec::new()))
    }

    pub(crate) fn with_bidding(bidding: MockBidding) -> Self {
        let cfg = test_config();
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.attach(recorder.clone());

        let engine = Arc::new(MockEngine::default());
        let container = Arc::new(MockContainer::default());
        let display = Arc::new(MockDisplay::new(DisplayMode::Impression));
        let resolver = TagResolver::new(
            Arc::new(bidding),
            Arc::new(MemoryStore::new()),
            cfg.bid_timeout,
            cfg.bid_callback_grace,
        );
        let session = AdSession::spawn(
            cfg,
            bus.clone(),
            SessionParts {
                engine: engine.clone(),
                resolver,
                container: container.clone(),
                display: Some(display.clone()),
                game: game_info(),
            },
        );

        Self {
            session,
            engine,
            container,
            display,
            recorder,
        }
    }
}

/// Orchestrator built through [`AdBreakBuilder`] on top of mocks.
pub(crate) struct Rig {
    pub(crate) ads: AdOrchestrator,
    pub(crate) engine: Arc<MockEngine>,
    pub(crate) host: Arc<MockHost>,
    pub(crate) display: Arc<MockDisplay>,
    pub(crate) promo: Arc<MockPromo>,
    pub(crate) recorder: Arc<Recorder>,
}

impl Rig {
    pub(crate) fn new(policy: GameAdPolicy) -> Self {
        Self::build(policy, |_| {}, MockHost::default(), MockBidding::with_bids(Vec::new()))
    }

    pub(crate) fn with_config(policy: GameAdPolicy, tweak: impl FnOnce(&mut SdkConfig)) -> Self {
        Self::build(policy, tweak, MockHost::default(), MockBidding::with_bids(Vec::new()))
    }

    pub(crate) fn with_host(policy: GameAdPolicy, host: MockHost) -> Self {
        Self::build(policy, |_| {}, host, MockBidding::with_bids(Vec::new()))
    }

    pub(crate) fn with_bidding(policy: GameAdPolicy, bidding: MockBidding) -> Self {
        Self::build(policy, |_| {}, MockHost::default(), bidding)
    }

    fn build(
        policy: GameAdPolicy,
        tweak: impl FnOnce(&mut SdkConfig),
        host: MockHost,
        bidding: MockBidding,
    ) -> Self {
        let mut cfg = test_config();
        tweak(&mut cfg);

        let engine = Arc::new(MockEngine::default());
        let host = Arc::new(host);
        let display = Arc::new(MockDisplay::new(DisplayMode::Impression));
        let promo = Arc::new(MockPromo::new(Duration::from_secs(3)));
        let recorder = Arc::new(Recorder::default());

        let ads = AdBreakBuilder::new(cfg, engine.clone())
            .with_bidding(Arc::new(bidding))
            .with_host(host.clone())
            .with_display(display.clone())
            .with_promo(promo.clone())
            .with_policy(policy)
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .build();

        Self {
            ads,
            engine,
            host,
            display,
            promo,
            recorder,
        }
    }
}
