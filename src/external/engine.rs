//! # Ad-engine collaborator contract.
//!
//! The video-ad engine (an IMA-style SDK) is driven through [`AdEngine`]. Its
//! asynchronous lifecycle callbacks are reported back as [`EngineNotice`] values
//! through the [`EngineSink`] handed over with every ads request.
//!
//! ## Lifecycle
//! ```text
//! request_ads(tag, sink)
//!   └─► LoaderReady ─► ManagerReady
//!                          │  initialize(w, h) + start()
//!                          ▼
//!       ContentPauseRequested ─► Loaded ─► Started ─► quartiles ─► Complete
//!                                                                     │
//!                            AllAdsCompleted ◄────────────────────────┘
//!                                  │
//!                          ContentResumeRequested ─► destroy() + content_complete()
//!
//! Error { message } may arrive at any point.
//! ```
//!
//! Each sink is bound to one fetch cycle: notices sent through a sink whose cycle
//! was torn down are ignored by the session.

use tokio::sync::mpsc;

use crate::core::session::Input;
use crate::error::EngineError;
use crate::events::EventKind;

/// Parameters of one ads request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdsRequest {
    /// Resolved ad tag (VAST/VMAP URL).
    pub tag_url: String,
    /// Linear and non-linear slot width.
    pub width: u32,
    /// Linear and non-linear slot height.
    pub height: u32,
    /// Ask the engine to render non-linear ads full-slot so it emits pause/resume.
    pub force_non_linear_full_slot: bool,
}

/// Lifecycle notification reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineNotice {
    /// The ads request was accepted.
    LoaderReady,
    /// Ads were retrieved; an ads manager exists.
    ManagerReady,
    AdBreakReady,
    Metadata,
    /// Creative loaded; carries its content type.
    Loaded { content_type: String },
    Started,
    Paused,
    Resumed,
    Skipped,
    Complete,
    AllAdsCompleted,
    Click,
    Impression,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    DurationChange,
    Interaction,
    LinearChanged,
    SkippableStateChanged,
    UserClose,
    VolumeChanged,
    VolumeMuted,
    ContentPauseRequested,
    ContentResumeRequested,
    /// Diagnostic log record; only forwarded when it carries an ad error.
    Log { ad_error: Option<String> },
    /// Ad error (VAST error, creative failure, ...).
    Error { message: String },
}

impl EngineNotice {
    /// Bus event kind this notice translates to.
    pub fn kind(&self) -> EventKind {
        match self {
            EngineNotice::LoaderReady => EventKind::AdSdkLoaderReady,
            EngineNotice::ManagerReady => EventKind::AdSdkManagerReady,
            EngineNotice::AdBreakReady => EventKind::AdBreakReady,
            EngineNotice::Metadata => EventKind::AdMetadata,
            EngineNotice::Loaded { .. } => EventKind::Loaded,
            EngineNotice::Started => EventKind::Started,
            EngineNotice::Paused => EventKind::Paused,
            EngineNotice::Resumed => EventKind::Resumed,
            EngineNotice::Skipped => EventKind::Skipped,
            EngineNotice::Complete => EventKind::Complete,
            EngineNotice::AllAdsCompleted => EventKind::AllAdsCompleted,
            EngineNotice::Click => EventKind::Click,
            EngineNotice::Impression => EventKind::Impression,
            EngineNotice::FirstQuartile => EventKind::FirstQuartile,
            EngineNotice::Midpoint => EventKind::Midpoint,
            EngineNotice::ThirdQuartile => EventKind::ThirdQuartile,
            EngineNotice::DurationChange => EventKind::DurationChange,
            EngineNotice::Interaction => EventKind::Interaction,
            EngineNotice::LinearChanged => EventKind::LinearChanged,
            EngineNotice::SkippableStateChanged => EventKind::SkippableStateChanged,
            EngineNotice::UserClose => EventKind::UserClose,
            EngineNotice::VolumeChanged => EventKind::VolumeChanged,
            EngineNotice::VolumeMuted => EventKind::VolumeMuted,
            EngineNotice::ContentPauseRequested => EventKind::ContentPauseRequested,
            EngineNotice::ContentResumeRequested => EventKind::ContentResumeRequested,
            EngineNotice::Log { .. } => EventKind::Log,
            EngineNotice::Error { .. } => EventKind::AdError,
        }
    }

    /// Human-readable message broadcast with the translated event.
    pub fn message(&self) -> String {
        let fixed = match self {
            EngineNotice::Loaded { content_type } => return content_type.clone(),
            EngineNotice::Log { ad_error } => return ad_error.clone().unwrap_or_default(),
            EngineNotice::Error { message } => return message.clone(),
            EngineNotice::LoaderReady => "Ads request accepted by the ad engine.",
            EngineNotice::ManagerReady => "Ads manager is ready.",
            EngineNotice::AdBreakReady => {
                "Fired when an ad rule or a VMAP ad break would have played if autoPlayAdBreaks is false."
            }
            EngineNotice::Metadata => "Fired when an ads list is loaded.",
            EngineNotice::Started => "Fired when the ad starts playing.",
            EngineNotice::Paused => "Fired when the ad is paused.",
            EngineNotice::Resumed => "Fired when the ad is resumed.",
            EngineNotice::Skipped => "Fired when the ad is skipped by the user.",
            EngineNotice::Complete => "Fired when the ad completes playing.",
            EngineNotice::AllAdsCompleted => "Fired when the ads manager is done playing all the ads.",
            EngineNotice::Click => "Fired when the ad is clicked.",
            EngineNotice::Impression => "Fired when the impression URL has been pinged.",
            EngineNotice::FirstQuartile => "Fired when the ad playhead crosses first quartile.",
            EngineNotice::Midpoint => "Fired when the ad playhead crosses midpoint.",
            EngineNotice::ThirdQuartile => "Fired when the ad playhead crosses third quartile.",
            EngineNotice::DurationChange => "Fired when the ad's duration changes.",
            EngineNotice::Interaction => {
                "Fired when an ad triggers the interaction callback. Ad interactions contain an interaction ID string in the ad data."
            }
            EngineNotice::LinearChanged => {
                "Fired when the displayed ad changes from linear to nonlinear, or vice versa."
            }
            EngineNotice::SkippableStateChanged => {
                "Fired when the displayed ads skippable state is changed."
            }
            EngineNotice::UserClose => "Fired when the ad is closed by the user.",
            EngineNotice::VolumeChanged => "Fired when the ad volume has changed.",
            EngineNotice::VolumeMuted => "Fired when the ad volume has been muted.",
            EngineNotice::ContentPauseRequested => {
                "Fired when content should be paused. This usually happens right before an ad is about to cover the content."
            }
            EngineNotice::ContentResumeRequested => {
                "Fired when content should be resumed. This usually happens when an ad finishes or collapses."
            }
        };
        fixed.to_string()
    }
}

/// Channel through which an engine reports notices for one fetch cycle.
#[derive(Clone, Debug)]
pub struct EngineSink {
    cycle: u64,
    tx: mpsc::UnboundedSender<Input>,
}

impl EngineSink {
    pub(crate) fn new(cycle: u64, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { cycle, tx }
    }

    /// Fetch cycle this sink belongs to.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Reports a notice. Returns `false` once the session is gone.
    pub fn notify(&self, notice: EngineNotice) -> bool {
        self.tx
            .send(Input::Notice {
                cycle: self.cycle,
                notice,
            })
            .is_ok()
    }
}

/// Contract of the video-ad engine.
///
/// Calls are made from the session actor only, one at a time. Implementations must
/// not block; long work should be completed asynchronously and reported through the
/// [`EngineSink`].
pub trait AdEngine: Send + Sync + 'static {
    /// Requests ads for `request`; lifecycle notices go to `sink`.
    fn request_ads(&self, request: &AdsRequest, sink: EngineSink) -> Result<(), EngineError>;

    /// Initializes the display container and the ads manager for the given slot size.
    fn initialize(&self, width: u32, height: u32) -> Result<(), EngineError>;

    /// Starts playback.
    fn start(&self) -> Result<(), EngineError>;

    /// Resizes the running ad.
    fn resize(&self, width: u32, height: u32);

    /// Destroys the current ads manager. No new request is accepted before this.
    fn destroy(&self);

    /// Signals the loader that content playback completed.
    fn content_complete(&self);
}
