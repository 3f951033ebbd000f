//! # Events broadcast by the ad session, orchestrator and collaborators.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **SDK events**: session plumbing (loader/manager ready, finished, canceled, safety timer)
//! - **Outcome events**: terminal answers to a play request (`AD_SUCCESS`, `AD_ERROR`, `AD_SDK_CANCELED`)
//! - **Engine events**: one-to-one translations of ad-engine lifecycle notices
//! - **Host events**: game pause/resume and display-ad impressions
//!
//! Every kind has a stable wire name ([`EventKind::as_str`]) that hosts match on.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use adbreak::{Event, EventKind, EventStatus};
//!
//! let ev = Event::new(EventKind::AdError, "VAST error")
//!     .with_status(EventStatus::Warning)
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind.as_str(), "AD_ERROR");
//! assert_eq!(ev.attempt, Some(3));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Default analytics category for ad events.
pub const AD_CATEGORY: &str = "AD";

/// Analytics category for host-facing game events.
pub const SDK_CATEGORY: &str = "SDK";

/// Classification of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === SDK events ===
    /// The engine accepted an ads request for the resolved tag.
    AdSdkLoaderReady,
    /// The engine produced an ads manager; the ad can be played.
    AdSdkManagerReady,
    /// The engine handle was torn down after playback; ready for new requests.
    AdSdkFinished,
    /// The current attempt was canceled (manually or by the safety timer).
    AdSdkCanceled,
    /// SDK-level failure outside the engine (missing manager, collaborator panic).
    AdSdkError,
    /// The safety timer expired.
    AdSafetyTimer,
    /// A play request reached the engine.
    AdRequest,

    // === Outcome events ===
    /// Attempt finished with a played ad.
    AdSuccess,
    /// Attempt failed (resolution or engine error).
    AdError,

    // === Engine events ===
    AdBreakReady,
    AdMetadata,
    AllAdsCompleted,
    Click,
    Complete,
    ContentPauseRequested,
    ContentResumeRequested,
    DurationChange,
    FirstQuartile,
    Impression,
    Interaction,
    LinearChanged,
    Loaded,
    Log,
    Midpoint,
    Paused,
    Resumed,
    SkippableStateChanged,
    Skipped,
    Started,
    ThirdQuartile,
    UserClose,
    VolumeChanged,
    VolumeMuted,

    // === Host / display events ===
    /// The host game should resume.
    SdkGameStart,
    /// The host game should pause.
    SdkGamePause,
    /// A display ad rendered an impression.
    DisplayAdImpression,
    /// A display ad failed to render.
    DisplayAdError,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 37] = [
        EventKind::AdSdkLoaderReady,
        EventKind::AdSdkManagerReady,
        EventKind::AdSdkFinished,
        EventKind::AdSdkCanceled,
        EventKind::AdSdkError,
        EventKind::AdSafetyTimer,
        EventKind::AdRequest,
        EventKind::AdSuccess,
        EventKind::AdError,
        EventKind::AdBreakReady,
        EventKind::AdMetadata,
        EventKind::AllAdsCompleted,
        EventKind::Click,
        EventKind::Complete,
        EventKind::ContentPauseRequested,
        EventKind::ContentResumeRequested,
        EventKind::DurationChange,
        EventKind::FirstQuartile,
        EventKind::Impression,
        EventKind::Interaction,
        EventKind::LinearChanged,
        EventKind::Loaded,
        EventKind::Log,
        EventKind::Midpoint,
        EventKind::Paused,
        EventKind::Resumed,
        EventKind::SkippableStateChanged,
        EventKind::Skipped,
        EventKind::Started,
        EventKind::ThirdQuartile,
        EventKind::UserClose,
        EventKind::VolumeChanged,
        EventKind::VolumeMuted,
        EventKind::SdkGameStart,
        EventKind::SdkGamePause,
        EventKind::DisplayAdImpression,
        EventKind::DisplayAdError,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AdSdkLoaderReady => "AD_SDK_LOADER_READY",
            EventKind::AdSdkManagerReady => "AD_SDK_MANAGER_READY",
            EventKind::AdSdkFinished => "AD_SDK_FINISHED",
            EventKind::AdSdkCanceled => "AD_SDK_CANCELED",
            EventKind::AdSdkError => "AD_SDK_ERROR",
            EventKind::AdSafetyTimer => "AD_SAFETY_TIMER",
            EventKind::AdRequest => "AD_REQUEST",
            EventKind::AdSuccess => "AD_SUCCESS",
            EventKind::AdError => "AD_ERROR",
            EventKind::AdBreakReady => "AD_BREAK_READY",
            EventKind::AdMetadata => "AD_METADATA",
            EventKind::AllAdsCompleted => "ALL_ADS_COMPLETED",
            EventKind::Click => "CLICK",
            EventKind::Complete => "COMPLETE",
            EventKind::ContentPauseRequested => "CONTENT_PAUSE_REQUESTED",
            EventKind::ContentResumeRequested => "CONTENT_RESUME_REQUESTED",
            EventKind::DurationChange => "DURATION_CHANGE",
            EventKind::FirstQuartile => "FIRST_QUARTILE",
            EventKind::Impression => "IMPRESSION",
            EventKind::Interaction => "INTERACTION",
            EventKind::LinearChanged => "LINEAR_CHANGED",
            EventKind::Loaded => "LOADED",
            EventKind::Log => "LOG",
            EventKind::Midpoint => "MIDPOINT",
            EventKind::Paused => "PAUSED",
            EventKind::Resumed => "RESUMED",
            EventKind::SkippableStateChanged => "SKIPPABLE_STATE_CHANGED",
            EventKind::Skipped => "SKIPPED",
            EventKind::Started => "STARTED",
            EventKind::ThirdQuartile => "THIRD_QUARTILE",
            EventKind::UserClose => "USER_CLOSE",
            EventKind::VolumeChanged => "VOLUME_CHANGED",
            EventKind::VolumeMuted => "VOLUME_MUTED",
            EventKind::SdkGameStart => "SDK_GAME_START",
            EventKind::SdkGamePause => "SDK_GAME_PAUSE",
            EventKind::DisplayAdImpression => "DISPLAYAD_IMPRESSION",
            EventKind::DisplayAdError => "DISPLAYAD_ERROR",
        }
    }

    /// Looks a kind up by its wire name.
    pub fn from_name(name: &str) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Returns `true` for the three kinds that answer a play request.
    #[inline]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            EventKind::AdSuccess | EventKind::AdError | EventKind::AdSdkCanceled
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Success,
    Warning,
    Error,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Warning => "warning",
            EventStatus::Error => "error",
        }
    }
}

/// Why an attempt failed, attached to failure outcome events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bidding or tag building failed.
    Resolution,
    /// The ad engine reported an error or threw during init/start.
    Engine,
    /// The safety timer expired.
    Timeout,
    /// The attempt was canceled by the host.
    Canceled,
}

/// Analytics triple carried by every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analytics {
    pub category: Arc<str>,
    pub action: Arc<str>,
    pub label: Arc<str>,
}

/// Immutable event record.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `attempt`: set on outcome events answering a specific play request
/// - `failure`: set on failure outcome events
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Human-readable message.
    pub message: Arc<str>,
    /// Severity.
    pub status: EventStatus,
    /// Analytics triple; `action` defaults to the wire name.
    pub analytics: Analytics,
    /// Play request this event answers, if any.
    pub attempt: Option<u64>,
    /// Failure classification for failure outcomes.
    pub failure: Option<FailureKind>,
}

impl Event {
    /// Creates a `success` event in the `AD` category with the next sequence number.
    pub fn new(kind: EventKind, message: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = Arc::from(kind.as_str());
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            message: message.into(),
            status: EventStatus::Success,
            analytics: Analytics {
                category: Arc::from(AD_CATEGORY),
                action: name,
                label: Arc::from(""),
            },
            attempt: None,
            failure: None,
        }
    }

    /// Sets the severity.
    #[inline]
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the analytics label.
    #[inline]
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.analytics.label = label.into();
        self
    }

    /// Sets the analytics category.
    #[inline]
    pub fn with_category(mut self, category: impl Into<Arc<str>>) -> Self {
        self.analytics.category = category.into();
        self
    }

    /// Attaches the play request id this event answers.
    #[inline]
    pub fn with_attempt(mut self, attempt: u64) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a failure classification.
    #[inline]
    pub fn with_failure(mut self, failure: FailureKind) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Attaches an optional play request id.
    #[inline]
    pub(crate) fn with_attempt_opt(mut self, attempt: Option<u64>) -> Self {
        self.attempt = attempt;
        self
    }

    /// Wire name of the event.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_name("NOT_AN_EVENT"), None);
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::Loaded, "video/mp4");
        let b = Event::new(EventKind::Started, "started");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_defaults() {
        let ev = Event::new(EventKind::AdSafetyTimer, "late").with_label("game-1");
        assert_eq!(ev.status, EventStatus::Success);
        assert_eq!(&*ev.analytics.category, "AD");
        assert_eq!(&*ev.analytics.action, "AD_SAFETY_TIMER");
        assert_eq!(&*ev.analytics.label, "game-1");
        assert!(ev.attempt.is_none());
        assert!(ev.failure.is_none());
    }

    #[test]
    fn test_outcome_kinds() {
        assert!(EventKind::AdSuccess.is_outcome());
        assert!(EventKind::AdError.is_outcome());
        assert!(EventKind::AdSdkCanceled.is_outcome());
        assert!(!EventKind::AdSdkFinished.is_outcome());
    }
}
