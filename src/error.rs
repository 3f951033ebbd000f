//! Error types used by the orchestrator, the session and the resolver.
//!
//! - [`ConfigError`]: the game configuration forbids the request (never retried).
//! - [`ResolutionError`]: bidding or tag building failed.
//! - [`EngineError`]: the ad engine rejected or failed an operation.
//! - [`AdError`]: what a `show_ad` / `preload_ad` / `show_display_ad` call rejects with.
//!
//! Every type provides `as_label` (stable snake_case for logs/metrics); the
//! `Display` output is the human-readable message handed to the host.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::events::FailureKind;

/// # Requests the game configuration forbids.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The game or the embedding domain is blocked.
    #[error("Game or domain is blocked.")]
    Blocked,

    /// Ads are disabled for this game, or the publisher is a whitelabel partner.
    #[error("Advertisements are disabled.")]
    AdsDisabled,

    /// The requested ad type is not one of the supported types.
    #[error("Unsupported an advertisement type: {0}")]
    UnsupportedAdType(String),

    /// Rewarded ads are not enabled for this title.
    #[error("Rewarded ads are disabled.")]
    RewardedDisabled,

    /// Display ads are not enabled for this title.
    #[error("Display-Ads are disabled.")]
    DisplayAdsDisabled,

    /// The game configuration document could not be read.
    #[error("invalid game configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Blocked => "config_blocked",
            ConfigError::AdsDisabled => "config_ads_disabled",
            ConfigError::UnsupportedAdType(_) => "config_unsupported_ad_type",
            ConfigError::RewardedDisabled => "config_rewarded_disabled",
            ConfigError::DisplayAdsDisabled => "config_display_ads_disabled",
            ConfigError::Invalid(_) => "config_invalid",
        }
    }
}

/// # Failures turning a bidding round into an ad tag.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The bidding network could not be reached (or crashed).
    #[error("bidding network unreachable: {0}")]
    Unreachable(String),

    /// The bidding network never invoked its callback.
    #[error("bidding network did not answer within {0:?}")]
    NoCallback(Duration),

    /// Targeting key/values could not be encoded.
    #[error("malformed targeting: {0}")]
    MalformedTargeting(String),

    /// The ad unit has no sizes to build a tag for.
    #[error("ad unit '{0}' has no sizes")]
    MissingSizes(String),
}

impl ResolutionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolutionError::Unreachable(_) => "resolution_unreachable",
            ResolutionError::NoCallback(_) => "resolution_no_callback",
            ResolutionError::MalformedTargeting(_) => "resolution_malformed_targeting",
            ResolutionError::MissingSizes(_) => "resolution_missing_sizes",
        }
    }
}

/// # Failures reported by (or while driving) the ad engine.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused an operation (bad request, wrong state).
    #[error("ad engine rejected the request: {0}")]
    Rejected(String),

    /// The engine reported an ad error (VAST error, creative failure, ...).
    #[error("{0}")]
    Failed(String),

    /// Play was requested but no ads manager exists.
    #[error("Missing an adsManager or adDisplayContainer")]
    MissingManager,
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Rejected(_) => "engine_rejected",
            EngineError::Failed(_) => "engine_failed",
            EngineError::MissingManager => "engine_missing_manager",
        }
    }
}

/// # Errors returned to the host by the public operations.
///
/// `Config` and `Throttled` are raised before any engine interaction and are never
/// retried. `Resolution`, `Engine`, `Timeout` and `Canceled` come out of a session
/// attempt and go through the retry/fallback policy first.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdError {
    /// The configuration forbids the request.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An interstitial was requested before the midroll cooldown elapsed.
    #[error("The advertisement was requested too soon.")]
    Throttled {
        /// Time left until the next interstitial is allowed.
        remaining: Duration,
    },

    /// Bidding or tag building failed and the session gave up.
    #[error("{reason}")]
    Resolution { reason: String },

    /// The ad engine failed and the session gave up.
    #[error("{reason}")]
    Engine { reason: String },

    /// The safety timer canceled the attempt.
    #[error("{reason}")]
    Timeout { reason: String },

    /// The host canceled the attempt.
    #[error("{reason}")]
    Canceled { reason: String },

    /// Retries were exhausted and the fallback promo failed or was not configured.
    #[error("{reason}")]
    FallbackExhausted { reason: String },

    /// The session actor is gone (runtime shutting down).
    #[error("ad session is closed")]
    SessionClosed,
}

impl AdError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use adbreak::{AdError, ConfigError};
    ///
    /// let err = AdError::from(ConfigError::RewardedDisabled);
    /// assert_eq!(err.as_label(), "config_rewarded_disabled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AdError::Config(e) => e.as_label(),
            AdError::Throttled { .. } => "ad_throttled",
            AdError::Resolution { .. } => "ad_resolution_failed",
            AdError::Engine { .. } => "ad_engine_failed",
            AdError::Timeout { .. } => "ad_timeout",
            AdError::Canceled { .. } => "ad_canceled",
            AdError::FallbackExhausted { .. } => "ad_fallback_exhausted",
            AdError::SessionClosed => "ad_session_closed",
        }
    }

    /// Builds the error matching a failure outcome event.
    pub fn from_failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            FailureKind::Resolution => AdError::Resolution { reason },
            FailureKind::Engine => AdError::Engine { reason },
            FailureKind::Timeout => AdError::Timeout { reason },
            FailureKind::Canceled => AdError::Canceled { reason },
        }
    }

    /// Indicates whether the error came out of an attempt (and may be retried by policy).
    ///
    /// Returns `false` for configuration and throttling errors.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            AdError::Resolution { .. }
                | AdError::Engine { .. }
                | AdError::Timeout { .. }
                | AdError::Canceled { .. }
        )
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
