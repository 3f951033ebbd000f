//! # SDK runtime configuration.
//!
//! Provides [`SdkConfig`], the centralized settings of one ad runtime.
//!
//! Config is used in two ways:
//! 1. **Session spawn**: timer durations, request budget, slot size and ad unit
//! 2. **Orchestrator**: analytics label, whitelabel switch, promo deadline
//!
//! ## Sentinel values
//! - `max_request_attempts = 0` → treated as 1 (a fetch is always tried once)
//! - `max_request_attempts > 3` → treated as 3
//! - `bid_callback_grace = 0s` → the backstop equals the auction timeout

use std::time::Duration;

use crate::resolver::AdUnit;

/// Upper bound of the internal fetch budget.
const MAX_REQUEST_ATTEMPTS: u32 = 3;

/// Runtime configuration of the ad SDK.
///
/// ## Field semantics
/// - `loader_timeout`: safety deadline of a fetch cycle and of a play start
/// - `loaded_timeout`: deadline between `LOADED` and `STARTED`
/// - `bid_timeout` / `bid_callback_grace`: auction timeout and backstop extension
/// - `max_request_attempts`: internal fetch budget before a play request fails
/// - `width` / `height`: ad slot size handed to the engine
/// - `prefix`: element id prefix of SDK-owned containers
#[derive(Clone, Debug)]
pub struct SdkConfig {
    /// Game id, used as the analytics label of every event.
    pub game_id: String,

    /// Safety deadline armed at each fetch cycle start and at play start.
    pub loader_timeout: Duration,

    /// Safety deadline re-armed on every `LOADED` notice.
    pub loaded_timeout: Duration,

    /// Auction timeout handed to the bidding network.
    pub bid_timeout: Duration,

    /// Extra wait after `bid_timeout` before a silent network is given up on.
    pub bid_callback_grace: Duration,

    /// Fetch attempts allowed before a pending play request fails.
    ///
    /// Reset by `AD_SDK_MANAGER_READY` and by an explicit reset between two
    /// orchestrator attempts.
    pub max_request_attempts: u32,

    /// Ad slot width.
    pub width: u32,

    /// Ad slot height.
    pub height: u32,

    /// Video ad unit offered to bidders.
    pub ad_unit: AdUnit,

    /// Prefix of SDK-owned element ids.
    pub prefix: String,

    /// Whitelabel partners never see ads.
    pub whitelabel: bool,

    /// Deadline for the fallback promo to register an impression.
    pub promo_impression_timeout: Duration,
}

impl SdkConfig {
    /// Request budget clamped to `1..=3`.
    #[inline]
    pub fn request_budget(&self) -> u32 {
        self.max_request_attempts.clamp(1, MAX_REQUEST_ATTEMPTS)
    }

    /// Container id of the cross-promotion slot.
    pub fn cross_promo_container(&self) -> String {
        format!("{}baguette", self.prefix)
    }
}

impl Default for SdkConfig {
    /// Default configuration:
    ///
    /// - `loader_timeout = 12s`, `loaded_timeout = 8s`
    /// - `bid_timeout = 2000ms`, `bid_callback_grace = 500ms`
    /// - `max_request_attempts = 3`
    /// - `640x360` slot, `video1` ad unit, `gdsdk__` prefix
    /// - `promo_impression_timeout = 10s`
    fn default() -> Self {
        Self {
            game_id: String::new(),
            loader_timeout: Duration::from_secs(12),
            loaded_timeout: Duration::from_secs(8),
            bid_timeout: Duration::from_millis(2000),
            bid_callback_grace: Duration::from_millis(500),
            max_request_attempts: MAX_REQUEST_ATTEMPTS,
            width: 640,
            height: 360,
            ad_unit: AdUnit::default(),
            prefix: "gdsdk__".to_string(),
            whitelabel: false,
            promo_impression_timeout: Duration::from_secs(10),
        }
    }
}
