//! # Game configuration and the resolved ad policy.
//!
//! [`GameData`] mirrors the JSON document served by the game API (fetching it is the
//! host's job). [`GameAdPolicy`] is the read-only, fully typed view the orchestrator
//! consults; it is built once per process with [`GameAdPolicy::from_game`].
//!
//! ## Retry resolution
//! ```text
//! retry_on_X(position) = sdk.enabled
//!                      ∧ sdk.retry_on_X is enabled      (bool or object)
//!                      ∧ <position>.retry_on_X          (only if present)
//! ```
//!
//! ## Defaults
//! - ads enabled, preroll enabled, rewarded ads disabled
//! - midroll cooldown = 120s
//! - `sdk.enabled = false` → no retries at all
//! - display ads enabled, fallback promo disabled

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::external::LocalStore;
use crate::policies::position::{AdPosition, AdType};
use crate::policies::retry::RetryPolicy;

/// Local-store key enabling extended debug perks.
pub const DEBUG_EX_KEY: &str = "gd_debug_ex";

/// Local-store key disabling the midroll cooldown (only with [`DEBUG_EX_KEY`]).
pub const DISABLE_MIDROLL_TIMER_KEY: &str = "gd_disable_midroll_timer";

/// Default midroll cooldown in milliseconds.
pub const DEFAULT_MIDROLL_MS: u64 = 2 * 60_000;

/// `{ "enabled": bool }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

/// `{ "title": "..." }` entry of the game's tag list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameTag {
    pub title: String,
}

/// Global SDK switches (`sdk` in the game document).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SdkFlags {
    pub enabled: bool,
    pub retry_on_success: RetryPolicy,
    pub retry_on_failure: RetryPolicy,
}

/// Per-position overrides (`pAds`, `mAds`, `rAds`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PositionFlags {
    pub retry_on_success: Option<RetryPolicy>,
    pub retry_on_failure: Option<RetryPolicy>,
}

/// Display-ad switches (`dAds`), enabled unless stated otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayAdsFlags {
    pub enabled: bool,
}

impl Default for DisplayAdsFlags {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Failure triggers of the puzzle promo.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromoTrigger {
    pub interstitial_failure: bool,
    pub rewarded_failure: bool,
}

/// `promo.puzzle` in the game document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PuzzlePromo {
    pub enabled: bool,
    pub trigger: PromoTrigger,
}

/// `promo` in the game document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromoData {
    pub puzzle: PuzzlePromo,
}

/// Game document as served by the game API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameData {
    pub game_id: String,
    pub enable_ads: bool,
    pub preroll: bool,
    /// Midroll cooldown in milliseconds.
    pub midroll: u64,
    pub rewarded_ads: bool,
    pub title: String,
    pub tags: Vec<GameTag>,
    pub category: String,
    #[serde(rename = "bloc_gard")]
    pub bloc_gard: Option<Toggle>,
    pub sdk: SdkFlags,
    #[serde(rename = "pAds")]
    pub p_ads: PositionFlags,
    #[serde(rename = "mAds")]
    pub m_ads: PositionFlags,
    #[serde(rename = "rAds")]
    pub r_ads: PositionFlags,
    #[serde(rename = "dAds")]
    pub d_ads: DisplayAdsFlags,
    pub promo: PromoData,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            game_id: String::new(),
            enable_ads: true,
            preroll: true,
            midroll: DEFAULT_MIDROLL_MS,
            rewarded_ads: false,
            title: String::new(),
            tags: Vec::new(),
            category: String::new(),
            bloc_gard: None,
            sdk: SdkFlags::default(),
            p_ads: PositionFlags::default(),
            m_ads: PositionFlags::default(),
            r_ads: PositionFlags::default(),
            d_ads: DisplayAdsFlags::default(),
            promo: PromoData::default(),
        }
    }
}

impl GameData {
    /// Parses the game document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Resolved retry switches for one [`AdPosition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionPolicy {
    pub retry_on_success: bool,
    pub retry_on_failure: bool,
}

/// When the display-ad fallback promo kicks in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackTrigger {
    pub enabled: bool,
    pub interstitial_failure: bool,
    pub rewarded_failure: bool,
}

impl FallbackTrigger {
    /// Whether a failed `ad_type` request falls back to the promo.
    pub fn fires_for(&self, ad_type: AdType) -> bool {
        self.enabled
            && match ad_type {
                AdType::Interstitial => self.interstitial_failure,
                AdType::Rewarded => self.rewarded_failure,
            }
    }
}

/// Game identity used for display-ad targeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameInfo {
    pub id: String,
    pub title: String,
    /// Lowercased tag titles.
    pub tags: Vec<String>,
    /// Lowercased category.
    pub category: String,
}

/// Read-only ad policy for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameAdPolicy {
    pub game: GameInfo,
    pub blocked: bool,
    pub ads_enabled: bool,
    pub preroll_enabled: bool,
    pub rewarded_enabled: bool,
    pub display_ads_enabled: bool,
    /// Minimum time between two successful interstitials.
    pub midroll_cooldown: Duration,
    pub preroll: PositionPolicy,
    pub midroll: PositionPolicy,
    pub rewarded: PositionPolicy,
    pub fallback: FallbackTrigger,
}

impl Default for GameAdPolicy {
    fn default() -> Self {
        Self::from_game(&GameData::default())
    }
}

impl GameAdPolicy {
    /// Resolves the game document into typed policy.
    pub fn from_game(data: &GameData) -> Self {
        let resolve = |global: &RetryPolicy, local: &Option<RetryPolicy>| -> bool {
            let base = data.sdk.enabled && global.is_enabled();
            match local {
                Some(p) => base && p.is_enabled(),
                None => base,
            }
        };
        let position = |flags: &PositionFlags| PositionPolicy {
            retry_on_success: resolve(&data.sdk.retry_on_success, &flags.retry_on_success),
            retry_on_failure: resolve(&data.sdk.retry_on_failure, &flags.retry_on_failure),
        };
        let puzzle = &data.promo.puzzle;

        Self {
            game: GameInfo {
                id: data.game_id.clone(),
                title: data.title.clone(),
                tags: data.tags.iter().map(|t| t.title.to_lowercase()).collect(),
                category: data.category.to_lowercase(),
            },
            blocked: data.bloc_gard.as_ref().is_some_and(|b| b.enabled),
            ads_enabled: data.enable_ads,
            preroll_enabled: data.preroll,
            rewarded_enabled: data.rewarded_ads,
            display_ads_enabled: data.d_ads.enabled,
            midroll_cooldown: Duration::from_millis(data.midroll),
            preroll: position(&data.p_ads),
            midroll: position(&data.m_ads),
            rewarded: position(&data.r_ads),
            fallback: FallbackTrigger {
                enabled: puzzle.enabled,
                interstitial_failure: puzzle.trigger.interstitial_failure,
                rewarded_failure: puzzle.trigger.rewarded_failure,
            },
        }
    }

    /// Parses and resolves a game document in one step.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        GameData::from_json(raw).map(|d| Self::from_game(&d))
    }

    /// Applies QA switches from the local store.
    ///
    /// With `gd_debug_ex` set, `gd_disable_midroll_timer` drops the cooldown to zero.
    pub fn with_debug_overrides(mut self, store: &dyn LocalStore) -> Self {
        if store.get_bool(DEBUG_EX_KEY) {
            if store.get_bool(DISABLE_MIDROLL_TIMER_KEY) {
                self.midroll_cooldown = Duration::ZERO;
            } else {
                self.midroll_cooldown = Duration::from_millis(DEFAULT_MIDROLL_MS);
            }
        }
        self
    }

    /// Policy for `position`.
    pub fn position(&self, position: AdPosition) -> &PositionPolicy {
        match position {
            AdPosition::Preroll => &self.preroll,
            AdPosition::Midroll => &self.midroll,
            AdPosition::Rewarded => &self.rewarded,
        }
    }

    #[inline]
    pub fn retry_on_success(&self, position: AdPosition) -> bool {
        self.position(position).retry_on_success
    }

    #[inline]
    pub fn retry_on_failure(&self, position: AdPosition) -> bool {
        self.position(position).retry_on_failure
    }
}
