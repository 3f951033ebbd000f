//! # Ad types and positions.
//!
//! [`AdType`] is what the host asks for; [`AdPosition`] is how an occurrence is
//! classified when selecting policy:
//!
//! ```text
//! Rewarded                              → AdPosition::Rewarded
//! Interstitial, nothing played yet      → AdPosition::Preroll
//! Interstitial, at least one ad played  → AdPosition::Midroll
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The kind of ad requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdType {
    /// Full-screen video between game sessions (default).
    #[default]
    Interstitial,
    /// Opt-in video that grants the player a reward.
    Rewarded,
}

impl AdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Interstitial => "interstitial",
            AdType::Rewarded => "rewarded",
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdType {
    type Err = ConfigError;

    /// Parses the host-facing name. An empty name means [`AdType::Interstitial`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "interstitial" => Ok(AdType::Interstitial),
            "rewarded" => Ok(AdType::Rewarded),
            other => Err(ConfigError::UnsupportedAdType(other.to_string())),
        }
    }
}

/// Policy classification of one ad occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdPosition {
    Preroll,
    Midroll,
    Rewarded,
}

impl AdPosition {
    /// Classifies a request given how many ads have been played so far.
    pub fn classify(ad_type: AdType, plays: u64) -> Self {
        match ad_type {
            AdType::Rewarded => AdPosition::Rewarded,
            AdType::Interstitial if plays == 0 => AdPosition::Preroll,
            AdType::Interstitial => AdPosition::Midroll,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdPosition::Preroll => "preroll",
            AdPosition::Midroll => "midroll",
            AdPosition::Rewarded => "rewarded",
        }
    }
}

impl fmt::Display for AdPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
