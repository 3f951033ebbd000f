//! # Bid/tag resolution.
//!
//! [`TagResolver::request_ad`] turns an [`AdUnit`] into a playable ad tag:
//!
//! ```text
//! gd_debug + gd_tag in store? ──yes──► stored tag
//!          │ no
//!          ▼
//! bidding.request_bids(unit, bid_timeout)
//!   ├─ guarded by backstop (bid_timeout + grace) ──► NoCallback
//!   ├─ panics ──► Unreachable
//!   └─ bids ──► targeting ──► master video tag
//! ```
//!
//! ## Rules
//! - "No bids" is a valid outcome: the tag is built with empty targeting.
//! - The resolver never retries; the session owns the request budget.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rand::Rng;

use super::targeting;
use super::AdUnit;
use crate::error::{panic_info, ResolutionError};
use crate::external::{BiddingNetwork, LocalStore};

/// Local-store key enabling QA mode.
pub const DEBUG_KEY: &str = "gd_debug";

/// Local-store key holding a QA ad tag (used with [`DEBUG_KEY`]).
pub const DEBUG_TAG_KEY: &str = "gd_tag";

/// Resolves ad units into ad tags.
#[derive(Clone)]
pub struct TagResolver {
    bidding: Arc<dyn BiddingNetwork>,
    store: Arc<dyn LocalStore>,
    bid_timeout: Duration,
    grace: Duration,
}

impl TagResolver {
    /// Creates a resolver.
    ///
    /// - `bid_timeout` is handed to the network as its auction timeout.
    /// - `grace` extends it into the backstop deadline.
    pub fn new(
        bidding: Arc<dyn BiddingNetwork>,
        store: Arc<dyn LocalStore>,
        bid_timeout: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            bidding,
            store,
            bid_timeout,
            grace,
        }
    }

    /// Deadline after which a silent bidding network is given up on.
    #[inline]
    pub fn backstop(&self) -> Duration {
        self.bid_timeout + self.grace
    }

    /// Resolves `unit` into an ad tag.
    pub async fn request_ad(&self, unit: &AdUnit) -> Result<String, ResolutionError> {
        if let Some(tag) = self.debug_tag() {
            tracing::debug!(tag = %tag, "using debug ad tag");
            return Ok(tag);
        }
        if unit.sizes.is_empty() {
            return Err(ResolutionError::MissingSizes(unit.code.clone()));
        }

        let backstop = self.backstop();
        let round = AssertUnwindSafe(self.bidding.request_bids(unit, self.bid_timeout)).catch_unwind();
        let bids = match tokio::time::timeout(backstop, round).await {
            Err(_elapsed) => return Err(ResolutionError::NoCallback(backstop)),
            Ok(Err(panic_err)) => {
                return Err(ResolutionError::Unreachable(panic_info(panic_err.as_ref())))
            }
            Ok(Ok(result)) => result?,
        };
        tracing::debug!(unit = %unit.code, bids = bids.len(), "header bidding finished");

        let targeting = targeting::compute(&bids)?;
        let correlator = rand::thread_rng().gen_range(1..=u64::from(u32::MAX));
        targeting::build_tag_url(unit, &targeting, correlator)
    }

    fn debug_tag(&self) -> Option<String> {
        let debug = self.store.get(DEBUG_KEY).is_some_and(|v| !v.is_empty());
        if !debug {
            return None;
        }
        self.store.get(DEBUG_TAG_KEY).filter(|t| !t.is_empty())
    }
}
