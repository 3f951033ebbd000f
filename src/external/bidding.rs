//! # Header-bidding network contract.
//!
//! The resolver asks a [`BiddingNetwork`] for bids on one ad unit and turns the
//! winning bids into ad-server targeting. The network is given a timeout; the
//! resolver additionally guards the call with its own backstop so a network that
//! never answers cannot stall a fetch cycle.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ResolutionError;
use crate::resolver::AdUnit;

/// One bid returned for an ad unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
    /// Bidder code (e.g. `"appnexus"`).
    pub bidder: String,
    /// Creative id assigned by the bidder.
    pub ad_id: String,
    /// Price in CPM.
    pub cpm: f64,
    pub width: u32,
    pub height: u32,
    /// Private-marketplace deal, if any.
    pub deal_id: Option<String>,
}

impl Bid {
    /// Creates a bid without a deal.
    pub fn new(bidder: impl Into<String>, ad_id: impl Into<String>, cpm: f64, width: u32, height: u32) -> Self {
        Self {
            bidder: bidder.into(),
            ad_id: ad_id.into(),
            cpm,
            width,
            height,
            deal_id: None,
        }
    }

    /// `"<w>x<h>"`.
    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Contract of the bidding network.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use adbreak::{AdUnit, Bid, BiddingNetwork, ResolutionError};
///
/// struct House;
///
/// #[async_trait]
/// impl BiddingNetwork for House {
///     async fn request_bids(&self, unit: &AdUnit, _timeout: Duration) -> Result<Vec<Bid>, ResolutionError> {
///         Ok(vec![Bid::new("house", format!("{}-1", unit.code), 1.0, 640, 480)])
///     }
/// }
/// ```
#[async_trait]
pub trait BiddingNetwork: Send + Sync + 'static {
    /// Runs one bidding round for `unit`. An empty list means no bids.
    async fn request_bids(
        &self,
        unit: &AdUnit,
        timeout: Duration,
    ) -> Result<Vec<Bid>, ResolutionError>;
}

/// Bidding network that never returns bids (tags carry no targeting).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBids;

#[async_trait]
impl BiddingNetwork for NoBids {
    async fn request_bids(
        &self,
        _unit: &AdUnit,
        _timeout: Duration,
    ) -> Result<Vec<Bid>, ResolutionError> {
        Ok(Vec::new())
    }
}
