//! Bid/tag resolution.
//!
//! - [`AdUnit`] what is auctioned (code, ad-server path, sizes)
//! - [`TagResolver`] debug override, bidding round with backstop, tag building
//! - [`targeting`] send-all-bids targeting and the master video tag layout

mod tag;
pub mod targeting;

pub use tag::{TagResolver, DEBUG_KEY, DEBUG_TAG_KEY};

/// Video ad unit offered to bidders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdUnit {
    /// Ad unit code bidders answer for.
    pub code: String,
    /// Ad-server unit path (`iu`).
    pub path: String,
    /// Player sizes; the first one goes into the tag.
    pub sizes: Vec<(u32, u32)>,
    /// Page describing the content (`description_url`).
    pub description_url: String,
}

impl Default for AdUnit {
    fn default() -> Self {
        Self {
            code: "video1".to_string(),
            path: "/31482709/SpotX_HB_test".to_string(),
            sizes: vec![(640, 480)],
            description_url: String::new(),
        }
    }
}
