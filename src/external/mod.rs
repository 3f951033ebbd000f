//! Collaborators the crate drives but does not implement.
//!
//! - [`AdEngine`] video-ad engine, reports back through [`EngineSink`]
//! - [`BiddingNetwork`] header bidding (async)
//! - [`DisplayAdNetwork`] banner ads, reports back through [`DisplayNotices`]
//! - [`PromoFactory`] / [`PromoOverlay`] fallback promo surface
//! - [`AdContainer`] / [`Host`] on-screen container and game callbacks
//! - [`LocalStore`] persisted QA switches
//!
//! No-op implementations ([`NoBids`], [`NoopHost`], [`NoopContainer`],
//! [`MemoryStore`]) cover hosts that do not need a collaborator.

mod bidding;
mod display;
mod engine;
mod host;
mod store;

pub use bidding::{Bid, BiddingNetwork, NoBids};
pub use display::{DisplayAdNetwork, DisplayAdRequest, DisplayNotices, PromoFactory, PromoOverlay};
pub use engine::{AdEngine, AdsRequest, EngineNotice, EngineSink};
pub use host::{AdContainer, Host, NoopContainer, NoopHost};
pub use store::{LocalStore, MemoryStore};
