//! # adbreak
//!
//! **adbreak** orchestrates video advertisement breaks inside a hosted game.
//!
//! It requests bids, resolves a playable ad tag, drives a third-party ad engine
//! through its lifecycle, enforces safety deadlines so a stuck ad never blocks the
//! game, and decides whether to retry, fall back to a display-ad promo, or report
//! failure. Ad engines, bidders, display networks and the game itself are
//! plugged in through traits.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 show_ad / preload_ad / cancel_ad / show_display_ad
//!                                      │
//!                                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  AdOrchestrator                                                   │
//! │  - validation (blocked, disabled, type, rewarded, cooldown)       │
//! │  - bounded attempt loop (Initial / RetryOnSuccess / RetryOnFailure)│
//! │  - PromoFallback (once, after retries)                            │
//! │  - Host pause/resume (SDK_GAME_PAUSE / SDK_GAME_START)            │
//! └──────┬─────────────────────────────────────────────▲──────────────┘
//!        │ start_ad / reset_for_next / cancel          │ outcome events
//!        ▼                                             │ (scoped listeners)
//! ┌──────────────────────────────┐                     │
//! │  AdSession (actor task)      │                     │
//! │  - phase machine             │    broadcast        │
//! │  - SafetyTimer (one slot)    ├──────────────►┌─────┴──────────┐
//! │  - request budget (≤ 3)      │               │    EventBus    │
//! └──┬────────────────────┬──────┘               │ (sync, scoped) │
//!    │ request_ad         │ request_ads/start    └─────┬──────────┘
//!    ▼                    ▼                            ▼
//! ┌──────────────┐   ┌──────────────┐          ┌──────────────┐
//! │ TagResolver  │   │  AdEngine    │          │  Subscribe   │
//! │ (bidding +   │   │ (notices via │          │ (LogWriter,  │
//! │  tag build)  │   │  EngineSink) │          │  host hooks) │
//! └──────────────┘   └──────────────┘          └──────────────┘
//! ```
//!
//! ### Lifecycle of one play request
//! ```text
//! show_ad(type) ──► validate ──► scope "main.showad#n" ──► session.start_ad ──► id
//!
//! session:
//!   ManagerReady ──► AD_REQUEST, engine.initialize + start (12s deadline)
//!   Loaded       ──► 8s deadline
//!   Started      ──► deadline cleared
//!   ContentResumeRequested ──► teardown, AD_SDK_FINISHED, AD_SUCCESS{id}, refetch
//!
//!   engine error       ──► AD_ERROR (retried internally up to the budget)
//!   deadline expired   ──► AD_SAFETY_TIMER, AD_SDK_CANCELED{id}
//!
//! orchestrator:
//!   outcome{id} ──► close scope ──► retry? fallback? ──► resume host ──► Result
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Orchestration** | Validation, retry loop, fallback promo, host pause/resume.    | [`AdOrchestrator`], [`AdBreakBuilder`]     |
//! | **Session**       | Ad-engine state machine with a single safety deadline.        | [`AdSession`], [`SafetyTimer`], [`Phase`]  |
//! | **Resolution**    | Header bidding, targeting keys and the master video tag.      | [`TagResolver`], [`AdUnit`], [`Bid`]       |
//! | **Events**        | Synchronous bus with scoped listeners.                        | [`EventBus`], [`Event`], [`Scope`]         |
//! | **Policies**      | Game document, retry flags and fallback triggers.             | [`GameAdPolicy`], [`RetryPolicy`]          |
//! | **Errors**        | Typed errors with human-readable messages.                    | [`AdError`], [`ConfigError`]               |
//! | **Configuration** | Timer durations, budget, slot size, ad unit.                  | [`SdkConfig`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use adbreak::{AdBreakBuilder, AdEngine, AdType, AdsRequest, EngineError, EngineNotice, EngineSink, SdkConfig};
//!
//! /// Engine that never fills: every request ends with an ad error.
//! struct NoFill;
//!
//! impl AdEngine for NoFill {
//!     fn request_ads(&self, _req: &AdsRequest, sink: EngineSink) -> Result<(), EngineError> {
//!         sink.notify(EngineNotice::LoaderReady);
//!         sink.notify(EngineNotice::Error { message: "No ads".into() });
//!         Ok(())
//!     }
//!     fn initialize(&self, _w: u32, _h: u32) -> Result<(), EngineError> { Ok(()) }
//!     fn start(&self) -> Result<(), EngineError> { Ok(()) }
//!     fn resize(&self, _w: u32, _h: u32) {}
//!     fn destroy(&self) {}
//!     fn content_complete(&self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let ads = AdBreakBuilder::new(SdkConfig::default(), Arc::new(NoFill)).build();
//!
//!     let err = ads.show_ad(AdType::Interstitial).await.unwrap_err();
//!     assert_eq!(err.to_string(), "No ads");
//! }
//! ```
mod core;
mod error;
mod events;
mod external;
mod policies;
mod resolver;
mod subscribers;

#[cfg(test)]
mod testkit;

// ---- Public re-exports ----

pub use core::{
    AdBreakBuilder, AdOrchestrator, AdSession, Phase, PromoFallback, SafetyTimer, SdkConfig,
    SessionParts, SessionSnapshot, CROSS_PROMO_SLOT, PROMO_SCOPE, SHOW_AD_SCOPE,
};
pub use error::{AdError, ConfigError, EngineError, ResolutionError};
pub use events::{
    Analytics, Event, EventBus, EventKind, EventStatus, FailureKind, Handler, Scope,
    SubscriptionId, AD_CATEGORY, SDK_CATEGORY,
};
pub use external::{
    AdContainer, AdEngine, AdsRequest, Bid, BiddingNetwork, DisplayAdNetwork, DisplayAdRequest,
    DisplayNotices, EngineNotice, EngineSink, Host, LocalStore, MemoryStore, NoBids,
    NoopContainer, NoopHost, PromoFactory, PromoOverlay,
};
pub use policies::{
    AdPosition, AdType, FallbackTrigger, GameAdPolicy, GameData, GameInfo, PositionPolicy,
    RetryPolicy,
};
pub use resolver::{targeting, AdUnit, TagResolver, DEBUG_KEY, DEBUG_TAG_KEY};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
