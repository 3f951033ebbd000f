//! Retry, position and game policies.
//!
//! This module groups the knobs that decide **whether** another ad attempt is made
//! and **when** the fallback promo takes over.
//!
//! ## Contents
//! - [`AdType`], [`AdPosition`] what was asked for and how it is classified
//! - [`RetryPolicy`] boolean-or-object retry flag, typed
//! - [`GameData`] game API document (serde model)
//! - [`GameAdPolicy`] resolved per-position switches, cooldown and fallback triggers
//!
//! ## Quick wiring
//! ```text
//! GameData (JSON) ──► GameAdPolicy::from_game ──► AdOrchestrator
//!                                                   ├─ validate(ad_type)
//!                                                   ├─ retry_on_success(position)
//!                                                   ├─ retry_on_failure(position)
//!                                                   └─ fallback.fires_for(ad_type)
//! ```

mod game;
mod position;
mod retry;

pub use game::{
    FallbackTrigger, GameAdPolicy, GameData, GameInfo, PositionPolicy, DEBUG_EX_KEY,
    DEFAULT_MIDROLL_MS, DISABLE_MIDROLL_TIMER_KEY,
};
pub use position::{AdPosition, AdType};
pub use retry::RetryPolicy;
