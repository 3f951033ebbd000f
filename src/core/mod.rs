//! Ad runtime core: session, orchestration and wiring.
//!
//! The public entry point is [`AdOrchestrator`], built with [`AdBreakBuilder`].
//! [`AdSession`] is exposed for hosts that drive the state machine directly.
//!
//! Modules:
//! - [`config`]: runtime settings ([`SdkConfig`]);
//! - [`watchdog`]: single-slot safety timer;
//! - [`session`]: ad-engine state machine running as an actor;
//! - [`orchestrator`]: validation, retry loop and fallback decision;
//! - [`fallback`]: display-ad promo shown when video ads are exhausted;
//! - [`builder`]: composition root.

pub mod builder;
pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod session;
pub mod watchdog;

pub use builder::AdBreakBuilder;
pub use config::SdkConfig;
pub use fallback::{PromoFallback, PROMO_SCOPE};
pub use orchestrator::{AdOrchestrator, SHOW_AD_SCOPE};
pub use session::{AdSession, Phase, SessionParts, SessionSnapshot, CROSS_PROMO_SLOT};
pub use watchdog::SafetyTimer;
