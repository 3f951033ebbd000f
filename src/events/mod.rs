//! Events: types, the in-process bus and scoped subscriptions.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`EventStatus`], [`FailureKind`] event data model
//! - [`EventBus`] synchronous publish/subscribe hub with scope labels
//! - [`Scope`] RAII token grouping temporary listeners
//!
//! ## Quick reference
//! - **Publishers**: the session actor, the safety timer (through the session),
//!   the orchestrator (host pause/resume), display-ad collaborators.
//! - **Consumers**: the orchestrator (scoped outcome listeners per attempt),
//!   the promo fallback (scoped impression/error listeners), host subscribers.

mod bus;
mod event;
mod scope;

pub use bus::{EventBus, Handler, SubscriptionId};
pub use event::{Analytics, Event, EventKind, EventStatus, FailureKind, AD_CATEGORY, SDK_CATEGORY};
pub use scope::Scope;
