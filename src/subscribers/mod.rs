//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! AdSession ── broadcast(Event) ──► EventBus ──► handlers for ev.kind
//!                                                   │
//!                                                   ├──► closures (orchestrator scopes, host callbacks)
//!                                                   └──► Subscribe::on_event(&Event)
//!                                                            │
//!                                                       ┌────┴────┬────────┐
//!                                                       ▼         ▼        ▼
//!                                                   LogWriter  Metrics  Custom
//! ```

mod log;
mod subscribe;

pub use log::LogWriter;
pub use subscribe::Subscribe;
