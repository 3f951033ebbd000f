//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging trait-object handlers into an
//! [`EventBus`](crate::EventBus) via [`EventBus::attach`](crate::EventBus::attach).
//! Closures cover most needs; implement this trait when a handler carries state or
//! wants to filter kinds up front.
//!
//! ## Contract
//! - Called synchronously from [`EventBus::broadcast`](crate::EventBus::broadcast):
//!   keep `on_event` short and never block.
//! - A panic inside `on_event` is caught by the bus and does not reach the publisher.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use adbreak::{Event, EventBus, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Impressions(AtomicUsize);
//!
//! impl Subscribe for Impressions {
//!     fn on_event(&self, _ev: &Event) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//!     fn interested(&self, kind: EventKind) -> bool {
//!         kind == EventKind::Impression
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let counter = Arc::new(Impressions::default());
//! bus.attach(counter.clone());
//! bus.broadcast(Event::new(EventKind::Impression, "pinged"));
//! assert_eq!(counter.0.load(Ordering::Relaxed), 1);
//! ```

use crate::events::{Event, EventKind};

/// Contract for event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &Event);

    /// Whether this subscriber wants events of `kind` (default: all).
    fn interested(&self, _kind: EventKind) -> bool {
        true
    }

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
