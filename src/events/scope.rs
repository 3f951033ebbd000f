//! # Scoped subscriptions.
//!
//! A [`Scope`] is a registration token: every listener added through it shares the
//! scope label, and all of them are removed together exactly once, on
//! [`Scope::close`] or when the scope is dropped (whichever happens first).
//!
//! ```text
//! let scope = bus.scope("main.showad");
//! scope.subscribe(AD_SUCCESS, ..)   ─┐
//! scope.subscribe(AD_ERROR, ..)      ├─ same label
//! scope.subscribe(AD_SDK_CANCELED,..)┘
//!   ... first outcome arrives ...
//! drop(scope)  ──► bus.unsubscribe_scope("main.showad")   (once)
//! ```

use std::sync::Arc;

use super::bus::{EventBus, SubscriptionId};
use super::event::{Event, EventKind};

/// Owner of a group of scoped subscriptions.
#[must_use = "dropping a Scope immediately removes its listeners"]
pub struct Scope {
    bus: EventBus,
    name: Arc<str>,
    closed: bool,
}

impl Scope {
    pub(crate) fn new(bus: EventBus, name: Arc<str>) -> Self {
        Self {
            bus,
            name,
            closed: false,
        }
    }

    /// Scope label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `handler` for `kind` under this scope.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe_scoped(kind, Arc::clone(&self.name), handler)
    }

    /// Removes every listener of this scope. Idempotent; returns how many were removed.
    pub fn close(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;
        self.bus.unsubscribe_scope(&self.name)
    }

    /// Returns `true` once the scope has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.close();
    }
}
