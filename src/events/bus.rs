//! # In-process event bus with named subscription scopes.
//!
//! [`EventBus`] keeps, per [`EventKind`], an ordered list of handlers. Publishing
//! is synchronous: [`EventBus::broadcast`] runs every handler registered for the
//! kind at the moment of the call, in subscription order, on the caller's task.
//!
//! ## Architecture
//! ```text
//! Publishers:                       Handlers (per kind, in order):
//!   AdSession ───┐
//!   SafetyTimer ─┼──► EventBus ──► snapshot ──► h1(&ev) ──► h2(&ev) ──► ... hN(&ev)
//!   Orchestrator ┤   (RwLock'd       │            │
//!   DisplayNet ──┘    registry)      │            └─ panic → caught, logged, next handler runs
//!                                    └─ lock released before any handler runs
//! ```
//!
//! ## Rules
//! - **Snapshot delivery**: handlers added during a broadcast do not see it.
//! - **Isolation**: a panicking handler is caught; the broadcaster never sees it.
//! - **No persistence**: events are lost if nobody is subscribed at send time.
//! - **Scopes**: a subscription may carry a scope label; [`EventBus::unsubscribe_scope`]
//!   removes every subscription with that label regardless of kind.
//! - **No global state**: every bus is an independent value; clones share the registry.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use super::event::{Event, EventKind};
use super::scope::Scope;
use crate::error::panic_info;
use crate::subscribers::Subscribe;

/// Shared handler type.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

/// Identifies one subscription for targeted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    scope: Option<Arc<str>>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<Entry>>,
}

/// Publish/subscribe hub for [`Event`]s.
///
/// ### Properties
/// - **Synchronous**: `broadcast()` returns after every handler ran.
/// - **Cloneable**: clones share one registry (cheap, `Arc`-backed).
/// - **Independent**: two buses built with [`EventBus::new`] never see each other's events.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let live: usize = reg.by_kind.values().map(Vec::len).sum();
        f.debug_struct("EventBus").field("live", &live).finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to `kind` for the lifetime of the bus.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert(kind, None, Arc::new(handler))
    }

    /// Subscribes `handler` to `kind` under `scope`.
    ///
    /// Everything registered under the same scope label is removed together by
    /// [`EventBus::unsubscribe_scope`].
    pub fn subscribe_scoped<F>(
        &self,
        kind: EventKind,
        scope: impl Into<Arc<str>>,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert(kind, Some(scope.into()), Arc::new(handler))
    }

    /// Removes one subscription. Returns `true` if it was live.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = reg.by_kind.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }

    /// Removes every subscription tagged with `scope`, across all kinds.
    ///
    /// Returns the number of removed subscriptions (`0` is not an error).
    pub fn unsubscribe_scope(&self, scope: &str) -> usize {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for entries in reg.by_kind.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.scope.as_deref() != Some(scope));
            removed += before - entries.len();
        }
        removed
    }

    /// Opens a [`Scope`]: a registration token whose listeners are removed on close or drop.
    pub fn scope(&self, name: impl Into<Arc<str>>) -> Scope {
        Scope::new(self.clone(), name.into())
    }

    /// Subscribes a [`Subscribe`] implementation to every kind it is interested in.
    pub fn attach(&self, subscriber: Arc<dyn Subscribe>) -> Vec<SubscriptionId> {
        EventKind::ALL
            .iter()
            .copied()
            .filter(|k| subscriber.interested(*k))
            .map(|k| {
                let s = Arc::clone(&subscriber);
                self.subscribe(k, move |ev| s.on_event(ev))
            })
            .collect()
    }

    /// Delivers `event` to every handler currently registered for its kind.
    ///
    /// - Handlers run synchronously, in subscription order.
    /// - A panicking handler is logged and skipped; the rest still run.
    pub fn broadcast(&self, event: Event) {
        let handlers: Vec<Handler> = {
            let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            match reg.by_kind.get(&event.kind) {
                Some(entries) => entries.iter().map(|e| Arc::clone(&e.handler)).collect(),
                None => return,
            }
        };

        for handler in handlers {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                let info = panic_info(panic_err.as_ref());
                tracing::warn!(event = event.name(), info = %info, "event handler panicked");
            }
        }
    }

    /// Number of live handlers for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        reg.by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// Number of live subscriptions tagged with `scope`.
    pub fn scope_len(&self, scope: &str) -> usize {
        let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        reg.by_kind
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.scope.as_deref() == Some(scope))
            .count()
    }

    fn insert(&self, kind: EventKind, scope: Option<Arc<str>>, handler: Handler) -> SubscriptionId {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        reg.next_id += 1;
        let id = SubscriptionId(reg.next_id);
        reg.by_kind
            .entry(kind)
            .or_default()
            .push(Entry { id, scope, handler });
        id
    }
}
