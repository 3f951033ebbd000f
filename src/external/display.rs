//! # Display-ad network and promo overlay.
//!
//! Display (banner) ads are requested into a container slot. The network reports
//! the outcome through [`DisplayNotices`], which broadcasts
//! `DISPLAYAD_IMPRESSION` / `DISPLAYAD_ERROR` on the bus.
//!
//! The promo overlay is the full-screen surface the fallback renders a display ad
//! into; [`PromoFactory`] builds a fresh one per fallback run.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::events::{Event, EventBus, EventKind, EventStatus};

/// One display-ad request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayAdRequest {
    /// Element the slot renders into.
    pub container_id: String,
    /// Ad-server slot path; the network picks its default when `None`.
    pub slot_id: Option<String>,
    /// Accepted creative sizes.
    pub sizes: Vec<(u32, u32)>,
    /// Key/value targeting.
    pub targeting: Vec<(String, String)>,
    /// Render immediately (otherwise the slot is loaded hidden).
    pub visible: bool,
}

/// Outcome reporter handed to a [`DisplayAdNetwork`] with each request.
#[derive(Clone, Debug)]
pub struct DisplayNotices {
    bus: EventBus,
    slot: Arc<str>,
}

impl DisplayNotices {
    pub(crate) fn new(bus: EventBus, slot: impl Into<Arc<str>>) -> Self {
        Self {
            bus,
            slot: slot.into(),
        }
    }

    /// The slot rendered an impression.
    pub fn impression(&self) {
        self.bus.broadcast(
            Event::new(EventKind::DisplayAdImpression, "Display ad impression.")
                .with_label(Arc::clone(&self.slot)),
        );
    }

    /// The slot failed to render.
    pub fn error(&self, reason: impl Into<Arc<str>>) {
        self.bus.broadcast(
            Event::new(EventKind::DisplayAdError, reason)
                .with_status(EventStatus::Warning)
                .with_label(Arc::clone(&self.slot)),
        );
    }
}

/// Contract of the display-ad network.
pub trait DisplayAdNetwork: Send + Sync + 'static {
    /// Requests a display ad. `Err` means the request could not be placed at all;
    /// render outcomes go through `notices`.
    fn request(&self, request: &DisplayAdRequest, notices: DisplayNotices)
        -> Result<(), EngineError>;
}

/// Overlay the fallback promo renders into.
#[async_trait]
pub trait PromoOverlay: Send + Sync {
    /// Element hosting the display slot.
    fn container_id(&self) -> String;

    /// Slot path of the promo unit.
    fn slot_id(&self) -> Option<String>;

    fn show(&self);

    fn hide(&self);

    /// Resolves once the player skipped the promo or it completed.
    async fn closed(&self);
}

/// Builds a fresh [`PromoOverlay`] for each fallback run.
pub trait PromoFactory: Send + Sync + 'static {
    fn create(&self) -> Box<dyn PromoOverlay>;
}
