//! # PromoFallback: the display-ad promo shown when video ads are exhausted.
//!
//! ```text
//! show_promo_display_ad()
//!   ├─ overlay = factory.create()
//!   ├─ drop stale "promo-display" scope
//!   ├─ scope.subscribe(DISPLAYAD_IMPRESSION | DISPLAYAD_ERROR) ──► channel
//!   ├─ display.request(overlay slot)
//!   │     └─ Err ──► hide, reject
//!   └─ first signal (bounded by promo_impression_timeout):
//!         impression ──► close scope, show, wait closed(), hide ──► Ok
//!         error      ──► close scope, hide ──► Err("No promo display ad")
//!         deadline   ──► close scope, hide ──► Err("No promo display ad")
//! ```
//!
//! The scope is closed exactly once on every path (explicitly or on drop).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{AdError, ConfigError};
use crate::events::{EventBus, EventKind};
use crate::external::{DisplayAdNetwork, DisplayAdRequest, DisplayNotices, PromoFactory};

/// Scope label of the promo listeners.
pub const PROMO_SCOPE: &str = "promo-display";

const MSG_NO_PROMO: &str = "No promo display ad";

enum PromoSignal {
    Impression,
    Error(String),
}

/// Runs the fallback promo for one `show_ad` call.
pub struct PromoFallback {
    bus: EventBus,
    display: Option<Arc<dyn DisplayAdNetwork>>,
    display_enabled: bool,
    factory: Arc<dyn PromoFactory>,
    impression_timeout: Duration,
}

impl PromoFallback {
    pub fn new(
        bus: EventBus,
        display: Option<Arc<dyn DisplayAdNetwork>>,
        display_enabled: bool,
        factory: Arc<dyn PromoFactory>,
        impression_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            display,
            display_enabled,
            factory,
            impression_timeout,
        }
    }

    /// Shows the promo. Resolves once the player dismisses it.
    pub async fn show_promo_display_ad(&self) -> Result<(), AdError> {
        let overlay = self.factory.create();
        let request = DisplayAdRequest {
            container_id: overlay.container_id(),
            slot_id: overlay.slot_id(),
            visible: true,
            ..DisplayAdRequest::default()
        };
        let slot = slot_label(&request);

        self.bus.unsubscribe_scope(PROMO_SCOPE);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scope = self.bus.scope(PROMO_SCOPE);
        {
            let tx = tx.clone();
            let slot = slot.clone();
            scope.subscribe(EventKind::DisplayAdImpression, move |ev| {
                if *ev.analytics.label == *slot {
                    let _ = tx.send(PromoSignal::Impression);
                }
            });
        }
        {
            let slot = slot.clone();
            scope.subscribe(EventKind::DisplayAdError, move |ev| {
                if *ev.analytics.label == *slot {
                    let _ = tx.send(PromoSignal::Error(ev.message.to_string()));
                }
            });
        }

        if let Err(e) = request_display_ad(
            &self.bus,
            self.display.as_deref(),
            self.display_enabled,
            &request,
        ) {
            overlay.hide();
            return Err(e);
        }

        let signal = tokio::time::timeout(self.impression_timeout, rx.recv()).await;
        scope.close();
        match signal {
            Ok(Some(PromoSignal::Impression)) => {
                overlay.show();
                overlay.closed().await;
                overlay.hide();
                Ok(())
            }
            Ok(Some(PromoSignal::Error(reason))) => {
                tracing::debug!(reason = %reason, "promo display ad failed");
                overlay.hide();
                Err(no_promo())
            }
            Ok(None) | Err(_) => {
                tracing::debug!(timeout = ?self.impression_timeout, "promo display ad never rendered");
                overlay.hide();
                Err(no_promo())
            }
        }
    }
}

/// Requests a display ad, answering through bus events labelled with the slot.
pub(crate) fn request_display_ad(
    bus: &EventBus,
    display: Option<&dyn DisplayAdNetwork>,
    enabled: bool,
    request: &DisplayAdRequest,
) -> Result<(), AdError> {
    if !enabled {
        return Err(ConfigError::DisplayAdsDisabled.into());
    }
    let Some(display) = display else {
        return Err(AdError::Engine {
            reason: "no display-ad network configured".to_string(),
        });
    };
    let notices = DisplayNotices::new(bus.clone(), slot_label(request));
    display
        .request(request, notices)
        .map_err(|e| AdError::Engine {
            reason: e.to_string(),
        })
}

fn slot_label(request: &DisplayAdRequest) -> Arc<str> {
    Arc::from(request.slot_id.as_deref().unwrap_or(&request.container_id))
}

fn no_promo() -> AdError {
    AdError::FallbackExhausted {
        reason: MSG_NO_PROMO.to_string(),
    }
}
