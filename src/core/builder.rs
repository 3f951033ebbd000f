use std::sync::Arc;

use crate::{
    core::{
        config::SdkConfig,
        fallback::PromoFallback,
        orchestrator::AdOrchestrator,
        session::{AdSession, SessionParts},
    },
    events::EventBus,
    external::{
        AdContainer, AdEngine, BiddingNetwork, DisplayAdNetwork, Host, LocalStore, MemoryStore,
        NoBids, NoopContainer, NoopHost, PromoFactory,
    },
    policies::GameAdPolicy,
    resolver::TagResolver,
    subscribers::Subscribe,
};

/// Builder for wiring an [`AdOrchestrator`] to its collaborators.
///
/// Only the ad engine is required. Defaults: no bidders, an in-memory local
/// store, no-op container and host, no display network, no fallback promo and
/// the default [`GameAdPolicy`].
pub struct AdBreakBuilder {
    cfg: SdkConfig,
    engine: Arc<dyn AdEngine>,
    bidding: Arc<dyn BiddingNetwork>,
    store: Arc<dyn LocalStore>,
    container: Arc<dyn AdContainer>,
    host: Arc<dyn Host>,
    display: Option<Arc<dyn DisplayAdNetwork>>,
    promo: Option<Arc<dyn PromoFactory>>,
    policy: GameAdPolicy,
    subscribers: Vec<Arc<dyn Subscribe>>,
    bus: Option<EventBus>,
}

impl AdBreakBuilder {
    /// Creates a new builder with the given configuration and ad engine.
    pub fn new(cfg: SdkConfig, engine: Arc<dyn AdEngine>) -> Self {
        Self {
            cfg,
            engine,
            bidding: Arc::new(NoBids),
            store: Arc::new(MemoryStore::new()),
            container: Arc::new(NoopContainer),
            host: Arc::new(NoopHost),
            display: None,
            promo: None,
            policy: GameAdPolicy::default(),
            subscribers: Vec::new(),
            bus: None,
        }
    }

    /// Sets the header-bidding network.
    pub fn with_bidding(mut self, bidding: Arc<dyn BiddingNetwork>) -> Self {
        self.bidding = bidding;
        self
    }

    /// Sets the local store consulted for debug switches.
    pub fn with_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the element shown while a video ad plays.
    pub fn with_container(mut self, container: Arc<dyn AdContainer>) -> Self {
        self.container = container;
        self
    }

    /// Sets the game callbacks (pause/resume).
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Sets the display-ad network (display ads, cross-promo slot, fallback promo).
    pub fn with_display(mut self, display: Arc<dyn DisplayAdNetwork>) -> Self {
        self.display = Some(display);
        self
    }

    /// Enables the fallback promo with the given overlay factory.
    ///
    /// It only runs when the game policy triggers it for the failed ad type.
    pub fn with_promo(mut self, promo: Arc<dyn PromoFactory>) -> Self {
        self.promo = Some(promo);
        self
    }

    /// Sets the resolved game policy.
    pub fn with_policy(mut self, policy: GameAdPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets event subscribers.
    ///
    /// They are attached before the first fetch cycle starts, so they see every event.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses an existing bus instead of a fresh one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the orchestrator and spawns its ad session.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> AdOrchestrator {
        let bus = self.bus.unwrap_or_default();
        for sub in self.subscribers {
            tracing::debug!(subscriber = sub.name(), "attaching subscriber");
            bus.attach(sub);
        }

        let policy = self.policy.with_debug_overrides(&*self.store);
        let resolver = TagResolver::new(
            self.bidding,
            self.store,
            self.cfg.bid_timeout,
            self.cfg.bid_callback_grace,
        );
        let session = AdSession::spawn(
            self.cfg.clone(),
            bus.clone(),
            SessionParts {
                engine: self.engine,
                resolver,
                container: self.container,
                display: self.display.clone(),
                game: policy.game.clone(),
            },
        );
        let fallback = self.promo.map(|factory| {
            PromoFallback::new(
                bus.clone(),
                self.display.clone(),
                policy.display_ads_enabled,
                factory,
                self.cfg.promo_impression_timeout,
            )
        });

        AdOrchestrator::new(
            self.cfg,
            policy,
            bus,
            session,
            self.host,
            self.display,
            fallback,
        )
    }
}
