//! # Host game and ad container.
//!
//! [`Host`] receives the pause/resume callbacks the game registered at init time.
//! [`AdContainer`] is the on-screen element the video plays in; the session shows
//! it when the engine asks content to pause and hides it on resume or cancel.

/// Game callbacks. Both default to no-ops.
pub trait Host: Send + Sync + 'static {
    /// The game should pause (an ad is about to cover it).
    fn pause_game(&self) {}

    /// The game should resume.
    fn resume_game(&self) {}
}

/// Host without callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl Host for NoopHost {}

/// Visibility control of the ad container.
pub trait AdContainer: Send + Sync + 'static {
    fn show(&self);
    fn hide(&self);
}

/// Container that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopContainer;

impl AdContainer for NoopContainer {
    fn show(&self) {}
    fn hide(&self) {}
}
