//! # Example: simulated_break
//!
//! Runs a few ad breaks against a simulated ad engine.
//!
//! Shows how to:
//! - Implement [`AdEngine`] and report notices through [`EngineSink`].
//! - Implement [`Host`] to pause/resume the game.
//! - Resolve a [`GameAdPolicy`] from the game document.
//! - Wire everything with [`AdBreakBuilder`] and mirror events into `tracing` with [`LogWriter`].
//!
//! ## Flow
//! ```text
//! show_ad(Interstitial) ──► session.start_ad ──► SimEngine.start()
//!     └─► CONTENT_PAUSE_REQUESTED ─► LOADED ─► STARTED ─► quartiles ─► COMPLETE
//!         ─► CONTENT_RESUME_REQUESTED ─► AD_SUCCESS ─► host.resume_game()
//! show_ad(Interstitial) again ──► Throttled (midroll cooldown)
//! show_ad(Rewarded)          ──► played, reward granted
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=adbreak=debug cargo run --example simulated_break --features logging
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use adbreak::{
    AdBreakBuilder, AdEngine, AdError, AdType, AdsRequest, EngineError, EngineNotice, EngineSink,
    GameAdPolicy, Host, LogWriter, SdkConfig, Subscribe,
};

/// Engine that plays a 3 second creative for every request.
#[derive(Default)]
struct SimEngine {
    sink: Mutex<Option<EngineSink>>,
}

impl AdEngine for SimEngine {
    fn request_ads(&self, request: &AdsRequest, sink: EngineSink) -> Result<(), EngineError> {
        println!("[engine] ads requested ({}x{})", request.width, request.height);
        *self.sink.lock().unwrap() = Some(sink.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            sink.notify(EngineNotice::LoaderReady);
            tokio::time::sleep(Duration::from_millis(200)).await;
            sink.notify(EngineNotice::ManagerReady);
        });
        Ok(())
    }

    fn initialize(&self, _width: u32, _height: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn start(&self) -> Result<(), EngineError> {
        let Some(sink) = self.sink.lock().unwrap().clone() else {
            return Err(EngineError::MissingManager);
        };
        tokio::spawn(async move {
            sink.notify(EngineNotice::ContentPauseRequested);
            sink.notify(EngineNotice::Loaded {
                content_type: "video/mp4".into(),
            });
            tokio::time::sleep(Duration::from_millis(400)).await;
            sink.notify(EngineNotice::Started);
            sink.notify(EngineNotice::Impression);
            for quartile in [
                EngineNotice::FirstQuartile,
                EngineNotice::Midpoint,
                EngineNotice::ThirdQuartile,
                EngineNotice::Complete,
            ] {
                tokio::time::sleep(Duration::from_millis(750)).await;
                sink.notify(quartile);
            }
            sink.notify(EngineNotice::AllAdsCompleted);
            sink.notify(EngineNotice::ContentResumeRequested);
        });
        Ok(())
    }

    fn resize(&self, width: u32, height: u32) {
        println!("[engine] resized to {width}x{height}");
    }

    fn destroy(&self) {
        self.sink.lock().unwrap().take();
    }

    fn content_complete(&self) {}
}

struct Game;

impl Host for Game {
    fn pause_game(&self) {
        println!("[game] paused");
    }

    fn resume_game(&self) {
        println!("[game] resumed");
    }
}

const GAME: &str = r#"{
    "gameId": "49258a0e497c42b5b5d87887f24d27a6",
    "title": "Jewel Burst",
    "midroll": 120000,
    "rewardedAds": true,
    "tags": [{"title": "Match3"}],
    "category": "Puzzle",
    "sdk": {"enabled": true, "retry_on_failure": true}
}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let policy = GameAdPolicy::from_json(GAME)?;
    let cfg = SdkConfig {
        game_id: policy.game.id.clone(),
        ..SdkConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let ads = AdBreakBuilder::new(cfg, Arc::new(SimEngine::default()))
        .with_host(Arc::new(Game))
        .with_policy(policy)
        .with_subscribers(subs)
        .build();

    println!("ready: {}", ads.preload_ad(AdType::Interstitial).await?);

    let msg = ads.show_ad(AdType::Interstitial).await?;
    println!("preroll: {msg}");

    match ads.show_ad(AdType::Interstitial).await {
        Err(AdError::Throttled { remaining }) => println!("midroll throttled, {remaining:?} left"),
        other => println!("midroll: {other:?}"),
    }

    match ads.show_ad(AdType::Rewarded).await {
        Ok(_) => println!("reward granted"),
        Err(e) => println!("no reward: {e} ({})", e.as_label()),
    }

    let snapshot = ads.session().snapshot().await?;
    println!("session: {snapshot:?}");
    Ok(())
}
