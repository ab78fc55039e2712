//! Coin Pusher entry point
//!
//! Native builds run a headless session on a simulated clock and log the
//! event stream. The web build exports a small handle the page drives from
//! its animation frame callback.

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::prelude::*;

    use coin_pusher::GameEngine;
    use coin_pusher::config::EngineConfig;
    use coin_pusher::persistence::LocalStorage;
    use coin_pusher::platform::time::SystemClock;
    use coin_pusher::tuning::CoinSize;

    const SAVE_KEY: &str = "coin_pusher_save";

    #[wasm_bindgen(start)]
    pub fn wasm_main() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialized".into());
        }
        log::info!("Coin Pusher starting...");
    }

    /// Engine handle owned by the page
    #[wasm_bindgen]
    pub struct WebGame {
        engine: GameEngine,
    }

    #[wasm_bindgen]
    impl WebGame {
        #[wasm_bindgen(constructor)]
        pub fn new(seed: u32) -> WebGame {
            let config = EngineConfig {
                seed: u64::from(seed),
                ..Default::default()
            };
            let engine = GameEngine::new(
                config,
                Box::new(SystemClock),
                Box::new(LocalStorage::new(SAVE_KEY)),
            );
            WebGame { engine }
        }

        pub fn start(&mut self) {
            self.engine.start();
        }

        pub fn stop(&mut self) {
            self.engine.stop();
        }

        pub fn frame(&mut self) {
            self.engine.frame();
        }

        /// Snapshot of the table as JSON for the renderer
        pub fn snapshot_json(&self) -> String {
            serde_json::to_string(&self.engine.snapshot()).unwrap_or_default()
        }

        pub fn pointer_move(&mut self, screen_x: f32, screen_y: f32) {
            let x = self.engine.screen_to_world_x(screen_x, screen_y);
            self.engine.set_drop_x(x);
        }

        pub fn drop_coin(&mut self) -> bool {
            self.engine.drop_coin(false)
        }

        pub fn set_large_coins(&mut self, large: bool) {
            self.engine
                .set_coin_size(if large { CoinSize::Large } else { CoinSize::Small });
        }

        pub fn set_auto_drop(&mut self, interval_ms: f64) {
            self.engine
                .set_auto_drop((interval_ms > 0.0).then_some(interval_ms));
        }

        pub fn claim_daily_spin(&mut self) -> bool {
            self.engine.claim_daily_spin().is_some()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use coin_pusher::GameEngine;
    use coin_pusher::config::EngineConfig;
    use coin_pusher::persistence::{FileStorage, MemoryStorage, StorageBackend};
    use coin_pusher::platform::time::{Clock, ManualClock, SystemClock};

    /// Simulated session length
    const SESSION_MS: f64 = 60_000.0;
    const FRAME_MS: f64 = 16.0;

    env_logger::init();
    log::info!("Coin Pusher (native) starting...");

    // Usage: coin-pusher [config.toml] [save.json]
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Bad config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    let storage: Box<dyn StorageBackend> = match args.next() {
        Some(path) => Box::new(FileStorage::new(path)),
        None => Box::new(MemoryStorage::new()),
    };

    let clock = ManualClock::new(SystemClock.now_ms());
    let mut engine = GameEngine::new(config, Box::new(clock.clone()), storage);
    engine.bus_mut().subscribe_all(|event| match serde_json::to_string(event) {
        Ok(json) => log::info!("[{}] {}", event.topic().as_str(), json),
        Err(e) => log::warn!("[{}] unserializable: {}", event.topic().as_str(), e),
    });

    if let Some(reward) = engine.claim_daily_spin() {
        log::info!("Daily spin: {:?}", reward);
    }

    engine.start();
    engine.set_auto_drop(Some(300.0));

    let mut elapsed = 0.0;
    while elapsed < SESSION_MS {
        clock.advance(FRAME_MS);
        elapsed += FRAME_MS;
        // Sweep the drop point back and forth across the table
        let phase = (elapsed / 4_000.0 * std::f64::consts::TAU).sin() as f32;
        engine.set_drop_x(phase * engine.config().drop_range);
        engine.frame();
    }

    let score = engine.session_score();
    let level = engine.level();
    let wallet = engine.wallet();
    let coins = engine.coins().len();
    engine.stop();

    println!("Session over: score {score}, level {level}, wallet {wallet}, {coins} coins on the table");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The wasm entry point is `web::wasm_main`
}
