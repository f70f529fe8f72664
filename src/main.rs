//! Astro Drift entry point
//!
//! Native: headless driver that flies a scripted autopilot and prints the
//! final HUD as JSON. Web: exposes a `WebGame` handle for a JS host that
//! owns the canvas and input.

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use wasm_bindgen::prelude::*;

    use astro_drift::Game;
    use astro_drift::commentary::OfflineCommentator;
    use astro_drift::persistence::LocalStorage;
    use astro_drift::settings::Settings;
    use astro_drift::sim::PlayerIntent;

    /// Game handle driven from the page's animation frame
    #[wasm_bindgen]
    pub struct WebGame {
        game: Game,
    }

    #[wasm_bindgen]
    impl WebGame {
        #[wasm_bindgen(constructor)]
        pub fn new() -> WebGame {
            let storage = LocalStorage::new();
            let settings = Settings::load(&storage);
            log::info!("Astro Drift (web) quality={}", settings.quality.as_str());
            WebGame {
                game: Game::new(settings, Box::new(storage), Box::new(OfflineCommentator::new())),
            }
        }

        /// Advance one frame; `elapsed` in seconds
        #[allow(clippy::too_many_arguments)]
        pub fn frame(
            &mut self,
            turn_left: bool,
            turn_right: bool,
            thrust: bool,
            fire_primary: bool,
            fire_secondary: bool,
            start: bool,
            back: bool,
            elapsed: f32,
        ) {
            let intent = PlayerIntent {
                turn_left,
                turn_right,
                thrust,
                fire_primary,
                fire_secondary,
                start,
                back,
            };
            self.game.frame(&intent, elapsed);
        }

        pub fn submit_initials(&mut self, initials: &str) -> Option<u32> {
            self.game.submit_initials(initials).map(|rank| rank as u32)
        }

        pub fn hud_json(&self) -> String {
            serde_json::to_string(&self.game.hud()).unwrap_or_default()
        }

        pub fn world_json(&self) -> String {
            serde_json::to_string(self.game.world()).unwrap_or_default()
        }

        pub fn high_scores_json(&self) -> String {
            serde_json::to_string(self.game.high_scores()).unwrap_or_default()
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_main() {
    astro_drift::platform::init_logging();
    log::info!("Astro Drift (web) starting...");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use astro_drift::commentary::ThreadedCommentator;
    use astro_drift::persistence::FileStorage;
    use astro_drift::{Game, GamePhase, Settings, platform};

    const DEFAULT_FRAMES: u32 = 3600;
    const FRAME_DT: f32 = 1.0 / 60.0;

    platform::init_logging();

    let mut args = std::env::args().skip(1);
    let frames = match args.next().map(|a| a.parse::<u32>()) {
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            log::warn!("Bad frame count ({e}), using {DEFAULT_FRAMES}");
            DEFAULT_FRAMES
        }
        None => DEFAULT_FRAMES,
    };
    let initials = args.next().unwrap_or_else(|| "BOT".to_string());

    let data_dir = std::env::var("ASTRO_DRIFT_DATA").unwrap_or_else(|_| ".astro-drift".to_string());
    let storage = FileStorage::new(&data_dir);
    let settings = Settings::load(&storage);
    log::info!(
        "Astro Drift (headless) starting: {} frames, data in {}",
        frames,
        storage.dir().display()
    );

    let commentator = ThreadedCommentator::new(narrator::line);
    let mut game = Game::new(settings, Box::new(storage), Box::new(commentator));

    for frame in 0..frames {
        let intent = autopilot::intent(&game, frame);
        game.frame(&intent, FRAME_DT);

        match game.phase() {
            GamePhase::EnterInitials => {
                game.submit_initials(&initials);
            }
            GamePhase::HighScores => {
                log::info!("Run finished after {} frames", frame + 1);
                break;
            }
            _ => {}
        }
    }

    match serde_json::to_string_pretty(&game.hud()) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Could not encode HUD: {e}"),
    }
}

/// Local stand-in for a text generator: picks a line from the score
#[cfg(not(target_arch = "wasm32"))]
mod narrator {
    use astro_drift::commentary::{CommentaryCue, CommentaryError};

    pub fn line(cue: CommentaryCue, score: Option<u64>) -> Result<String, CommentaryError> {
        let score = score.unwrap_or(0);
        let text = match cue {
            CommentaryCue::Start => "Drift engaged. Rocks ahead.".to_string(),
            CommentaryCue::LevelClear if score >= 5_000 => {
                format!("{score} points and still climbing. Next sector.")
            }
            CommentaryCue::LevelClear => format!("Sector swept at {score}. Keep moving."),
            CommentaryCue::GameOver if score == 0 => return Err(CommentaryError::Empty),
            CommentaryCue::GameOver => format!("Run over at {score}. The belt remembers."),
        };
        Ok(text)
    }

}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use astro_drift::sim::PlayerIntent;
    use astro_drift::{Game, GamePhase, bearing, normalize_angle};

    /// Aim-and-shoot pilot: face the nearest obstacle (or the hostile
    /// unit when present), fire constantly, thrust away from close calls
    pub fn intent(game: &Game, frame: u32) -> PlayerIntent {
        let mut intent = PlayerIntent {
            // Tap start on the first frame only
            start: frame == 0 && game.phase() == GamePhase::Menu,
            ..PlayerIntent::default()
        };

        let world = game.world();
        let Some(craft) = world.live_craft() else {
            return intent;
        };

        let pos = craft.body.pos;
        let target = world
            .live_hostile()
            .map(|h| h.body.pos)
            .or_else(|| {
                world
                    .obstacles
                    .iter()
                    .map(|o| o.body.pos)
                    .min_by(|a, b| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)))
            });

        if let Some(target) = target {
            let diff = normalize_angle(bearing(pos, target) - craft.body.angle);
            intent.turn_left = diff < -0.05;
            intent.turn_right = diff > 0.05;
            intent.fire_primary = diff.abs() < 0.3;
            // Toggle so each press is a fresh edge
            intent.fire_secondary = world.live_hostile().is_some() && frame % 20 == 0;
            intent.thrust = target.distance(pos) > 250.0 && frame % 3 == 0;
        }
        intent
    }
}
