//! Game flow: phases, lives, score, level progression
//!
//! `Game` owns the simulation world and everything around it. The host
//! calls `frame` once per rendered frame with the sampled intent and the
//! wall-clock delta; renderers read `world()` and `hud()`.
//!
//! Delays (respawn, level transition, game-over hold) are deferred actions
//! tagged with the run that scheduled them. An action from a finished run,
//! or one whose phase has already moved on, does nothing.

use serde::{Deserialize, Serialize};

use crate::commentary::{CommentaryCue, CommentaryDesk, Commentator};
use crate::consts::*;
use crate::highscores::HighScores;
use crate::persistence::Storage;
use crate::platform;
use crate::settings::Settings;
use crate::sim::{
    GameEvent, PlayerIntent, World, advance_particles, clamp_dt, spawn_craft,
    spawn_obstacle_field, step,
};

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GamePhase {
    /// Title screen, waiting for start
    #[default]
    Menu,
    /// Short pause while a new field is laid out
    LevelTransition,
    /// Active gameplay
    Playing,
    /// Run ended, holding before the leaderboard
    GameOver,
    /// Waiting for the player's initials
    EnterInitials,
    /// Leaderboard display
    HighScores,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Menu => "Menu",
            GamePhase::LevelTransition => "LevelTransition",
            GamePhase::Playing => "Playing",
            GamePhase::GameOver => "GameOver",
            GamePhase::EnterInitials => "EnterInitials",
            GamePhase::HighScores => "HighScores",
        }
    }

    /// Phases in which the world is simulated and the craft can die
    pub fn is_active(&self) -> bool {
        matches!(self, GamePhase::LevelTransition | GamePhase::Playing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    RespawnCraft,
    FinishTransition,
    LeaveGameOver,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    action: Deferred,
    run: u64,
    remaining: f32,
}

#[derive(Debug, Clone)]
struct Notification {
    text: String,
    remaining: f32,
}

/// Everything a HUD needs, in one serializable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub lives: u8,
    pub level: u32,
    pub phase: GamePhase,
    /// Seconds until the current phase moves on by itself
    pub countdown: Option<f32>,
    pub notification: Option<String>,
    pub commentary: String,
    pub top_score: Option<u64>,
    pub homing_ammo: u32,
}

/// A full game session
pub struct Game {
    settings: Settings,
    world: World,
    phase: GamePhase,
    score: u64,
    lives: u8,
    level: u32,
    /// Incremented on every fresh start
    run: u64,
    schedule: Vec<Scheduled>,
    high_scores: HighScores,
    storage: Box<dyn Storage>,
    commentary: CommentaryDesk,
    notification: Option<Notification>,
    prev_start: bool,
    last_rank: Option<usize>,
}

impl Game {
    /// Create a game in the menu, loading the leaderboard from `storage`
    pub fn new(settings: Settings, storage: Box<dyn Storage>, commentator: Box<dyn Commentator>) -> Self {
        let high_scores = HighScores::load(storage.as_ref());
        let mut world = World::new(settings.bounds(), settings.seed.unwrap_or(0));
        configure_world(&mut world, &settings);
        Self {
            settings,
            world,
            phase: GamePhase::Menu,
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            run: 0,
            schedule: Vec::new(),
            high_scores,
            storage,
            commentary: CommentaryDesk::new(commentator),
            notification: None,
            prev_start: false,
            last_rank: None,
        }
    }

    /// Advance one rendered frame
    pub fn frame(&mut self, intent: &PlayerIntent, elapsed: f32) {
        let dt = clamp_dt(elapsed, self.settings.max_frame_dt);
        let start_pressed = intent.start && !self.prev_start;
        self.prev_start = intent.start;

        match self.phase {
            GamePhase::Menu => {
                if start_pressed {
                    self.start_run();
                }
                self.idle_world(dt);
            }
            GamePhase::HighScores => {
                if start_pressed {
                    self.start_run();
                } else if intent.back {
                    self.set_phase(GamePhase::Menu);
                }
                self.idle_world(dt);
            }
            GamePhase::LevelTransition | GamePhase::Playing => {
                step(&mut self.world, intent, dt);
                self.handle_events();
                if self.phase == GamePhase::Playing && self.field_cleared() {
                    self.level_cleared();
                }
            }
            GamePhase::GameOver | GamePhase::EnterInitials => self.idle_world(dt),
        }

        self.run_schedule(dt);
        self.commentary.update(dt);

        if let Some(note) = self.notification.as_mut() {
            note.remaining -= dt;
            if note.remaining <= 0.0 {
                self.notification = None;
            }
        }
    }

    /// Record the finished run under `initials`; returns the rank achieved
    pub fn submit_initials(&mut self, initials: &str) -> Option<usize> {
        if self.phase != GamePhase::EnterInitials {
            log::warn!("Initials submitted outside EnterInitials ({})", self.phase.as_str());
            return None;
        }
        let rank = self.high_scores.add_score(initials, self.score, platform::now_ms());
        if let Some(rank) = rank {
            log::info!("Score {} entered at rank {}", self.score, rank);
            self.high_scores.save(self.storage.as_mut());
        }
        self.last_rank = rank;
        self.set_phase(GamePhase::HighScores);
        rank
    }

    /// Replace the settings, persist them, and apply what can change mid-run
    pub fn apply_settings(&mut self, settings: Settings) {
        settings.save(self.storage.as_mut());
        configure_world(&mut self.world, &settings);
        self.world.particles.truncate(self.world.max_particles);
        self.settings = settings;
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    /// Rank of the last submitted score, if it made the board
    pub fn last_rank(&self) -> Option<usize> {
        self.last_rank
    }

    pub fn commentary(&self) -> &str {
        self.commentary.line()
    }

    /// Snapshot for HUD rendering
    pub fn hud(&self) -> HudSnapshot {
        let countdown_for = match self.phase {
            GamePhase::LevelTransition => Some(Deferred::FinishTransition),
            GamePhase::GameOver => Some(Deferred::LeaveGameOver),
            GamePhase::Playing if self.world.craft.is_none() => Some(Deferred::RespawnCraft),
            _ => None,
        };
        let countdown = countdown_for.and_then(|action| {
            self.schedule
                .iter()
                .find(|s| s.action == action && s.run == self.run)
                .map(|s| s.remaining.max(0.0))
        });

        HudSnapshot {
            score: self.score,
            lives: self.lives,
            level: self.level,
            phase: self.phase,
            countdown,
            notification: self.notification.as_ref().map(|n| n.text.clone()),
            commentary: self.commentary.line().to_string(),
            top_score: self.high_scores.top_score(),
            homing_ammo: self
                .world
                .craft
                .as_ref()
                .map(|c| c.effects.homing_ammo)
                .unwrap_or(0),
        }
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            log::info!("Phase {} -> {}", self.phase.as_str(), phase.as_str());
            self.phase = phase;
        }
    }

    /// Particles keep fading outside of active play
    fn idle_world(&mut self, dt: f32) {
        advance_particles(&mut self.world, dt);
        self.world.purge_dead();
    }

    fn run_seed(&self) -> u64 {
        match self.settings.seed {
            Some(seed) => seed.wrapping_add(self.run),
            None => (platform::now_ms() as u64) ^ self.run.rotate_left(32),
        }
    }

    /// Fresh game: reset counters, build a new world, enter the first level
    fn start_run(&mut self) {
        self.run += 1;
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.last_rank = None;
        self.notification = None;
        self.schedule.clear();

        let seed = self.run_seed();
        self.world = World::new(self.settings.bounds(), seed);
        configure_world(&mut self.world, &self.settings);
        spawn_craft(&mut self.world);
        log::info!("Run {} started (seed {})", self.run, seed);

        self.commentary.announce(CommentaryCue::Start, None);
        self.enter_level_transition();
    }

    fn enter_level_transition(&mut self) {
        self.world.clear_for_level();
        spawn_obstacle_field(&mut self.world, BASE_OBSTACLE_COUNT, self.level - 1);
        if let Some(craft) = self.world.craft.as_mut() {
            craft.invulnerable = CRAFT_SPAWN_INVULNERABILITY;
        }
        self.set_phase(GamePhase::LevelTransition);
        self.defer(Deferred::FinishTransition, LEVEL_TRANSITION_DELAY);
    }

    /// A level ends once no obstacle and no hostile unit is left (checked after the purge)
    fn field_cleared(&self) -> bool {
        self.world.obstacles.is_empty() && self.world.hostile.is_none()
    }

    fn level_cleared(&mut self) {
        log::info!("Level {} cleared with score {}", self.level, self.score);
        self.level += 1;
        self.commentary.announce(CommentaryCue::LevelClear, Some(self.score));
        self.enter_level_transition();
    }

    fn enter_game_over(&mut self) {
        log::info!("Game over: score {}, level {}", self.score, self.level);
        self.set_phase(GamePhase::GameOver);
        self.commentary.announce(CommentaryCue::GameOver, Some(self.score));
        self.defer(Deferred::LeaveGameOver, GAME_OVER_DELAY);
    }

    fn defer(&mut self, action: Deferred, delay: f32) {
        self.schedule.push(Scheduled {
            action,
            run: self.run,
            remaining: delay,
        });
    }

    fn handle_events(&mut self) {
        for event in self.world.drain_events() {
            match event {
                GameEvent::Scored(points) => {
                    self.score = self.score.saturating_add(u64::from(points));
                }
                GameEvent::CraftDestroyed { .. } => self.on_craft_destroyed(),
                GameEvent::PowerUpCollected(kind) => self.notify(kind.label()),
                GameEvent::HostileArrived => log::debug!("Hostile unit arrived"),
                other => log::trace!("{:?}", other),
            }
        }
    }

    fn on_craft_destroyed(&mut self) {
        if !self.phase.is_active() {
            return;
        }
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.enter_game_over();
        } else {
            log::info!("Craft lost, {} lives left", self.lives);
            self.defer(Deferred::RespawnCraft, RESPAWN_DELAY);
        }
    }

    fn notify(&mut self, text: &str) {
        self.notification = Some(Notification {
            text: text.to_string(),
            remaining: NOTIFICATION_DURATION,
        });
    }

    fn run_schedule(&mut self, dt: f32) {
        if self.schedule.is_empty() {
            return;
        }
        for entry in &mut self.schedule {
            entry.remaining -= dt;
        }
        let (due, waiting): (Vec<Scheduled>, Vec<Scheduled>) =
            self.schedule.drain(..).partition(|s| s.remaining <= 0.0);
        self.schedule = waiting;

        for entry in due {
            if entry.run != self.run {
                log::debug!("Dropping {:?} from run {}", entry.action, entry.run);
                continue;
            }
            self.perform(entry.action);
        }
    }

    fn perform(&mut self, action: Deferred) {
        match action {
            Deferred::RespawnCraft => {
                if self.phase.is_active() && self.lives > 0 && self.world.craft.is_none() {
                    spawn_craft(&mut self.world);
                    log::info!("Craft respawned");
                } else {
                    log::debug!("Respawn skipped in {}", self.phase.as_str());
                }
            }
            Deferred::FinishTransition => {
                if self.phase == GamePhase::LevelTransition {
                    self.set_phase(GamePhase::Playing);
                }
            }
            Deferred::LeaveGameOver => {
                if self.phase == GamePhase::GameOver {
                    let next = if self.high_scores.qualifies(self.score) {
                        GamePhase::EnterInitials
                    } else {
                        GamePhase::HighScores
                    };
                    self.set_phase(next);
                }
            }
        }
    }
}

/// Copy the settings the simulation reads on every step
fn configure_world(world: &mut World, settings: &Settings) {
    world.max_particles = settings.max_particles();
    world.max_frame_dt = settings.max_frame_dt;
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .field("level", &self.level)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}
