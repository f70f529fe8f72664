//! Astro Drift - A wrap-around asteroid-field arcade game
//!
//! Core modules:
//! - `sim`: Frame simulation (kinematics, collisions, spawning)
//! - `game`: Phase machine, lives/score/level, deferred actions
//! - `highscores`: Top-10 leaderboard
//! - `commentary`: Non-blocking narrative lines with canned fallbacks
//! - `persistence`: Key-value storage backends
//! - `platform`: Browser/native platform abstraction
//! - `settings`: Player-facing configuration

pub mod commentary;
pub mod game;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use game::{Game, GamePhase, HudSnapshot};
pub use highscores::HighScores;
pub use settings::{QualityPreset, Settings};

use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Game configuration constants
pub mod consts {
    /// Default field dimensions
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;
    /// Upper bound on a single frame's delta (stall protection)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Craft defaults
    pub const CRAFT_RADIUS: f32 = 10.0;
    pub const CRAFT_TURN_RATE: f32 = 3.5; // rad/s
    pub const CRAFT_THRUST: f32 = 300.0; // px/s²
    pub const CRAFT_MAX_SPEED: f32 = 400.0;
    pub const CRAFT_SPAWN_INVULNERABILITY: f32 = 3.0;
    pub const CRAFT_WEAPON_COOLDOWN: f32 = 0.25;
    /// Collision radius multipliers relative to the craft radius
    pub const CRAFT_PICKUP_SCALE: f32 = 1.5;
    pub const CRAFT_HIT_SCALE: f32 = 0.7;
    pub const CRAFT_SHIELD_SCALE: f32 = 2.0;
    pub const EXHAUST_CHANCE: f64 = 0.5;

    /// Primary fire
    pub const PROJECTILE_RADIUS: f32 = 2.0;
    pub const PROJECTILE_SPEED: f32 = 500.0;
    pub const PROJECTILE_LIFETIME: f32 = 1.0;
    /// Angular offset of the two extra multi-shot projectiles
    pub const MULTI_SHOT_SPREAD: f32 = 0.2;

    /// Secondary fire
    pub const HOMING_RADIUS: f32 = 4.0;
    pub const HOMING_SPEED: f32 = 300.0;
    pub const HOMING_LIFETIME: f32 = 3.0;
    pub const HOMING_TURN_RATE: f32 = 4.0; // rad/s
    pub const HOMING_TRAIL_CHANCE: f64 = 0.5;
    pub const HOMING_AMMO_PER_PICKUP: u32 = 3;

    /// Hostile unit
    pub const HOSTILE_RADIUS: f32 = 15.0;
    pub const HOSTILE_SPEED: f32 = 100.0;
    pub const HOSTILE_FIRE_INTERVAL: f32 = 1.5;
    pub const HOSTILE_ACCURACY: f32 = 0.2;
    pub const HOSTILE_MAX_VERTICAL_SPEED: f32 = 50.0;
    pub const HOSTILE_TURN_INTERVAL: (f32, f32) = (1.0, 3.0);
    pub const HOSTILE_SPAWN_DELAY: (f32, f32) = (15.0, 30.0);
    /// Fraction of field height the hostile may enter within (centered)
    pub const HOSTILE_ENTRY_BAND: f32 = 0.6;
    pub const HOSTILE_PROJECTILE_SPEED: f32 = 250.0;
    pub const HOSTILE_PROJECTILE_LIFETIME: f32 = 2.0;

    /// Obstacles
    pub const OBSTACLE_VERTICES: usize = 10;
    pub const OBSTACLE_JITTER: (f32, f32) = (0.7, 1.3);
    pub const OBSTACLE_SPEED_JITTER: (f32, f32) = (0.8, 1.2);
    pub const OBSTACLE_MAX_SPIN: f32 = 2.0;
    /// Half-size of the centered no-spawn square
    pub const SPAWN_EXCLUSION_HALF: f32 = 150.0;
    pub const BASE_OBSTACLE_COUNT: u32 = 4;

    /// Power-ups
    pub const POWER_UP_RADIUS: f32 = 10.0;
    pub const POWER_UP_DROP_CHANCE: f64 = 0.10;
    pub const POWER_UP_LIFETIME: f32 = 10.0;
    pub const POWER_UP_DRIFT: f32 = 30.0;
    pub const MULTI_SHOT_DURATION: f32 = 10.0;
    pub const SHIELD_DURATION: f32 = 8.0;
    pub const TIME_DILATION_DURATION: f32 = 6.0;
    /// Time scale applied to non-craft entities while dilation is active
    pub const TIME_DILATION_FACTOR: f32 = 0.3;

    /// Scoring
    pub const HOSTILE_SCORE: u32 = 500;
    pub const HOMING_OBSTACLE_SCORE: u32 = 50;

    /// Particles
    pub const PARTICLE_LIFE: (f32, f32) = (0.3, 0.9);
    pub const HOSTILE_BURST: usize = 30;
    pub const CRAFT_BURST: usize = 40;

    /// Game flow
    pub const STARTING_LIVES: u8 = 3;
    pub const RESPAWN_DELAY: f32 = 2.0;
    pub const LEVEL_TRANSITION_DELAY: f32 = 2.0;
    pub const GAME_OVER_DELAY: f32 = 3.0;
    pub const NOTIFICATION_DURATION: f32 = 2.0;
    pub const COMMENTARY_TIMEOUT: f32 = 4.0;
}

/// Normalize an angle to (-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Wrap a position onto the torus [0, width) x [0, height)
#[inline]
pub fn wrap_position(pos: Vec2, bounds: Vec2) -> Vec2 {
    Vec2::new(wrap_axis(pos.x, bounds.x), wrap_axis(pos.y, bounds.y))
}

#[inline]
fn wrap_axis(value: f32, extent: f32) -> f32 {
    if extent <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Circle-circle overlap (strict: touching circles do not collide)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}

/// Unit vector for a facing angle
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of the vector pointing from `from` to `to`
#[inline]
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Rotate `current` toward `target` by at most `max_step` radians
pub fn turn_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = normalize_angle(target - normalize_angle(current));
    let step = delta.clamp(-max_step, max_step);
    normalize_angle(current + step)
}
