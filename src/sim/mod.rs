//! Frame simulation module
//!
//! All gameplay logic lives here. This module must stay free of rendering,
//! storage, and platform dependencies:
//! - Variable timestep, clamped by the caller and again by `tick`
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - Mark-then-purge removal, once per step

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{apply_power_up, resolve_collisions};
pub use spawn::{
    emit_burst, maybe_spawn_power_up, spawn_craft, spawn_hostile_unit, spawn_obstacle,
    spawn_obstacle_field,
};
pub use state::{
    ActiveEffects, Body, Craft, GameEvent, HomingProjectile, HostileUnit, Obstacle, ObstacleSize,
    Owner, Particle, PowerUp, PowerUpKind, Projectile, SimRng, TimedEffect, World,
};
pub use tick::{PlayerIntent, advance_particles, clamp_dt, step, tick};
