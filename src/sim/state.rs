//! Entity records and the world that owns them
//!
//! Entities are plain data. Each kind lives in its own spawn-ordered `Vec`
//! (the craft and hostile unit in `Option` slots); removal is deferred by
//! flagging `dead` and purging once per step.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{heading, normalize_angle, wrap_position};

/// Shape shared by every entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle (radians, normalized to (-π, π])
    pub angle: f32,
    pub radius: f32,
    /// Marked for removal at the end of the current step
    pub dead: bool,
}

impl Body {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, angle: f32, radius: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            angle: normalize_angle(angle),
            radius,
            dead: false,
        }
    }

    /// Move by velocity * dt and wrap onto the field
    #[inline]
    pub fn integrate(&mut self, dt: f32, bounds: Vec2) {
        self.pos = wrap_position(self.pos + self.vel * dt, bounds);
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

/// Power-up effects that run on a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimedEffect {
    MultiShot,
    Shield,
    TimeDilation,
}

impl TimedEffect {
    pub const ALL: [TimedEffect; 3] = [
        TimedEffect::MultiShot,
        TimedEffect::Shield,
        TimedEffect::TimeDilation,
    ];

    /// Seconds granted per pickup
    pub fn duration(self) -> f32 {
        match self {
            TimedEffect::MultiShot => MULTI_SHOT_DURATION,
            TimedEffect::Shield => SHIELD_DURATION,
            TimedEffect::TimeDilation => TIME_DILATION_DURATION,
        }
    }

    fn slot(self) -> usize {
        match self {
            TimedEffect::MultiShot => 0,
            TimedEffect::Shield => 1,
            TimedEffect::TimeDilation => 2,
        }
    }
}

/// Active power-up effects on the craft
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    remaining: [f32; 3],
    /// Homing ammo is a count, not a timer
    pub homing_ammo: u32,
}

impl ActiveEffects {
    pub fn remaining(&self, effect: TimedEffect) -> f32 {
        self.remaining[effect.slot()]
    }

    pub fn is_active(&self, effect: TimedEffect) -> bool {
        self.remaining(effect) > 0.0
    }

    /// Start (or restart) an effect at its full duration
    pub fn grant(&mut self, effect: TimedEffect) {
        self.remaining[effect.slot()] = effect.duration();
    }

    pub fn set_remaining(&mut self, effect: TimedEffect, seconds: f32) {
        self.remaining[effect.slot()] = seconds.max(0.0);
    }

    /// Decay every running effect by `dt`; returns the effects that ran out
    pub fn decay(&mut self, dt: f32) -> Vec<TimedEffect> {
        let mut expired = Vec::new();
        for effect in TimedEffect::ALL {
            let slot = &mut self.remaining[effect.slot()];
            if *slot > 0.0 {
                *slot = (*slot - dt).max(0.0);
                if *slot == 0.0 {
                    expired.push(effect);
                }
            }
        }
        expired
    }
}

/// The player's craft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Craft {
    pub body: Body,
    pub turn_rate: f32,
    pub thrusting: bool,
    /// Seconds of contact immunity left
    pub invulnerable: f32,
    pub weapon_cooldown: f32,
    pub effects: ActiveEffects,
    /// Secondary fire is edge-triggered
    #[serde(default)]
    pub secondary_latch: bool,
}

impl Craft {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self {
            body: Body::new(
                id,
                pos,
                Vec2::ZERO,
                -std::f32::consts::FRAC_PI_2, // Nose up
                CRAFT_RADIUS,
            ),
            turn_rate: CRAFT_TURN_RATE,
            thrusting: false,
            invulnerable: CRAFT_SPAWN_INVULNERABILITY,
            weapon_cooldown: 0.0,
            effects: ActiveEffects::default(),
            secondary_latch: false,
        }
    }

    /// Point just ahead of the hull along the facing angle
    pub fn nose(&self) -> Vec2 {
        self.body.pos + heading(self.body.angle) * self.body.radius
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable > 0.0
    }

    pub fn is_shielded(&self) -> bool {
        self.effects.is_active(TimedEffect::Shield)
    }
}

/// Obstacle size classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleSize {
    Large,
    Medium,
    Small,
}

impl ObstacleSize {
    pub fn radius(self) -> f32 {
        match self {
            ObstacleSize::Large => 40.0,
            ObstacleSize::Medium => 20.0,
            ObstacleSize::Small => 10.0,
        }
    }

    /// Points for a primary-fire kill
    pub fn score(self) -> u32 {
        match self {
            ObstacleSize::Large => 20,
            ObstacleSize::Medium => 50,
            ObstacleSize::Small => 100,
        }
    }

    pub fn base_speed(self) -> f32 {
        match self {
            ObstacleSize::Large => 40.0,
            ObstacleSize::Medium => 65.0,
            ObstacleSize::Small => 90.0,
        }
    }

    /// Class of the children left behind, if any
    pub fn split(self) -> Option<ObstacleSize> {
        match self {
            ObstacleSize::Large => Some(ObstacleSize::Medium),
            ObstacleSize::Medium => Some(ObstacleSize::Small),
            ObstacleSize::Small => None,
        }
    }

    pub fn split_count(self) -> usize {
        if self.split().is_some() { 2 } else { 0 }
    }

    /// Explosion particle count
    pub fn burst_size(self) -> usize {
        match self {
            ObstacleSize::Large => 20,
            ObstacleSize::Medium => 12,
            ObstacleSize::Small => 6,
        }
    }
}

/// A drifting obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub body: Body,
    pub size: ObstacleSize,
    /// Render outline relative to the center (never used for collision)
    pub outline: Vec<Vec2>,
    /// Spin rate in radians/sec
    pub spin: f32,
}

/// The roaming hostile unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostileUnit {
    pub body: Body,
    /// Seconds until the next vertical course change
    pub direction_timer: f32,
    pub fire_cooldown: f32,
    /// Max random aim error in radians
    pub accuracy: f32,
}

/// Who fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Craft,
    Hostile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub body: Body,
    pub lifetime: f32,
    pub owner: Owner,
}

/// Craft-fired projectile that steers toward the hostile unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomingProjectile {
    pub body: Body,
    pub lifetime: f32,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    MultiShot,
    Shield,
    TimeDilation,
    HomingAmmo,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::MultiShot,
        PowerUpKind::Shield,
        PowerUpKind::TimeDilation,
        PowerUpKind::HomingAmmo,
    ];

    /// Timed effect granted on pickup (`None` for ammo)
    pub fn effect(self) -> Option<TimedEffect> {
        match self {
            PowerUpKind::MultiShot => Some(TimedEffect::MultiShot),
            PowerUpKind::Shield => Some(TimedEffect::Shield),
            PowerUpKind::TimeDilation => Some(TimedEffect::TimeDilation),
            PowerUpKind::HomingAmmo => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::MultiShot => "MULTI-SHOT",
            PowerUpKind::Shield => "SHIELD",
            PowerUpKind::TimeDilation => "TIME WARP",
            PowerUpKind::HomingAmmo => "HOMING MISSILES",
        }
    }
}

/// A collectible power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub body: Body,
    pub kind: PowerUpKind,
    pub lifetime: f32,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub body: Body,
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Opacity for fade-out (1 = fresh, 0 = gone)
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

/// Things that happened during a step, drained by the game each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Scored(u32),
    ObstacleDestroyed { size: ObstacleSize, pos: Vec2, split: bool },
    HostileArrived,
    HostileEscaped,
    HostileDestroyed { pos: Vec2 },
    PowerUpDropped(PowerUpKind),
    PowerUpCollected(PowerUpKind),
    EffectExpired(TimedEffect),
    CraftDestroyed { pos: Vec2 },
}

/// Seedable RNG shared by every random decision in the simulation
#[derive(Debug, Clone)]
pub struct SimRng(Pcg32);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self(Pcg32::seed_from_u64(seed))
    }

    /// Uniform in [min, max)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.0.random_range(min..max)
    }

    pub fn angle(&mut self) -> f32 {
        self.range(-std::f32::consts::PI, std::f32::consts::PI)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.0.random_bool(p.clamp(0.0, 1.0))
    }

    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 { 0 } else { self.0.random_range(0..len) }
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0)
    }
}

/// All simulated entities plus the bookkeeping the step needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    /// Field size (width, height)
    pub bounds: Vec2,
    pub craft: Option<Craft>,
    pub hostile: Option<HostileUnit>,
    pub obstacles: Vec<Obstacle>,
    pub projectiles: Vec<Projectile>,
    pub homing: Vec<HomingProjectile>,
    pub power_ups: Vec<PowerUp>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    /// Seconds the hostile slot has been empty
    pub hostile_timer: f32,
    /// Seconds of emptiness before the next hostile appears
    pub hostile_threshold: f32,
    pub max_particles: usize,
    /// Longest step `tick` will take in one go
    pub max_frame_dt: f32,
    #[serde(skip)]
    pub rng: SimRng,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl World {
    pub fn new(bounds: Vec2, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        let hostile_threshold = rng.range(HOSTILE_SPAWN_DELAY.0, HOSTILE_SPAWN_DELAY.1);
        Self {
            bounds,
            craft: None,
            hostile: None,
            obstacles: Vec::new(),
            projectiles: Vec::new(),
            homing: Vec::new(),
            power_ups: Vec::new(),
            particles: Vec::new(),
            hostile_timer: 0.0,
            hostile_threshold,
            max_particles: 500,
            max_frame_dt: MAX_FRAME_DT,
            rng,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn center(&self) -> Vec2 {
        self.bounds * 0.5
    }

    /// The craft, if present and not already marked dead this step
    pub fn live_craft(&self) -> Option<&Craft> {
        self.craft.as_ref().filter(|c| c.body.is_alive())
    }

    pub fn live_hostile(&self) -> Option<&HostileUnit> {
        self.hostile.as_ref().filter(|h| h.body.is_alive())
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Empty the hostile slot's wait and roll a fresh threshold
    pub fn reset_hostile_timer(&mut self) {
        self.hostile_timer = 0.0;
        self.hostile_threshold = self.rng.range(HOSTILE_SPAWN_DELAY.0, HOSTILE_SPAWN_DELAY.1);
    }

    /// Time step for non-craft entities (slowed while time-dilation runs)
    pub fn hostile_dt(&self, dt: f32) -> f32 {
        let dilated = self
            .craft
            .as_ref()
            .is_some_and(|c| c.effects.is_active(TimedEffect::TimeDilation));
        if dilated { dt * TIME_DILATION_FACTOR } else { dt }
    }

    /// Drop everything that does not carry over between levels
    pub fn clear_for_level(&mut self) {
        self.obstacles.clear();
        self.projectiles.clear();
        self.homing.clear();
        self.power_ups.clear();
    }

    /// Remove every entity marked dead
    pub fn purge_dead(&mut self) {
        if self.craft.as_ref().is_some_and(|c| c.body.dead) {
            self.craft = None;
        }
        if self.hostile.as_ref().is_some_and(|h| h.body.dead) {
            self.hostile = None;
        }
        self.obstacles.retain(|o| o.body.is_alive());
        self.projectiles.retain(|p| p.body.is_alive());
        self.homing.retain(|h| h.body.is_alive());
        self.power_ups.retain(|p| p.body.is_alive());
        self.particles.retain(|p| p.body.is_alive());
    }
}
