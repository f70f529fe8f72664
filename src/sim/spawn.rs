//! Procedural spawning: obstacle fields, the hostile unit, drops, particles

use glam::Vec2;

use super::state::{
    Body, Craft, GameEvent, HomingProjectile, HostileUnit, Obstacle, ObstacleSize, Owner,
    Particle, PowerUp, PowerUpKind, Projectile, SimRng, World,
};
use crate::consts::*;
use crate::{heading, wrap_position};

/// Seed a level with `count + level_bonus` large obstacles, keeping the
/// centered exclusion square clear for the craft
pub fn spawn_obstacle_field(world: &mut World, count: u32, level_bonus: u32) {
    let total = count + level_bonus;
    let center = world.center();
    let half = Vec2::splat(SPAWN_EXCLUSION_HALF).min(world.bounds * 0.5);

    for _ in 0..total {
        let pos = loop {
            let candidate = Vec2::new(
                world.rng.range(0.0, world.bounds.x),
                world.rng.range(0.0, world.bounds.y),
            );
            let offset = (candidate - center).abs();
            // Degenerate fields smaller than the exclusion zone accept anything
            if offset.x >= half.x || offset.y >= half.y || half.cmpge(world.bounds * 0.5).all() {
                break candidate;
            }
        };
        spawn_obstacle(world, ObstacleSize::Large, pos);
    }

    log::info!("Seeded obstacle field: {} large ({} + {} bonus)", total, count, level_bonus);
}

/// Spawn one obstacle of `size` at `pos` with random heading, speed, spin and outline
pub fn spawn_obstacle(world: &mut World, size: ObstacleSize, pos: Vec2) {
    let id = world.next_entity_id();
    let rng = &mut world.rng;
    let speed = size.base_speed() * rng.range(OBSTACLE_SPEED_JITTER.0, OBSTACLE_SPEED_JITTER.1);
    let direction = rng.angle();
    let spin = rng.range(-OBSTACLE_MAX_SPIN, OBSTACLE_MAX_SPIN);
    let outline = generate_outline(rng, size.radius());
    let facing = rng.angle();

    world.obstacles.push(Obstacle {
        body: Body::new(
            id,
            wrap_position(pos, world.bounds),
            heading(direction) * speed,
            facing,
            size.radius(),
        ),
        size,
        outline,
        spin,
    });
}

/// Jagged outline: evenly spaced vertex angles, each radius jittered
pub fn generate_outline(rng: &mut SimRng, radius: f32) -> Vec<Vec2> {
    let step = std::f32::consts::TAU / OBSTACLE_VERTICES as f32;
    (0..OBSTACLE_VERTICES)
        .map(|i| {
            let r = radius * rng.range(OBSTACLE_JITTER.0, OBSTACLE_JITTER.1);
            heading(i as f32 * step) * r
        })
        .collect()
}

/// Bring the hostile unit in from a random side edge
pub fn spawn_hostile_unit(world: &mut World) {
    if world.hostile.is_some() {
        return;
    }

    let id = world.next_entity_id();
    let from_left = world.rng.chance(0.5);
    let band = world.bounds.y * HOSTILE_ENTRY_BAND;
    let margin = (world.bounds.y - band) / 2.0;
    let y = margin + world.rng.range(0.0, band);
    // Enter just inside the edge so the field invariant holds from the first frame
    let (x, vx) = if from_left {
        (0.0, HOSTILE_SPEED)
    } else {
        ((world.bounds.x - 1.0).max(0.0), -HOSTILE_SPEED)
    };
    let direction_timer = world.rng.range(HOSTILE_TURN_INTERVAL.0, HOSTILE_TURN_INTERVAL.1);

    world.hostile = Some(HostileUnit {
        body: Body::new(id, Vec2::new(x, y), Vec2::new(vx, 0.0), 0.0, HOSTILE_RADIUS),
        direction_timer,
        fire_cooldown: HOSTILE_FIRE_INTERVAL,
        accuracy: HOSTILE_ACCURACY,
    });
    world.reset_hostile_timer();
    world.emit(GameEvent::HostileArrived);
    log::debug!("Hostile unit {} entering from the {}", id, if from_left { "left" } else { "right" });
}

/// Roll a power-up drop at `pos`
pub fn maybe_spawn_power_up(world: &mut World, pos: Vec2) -> Option<PowerUpKind> {
    if !world.rng.chance(POWER_UP_DROP_CHANCE) {
        return None;
    }
    let kind = PowerUpKind::ALL[world.rng.index(PowerUpKind::ALL.len())];
    let vel = Vec2::new(
        world.rng.range(-POWER_UP_DRIFT, POWER_UP_DRIFT),
        world.rng.range(-POWER_UP_DRIFT, POWER_UP_DRIFT),
    );
    let id = world.next_entity_id();
    world.power_ups.push(PowerUp {
        body: Body::new(id, wrap_position(pos, world.bounds), vel, 0.0, POWER_UP_RADIUS),
        kind,
        lifetime: POWER_UP_LIFETIME,
    });
    world.emit(GameEvent::PowerUpDropped(kind));
    Some(kind)
}

/// Place a fresh craft at the field center
pub fn spawn_craft(world: &mut World) {
    let id = world.next_entity_id();
    let center = world.center();
    world.craft = Some(Craft::new(id, center));
    log::debug!("Craft {} spawned", id);
}

/// Enqueue a projectile travelling along `angle`
pub fn spawn_projectile(world: &mut World, pos: Vec2, angle: f32, owner: Owner) {
    let (speed, lifetime) = match owner {
        Owner::Craft => (PROJECTILE_SPEED, PROJECTILE_LIFETIME),
        Owner::Hostile => (HOSTILE_PROJECTILE_SPEED, HOSTILE_PROJECTILE_LIFETIME),
    };
    let id = world.next_entity_id();
    world.projectiles.push(Projectile {
        body: Body::new(
            id,
            wrap_position(pos, world.bounds),
            heading(angle) * speed,
            angle,
            PROJECTILE_RADIUS,
        ),
        lifetime,
        owner,
    });
}

pub fn spawn_homing(world: &mut World, pos: Vec2, angle: f32) {
    let id = world.next_entity_id();
    world.homing.push(HomingProjectile {
        body: Body::new(
            id,
            wrap_position(pos, world.bounds),
            heading(angle) * HOMING_SPEED,
            angle,
            HOMING_RADIUS,
        ),
        lifetime: HOMING_LIFETIME,
    });
}

/// Emit one particle unless the cap is reached
pub fn spawn_particle(world: &mut World, pos: Vec2, vel: Vec2, life: f32) {
    if world.particles.len() >= world.max_particles {
        return;
    }
    let id = world.next_entity_id();
    world.particles.push(Particle {
        body: Body::new(id, wrap_position(pos, world.bounds), vel, 0.0, 1.0),
        life,
        max_life: life,
    });
}

/// Radial explosion burst
pub fn emit_burst(world: &mut World, pos: Vec2, count: usize, speed: f32) {
    for _ in 0..count {
        let dir = heading(world.rng.angle());
        let vel = dir * speed * world.rng.range(0.3, 1.0);
        let life = world.rng.range(PARTICLE_LIFE.0, PARTICLE_LIFE.1);
        spawn_particle(world, pos, vel, life);
    }
}
