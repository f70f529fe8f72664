//! Per-frame simulation step
//!
//! Advances every entity by a (clamped) variable time step. The order of the
//! passes below matters: effects decay before the craft acts, the craft
//! moves before anything else, and non-craft entities use the dilated step.

use glam::Vec2;

use super::collision::resolve_collisions;
use super::spawn::{spawn_hostile_unit, spawn_homing, spawn_particle, spawn_projectile};
use super::state::{GameEvent, Owner, TimedEffect, World};
use crate::consts::*;
use crate::{bearing, heading, normalize_angle, turn_toward, wrap_position};

/// Player intent sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerIntent {
    pub turn_left: bool,
    pub turn_right: bool,
    pub thrust: bool,
    pub fire_primary: bool,
    pub fire_secondary: bool,
    /// Start / restart (edge-triggered by the game)
    pub start: bool,
    /// Leave the high score table
    pub back: bool,
}

/// Clamp a wall-clock frame delta into a safe simulation step
#[inline]
pub fn clamp_dt(elapsed: f32, max_dt: f32) -> f32 {
    if elapsed.is_finite() { elapsed.clamp(0.0, max_dt) } else { 0.0 }
}

/// Full frame: advance, resolve collisions, purge the dead
pub fn step(world: &mut World, intent: &PlayerIntent, dt: f32) {
    tick(world, intent, dt);
    resolve_collisions(world);
    world.purge_dead();
}

/// Advance all entities by `dt` (no collision handling, no purge)
pub fn tick(world: &mut World, intent: &PlayerIntent, dt: f32) {
    let dt = clamp_dt(dt, world.max_frame_dt);

    update_craft(world, intent, dt);

    // Everything hostile runs on the dilated clock; the craft's side does not
    let slow_dt = world.hostile_dt(dt);

    update_hostile(world, slow_dt);
    update_projectiles(world, dt, slow_dt);
    update_homing(world, dt);
    update_obstacles(world, slow_dt);
    update_power_ups(world, dt);
    advance_particles(world, dt);
}

fn update_craft(world: &mut World, intent: &PlayerIntent, dt: f32) {
    let bounds = world.bounds;
    let Some(craft) = world.craft.as_mut().filter(|c| c.body.is_alive()) else {
        return;
    };

    let expired = craft.effects.decay(dt);

    // Turning: left and right together cancel out
    let mut turn = 0.0;
    if intent.turn_left {
        turn -= 1.0;
    }
    if intent.turn_right {
        turn += 1.0;
    }
    craft.body.angle = normalize_angle(craft.body.angle + turn * craft.turn_rate * dt);

    craft.thrusting = intent.thrust;
    let mut exhaust = None;
    if intent.thrust {
        let dir = heading(craft.body.angle);
        craft.body.vel += dir * CRAFT_THRUST * dt;
        craft.body.vel = craft.body.vel.clamp_length_max(CRAFT_MAX_SPEED);
        let tail = craft.body.pos - dir * craft.body.radius;
        exhaust = Some((tail, craft.body.angle + std::f32::consts::PI, craft.body.vel));
    }

    // Primary fire (multi-shot shares the one cooldown)
    craft.weapon_cooldown = (craft.weapon_cooldown - dt).max(0.0);
    let mut shots: Vec<f32> = Vec::new();
    if intent.fire_primary && craft.weapon_cooldown <= 0.0 {
        craft.weapon_cooldown = CRAFT_WEAPON_COOLDOWN;
        shots.push(craft.body.angle);
        if craft.effects.is_active(TimedEffect::MultiShot) {
            shots.push(craft.body.angle - MULTI_SHOT_SPREAD);
            shots.push(craft.body.angle + MULTI_SHOT_SPREAD);
        }
    }
    let nose = craft.nose();

    // Secondary fire
    let mut launch_homing = false;
    if intent.fire_secondary && !craft.secondary_latch && craft.effects.homing_ammo > 0 {
        craft.effects.homing_ammo -= 1;
        launch_homing = true;
    }
    craft.secondary_latch = intent.fire_secondary;
    let facing = craft.body.angle;

    craft.body.integrate(dt, bounds);
    craft.invulnerable = (craft.invulnerable - dt).max(0.0);

    for effect in expired {
        log::debug!("Effect expired: {:?}", effect);
        world.emit(GameEvent::EffectExpired(effect));
    }
    if let Some((pos, backward, base_vel)) = exhaust {
        if world.rng.chance(EXHAUST_CHANCE) {
            let spread = world.rng.range(-0.4, 0.4);
            let vel = base_vel + heading(backward + spread) * 80.0;
            let life = world.rng.range(0.2, 0.4);
            spawn_particle(world, pos, vel, life);
        }
    }
    for angle in shots {
        spawn_projectile(world, nose, angle, Owner::Craft);
    }
    if launch_homing {
        spawn_homing(world, nose, facing);
    }
}

fn update_hostile(world: &mut World, dt: f32) {
    if world.hostile.is_none() {
        world.hostile_timer += dt;
        if world.hostile_timer >= world.hostile_threshold {
            spawn_hostile_unit(world);
        }
        return;
    }

    let bounds = world.bounds;
    let craft_pos = world.live_craft().map(|c| c.body.pos);
    let Some(hostile) = world.hostile.as_mut() else {
        return;
    };
    if hostile.body.dead {
        return;
    }

    // Only the vertical axis wraps; leaving sideways means it escaped
    let next = hostile.body.pos + hostile.body.vel * dt;
    if next.x < 0.0 || next.x >= bounds.x {
        hostile.body.dead = true;
        world.reset_hostile_timer();
        world.emit(GameEvent::HostileEscaped);
        log::debug!("Hostile unit left the field");
        return;
    }
    hostile.body.pos = Vec2::new(next.x, wrap_position(next, bounds).y);

    hostile.direction_timer -= dt;
    let reroll_course = hostile.direction_timer <= 0.0;

    hostile.fire_cooldown -= dt;
    let fire_from = if hostile.fire_cooldown <= 0.0 && craft_pos.is_some() {
        hostile.fire_cooldown = HOSTILE_FIRE_INTERVAL;
        Some((hostile.body.pos, hostile.accuracy))
    } else {
        None
    };

    if reroll_course {
        let vy = world.rng.range(-HOSTILE_MAX_VERTICAL_SPEED, HOSTILE_MAX_VERTICAL_SPEED);
        let timer = world.rng.range(HOSTILE_TURN_INTERVAL.0, HOSTILE_TURN_INTERVAL.1);
        if let Some(hostile) = world.hostile.as_mut() {
            hostile.body.vel.y = vy;
            hostile.direction_timer = timer;
        }
    }

    if let (Some((from, accuracy)), Some(target)) = (fire_from, craft_pos) {
        let slack = world.rng.range(-accuracy, accuracy);
        let angle = normalize_angle(bearing(from, target) + slack);
        spawn_projectile(world, from, angle, Owner::Hostile);
    }
}

fn update_projectiles(world: &mut World, dt: f32, slow_dt: f32) {
    let bounds = world.bounds;
    for projectile in world.projectiles.iter_mut().filter(|p| p.body.is_alive()) {
        let own_dt = match projectile.owner {
            Owner::Craft => dt,
            Owner::Hostile => slow_dt,
        };
        projectile.body.integrate(own_dt, bounds);
        projectile.lifetime -= own_dt;
        if projectile.lifetime <= 0.0 {
            projectile.body.dead = true;
        }
    }
}

fn update_homing(world: &mut World, dt: f32) {
    let bounds = world.bounds;
    // Queried fresh every step; a despawned hostile is simply absent
    let target = world.live_hostile().map(|h| h.body.pos);
    let max_turn = HOMING_TURN_RATE * dt;
    let mut trail = Vec::new();

    for missile in world.homing.iter_mut().filter(|m| m.body.is_alive()) {
        if let Some(target) = target {
            let desired = bearing(missile.body.pos, target);
            missile.body.angle = turn_toward(missile.body.angle, desired, max_turn);
        }
        missile.body.vel = heading(missile.body.angle) * HOMING_SPEED;
        missile.body.integrate(dt, bounds);
        missile.lifetime -= dt;
        if missile.lifetime <= 0.0 {
            missile.body.dead = true;
        } else {
            trail.push(missile.body.pos);
        }
    }

    for pos in trail {
        if world.rng.chance(HOMING_TRAIL_CHANCE) {
            let life = world.rng.range(0.15, 0.3);
            spawn_particle(world, pos, Vec2::ZERO, life);
        }
    }
}

fn update_obstacles(world: &mut World, dt: f32) {
    let bounds = world.bounds;
    for obstacle in world.obstacles.iter_mut().filter(|o| o.body.is_alive()) {
        obstacle.body.integrate(dt, bounds);
        obstacle.body.angle = normalize_angle(obstacle.body.angle + obstacle.spin * dt);
    }
}

fn update_power_ups(world: &mut World, dt: f32) {
    let bounds = world.bounds;
    for power_up in world.power_ups.iter_mut().filter(|p| p.body.is_alive()) {
        power_up.body.integrate(dt, bounds);
        power_up.lifetime -= dt;
        if power_up.lifetime <= 0.0 {
            power_up.body.dead = true;
        }
    }
}

/// Move and fade particles (also used outside active play)
pub fn advance_particles(world: &mut World, dt: f32) {
    let bounds = world.bounds;
    for particle in world.particles.iter_mut().filter(|p| p.body.is_alive()) {
        particle.body.integrate(dt, bounds);
        particle.life -= dt;
        if particle.life <= 0.0 {
            particle.body.dead = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawn::{spawn_craft, spawn_obstacle};
    use crate::sim::state::{HostileUnit, ObstacleSize, Body};

    fn world_with_craft() -> World {
        let mut world = World::new(Vec2::new(800.0, 600.0), 12345);
        spawn_craft(&mut world);
        world
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(0.5, 0.1), 0.1);
        assert_eq!(clamp_dt(-1.0, 0.1), 0.0);
        assert_eq!(clamp_dt(f32::NAN, 0.1), 0.0);
        assert_eq!(clamp_dt(0.016, 0.1), 0.016);
    }

    #[test]
    fn test_conflicting_turns_cancel() {
        let mut world = world_with_craft();
        let before = world.craft.as_ref().map(|c| c.body.angle);
        let input = PlayerIntent {
            turn_left: true,
            turn_right: true,
            ..Default::default()
        };
        tick(&mut world, &input, 0.05);
        assert_eq!(world.craft.as_ref().map(|c| c.body.angle), before);
    }

    #[test]
    fn test_single_shot_and_cooldown() {
        let mut world = world_with_craft();
        let fire = PlayerIntent {
            fire_primary: true,
            ..Default::default()
        };
        tick(&mut world, &fire, 0.01);
        assert_eq!(world.projectiles.len(), 1);

        // Still cooling down
        tick(&mut world, &fire, 0.01);
        assert_eq!(world.projectiles.len(), 1);

        tick(&mut world, &fire, 0.1);
        tick(&mut world, &fire, 0.1);
        tick(&mut world, &fire, 0.1);
        assert_eq!(world.projectiles.len(), 2);
    }

    #[test]
    fn test_multi_shot_fans_out() {
        let mut world = world_with_craft();
        if let Some(craft) = world.craft.as_mut() {
            craft.effects.grant(TimedEffect::MultiShot);
        }
        let fire = PlayerIntent {
            fire_primary: true,
            ..Default::default()
        };
        tick(&mut world, &fire, 0.01);
        assert_eq!(world.projectiles.len(), 3);

        let facing = world.craft.as_ref().map(|c| c.body.angle).unwrap_or_default();
        let mut offsets: Vec<f32> = world
            .projectiles
            .iter()
            .map(|p| normalize_angle(p.body.angle - facing))
            .collect();
        offsets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert!((offsets[0] + MULTI_SHOT_SPREAD).abs() < 1e-4);
        assert!(offsets[1].abs() < 1e-4);
        assert!((offsets[2] - MULTI_SHOT_SPREAD).abs() < 1e-4);
        assert!(world.projectiles.iter().all(|p| p.owner == Owner::Craft));
    }

    #[test]
    fn test_homing_needs_ammo_and_fresh_press() {
        let mut world = world_with_craft();
        let fire = PlayerIntent {
            fire_secondary: true,
            ..Default::default()
        };
        tick(&mut world, &fire, 0.01);
        assert!(world.homing.is_empty());

        if let Some(craft) = world.craft.as_mut() {
            craft.effects.homing_ammo = 2;
            craft.secondary_latch = false;
        }
        tick(&mut world, &fire, 0.01);
        tick(&mut world, &fire, 0.01); // held: no second launch
        assert_eq!(world.homing.len(), 1);
        assert_eq!(world.craft.as_ref().map(|c| c.effects.homing_ammo), Some(1));

        tick(&mut world, &PlayerIntent::default(), 0.01);
        tick(&mut world, &fire, 0.01);
        assert_eq!(world.homing.len(), 2);
        assert_eq!(world.craft.as_ref().map(|c| c.effects.homing_ammo), Some(0));
    }

    #[test]
    fn test_homing_turns_toward_hostile() {
        let mut world = world_with_craft();
        let id = world.next_entity_id();
        world.hostile = Some(HostileUnit {
            body: Body::new(id, Vec2::new(400.0, 100.0), Vec2::ZERO, 0.0, HOSTILE_RADIUS),
            direction_timer: 10.0,
            fire_cooldown: 10.0,
            accuracy: 0.0,
        });
        // Missile at the center heading right; hostile is straight up
        spawn_homing(&mut world, Vec2::new(400.0, 300.0), 0.0);
        tick(&mut world, &PlayerIntent::default(), 0.1);

        let missile = &world.homing[0];
        let expected = -HOMING_TURN_RATE * 0.1;
        assert!((missile.body.angle - expected).abs() < 1e-4);
        assert!((missile.body.vel.length() - HOMING_SPEED).abs() < 1e-2);
    }

    #[test]
    fn test_time_dilation_slows_hostile_side_only() {
        let mut world = world_with_craft();
        if let Some(craft) = world.craft.as_mut() {
            craft.body.pos = Vec2::new(100.0, 100.0);
            craft.body.vel = Vec2::new(50.0, 0.0);
            craft.effects.grant(TimedEffect::TimeDilation);
        }
        spawn_obstacle(&mut world, ObstacleSize::Small, Vec2::new(400.0, 400.0));
        world.obstacles[0].body.vel = Vec2::new(50.0, 0.0);

        let id = world.next_entity_id();
        world.hostile = Some(HostileUnit {
            body: Body::new(id, Vec2::new(400.0, 100.0), Vec2::new(50.0, 0.0), 0.0, HOSTILE_RADIUS),
            direction_timer: 10.0,
            fire_cooldown: 10.0,
            accuracy: 0.0,
        });

        spawn_projectile(&mut world, Vec2::new(200.0, 500.0), 0.0, Owner::Hostile);
        spawn_projectile(&mut world, Vec2::new(600.0, 500.0), 0.0, Owner::Craft);
        for shot in &mut world.projectiles {
            shot.body.vel = Vec2::new(50.0, 0.0);
        }

        tick(&mut world, &PlayerIntent::default(), 0.1);

        let craft_dx = world.craft.as_ref().map(|c| c.body.pos.x - 100.0).unwrap_or_default();
        let slow_dx = craft_dx * TIME_DILATION_FACTOR;
        assert!((craft_dx - 5.0).abs() < 1e-3);
        assert!((world.obstacles[0].body.pos.x - 400.0 - slow_dx).abs() < 1e-3);

        let hostile_x = world.hostile.as_ref().map(|h| h.body.pos.x).unwrap_or_default();
        assert!((hostile_x - 400.0 - slow_dx).abs() < 1e-3);

        let hostile_shot = &world.projectiles[0];
        assert_eq!(hostile_shot.owner, Owner::Hostile);
        assert!((hostile_shot.body.pos.x - 200.0 - slow_dx).abs() < 1e-3);
        assert!((hostile_shot.lifetime - (HOSTILE_PROJECTILE_LIFETIME - 0.1 * TIME_DILATION_FACTOR)).abs() < 1e-5);

        let craft_shot = &world.projectiles[1];
        assert_eq!(craft_shot.owner, Owner::Craft);
        assert!((craft_shot.body.pos.x - 600.0 - craft_dx).abs() < 1e-3);
        assert!((craft_shot.lifetime - (PROJECTILE_LIFETIME - 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_hostile_spawn_clock_is_dilated() {
        let mut world = world_with_craft();
        if let Some(craft) = world.craft.as_mut() {
            craft.effects.grant(TimedEffect::TimeDilation);
        }
        world.hostile_threshold = 0.1;
        tick(&mut world, &PlayerIntent::default(), 0.1);
        assert!(world.hostile.is_none());
        assert!((world.hostile_timer - 0.1 * TIME_DILATION_FACTOR).abs() < 1e-6);
    }

    #[test]
    fn test_step_limit_comes_from_world() {
        let mut world = world_with_craft();
        if let Some(craft) = world.craft.as_mut() {
            craft.body.pos = Vec2::new(100.0, 100.0);
            craft.body.vel = Vec2::new(100.0, 0.0);
        }
        tick(&mut world, &PlayerIntent::default(), 0.25);
        let x = world.craft.as_ref().map(|c| c.body.pos.x).unwrap_or_default();
        assert!((x - 110.0).abs() < 1e-3);

        world.max_frame_dt = 0.25;
        tick(&mut world, &PlayerIntent::default(), 0.25);
        let x = world.craft.as_ref().map(|c| c.body.pos.x).unwrap_or_default();
        assert!((x - 135.0).abs() < 1e-3);
    }

    #[test]
    fn test_hostile_spawns_after_threshold() {
        let mut world = World::new(Vec2::new(800.0, 600.0), 5);
        world.hostile_threshold = 0.25;
        let idle = PlayerIntent::default();
        tick(&mut world, &idle, 0.1);
        tick(&mut world, &idle, 0.1);
        assert!(world.hostile.is_none());
        tick(&mut world, &idle, 0.1);
        assert!(world.hostile.is_some());
        assert_eq!(world.hostile_timer, 0.0);
        assert!(world.hostile_threshold >= HOSTILE_SPAWN_DELAY.0);
    }

    #[test]
    fn test_hostile_fires_at_craft() {
        let mut world = world_with_craft();
        let id = world.next_entity_id();
        world.hostile = Some(HostileUnit {
            body: Body::new(id, Vec2::new(100.0, 300.0), Vec2::ZERO, 0.0, HOSTILE_RADIUS),
            direction_timer: 10.0,
            fire_cooldown: 0.05,
            accuracy: 0.0,
        });
        tick(&mut world, &PlayerIntent::default(), 0.1);

        let shots: Vec<_> = world
            .projectiles
            .iter()
            .filter(|p| p.owner == Owner::Hostile)
            .collect();
        assert_eq!(shots.len(), 1);
        // Craft sits at the field center, due right of the hostile
        assert!(shots[0].body.angle.abs() < 1e-4);
    }

    #[test]
    fn test_hostile_escapes_sideways() {
        let mut world = World::new(Vec2::new(800.0, 600.0), 9);
        let id = world.next_entity_id();
        world.hostile = Some(HostileUnit {
            body: Body::new(id, Vec2::new(795.0, 300.0), Vec2::new(100.0, 0.0), 0.0, HOSTILE_RADIUS),
            direction_timer: 10.0,
            fire_cooldown: 10.0,
            accuracy: 0.0,
        });
        world.hostile_timer = 3.0;
        step(&mut world, &PlayerIntent::default(), 0.1);
        assert!(world.hostile.is_none());
        assert_eq!(world.hostile_timer, 0.0);
        assert!(world.drain_events().contains(&GameEvent::HostileEscaped));
    }

    #[test]
    fn test_expired_entities_purged_in_same_step() {
        let mut world = world_with_craft();
        let fire = PlayerIntent {
            fire_primary: true,
            ..Default::default()
        };
        step(&mut world, &fire, 0.01);
        assert_eq!(world.projectiles.len(), 1);
        world.projectiles[0].lifetime = 0.005;
        step(&mut world, &PlayerIntent::default(), 0.01);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_positions_stay_on_field() {
        let mut world = world_with_craft();
        crate::sim::spawn::spawn_obstacle_field(&mut world, 6, 0);
        let input = PlayerIntent {
            thrust: true,
            turn_left: true,
            fire_primary: true,
            ..Default::default()
        };
        for _ in 0..600 {
            step(&mut world, &input, 1.0 / 60.0);
            let inside = |p: Vec2| p.x >= 0.0 && p.x < 800.0 && p.y >= 0.0 && p.y < 600.0;
            assert!(world.obstacles.iter().all(|o| inside(o.body.pos)));
            assert!(world.projectiles.iter().all(|p| inside(p.body.pos)));
            assert!(world.craft.iter().all(|c| inside(c.body.pos)));
            assert!(world.hostile.iter().all(|h| inside(h.body.pos)));
        }
    }
}
