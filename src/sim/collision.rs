//! Collision detection and resolution
//!
//! Every test is circle-vs-circle; the jagged obstacle outline is cosmetic.
//! Passes run in a fixed order and only flag entities dead or append new
//! ones, so anything already flagged this frame is skipped by later checks.

use glam::Vec2;

use super::spawn::{emit_burst, maybe_spawn_power_up, spawn_obstacle};
use super::state::{GameEvent, Owner, PowerUpKind, World};
use crate::circles_overlap;
use crate::consts::*;

/// Resolve every interaction for this frame
pub fn resolve_collisions(world: &mut World) {
    craft_vs_power_ups(world);
    craft_projectiles_vs_obstacles(world);
    craft_projectiles_vs_hostile(world);
    hostile_projectiles_vs_craft(world);
    homing_vs_targets(world);
    craft_body_collisions(world);
}

/// Live craft position and radius
fn craft_circle(world: &World) -> Option<(Vec2, f32)> {
    world.live_craft().map(|c| (c.body.pos, c.body.radius))
}

fn craft_vs_power_ups(world: &mut World) {
    let Some((pos, radius)) = craft_circle(world) else {
        return;
    };
    let pickup_radius = radius * CRAFT_PICKUP_SCALE;

    let mut collected = Vec::new();
    for power_up in world.power_ups.iter_mut() {
        if power_up.body.dead {
            continue;
        }
        if circles_overlap(pos, pickup_radius, power_up.body.pos, power_up.body.radius) {
            power_up.body.dead = true;
            collected.push(power_up.kind);
        }
    }

    for kind in collected {
        apply_power_up(world, kind);
    }
}

/// Grant a power-up's effect to the craft
pub fn apply_power_up(world: &mut World, kind: PowerUpKind) {
    let Some(craft) = world.craft.as_mut() else {
        return;
    };
    match kind.effect() {
        Some(effect) => craft.effects.grant(effect),
        None => craft.effects.homing_ammo += HOMING_AMMO_PER_PICKUP,
    }
    log::info!("Collected {}", kind.label());
    world.emit(GameEvent::PowerUpCollected(kind));
}

fn craft_projectiles_vs_obstacles(world: &mut World) {
    // Children spawned this frame are not eligible until the next one
    let obstacle_count = world.obstacles.len();

    for p in 0..world.projectiles.len() {
        let projectile = &world.projectiles[p];
        if projectile.body.dead || projectile.owner != Owner::Craft {
            continue;
        }
        let (pos, radius) = (projectile.body.pos, projectile.body.radius);

        // First hit in spawn order wins
        let hit = (0..obstacle_count).find(|&o| {
            let obstacle = &world.obstacles[o];
            obstacle.body.is_alive()
                && circles_overlap(pos, radius, obstacle.body.pos, obstacle.body.radius)
        });
        if let Some(o) = hit {
            world.projectiles[p].body.dead = true;
            let points = world.obstacles[o].size.score();
            destroy_obstacle(world, o, true, points);
        }
    }
}

/// Destroy obstacle `index`: score, drop roll, burst, optional split
fn destroy_obstacle(world: &mut World, index: usize, split: bool, points: u32) {
    let obstacle = &mut world.obstacles[index];
    if obstacle.body.dead {
        return;
    }
    obstacle.body.dead = true;
    let (size, pos) = (obstacle.size, obstacle.body.pos);

    world.emit(GameEvent::Scored(points));
    world.emit(GameEvent::ObstacleDestroyed { size, pos, split });
    maybe_spawn_power_up(world, pos);
    emit_burst(world, pos, size.burst_size(), size.base_speed() * 2.0);

    if split {
        if let Some(child) = size.split() {
            for _ in 0..size.split_count() {
                spawn_obstacle(world, child, pos);
            }
        }
    }
}

fn craft_projectiles_vs_hostile(world: &mut World) {
    for p in 0..world.projectiles.len() {
        let Some((hostile_pos, hostile_radius)) =
            world.live_hostile().map(|h| (h.body.pos, h.body.radius))
        else {
            return;
        };
        let projectile = &mut world.projectiles[p];
        if projectile.body.dead || projectile.owner != Owner::Craft {
            continue;
        }
        if circles_overlap(projectile.body.pos, projectile.body.radius, hostile_pos, hostile_radius) {
            projectile.body.dead = true;
            destroy_hostile(world, true);
        }
    }
}

/// Destroy the live hostile unit, optionally awarding the bonus
fn destroy_hostile(world: &mut World, award: bool) {
    let Some(hostile) = world.hostile.as_mut().filter(|h| h.body.is_alive()) else {
        return;
    };
    hostile.body.dead = true;
    let pos = hostile.body.pos;

    if award {
        world.emit(GameEvent::Scored(HOSTILE_SCORE));
    }
    world.emit(GameEvent::HostileDestroyed { pos });
    maybe_spawn_power_up(world, pos);
    emit_burst(world, pos, HOSTILE_BURST, 180.0);
    world.reset_hostile_timer();
    log::debug!("Hostile unit destroyed");
}

/// Mark the craft dead (at most once per frame)
fn destroy_craft(world: &mut World) {
    let Some(craft) = world.craft.as_mut().filter(|c| c.body.is_alive()) else {
        return;
    };
    craft.body.dead = true;
    let pos = craft.body.pos;
    emit_burst(world, pos, CRAFT_BURST, 160.0);
    world.emit(GameEvent::CraftDestroyed { pos });
    log::info!("Craft destroyed at ({:.0}, {:.0})", pos.x, pos.y);
}

fn hostile_projectiles_vs_craft(world: &mut World) {
    let Some(craft) = world.live_craft() else {
        return;
    };
    if craft.is_invulnerable() {
        return;
    }
    let shielded = craft.is_shielded();
    let pos = craft.body.pos;
    let radius = if shielded {
        craft.body.radius * CRAFT_SHIELD_SCALE
    } else {
        craft.body.radius * CRAFT_HIT_SCALE
    };

    for p in 0..world.projectiles.len() {
        let projectile = &mut world.projectiles[p];
        if projectile.body.dead || projectile.owner != Owner::Hostile {
            continue;
        }
        if !circles_overlap(projectile.body.pos, projectile.body.radius, pos, radius) {
            continue;
        }
        projectile.body.dead = true;
        if !shielded {
            destroy_craft(world);
            return;
        }
    }
}

fn homing_vs_targets(world: &mut World) {
    let obstacle_count = world.obstacles.len();

    for m in 0..world.homing.len() {
        let missile = &world.homing[m];
        if missile.body.dead {
            continue;
        }
        let (pos, radius) = (missile.body.pos, missile.body.radius);

        let hits_hostile = world
            .live_hostile()
            .is_some_and(|h| circles_overlap(pos, radius, h.body.pos, h.body.radius));
        if hits_hostile {
            world.homing[m].body.dead = true;
            destroy_hostile(world, true);
            continue;
        }

        let hit = (0..obstacle_count).find(|&o| {
            let obstacle = &world.obstacles[o];
            obstacle.body.is_alive()
                && circles_overlap(pos, radius, obstacle.body.pos, obstacle.body.radius)
        });
        if let Some(o) = hit {
            world.homing[m].body.dead = true;
            // Flat award, never splits
            destroy_obstacle(world, o, false, HOMING_OBSTACLE_SCORE);
        }
    }
}

fn craft_body_collisions(world: &mut World) {
    let Some(craft) = world.live_craft() else {
        return;
    };
    if craft.is_invulnerable() || craft.is_shielded() {
        return;
    }
    let pos = craft.body.pos;
    let radius = craft.body.radius * CRAFT_HIT_SCALE;

    let rammed_obstacle = world
        .obstacles
        .iter()
        .any(|o| o.body.is_alive() && circles_overlap(pos, radius, o.body.pos, o.body.radius));
    if rammed_obstacle {
        destroy_craft(world);
        return;
    }

    let rammed_hostile = world
        .live_hostile()
        .is_some_and(|h| circles_overlap(pos, radius, h.body.pos, h.body.radius));
    if rammed_hostile {
        destroy_hostile(world, false);
        destroy_craft(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawn::{spawn_craft, spawn_homing, spawn_projectile};
    use crate::sim::state::{Body, HostileUnit, ObstacleSize, TimedEffect};
    use crate::sim::tick::{PlayerIntent, step};

    fn world() -> World {
        let mut world = World::new(Vec2::new(800.0, 600.0), 4242);
        spawn_craft(&mut world);
        world
    }

    fn place_obstacle(world: &mut World, size: ObstacleSize, pos: Vec2) {
        spawn_obstacle(world, size, pos);
        if let Some(obstacle) = world.obstacles.last_mut() {
            obstacle.body.vel = Vec2::ZERO;
        }
    }

    fn place_hostile(world: &mut World, pos: Vec2) {
        let id = world.next_entity_id();
        world.hostile = Some(HostileUnit {
            body: Body::new(id, pos, Vec2::ZERO, 0.0, HOSTILE_RADIUS),
            direction_timer: 10.0,
            fire_cooldown: 10.0,
            accuracy: 0.0,
        });
    }

    fn scored(events: &[GameEvent]) -> u32 {
        events
            .iter()
            .map(|e| match e {
                GameEvent::Scored(points) => *points,
                _ => 0,
            })
            .sum()
    }

    fn count(world: &World, size: ObstacleSize) -> usize {
        world.obstacles.iter().filter(|o| o.size == size).count()
    }

    fn kill_with_bullet(size: ObstacleSize) -> World {
        let mut world = world();
        let target = Vec2::new(100.0, 100.0);
        place_obstacle(&mut world, size, target);
        spawn_projectile(&mut world, target, 0.0, Owner::Craft);
        resolve_collisions(&mut world);
        world.purge_dead();
        world
    }

    #[test]
    fn test_bullet_split_counts() {
        let world = kill_with_bullet(ObstacleSize::Large);
        assert_eq!(count(&world, ObstacleSize::Medium), 2);
        assert_eq!(world.obstacles.len(), 2);

        let world = kill_with_bullet(ObstacleSize::Medium);
        assert_eq!(count(&world, ObstacleSize::Small), 2);
        assert_eq!(world.obstacles.len(), 2);

        let world = kill_with_bullet(ObstacleSize::Small);
        assert!(world.obstacles.is_empty());
    }

    #[test]
    fn test_bullet_scores_by_class() {
        for size in [ObstacleSize::Large, ObstacleSize::Medium, ObstacleSize::Small] {
            let mut world = kill_with_bullet(size);
            assert_eq!(scored(&world.drain_events()), size.score());
        }
    }

    #[test]
    fn test_homing_never_splits() {
        for size in [ObstacleSize::Large, ObstacleSize::Medium, ObstacleSize::Small] {
            let mut world = world();
            let target = Vec2::new(100.0, 100.0);
            place_obstacle(&mut world, size, target);
            spawn_homing(&mut world, target, 0.0);
            resolve_collisions(&mut world);
            world.purge_dead();

            assert!(world.obstacles.is_empty());
            assert!(world.homing.is_empty());
            assert_eq!(scored(&world.drain_events()), HOMING_OBSTACLE_SCORE);
        }
    }

    #[test]
    fn test_one_projectile_one_obstacle() {
        let mut world = world();
        let target = Vec2::new(100.0, 100.0);
        place_obstacle(&mut world, ObstacleSize::Small, target);
        place_obstacle(&mut world, ObstacleSize::Small, target);
        let first = world.obstacles[0].body.id;
        spawn_projectile(&mut world, target, 0.0, Owner::Craft);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert_eq!(world.obstacles.len(), 1);
        assert_ne!(world.obstacles[0].body.id, first);
    }

    #[test]
    fn test_two_projectiles_do_not_double_kill() {
        let mut world = world();
        let target = Vec2::new(100.0, 100.0);
        place_obstacle(&mut world, ObstacleSize::Small, target);
        spawn_projectile(&mut world, target, 0.0, Owner::Craft);
        spawn_projectile(&mut world, target, 0.0, Owner::Craft);
        resolve_collisions(&mut world);
        let events = world.drain_events();
        world.purge_dead();

        assert_eq!(scored(&events), ObstacleSize::Small.score());
        // Second projectile found nothing alive and survives
        assert_eq!(world.projectiles.len(), 1);
    }

    #[test]
    fn test_bullet_destroys_hostile() {
        let mut world = world();
        let pos = Vec2::new(600.0, 150.0);
        place_hostile(&mut world, pos);
        world.hostile_timer = 7.0;
        spawn_projectile(&mut world, pos, 0.0, Owner::Craft);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.hostile.is_none());
        assert!(world.projectiles.is_empty());
        assert_eq!(world.hostile_timer, 0.0);
        assert_eq!(scored(&world.drain_events()), HOSTILE_SCORE);
    }

    #[test]
    fn test_homing_destroys_hostile_for_full_bonus() {
        let mut world = world();
        let pos = Vec2::new(600.0, 150.0);
        place_hostile(&mut world, pos);
        spawn_homing(&mut world, pos, 0.0);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.hostile.is_none());
        assert_eq!(scored(&world.drain_events()), HOSTILE_SCORE);
    }

    fn exposed_craft(world: &mut World) -> Vec2 {
        let craft = world.craft.as_mut().expect("craft present");
        craft.invulnerable = 0.0;
        craft.body.pos
    }

    #[test]
    fn test_hostile_shot_kills_exposed_craft() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        spawn_projectile(&mut world, pos, 0.0, Owner::Hostile);
        spawn_projectile(&mut world, pos, 1.0, Owner::Hostile);
        resolve_collisions(&mut world);
        let events = world.drain_events();
        world.purge_dead();

        assert!(world.craft.is_none());
        let deaths = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CraftDestroyed { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_shield_absorbs_shot_at_wider_radius() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        if let Some(craft) = world.craft.as_mut() {
            craft.effects.grant(TimedEffect::Shield);
        }
        // Outside the hull but inside the shield bubble
        spawn_projectile(&mut world, pos + Vec2::new(CRAFT_RADIUS * 1.8, 0.0), 0.0, Owner::Hostile);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.craft.is_some());
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_shield_ignores_bodies() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        if let Some(craft) = world.craft.as_mut() {
            craft.effects.grant(TimedEffect::Shield);
        }
        place_obstacle(&mut world, ObstacleSize::Large, pos);
        place_hostile(&mut world, pos);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.craft.is_some());
        assert!(world.hostile.is_some());
    }

    #[test]
    fn test_invulnerability_ignores_everything() {
        let mut world = world();
        let pos = world.craft.as_ref().map(|c| c.body.pos).unwrap_or_default();
        place_obstacle(&mut world, ObstacleSize::Large, pos);
        place_hostile(&mut world, pos);
        spawn_projectile(&mut world, pos, 0.0, Owner::Hostile);
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.craft.is_some());
        assert!(world.hostile.is_some());
        assert_eq!(world.projectiles.len(), 1);
    }

    #[test]
    fn test_ramming_hostile_kills_both_without_bonus() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        place_hostile(&mut world, pos);
        resolve_collisions(&mut world);
        let events = world.drain_events();
        world.purge_dead();

        assert!(world.craft.is_none());
        assert!(world.hostile.is_none());
        assert_eq!(scored(&events), 0);
    }

    #[test]
    fn test_reduced_hit_radius() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        // Touches the full hull (10 + 10) but not the 0.7 hit circle (7 + 10)
        place_obstacle(&mut world, ObstacleSize::Small, pos + Vec2::new(18.0, 0.0));
        resolve_collisions(&mut world);
        world.purge_dead();
        assert!(world.craft.is_some());
    }

    #[test]
    fn test_pickup_grants_effects() {
        let mut world = world();
        let pos = world.craft.as_ref().map(|c| c.body.pos).unwrap_or_default();
        for kind in PowerUpKind::ALL {
            let id = world.next_entity_id();
            world.power_ups.push(crate::sim::state::PowerUp {
                body: Body::new(id, pos + Vec2::new(20.0, 0.0), Vec2::ZERO, 0.0, POWER_UP_RADIUS),
                kind,
                lifetime: POWER_UP_LIFETIME,
            });
        }
        resolve_collisions(&mut world);
        world.purge_dead();

        assert!(world.power_ups.is_empty());
        let effects = &world.craft.as_ref().expect("craft").effects;
        assert_eq!(effects.remaining(TimedEffect::MultiShot), MULTI_SHOT_DURATION);
        assert_eq!(effects.remaining(TimedEffect::Shield), SHIELD_DURATION);
        assert_eq!(effects.remaining(TimedEffect::TimeDilation), TIME_DILATION_DURATION);
        assert_eq!(effects.homing_ammo, HOMING_AMMO_PER_PICKUP);
        let notices = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PowerUpCollected(_)))
            .count();
        assert_eq!(notices, 4);
    }

    #[test]
    fn test_primary_shot_scenario() {
        // Craft faces a large obstacle sitting just ahead of its nose
        let mut world = world();
        let (craft_pos, facing) = world
            .craft
            .as_ref()
            .map(|c| (c.body.pos, c.body.angle))
            .unwrap_or_default();
        let target = craft_pos + crate::heading(facing) * 30.0;
        place_obstacle(&mut world, ObstacleSize::Large, target);
        let impact = world.obstacles[0].body.pos;

        let fire = PlayerIntent {
            fire_primary: true,
            ..Default::default()
        };
        step(&mut world, &fire, 1.0 / 60.0);
        let events = world.drain_events();

        assert!(world.projectiles.is_empty());
        assert_eq!(scored(&events), 20);
        assert_eq!(world.obstacles.len(), 2);
        for child in &world.obstacles {
            assert_eq!(child.size, ObstacleSize::Medium);
            assert!(child.body.pos.distance(impact) < 1e-3);
            assert_eq!(child.outline.len(), OBSTACLE_VERTICES);
        }
    }

    #[test]
    fn test_shield_scenario() {
        let mut world = world();
        let pos = exposed_craft(&mut world);
        let id = world.next_entity_id();
        world.power_ups.push(crate::sim::state::PowerUp {
            body: Body::new(id, pos, Vec2::ZERO, 0.0, POWER_UP_RADIUS),
            kind: PowerUpKind::Shield,
            lifetime: POWER_UP_LIFETIME,
        });
        step(&mut world, &PlayerIntent::default(), 1.0 / 60.0);
        assert!(world.craft.as_ref().is_some_and(|c| c.is_shielded()));

        spawn_projectile(&mut world, pos, 0.0, Owner::Hostile);
        resolve_collisions(&mut world);
        let events = world.drain_events();
        world.purge_dead();

        assert!(world.craft.is_some());
        assert!(world.projectiles.is_empty());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::CraftDestroyed { .. })));
    }
}
