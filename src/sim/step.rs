/// The step function: advances the world by one fixed tick.
///
/// Processing order while Playing:
///   1. Restart request
///   2. Player (input → movement → collision → animation), firing
///   3. Enemies, items, projectiles (each resolving its own collision)
///   4. Interactions: question blocks, pickups, projectile hits,
///      player vs. enemy
///   5. Hazards: fall-out, timer
///   6. Goal check
///   7. Drop inactive entities
///   8. Camera
///
/// Other screens only react to start/restart and the level transition.

use crate::domain::ai;
use crate::domain::entity::ItemKind;
use crate::domain::physics::{self, CollisionReport};
use crate::domain::tile::{TileKind, TilePos};
use crate::input::ControlFrame;
use super::event::GameEvent;
use super::world::{Screen, World};

/// A stomp needs the player's previous bottom within this many pixels
/// of the enemy's top.
const STOMP_TOLERANCE: f32 = 8.0;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut World, control: &ControlFrame, dt: f32) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.tick_message(dt);

    match world.screen {
        Screen::Start | Screen::GameOver | Screen::GameComplete => {
            if control.start_pressed || control.restart_pressed {
                world.request_start(&mut events);
            }
        }
        Screen::LevelComplete => {
            if control.restart_pressed {
                world.request_restart(&mut events);
            } else {
                world.tick_transition(dt, &mut events);
            }
        }
        Screen::Playing => {
            if control.restart_pressed {
                world.request_restart(&mut events);
            } else {
                play(world, control, dt, &mut events);
            }
        }
    }

    events
}

fn play(world: &mut World, control: &ControlFrame, dt: f32, events: &mut Vec<GameEvent>) {
    let player = resolve_player(world, control, dt, events);
    resolve_enemies(world, dt);
    resolve_items(world, dt);
    resolve_projectiles(world, dt);

    resolve_question_block(world, &player.report, events);
    resolve_pickups(world, events);
    resolve_projectile_hits(world, events);
    if resolve_enemy_contact(world, player.prev_bottom, player.descending, events) {
        drop_inactive(world);
        return;
    }
    if resolve_hazards(world, player.report.fell_out, dt, events) {
        drop_inactive(world);
        return;
    }
    resolve_goal(world, events);

    drop_inactive(world);
    let world_w = world.level.grid.pixel_width();
    world.camera.follow(world.player.body.center_x(), world_w);
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// What the interaction phase needs from the player's move.
struct PlayerMove {
    report: CollisionReport,
    prev_bottom: f32,
    descending: bool,
}

fn resolve_player(
    world: &mut World,
    control: &ControlFrame,
    dt: f32,
    events: &mut Vec<GameEvent>,
) -> PlayerMove {
    let tuning = world.config.physics.clone();
    if world.player.update(control, &tuning, dt) {
        events.push(GameEvent::Jumped);
    }

    if control.action_pressed && world.player.try_fire(&tuning) {
        let id = world.spawn_projectile();
        events.push(GameEvent::ProjectileFired { id });
    }

    let prev_bottom = world.player.body.bottom();
    let descending = world.player.body.vy > 0.0;
    let opts = world.player.move_options(control, &world.level.grid);
    let report = physics::move_with_collisions(&mut world.player.body, &world.level.grid, dt, opts);
    world.player.apply_collision(&report, &tuning);
    world.player.resolve_anim();

    PlayerMove { report, prev_bottom, descending }
}

fn resolve_enemies(world: &mut World, dt: f32) {
    let World { enemies, level, config, .. } = world;
    for enemy in enemies.iter_mut() {
        ai::update_walker(enemy, &level.grid, config, dt);
    }
}

fn resolve_items(world: &mut World, dt: f32) {
    let World { items, level, config, .. } = world;
    for item in items.iter_mut() {
        item.update(&level.grid, config, dt);
    }
}

fn resolve_projectiles(world: &mut World, dt: f32) {
    let World { projectiles, level, config, .. } = world;
    for p in projectiles.iter_mut() {
        p.update(&level.grid, config, dt);
    }
}

// ══════════════════════════════════════════════════════════════
// Interactions
// ══════════════════════════════════════════════════════════════

/// Bumping an unused question block from below pays out its reward.
fn resolve_question_block(world: &mut World, report: &CollisionReport, events: &mut Vec<GameEvent>) {
    let Some(hit) = report.ceiling_tile else { return };
    if hit.kind != TileKind::Question { return; }

    let pos = TilePos::new(hit.tx, hit.ty);
    let reward = match world.level.question_blocks.get_mut(&pos) {
        Some(block) if !block.used => {
            block.used = true;
            block.reward
        }
        _ => return,
    };
    events.push(GameEvent::BlockBumped { x: hit.tx, y: hit.ty });

    match reward {
        ItemKind::Coin => collect_coin(world, events),
        ItemKind::PowerItem => world.spawn_emerging_power(hit.tx, hit.ty),
    }
}

fn collect_coin(world: &mut World, events: &mut Vec<GameEvent>) {
    world.coins_collected += 1;
    world.score += world.config.scoring.coin;
    events.push(GameEvent::CoinCollected { total: world.coins_collected });
}

fn resolve_pickups(world: &mut World, events: &mut Vec<GameEvent>) {
    let mut picked = vec![];
    for item in world.items.iter_mut() {
        if !item.body.active || !item.is_emerged() { continue; }
        if !world.player.body.overlaps(&item.body) { continue; }
        item.body.active = false;
        picked.push(item.kind);
    }

    for kind in picked {
        match kind {
            ItemKind::Coin => collect_coin(world, events),
            ItemKind::PowerItem => {
                world.player.power_level = world.player.power_level.max(1);
                world.score += world.config.scoring.power_item;
                events.push(GameEvent::PowerUp { level: world.player.power_level });
            }
        }
    }
}

fn resolve_projectile_hits(world: &mut World, events: &mut Vec<GameEvent>) {
    for p in world.projectiles.iter_mut() {
        if !p.body.active { continue; }
        let Some(enemy) = world.enemies.iter_mut()
            .find(|e| e.body.active && e.body.overlaps(&p.body))
        else { continue };
        enemy.body.active = false;
        p.body.active = false;
        world.score += world.config.scoring.shot;
        events.push(GameEvent::EnemyShot { id: enemy.id });
    }
}

/// Stomp or get hurt. Returns true if the player lost a life.
fn resolve_enemy_contact(
    world: &mut World,
    prev_bottom: f32,
    descending: bool,
    events: &mut Vec<GameEvent>,
) -> bool {
    let mut hurt = false;
    for i in 0..world.enemies.len() {
        let enemy = &world.enemies[i];
        if !enemy.body.active || !world.player.body.overlaps(&enemy.body) { continue; }

        if descending && prev_bottom <= enemy.body.y + STOMP_TOLERANCE {
            let id = enemy.id;
            world.enemies[i].body.active = false;
            world.score += world.config.scoring.stomp;
            world.player.body.vy = world.config.physics.stomp_bounce;
            world.player.on_ground = false;
            events.push(GameEvent::EnemyStomped { id });
        } else if world.player.invulnerable <= 0.0 {
            hurt = true;
            break;
        }
    }

    if hurt {
        world.lose_life("Ouch!", events);
    }
    hurt
}

/// Fall-out and time-out. Returns true if the player lost a life.
fn resolve_hazards(world: &mut World, fell_out: bool, dt: f32, events: &mut Vec<GameEvent>) -> bool {
    if fell_out {
        world.lose_life("Fell!", events);
        return true;
    }
    world.time_left -= dt;
    if world.time_left <= 0.0 {
        world.time_left = 0.0;
        world.lose_life("Time up!", events);
        return true;
    }
    false
}

fn resolve_goal(world: &mut World, events: &mut Vec<GameEvent>) {
    let (gx, gy, gw, gh) = world.goal_rect();
    if !world.player.body.overlaps_rect(gx, gy, gw, gh) { return; }

    if world.level.goal_requires_all_coins && world.coins_collected < world.level.coin_target {
        world.notify_missing_coins();
        return;
    }
    world.complete_level(events);
}

fn drop_inactive(world: &mut World) {
    world.enemies.retain(|e| e.body.active);
    world.items.retain(|i| i.body.active);
    world.projectiles.retain(|p| p.body.active);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::level::{normalize_level, parse_level_file};
    use crate::domain::entity::{Enemy, Facing};

    const DT: f32 = 1.0 / 60.0;

    fn playing(levels: &str) -> World {
        let templates = parse_level_file(levels).unwrap()
            .iter()
            .enumerate()
            .map(|(i, r)| normalize_level(r, i, 32.0))
            .collect();
        let mut w = World::new(templates, GameConfig::default()).unwrap();
        let mut events = vec![];
        w.start_new_run(&mut events);
        w
    }

    fn run(w: &mut World, control: ControlFrame, steps: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..steps {
            all.extend(step(w, &control, DT));
        }
        all
    }

    #[test]
    fn start_screen_waits_for_start() {
        let templates = vec![normalize_level(&Default::default(), 0, 32.0)];
        let mut w = World::new(templates, GameConfig::default()).unwrap();
        run(&mut w, ControlFrame::default(), 10);
        assert_eq!(w.screen, Screen::Start);
        let events = step(&mut w, &ControlFrame { start_pressed: true, ..Default::default() }, DT);
        assert_eq!(w.screen, Screen::Playing);
        assert_eq!(events, vec![GameEvent::LevelStarted { index: 0 }]);
    }

    #[test]
    fn coin_pickup_scores() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            spawn = { x = 1, y = 1 }
            items = [{ type = 'coin', x = 3, y = 1 }]
        "#);
        let events = run(&mut w, ControlFrame { axis: 1.0, ..Default::default() }, 40);
        assert!(events.contains(&GameEvent::CoinCollected { total: 1 }));
        assert_eq!(w.coins_collected, 1);
        assert_eq!(w.score, 100);
        assert!(w.items.is_empty());
    }

    #[test]
    fn bumping_question_block_pays_once() {
        let mut w = playing(r#"
            rows = ['..........', '..?.......', '..........', '..........', '##########']
            spawn = { x = 2, y = 3 }
        "#);
        assert_eq!(w.level.coin_target, 1);
        run(&mut w, ControlFrame::default(), 5);
        let jump = ControlFrame { jump_pressed: true, jump_held: true, ..Default::default() };
        let mut events = step(&mut w, &jump, DT);
        events.extend(run(&mut w, ControlFrame { jump_held: true, ..Default::default() }, 60));
        assert!(events.contains(&GameEvent::BlockBumped { x: 2, y: 1 }));
        assert_eq!(w.coins_collected, 1);

        // Second bump pays nothing.
        let mut events = step(&mut w, &jump, DT);
        events.extend(run(&mut w, ControlFrame { jump_held: true, ..Default::default() }, 60));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::BlockBumped { .. })));
        assert_eq!(w.coins_collected, 1);
    }

    #[test]
    fn power_block_spawns_item_then_powers_up() {
        let mut w = playing(r#"
            rows = ['..........', '..?.......', '..........', '..........', '##########']
            spawn = { x = 2, y = 3 }
            rewards = [{ x = 2, y = 1, reward = 'power' }]
        "#);
        assert_eq!(w.level.coin_target, 0);
        run(&mut w, ControlFrame::default(), 5);
        let jump = ControlFrame { jump_pressed: true, jump_held: true, ..Default::default() };
        step(&mut w, &jump, DT);
        run(&mut w, ControlFrame { jump_held: true, ..Default::default() }, 20);
        assert_eq!(w.items.len(), 1);
        assert!(!w.items[0].is_emerged());
        assert_eq!(w.player.power_level, 0);
    }

    #[test]
    fn stomp_defeats_enemy_and_bounces() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '..........', '..........', '##########']
            spawn = { x = 1, y = 3 }
        "#);
        let cfg = w.config.clone();
        let mut e = Enemy::walker(99, 5, 3, 3, &cfg);
        e.direction = 0.0;
        w.enemies.push(e.clone());
        // Drop the player from above the enemy.
        w.player.body.x = e.body.x;
        w.player.body.y = e.body.y - 60.0;
        w.player.body.vy = 200.0;
        let events = run(&mut w, ControlFrame::default(), 30);
        assert!(events.contains(&GameEvent::EnemyStomped { id: 99 }));
        assert!(w.enemies.is_empty());
        assert_eq!(w.lives, 3);
        assert_eq!(w.score, 200);
    }

    #[test]
    fn side_contact_costs_a_life() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            spawn = { x = 1, y = 1 }
            enemies = [{ type = 'walker', x = 3, y = 1, patrol = 3 }]
        "#);
        let events = run(&mut w, ControlFrame::default(), 120);
        assert!(events.contains(&GameEvent::LifeLost { lives_left: 2 }));
        assert_eq!(w.lives, 2);
        assert!(w.player.invulnerable > 0.0);
    }

    #[test]
    fn falling_out_costs_a_life() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##.#######']
            spawn = { x = 2, y = 0 }
        "#);
        let events = run(&mut w, ControlFrame::default(), 90);
        assert!(events.iter().any(|e| matches!(e, GameEvent::LifeLost { .. })));
    }

    #[test]
    fn timer_runs_out() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            time_limit = 30
        "#);
        let events = run(&mut w, ControlFrame::default(), 30 * 60 + 5);
        assert!(events.contains(&GameEvent::LifeLost { lives_left: 2 }));
        assert!(w.time_left > 29.0);
    }

    #[test]
    fn goal_completes_with_bonus() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            spawn = { x = 1, y = 1 }
            goal = { x = 4, y = 1 }
        "#);
        let events = run(&mut w, ControlFrame { axis: 1.0, ..Default::default() }, 60);
        assert!(events.iter().any(|e| matches!(e, GameEvent::LevelComplete { index: 0, .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameComplete { .. })));
        assert_eq!(w.screen, Screen::GameComplete);
        // 1000 base + 119 s * 10, no coins to collect.
        assert_eq!(w.score, 1000 + 119 * 10);
    }

    fn fired_id(events: &[GameEvent]) -> Option<u32> {
        events.iter().find_map(|e| match e {
            GameEvent::ProjectileFired { id } => Some(*id),
            _ => None,
        })
    }

    #[test]
    fn power_pickup_raises_power_level() {
        let mut w = playing(r#"
            rows = ['#........#', '#........#', '##########']
            spawn = { x = 1, y = 1 }
            items = [{ type = 'power', x = 3, y = 1 }]
        "#);
        assert_eq!(w.player.power_level, 0);
        let events = run(&mut w, ControlFrame { axis: 1.0, ..Default::default() }, 90);
        assert!(events.contains(&GameEvent::PowerUp { level: 1 }));
        assert_eq!(w.player.power_level, 1);
        assert_eq!(w.score, 500);
        assert!(w.items.is_empty());
    }

    #[test]
    fn projectile_defeats_enemy() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            spawn = { x = 1, y = 1 }
        "#);
        let cfg = w.config.clone();
        let mut e = Enemy::walker(99, 4, 1, 3, &cfg);
        e.direction = 0.0;
        w.enemies.push(e);
        w.player.power_level = 1;
        run(&mut w, ControlFrame::default(), 5);

        let fire = ControlFrame { action_pressed: true, ..Default::default() };
        let mut events = step(&mut w, &fire, DT);
        assert!(fired_id(&events).is_some());
        events.extend(run(&mut w, ControlFrame::default(), 30));
        assert!(events.contains(&GameEvent::EnemyShot { id: 99 }));
        assert!(w.enemies.is_empty());
        assert!(w.projectiles.is_empty());
        assert_eq!(w.score, 150);
        assert_eq!(w.lives, 3);
    }

    #[test]
    fn shot_travels_the_way_the_player_faces() {
        let mut w = playing(r#"
            rows = ['..........', '..........', '##########']
            spawn = { x = 5, y = 1 }
        "#);
        w.player.power_level = 1;
        run(&mut w, ControlFrame::default(), 5);

        let events = step(&mut w, &ControlFrame { action_pressed: true, ..Default::default() }, DT);
        let id = fired_id(&events).unwrap();
        let shot = w.projectiles.iter().find(|p| p.id == id).unwrap();
        assert_eq!(w.player.facing, Facing::Right);
        assert!(shot.body.vx > 0.0 && shot.direction > 0.0);

        // Past the cooldown, turn left and fire again.
        run(&mut w, ControlFrame::default(), 20);
        let left = ControlFrame { axis: -1.0, action_pressed: true, ..Default::default() };
        let events = step(&mut w, &left, DT);
        let id = fired_id(&events).unwrap();
        let shot = w.projectiles.iter().find(|p| p.id == id).unwrap();
        assert_eq!(w.player.facing, Facing::Left);
        assert!(shot.body.vx < 0.0 && shot.direction < 0.0);
        assert!(shot.body.right() <= w.player.body.x + 1.0);
    }

    #[test]
    fn all_coins_bonus_only_when_every_coin_is_taken() {
        let completion_bonus = |coin_row: u32| {
            let mut w = playing(&format!(r#"
                rows = ['..........', '..........', '##########']
                spawn = {{ x = 1, y = 1 }}
                goal = {{ x = 6, y = 1 }}
                items = [{{ type = 'coin', x = 3, y = {coin_row} }}]
            "#));
            assert_eq!(w.level.coin_target, 1);
            let events = run(&mut w, ControlFrame { axis: 1.0, ..Default::default() }, 60);
            let bonus = events.iter().find_map(|e| match e {
                GameEvent::LevelComplete { bonus, .. } => Some(*bonus),
                _ => None,
            });
            (bonus, w.coins_collected, w.score)
        };

        // Coin in the walking path.
        let (bonus, coins, score) = completion_bonus(1);
        assert_eq!(coins, 1);
        assert_eq!(bonus, Some(1000 + 119 * 10 + 500));
        assert_eq!(score, 100 + 1000 + 119 * 10 + 500);

        // Coin out of reach overhead.
        let (bonus, coins, _) = completion_bonus(0);
        assert_eq!(coins, 0);
        assert_eq!(bonus, Some(1000 + 119 * 10));
    }
}
