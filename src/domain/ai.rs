/// Walker AI: patrols horizontally inside its bounds, turning around at
/// walls, at the patrol bounds, and at ledges.
///
/// Turn rules, checked after the collision pass:
///   1. Wall contact → face away from the wall.
///   2. Bound reached → clamp inside, face the interior.
///   3. Grounded with nothing standable just ahead of the leading edge
///      and below the feet → reverse.

use super::entity::Enemy;
use super::physics::{self, MoveOptions};
use super::tile::TileGrid;
use crate::config::GameConfig;

/// How far below the feet the ledge probe looks (px).
pub const LEDGE_PROBE_DOWN: f32 = 2.0;

/// Walk cycle frame length (s).
const WALK_FRAME_SECS: f32 = 0.2;

pub fn update_walker(enemy: &mut Enemy, grid: &TileGrid, config: &GameConfig, dt: f32) {
    if !enemy.body.active { return; }

    let p = &config.physics;
    enemy.body.vx = enemy.direction * config.enemy.walk_speed;
    enemy.body.vy = (enemy.body.vy + p.gravity * dt).min(p.max_fall_speed);

    let report = physics::move_with_collisions(&mut enemy.body, grid, dt, MoveOptions::default());
    enemy.on_ground = report.landed;
    if report.fell_out {
        enemy.body.active = false;
        return;
    }

    if report.hit_left {
        enemy.direction = 1.0;
    } else if report.hit_right {
        enemy.direction = -1.0;
    }

    if enemy.body.x <= enemy.min_x {
        enemy.body.x = enemy.min_x;
        enemy.direction = 1.0;
    } else if enemy.body.x >= enemy.max_x {
        enemy.body.x = enemy.max_x;
        enemy.direction = -1.0;
    } else if enemy.on_ground && !ground_ahead(enemy, grid) {
        enemy.direction = -enemy.direction;
    }

    enemy.walk_timer += dt;
    while enemy.walk_timer >= WALK_FRAME_SECS {
        enemy.walk_timer -= WALK_FRAME_SECS;
        enemy.walk_frame ^= 1;
    }
}

/// Is there something to stand on one pixel past the leading edge?
fn ground_ahead(enemy: &Enemy, grid: &TileGrid) -> bool {
    let b = &enemy.body;
    let probe_x = if enemy.direction > 0.0 { b.right() + 1.0 } else { b.x - 1.0 };
    let probe_y = b.bottom() + LEDGE_PROBE_DOWN;
    grid.tile_at_point(probe_x, probe_y).is_standable()
}
