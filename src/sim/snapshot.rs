/// Read-only projection of the world for hosts.
///
/// Plain data, serializable to JSON. Numbers are rounded to two decimals
/// so consecutive snapshots compare cleanly.

use serde::Serialize;

use crate::domain::entity::{EnemyKind, Facing, ItemKind};
use crate::domain::player::PlayerAnim;
use super::world::{Screen, World};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub screen: Screen,
    pub score: u64,
    pub lives: i32,
    pub level_index: usize,
    pub level_count: usize,
    pub level_name: String,
    pub time_left: f64,
    pub time_limit: f64,
    pub coins_collected: u32,
    pub coin_target: u32,
    pub message: String,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub items: Vec<ItemView>,
    pub projectiles: Vec<ProjectileView>,
    pub goal: PointView,
    pub camera_x: f64,
    pub step: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerView {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub on_ground: bool,
    pub facing: Facing,
    pub power_level: u32,
    pub anim: PlayerAnim,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnemyView {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: f64,
    pub y: f64,
    pub direction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemView {
    pub id: u32,
    pub kind: ItemKind,
    pub x: f64,
    pub y: f64,
    pub direction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectileView {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub direction: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointView {
    pub x: f64,
    pub y: f64,
}

fn round2(v: f32) -> f64 {
    (v as f64 * 100.0).round() / 100.0
}

impl Snapshot {
    pub fn capture(world: &World) -> Snapshot {
        let p = &world.player;
        let ts = world.level.grid.tile_size;
        Snapshot {
            screen: world.screen,
            score: world.score,
            lives: world.lives,
            level_index: world.level.index,
            level_count: world.level_count(),
            level_name: world.level.name.clone(),
            time_left: round2(world.time_left.max(0.0)),
            time_limit: round2(world.level.time_limit),
            coins_collected: world.coins_collected,
            coin_target: world.level.coin_target,
            message: world.message.clone(),
            player: PlayerView {
                x: round2(p.body.x),
                y: round2(p.body.y),
                vx: round2(p.body.vx),
                vy: round2(p.body.vy),
                on_ground: p.on_ground,
                facing: p.facing,
                power_level: p.power_level,
                anim: p.anim,
            },
            enemies: world.enemies.iter()
                .filter(|e| e.body.active)
                .map(|e| EnemyView {
                    id: e.id,
                    kind: e.kind,
                    x: round2(e.body.x),
                    y: round2(e.body.y),
                    direction: round2(e.direction),
                })
                .collect(),
            items: world.items.iter()
                .filter(|i| i.body.active)
                .map(|i| ItemView {
                    id: i.id,
                    kind: i.kind,
                    x: round2(i.body.x),
                    y: round2(i.body.y),
                    direction: round2(i.direction),
                })
                .collect(),
            projectiles: world.projectiles.iter()
                .filter(|p| p.body.active)
                .map(|p| ProjectileView {
                    id: p.id,
                    x: round2(p.body.x),
                    y: round2(p.body.y),
                    direction: round2(p.direction),
                })
                .collect(),
            goal: PointView {
                x: round2(world.level.goal.x as f32 * ts),
                y: round2(world.level.goal.y as f32 * ts),
            },
            camera_x: round2(world.camera.x),
            step: world.tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.126), 0.13);
        assert_eq!(round2(10.0), 10.0);
    }
}
