/// Entities: shared `Body` plus the per-type records (Enemy, Item, Projectile).
/// The Player lives in `player.rs`; walker AI lives in `ai.rs`.
///
/// Entities are destroyed by clearing `body.active`; the step filters
/// inactive records once, after all interactions have run.

use serde::Serialize;

use super::physics::{self, MoveOptions};
use super::tile::TileGrid;
use crate::config::GameConfig;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// -1.0 for left, 1.0 for right.
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Body: axis-aligned box, top-left origin, y grows downward
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub vx: f32,
    pub vy: f32,
    pub active: bool,
}

impl Body {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Body { x, y, w, h, vx: 0.0, vy: 0.0, active: true }
    }

    /// Body sized `w × h` standing on the floor of tile `(tx, ty)`,
    /// horizontally centred in the tile.
    pub fn on_tile(tx: usize, ty: usize, w: f32, h: f32, tile_size: f32) -> Self {
        let x = tx as f32 * tile_size + (tile_size - w) / 2.0;
        let y = (ty as f32 + 1.0) * tile_size - h;
        Body::new(x, y, w, h)
    }

    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn bottom(&self) -> f32 { self.y + self.h }
    pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }

    /// Strict AABB overlap (touching edges do not count).
    pub fn overlaps(&self, other: &Body) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Overlap against a raw rectangle.
    pub fn overlaps_rect(&self, x: f32, y: f32, w: f32, h: f32) -> bool {
        self.x < x + w && self.right() > x && self.y < y + h && self.bottom() > y
    }
}

// ══════════════════════════════════════════════════════════════
// Enemy
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Walker,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub body: Body,
    pub direction: f32,  // -1.0 or 1.0
    pub min_x: f32,      // patrol bounds (pixels, body left edge)
    pub max_x: f32,
    pub on_ground: bool,
    pub walk_timer: f32,
    pub walk_frame: u8,  // 0/1 cosmetic walk cycle
}

impl Enemy {
    /// Walker spawned on tile `(tx, ty)` patrolling `radius` tiles each way.
    pub fn walker(id: u32, tx: usize, ty: usize, radius: u32, config: &GameConfig) -> Self {
        let ts = config.physics.tile_size;
        let (w, h) = (config.enemy.width, config.enemy.height);
        let body = Body::on_tile(tx, ty, w, h, ts);
        let r = radius.max(1) as f32;
        let min_x = ((tx as f32 - r) * ts).max(0.0);
        let max_x = ((tx as f32 + r + 1.0) * ts - w).max(min_x);
        Enemy {
            id,
            kind: EnemyKind::Walker,
            body,
            direction: -1.0,
            min_x,
            max_x,
            on_ground: false,
            walk_timer: 0.0,
            walk_frame: 0,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Item
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Coin,
    PowerItem,
}

impl ItemKind {
    /// Authoring name → kind. Accepts the power-item aliases.
    pub fn from_name(name: &str) -> Option<ItemKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "coin" => Some(ItemKind::Coin),
            "power" | "power_item" | "powerup" | "mushroom" => Some(ItemKind::PowerItem),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    pub id: u32,
    pub kind: ItemKind,
    pub body: Body,
    pub bob_timer: f32,
    /// Seconds left rising out of a block. Zero once emerged.
    pub emerge_remaining: f32,
    pub emerge_rate: f32,
    pub direction: f32,
}

impl Item {
    pub fn coin(id: u32, tx: usize, ty: usize, config: &GameConfig) -> Self {
        let ts = config.physics.tile_size;
        let s = config.item.coin_size;
        // Coins float in the middle of their tile.
        let body = Body::new(
            tx as f32 * ts + (ts - s) / 2.0,
            ty as f32 * ts + (ts - s) / 2.0,
            s, s,
        );
        Item { id, kind: ItemKind::Coin, body, bob_timer: 0.0, emerge_remaining: 0.0, emerge_rate: 0.0, direction: 0.0 }
    }

    /// Power item resting on tile `(tx, ty)`, already emerged.
    pub fn power(id: u32, tx: usize, ty: usize, config: &GameConfig) -> Self {
        let ts = config.physics.tile_size;
        let s = config.item.power_size;
        let mut body = Body::on_tile(tx, ty, s, s, ts);
        body.vx = config.item.power_speed;
        Item { id, kind: ItemKind::PowerItem, body, bob_timer: 0.0, emerge_remaining: 0.0, emerge_rate: 0.0, direction: 1.0 }
    }

    /// Power item rising out of the block at `(tx, ty)`: starts inside the
    /// block and ends resting on top of it after `emerge_secs`.
    pub fn emerging_power(id: u32, tx: usize, ty: usize, config: &GameConfig) -> Self {
        let ts = config.physics.tile_size;
        let s = config.item.power_size;
        let secs = config.item.emerge_secs.max(0.0);
        let body = Body::new(
            tx as f32 * ts + (ts - s) / 2.0,
            (ty as f32 + 1.0) * ts - s,
            s, s,
        );
        let (remaining, rate) = if secs > 0.0 { (secs, ts / secs) } else { (0.0, 0.0) };
        let mut item = Item {
            id, kind: ItemKind::PowerItem, body,
            bob_timer: 0.0, emerge_remaining: remaining, emerge_rate: rate, direction: 1.0,
        };
        if remaining == 0.0 {
            item.body.y -= ts;
            item.body.vx = config.item.power_speed;
        }
        item
    }

    pub fn is_emerged(&self) -> bool {
        self.emerge_remaining <= 0.0
    }

    /// Coins only bob. Power items emerge, then walk with gravity.
    pub fn update(&mut self, grid: &TileGrid, config: &GameConfig, dt: f32) {
        if !self.body.active { return; }
        self.bob_timer += dt;
        if self.kind == ItemKind::Coin { return; }

        if self.emerge_remaining > 0.0 {
            let t = dt.min(self.emerge_remaining);
            self.body.y -= self.emerge_rate * t;
            self.emerge_remaining -= t;
            if self.emerge_remaining <= 0.0 {
                self.emerge_remaining = 0.0;
            }
            return;
        }

        let p = &config.physics;
        self.body.vx = self.direction * config.item.power_speed;
        self.body.vy = (self.body.vy + p.gravity * dt).min(p.max_fall_speed);
        let report = physics::move_with_collisions(&mut self.body, grid, dt, MoveOptions::default());
        if report.hit_left || report.hit_right {
            self.direction = -self.direction;
        }
        if report.fell_out {
            self.body.active = false;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Projectile
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Projectile {
    pub id: u32,
    pub body: Body,
    pub direction: f32,
    pub lifespan: f32,
}

impl Projectile {
    /// Launched from the front of `from` at mid height.
    pub fn fire(id: u32, from: &Body, facing: Facing, config: &GameConfig) -> Self {
        let pc = &config.projectile;
        let dir = facing.sign();
        let x = if dir > 0.0 { from.right() } else { from.x - pc.size };
        let y = from.y + from.h / 2.0 - pc.size / 2.0;
        let mut body = Body::new(x, y, pc.size, pc.size);
        body.vx = dir * pc.speed;
        body.vy = pc.launch_vy;
        Projectile { id, body, direction: dir, lifespan: pc.lifespan }
    }

    /// Any tile contact or expiry ends the projectile.
    pub fn update(&mut self, grid: &TileGrid, config: &GameConfig, dt: f32) {
        if !self.body.active { return; }
        self.lifespan -= dt;
        if self.lifespan <= 0.0 {
            self.body.active = false;
            return;
        }
        self.body.vy = (self.body.vy + config.projectile.gravity * dt).min(config.physics.max_fall_speed);
        let report = physics::move_with_collisions(&mut self.body, grid, dt, MoveOptions::default());
        if report.any_contact() {
            self.body.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::TileKind;

    fn tiles_from(rows: &[&str]) -> TileGrid {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let tiles = rows.iter()
            .map(|r| {
                let mut row: Vec<TileKind> = r.chars().map(TileKind::from_char).collect();
                row.resize(width, TileKind::Empty);
                row
            })
            .collect();
        TileGrid::new(tiles, width, 32.0)
    }

    #[test]
    fn item_aliases() {
        assert_eq!(ItemKind::from_name("coin"), Some(ItemKind::Coin));
        assert_eq!(ItemKind::from_name("Mushroom"), Some(ItemKind::PowerItem));
        assert_eq!(ItemKind::from_name("powerup"), Some(ItemKind::PowerItem));
        assert_eq!(ItemKind::from_name("star"), None);
    }

    #[test]
    fn walker_bounds_follow_radius() {
        let cfg = GameConfig::default();
        let e = Enemy::walker(1, 5, 3, 2, &cfg);
        assert_eq!(e.min_x, 3.0 * 32.0);
        assert_eq!(e.max_x, 8.0 * 32.0 - 28.0);
    }

    #[test]
    fn power_item_rises_then_walks() {
        let cfg = GameConfig::default();
        let grid = tiles_from(&[
            "......",
            "..?...",
            "......",
            "######",
        ]);
        let mut item = Item::emerging_power(1, 2, 1, &cfg);
        let start_y = item.body.y;
        assert!(!item.is_emerged());
        for _ in 0..40 {
            item.update(&grid, &cfg, 1.0 / 60.0);
        }
        assert!(item.is_emerged());
        assert!(item.body.y < start_y);
        assert!(item.body.vx.abs() > 0.0);
    }

    #[test]
    fn projectile_dies_on_wall() {
        let cfg = GameConfig::default();
        let grid = tiles_from(&[
            "......#",
            "......#",
            "#######",
        ]);
        let shooter = Body::on_tile(3, 1, 24.0, 30.0, 32.0);
        let mut p = Projectile::fire(1, &shooter, Facing::Right, &cfg);
        for _ in 0..30 {
            p.update(&grid, &cfg, 1.0 / 60.0);
        }
        assert!(!p.body.active);
    }

    #[test]
    fn projectile_expires() {
        let cfg = GameConfig::default();
        let grid = tiles_from(&["...................................................."]);
        let shooter = Body::new(0.0, -400.0, 24.0, 30.0);
        let mut p = Projectile::fire(1, &shooter, Facing::Right, &cfg);
        p.lifespan = 0.05;
        p.update(&grid, &cfg, 0.03);
        assert!(p.body.active);
        p.update(&grid, &cfg, 0.03);
        assert!(!p.body.active);
    }
}
