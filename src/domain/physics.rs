/// Collision resolver: axis-separated AABB movement against the tile grid.
///
/// ## Order
///
///   1. X axis: integrate, clamp to the world, sweep the leading edge
///      across every column it crosses; snap flush on the first solid.
///   2. Y axis: integrate, then sweep rows from the previous edge to the
///      new one. Downward sweeps land on solids, and on one-way platforms
///      when allowed and the body was above the platform top (within
///      `ONE_WAY_SNAP`). Upward sweeps only consider solids and report
///      the tile that was struck.
///   3. Vertical clamp + fall-out detection.
///
/// One-way platforms never block horizontal or upward motion.
/// Bodies never move more than a tile per step at the tuned speeds,
/// but sweeps cover every crossed row/column regardless.

use super::entity::Body;
use super::tile::{TileGrid, TileKind};

/// Tolerance (px) above a one-way platform top that still counts as
/// "coming from above".
pub const ONE_WAY_SNAP: f32 = 6.0;

/// Edge inset so a body flush against a tile boundary is not inside it.
const EPS: f32 = 0.001;

#[derive(Clone, Copy, Debug)]
pub struct MoveOptions {
    pub allow_one_way: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        MoveOptions { allow_one_way: true }
    }
}

/// A tile struck by the body.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TileHit {
    pub tx: usize,
    pub ty: usize,
    pub kind: TileKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionReport {
    pub hit_left: bool,
    pub hit_right: bool,
    pub landed: bool,
    pub hit_ceiling: bool,
    pub ceiling_tile: Option<TileHit>,
    pub fell_out: bool,
}

impl CollisionReport {
    pub fn any_contact(&self) -> bool {
        self.hit_left || self.hit_right || self.landed || self.hit_ceiling || self.fell_out
    }
}

/// Move `body` by its velocity over `dt`, resolving tile collisions.
pub fn move_with_collisions(
    body: &mut Body,
    grid: &TileGrid,
    dt: f32,
    opts: MoveOptions,
) -> CollisionReport {
    let mut report = CollisionReport::default();
    resolve_x(body, grid, dt, &mut report);
    resolve_y(body, grid, dt, opts, &mut report);

    let ts = grid.tile_size;
    let world_h = grid.pixel_height();
    body.y = body.y.clamp(-world_h, world_h + 4.0 * ts);
    if body.y > world_h + 2.0 * ts {
        report.fell_out = true;
    }
    report
}

// ══════════════════════════════════════════════════════════════
// X axis
// ══════════════════════════════════════════════════════════════

fn resolve_x(body: &mut Body, grid: &TileGrid, dt: f32, report: &mut CollisionReport) {
    let ts = grid.tile_size;
    let prev_x = body.x;
    let target = prev_x + body.vx * dt;
    let max_x = (grid.pixel_width() - body.w).max(0.0);
    body.x = target.clamp(0.0, max_x);

    let row0 = grid.to_tile(body.y);
    let row1 = grid.to_tile(body.y + body.h - EPS);
    let solid_in_col = |col: i64| (row0..=row1).any(|row| grid.tile_at(col, row).is_solid());

    if body.x > prev_x {
        let c0 = grid.to_tile(prev_x + body.w - EPS);
        let c1 = grid.to_tile(body.x + body.w - EPS);
        if let Some(col) = (c0..=c1).find(|&c| solid_in_col(c)) {
            body.x = col as f32 * ts - body.w;
            body.vx = 0.0;
            report.hit_right = true;
            return;
        }
    } else if body.x < prev_x {
        let c0 = grid.to_tile(prev_x);
        let c1 = grid.to_tile(body.x);
        if let Some(col) = (c1..=c0).rev().find(|&c| solid_in_col(c)) {
            body.x = (col + 1) as f32 * ts;
            body.vx = 0.0;
            report.hit_left = true;
            return;
        }
    }

    // World edge
    if target < 0.0 {
        body.vx = 0.0;
        report.hit_left = true;
    } else if target > max_x {
        body.vx = 0.0;
        report.hit_right = true;
    }
}

// ══════════════════════════════════════════════════════════════
// Y axis
// ══════════════════════════════════════════════════════════════

fn resolve_y(
    body: &mut Body,
    grid: &TileGrid,
    dt: f32,
    opts: MoveOptions,
    report: &mut CollisionReport,
) {
    let ts = grid.tile_size;
    let prev_y = body.y;
    body.y += body.vy * dt;

    let col0 = grid.to_tile(body.x);
    let col1 = grid.to_tile(body.x + body.w - EPS);

    if body.vy > 0.0 {
        let prev_bottom = prev_y + body.h;
        let r0 = grid.to_tile(prev_bottom);
        let r1 = grid.to_tile(body.bottom()).max(r0);
        for row in r0..=r1 {
            let top = row as f32 * ts;
            let lands = (col0..=col1).any(|col| {
                let kind = grid.tile_at(col, row);
                kind.is_solid()
                    || (opts.allow_one_way && kind.is_one_way() && prev_bottom <= top + ONE_WAY_SNAP)
            });
            if lands {
                body.y = top - body.h;
                body.vy = 0.0;
                report.landed = true;
                return;
            }
        }
    } else if body.vy < 0.0 {
        let r0 = grid.to_tile(prev_y);
        let r1 = grid.to_tile(body.y).min(r0);
        for row in (r1..=r0).rev() {
            let first_solid = (col0..=col1).find(|&col| grid.tile_at(col, row).is_solid());
            let Some(first) = first_solid else { continue };

            // Prefer the tile directly above the body's centre.
            let centre = grid.to_tile(body.center_x());
            let col = if grid.tile_at(centre, row).is_solid() && (col0..=col1).contains(&centre) {
                centre
            } else {
                first
            };

            body.y = (row + 1) as f32 * ts;
            body.vy = 0.0;
            report.hit_ceiling = true;
            if col >= 0 && row >= 0 {
                report.ceiling_tile = Some(TileHit {
                    tx: col as usize,
                    ty: row as usize,
                    kind: grid.tile_at(col, row),
                });
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

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
    fn lands_on_ground() {
        let grid = tiles_from(&[
            "....",
            "....",
            "####",
        ]);
        let mut b = Body::new(10.0, 30.0, 24.0, 30.0);
        b.vy = 300.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.landed);
        assert_eq!(b.vy, 0.0);
        assert_eq!(b.bottom(), 64.0);
    }

    #[test]
    fn resting_body_relands_every_step() {
        let grid = tiles_from(&["....", "....", "####"]);
        let mut b = Body::new(10.0, 34.0, 24.0, 30.0);
        for _ in 0..10 {
            b.vy += 2200.0 * DT;
            let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
            assert!(r.landed);
            assert_eq!(b.bottom(), 64.0);
        }
    }

    #[test]
    fn wall_stops_horizontal() {
        let grid = tiles_from(&[
            "..#.",
            "..#.",
            "####",
        ]);
        let mut b = Body::new(30.0, 34.0, 24.0, 30.0);
        b.vx = 900.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.hit_right);
        assert_eq!(b.vx, 0.0);
        assert_eq!(b.right(), 64.0);
    }

    #[test]
    fn world_edge_clamps() {
        let grid = tiles_from(&["....", "####"]);
        let mut b = Body::new(2.0, 2.0, 24.0, 30.0);
        b.vx = -600.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.hit_left);
        assert_eq!(b.x, 0.0);
        assert_eq!(b.vx, 0.0);
    }

    #[test]
    fn one_way_lands_from_above_only() {
        let grid = tiles_from(&[
            "....",
            "....",
            "====",
            "....",
        ]);
        // Falling onto the platform from above.
        let mut b = Body::new(10.0, 30.0, 24.0, 30.0);
        b.vy = 400.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.landed);
        assert_eq!(b.bottom(), 64.0);

        // Jumping up through it from below.
        let mut b = Body::new(10.0, 70.0, 24.0, 30.0);
        b.vy = -600.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(!r.hit_ceiling);
        assert!(b.y < 70.0);

        // Already past the top by more than the snap: falls through.
        let mut b = Body::new(10.0, 64.0 - 30.0 + ONE_WAY_SNAP + 2.0, 24.0, 30.0);
        b.vy = 300.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(!r.landed);
    }

    #[test]
    fn drop_through_ignores_one_way() {
        let grid = tiles_from(&["....", "....", "====", "...."]);
        let mut b = Body::new(10.0, 34.0, 24.0, 30.0);
        b.vy = 200.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions { allow_one_way: false });
        assert!(!r.landed);
        assert!(b.bottom() > 64.0);
    }

    #[test]
    fn ceiling_reports_tile_under_centre() {
        let grid = tiles_from(&[
            ".?B.",
            "....",
            "....",
            "####",
        ]);
        // Body straddles columns 1 and 2, centre over column 2.
        let mut b = Body::new(56.0, 33.0, 24.0, 30.0);
        b.vy = -600.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.hit_ceiling);
        assert_eq!(b.y, 32.0);
        assert_eq!(b.vy, 0.0);
        let hit = r.ceiling_tile.unwrap();
        assert_eq!((hit.tx, hit.ty, hit.kind), (2, 0, TileKind::Brick));

        // Centre over the question block.
        let mut b = Body::new(36.0, 33.0, 24.0, 30.0);
        b.vy = -600.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert_eq!(r.ceiling_tile.unwrap().kind, TileKind::Question);
    }

    #[test]
    fn falls_out_below_world() {
        let grid = tiles_from(&["....", "...."]);
        let mut b = Body::new(10.0, 120.0, 24.0, 30.0);
        b.vy = 900.0;
        let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
        assert!(r.fell_out);
        assert!(b.y <= 64.0 + 4.0 * 32.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn overlaps_solid(b: &Body, grid: &TileGrid) -> bool {
            let m = 0.01;
            for ty in 0..grid.height {
                for tx in 0..grid.width {
                    if !grid.tile_at(tx as i64, ty as i64).is_solid() { continue; }
                    let (x, y) = (tx as f32 * 32.0, ty as f32 * 32.0);
                    if b.x + m < x + 32.0 && b.right() - m > x && b.y + m < y + 32.0 && b.bottom() - m > y {
                        return true;
                    }
                }
            }
            false
        }

        proptest! {
            #[test]
            fn never_ends_inside_a_solid(
                x in 0.0f32..296.0,
                y in 0.0f32..130.0,
                vx in -900.0f32..900.0,
                vy in -900.0f32..900.0,
                steps in 1usize..20,
            ) {
                let grid = tiles_from(&[
                    "..........",
                    "...#....?.",
                    "......##..",
                    "..==......",
                    "#.........",
                    "##########",
                ]);
                let mut b = Body::new(x, y, 24.0, 30.0);
                prop_assume!(!overlaps_solid(&b, &grid));
                for _ in 0..steps {
                    b.vx = vx;
                    b.vy = vy;
                    let r = move_with_collisions(&mut b, &grid, DT, MoveOptions::default());
                    prop_assert!(!overlaps_solid(&b, &grid));
                    if r.landed {
                        prop_assert_eq!(b.vy, 0.0);
                        prop_assert_eq!(b.bottom() % 32.0, 0.0);
                    }
                }
            }
        }
    }
}
