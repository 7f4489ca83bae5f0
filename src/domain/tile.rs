/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    #[default]
    Empty,
    Ground,
    Brick,
    Pipe,
    Question, // Reward block, struck from below
    OneWay,   // Platform: blocks landing from above only
}

impl TileKind {
    /// Authoring code → tile. Unknown characters are empty space.
    pub fn from_char(ch: char) -> TileKind {
        match ch {
            '#' => TileKind::Ground,
            'B' => TileKind::Brick,
            'P' => TileKind::Pipe,
            '?' => TileKind::Question,
            '=' => TileKind::OneWay,
            _ => TileKind::Empty,
        }
    }

    /// Blocks movement from every side.
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Ground | TileKind::Brick | TileKind::Pipe | TileKind::Question)
    }

    pub fn is_one_way(self) -> bool {
        matches!(self, TileKind::OneWay)
    }

    /// Something an entity can stand on (solid or one-way).
    pub fn is_standable(self) -> bool {
        self.is_solid() || self.is_one_way()
    }
}

/// Tile coordinate (column, row).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct TilePos {
    pub x: usize,
    pub y: usize,
}

impl TilePos {
    pub fn new(x: usize, y: usize) -> Self {
        TilePos { x, y }
    }
}

/// Fixed-size tile grid. Row-major, `tiles[y][x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    pub tiles: Vec<Vec<TileKind>>,
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
}

impl TileGrid {
    pub fn new(tiles: Vec<Vec<TileKind>>, width: usize, tile_size: f32) -> Self {
        let height = tiles.len();
        TileGrid { tiles, width, height, tile_size }
    }

    /// Tile at a signed coordinate. Anything outside the grid is empty.
    #[inline]
    pub fn tile_at(&self, tx: i64, ty: i64) -> TileKind {
        if tx < 0 || ty < 0 {
            return TileKind::Empty;
        }
        let (x, y) = (tx as usize, ty as usize);
        if x >= self.width || y >= self.height {
            return TileKind::Empty;
        }
        self.tiles[y].get(x).copied().unwrap_or_default()
    }

    /// Tile containing a pixel coordinate.
    #[inline]
    pub fn tile_at_point(&self, px: f32, py: f32) -> TileKind {
        self.tile_at(self.to_tile(px), self.to_tile(py))
    }

    /// Pixel → tile index (floor, signed).
    #[inline]
    pub fn to_tile(&self, px: f32) -> i64 {
        (px / self.tile_size).floor() as i64
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_size
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_size
    }
}
