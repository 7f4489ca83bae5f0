/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame from the tile grid and a snapshot into `front`
///   2. Compare each cell with `back` (the previous frame)
///   3. Emit terminal commands only for changed cells, batched with `queue!`
///   4. Swap front/back
///
/// One tile is two terminal columns by one row. The view starts at the
/// snapshot's camera position and extends as far as the terminal allows.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::ItemKind;
use crate::domain::tile::{TileGrid, TileKind};
use crate::sim::snapshot::Snapshot;
use crate::sim::world::Screen;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Cell {
    /// Explicit dark background for every empty cell, so terminals never
    /// fall back to their own default between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell, so every position gets diffed.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

pub struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    pub fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// Row as plain text, for tests.
    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Layout ──

/// Terminal columns per tile.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

fn tile_cell(kind: TileKind) -> (char, Color, Color) {
    match kind {
        TileKind::Empty => (' ', Color::White, Cell::BASE_BG),
        TileKind::Ground => ('█', Color::Rgb { r: 150, g: 90, b: 40 }, Cell::BASE_BG),
        TileKind::Brick => ('▓', Color::Rgb { r: 200, g: 80, b: 50 }, Cell::BASE_BG),
        TileKind::Pipe => ('║', Color::Rgb { r: 60, g: 200, b: 80 }, Cell::BASE_BG),
        TileKind::Question => ('?', Color::Black, Color::Rgb { r: 240, g: 190, b: 40 }),
        TileKind::OneWay => ('═', Color::Rgb { r: 180, g: 180, b: 200 }, Cell::BASE_BG),
    }
}

/// Build one frame. Pure: no terminal I/O.
pub fn compose(buf: &mut FrameBuffer, grid: &TileGrid, snap: &Snapshot) {
    buf.clear();
    compose_hud(buf, snap);

    let ts = grid.tile_size.max(1.0) as f64;
    let view_rows = grid.height.min(buf.height.saturating_sub(MAP_ROW + 2));
    let view_cols = (buf.width / CELL_W).min(grid.width);
    let first_col = (snap.camera_x / ts).floor().max(0.0) as usize;
    let first_col = first_col.min(grid.width.saturating_sub(view_cols));

    // Tiles.
    for vy in 0..view_rows {
        for vx in 0..view_cols {
            let (ch, fg, bg) = tile_cell(grid.tile_at((first_col + vx) as i64, vy as i64));
            for k in 0..CELL_W {
                buf.set(vx * CELL_W + k, MAP_ROW + vy, Cell::new(ch, fg, bg));
            }
        }
    }

    // Entities at their centre tile. Off-view ones are skipped.
    let mut put = |x: f64, y: f64, w: f64, h: f64, glyph: &str, fg: Color| {
        let tx = ((x + w / 2.0) / ts).floor();
        let ty = ((y + h / 2.0) / ts).floor();
        if tx < first_col as f64 || ty < 0.0 { return; }
        let (vx, vy) = (tx as usize - first_col, ty as usize);
        if vx >= view_cols || vy >= view_rows { return; }
        buf.put_str(vx * CELL_W, MAP_ROW + vy, glyph, fg, Cell::BASE_BG);
    };

    put(snap.goal.x, snap.goal.y, ts, ts, "|>", Color::Rgb { r: 80, g: 255, b: 80 });
    for item in &snap.items {
        match item.kind {
            ItemKind::Coin => put(item.x, item.y, ts * 0.6, ts * 0.6, "()", Color::Rgb { r: 255, g: 220, b: 50 }),
            ItemKind::PowerItem => put(item.x, item.y, ts * 0.8, ts * 0.8, "<>", Color::Rgb { r: 255, g: 120, b: 200 }),
        }
    }
    for enemy in &snap.enemies {
        put(enemy.x, enemy.y, ts * 0.9, ts * 0.9, "Ww", Color::Rgb { r: 255, g: 80, b: 80 });
    }
    for shot in &snap.projectiles {
        put(shot.x, shot.y, 0.0, 0.0, "**", Color::Rgb { r: 255, g: 160, b: 40 });
    }
    let p = &snap.player;
    let glyph = if p.facing.sign() < 0.0 { "<@" } else { "@>" };
    let fg = if p.power_level > 0 { Color::Rgb { r: 120, g: 220, b: 255 } } else { Color::White };
    put(p.x, p.y, ts * 0.75, ts * 0.95, glyph, fg);

    // Message bar.
    let msg_row = MAP_ROW + view_rows + 1;
    if msg_row < buf.height && !snap.message.is_empty() {
        buf.fill_row(msg_row, MSG_BG);
        buf.put_str(1, msg_row, &snap.message, Color::Black, MSG_BG);
    }

    compose_screen(buf, snap, view_rows);
}

fn compose_hud(buf: &mut FrameBuffer, snap: &Snapshot) {
    let hud = format!(
        " {:<12} Score:{:<7} Lives:{}  Coins:{}/{}  Time:{:>3}  Lv {}/{}",
        snap.level_name,
        snap.score,
        snap.lives.max(0),
        snap.coins_collected,
        snap.coin_target,
        snap.time_left.ceil() as i64,
        snap.level_index + 1,
        snap.level_count,
    );
    buf.fill_row(HUD_ROW, HUD_BG);
    buf.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
}

/// Centered banner for the non-playing screens.
fn compose_screen(buf: &mut FrameBuffer, snap: &Snapshot, view_rows: usize) {
    let (title, hint) = match snap.screen {
        Screen::Playing => return,
        Screen::Start => ("TILE HOP", "Enter: start   Esc: quit"),
        Screen::LevelComplete => ("LEVEL CLEAR", ""),
        Screen::GameOver => ("GAME OVER", "Enter: new run   Esc: quit"),
        Screen::GameComplete => ("ALL LEVELS CLEAR", "Enter: new run   Esc: quit"),
    };
    let row = MAP_ROW + view_rows / 2;
    let center = |s: &str| buf_center(buf.width, s);
    let (tx, hx) = (center(title), center(hint));
    let dim = Color::Rgb { r: 40, g: 40, b: 40 };
    buf.put_str(tx, row.saturating_sub(1), title, Color::Rgb { r: 255, g: 220, b: 50 }, dim);
    if !hint.is_empty() {
        buf.put_str(hx, row + 1, hint, Color::Rgb { r: 180, g: 180, b: 180 }, dim);
    }
}

fn buf_center(width: usize, s: &str) -> usize {
    width.saturating_sub(s.chars().count()) / 2
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    last_screen: Option<Screen>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.front.resize(tw as usize, th as usize);
        self.back.resize(tw as usize, th as usize);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, grid: &TileGrid, snap: &Snapshot) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let (tw, th) = (tw as usize, th as usize);
        if tw != self.front.width || th != self.front.height || self.last_screen != Some(snap.screen) {
            self.front.resize(tw, th);
            self.back.resize(tw, th);
            self.back.cells.fill(Cell::INVALID);
            self.last_screen = Some(snap.screen);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        compose(&mut self.front, grid, snap);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }
        self.writer.flush()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::input::InputController;
    use crate::sim::engine::Engine;
    use crate::sim::level::{normalize_level, parse_level_file};

    fn engine() -> Engine {
        let text = r#"
            rows = ['..........', '..o.......', '......?...', '##########']
            spawn = { x = 1, y = 2 }
            goal = { x = 8, y = 2 }
        "#;
        let templates = parse_level_file(text).unwrap()
            .iter()
            .enumerate()
            .map(|(i, r)| normalize_level(r, i, 32.0))
            .collect();
        Engine::new(templates, GameConfig::default(), InputController::new()).unwrap()
    }

    #[test]
    fn draws_tiles_and_player() {
        let mut e = engine();
        e.start();
        e.advance_time(500.0);
        let mut buf = FrameBuffer::new(40, 10);
        compose(&mut buf, e.grid(), &e.snapshot());

        assert!(buf.row_text(MAP_ROW + 3).starts_with("████"));
        assert_eq!(buf.get(12, MAP_ROW + 2).ch, '?');
        let player_row = buf.row_text(MAP_ROW + 2);
        assert_eq!(&player_row[..4], "  @>");
        assert!(buf.row_text(HUD_ROW).contains("Score:0"));
    }

    #[test]
    fn start_screen_shows_banner() {
        let e = engine();
        let mut buf = FrameBuffer::new(40, 10);
        compose(&mut buf, e.grid(), &e.snapshot());
        let text: String = (0..buf.height).map(|y| buf.row_text(y)).collect();
        assert!(text.contains("TILE HOP"));
    }

    #[test]
    fn tiny_buffer_does_not_panic() {
        let e = engine();
        let mut buf = FrameBuffer::new(3, 1);
        compose(&mut buf, e.grid(), &e.snapshot());
    }
}
