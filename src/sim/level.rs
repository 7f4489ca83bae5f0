/// Level model and loader.
///
/// ## Sources (priority order):
///   1. `*.toml` files in `levels_dir`, sorted by file name
///   2. Built-in embedded levels
///
/// ## File format (TOML):
///   ```toml
///   [[levels]]                      # or a single level at top level
///   name = "Level 1"
///   time_limit = 150
///   goal_requires_all_coins = false
///   spawn = { x = 2, y = 9 }
///   goal = { x = 45, y = 9 }
///   rows = ["....", "####"]
///   [[levels.items]]
///   type = "coin"                   # coin | power (power_item, powerup, mushroom)
///   x = 3
///   y = 8
///   [[levels.enemies]]
///   type = "walker"
///   x = 10
///   y = 9
///   patrol = 3
///   [[levels.rewards]]
///   x = 12                          # must point at a '?' tile
///   y = 4
///   reward = "power"
///   ```
///
/// ## Tile legend:
///   '#' = Ground   'B' = Brick   'P' = Pipe
///   '?' = Question block         '=' = One-way platform
///   anything else = Empty
///
/// Normalization never fails: every field is coerced or defaulted.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::GameConfig;
use crate::domain::entity::{EnemyKind, ItemKind};
use crate::domain::tile::{TileGrid, TileKind, TilePos};

const DEFAULT_TIME_LIMIT: f64 = 120.0;
const MIN_TIME_LIMIT: f64 = 30.0;
const DEFAULT_PATROL: f64 = 3.0;
const MIN_PATROL: f64 = 1.0;

// ══════════════════════════════════════════════════════════════
// Raw (authored) form
// ══════════════════════════════════════════════════════════════

/// A level as authored. Every field stays a raw TOML value until
/// normalization, so one badly typed field never rejects the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTemplate {
    pub name: Option<toml::Value>,
    pub rows: Option<toml::Value>,
    pub spawn: Option<toml::Value>,
    pub goal: Option<toml::Value>,
    pub time_limit: Option<toml::Value>,
    pub goal_requires_all_coins: Option<toml::Value>,
    pub items: Option<toml::Value>,
    pub enemies: Option<toml::Value>,
    pub rewards: Option<toml::Value>,
}

impl RawTemplate {
    pub fn from_table(t: &toml::Table) -> Self {
        let field = |key: &str| t.get(key).cloned();
        RawTemplate {
            name: field("name"),
            rows: field("rows"),
            spawn: field("spawn"),
            goal: field("goal"),
            time_limit: field("time_limit"),
            goal_requires_all_coins: field("goal_requires_all_coins"),
            items: field("items"),
            enemies: field("enemies"),
            rewards: field("rewards"),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Normalized form
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ItemSpawn {
    pub kind: ItemKind,
    pub pos: TilePos,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    pub pos: TilePos,
    pub patrol: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct QuestionBlock {
    pub used: bool,
    pub reward: ItemKind,
}

/// Immutable, validated level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelTemplate {
    pub name: String,
    pub grid: TileGrid,
    pub spawn: TilePos,
    pub goal: TilePos,
    pub time_limit: f32,
    pub goal_requires_all_coins: bool,
    pub items: Vec<ItemSpawn>,
    pub enemies: Vec<EnemySpawn>,
    pub question_blocks: BTreeMap<TilePos, QuestionBlock>,
    /// Coin items + coin question blocks. Fixed at load.
    pub coin_target: u32,
}

/// Mutable per-attempt copy of a template.
#[derive(Clone, Debug)]
pub struct LevelRuntime {
    pub index: usize,
    pub name: String,
    pub grid: TileGrid,
    pub spawn: TilePos,
    pub goal: TilePos,
    pub time_limit: f32,
    pub goal_requires_all_coins: bool,
    pub items: Vec<ItemSpawn>,
    pub enemies: Vec<EnemySpawn>,
    pub question_blocks: BTreeMap<TilePos, QuestionBlock>,
    pub coin_target: u32,
}

// ══════════════════════════════════════════════════════════════
// Coercion
// ══════════════════════════════════════════════════════════════

/// Finite number from an integer, float or numeric string.
fn num(v: Option<&toml::Value>) -> Option<f64> {
    let n = match v? {
        toml::Value::Integer(i) => *i as f64,
        toml::Value::Float(f) => *f,
        toml::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Tile coordinate: floored, never negative.
fn tile_coord(v: Option<&toml::Value>, fallback: f64) -> usize {
    num(v).unwrap_or(fallback).max(0.0).floor() as usize
}

fn flag(v: Option<&toml::Value>) -> bool {
    match v {
        Some(toml::Value::Boolean(b)) => *b,
        Some(toml::Value::Integer(i)) => *i != 0,
        Some(toml::Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn text(v: Option<&toml::Value>) -> Option<&str> {
    v.and_then(toml::Value::as_str)
}

/// Table entries of an authored list. Non-table entries and non-array
/// values are dropped one at a time.
fn entries<'a>(v: Option<&'a toml::Value>, what: &str) -> Vec<&'a toml::Table> {
    match v {
        None => vec![],
        Some(toml::Value::Array(list)) => list.iter()
            .filter_map(|e| {
                let t = e.as_table();
                if t.is_none() {
                    log::warn!("dropping malformed {what} entry {e}");
                }
                t
            })
            .collect(),
        Some(other) => {
            log::warn!("ignoring {what}: expected a list, got {}", other.type_str());
            vec![]
        }
    }
}

fn rows_of(v: Option<&toml::Value>) -> Vec<String> {
    match v {
        Some(toml::Value::Array(rows)) => rows.iter()
            .map(|r| r.as_str().map(str::to_string).unwrap_or_default())
            .collect(),
        _ => vec![],
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Validate an authored level. `index` only feeds the name fallback.
pub fn normalize_level(raw: &RawTemplate, index: usize, tile_size: f32) -> LevelTemplate {
    let rows = rows_of(raw.rows.as_ref());
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let height = rows.len();

    let tiles: Vec<Vec<TileKind>> = rows.iter()
        .map(|r| {
            let mut row: Vec<TileKind> = r.chars().map(TileKind::from_char).collect();
            row.resize(width, TileKind::Empty);
            row
        })
        .collect();
    let grid = TileGrid::new(tiles, width, tile_size);

    let name = match &raw.name {
        Some(toml::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => format!("Level {}", index + 1),
    };

    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);
    let point = |p: &Option<toml::Value>, fx: usize, fy: usize| {
        let (x, y) = match p {
            Some(toml::Value::Table(p)) => (tile_coord(p.get("x"), fx as f64), tile_coord(p.get("y"), fy as f64)),
            _ => (fx, fy),
        };
        TilePos::new(x.min(max_x), y.min(max_y))
    };
    let spawn = point(&raw.spawn, 1, height.saturating_sub(2));
    let goal = point(&raw.goal, width.saturating_sub(2), height.saturating_sub(2));

    let time_limit = num(raw.time_limit.as_ref())
        .unwrap_or(DEFAULT_TIME_LIMIT)
        .max(MIN_TIME_LIMIT) as f32;

    let at = |t: &toml::Table| TilePos::new(tile_coord(t.get("x"), 0.0), tile_coord(t.get("y"), 0.0));

    let items: Vec<ItemSpawn> = entries(raw.items.as_ref(), "item")
        .into_iter()
        .filter_map(|s| {
            let kind = text(s.get("type")).and_then(ItemKind::from_name);
            if kind.is_none() {
                log::warn!("{name}: dropping item with unknown type {:?}", s.get("type"));
            }
            Some(ItemSpawn { kind: kind?, pos: at(s) })
        })
        .collect();

    let enemies: Vec<EnemySpawn> = entries(raw.enemies.as_ref(), "enemy")
        .into_iter()
        .map(|s| EnemySpawn {
            kind: EnemyKind::Walker,
            pos: at(s),
            patrol: num(s.get("patrol")).unwrap_or(DEFAULT_PATROL).max(MIN_PATROL).floor() as u32,
        })
        .collect();

    // Power rewards keyed by tile; everything else stays a coin.
    let power_rewards: Vec<TilePos> = entries(raw.rewards.as_ref(), "reward")
        .into_iter()
        .filter(|r| text(r.get("reward")).and_then(ItemKind::from_name) == Some(ItemKind::PowerItem))
        .map(at)
        .collect();

    let mut question_blocks = BTreeMap::new();
    for (y, row) in grid.tiles.iter().enumerate() {
        for (x, &kind) in row.iter().enumerate() {
            if kind != TileKind::Question { continue; }
            let pos = TilePos::new(x, y);
            let reward = if power_rewards.contains(&pos) { ItemKind::PowerItem } else { ItemKind::Coin };
            question_blocks.insert(pos, QuestionBlock { used: false, reward });
        }
    }

    let coin_items = items.iter().filter(|i| i.kind == ItemKind::Coin).count();
    let coin_blocks = question_blocks.values().filter(|q| q.reward == ItemKind::Coin).count();

    LevelTemplate {
        name,
        grid,
        spawn,
        goal,
        time_limit,
        goal_requires_all_coins: flag(raw.goal_requires_all_coins.as_ref()),
        items,
        enemies,
        question_blocks,
        coin_target: (coin_items + coin_blocks) as u32,
    }
}

/// Fresh runtime copy of level `index`, wrapped into range
/// (negative indices count back from the end). `None` only when
/// `templates` is empty.
pub fn create_level_runtime(templates: &[LevelTemplate], index: i64) -> Option<LevelRuntime> {
    if templates.is_empty() {
        return None;
    }
    let i = index.rem_euclid(templates.len() as i64) as usize;
    let t = &templates[i];
    Some(LevelRuntime {
        index: i,
        name: t.name.clone(),
        grid: t.grid.clone(),
        spawn: t.spawn,
        goal: t.goal,
        time_limit: t.time_limit,
        goal_requires_all_coins: t.goal_requires_all_coins,
        items: t.items.clone(),
        enemies: t.enemies.clone(),
        question_blocks: t.question_blocks.clone(),
        coin_target: t.coin_target,
    })
}

/// Parse one level file: a `[[levels]]` array or a single level table.
/// Only TOML syntax errors fail; non-table entries in `levels` are dropped.
pub fn parse_level_file(text: &str) -> Result<Vec<RawTemplate>, toml::de::Error> {
    let table: toml::Table = toml::from_str(text)?;
    let levels = table.get("levels");
    if matches!(levels, Some(toml::Value::Array(list)) if !list.is_empty()) {
        return Ok(entries(levels, "level").into_iter().map(RawTemplate::from_table).collect());
    }
    Ok(vec![RawTemplate::from_table(&table)])
}

/// All templates: level files first, built-in levels when none load.
pub fn load_templates(config: &GameConfig) -> Vec<LevelTemplate> {
    let mut raws = load_from_directory(&config.levels_dir);
    if raws.is_empty() {
        log::debug!("no level files in {}; using built-in levels", config.levels_dir.display());
        raws = embedded_levels();
    }
    let ts = config.physics.tile_size;
    let templates: Vec<LevelTemplate> = raws.iter()
        .enumerate()
        .map(|(i, raw)| normalize_level(raw, i, ts))
        .collect();
    log::debug!("loaded {} level templates", templates.len());
    templates
}

// ══════════════════════════════════════════════════════════════
// Sources
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<RawTemplate> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };

    let mut paths: Vec<_> = entries.flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "toml"))
        .collect();
    paths.sort();

    let mut results = vec![];
    for path in paths {
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                continue;
            }
        };
        match parse_level_file(&text) {
            Ok(levels) => {
                let before = results.len();
                results.extend(levels.into_iter().filter(|l| l.rows.is_some()));
                if results.len() == before {
                    log::warn!("{}: no levels with rows; skipped", path.display());
                }
            }
            Err(e) => log::warn!("{}: {e}; skipped", path.display()),
        }
    }
    results
}

fn embedded_levels() -> Vec<RawTemplate> {
    parse_level_file(BUILTIN_LEVELS).unwrap_or_else(|e| {
        log::warn!("built-in levels failed to parse: {e}");
        vec![]
    })
}

const BUILTIN_LEVELS: &str = r#"
[[levels]]
name = 'Level 1 - Green Steps'
time_limit = 150
spawn = { x = 2, y = 9 }
goal = { x = 45, y = 9 }
rows = [
  '................................................',
  '................................................',
  '................................................',
  '................................................',
  '..........?B?...................................',
  '................................................',
  '..........................====..................',
  '................................................',
  '..................PP..................BB........',
  '..................PP.........PP.......BB........',
  '##############..################################',
  '##############..################################',
]
items = [
  { type = 'coin', x = 6, y = 9 },
  { type = 'coin', x = 7, y = 9 },
  { type = 'coin', x = 11, y = 3 },
  { type = 'coin', x = 26, y = 5 },
  { type = 'coin', x = 27, y = 5 },
]
enemies = [
  { type = 'walker', x = 24, y = 9, patrol = 3 },
  { type = 'walker', x = 34, y = 9, patrol = 2 },
]
rewards = [
  { x = 12, y = 4, reward = 'power' },
]

[[levels]]
name = 'Level 2 - Sky Bridges'
time_limit = 180
goal_requires_all_coins = true
spawn = { x = 1, y = 9 }
goal = { x = 54, y = 9 }
rows = [
  '........................................................',
  '........................................................',
  '........................................................',
  '...............?...............?........................',
  '........................................................',
  '..........=====.......====........=====.................',
  '........................................................',
  '......====..............................====............',
  '........................................................',
  '..................................................PP....',
  '########...#######....######....######....#####...######',
  '########...#######....######....######....#####...######',
]
items = [
  { type = 'coin', x = 12, y = 4 },
  { type = 'coin', x = 24, y = 4 },
  { type = 'coin', x = 36, y = 4 },
  { type = 'coin', x = 8, y = 6 },
  { type = 'coin', x = 42, y = 6 },
  { type = 'mushroom', x = 25, y = 4 },
]
enemies = [
  { type = 'walker', x = 15, y = 9, patrol = 2 },
  { type = 'walker', x = 35, y = 9, patrol = 1 },
  { type = 'walker', x = 45, y = 9, patrol = 1 },
]
rewards = [
  { x = 31, y = 3, reward = 'power' },
]

[[levels]]
name = 'Level 3 - Brick Fortress'
time_limit = 200
spawn = { x = 1, y = 9 }
goal = { x = 58, y = 9 }
rows = [
  '............................................................',
  '............................................................',
  '............................................................',
  '..............B?B?B.........................?...............',
  '............................................................',
  '.........................BBBBBB.........====................',
  '......................................................BBBB..',
  '..............................................PP......B.....',
  '...........PP.............................PP..PP......B.....',
  '...........PP.........###.................PP..PP......B.....',
  '######################...###############...#################',
  '######################...###############...#################',
]
items = [
  { type = 'coin', x = 26, y = 4 },
  { type = 'coin', x = 27, y = 4 },
  { type = 'coin', x = 28, y = 4 },
  { type = 'coin', x = 29, y = 4 },
  { type = 'coin', x = 42, y = 4 },
]
enemies = [
  { type = 'walker', x = 7, y = 9, patrol = 3 },
  { type = 'walker', x = 17, y = 9, patrol = 3 },
  { type = 'walker', x = 31, y = 9, patrol = 4 },
  { type = 'walker', x = 51, y = 9, patrol = 2 },
]
rewards = [
  { x = 15, y = 3, reward = 'power' },
]
"#;
