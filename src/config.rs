/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete:
/// every table and every key is optional.
///
/// ```toml
/// [physics]
/// gravity = 2200.0
/// jump_velocity = -700.0
///
/// [session]
/// lives = 5
///
/// [gamepad]
/// jump = ["A"]
///
/// [general]
/// levels_dir = "levels"
/// ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub enemy: EnemyConfig,
    pub item: ItemConfig,
    pub projectile: ProjectileConfig,
    pub scoring: ScoringConfig,
    pub session: SessionConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
}

/// Player movement tuning. Pixels and seconds; y grows downward.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub tile_size: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub max_speed_x: f32,
    pub ground_accel: f32,
    pub ground_decel: f32,
    pub air_accel: f32,
    pub air_decel: f32,
    pub jump_velocity: f32,   // negative = up
    pub jump_buffer: f32,
    pub coyote_time: f32,
    pub jump_hold: f32,       // window in which holding jump softens gravity
    pub hold_gravity_scale: f32,
    pub short_hop_cut: f32,   // vy multiplier on early release
    pub stomp_bounce: f32,
    pub respawn_invulnerability: f32,
    pub fire_cooldown: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub width: f32,
    pub height: f32,
    pub walk_speed: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ItemConfig {
    pub coin_size: f32,
    pub power_size: f32,
    pub power_speed: f32,
    pub emerge_secs: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub size: f32,
    pub speed: f32,
    pub launch_vy: f32,
    pub gravity: f32,
    pub lifespan: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub coin: u64,
    pub power_item: u64,
    pub stomp: u64,
    pub shot: u64,
    pub level_bonus: u64,
    pub time_bonus_per_sec: u64,
    pub all_coins_bonus: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lives: i32,
    pub step_hz: f32,
    pub max_frame_ms: f32,      // real-time clamp per frame (spiral-of-death guard)
    pub snapshot_interval_ms: f32,
    pub level_transition_secs: f32,
    pub view_width: f32,        // camera viewport width in pixels
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub action: Vec<String>,
    pub start: Vec<String>,
    pub restart: Vec<String>,
    pub down: Vec<String>,
}

// ── Defaults ──

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            tile_size: 32.0,
            gravity: 2200.0,
            max_fall_speed: 900.0,
            player_width: 24.0,
            player_height: 30.0,
            max_speed_x: 240.0,
            ground_accel: 1800.0,
            ground_decel: 2200.0,
            air_accel: 1100.0,
            air_decel: 700.0,
            jump_velocity: -700.0,
            jump_buffer: 0.11,
            coyote_time: 0.09,
            jump_hold: 0.18,
            hold_gravity_scale: 0.45,
            short_hop_cut: 0.45,
            stomp_bounce: -460.0,
            respawn_invulnerability: 2.0,
            fire_cooldown: 0.28,
        }
    }
}

impl Default for EnemyConfig {
    fn default() -> Self {
        EnemyConfig { width: 28.0, height: 28.0, walk_speed: 70.0 }
    }
}

impl Default for ItemConfig {
    fn default() -> Self {
        ItemConfig { coin_size: 20.0, power_size: 26.0, power_speed: 90.0, emerge_secs: 0.5 }
    }
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        ProjectileConfig { size: 10.0, speed: 420.0, launch_vy: -80.0, gravity: 320.0, lifespan: 1.1 }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            coin: 100,
            power_item: 500,
            stomp: 200,
            shot: 150,
            level_bonus: 1000,
            time_bonus_per_sec: 10,
            all_coins_bonus: 500,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            lives: 3,
            step_hz: 60.0,
            max_frame_ms: 250.0,
            snapshot_interval_ms: 90.0,
            level_transition_secs: 1.6,
            view_width: 640.0,
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            jump: vec!["A".into()],
            action: vec!["B".into(), "X".into()],
            start: vec!["Start".into()],
            restart: vec!["Select".into()],
            down: vec![],
        }
    }
}

impl SessionConfig {
    /// Fixed step length in seconds.
    pub fn step_secs(&self) -> f32 {
        1.0 / self.step_hz.max(1.0)
    }
}

// ── TOML Schema ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: PhysicsConfig,
    #[serde(default)]
    enemy: EnemyConfig,
    #[serde(default)]
    item: ItemConfig,
    #[serde(default)]
    projectile: ProjectileConfig,
    #[serde(default)]
    scoring: ScoringConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    gamepad: GamepadConfig,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, XDG data home, system data dir.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly (no filesystem search for the file
    /// itself; `levels_dir` is still resolved relative to `base`).
    pub fn from_toml_str(text: &str, base: &Path) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config parse error: {e}; using default settings");
                TomlConfig::default()
            }
        };
        Self::from_toml(toml_cfg, &[base.to_path_buf()])
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut session = toml_cfg.session;
        if !session.step_hz.is_finite() || session.step_hz < 1.0 {
            log::warn!("session.step_hz = {} is invalid; using 60", session.step_hz);
            session.step_hz = 60.0;
        }

        let mut physics = toml_cfg.physics;
        if !physics.tile_size.is_finite() || physics.tile_size < 1.0 {
            log::warn!("physics.tile_size = {} is invalid; using 32", physics.tile_size);
            physics.tile_size = 32.0;
        }

        GameConfig {
            physics,
            enemy: toml_cfg.enemy,
            item: toml_cfg.item,
            projectile: toml_cfg.projectile,
            scoring: toml_cfg.scoring,
            session,
            gamepad: toml_cfg.gamepad,
            levels_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilehop");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/tilehop");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    log::debug!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{} parse error: {e}; using default settings", path.display());
                    return TomlConfig::default();
                }
            },
            Err(e) => log::warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}
