/// World: the complete state of a running session.
///
/// ## Level layers
///
///   - `templates`: validated levels. **Never mutated** after load.
///   - `level`    : the runtime copy for the current attempt
///     (tile grid, spawn lists, question-block state).
///
/// Every (re)load builds a fresh runtime and fresh entities, so nothing
/// an attempt does leaks into the next one.
///
/// ## Camera
///
/// Horizontal only. Follows the player with a dead zone and clamps to
/// the world; worlds narrower than the viewport pin the camera at 0.

use serde::Serialize;

use crate::config::GameConfig;
use crate::domain::entity::{Body, Enemy, EnemyKind, Item, ItemKind, Projectile};
use crate::domain::player::Player;
use crate::error::EngineError;
use super::event::GameEvent;
use super::level::{create_level_runtime, LevelRuntime, LevelTemplate};

/// How long the "Find all coins first" notice stays up (s).
const GOAL_NOTICE_SECS: f32 = 1.5;
/// Level name banner on load (s).
const LEVEL_BANNER_SECS: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Start,
    Playing,
    LevelComplete,
    GameOver,
    GameComplete,
}

impl Screen {
    /// Screens that only a new run leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Screen::Start | Screen::GameOver | Screen::GameComplete)
    }
}

/// Horizontal viewport into the world (pixels).
#[derive(Clone, Debug)]
pub struct Camera {
    pub x: f32,
    pub view_w: f32,
}

impl Camera {
    pub fn new(view_w: f32) -> Self {
        Camera { x: 0.0, view_w: view_w.max(1.0) }
    }

    /// Scroll only when the target leaves the middle 40% of the view.
    pub fn follow(&mut self, target_x: f32, world_w: f32) {
        let margin = self.view_w * 0.3;
        if target_x < self.x + margin {
            self.x = target_x - margin;
        } else if target_x > self.x + self.view_w - margin {
            self.x = target_x - self.view_w + margin;
        }
        self.clamp(world_w);
    }

    /// Snap to centre on the target (level load / respawn).
    pub fn center_on(&mut self, target_x: f32, world_w: f32) {
        self.x = target_x - self.view_w / 2.0;
        self.clamp(world_w);
    }

    fn clamp(&mut self, world_w: f32) {
        self.x = self.x.clamp(0.0, (world_w - self.view_w).max(0.0));
    }
}

pub struct World {
    pub config: GameConfig,
    pub templates: Vec<LevelTemplate>,
    pub level: LevelRuntime,
    pub screen: Screen,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub items: Vec<Item>,
    pub projectiles: Vec<Projectile>,

    // ── Session ──
    pub score: u64,
    pub lives: i32,
    pub time_left: f32,
    pub coins_collected: u32,
    pub tick: u64,

    // ── UI ──
    pub camera: Camera,
    pub message: String,
    pub message_timer: f32,
    pub transition_timer: f32,
    /// Set when something discrete happened outside the step's events
    /// (load, reset) so the next snapshot is not rate limited.
    pub force_snapshot: bool,

    next_id: u32,
}

// ── Construction ──

impl World {
    /// World on the start screen with level 0 loaded for display.
    pub fn new(templates: Vec<LevelTemplate>, config: GameConfig) -> Result<Self, EngineError> {
        let level = create_level_runtime(&templates, 0).ok_or(EngineError::NoLevels)?;
        let player = Player::new(Body::default());
        let mut world = World {
            camera: Camera::new(config.session.view_width),
            lives: config.session.lives,
            config,
            templates,
            level,
            screen: Screen::Start,
            player,
            enemies: vec![],
            items: vec![],
            projectiles: vec![],
            score: 0,
            time_left: 0.0,
            coins_collected: 0,
            tick: 0,
            message: String::new(),
            message_timer: 0.0,
            transition_timer: 0.0,
            force_snapshot: true,
            next_id: 1,
        };
        world.load_level(0, false);
        world.set_message("Press Start", 0.0);
        Ok(world)
    }

    pub fn level_count(&self) -> usize {
        self.templates.len()
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// `duration` 0 = stays until replaced.
    pub fn set_message(&mut self, msg: &str, duration: f32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tick_message(&mut self, dt: f32) {
        if self.message_timer > 0.0 {
            self.message_timer -= dt;
            if self.message_timer <= 0.0 {
                self.message_timer = 0.0;
                self.message.clear();
            }
        }
    }
}

// ── Level loading ──

impl World {
    /// Build a fresh runtime for `index` (wrapped) and its entities.
    /// Score and lives are untouched; power survives only if asked.
    pub fn load_level(&mut self, index: i64, preserve_power: bool) {
        let Some(level) = create_level_runtime(&self.templates, index) else { return };
        self.level = level;

        self.enemies.clear();
        self.items.clear();
        self.projectiles.clear();

        let spawns = self.level.enemies.clone();
        for s in spawns {
            let id = self.next_id();
            let enemy = match s.kind {
                EnemyKind::Walker => Enemy::walker(id, s.pos.x, s.pos.y, s.patrol, &self.config),
            };
            self.enemies.push(enemy);
        }
        let spawns = self.level.items.clone();
        for s in spawns {
            let id = self.next_id();
            let item = match s.kind {
                ItemKind::Coin => Item::coin(id, s.pos.x, s.pos.y, &self.config),
                ItemKind::PowerItem => Item::power(id, s.pos.x, s.pos.y, &self.config),
            };
            self.items.push(item);
        }

        let power = self.player.power_level;
        let (sx, sy) = self.spawn_point();
        self.player = Player::new(Body::new(sx, sy, self.config.physics.player_width, self.config.physics.player_height));
        if preserve_power {
            self.player.power_level = power;
        }

        self.time_left = self.level.time_limit;
        self.coins_collected = 0;
        self.transition_timer = 0.0;
        self.camera.center_on(self.player.body.center_x(), self.level.grid.pixel_width());
        let name = self.level.name.clone();
        self.set_message(&name, LEVEL_BANNER_SECS);
        self.force_snapshot = true;
        log::debug!("loaded level {} ({})", self.level.index, self.level.name);
    }

    /// Top-left of the player body standing on the spawn tile.
    pub fn spawn_point(&self) -> (f32, f32) {
        let p = &self.config.physics;
        let b = Body::on_tile(self.level.spawn.x, self.level.spawn.y, p.player_width, p.player_height, p.tile_size);
        (b.x, b.y)
    }

    /// Goal region: the goal tile and the two tiles above it.
    pub fn goal_rect(&self) -> (f32, f32, f32, f32) {
        let ts = self.level.grid.tile_size;
        let gx = self.level.goal.x as f32 * ts;
        let gy = self.level.goal.y as f32 * ts;
        (gx, gy - 2.0 * ts, ts, 3.0 * ts)
    }

    pub fn spawn_projectile(&mut self) -> u32 {
        let id = self.next_id();
        let p = Projectile::fire(id, &self.player.body, self.player.facing, &self.config);
        self.projectiles.push(p);
        id
    }

    pub fn spawn_emerging_power(&mut self, tx: usize, ty: usize) {
        let id = self.next_id();
        let item = Item::emerging_power(id, tx, ty, &self.config);
        self.items.push(item);
    }
}

// ── Session transitions ──

impl World {
    /// Fresh run from level 0: score and lives reset.
    pub fn start_new_run(&mut self, events: &mut Vec<GameEvent>) {
        self.score = 0;
        self.lives = self.config.session.lives;
        self.player.power_level = 0;
        self.load_level(0, false);
        self.screen = Screen::Playing;
        log::info!("new run started");
        events.push(GameEvent::LevelStarted { index: 0 });
    }

    /// Start control: only from the start/end screens.
    pub fn request_start(&mut self, events: &mut Vec<GameEvent>) {
        if self.screen.is_terminal() {
            self.start_new_run(events);
        }
    }

    /// Restart control: reload the current level mid-run (lives, power
    /// and score kept), or begin a new run from the start/end screens.
    pub fn request_restart(&mut self, events: &mut Vec<GameEvent>) {
        if self.screen.is_terminal() {
            self.start_new_run(events);
            return;
        }
        let index = self.level.index;
        self.load_level(index as i64, true);
        self.screen = Screen::Playing;
        log::debug!("restarted level {index}");
        events.push(GameEvent::LevelStarted { index });
    }

    /// Lose a life: game over at zero, otherwise respawn at the spawn tile.
    pub fn lose_life(&mut self, reason: &str, events: &mut Vec<GameEvent>) {
        self.lives -= 1;
        events.push(GameEvent::LifeLost { lives_left: self.lives });
        if self.lives <= 0 {
            self.lives = 0;
            self.screen = Screen::GameOver;
            self.projectiles.clear();
            self.set_message("No lives left", 0.0);
            log::info!("game over with score {}", self.score);
            events.push(GameEvent::GameOver { score: self.score });
            return;
        }

        let (sx, sy) = self.spawn_point();
        let invuln = self.config.physics.respawn_invulnerability;
        self.player.reset(sx, sy, false, invuln);
        self.projectiles.clear();
        self.time_left = self.level.time_limit;
        self.camera.center_on(self.player.body.center_x(), self.level.grid.pixel_width());
        self.set_message(&format!("{reason}  Lives: {}", self.lives), LEVEL_BANNER_SECS);
        self.force_snapshot = true;
    }

    /// Goal reached: bonus, then LevelComplete or GameComplete.
    pub fn complete_level(&mut self, events: &mut Vec<GameEvent>) {
        let s = &self.config.scoring;
        let mut bonus = s.level_bonus + self.time_left.max(0.0).floor() as u64 * s.time_bonus_per_sec;
        if self.level.coin_target > 0 && self.coins_collected >= self.level.coin_target {
            bonus += s.all_coins_bonus;
        }
        self.score += bonus;
        self.projectiles.clear();

        let index = self.level.index;
        events.push(GameEvent::LevelComplete { index, bonus });
        if index + 1 >= self.level_count() {
            self.screen = Screen::GameComplete;
            self.set_message("All levels cleared!", 0.0);
            log::info!("game complete with score {}", self.score);
            events.push(GameEvent::GameComplete { score: self.score });
        } else {
            self.screen = Screen::LevelComplete;
            self.transition_timer = self.config.session.level_transition_secs;
            self.set_message(&format!("Level clear! +{bonus}"), 0.0);
            log::info!("level {index} complete, bonus {bonus}");
        }
    }

    /// Count down the LevelComplete pause, then load the next level.
    pub fn tick_transition(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        self.transition_timer -= dt;
        if self.transition_timer > 0.0 { return; }
        let next = self.level.index + 1;
        self.load_level(next as i64, true);
        self.screen = Screen::Playing;
        events.push(GameEvent::LevelStarted { index: self.level.index });
    }

    /// Shown while standing in the goal without every coin.
    pub fn notify_missing_coins(&mut self) {
        let msg = format!("Find all coins first ({}/{})", self.coins_collected, self.level.coin_target);
        self.set_message(&msg, GOAL_NOTICE_SECS);
    }
}
