/// Player state machine: momentum movement, jump assistance
/// (buffer + coyote time), variable jump height, power level and firing.
///
/// Per step the session calls, in order:
///   1. `update()`         : timers, horizontal easing, jump, gravity
///   2. the collision resolver (with `move_options()`)
///   3. `apply_collision()`: grounded state, coyote refill
///   4. `resolve_anim()`

use serde::Serialize;

use super::entity::{Body, Facing};
use super::physics::{CollisionReport, MoveOptions};
use super::tile::TileGrid;
use crate::config::PhysicsConfig;
use crate::input::ControlFrame;

/// Horizontal speed above which the run animation plays.
const RUN_ANIM_SPEED: f32 = 8.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAnim {
    #[default]
    Idle,
    Run,
    Jump,
    Hurt,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub on_ground: bool,
    pub facing: Facing,
    pub jump_buffer: f32,
    pub coyote: f32,
    pub jump_hold: f32,
    pub can_short_hop: bool,
    pub invulnerable: f32,
    pub fire_cooldown: f32,
    pub power_level: u32,
    pub anim: PlayerAnim,
    jump_was_held: bool,
}

impl Player {
    pub fn new(body: Body) -> Self {
        Player {
            body,
            on_ground: false,
            facing: Facing::Right,
            jump_buffer: 0.0,
            coyote: 0.0,
            jump_hold: 0.0,
            can_short_hop: false,
            invulnerable: 0.0,
            fire_cooldown: 0.0,
            power_level: 0,
            anim: PlayerAnim::Idle,
            jump_was_held: false,
        }
    }

    /// Advance timers, ease horizontal velocity, start a buffered jump and
    /// apply gravity. Returns true if a jump started this step.
    pub fn update(&mut self, control: &ControlFrame, tuning: &PhysicsConfig, dt: f32) -> bool {
        // ── Timers ──
        self.jump_buffer = (self.jump_buffer - dt).max(0.0);
        self.jump_hold = (self.jump_hold - dt).max(0.0);
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        if !self.on_ground {
            self.coyote = (self.coyote - dt).max(0.0);
        }

        if control.jump_pressed {
            self.jump_buffer = tuning.jump_buffer;
        }

        // ── Horizontal ──
        let axis = if control.axis.is_finite() { control.axis.clamp(-1.0, 1.0) } else { 0.0 };
        let target = axis * tuning.max_speed_x;
        let rate = match (axis != 0.0, self.on_ground) {
            (true, true) => tuning.ground_accel,
            (true, false) => tuning.air_accel,
            (false, true) => tuning.ground_decel,
            (false, false) => tuning.air_decel,
        };
        self.body.vx = approach(self.body.vx, target, rate * dt)
            .clamp(-tuning.max_speed_x, tuning.max_speed_x);
        if axis < 0.0 {
            self.facing = Facing::Left;
        } else if axis > 0.0 {
            self.facing = Facing::Right;
        }

        // ── Jump ──
        let jumped = self.try_start_jump(tuning);

        // Early release cuts the rise once.
        let released = self.jump_was_held && !control.jump_held;
        if released {
            self.jump_hold = 0.0;
            if self.body.vy < 0.0 && self.can_short_hop {
                self.body.vy *= tuning.short_hop_cut;
                self.can_short_hop = false;
            }
        }
        self.jump_was_held = control.jump_held;

        // ── Gravity ──
        let rising = self.body.vy < 0.0;
        let scale = if control.jump_held && self.jump_hold > 0.0 && rising {
            tuning.hold_gravity_scale
        } else {
            1.0
        };
        self.body.vy = (self.body.vy + tuning.gravity * scale * dt).min(tuning.max_fall_speed);

        jumped
    }

    /// Consume the buffered jump if grounded or within coyote time.
    pub fn try_start_jump(&mut self, tuning: &PhysicsConfig) -> bool {
        if self.jump_buffer <= 0.0 || !(self.on_ground || self.coyote > 0.0) {
            return false;
        }
        self.jump_buffer = 0.0;
        self.coyote = 0.0;
        self.on_ground = false;
        self.body.vy = tuning.jump_velocity;
        self.jump_hold = tuning.jump_hold;
        self.can_short_hop = true;
        true
    }

    /// Resolver options for this step. Holding down while standing on a
    /// one-way platform (and nothing solid) drops through it.
    pub fn move_options(&self, control: &ControlFrame, grid: &TileGrid) -> MoveOptions {
        let drop = control.down_held && self.on_ground && self.standing_on_one_way(grid);
        MoveOptions { allow_one_way: !drop }
    }

    fn standing_on_one_way(&self, grid: &TileGrid) -> bool {
        let row = grid.to_tile(self.body.bottom());
        let c0 = grid.to_tile(self.body.x);
        let c1 = grid.to_tile(self.body.right() - 0.001);
        let kinds: Vec<_> = (c0..=c1).map(|c| grid.tile_at(c, row)).collect();
        kinds.iter().any(|k| k.is_one_way()) && !kinds.iter().any(|k| k.is_solid())
    }

    pub fn apply_collision(&mut self, report: &CollisionReport, tuning: &PhysicsConfig) {
        self.on_ground = report.landed;
        if report.landed {
            self.coyote = tuning.coyote_time;
            self.can_short_hop = false;
            self.jump_hold = 0.0;
        }
        if report.hit_ceiling {
            self.jump_hold = 0.0;
        }
    }

    pub fn resolve_anim(&mut self) {
        self.anim = if self.invulnerable > 0.0 {
            PlayerAnim::Hurt
        } else if !self.on_ground {
            PlayerAnim::Jump
        } else if self.body.vx.abs() > RUN_ANIM_SPEED {
            PlayerAnim::Run
        } else {
            PlayerAnim::Idle
        };
    }

    /// Fire if powered up and off cooldown.
    pub fn try_fire(&mut self, tuning: &PhysicsConfig) -> bool {
        if self.power_level == 0 || self.fire_cooldown > 0.0 {
            return false;
        }
        self.fire_cooldown = tuning.fire_cooldown;
        true
    }

    /// Place at `(x, y)` with zeroed motion and timers.
    pub fn reset(&mut self, x: f32, y: f32, preserve_power: bool, invulnerability: f32) {
        self.body.x = x;
        self.body.y = y;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.body.active = true;
        self.on_ground = false;
        self.facing = Facing::Right;
        self.jump_buffer = 0.0;
        self.coyote = 0.0;
        self.jump_hold = 0.0;
        self.can_short_hop = false;
        self.fire_cooldown = 0.0;
        self.invulnerable = invulnerability.max(0.0);
        self.jump_was_held = false;
        if !preserve_power {
            self.power_level = 0;
        }
        self.resolve_anim();
    }
}

/// Move `current` toward `target` by at most `max_delta`.
fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}
