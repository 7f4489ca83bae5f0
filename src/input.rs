/// Input abstraction: merges keyboard, gamepad and virtual controls into
/// one `ControlFrame` per simulation step.
///
///   - Keyboard: a set of logical keys currently down. A key-down edge
///     (not an auto-repeat) queues the matching one-shot action.
///   - Gamepad: polled once per `consume()` from an injected source;
///     edges come from diffing against the previous poll.
///   - Virtual: axis / held flags set programmatically (touch overlays,
///     scripted drivers, tests).
///
/// Edges are returned exactly once and then cleared.

use std::collections::HashSet;

/// Stick values inside this magnitude read as centred.
pub const GAMEPAD_DEAD_ZONE: f32 = 0.22;

/// Virtual axis values at or below this magnitude do not override.
const VIRTUAL_AXIS_MIN: f32 = 0.05;

/// Logical keys, after the host has mapped physical keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Action,
    Start,
    Restart,
}

/// One gamepad poll.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct GamepadState {
    pub connected: bool,
    pub axis_x: f32,
    pub jump: bool,
    pub action: bool,
    pub start: bool,
    pub restart: bool,
    pub down: bool,
}

/// Anything that can report the current gamepad state.
pub trait GamepadSource {
    /// `None` when no pad is available.
    fn poll(&mut self) -> Option<GamepadState>;
}

/// Per-step merged controls.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ControlFrame {
    pub axis: f32,
    pub jump_held: bool,
    pub down_held: bool,
    pub jump_pressed: bool,
    pub action_pressed: bool,
    pub start_pressed: bool,
    pub restart_pressed: bool,
}

#[derive(Default)]
pub struct InputController {
    keys_down: HashSet<Key>,
    jump_queued: bool,
    action_queued: bool,
    start_queued: bool,
    restart_queued: bool,
    gamepad: Option<Box<dyn GamepadSource>>,
    prev_pad: GamepadState,
    virtual_axis: f32,
    virtual_jump_held: bool,
    virtual_down_held: bool,
    detached: bool,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gamepad(source: Box<dyn GamepadSource>) -> Self {
        InputController { gamepad: Some(source), ..Self::default() }
    }

    pub fn set_gamepad(&mut self, source: Box<dyn GamepadSource>) {
        if self.detached { return; }
        self.gamepad = Some(source);
        self.prev_pad = GamepadState::default();
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    // ── Keyboard ──

    /// Key went down. Repeats of a key already down queue nothing.
    pub fn key_down(&mut self, key: Key) {
        if self.detached { return; }
        if !self.keys_down.insert(key) { return; }
        match key {
            Key::Jump | Key::Up => self.jump_queued = true,
            Key::Action => self.action_queued = true,
            Key::Start => self.start_queued = true,
            Key::Restart => self.restart_queued = true,
            Key::Left | Key::Right | Key::Down => {}
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.detached { return; }
        self.keys_down.remove(&key);
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    // ── Programmatic ──

    pub fn queue_jump(&mut self) { if !self.detached { self.jump_queued = true; } }
    pub fn queue_action(&mut self) { if !self.detached { self.action_queued = true; } }
    pub fn queue_start(&mut self) { if !self.detached { self.start_queued = true; } }
    pub fn queue_restart(&mut self) { if !self.detached { self.restart_queued = true; } }

    /// Clamped to -1..1; NaN/inf read as 0.
    pub fn set_virtual_axis(&mut self, v: f32) {
        if self.detached { return; }
        self.virtual_axis = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
    }

    pub fn set_virtual_jump_held(&mut self, held: bool) {
        if self.detached { return; }
        self.virtual_jump_held = held;
    }

    pub fn set_virtual_down_held(&mut self, held: bool) {
        if self.detached { return; }
        self.virtual_down_held = held;
    }

    // ── Per step ──

    /// Poll the gamepad, merge every source and hand out pending edges.
    pub fn consume(&mut self) -> ControlFrame {
        if self.detached {
            return ControlFrame::default();
        }

        let pad = self.gamepad.as_mut()
            .and_then(|g| g.poll())
            .filter(|p| p.connected)
            .unwrap_or_default();
        let prev = self.prev_pad;
        self.prev_pad = pad;

        let left = self.is_down(Key::Left);
        let right = self.is_down(Key::Right);
        let mut axis = match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        if axis == 0.0 && pad.axis_x.is_finite() && pad.axis_x.abs() > GAMEPAD_DEAD_ZONE {
            axis = pad.axis_x.clamp(-1.0, 1.0);
        }
        if self.virtual_axis.abs() > VIRTUAL_AXIS_MIN {
            axis = self.virtual_axis;
        }

        let frame = ControlFrame {
            axis,
            jump_held: self.is_down(Key::Jump) || self.is_down(Key::Up) || pad.jump || self.virtual_jump_held,
            down_held: self.is_down(Key::Down) || pad.down || self.virtual_down_held,
            jump_pressed: self.jump_queued || (pad.jump && !prev.jump),
            action_pressed: self.action_queued || (pad.action && !prev.action),
            start_pressed: self.start_queued || (pad.start && !prev.start),
            restart_pressed: self.restart_queued || (pad.restart && !prev.restart),
        };

        self.jump_queued = false;
        self.action_queued = false;
        self.start_queued = false;
        self.restart_queued = false;
        frame
    }

    /// Drop the gamepad, clear all state, ignore further input.
    pub fn detach(&mut self) {
        *self = InputController { detached: true, ..Self::default() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Replays whatever the test last stored.
    struct ScriptedPad(Rc<RefCell<GamepadState>>);

    impl GamepadSource for ScriptedPad {
        fn poll(&mut self) -> Option<GamepadState> {
            Some(*self.0.borrow())
        }
    }

    #[test]
    fn key_down_edge_fires_once() {
        let mut input = InputController::new();
        input.key_down(Key::Jump);
        input.key_down(Key::Jump); // auto-repeat
        let f = input.consume();
        assert!(f.jump_pressed);
        assert!(f.jump_held);
        let f = input.consume();
        assert!(!f.jump_pressed);
        assert!(f.jump_held);

        input.key_up(Key::Jump);
        input.key_down(Key::Jump);
        assert!(input.consume().jump_pressed);
    }

    #[test]
    fn up_doubles_as_jump() {
        let mut input = InputController::new();
        input.key_down(Key::Up);
        let f = input.consume();
        assert!(f.jump_pressed && f.jump_held);
    }

    #[test]
    fn keyboard_axis_beats_pad_virtual_beats_both() {
        let state = Rc::new(RefCell::new(GamepadState { connected: true, axis_x: 0.8, ..Default::default() }));
        let mut input = InputController::with_gamepad(Box::new(ScriptedPad(state.clone())));
        assert_eq!(input.consume().axis, 0.8);

        input.key_down(Key::Left);
        assert_eq!(input.consume().axis, -1.0);

        input.set_virtual_axis(0.5);
        assert_eq!(input.consume().axis, 0.5);

        input.set_virtual_axis(0.0);
        input.key_up(Key::Left);
        state.borrow_mut().axis_x = 0.1; // inside dead zone
        assert_eq!(input.consume().axis, 0.0);
    }

    #[test]
    fn pad_edges_come_from_diffing() {
        let state = Rc::new(RefCell::new(GamepadState { connected: true, ..Default::default() }));
        let mut input = InputController::with_gamepad(Box::new(ScriptedPad(state.clone())));
        assert!(!input.consume().action_pressed);
        state.borrow_mut().action = true;
        assert!(input.consume().action_pressed);
        assert!(!input.consume().action_pressed);
        state.borrow_mut().action = false;
        input.consume();
        state.borrow_mut().action = true;
        assert!(input.consume().action_pressed);
    }

    #[test]
    fn disconnected_pad_is_ignored() {
        let state = Rc::new(RefCell::new(GamepadState { connected: false, jump: true, axis_x: 1.0, ..Default::default() }));
        let mut input = InputController::with_gamepad(Box::new(ScriptedPad(state)));
        let f = input.consume();
        assert_eq!(f, ControlFrame::default());
    }

    #[test]
    fn late_gamepad_starts_from_released() {
        let state = Rc::new(RefCell::new(GamepadState { connected: true, jump: true, ..Default::default() }));
        let mut input = InputController::new();
        input.set_gamepad(Box::new(ScriptedPad(state.clone())));
        assert!(input.consume().jump_pressed);
        assert!(!input.consume().jump_pressed);

        input.detach();
        input.set_gamepad(Box::new(ScriptedPad(state)));
        assert_eq!(input.consume(), ControlFrame::default());
    }

    #[test]
    fn virtual_axis_sanitized() {
        let mut input = InputController::new();
        input.set_virtual_axis(f32::NAN);
        assert_eq!(input.consume().axis, 0.0);
        input.set_virtual_axis(7.0);
        assert_eq!(input.consume().axis, 1.0);
    }

    #[test]
    fn detach_ignores_everything() {
        let mut input = InputController::new();
        input.key_down(Key::Right);
        input.detach();
        input.key_down(Key::Jump);
        input.queue_action();
        input.set_virtual_axis(1.0);
        assert!(input.is_detached());
        assert_eq!(input.consume(), ControlFrame::default());
    }
}
