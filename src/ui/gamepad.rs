/// Gamepad backend using gilrs.
///
/// Implements `GamepadSource` so the engine's input controller can poll it
/// once per step. Button mapping comes from the `[gamepad]` config table.
/// Default mapping:
///   D-pad / Left Stick    →  Move (down also drops through platforms)
///   A                     →  Jump
///   B / X                 →  Fire
///   Start                 →  Start
///   Select                →  Restart
///
/// Without the `gamepad` feature `GilrsPad::new()` always returns `None`.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::input::{GamepadSource, GamepadState};

/// Digital threshold for reading the stick as "down".
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DOWN_THRESHOLD: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    pub fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping. An action whose configured list has no valid
/// names keeps its default.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionMap {
    pub jump: Vec<Btn>,
    pub action: Vec<Btn>,
    pub start: Vec<Btn>,
    pub restart: Vec<Btn>,
    pub down: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:    vec![Btn::A],
            action:  vec![Btn::B, Btn::X],
            start:   vec![Btn::Start],
            restart: vec![Btn::Select],
            down:    vec![],
        }
    }
}

impl ActionMap {
    pub fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter()
                .filter_map(|s| {
                    let btn = Btn::from_name(s);
                    if btn.is_none() {
                        log::warn!("unknown gamepad button name {s:?}");
                    }
                    btn
                })
                .collect()
        }
        fn or_default(parsed: Vec<Btn>, fallback: Vec<Btn>) -> Vec<Btn> {
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            jump: or_default(parse_list(&cfg.jump), d.jump),
            action: or_default(parse_list(&cfg.action), d.action),
            start: or_default(parse_list(&cfg.start), d.start),
            restart: or_default(parse_list(&cfg.restart), d.restart),
            // Empty is a valid choice here: the D-pad already covers down.
            down: parse_list(&cfg.down),
        }
    }
}

#[cfg(feature = "gamepad")]
mod inner {
    use super::*;

    /// Per-button state. `latched` survives until the next poll so a
    /// press and release between two polls still reads as one press.
    #[derive(Clone, Copy, Debug, Default)]
    struct BtnState {
        held: bool,
        latched: bool,
    }

    impl BtnState {
        fn read(&self) -> bool {
            self.held || self.latched
        }
    }

    pub struct GilrsPad {
        gilrs: Gilrs,
        buttons: [BtnState; 10],
        dpad_left: BtnState,
        dpad_right: BtnState,
        dpad_down: BtnState,
        stick_x: f32,
        stick_y: f32,
        map: ActionMap,
        connected: bool,
    }

    impl GilrsPad {
        pub fn new(cfg: &GamepadConfig) -> Option<Self> {
            let gilrs = match Gilrs::new() {
                Ok(g) => g,
                Err(e) => {
                    log::warn!("gamepad backend unavailable: {e}");
                    return None;
                }
            };
            let connected = gilrs.gamepads().next().is_some();
            log::info!("gamepad backend ready (connected: {connected})");
            Some(GilrsPad {
                gilrs,
                buttons: [BtnState::default(); 10],
                dpad_left: BtnState::default(),
                dpad_right: BtnState::default(),
                dpad_down: BtnState::default(),
                stick_x: 0.0,
                stick_y: 0.0,
                map: ActionMap::from_config(cfg),
                connected,
            })
        }

        fn drain(&mut self) {
            while let Some(event) = self.gilrs.next_event() {
                match event.event {
                    EventType::ButtonPressed(btn, _) => {
                        self.connected = true;
                        self.set_button(btn, true);
                    }
                    EventType::ButtonReleased(btn, _) => {
                        self.connected = true;
                        self.set_button(btn, false);
                    }
                    EventType::AxisChanged(axis, value, _) => {
                        self.connected = true;
                        match axis {
                            Axis::LeftStickX => self.stick_x = value,
                            Axis::LeftStickY => self.stick_y = value,
                            _ => {}
                        }
                    }
                    EventType::Connected => self.connected = true,
                    EventType::Disconnected => {
                        log::info!("gamepad disconnected");
                        self.connected = false;
                        self.release_all();
                    }
                    _ => {}
                }
            }
        }

        fn set_button(&mut self, gilrs_btn: Button, held: bool) {
            let slot = match gilrs_btn {
                Button::DPadLeft => &mut self.dpad_left,
                Button::DPadRight => &mut self.dpad_right,
                Button::DPadDown => &mut self.dpad_down,
                other => match Btn::from_gilrs(other) {
                    Some(btn) => &mut self.buttons[btn as usize],
                    None => return,
                },
            };
            slot.held = held;
            if held {
                slot.latched = true;
            }
        }

        fn any(&self, btns: &[Btn]) -> bool {
            btns.iter().any(|&b| self.buttons[b as usize].read())
        }

        fn axis(&self) -> f32 {
            match (self.dpad_left.read(), self.dpad_right.read()) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => self.stick_x,
            }
        }

        fn clear_latches(&mut self) {
            for b in &mut self.buttons { b.latched = false; }
            self.dpad_left.latched = false;
            self.dpad_right.latched = false;
            self.dpad_down.latched = false;
        }

        fn release_all(&mut self) {
            self.buttons = [BtnState::default(); 10];
            self.dpad_left = BtnState::default();
            self.dpad_right = BtnState::default();
            self.dpad_down = BtnState::default();
            self.stick_x = 0.0;
            self.stick_y = 0.0;
        }
    }

    impl GamepadSource for GilrsPad {
        fn poll(&mut self) -> Option<GamepadState> {
            self.drain();
            if !self.connected {
                return None;
            }
            // gilrs reports stick Y positive when pushed up.
            let state = GamepadState {
                connected: true,
                axis_x: self.axis(),
                jump: self.any(&self.map.jump),
                action: self.any(&self.map.action),
                start: self.any(&self.map.start),
                restart: self.any(&self.map.restart),
                down: self.dpad_down.read()
                    || self.stick_y < -STICK_DOWN_THRESHOLD
                    || self.any(&self.map.down),
            };
            self.clear_latches();
            Some(state)
        }
    }
}

#[cfg(feature = "gamepad")]
pub use inner::GilrsPad;

#[cfg(not(feature = "gamepad"))]
pub struct GilrsPad;

#[cfg(not(feature = "gamepad"))]
impl GilrsPad {
    pub fn new(_cfg: &GamepadConfig) -> Option<Self> {
        None
    }
}

#[cfg(not(feature = "gamepad"))]
impl GamepadSource for GilrsPad {
    fn poll(&mut self) -> Option<GamepadState> {
        None
    }
}
