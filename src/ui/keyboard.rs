/// Terminal keyboard listener.
///
/// Reads crossterm key events, maps them to logical `Key`s and forwards
/// down/up transitions into the engine's `InputController`. The controller
/// owns edge detection; this side only decides which keys are held.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// report them, where auto-repeat keeps a key alive.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::input::{InputController, Key};

/// After this long without a Press/Repeat event, treat the key as released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Physical key → logical key.
pub fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Enter => Some(Key::Start),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'a' => Some(Key::Left),
            'd' => Some(Key::Right),
            'w' => Some(Key::Up),
            's' => Some(Key::Down),
            ' ' | 'z' | 'k' => Some(Key::Jump),
            'x' | 'j' | 'f' => Some(Key::Action),
            'r' => Some(Key::Restart),
            _ => None,
        },
        _ => None,
    }
}

pub struct Keyboard {
    /// Timestamp of the last Press/Repeat per logical key.
    last_active: HashMap<Key, Instant>,
    /// Keys reported as held to the controller after the last sync.
    held: HashSet<Key>,
    /// Fresh presses since the last sync. Latched so a press and its
    /// release inside one drain still reach the controller.
    tapped: HashSet<Key>,
    /// Raw events from the most recent drain, for meta keys.
    raw_events: Vec<KeyEvent>,
    /// Honor Release events. Only set when keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard {
            last_active: HashMap::with_capacity(8),
            held: HashSet::with_capacity(8),
            tapped: HashSet::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events and push transitions into `input`.
    /// Call once per host frame, before stepping the engine.
    pub fn drain_events(&mut self, input: &mut InputController) {
        self.raw_events.clear();
        while event::poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
            }
        }
        let events = std::mem::take(&mut self.raw_events);
        for key in &events {
            self.record(key, Instant::now());
        }
        self.raw_events = events;
        self.sync(Instant::now(), input);
    }

    /// Ctrl+C or Esc this frame.
    pub fn quit_requested(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.kind != KeyEventKind::Release
                && (k.code == KeyCode::Esc
                    || (k.modifiers.contains(KeyModifiers::CONTROL)
                        && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))))
        })
    }

    // ── Internal ──

    fn record(&mut self, key: &KeyEvent, now: Instant) {
        let Some(logical) = map_key(key.code) else { return };
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&logical);
            }
            // Without enhancement, rely on timeout-based expiry.
            KeyEventKind::Release => {}
            kind => {
                if kind == KeyEventKind::Press && !self.last_active.contains_key(&logical) {
                    self.tapped.insert(logical);
                }
                self.last_active.insert(logical, now);
            }
        }
    }

    /// Expire stale keys, then report every change against the last sync.
    fn sync(&mut self, now: Instant, input: &mut InputController) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        let current: HashSet<Key> = self.last_active.keys().copied().collect();

        for key in self.held.difference(&current) {
            input.key_up(*key);
        }
        for key in current.difference(&self.held) {
            input.key_down(*key);
        }
        for key in self.tapped.drain() {
            match (self.held.contains(&key), current.contains(&key)) {
                // Released again before this sync.
                (_, false) => {
                    input.key_down(key);
                    input.key_up(key);
                }
                // Released and pressed again before this sync.
                (true, true) => {
                    input.key_up(key);
                    input.key_down(key);
                }
                (false, true) => {}
            }
        }
        self.held = current;
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}
