/// Engine: the public face of the simulation core.
///
/// Owns the `World`, the injected `InputController`, the fixed-step
/// accumulator, pending events and the rate-limited snapshot.
///
/// Two ways to drive it:
///   - `frame(real_dt)`  : real-time host loop. Real time is clamped to
///     `max_frame_ms`, then whole fixed steps run from the accumulator.
///   - `advance_time(ms)`: deterministic: runs `max(1, round(ms/step))`
///     steps immediately and forces a snapshot.
///
/// After `destroy()` every call is a no-op.

use crate::config::GameConfig;
use crate::domain::tile::TileGrid;
use crate::error::EngineError;
use crate::input::InputController;
use super::event::GameEvent;
use super::level::LevelTemplate;
use super::snapshot::Snapshot;
use super::step;
use super::world::World;

pub struct Engine {
    world: World,
    input: InputController,
    accumulator: f32,
    since_snapshot_ms: f32,
    pending_snapshot: Option<Snapshot>,
    events: Vec<GameEvent>,
    destroyed: bool,
}

impl Engine {
    pub fn new(
        templates: Vec<LevelTemplate>,
        config: GameConfig,
        input: InputController,
    ) -> Result<Self, EngineError> {
        let world = World::new(templates, config)?;
        log::info!("engine ready with {} levels", world.level_count());
        let mut engine = Engine {
            world,
            input,
            accumulator: 0.0,
            since_snapshot_ms: 0.0,
            pending_snapshot: None,
            events: vec![],
            destroyed: false,
        };
        engine.emit_snapshot();
        Ok(engine)
    }

    // ── Control API ──

    pub fn jump(&mut self) {
        self.input.queue_jump();
    }

    pub fn action(&mut self) {
        self.input.queue_action();
    }

    /// New run from the start/end screens; ignored mid-run.
    pub fn start(&mut self) {
        if self.destroyed { return; }
        let mut events = vec![];
        self.world.request_start(&mut events);
        self.absorb(events);
    }

    /// Reload the current level mid-run, or start a new run from the
    /// start/end screens.
    pub fn restart(&mut self) {
        if self.destroyed { return; }
        let mut events = vec![];
        self.world.request_restart(&mut events);
        self.absorb(events);
    }

    pub fn set_virtual_axis(&mut self, v: f32) {
        self.input.set_virtual_axis(v);
    }

    pub fn set_virtual_jump_held(&mut self, held: bool) {
        self.input.set_virtual_jump_held(held);
    }

    pub fn set_virtual_down_held(&mut self, held: bool) {
        self.input.set_virtual_down_held(held);
    }

    /// Run the steps covering `ms` of simulated time, then snapshot.
    pub fn advance_time(&mut self, ms: f32) {
        if self.destroyed { return; }
        let step_ms = self.step_secs() * 1000.0;
        let steps = if ms.is_finite() { (ms / step_ms).round().max(1.0) as u64 } else { 1 };
        for _ in 0..steps {
            self.run_step();
        }
        self.emit_snapshot();
    }

    /// Real-time tick. Returns the number of fixed steps run.
    pub fn frame(&mut self, real_dt: f32) -> u32 {
        if self.destroyed { return 0; }
        let max = self.world.config.session.max_frame_ms / 1000.0;
        let dt = if real_dt.is_finite() { real_dt.clamp(0.0, max) } else { 0.0 };
        let step = self.step_secs();
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= step {
            self.accumulator -= step;
            self.run_step();
            steps += 1;
        }
        steps
    }

    /// Detach input and stop stepping for good.
    pub fn destroy(&mut self) {
        if self.destroyed { return; }
        self.input.detach();
        self.destroyed = true;
        self.pending_snapshot = None;
        log::debug!("engine destroyed at step {}", self.world.tick);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ── Observation ──

    /// The snapshot emitted since the last poll, if any.
    pub fn poll_snapshot(&mut self) -> Option<Snapshot> {
        self.pending_snapshot.take()
    }

    /// Current state, regardless of the emission schedule.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.world)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only tile grid of the current level.
    pub fn grid(&self) -> &TileGrid {
        &self.world.level.grid
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn input_mut(&mut self) -> &mut InputController {
        &mut self.input
    }

    // ── Internal ──

    fn step_secs(&self) -> f32 {
        self.world.config.session.step_secs()
    }

    fn run_step(&mut self) {
        let control = self.input.consume();
        let dt = self.step_secs();
        let events = step::step(&mut self.world, &control, dt);
        self.since_snapshot_ms += dt * 1000.0;
        self.absorb(events);
        if self.since_snapshot_ms >= self.world.config.session.snapshot_interval_ms {
            self.emit_snapshot();
        }
    }

    /// Queue events; anything discrete forces a snapshot.
    fn absorb(&mut self, events: Vec<GameEvent>) {
        if !events.is_empty() || self.world.force_snapshot {
            self.emit_snapshot();
        }
        self.events.extend(events);
    }

    fn emit_snapshot(&mut self) {
        self.pending_snapshot = Some(Snapshot::capture(&self.world));
        self.since_snapshot_ms = 0.0;
        self.world.force_snapshot = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crate::sim::level::{normalize_level, parse_level_file};
    use crate::sim::world::Screen;
    use crate::domain::player::PlayerAnim;

    fn engine(levels: &str) -> Engine {
        let templates = parse_level_file(levels).unwrap()
            .iter()
            .enumerate()
            .map(|(i, r)| normalize_level(r, i, 32.0))
            .collect();
        Engine::new(templates, GameConfig::default(), InputController::new()).unwrap()
    }

    fn started(levels: &str) -> Engine {
        let mut e = engine(levels);
        e.start();
        e.drain_events();
        e
    }

    const FLAT: &str = r#"
        rows = ['............', '............', '............', '############']
        spawn = { x = 1, y = 2 }
        goal = { x = 10, y = 2 }
    "#;

    #[test]
    fn zero_templates_fail() {
        let r = Engine::new(vec![], GameConfig::default(), InputController::new());
        assert!(matches!(r, Err(EngineError::NoLevels)));
    }

    #[test]
    fn player_rests_on_ground() {
        let mut e = started(FLAT);
        e.advance_time(1000.0);
        let s = e.snapshot();
        assert!(s.player.on_ground);
        assert_eq!(s.player.vy, 0.0);
        assert_eq!(s.player.y + 30.0, 96.0);
        assert_eq!(s.player.anim, PlayerAnim::Idle);
    }

    #[test]
    fn advance_time_is_deterministic() {
        let mut a = started(FLAT);
        let mut b = started(FLAT);
        for e in [&mut a, &mut b] {
            e.set_virtual_axis(1.0);
            e.advance_time(300.0);
            e.jump();
            e.advance_time(500.0);
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn advance_time_step_count() {
        let mut e = started(FLAT);
        let before = e.snapshot().step;
        e.advance_time(100.0); // 6 steps at 60 Hz
        assert_eq!(e.snapshot().step, before + 6);
        e.advance_time(0.0); // at least one
        assert_eq!(e.snapshot().step, before + 7);
        assert!(e.poll_snapshot().is_some());
        assert!(e.poll_snapshot().is_none());
    }

    #[test]
    fn frame_clamps_real_time() {
        let mut e = started(FLAT);
        // 250 ms cap → about 15 steps, not 600.
        let steps = e.frame(10.0);
        assert!((14..=15).contains(&steps));
        assert_eq!(e.frame(f32::NAN), 0);
    }

    #[test]
    fn snapshots_are_rate_limited() {
        let mut e = started(FLAT);
        e.poll_snapshot();
        e.frame(0.05); // 3 steps = 50 ms
        assert!(e.poll_snapshot().is_none());
        e.frame(0.06); // 110 ms total
        assert!(e.poll_snapshot().is_some());
    }

    #[test]
    fn firing_requires_power() {
        let mut e = started(FLAT);
        e.advance_time(100.0);
        e.action();
        e.advance_time(20.0);
        assert!(e.snapshot().projectiles.is_empty());
        assert!(!e.drain_events().iter().any(|ev| matches!(ev, GameEvent::ProjectileFired { .. })));

        e.world.player.power_level = 1;
        e.action();
        e.advance_time(20.0);
        assert_eq!(e.snapshot().projectiles.len(), 1);
        assert!(e.drain_events().iter().any(|ev| matches!(ev, GameEvent::ProjectileFired { .. })));
    }

    #[test]
    fn patrol_reverses_at_bound() {
        let mut e = started(r#"
            rows = ['..................', '..................', '##################']
            spawn = { x = 1, y = 1 }
            goal = { x = 16, y = 1 }
            enemies = [{ type = 'walker', x = 12, y = 1, patrol = 1 }]
        "#);
        let min_x = e.world().enemies[0].min_x;
        let max_x = e.world().enemies[0].max_x;
        let mut dirs = vec![];
        for _ in 0..120 {
            e.advance_time(50.0);
            let s = e.snapshot();
            let en = &s.enemies[0];
            assert!(en.x >= min_x as f64 - 0.01 && en.x <= max_x as f64 + 0.01);
            dirs.push(en.direction);
        }
        assert!(dirs.contains(&-1.0) && dirs.contains(&1.0));
    }

    #[test]
    fn goal_withheld_until_all_coins() {
        let mut e = started(r#"
            rows = ['............', '............', '............', '############']
            spawn = { x = 1, y = 2 }
            goal = { x = 4, y = 2 }
            goal_requires_all_coins = true
            items = [{ type = 'coin', x = 9, y = 2 }]
        "#);
        e.set_virtual_axis(1.0);
        e.advance_time(400.0);
        e.set_virtual_axis(0.0);
        e.advance_time(1000.0);
        let s = e.snapshot();
        assert_eq!(s.screen, Screen::Playing);
        assert!(s.message.starts_with("Find all coins first (0/1)"));

        // Grab the coin, come back.
        e.set_virtual_axis(1.0);
        e.advance_time(1200.0);
        assert_eq!(e.snapshot().coins_collected, 1);
        e.set_virtual_axis(-1.0);
        e.advance_time(1500.0);
        assert_eq!(e.snapshot().screen, Screen::GameComplete);
    }

    #[test]
    fn key_edges_reach_the_player_once() {
        let mut e = started(FLAT);
        e.advance_time(100.0);
        e.input_mut().key_down(Key::Jump);
        e.advance_time(17.0);
        let jumps = e.drain_events().iter().filter(|ev| **ev == GameEvent::Jumped).count();
        assert_eq!(jumps, 1);
        e.advance_time(2000.0);
        let jumps = e.drain_events().iter().filter(|ev| **ev == GameEvent::Jumped).count();
        assert_eq!(jumps, 0);
    }

    #[test]
    fn start_and_restart_semantics() {
        let mut e = engine(FLAT);
        assert_eq!(e.snapshot().screen, Screen::Start);
        e.advance_time(500.0);
        assert_eq!(e.snapshot().screen, Screen::Start);
        e.start();
        assert_eq!(e.snapshot().screen, Screen::Playing);
        assert!(e.drain_events().contains(&GameEvent::LevelStarted { index: 0 }));

        e.set_virtual_axis(1.0);
        e.advance_time(300.0);
        let moved = e.snapshot().player.x;
        e.start(); // ignored mid-run
        assert_eq!(e.snapshot().player.x, moved);
        e.restart();
        let s = e.snapshot();
        assert!(s.player.x < moved);
        assert_eq!(s.lives, 3);
    }

    #[test]
    fn destroy_stops_everything() {
        let mut e = started(FLAT);
        let step = e.snapshot().step;
        e.destroy();
        assert!(e.is_destroyed());
        e.jump();
        e.start();
        e.advance_time(1000.0);
        assert_eq!(e.frame(0.1), 0);
        assert_eq!(e.snapshot().step, step);
        assert!(e.poll_snapshot().is_none());
        assert!(e.input_mut().is_detached());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let e = started(FLAT);
        let json = serde_json::to_value(e.snapshot()).unwrap();
        assert_eq!(json["screen"], "playing");
        assert_eq!(json["player"]["facing"], "right");
        assert_eq!(json["lives"], 3);
        assert!(json["enemies"].as_array().unwrap().is_empty());
    }
}
