/// Terminal host: entry point and real-time loop.
///
/// Usage:
///   tilehop                      interactive play in the terminal
///   tilehop --headless [MS ...]  start a run, advance MS of simulated time
///                                per argument (default 1000), print one
///                                JSON snapshot line after each

use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use thiserror::Error;

use tilehop::config::GameConfig;
use tilehop::error::EngineError;
use tilehop::input::InputController;
use tilehop::sim::engine::Engine;
use tilehop::sim::level::load_templates;
use tilehop::ui::gamepad::GilrsPad;
use tilehop::ui::keyboard::Keyboard;
use tilehop::ui::renderer::Renderer;
use tilehop::ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(8);

#[derive(Debug, Error)]
enum HostError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("terminal: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid duration {0:?}, expected milliseconds")]
    Usage(String),
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("tilehop: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), HostError> {
    let config = GameConfig::load();
    let templates = load_templates(&config);
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--headless") {
        let durations = parse_durations(&args[1..])?;
        let engine = Engine::new(templates, config, InputController::new())?;
        return run_headless(engine, &durations);
    }

    let mut input = InputController::new();
    if let Some(pad) = GilrsPad::new(&config.gamepad) {
        input.set_gamepad(Box::new(pad));
    }
    let engine = Engine::new(templates, config, input)?;
    run_interactive(engine)
}

fn parse_durations(args: &[String]) -> Result<Vec<f32>, HostError> {
    if args.is_empty() {
        return Ok(vec![1000.0]);
    }
    args.iter()
        .map(|a| match a.parse::<f32>() {
            Ok(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms),
            _ => Err(HostError::Usage(a.clone())),
        })
        .collect()
}

fn run_headless(mut engine: Engine, durations: &[f32]) -> Result<(), HostError> {
    engine.start();
    for &ms in durations {
        engine.advance_time(ms);
        let snap = engine.poll_snapshot().unwrap_or_else(|| engine.snapshot());
        println!("{}", serde_json::to_string(&snap)?);
    }
    engine.destroy();
    Ok(())
}

fn run_interactive(mut engine: Engine) -> Result<(), HostError> {
    let mut renderer = Renderer::new();
    renderer.init()?;

    let mut kb = Keyboard::new();
    let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false)
        && execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();
    kb.honor_release = enhanced;
    log::info!("keyboard release events: {enhanced}");

    let sound = SoundEngine::new();
    let result = game_loop(&mut engine, &mut renderer, &mut kb, sound.as_ref());

    if enhanced {
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
    }
    let cleanup = renderer.cleanup();
    let score = engine.snapshot().score;
    engine.destroy();
    result?;
    cleanup?;

    println!("Thanks for playing Tile Hop! Final score: {score}");
    Ok(())
}

fn game_loop(
    engine: &mut Engine,
    renderer: &mut Renderer,
    kb: &mut Keyboard,
    sound: Option<&SoundEngine>,
) -> Result<(), HostError> {
    let mut last = Instant::now();
    renderer.render(engine.grid(), &engine.snapshot())?;

    loop {
        kb.drain_events(engine.input_mut());
        if kb.quit_requested() {
            return Ok(());
        }

        let now = Instant::now();
        let steps = engine.frame(now.duration_since(last).as_secs_f32());
        last = now;

        let events = engine.drain_events();
        if let Some(sfx) = sound {
            sfx.play_events(&events);
        }

        // Redraw on every step, not just on the rate-limited snapshots.
        let snap = match engine.poll_snapshot() {
            Some(s) => Some(s),
            None if steps > 0 => Some(engine.snapshot()),
            None => None,
        };
        if let Some(snap) = snap {
            renderer.render(engine.grid(), &snap)?;
        }
        std::thread::sleep(FRAME_SLEEP);
    }
}
