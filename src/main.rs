/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use config::{GameConfig, GeneralConfig};
use sim::event::GameEvent;
use sim::session::Session;
use ui::gamepad::GamepadState;
use ui::input::{Action, InputState};
use ui::renderer::Renderer;
use ui::sound::{self as sfx, SoundEngine};

/// Longest frame step fed to the simulation.
const MAX_FRAME_STEP: Duration = Duration::from_millis(250);

fn main() {
    let config = GameConfig::load();
    init_logging(&config.general);

    let seed = config.general.seed.unwrap_or_else(clock_seed);
    log::info!("starting with seed {seed}");
    let mut session = Session::new(seed, config.timing.clone());

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }
    log::info!("exit during {:?}", session.phase());

    println!();
    println!("Thanks for playing Parasight!");
    println!("Final Score: {}", session.world().score);
}

/// Logger writes to `general.log_file` when set (the terminal is in raw
/// mode), otherwise to stderr. `RUST_LOG` overrides the configured level.
fn init_logging(general: &GeneralConfig) {
    let env = env_logger::Env::default().default_filter_or(general.log_level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(path) = &general.log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Warning: cannot open log file {}: {e}", path.display()),
        }
    }
    builder.init();
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED)
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        log::info!("gamepad detected");
    }

    let frame = Duration::from_millis(config.timing.frame_ms);
    let mut last_frame = Instant::now();
    // Sub-millisecond remainder carried between frames.
    let mut carry = Duration::ZERO;

    loop {
        kb.drain_events();
        gp.update();

        let mut events = Vec::new();
        for action in kb.actions().chain(gp.actions()) {
            match action {
                Action::Quit => {
                    log::info!("quit requested");
                    return Ok(());
                }
                Action::Play(intent) => events.extend(session.input(intent)),
            }
        }

        let now = Instant::now();
        let elapsed = (now - last_frame).min(MAX_FRAME_STEP) + carry;
        last_frame = now;
        let dt = elapsed.as_millis() as u64;
        carry = elapsed - Duration::from_millis(dt);
        events.extend(session.advance(dt));

        dispatch_events(sound, session, &events);
        renderer.observe(&events);
        renderer.render(session.world())?;

        let spent = last_frame.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }
}

fn dispatch_events(sound: Option<&SoundEngine>, session: &Session, events: &[GameEvent]) {
    let host = session.world().host().audio;
    for event in events {
        trace_event(event);
        if let (Some(engine), Some(cue)) = (sound, sfx::cue(event, host)) {
            engine.play(cue);
        }
    }
}

/// Event journal at trace level; `RUST_LOG=parasight=trace` with a log file.
fn trace_event(event: &GameEvent) {
    match event {
        GameEvent::TickComplete(snap) => log::trace!(
            "tick {} {:?} score {} len {} phase {:?}",
            snap.tick,
            snap.level,
            snap.score,
            snap.organism.len(),
            snap.phase
        ),
        GameEvent::Consumed { cell, score } => log::trace!("consumed at {cell:?}, score {score}"),
        GameEvent::EnemyAbsorbed { cell } => log::trace!("absorbed enemy at {cell:?}"),
        GameEvent::MutationActivated(id) => log::trace!("mutation on: {}", id.def().name),
        GameEvent::MutationExpired(id) => log::trace!("mutation off: {}", id.def().name),
        GameEvent::PhaseEngaged { until } => log::trace!("phase window until {until}"),
        GameEvent::LevelAdvanced(level) => log::trace!("level {}", level.number()),
        GameEvent::HazardWarning { orientation, index } => log::trace!("pulse warning {orientation:?} {index}"),
        GameEvent::HazardDeadly { orientation, index } => log::trace!("pulse deadly {orientation:?} {index}"),
        GameEvent::ThoughtBubble { cell, text } => log::trace!("bubble at {cell:?}: {text}"),
        _ => {}
    }
}
