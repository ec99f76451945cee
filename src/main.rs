//! Flick bubble demo driver
//!
//! Runs the overlay engine headless inside a calloop event loop:
//! - A reader thread feeds JSON-lines script steps through a channel
//! - A 16ms timer advances snap and fade animations
//! - Engine notifications are printed to stdout as JSON lines
//!
//! Exits once the script has ended and every animation has settled.

mod headless;
mod script;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use calloop::channel::{self, Sender};
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use clap::Parser;
use serde_json::json;
use tracing::{debug, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flick_bubble::config::state_dir;
use flick_bubble::image_source::DecodingImageLoader;
use flick_bubble::position::{JsonFileBackend, PositionStore};
use flick_bubble::primitives::DisplayMetrics;
use flick_bubble::{EngineSettings, OverlayController};

use headless::HeadlessHost;
use script::{Action, ScriptStep};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "flick-bubble")]
#[command(about = "Floating bubble overlay engine, driven by a JSON-lines script", long_about = None)]
struct Args {
    /// Enable verbose debug output
    #[arg(short, long)]
    debug: bool,

    /// Engine settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script to run, stdin if omitted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Display width in pixels
    #[arg(long, default_value_t = 1080)]
    width: i32,

    /// Display height in pixels
    #[arg(long, default_value_t = 2000)]
    height: i32,

    /// Pixels per dp
    #[arg(long, default_value_t = 2.0)]
    density: f32,

    /// Where the bubble position is persisted
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Pretend the overlay permission was not granted
    #[arg(long)]
    deny_overlay: bool,
}

/// Event loop state
struct Driver {
    engine: OverlayController<HeadlessHost>,
    script_done: bool,
    last_frame: Instant,
}

impl Driver {
    fn apply(&mut self, action: Action) {
        match action {
            Action::Command(command) => self.engine.handle_command(command),
            Action::Touch(event) => self.engine.handle_touch(event),
            Action::Rotate => {
                let rotated = self.engine.host().display.rotated();
                self.change_display(rotated);
            }
            Action::Display { width, height, density } => {
                let density = density.unwrap_or(self.engine.host().display.density);
                self.change_display(DisplayMetrics::new(width, height, density));
            }
        }
    }

    fn change_display(&mut self, metrics: DisplayMetrics) {
        info!(width = metrics.width, height = metrics.height, density = metrics.density, "Display changed");
        self.engine.host_mut().display = metrics;
        self.engine.on_configuration_changed();
    }

    fn frame(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;
        self.engine.tick(dt);
    }

    fn finished(&self) -> bool {
        self.script_done && !self.engine.is_animating()
    }
}

fn emit(event: serde_json::Value) {
    println!("{}", event);
}

/// Feed script steps into the loop, honoring waits on this thread
fn spawn_reader(source: Box<dyn BufRead + Send>, sender: Sender<ScriptStep>) -> Result<()> {
    thread::Builder::new()
        .name("script-reader".into())
        .spawn(move || {
            for step in script::parse_lines(source) {
                if let Some(delay) = step.delay() {
                    debug!(?delay, "Script wait");
                    thread::sleep(delay);
                    continue;
                }
                if sender.send(step).is_err() {
                    break;
                }
            }
            debug!("Script reader finished");
        })
        .context("Failed to spawn script reader")?;
    Ok(())
}

fn main() -> Result<()> {
    // Set up panic hook to log panics before crashing
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        let crash_log = state_dir().join("crash.log");
        if let Ok(mut f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&crash_log)
        {
            use std::io::Write;
            let _ = writeln!(f, "[{}] PANIC: {}", chrono::Local::now(), panic_info);
        }
    }));

    let log_dir = state_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let args = Args::parse();

    let file_appender = rolling::daily(&log_dir, "bubble.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Quiet by default, verbose with --debug
    let default_filter = if args.debug {
        "debug,flick_bubble=debug"
    } else {
        "warn,flick_bubble=info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!(log_path = %log_dir.display(), "Flick bubble starting");

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(|| log_dir.join("bubble.toml"));
    let settings = EngineSettings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    let backend = match &args.state_file {
        Some(path) => JsonFileBackend::new(path),
        None => JsonFileBackend::in_state_dir(),
    };
    info!(path = %backend.path().display(), "Persisting bubble position");

    let display = DisplayMetrics::new(args.width, args.height, args.density);
    let host = HeadlessHost::new(display, !args.deny_overlay);
    let mut engine = OverlayController::new(host, settings, PositionStore::new(backend), DecodingImageLoader);

    let notifier = engine.notifier_mut();
    notifier.set_active_listener(|active| emit(json!({ "event": "overlayActiveChanged", "active": active })));
    notifier.set_hidden_listener(|hidden| emit(json!({ "event": "overlayHiddenChanged", "hidden": hidden })));
    notifier.set_removed_listener(|| emit(json!({ "event": "iconRemoved" })));

    let source: Box<dyn BufRead + Send> = match &args.script {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open script {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut event_loop: EventLoop<Driver> = EventLoop::try_new()?;
    let loop_handle = event_loop.handle();

    let (sender, steps) = channel::channel::<ScriptStep>();
    loop_handle
        .insert_source(steps, |event, _, driver| match event {
            channel::Event::Msg(step) => {
                debug!(?step, "Script step");
                if let Some(action) = step.into_action() {
                    driver.apply(action);
                }
            }
            channel::Event::Closed => {
                info!("Script finished");
                driver.script_done = true;
            }
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert script channel: {}", e.error))?;

    loop_handle
        .insert_source(Timer::from_duration(FRAME), |_, _, driver| {
            driver.frame();
            TimeoutAction::ToDuration(FRAME)
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert frame timer: {}", e.error))?;

    spawn_reader(source, sender)?;

    let mut driver = Driver {
        engine,
        script_done: false,
        last_frame: Instant::now(),
    };

    info!("Entering event loop");
    while !driver.finished() {
        event_loop
            .dispatch(Some(FRAME), &mut driver)
            .context("Event loop dispatch failed")?;
    }

    info!(state = ?driver.engine.state(), "Flick bubble exiting");
    Ok(())
}
