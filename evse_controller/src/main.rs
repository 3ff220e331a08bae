//! # EVSE Controller
//!
//! Hosts the charging control core against the simulated board driver:
//! loads the TOML configuration (falling back to defaults when the file
//! is absent), performs the optional RT setup, and runs the fixed-period
//! tick loop until interrupted.
//!
//! `--demo` scripts a vehicle against the simulated board: plug in,
//! request charge, pause, unplug.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use evse_common::config::ConfigError;
use evse_controller::config::{EvseConfig, load_config};
use evse_controller::controller::EvseController;
use evse_controller::rt::rt_setup;
use evse_controller::sim::{DummyMeter, SimBoard};

/// EVSE Controller — IEC 61851-1 charging control loop
#[derive(Parser, Debug)]
#[command(name = "evse_controller")]
#[command(version)]
#[command(about = "Charging controller core with simulated hardware")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(default_value = "config/evse.toml")]
    config: PathBuf,

    /// CPU core to pin the tick loop to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Script a simulated vehicle through a charging session.
    #[arg(long)]
    demo: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("EVSE Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("EVSE Controller shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config(&args.config) {
        Ok(config) => {
            info!("Loaded config from {}", args.config.display());
            config
        }
        Err(ConfigError::FileNotFound(_)) => {
            info!(
                "No config file at {}, using defaults",
                args.config.display()
            );
            EvseConfig::default()
        }
        Err(e) => return Err(Box::new(e)),
    };

    let tick = Duration::from_millis(config.controller.tick_ms as u64);
    info!(
        "Config OK: tick={}ms, max_current={}A, socket_outlet={}",
        config.controller.tick_ms,
        config.controller.max_charging_current,
        config.controller.socket_outlet,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;

    let meter = DummyMeter::new(config.meter.ac_voltage, config.meter.three_phase);
    let mut controller = EvseController::new(config, SimBoard::default(), meter)?;
    info!("Controller initialized, entering tick loop");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut tick_count: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        if args.demo {
            drive_demo(&mut controller, tick_count, tick.as_millis() as u64);
        }
        controller.process();

        tick_count += 1;
        if let Some(remaining) = tick.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    info!(
        "Session summary: state={}, elapsed={}s, charging={}s, consumption={}Wh",
        controller.state_str(),
        controller.session_time(),
        controller.charging_time(),
        controller.consumption_wh(),
    );

    Ok(())
}

/// Script the simulated vehicle: plug in at 2 s, request charge at 6 s,
/// pause at 26 s, unplug at 28 s.
fn drive_demo(
    controller: &mut EvseController<SimBoard, DummyMeter>,
    tick_count: u64,
    tick_ms: u64,
) {
    let at = |seconds: u64| seconds * 1_000 / tick_ms;
    let board = controller.board_mut();

    match tick_count {
        t if t == at(2) => board.set_cp_millivolts(8_800),
        t if t == at(6) => board.set_cp_millivolts(5_800),
        t if t == at(26) => board.set_cp_millivolts(8_800),
        t if t == at(28) => board.set_cp_millivolts(11_800),
        _ => {}
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
