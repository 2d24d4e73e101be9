//! `serimq-cli` – the bridge entry point.
//!
//! Wires the whole pipeline together:
//!
//! 1. Loads and validates the configuration document (broker address,
//!    serial settings, sensor routes).
//! 2. Connects the broker session through an explicit [`SessionRegistry`].
//! 3. Resolves and opens the serial device (configured path or discovery).
//! 4. Subscribes to every routed topic, starts the background delivery
//!    loop, and runs the bridge loop until **Ctrl-C**.
//!
//! Exit code 1 on any startup failure; 0 on an interrupt-triggered
//! shutdown.

mod config;
mod ports;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::{info, warn};

use serimq_bridge::Bridge;
use serimq_client::{MqttSession, SessionRegistry};
use serimq_serial::SerialReader;
use serimq_types::{BridgeError, Result};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level (default "info"); SERIMQ_LOG_FORMAT=json
    // emits newline-delimited JSON for log aggregators. Inbound broker
    // traffic is echoed with println! for UX consistency.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SERIMQ_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shutdown flag ─────────────────────────────────────────────────────
    // Set by the Ctrl-C handler, observed by the bridge loop before each
    // blocking serial read.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "Ctrl-C received, stopping the bridge ...".yellow().bold());
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; interrupt shutdown unavailable");
    }

    if let Err(e) = run(&shutdown) {
        eprintln!("{}: {e}", "error".red().bold());
        std::process::exit(1);
    }
}

fn run(shutdown: &AtomicBool) -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "serimq.json".to_string());
    let cfg = config::load_from(Path::new(&config_path))?;
    info!(
        broker = %cfg.broker,
        port = cfg.broker_port,
        sensors = cfg.sensors.len(),
        "configuration loaded"
    );

    // ── Broker side ───────────────────────────────────────────────────────
    let mut registry = SessionRegistry::new();
    let mut session = MqttSession::connect(&mut registry, &cfg.broker, Some(cfg.broker_port))?;
    println!(
        "  Session {} connected to {}",
        session.id().to_string().bold(),
        format!("{}:{}", session.host(), session.port()).bold()
    );

    // ── Serial side ───────────────────────────────────────────────────────
    let serial_port = match &cfg.serial.port {
        Some(port) => port.clone(),
        None => ports::resolve(true)?.ok_or_else(|| {
            BridgeError::SerialConnection("no serial port resolved".to_string())
        })?,
    };
    let reader = SerialReader::open(&serial_port, cfg.serial.baud_rate, cfg.serial.encoding)?;
    println!(
        "  Reading {} at {} baud ({})",
        serial_port.bold(),
        cfg.serial.baud_rate,
        cfg.serial.encoding
    );

    // ── Wiring ────────────────────────────────────────────────────────────
    // Echo everything the broker sends back on the routed topics.
    session.set_message_callback(Some(Box::new(|topic, payload| {
        println!("{topic}: {payload}");
    })));
    for entry in cfg.sensors.values() {
        session.subscribe(&entry.topic)?;
    }
    session.start_background_loop()?;

    let mut bridge = Bridge::new(reader, session);
    for (hardware_id, entry) in &cfg.sensors {
        bridge.router_mut().route(hardware_id, Some(&entry.topic));
        info!(sensor = %entry.name, %hardware_id, topic = %entry.topic, "sensor routed");
    }
    bridge.errors_mut().set_topic(cfg.error_topic.as_deref());

    println!();
    bridge.run(shutdown)
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "serimq".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Serial-to-MQTT sensor bridge");
    println!();
}
