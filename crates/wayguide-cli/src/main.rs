//! `wayguide-cli` – Wayguide Command Line Interface
//!
//! This binary is the entry point for the Wayguide stack.  It:
//!
//! 1. Initialises structured logging (and OTLP export when
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set).
//! 2. Checks for `~/.wayguide/config.toml`; writes the defaults on first run.
//! 3. Drops the user into an **interactive REPL** that drives a simulated
//!    walk + bus trip (or externally fed sensors) through the guide loop.
//! 4. Intercepts **Ctrl-C** to publish a shutdown alert and exit safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use wayguide_middleware::EventBus;
use wayguide_types::{Event, EventPayload};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); WAYGUIDE_LOG_FORMAT=json switches
    // to newline-delimited JSON.  User-facing output still uses println!.
    let _telemetry = wayguide_runtime::init_tracing("wayguide-cli");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let bus = EventBus::default();
    let bus_ctrlc = bus.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping guidance …".yellow().bold());

        let stop_event = Event::new(
            "wayguide-cli",
            EventPayload::SystemAlert {
                component: "cli".to_string(),
                message: "Guidance stopped".to_string(),
            },
        );
        let _ = bus_ctrlc.publish(stop_event);

        println!("{}", "  ✓ Exiting Wayguide.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── First run ─────────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    println!(
        "  Sensors: {}   Announce at {} m, off-route beyond {} m",
        cfg.sensor_mode.to_string().bold(),
        cfg.navigation.announce_m,
        cfg.navigation.off_route_m
    );
    println!();
    println!(
        "  Type {} for a list of commands, {} to begin.\n",
        "/help".bold().cyan(),
        "/start".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown, cfg, bus);
}

/// Persist the defaults so there is a file to edit.
fn first_run() -> config::Config {
    let cfg = config::Config::default();
    println!("  No configuration found, writing defaults.");
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#" _      __                   _     __    "#.bold().cyan());
    println!("{}", r#"| | /| / /__ ___ _____ ___ _(_)__/ /__  "#.bold().cyan());
    println!("{}", r#"| |/ |/ / _ `/ // / _ `/ // / / _  / -_) "#.bold().cyan());
    println!("{}", r#"|__/|__/\_,_/\_, /\_, /\_,_/_/\_,_/\__/  "#.bold().cyan());
    println!("{}", r#"            /___//___/                   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Wayguide".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Audio navigation and obstacle warnings");
    println!();
}
