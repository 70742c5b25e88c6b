//! REPL – Read-Eval-Print Loop for the Wayguide interactive shell.
//!
//! Supported slash-commands:
//!   /help                   – show this list
//!   /route                  – print the demo route
//!   /start [dest] [mode]    – fetch directions from the current fix and go
//!   /tick [n]               – run n obstacle + navigation cycles
//!   /board                  – confirm boarding the transit vehicle
//!   /stop                   – the vehicle passed a stop
//!   /next                   – skip to the next step
//!   /cancel                 – stop navigating
//!   /status                 – progress, current step and transit state
//!   /feeds                  – sensor drivers and silent feeds
//!   /fix <lat> <lon>        – publish a position fix (feed mode)
//!   /range <cm>             – publish a ranging sample (feed mode)
//!   /json                   – toggle raw JSON event output
//!   /settings               – print the effective configuration
//!   /quit | /exit           – gracefully exit the CLI

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use wayguide_hal::{
    DirectionsMode, FeedWriters, RouteBuilder, SensorRig, SimRig, SimRouteProvider,
};
use wayguide_middleware::{EventBus, SpeechQueue, Topic, TopicReceiver};
use wayguide_nav::{SharedSession, TransitStatus};
use wayguide_runtime::GuideLoop;
use wayguide_types::route::format_distance;
use wayguide_types::{
    BoundingBox, DetectedObject, Event, EventPayload, GeoPoint, GuideError, Route, TransitInfo,
};

use crate::config::{Config, SensorMode};

const DEMO_DESTINATION: &str = "library";

// ─────────────────────────────────────────────────────────────────────────────
// Demo world
// ─────────────────────────────────────────────────────────────────────────────

fn p(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint { lat, lon }
}

fn origin() -> GeoPoint {
    p(12.9600, 77.6400)
}

fn bus_stop() -> GeoPoint {
    p(12.9610, 77.6400)
}

fn alighting_point() -> GeoPoint {
    p(12.9700, 77.6400)
}

fn library() -> GeoPoint {
    p(12.9700, 77.6410)
}

/// Walk to the stop, three stops on bus 201, walk to the door.
pub fn demo_transit_route() -> Route {
    RouteBuilder::new(origin())
        .walk("Walk north to the Domlur bus stop", bus_stop())
        .transit(
            "Take bus 201 towards Majestic",
            alighting_point(),
            TransitInfo {
                line: "201".to_string(),
                vehicle: "bus".to_string(),
                headsign: Some("Majestic".to_string()),
                boarding_stop: "Domlur".to_string(),
                alighting_stop: "Majestic".to_string(),
                total_stops: 3,
                boarding_location: Some(bus_stop()),
                alighting_location: Some(alighting_point()),
            },
        )
        .walk("Turn right and walk to the library entrance", library())
        .addresses("Home", "City Library")
        .build()
}

/// The same trip on foot.
pub fn demo_walking_route() -> Route {
    RouteBuilder::new(origin())
        .walk("Walk north along the main road", alighting_point())
        .walk("Turn right and walk to the library entrance", library())
        .addresses("Home", "City Library")
        .build()
}

/// GPS trace of the transit trip, one point per navigation tick.
fn demo_path() -> Vec<GeoPoint> {
    vec![
        origin(),
        p(12.9603, 77.6400),
        p(12.9606, 77.6400),
        p(12.96095, 77.6400),
        bus_stop(),
        p(12.9640, 77.6400),
        p(12.9670, 77.6400),
        p(12.9690, 77.6400),
        p(12.9700, 77.6403),
        p(12.9700, 77.6407),
        library(),
    ]
}

fn detection(label: &str, x1: f32, x2: f32, height: f32) -> DetectedObject {
    DetectedObject {
        label: label.to_string(),
        confidence: 0.85,
        bbox: BoundingBox::new(x1, 100.0, x2, 100.0 + height),
        frame_width: 0,
        frame_height: 0,
    }
}

fn demo_rig() -> SensorRig {
    SimRig::builder()
        .with_path(demo_path())
        .with_ranging(vec![
            Some(380.0),
            Some(250.0),
            Some(120.0),
            Some(80.0),
            Some(45.0),
            Some(390.0),
        ])
        .with_detections(vec![
            vec![],
            vec![],
            vec![],
            vec![detection("person", 290.0, 350.0, 300.0)],
            vec![
                detection("person", 290.0, 350.0, 320.0),
                detection("bench", 20.0, 160.0, 90.0),
            ],
            vec![],
        ])
        .build()
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo session
// ─────────────────────────────────────────────────────────────────────────────

/// Everything one REPL session drives.
pub struct Demo {
    cfg: Config,
    guide: GuideLoop,
    provider: SimRouteProvider,
    writers: Option<FeedWriters>,
    events: TopicReceiver,
    speech: SpeechQueue,
    json: bool,
}

impl Demo {
    pub fn new(cfg: Config, bus: EventBus) -> Self {
        let (rig, writers) = match cfg.sensor_mode {
            SensorMode::Sim => (demo_rig(), None),
            SensorMode::Feed => {
                let (rig, writers) = SensorRig::feed(
                    Duration::from_millis(cfg.max_fix_age_ms),
                    Duration::from_millis(cfg.guide_loop.vision_deadline_ms),
                );
                (rig, Some(writers))
            }
        };
        let guide = GuideLoop::with_parts(
            cfg.guide_loop.clone(),
            rig,
            SharedSession::new(cfg.navigation),
            cfg.fusion,
        )
        .with_bus(bus.clone());
        let provider = SimRouteProvider::new()
            .with_route(DEMO_DESTINATION, DirectionsMode::Transit, demo_transit_route())
            .with_route(DEMO_DESTINATION, DirectionsMode::Walking, demo_walking_route());

        Self {
            cfg,
            guide,
            provider,
            writers,
            events: bus.subscribe_all(),
            speech: SpeechQueue::default(),
            json: false,
        }
    }

    pub fn guide(&self) -> &GuideLoop {
        &self.guide
    }

    /// Run one command line and return what should be printed.
    pub fn execute(&mut self, line: &str) -> Result<Vec<String>, GuideError> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let mut out = Vec::new();

        match cmd {
            "/help" => out.extend(help_lines()),
            "/route" => out.extend(demo_transit_route().overview()),
            "/start" => {
                let destination = args.first().copied().unwrap_or(DEMO_DESTINATION);
                let mode = match args.get(1) {
                    Some(m) => m.parse::<DirectionsMode>()?,
                    None => DirectionsMode::Transit,
                };
                self.guide.navigate_to(&self.provider, destination, mode)?;
                out.push(format!("Navigating to {} ({:?})", destination.bold(), mode));
            }
            "/tick" => {
                let n = match args.first() {
                    Some(raw) => raw.parse::<u32>().map_err(|_| {
                        GuideError::Config(format!("'{raw}' is not a tick count"))
                    })?,
                    None => 1,
                };
                for _ in 0..n {
                    self.guide.obstacle_tick(Instant::now());
                    if let Some(outcome) = self.guide.nav_tick(Instant::now())? {
                        let to_go = outcome
                            .distance_to_step_end_m
                            .map(format_distance)
                            .unwrap_or_else(|| "no fix".to_string());
                        out.push(format!(
                            "{} step {} · {} to step end{}",
                            "·".dimmed(),
                            outcome.step_index + 1,
                            to_go,
                            if outcome.stale { " (stale)" } else { "" }
                        ));
                    }
                }
            }
            "/board" => self.guide.board()?,
            "/stop" => self.guide.mark_stop_passed()?,
            "/next" => self.guide.advance_step()?,
            "/cancel" => self.guide.stop_navigation(),
            "/status" => out.extend(self.status_lines()),
            "/feeds" => {
                out.extend(self.guide.rig().describe());
                let silent = self.guide.silent_feeds();
                if silent.is_empty() {
                    out.push(format!("{}", "All feeds delivering".green()));
                } else {
                    for feed in silent {
                        out.push(format!("{} {}", "silent:".yellow(), feed));
                    }
                }
            }
            "/fix" => {
                let writers = self.feed_writers()?;
                let (Some(lat), Some(lon)) = (
                    args.first().and_then(|v| v.parse::<f64>().ok()),
                    args.get(1).and_then(|v| v.parse::<f64>().ok()),
                ) else {
                    return Err(GuideError::Config("usage: /fix <lat> <lon>".to_string()));
                };
                let fix = p(lat, lon);
                fix.validate()?;
                writers.position.publish(fix);
                out.push(format!("Fix published: {lat}, {lon}"));
            }
            "/range" => {
                let writers = self.feed_writers()?;
                let cm = args
                    .first()
                    .and_then(|v| v.parse::<f32>().ok())
                    .ok_or_else(|| GuideError::Config("usage: /range <cm>".to_string()))?;
                writers.ranging.publish(cm);
                out.push(format!("Ranging sample published: {cm} cm"));
            }
            "/json" => {
                self.json = !self.json;
                out.push(format!("JSON event output {}", if self.json { "on" } else { "off" }));
            }
            "/settings" => {
                let raw = toml::to_string_pretty(&self.cfg)
                    .map_err(|e| GuideError::Config(e.to_string()))?;
                out.extend(raw.lines().map(str::to_string));
            }
            other => out.push(format!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            )),
        }

        out.extend(self.flush_events());
        Ok(out)
    }

    fn feed_writers(&self) -> Result<&FeedWriters, GuideError> {
        self.writers.as_ref().ok_or_else(|| {
            GuideError::Config("only available with sensor_mode = \"feed\"".to_string())
        })
    }

    fn status_lines(&self) -> Vec<String> {
        let progress = self.guide.session().get_progress();
        let mut out = vec![format!(
            "{:?} · step {}/{} · {} / {:.0} min remaining",
            progress.status,
            (progress.step_index + 1).min(progress.total_steps),
            progress.total_steps,
            format_distance(progress.distance_remaining_m),
            progress.duration_remaining_s / 60.0
        )];
        self.guide.session().read(|s| {
            if let Some(step) = s.current_step() {
                out.push(format!("  {}", step.instruction.bold()));
            }
            match s.transit().map(|t| t.status()) {
                Some(TransitStatus::Waiting { instruction, .. }) => {
                    out.push(format!("  {}", instruction.cyan()));
                }
                Some(TransitStatus::OnVehicle {
                    line,
                    stops_passed,
                    stops_remaining,
                    warning,
                    ..
                }) => {
                    out.push(format!(
                        "  On {line}: {stops_passed} passed, {stops_remaining} to go. {}",
                        warning.to_string().cyan()
                    ));
                }
                None => {}
            }
        });
        out
    }

    /// Print bus traffic and speak whatever the queue holds, most urgent
    /// first.
    fn flush_events(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        for event in self.events.drain() {
            out.push(self.render(&event));
            self.speech.push_event(&event);
        }
        while let Some(item) = self.speech.pop() {
            out.push(format!("🔊 {}", item.text.bold()));
        }
        out
    }

    fn render(&self, event: &Event) -> String {
        if self.json {
            return serde_json::to_string(event).unwrap_or_else(|e| e.to_string());
        }
        let body = match &event.payload {
            EventPayload::Navigation(nav) => nav.spoken_text().unwrap_or_else(|| format!("{nav:?}")),
            EventPayload::Obstacles(warnings) => warnings
                .iter()
                .map(|w| w.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            EventPayload::SystemAlert { component, message } => format!("{component}: {message}"),
        };
        format!(
            "[{}] {:>12} {}",
            event.timestamp.format("%H:%M:%S"),
            format!("{:?}", Topic::of(&event.payload)).dimmed(),
            body
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, cfg: Config, bus: EventBus) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    let mut demo = Demo::new(cfg, bus);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = match editor.readline("wayguide> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(cmd);

        if matches!(cmd, "/quit" | "/exit") {
            demo.guide.stop_navigation();
            for line in demo.flush_events() {
                println!("{line}");
            }
            println!("{}", "Goodbye.".green());
            shutdown.store(true, Ordering::SeqCst);
            break;
        }

        match demo.execute(cmd) {
            Ok(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
            Err(e) => println!("{}: {}", "Error".red(), e),
        }
    }
}

fn help_lines() -> Vec<String> {
    let entries = [
        ("/route", "print the demo route"),
        ("/start [dest] [mode]", "navigate from the current fix (default: library, transit)"),
        ("/tick [n]", "run n obstacle + navigation cycles"),
        ("/board", "confirm boarding the vehicle"),
        ("/stop", "the vehicle passed a stop"),
        ("/next", "skip to the next step"),
        ("/cancel", "stop navigating"),
        ("/status", "progress and transit state"),
        ("/feeds", "sensor drivers and silent feeds"),
        ("/fix <lat> <lon>", "publish a position fix (feed mode)"),
        ("/range <cm>", "publish a ranging sample (feed mode)"),
        ("/json", "toggle raw JSON event output"),
        ("/settings", "print the effective configuration"),
        ("/quit  /exit", "exit the CLI"),
    ];
    let mut out = vec![format!("{}", "Wayguide Commands".bold().underline())];
    out.extend(
        entries
            .iter()
            .map(|(cmd, what)| format!("  {:<22} – {}", cmd.bold().cyan(), what)),
    );
    out
}
