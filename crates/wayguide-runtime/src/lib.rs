//! `wayguide-runtime` – The Guide Loop
//!
//! The execution engine that turns sensor samples into spoken guidance.
//!
//! # Modules
//!
//! - [`guide_loop`] – [`GuideLoop`][guide_loop::GuideLoop]:
//!   owns the [`SensorRig`][wayguide_hal::SensorRig] and runs the 1 Hz
//!   navigation tick and the 10 Hz obstacle tick, publishing navigation,
//!   transit, obstacle and sensor-health events on the
//!   [`EventBus`][wayguide_middleware::EventBus].
//! - [`repeat_suppressor`] – [`RepeatSuppressor`][repeat_suppressor::RepeatSuppressor]:
//!   mutes a warning that was already spoken for the same object, tier and
//!   frame position within the cooldown.  Emergencies are never muted.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export
//!   to Jaeger, Grafana Tempo, or any OTLP-compatible collector.

pub mod guide_loop;
pub mod repeat_suppressor;
pub mod telemetry;

pub use guide_loop::{GuideLoop, GuideLoopConfig};
pub use repeat_suppressor::RepeatSuppressor;
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};
