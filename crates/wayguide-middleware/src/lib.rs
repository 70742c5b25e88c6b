//! `wayguide-middleware` – The Nervous System
//!
//! Carries navigation decisions and obstacle warnings from the guide loop to
//! whatever speaks or displays them, without caring how they were produced.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`speech_queue`] – Priority queue that orders sentences for the audio
//!   sink so emergencies are never stuck behind routine prompts.

pub mod bus;
pub mod speech_queue;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use speech_queue::{SpeechItem, SpeechPriority, SpeechQueue};
