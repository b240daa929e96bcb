//! Real-time tracker module playback engine.
//!
//! This crate streams a [`Decoder`](modplay_common::Decoder) to an audio
//! device and reports where playback is, so a UI can follow along.
//!
//! # Architecture
//!
//! ```text
//! AudioOutput ──buffer done──▶ PlaybackEngine ──produce_frame──▶ Decoder
//!      ▲                            │
//!      └──────── refilled buffer ───┤
//!                                   ▼
//!                      event queue ──▶ PlayerController / UI
//! ```
//!
//! - [`BufferPool`]: fixed set of PCM buffers cycled between engine and device
//! - [`AudioOutput`]: device adapter; [`RodioOutput`] with the `streaming` feature
//! - [`PlaybackEngine`]: decodes on demand from the device callback and derives
//!   row/pattern/time events
//! - [`PlayerController`]: the Unloaded/Loaded/Playing/Paused/Stopped state machine
//!
//! # Example
//!
//! ```ignore
//! use modplay_engine::{EngineConfig, PlaybackEngine, PlayerController, RodioOutput};
//! use modplay_protracker::ProTrackerDecoder;
//!
//! let engine = PlaybackEngine::new(
//!     ProTrackerDecoder::new(),
//!     RodioOutput::new(),
//!     EngineConfig::low_latency(),
//! )?;
//! let mut player = PlayerController::new(engine);
//! player.load("song.mod".as_ref())?;
//! player.play()?;
//! loop {
//!     for event in player.poll_events() {
//!         println!("{event:?}");
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod output;
pub mod pool;

pub use config::EngineConfig;
pub use controller::{Action, Command, PlayerController, transition};
pub use engine::{PlaybackEngine, PositionSnapshot};
pub use error::{DeviceError, EngineError, Result, StartError};
pub use events::{EventPublisher, EventSubscriber, PlayerEvent, event_queue};
pub use output::{AudioFormat, AudioOutput, BufferDoneHandler, Refill, StopMode};
pub use pool::{BufferPool, PcmBuffer};

#[cfg(feature = "streaming")]
pub use output::RodioOutput;

pub use modplay_common::{ModuleInfo, PlayerState};
