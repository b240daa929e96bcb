//! Common traits and types for tracker module players.
//!
//! This crate provides the shared contract between a module decoder (which
//! turns a tracker song into PCM one frame at a time) and the real-time
//! playback engine that streams those frames to an audio device.
//!
//! # Traits
//!
//! - [`Decoder`] - Stateful, non-reentrant decoding engine for one loaded module
//!
//! # Types
//!
//! - [`ModuleInfo`] - Immutable snapshot of a loaded module, including the decoded pattern grid
//! - [`FrameInfo`] / [`Frame`] - One decode step: PCM bytes plus position metadata
//! - [`PlayerState`] - User-facing playback state machine states
//!
//! # Example
//!
//! ```ignore
//! use modplay_common::{Decoder, ModuleSource};
//!
//! fn decode_all<D: Decoder>(decoder: &mut D, path: &std::path::Path) {
//!     decoder.load(ModuleSource::Path(path)).unwrap();
//!     decoder.restart(44_100).unwrap();
//!     while let Ok(frame) = decoder.produce_frame() {
//!         println!("row {} -> {} bytes", frame.info.row, frame.pcm.len());
//!     }
//! }
//! ```

#![warn(missing_docs)]

mod decoder;
mod error;
mod module_info;
mod state;

pub use decoder::{Decoder, Frame, FrameInfo, ModuleSource};
pub use error::{FrameError, LoadError};
pub use module_info::{ModuleInfo, PatternCell, PatternGrid, format_cell, format_row};
pub use state::PlayerState;

// ============================================================================
// Common Constants
// ============================================================================

/// Output sample rate used by the playback engine (44.1 kHz CD quality).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Output channel count (interleaved stereo).
pub const OUTPUT_CHANNELS: u16 = 2;

/// Bytes per sample of the output format (signed 16-bit, native byte order).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes per interleaved output frame (one sample for each channel).
pub const BYTES_PER_FRAME: usize = OUTPUT_CHANNELS as usize * BYTES_PER_SAMPLE;

/// Restart positions at or above this value mean "do not loop".
pub const NO_RESTART: usize = 127;
