//! ProTracker MOD loader and software mixer
//!
//! This crate provides a [`Decoder`](modplay_common::Decoder) for Amiga-style
//! `.mod` modules. Each call to `produce_frame` renders one sequencer tick as
//! signed 16-bit interleaved stereo together with the song position that tick
//! belongs to.
//!
//! # Features
//!
//! - 31-instrument modules: `M.K.`, `M!K!`, `FLT4`, `xCHN` and `xxCH` (1-32 channels)
//! - Amiga LRRL panning, fine tune, looped and one-shot samples
//! - ProTracker effect set including pattern loop, pattern delay and note delay
//! - Duration pre-scan, so seeking to an order position also moves the clock
//!
//! # Example
//!
//! ```no_run
//! use modplay_common::{Decoder, ModuleSource};
//! use modplay_protracker::ProTrackerDecoder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("song.mod")?;
//! let mut decoder = ProTrackerDecoder::new();
//! decoder.load(ModuleSource::Bytes(&data))?;
//! decoder.restart(44_100)?;
//!
//! let frame = decoder.produce_frame()?;
//! println!("order {} row {}: {} bytes", frame.info.order, frame.info.row, frame.pcm.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod channel;
mod sequencer;
mod tables;

pub mod effect;
pub mod format;
pub mod player;

pub use effect::Effect;
pub use format::{Module, Note, Sample, period_to_note};
pub use player::ProTrackerDecoder;
