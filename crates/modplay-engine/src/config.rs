//! Engine configuration.

use crate::{EngineError, Result};
use modplay_common::{BYTES_PER_SAMPLE, DEFAULT_SAMPLE_RATE, OUTPUT_CHANNELS};
use serde::{Deserialize, Serialize};

/// Output stream and buffer pool settings.
///
/// The output format is fixed at 44.1 kHz signed 16-bit interleaved stereo;
/// the pool size and buffer capacity trade latency against underrun risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of interleaved output channels
    pub channels: u16,

    /// Buffers cycled between engine and device
    pub buffer_count: usize,

    /// Capacity of each buffer in bytes
    ///
    /// A decoded frame larger than this is truncated. 16 KiB holds one tick
    /// at the slowest tempo a module can select.
    pub buffer_bytes: usize,

    /// Events the queue holds before new ones are dropped
    pub event_capacity: usize,

    /// Output volume at start-up, 0.0..=1.0
    pub initial_volume: f32,
}

impl EngineConfig {
    /// Create a configuration optimized for low latency
    /// Pool = 3 × 8 KiB ≈ 139ms @ 44.1kHz stereo
    pub fn low_latency() -> Self {
        EngineConfig {
            buffer_count: 3,
            buffer_bytes: 8192,
            ..Self::stable()
        }
    }

    /// Create a configuration optimized for stability
    /// Pool = 3 × 16 KiB ≈ 279ms @ 44.1kHz stereo
    pub fn stable() -> Self {
        EngineConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: OUTPUT_CHANNELS,
            buffer_count: 3,
            buffer_bytes: 16_384,
            event_capacity: 256,
            initial_volume: 1.0,
        }
    }

    /// Bytes per interleaved sample frame
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channels) * BYTES_PER_SAMPLE
    }

    /// Get worst-case queued latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        let frames = (self.buffer_count * self.buffer_bytes) as f32 / self.frame_bytes().max(1) as f32;
        frames / self.sample_rate.max(1) as f32 * 1000.0
    }

    /// Check the settings before any allocation happens.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate != DEFAULT_SAMPLE_RATE {
            return Err(EngineError::Config(format!(
                "sample rate must be {DEFAULT_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            )));
        }
        if self.channels != OUTPUT_CHANNELS {
            return Err(EngineError::Config(format!(
                "output must be stereo, got {} channels",
                self.channels
            )));
        }
        if self.buffer_count == 0 {
            return Err(EngineError::Config("buffer count must be at least 1".into()));
        }
        if self.buffer_bytes == 0 || self.buffer_bytes % self.frame_bytes() != 0 {
            return Err(EngineError::Config(format!(
                "buffer capacity {} is not a positive multiple of {} bytes",
                self.buffer_bytes,
                self.frame_bytes()
            )));
        }
        if self.event_capacity == 0 {
            return Err(EngineError::Config("event capacity must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(EngineError::Config(format!(
                "initial volume {} outside 0.0..=1.0",
                self.initial_volume
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::stable()
    }
}
