//! Decoding engine contract.
//!
//! A [`Decoder`] owns at most one loaded module and synthesizes one frame of
//! PCM per call. It is stateful and resumable but not reentrant: callers must
//! serialize every call into it.

use crate::{FrameError, LoadError, ModuleInfo};
use std::path::Path;

/// Where module data comes from.
#[derive(Debug, Clone, Copy)]
pub enum ModuleSource<'a> {
    /// A readable module file on disk.
    Path(&'a Path),
    /// Module data already held in memory.
    Bytes(&'a [u8]),
}

/// Position metadata valid at the instant a frame was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Index into the module's play sequence.
    pub order: usize,
    /// Pattern played at `order`.
    pub pattern: usize,
    /// Row within the pattern.
    pub row: usize,
    /// Elapsed song time in milliseconds.
    pub elapsed_ms: u64,
    /// Number of times the song has wrapped back to an earlier position.
    pub loop_count: u32,
}

impl FrameInfo {
    /// Whole seconds of elapsed song time.
    #[inline]
    #[must_use]
    pub fn seconds(&self) -> u64 {
        self.elapsed_ms / 1000
    }
}

/// One decode step: interleaved PCM bytes plus metadata.
///
/// The PCM slice borrows the decoder's internal buffer and is only valid until
/// the next call into the decoder.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Signed 16-bit stereo samples, native byte order.
    pub pcm: &'a [u8],
    /// Position metadata for this frame.
    pub info: FrameInfo,
}

/// Stateful decoding engine for tracker modules.
///
/// Implementations hold at most one module at a time. Loading a new module
/// replaces the previous one.
pub trait Decoder: Send {
    /// Load a module, replacing any module loaded before.
    fn load(&mut self, source: ModuleSource<'_>) -> Result<(), LoadError>;

    /// Whether a module is currently loaded.
    fn is_loaded(&self) -> bool;

    /// Snapshot of the loaded module. Does not mutate decoder state.
    fn module_info(&self) -> Option<ModuleInfo>;

    /// Rewind the cursor to order position 0 and prepare to render at `sample_rate`.
    fn restart(&mut self, sample_rate: u32) -> Result<(), FrameError>;

    /// Render the next frame.
    ///
    /// Any error means "no more audio": the song ended, playback was stopped,
    /// or decoding failed.
    fn produce_frame(&mut self) -> Result<Frame<'_>, FrameError>;

    /// Halt playback; subsequent frames report [`FrameError::Stopped`].
    fn stop(&mut self);

    /// Relocate playback to order position `order`.
    fn set_position(&mut self, order: usize);

    /// Mute or unmute a channel in the mix.
    fn set_channel_mute(&mut self, channel: usize, mute: bool);

    /// Release the loaded module.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_info_seconds_floor() {
        let info = FrameInfo {
            elapsed_ms: 2_999,
            ..Default::default()
        };
        assert_eq!(info.seconds(), 2);

        let info = FrameInfo {
            elapsed_ms: 3_000,
            ..Default::default()
        };
        assert_eq!(info.seconds(), 3);
    }
}
