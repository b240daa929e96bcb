//! Device output adapter.
//!
//! An [`AudioOutput`] plays queued [`PcmBuffer`]s and, each time the device
//! has consumed one, calls the [`BufferDoneHandler`] it was opened with to
//! get a refilled buffer back. Buffers played out after an end of stream go
//! through the handler too, so the owner sees every buffer return. The handler runs on the device's own thread
//! and must answer synchronously.

use crate::error::DeviceError;
use crate::pool::PcmBuffer;

#[cfg(feature = "streaming")]
mod stream;

#[cfg(feature = "streaming")]
pub use stream::RodioOutput;

/// PCM stream format. Samples are signed 16-bit in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channels
    pub channels: u16,
}

/// Handler's answer to a consumed buffer.
#[derive(Debug)]
pub enum Refill {
    /// Queue this buffer behind the ones already waiting.
    Queue(PcmBuffer),
    /// No more audio: play out what is queued, then stop.
    EndOfStream,
}

/// How [`AudioOutput::stop`] treats queued buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Let queued buffers finish playing.
    Drain,
    /// Silence the device now.
    Immediate,
}

/// Callback invoked on the device thread for every consumed buffer.
pub type BufferDoneHandler = Box<dyn FnMut(PcmBuffer) -> Refill + Send>;

/// An audio device that plays a queue of PCM buffers.
pub trait AudioOutput {
    /// Create the device stream. The handler is kept until [`close`](Self::close).
    fn open(&mut self, format: AudioFormat, on_buffer_done: BufferDoneHandler)
    -> Result<(), DeviceError>;

    /// Queue a filled buffer for playback.
    fn enqueue(&mut self, buffer: PcmBuffer) -> Result<(), DeviceError>;

    /// Begin pulling queued buffers.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Suspend the stream; no buffers are consumed while paused.
    fn pause(&mut self) -> Result<(), DeviceError>;

    /// Continue a paused stream.
    fn resume(&mut self) -> Result<(), DeviceError>;

    /// Stop the stream. No handler calls happen after an immediate stop returns.
    fn stop(&mut self, mode: StopMode);

    /// Hand back every buffer the device still holds once it is stopped.
    fn reclaim(&mut self) -> Vec<PcmBuffer>;

    /// Set output gain, 0.0..=1.0.
    fn set_volume(&mut self, volume: f32);

    /// Current output gain.
    fn volume(&self) -> f32;

    /// Dispose of the stream. Once this returns no handler call is in flight.
    fn close(&mut self);
}
