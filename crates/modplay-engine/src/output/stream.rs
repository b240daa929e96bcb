//! Audio device integration using rodio
//!
//! The device pulls samples from a queue of [`PcmBuffer`]s. Once every sample
//! of a buffer has been played, the buffer-done handler refills it and it goes
//! to the back of the queue.

use super::{AudioFormat, AudioOutput, BufferDoneHandler, Refill, StopMode};
use crate::error::DeviceError;
use crate::pool::PcmBuffer;
use parking_lot::Mutex;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Silence emitted per underrun, in sample frames.
const SILENCE_FRAMES: usize = 64;

/// State shared between the control side and the device thread.
struct SharedQueue {
    pending: Mutex<VecDeque<PcmBuffer>>,
    /// Buffer whose samples the source is emitting
    playing: Mutex<Option<PcmBuffer>>,
    spent: Mutex<Vec<PcmBuffer>>,
    handler: Mutex<Option<BufferDoneHandler>>,
    draining: AtomicBool,
    /// Bumped on every start and immediate stop; stale sources go quiet.
    generation: AtomicU64,
}

impl SharedQueue {
    fn new() -> Self {
        SharedQueue {
            pending: Mutex::new(VecDeque::with_capacity(8)),
            playing: Mutex::new(None),
            spent: Mutex::new(Vec::with_capacity(8)),
            handler: Mutex::new(None),
            draining: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Every buffer not yet handed back through the handler.
    fn take_all(&self) -> Vec<PcmBuffer> {
        let mut buffers: Vec<PcmBuffer> = self.playing.lock().take().into_iter().collect();
        buffers.extend(self.pending.lock().drain(..));
        buffers.append(&mut self.spent.lock());
        buffers
    }
}

enum Pull {
    Loaded,
    Underrun,
    Finished,
}

/// Audio source that plays the buffer queue
struct QueueSource {
    shared: Arc<SharedQueue>,
    generation: u64,
    sample_rate: u32,
    channels: u16,
    /// Samples copied out of the last consumed buffer
    scratch: Vec<i16>,
    pos: usize,
}

impl QueueSource {
    fn new(shared: Arc<SharedQueue>, format: AudioFormat, scratch_capacity: usize) -> Self {
        let generation = shared.generation.load(Ordering::Acquire);
        let silence = SILENCE_FRAMES * usize::from(format.channels);
        QueueSource {
            shared,
            generation,
            sample_rate: format.sample_rate,
            channels: format.channels,
            scratch: Vec::with_capacity(scratch_capacity.max(silence)),
            pos: 0,
        }
    }

    fn is_stale(&self) -> bool {
        self.shared.generation.load(Ordering::Acquire) != self.generation
    }

    /// Hand the played-out buffer back, then load the next one.
    ///
    /// Runs entirely under the handler lock: once an immediate stop has
    /// bumped the generation and taken that lock, no source touches the queue.
    fn pull(&mut self) -> Pull {
        let mut handler = self.shared.handler.lock();
        if self.is_stale() {
            return Pull::Finished;
        }

        let done = self.shared.playing.lock().take();
        if let Some(buffer) = done {
            let Some(on_done) = handler.as_mut() else {
                self.shared.spent.lock().push(buffer);
                return Pull::Finished;
            };
            match on_done(buffer) {
                Refill::Queue(buffer) if self.shared.draining.load(Ordering::Acquire) => {
                    self.shared.spent.lock().push(buffer);
                }
                Refill::Queue(buffer) => self.shared.pending.lock().push_back(buffer),
                Refill::EndOfStream => {
                    if !self.shared.draining.swap(true, Ordering::AcqRel) {
                        debug!("end of stream, draining queued buffers");
                    }
                }
            }
        }

        let next = self.shared.pending.lock().pop_front();
        let Some(buffer) = next else {
            if self.shared.draining.load(Ordering::Acquire) {
                return Pull::Finished;
            }
            self.scratch.clear();
            self.scratch
                .resize(SILENCE_FRAMES * usize::from(self.channels), 0);
            self.pos = 0;
            return Pull::Underrun;
        };

        self.scratch.clear();
        self.scratch.extend(buffer.samples());
        self.pos = 0;
        *self.shared.playing.lock() = Some(buffer);
        Pull::Loaded
    }
}

impl Source for QueueSource {
    fn current_frame_len(&self) -> Option<usize> {
        // Format never changes mid-stream
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for QueueSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        loop {
            if self.is_stale() {
                return None;
            }
            if let Some(&sample) = self.scratch.get(self.pos) {
                self.pos += 1;
                return Some(sample);
            }
            if let Pull::Finished = self.pull() {
                return None;
            }
        }
    }
}

/// Audio output using rodio
///
/// Not `Send`: the underlying output stream must stay on the thread that
/// created it.
pub struct RodioOutput {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
    shared: Arc<SharedQueue>,
    format: Option<AudioFormat>,
    volume: f32,
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl RodioOutput {
    /// Create an output; no device is touched until [`AudioOutput::open`].
    pub fn new() -> Self {
        RodioOutput {
            stream: None,
            sink: None,
            shared: Arc::new(SharedQueue::new()),
            format: None,
            volume: 1.0,
        }
    }

    /// Check if the device stream exists
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Check if queued audio is still playing
    pub fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }

    /// Signal stale sources and wait out an in-flight handler call.
    fn invalidate_sources(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        drop(self.shared.handler.lock());
    }
}

impl AudioOutput for RodioOutput {
    fn open(
        &mut self,
        format: AudioFormat,
        on_buffer_done: BufferDoneHandler,
    ) -> Result<(), DeviceError> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(DeviceError::Format(format!("{format:?}")));
        }
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| DeviceError::Stream(e.to_string()))?;
        *self.shared.handler.lock() = Some(on_buffer_done);
        self.stream = Some((stream, handle));
        self.format = Some(format);
        debug!(?format, "audio output opened");
        Ok(())
    }

    fn enqueue(&mut self, buffer: PcmBuffer) -> Result<(), DeviceError> {
        if self.stream.is_none() {
            return Err(DeviceError::NotOpen);
        }
        self.shared.pending.lock().push_back(buffer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let (Some((_, handle)), Some(format)) = (&self.stream, self.format) else {
            return Err(DeviceError::NotOpen);
        };
        self.invalidate_sources();
        self.shared.draining.store(false, Ordering::Release);

        let scratch = self
            .shared
            .pending
            .lock()
            .iter()
            .map(|b| b.capacity() / 2)
            .max()
            .unwrap_or(0);
        let sink = Sink::try_new(handle).map_err(|e| DeviceError::Sink(e.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(QueueSource::new(Arc::clone(&self.shared), format, scratch));
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        let sink = self.sink.as_ref().ok_or(DeviceError::NotOpen)?;
        sink.pause();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        let sink = self.sink.as_ref().ok_or(DeviceError::NotOpen)?;
        sink.play();
        Ok(())
    }

    fn stop(&mut self, mode: StopMode) {
        match mode {
            StopMode::Drain => self.shared.draining.store(true, Ordering::Release),
            StopMode::Immediate => {
                self.invalidate_sources();
                if let Some(sink) = self.sink.take() {
                    sink.stop();
                }
            }
        }
    }

    fn reclaim(&mut self) -> Vec<PcmBuffer> {
        self.shared.take_all()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn close(&mut self) {
        self.stop(StopMode::Immediate);
        if self.shared.handler.lock().take().is_some() {
            debug!("audio output closed");
        }
        let leftover = self.reclaim().len();
        if leftover > 0 {
            warn!(leftover, "buffers still queued at close");
        }
        self.stream = None;
        self.format = None;
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.close();
    }
}
