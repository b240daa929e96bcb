//! Real-time playback engine.
//!
//! [`PlaybackEngine`] bridges a [`Decoder`] and an [`AudioOutput`]. The device
//! asks for a refill every time it has consumed a buffer; the engine answers
//! from the device thread by decoding one frame into that buffer, updating the
//! position state and publishing whatever changed.
//!
//! Everything the device thread touches lives in [`EngineCore`] behind a
//! single mutex. Control calls take the same lock, so decoder access is
//! serialized and position reads never observe a half-updated tuple. The lock
//! is never held while calling into the output.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result, StartError};
use crate::events::{EventPublisher, EventSubscriber, PlayerEvent, event_queue};
use crate::output::{AudioFormat, AudioOutput, BufferDoneHandler, Refill, StopMode};
use crate::pool::{BufferPool, PcmBuffer};
use modplay_common::{Decoder, FrameError, FrameInfo, LoadError, ModuleInfo, ModuleSource};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Consistent copy of the engine's position state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionSnapshot {
    /// Order position of the last frame played while running.
    pub order: usize,
    /// Pattern at `order`.
    pub pattern: usize,
    /// Row of the last produced frame.
    pub row: usize,
    /// Elapsed whole seconds.
    pub seconds: u64,
    /// Whether the device callback is producing frames.
    pub running: bool,
    /// Whether a module is loaded.
    pub valid: bool,
}

/// State shared with the device callback.
struct EngineCore<D> {
    decoder: D,
    info: Option<Arc<ModuleInfo>>,
    order: usize,
    pattern: usize,
    row: usize,
    seconds: u64,
    running: bool,
    /// End of stream seen; waiting for the device to hand back every buffer.
    finishing: bool,
    valid: bool,
    loops: bool,
    mutes: Vec<bool>,
    pool: BufferPool,
    events: EventPublisher,
}

impl<D: Decoder> EngineCore<D> {
    fn reset_position(&mut self) {
        self.order = 0;
        self.pattern = self
            .info
            .as_ref()
            .and_then(|info| info.pattern_in_order(0))
            .unwrap_or(0);
        self.row = 0;
        self.seconds = 0;
    }

    fn unload(&mut self) {
        self.decoder.release();
        self.info = None;
        self.valid = false;
        self.loops = false;
        self.mutes.clear();
    }

    /// Decode one frame into `buffer` and derive position changes.
    fn refill(&mut self, buffer: &mut PcmBuffer) -> std::result::Result<(), FrameError> {
        let frame = match self.decoder.produce_frame() {
            Ok(frame) => frame,
            Err(FrameError::Fault(code)) => {
                warn!(code, "decoder fault, ending playback");
                return Err(FrameError::Fault(code));
            }
            Err(err) => {
                trace!(%err, "no more audio");
                return Err(err);
            }
        };
        let info = frame.info;
        if info.loop_count != 0 && !self.loops {
            trace!(order = info.order, "song wrapped and does not loop");
            return Err(FrameError::EndOfStream);
        }
        let dropped = buffer.write(frame.pcm);
        if dropped > 0 {
            warn!(dropped, capacity = buffer.capacity(), "frame truncated to buffer capacity");
        }
        self.derive(info);
        Ok(())
    }

    /// Row, then pattern, then time.
    ///
    /// Pre-filled frames leave the position alone, so the first frame played
    /// after a start is compared against what observers last saw.
    fn derive(&mut self, info: FrameInfo) {
        if !self.running {
            return;
        }
        if info.row != self.row {
            self.row = info.row;
            self.events.publish(PlayerEvent::RowChanged { row: info.row });
        }
        if info.order != self.order {
            self.order = info.order;
            self.pattern = info.pattern;
            self.events.publish(PlayerEvent::PatternChanged {
                pattern: info.pattern,
                position: info.order,
            });
        }
        let seconds = info.seconds();
        if seconds != self.seconds {
            self.seconds = seconds;
            self.events.publish(PlayerEvent::TimeChanged { seconds });
        }
    }

    /// Take back a buffer the device is done with.
    ///
    /// After end of stream the device keeps playing what it has queued;
    /// the song is over once the last of those buffers comes back.
    fn retire(&mut self, buffer: PcmBuffer) {
        if self.running {
            self.running = false;
            self.finishing = true;
        }
        self.pool.release(buffer);
        if self.finishing && self.pool.available() == self.pool.size() {
            self.finishing = false;
            debug!("device drained");
            self.events.publish(PlayerEvent::PlaybackFinished);
        }
    }

    /// Fill every free buffer ahead of a start.
    fn prefill(&mut self) -> std::result::Result<Vec<PcmBuffer>, StartError> {
        if self.pool.available() < self.pool.size() {
            return Err(StartError::PoolExhausted);
        }
        let mut filled = Vec::with_capacity(self.pool.size());
        while let Some(mut buffer) = self.pool.acquire() {
            match self.refill(&mut buffer) {
                Ok(()) => filled.push(buffer),
                Err(err) => {
                    trace!(%err, "pre-fill buffer back to the pool");
                    self.pool.release(buffer);
                    if filled.is_empty() {
                        return Err(StartError::Prefill(err));
                    }
                    debug!(filled = filled.len(), "song shorter than the buffer pool");
                    break;
                }
            }
        }
        Ok(filled)
    }
}

/// Streams a loaded module to an audio output.
///
/// # Example
///
/// ```ignore
/// use modplay_engine::{EngineConfig, PlaybackEngine, RodioOutput};
/// use modplay_protracker::ProTrackerDecoder;
///
/// let mut engine = PlaybackEngine::new(
///     ProTrackerDecoder::new(),
///     RodioOutput::new(),
///     EngineConfig::default(),
/// )?;
/// let info = engine.load("song.mod".as_ref())?;
/// println!("{} ({} channels)", info.title, info.channel_count);
/// engine.start()?;
/// ```
pub struct PlaybackEngine<D: Decoder + 'static, O: AudioOutput> {
    core: Arc<Mutex<EngineCore<D>>>,
    output: O,
    events: EventSubscriber,
    config: EngineConfig,
    initialized: bool,
}

impl<D: Decoder + 'static, O: AudioOutput> PlaybackEngine<D, O> {
    /// Create an engine. Nothing is allocated on the device until
    /// [`initialize`](Self::initialize) or the first [`start`](Self::start).
    pub fn new(decoder: D, mut output: O, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (publisher, events) = event_queue(config.event_capacity);
        output.set_volume(config.initial_volume);
        let core = EngineCore {
            decoder,
            info: None,
            order: 0,
            pattern: 0,
            row: 0,
            seconds: 0,
            running: false,
            finishing: false,
            valid: false,
            loops: false,
            mutes: Vec::new(),
            pool: BufferPool::default(),
            events: publisher,
        };
        Ok(PlaybackEngine {
            core: Arc::new(Mutex::new(core)),
            output,
            events,
            config,
            initialized: false,
        })
    }

    /// Load a module file.
    pub fn load(&mut self, path: &Path) -> Result<Arc<ModuleInfo>> {
        self.load_source(ModuleSource::Path(path))
    }

    /// Load a module held in memory.
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<Arc<ModuleInfo>> {
        self.load_source(ModuleSource::Bytes(data))
    }

    /// Load a module, replacing the current one.
    ///
    /// Playback is stopped first. On failure no module stays loaded.
    pub fn load_source(&mut self, source: ModuleSource<'_>) -> Result<Arc<ModuleInfo>> {
        self.stop();
        let mut core = self.core.lock();
        core.unload();

        let loaded = core.decoder.load(source).and_then(|()| {
            core.decoder
                .module_info()
                .ok_or_else(|| LoadError::corrupt("decoder reported no module"))
        });
        let info = match loaded {
            Ok(info) => Arc::new(info),
            Err(err) => {
                warn!(%err, "module load failed");
                core.unload();
                return Err(err.into());
            }
        };

        core.mutes = vec![false; info.channel_count];
        core.loops = info.loops();
        core.info = Some(Arc::clone(&info));
        core.valid = true;
        core.reset_position();
        info!(
            title = %info.title,
            format = %info.format,
            channels = info.channel_count,
            orders = info.sequence_length,
            "module loaded"
        );
        Ok(info)
    }

    /// Allocate the buffer pool and open the output stream.
    ///
    /// Does nothing if already initialized. A failure leaves nothing allocated.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let pool = BufferPool::allocate(self.config.buffer_count, self.config.buffer_bytes)
            .map_err(EngineError::DeviceInit)?;
        self.core.lock().pool = pool;

        let format = AudioFormat {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        };
        let handler = self.buffer_done_handler();
        if let Err(err) = self.output.open(format, handler) {
            warn!(%err, "audio output unavailable");
            self.core.lock().pool = BufferPool::default();
            return Err(EngineError::DeviceInit(err));
        }
        debug!(
            buffers = self.config.buffer_count,
            bytes = self.config.buffer_bytes,
            latency_ms = self.config.latency_ms(),
            "engine initialized"
        );
        self.initialized = true;
        Ok(())
    }

    /// The callback the output runs for every consumed buffer.
    fn buffer_done_handler(&self) -> BufferDoneHandler {
        let core = Arc::clone(&self.core);
        Box::new(move |mut buffer: PcmBuffer| {
            let mut core = core.lock();
            if core.running && core.refill(&mut buffer).is_ok() {
                return Refill::Queue(buffer);
            }
            core.retire(buffer);
            Refill::EndOfStream
        })
    }

    /// Rewind the decoder, pre-fill every buffer and start the device.
    ///
    /// On error the device is left stopped and the running flag clear.
    pub fn start(&mut self) -> Result<()> {
        self.initialize()?;
        self.halt_output();

        let filled = {
            let mut core = self.core.lock();
            if !core.valid {
                return Err(EngineError::NotLoaded);
            }
            core.running = false;
            core.finishing = false;
            core.decoder
                .restart(self.config.sample_rate)
                .map_err(StartError::Restart)?;
            core.prefill()?
        };

        let count = filled.len();
        for buffer in filled {
            if let Err(err) = self.output.enqueue(buffer) {
                self.halt_output();
                return Err(StartError::Device(err).into());
            }
        }

        self.core.lock().running = true;
        if let Err(err) = self.output.start() {
            self.core.lock().running = false;
            self.halt_output();
            return Err(StartError::Device(err).into());
        }
        debug!(buffers = count, "playback started");
        Ok(())
    }

    /// Stop the device and take back every buffer it holds.
    fn halt_output(&mut self) {
        if !self.initialized {
            return;
        }
        self.output.stop(StopMode::Immediate);
        let buffers = self.output.reclaim();
        let mut core = self.core.lock();
        for buffer in buffers {
            core.pool.release(buffer);
        }
    }

    /// Suspend the device stream.
    pub fn pause(&mut self) -> Result<()> {
        self.output.pause()?;
        Ok(())
    }

    /// Continue a paused device stream.
    pub fn resume(&mut self) -> Result<()> {
        self.output.resume()?;
        Ok(())
    }

    /// Halt decoding and the device. Idempotent.
    pub fn stop(&mut self) {
        {
            let mut core = self.core.lock();
            core.decoder.stop();
            core.running = false;
            core.finishing = false;
        }
        self.halt_output();
    }

    /// Relocate playback to order position `order`.
    ///
    /// The next produced frame carries the new position.
    pub fn set_order_position(&mut self, order: usize) {
        self.core.lock().decoder.set_position(order);
    }

    /// Mute or unmute one channel.
    pub fn mute_channel(&mut self, channel: usize, mute: bool) -> Result<()> {
        let mut core = self.core.lock();
        if !core.valid {
            return Err(EngineError::NotLoaded);
        }
        let count = core.mutes.len();
        let Some(slot) = core.mutes.get_mut(channel) else {
            return Err(EngineError::InvalidChannel { channel, count });
        };
        *slot = mute;
        core.decoder.set_channel_mute(channel, mute);
        Ok(())
    }

    /// The mute flag of every channel.
    pub fn channel_mutes(&self) -> Vec<bool> {
        self.core.lock().mutes.clone()
    }

    /// Push the whole mute bitmap to the decoder again.
    pub fn reapply_mutes(&mut self) {
        let mut core = self.core.lock();
        let core = &mut *core;
        for (channel, &mute) in core.mutes.iter().enumerate() {
            core.decoder.set_channel_mute(channel, mute);
        }
    }

    /// The loaded module's snapshot.
    pub fn module_info(&self) -> Option<Arc<ModuleInfo>> {
        self.core.lock().info.clone()
    }

    /// Current position state.
    pub fn position(&self) -> PositionSnapshot {
        let core = self.core.lock();
        PositionSnapshot {
            order: core.order,
            pattern: core.pattern,
            row: core.row,
            seconds: core.seconds,
            running: core.running,
            valid: core.valid,
        }
    }

    /// Whether the device callback is producing frames.
    pub fn is_running(&self) -> bool {
        self.core.lock().running
    }

    /// Whether a module is loaded.
    pub fn is_loaded(&self) -> bool {
        self.core.lock().valid
    }

    /// Queue an event behind the ones the callback produced.
    pub fn publish(&mut self, event: PlayerEvent) {
        self.core.lock().events.publish(event);
    }

    /// Take the oldest pending event.
    pub fn poll_event(&mut self) -> Option<PlayerEvent> {
        self.events.poll()
    }

    /// Take every pending event.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain()
    }

    /// Events lost to a full queue.
    pub fn dropped_events(&self) -> u64 {
        self.core.lock().events.dropped()
    }

    /// Set the output gain, clamped to 0.0..=1.0.
    pub fn set_volume(&mut self, volume: f32) {
        self.output.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Current output gain.
    pub fn volume(&self) -> f32 {
        self.output.volume()
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The audio output.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Dispose of the device stream, then release the module.
    pub fn close(&mut self) {
        if self.initialized {
            self.output.stop(StopMode::Immediate);
            self.output.close();
            self.initialized = false;
        }
        let mut core = self.core.lock();
        core.running = false;
        core.finishing = false;
        core.unload();
        core.pool = BufferPool::default();
    }
}

impl<D: Decoder + 'static, O: AudioOutput> Drop for PlaybackEngine<D, O> {
    fn drop(&mut self) {
        self.close();
    }
}
