//! Test doubles for the decoder and the audio device.

#![allow(dead_code)]

use modplay_common::{Decoder, Frame, FrameError, FrameInfo, LoadError, ModuleInfo, ModuleSource};
use modplay_engine::{
    AudioFormat, AudioOutput, BufferDoneHandler, DeviceError, EngineConfig, PcmBuffer,
    PlaybackEngine, Refill, StopMode,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub type Step = Result<FrameInfo, FrameError>;

/// Module snapshot with the given play sequence.
pub fn module(channels: usize, orders: Vec<usize>, restart: usize) -> ModuleInfo {
    ModuleInfo {
        title: "mock".to_string(),
        format: "MOCK".to_string(),
        channel_count: channels,
        pattern_count: orders.iter().max().map_or(0, |max| max + 1),
        sequence_length: orders.len(),
        orders,
        restart_position: restart,
        initial_speed: 6,
        initial_bpm: 125,
        ..Default::default()
    }
}

pub fn at(order: usize, pattern: usize, row: usize, elapsed_ms: u64) -> Step {
    Ok(FrameInfo {
        order,
        pattern,
        row,
        elapsed_ms,
        loop_count: 0,
    })
}

/// One frame per row of order 0, 20 ms apart.
pub fn rows(count: usize) -> Vec<Step> {
    (0..count).map(|row| at(0, 0, row, row as u64 * 20)).collect()
}

#[derive(Debug, Default)]
pub struct DecoderLog {
    pub loads: usize,
    pub restarts: usize,
    pub stops: usize,
    pub releases: usize,
    pub produced: usize,
    pub positions: Vec<usize>,
    pub mutes: Vec<(usize, bool)>,
}

/// Plays a fixed script of frames, then reports end of stream.
pub struct MockDecoder {
    pub log: Arc<Mutex<DecoderLog>>,
    modules: VecDeque<ModuleInfo>,
    current: Option<ModuleInfo>,
    script: Vec<Step>,
    fail_load: Option<i32>,
    stopped: bool,
    cursor: usize,
    pcm: Vec<u8>,
}

impl MockDecoder {
    pub fn new(info: ModuleInfo, script: Vec<Step>) -> Self {
        MockDecoder {
            log: Arc::default(),
            modules: VecDeque::from([info]),
            current: None,
            script,
            fail_load: None,
            stopped: false,
            cursor: 0,
            pcm: vec![0u8; 64],
        }
    }

    /// Module reported by the load after the first one.
    pub fn then_load(mut self, info: ModuleInfo) -> Self {
        self.modules.push_back(info);
        self
    }

    /// Make every load fail with a decoder status code.
    pub fn failing_load(mut self, code: i32) -> Self {
        self.fail_load = Some(code);
        self
    }
}

impl Decoder for MockDecoder {
    fn load(&mut self, _source: ModuleSource<'_>) -> Result<(), LoadError> {
        self.log.lock().loads += 1;
        if let Some(err) = self.fail_load.and_then(LoadError::from_status) {
            return Err(err);
        }
        let next = if self.modules.len() > 1 {
            self.modules.pop_front()
        } else {
            self.modules.front().cloned()
        };
        self.current = next;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn module_info(&self) -> Option<ModuleInfo> {
        self.current.clone()
    }

    fn restart(&mut self, _sample_rate: u32) -> Result<(), FrameError> {
        if self.current.is_none() {
            return Err(FrameError::NotLoaded);
        }
        self.log.lock().restarts += 1;
        self.cursor = 0;
        self.stopped = false;
        Ok(())
    }

    fn produce_frame(&mut self) -> Result<Frame<'_>, FrameError> {
        if self.current.is_none() {
            return Err(FrameError::NotLoaded);
        }
        if self.stopped {
            return Err(FrameError::Stopped);
        }
        let step = self
            .script
            .get(self.cursor)
            .copied()
            .unwrap_or(Err(FrameError::EndOfStream));
        self.cursor += 1;
        let info = step?;
        self.log.lock().produced += 1;
        Ok(Frame {
            pcm: &self.pcm,
            info,
        })
    }

    fn stop(&mut self) {
        self.log.lock().stops += 1;
        self.stopped = true;
    }

    fn set_position(&mut self, order: usize) {
        self.log.lock().positions.push(order);
    }

    fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        self.log.lock().mutes.push((channel, mute));
    }

    fn release(&mut self) {
        self.log.lock().releases += 1;
        self.current = None;
    }
}

#[derive(Default)]
pub struct OutputLog {
    pub handler: Option<BufferDoneHandler>,
    pub queued: VecDeque<PcmBuffer>,
    pub enqueued: usize,
    pub opens: usize,
    pub starts: usize,
    pub stops: Vec<StopMode>,
    pub end_of_stream: usize,
    pub playing: bool,
    pub paused: bool,
    pub closed: bool,
    pub fail_open: bool,
    pub fail_start: bool,
    pub volume: f32,
}

/// Records every call; [`MockOutput::complete`] plays out one buffer.
#[derive(Clone, Default)]
pub struct MockOutput {
    pub log: Arc<Mutex<OutputLog>>,
}

impl MockOutput {
    /// Finish the oldest queued buffer and hand it to the engine.
    ///
    /// Returns whether the engine queued a refill.
    pub fn complete(&self) -> bool {
        let (buffer, mut handler) = {
            let mut log = self.log.lock();
            if !log.playing {
                return false;
            }
            let Some(buffer) = log.queued.pop_front() else {
                return false;
            };
            let Some(handler) = log.handler.take() else {
                log.queued.push_front(buffer);
                return false;
            };
            (buffer, handler)
        };
        let refill = handler(buffer);
        let mut log = self.log.lock();
        log.handler = Some(handler);
        match refill {
            Refill::Queue(buffer) => {
                log.queued.push_back(buffer);
                true
            }
            Refill::EndOfStream => {
                log.end_of_stream += 1;
                false
            }
        }
    }

    pub fn queued(&self) -> usize {
        self.log.lock().queued.len()
    }
}

impl AudioOutput for MockOutput {
    fn open(&mut self, _format: AudioFormat, handler: BufferDoneHandler) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        if log.fail_open {
            return Err(DeviceError::Stream("no device".to_string()));
        }
        log.opens += 1;
        log.handler = Some(handler);
        Ok(())
    }

    fn enqueue(&mut self, buffer: PcmBuffer) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        log.enqueued += 1;
        log.queued.push_back(buffer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        if log.fail_start {
            return Err(DeviceError::Sink("refused".to_string()));
        }
        log.starts += 1;
        log.playing = true;
        log.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        log.paused = true;
        log.playing = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        log.paused = false;
        log.playing = true;
        Ok(())
    }

    fn stop(&mut self, mode: StopMode) {
        let mut log = self.log.lock();
        log.stops.push(mode);
        if mode == StopMode::Immediate {
            log.playing = false;
        }
    }

    fn reclaim(&mut self) -> Vec<PcmBuffer> {
        self.log.lock().queued.drain(..).collect()
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.log.lock().volume
    }

    fn close(&mut self) {
        let mut log = self.log.lock();
        log.closed = true;
        log.handler = None;
    }
}

/// Engine over the mocks with `buffers` buffers of 4 KiB.
pub fn engine<D: Decoder + 'static>(
    decoder: D,
    output: MockOutput,
    buffers: usize,
) -> PlaybackEngine<D, MockOutput> {
    let config = EngineConfig {
        buffer_count: buffers,
        buffer_bytes: 4096,
        ..EngineConfig::default()
    };
    PlaybackEngine::new(decoder, output, config).expect("engine")
}

/// Minimal 31-instrument module: `patterns` empty patterns played in order.
pub fn mod_image(channels: usize, patterns: usize) -> Vec<u8> {
    let mut data = vec![0u8; 1084];
    data[..9].copy_from_slice(b"mock song");
    data[950] = patterns as u8;
    data[951] = 127;
    for order in 0..patterns {
        data[952 + order] = order as u8;
    }
    let signature = if channels == 4 {
        "M.K.".to_string()
    } else {
        format!("{channels}CHN")
    };
    data[1080..1084].copy_from_slice(signature.as_bytes());
    data.resize(1084 + patterns * 64 * channels * 4, 0);
    data
}
