//! [`Decoder`] implementation: one tick of 16-bit stereo per frame.

use crate::format::Module;
use crate::sequencer::{OrderMark, Sequencer, scan};
use modplay_common::{
    BYTES_PER_SAMPLE, DEFAULT_SAMPLE_RATE, Decoder, Frame, FrameError, FrameInfo, LoadError,
    ModuleInfo, ModuleSource, OUTPUT_CHANNELS,
};
use tracing::{debug, info};

/// Slowest tempo a module can select.
const MIN_TEMPO: usize = 32;

struct LoadedSong {
    module: Module,
    info: ModuleInfo,
    marks: Vec<Option<OrderMark>>,
}

/// ProTracker MOD decoder.
///
/// Renders one sequencer tick per [`Decoder::produce_frame`] call. At 125 BPM
/// and 44.1 kHz a frame is 882 stereo samples (3528 bytes).
pub struct ProTrackerDecoder {
    song: Option<LoadedSong>,
    sequencer: Option<Sequencer>,
    mutes: Vec<bool>,
    stopped: bool,
    mix: Vec<i32>,
    pcm: Vec<u8>,
}

impl Default for ProTrackerDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProTrackerDecoder {
    /// Create a decoder with no module loaded.
    pub fn new() -> Self {
        ProTrackerDecoder {
            song: None,
            sequencer: None,
            mutes: Vec::new(),
            stopped: false,
            mix: Vec::new(),
            pcm: Vec::new(),
        }
    }

    /// Largest frame in bytes at `sample_rate`.
    pub fn max_frame_bytes(sample_rate: u32) -> usize {
        let rate = sample_rate as usize;
        (rate * 2 + rate / 2) / MIN_TEMPO * usize::from(OUTPUT_CHANNELS) * BYTES_PER_SAMPLE
    }

    fn prepare(&mut self, sample_rate: u32) {
        let Some(song) = &self.song else {
            return;
        };
        let mut sequencer = Sequencer::new(&song.module, sample_rate);
        for (channel, &muted) in sequencer.channels.iter_mut().zip(&self.mutes) {
            channel.muted = muted;
        }
        let max_bytes = Self::max_frame_bytes(sample_rate);
        let max_samples = max_bytes / BYTES_PER_SAMPLE;
        self.mix.clear();
        self.mix.reserve(max_samples);
        self.pcm.clear();
        self.pcm.reserve(max_bytes);
        self.sequencer = Some(sequencer);
        self.stopped = false;
    }
}

impl Decoder for ProTrackerDecoder {
    fn load(&mut self, source: ModuleSource<'_>) -> Result<(), LoadError> {
        self.release();
        let module = match source {
            ModuleSource::Path(path) => Module::parse(&std::fs::read(path)?)?,
            ModuleSource::Bytes(bytes) => Module::parse(bytes)?,
        };

        let result = scan(&module, DEFAULT_SAMPLE_RATE);
        let mut info = module.info();
        info.duration_ms = result.duration_ms;
        info.duration_seconds = result.duration_ms / 1000;
        info.initial_speed = result.initial_speed;
        info.initial_bpm = result.initial_tempo;
        info!(
            title = %info.title,
            format = %info.format,
            channels = info.channel_count,
            patterns = info.pattern_count,
            duration_ms = info.duration_ms,
            "module loaded"
        );

        self.mutes = vec![false; module.channels];
        self.song = Some(LoadedSong {
            module,
            info,
            marks: result.marks,
        });
        self.prepare(DEFAULT_SAMPLE_RATE);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.song.is_some()
    }

    fn module_info(&self) -> Option<ModuleInfo> {
        self.song.as_ref().map(|song| song.info.clone())
    }

    fn restart(&mut self, sample_rate: u32) -> Result<(), FrameError> {
        if self.song.is_none() {
            return Err(FrameError::NotLoaded);
        }
        debug!(sample_rate, "decoder restart");
        self.prepare(sample_rate);
        Ok(())
    }

    fn produce_frame(&mut self) -> Result<Frame<'_>, FrameError> {
        let (Some(song), Some(sequencer)) = (&self.song, &mut self.sequencer) else {
            return Err(FrameError::NotLoaded);
        };
        if self.stopped {
            return Err(FrameError::Stopped);
        }

        sequencer.tick(&song.module);
        let info = FrameInfo {
            order: sequencer.order,
            pattern: song.module.orders[sequencer.order],
            row: sequencer.row,
            elapsed_ms: sequencer.elapsed_ms(),
            loop_count: sequencer.loop_count,
        };

        let samples = sequencer.tick_len * usize::from(OUTPUT_CHANNELS);
        self.mix.clear();
        self.mix.resize(samples, 0);
        for channel in &mut sequencer.channels {
            channel.resample(&song.module.samples, &mut self.mix);
        }
        sequencer.elapsed_samples += sequencer.tick_len as u64;

        self.pcm.clear();
        for &sample in &self.mix {
            let clamped = sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            self.pcm.extend_from_slice(&clamped.to_ne_bytes());
        }
        Ok(Frame {
            pcm: &self.pcm,
            info,
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }

    fn set_position(&mut self, order: usize) {
        let (Some(song), Some(sequencer)) = (&self.song, &mut self.sequencer) else {
            return;
        };
        let order = if order < song.module.song_length() { order } else { 0 };
        let mark = song.marks.get(order).copied().flatten();
        debug!(order, "decoder set position");
        sequencer.jump_to(order, mark, &song.module);
    }

    fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if let Some(slot) = self.mutes.get_mut(channel) {
            *slot = mute;
        }
        if let Some(voice) = self
            .sequencer
            .as_mut()
            .and_then(|s| s.channels.get_mut(channel))
        {
            voice.muted = mute;
        }
    }

    fn release(&mut self) {
        if self.song.take().is_some() {
            debug!("module released");
        }
        self.sequencer = None;
        self.mutes.clear();
        self.stopped = false;
    }
}
