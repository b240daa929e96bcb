//! Per-channel voice state, effect processing and resampling.
//!
//! Sample positions and steps are 18.14 fixed point.

use crate::effect::Effect;
use crate::format::{Note, Sample};
use crate::tables::{ARP_TUNING, FINE_TUNING, SINE_TABLE};

pub(crate) const FP_SHIFT: u32 = 14;

/// Values shared by all channels while processing a row or tick.
pub(crate) struct MixParams {
    pub sample_rate: u32,
    pub c2_rate: i32,
    pub gain: i32,
    /// `8xx` is honoured only when the module is not a plain 4-channel one.
    pub panning_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Channel {
    pub id: usize,
    pub note: Note,
    pub effect: Effect,
    period: i32,
    porta_period: i32,
    sample_offset: usize,
    position: usize,
    step: usize,
    volume: i32,
    panning: i32,
    fine_tune: u8,
    amplitude: i32,
    pub muted: bool,
    sample: usize,
    assigned: usize,
    porta_speed: i32,
    pub loop_row: usize,
    fx_count: u8,
    vibrato_type: u8,
    vibrato_phase: u8,
    vibrato_speed: u8,
    vibrato_depth: u8,
    tremolo_type: u8,
    tremolo_phase: u8,
    tremolo_speed: u8,
    tremolo_depth: u8,
    tremolo_add: i32,
    vibrato_add: i32,
    arpeggio_add: usize,
}

impl Channel {
    /// A silent channel with Amiga LRRL panning.
    pub fn new(id: usize) -> Self {
        Channel {
            id,
            panning: match id & 3 {
                0 | 3 => 0,
                _ => 127,
            },
            ..Default::default()
        }
    }

    /// Apply a new row event. Sequencing effects are left to the caller.
    pub fn start_row(&mut self, note: Note, samples: &[Sample], params: &MixParams, random: &mut u32) {
        self.note = note;
        self.effect = note.command();
        self.fx_count = 0;
        self.arpeggio_add = 0;
        self.tremolo_add = 0;
        self.vibrato_add = 0;
        if !self.effect.delays_trigger() {
            self.trigger(samples);
        }
        match self.effect {
            Effect::TonePorta(speed) if speed > 0 => self.porta_speed = i32::from(speed),
            Effect::Vibrato(param) => {
                if param & 0xf0 > 0 {
                    self.vibrato_speed = param >> 4;
                }
                if param & 0x0f > 0 {
                    self.vibrato_depth = param & 0x0f;
                }
                self.vibrato(random);
            }
            Effect::VibratoVolumeSlide(_) => self.vibrato(random),
            Effect::Tremolo(param) => {
                if param & 0xf0 > 0 {
                    self.tremolo_speed = param >> 4;
                }
                if param & 0x0f > 0 {
                    self.tremolo_depth = param & 0x0f;
                }
                self.tremolo(random);
            }
            Effect::SetPanning(pan) if params.panning_enabled => {
                self.panning = i32::from(pan.min(127))
            }
            Effect::SetVolume(volume) => self.volume = i32::from(volume.min(64)),
            Effect::FinePortaUp(delta) => self.period = (self.period - i32::from(delta)).max(0),
            Effect::FinePortaDown(delta) => {
                self.period = (self.period + i32::from(delta)).min(0xffff)
            }
            Effect::VibratoWaveform(kind) if kind < 8 => self.vibrato_type = kind,
            Effect::TremoloWaveform(kind) if kind < 8 => self.tremolo_type = kind,
            Effect::FineVolumeUp(delta) => self.volume = (self.volume + i32::from(delta)).min(64),
            Effect::FineVolumeDown(delta) => self.volume = (self.volume - i32::from(delta)).max(0),
            Effect::NoteCut(0) => self.volume = 0,
            _ => {}
        }
        self.update_frequency(params);
    }

    /// Advance per-tick effects.
    pub fn tick(&mut self, samples: &[Sample], params: &MixParams, random: &mut u32) {
        self.fx_count = self.fx_count.wrapping_add(1);
        match self.effect {
            Effect::None => return,
            Effect::PortaUp(delta) => self.period = (self.period - i32::from(delta)).max(0),
            Effect::PortaDown(delta) => self.period = (self.period + i32::from(delta)).min(0xffff),
            Effect::TonePorta(_) => self.tone_portamento(),
            Effect::Vibrato(_) => {
                self.vibrato_phase = self.vibrato_phase.wrapping_add(self.vibrato_speed);
                self.vibrato(random);
            }
            Effect::TonePortaVolumeSlide(param) => {
                self.tone_portamento();
                self.volume_slide(param);
            }
            Effect::VibratoVolumeSlide(param) => {
                self.vibrato_phase = self.vibrato_phase.wrapping_add(self.vibrato_speed);
                self.vibrato(random);
                self.volume_slide(param);
            }
            Effect::Tremolo(_) => {
                self.tremolo_phase = self.tremolo_phase.wrapping_add(self.tremolo_speed);
                self.tremolo(random);
            }
            Effect::VolumeSlide(param) => self.volume_slide(param),
            Effect::Arpeggio(param) => {
                if self.fx_count > 2 {
                    self.fx_count = 0;
                }
                self.arpeggio_add = usize::from(match self.fx_count {
                    1 => param >> 4,
                    2 => param & 0x0f,
                    _ => 0,
                });
            }
            Effect::Retrigger(ticks) if ticks > 0 && self.fx_count >= ticks => {
                self.fx_count = 0;
                self.position = 0;
            }
            Effect::NoteCut(ticks) if ticks == self.fx_count => self.volume = 0,
            Effect::NoteDelay(ticks) if ticks == self.fx_count => self.trigger(samples),
            _ => {}
        }
        self.update_frequency(params);
    }

    fn trigger(&mut self, samples: &[Sample]) {
        let instrument = usize::from(self.note.instrument);
        if let Some(sample) = samples.get(instrument).filter(|_| instrument > 0) {
            self.assigned = instrument;
            self.sample_offset = 0;
            self.fine_tune = sample.fine_tune;
            self.volume = i32::from(sample.volume);
            if sample.loop_length > 0 && self.sample > 0 {
                self.sample = instrument;
            }
        }
        match self.effect {
            Effect::SampleOffset(offset) => self.sample_offset = usize::from(offset) << 8,
            Effect::SetFineTune(tune) => {
                self.fine_tune = ((tune & 0x07) as i8 - (tune & 0x08) as i8 + 8) as u8;
            }
            _ => {}
        }
        if self.note.period > 0 {
            let period = (i32::from(self.note.period) * FINE_TUNING[usize::from(self.fine_tune & 0x0f)]) >> 11;
            self.porta_period = (period >> 1) + (period & 1);
            if !self.effect.is_tone_porta() {
                self.sample = self.assigned;
                self.period = self.porta_period;
                self.position = self.sample_offset << FP_SHIFT;
                if self.vibrato_type < 4 {
                    self.vibrato_phase = 0;
                }
                if self.tremolo_type < 4 {
                    self.tremolo_phase = 0;
                }
            }
        }
    }

    fn update_frequency(&mut self, params: &MixParams) {
        let mut period = self.period + self.vibrato_add;
        period = (period * ARP_TUNING[self.arpeggio_add & 0x0f]) >> 11;
        period = (period >> 1) + (period & 1);
        if period < 14 {
            period = 6848;
        }
        let freq = (params.c2_rate * 428 / period) as usize;
        self.step = (freq << FP_SHIFT) / params.sample_rate.max(1) as usize;
        let volume = (self.volume + self.tremolo_add).clamp(0, 64);
        self.amplitude = (volume * params.gain) >> 5;
    }

    fn tone_portamento(&mut self) {
        if self.period < self.porta_period {
            self.period = (self.period + self.porta_speed).min(self.porta_period);
        } else if self.period > self.porta_period {
            self.period = (self.period - self.porta_speed).max(self.porta_period);
        }
    }

    fn volume_slide(&mut self, param: u8) {
        let delta = i32::from(param >> 4) - i32::from(param & 0x0f);
        self.volume = (self.volume + delta).clamp(0, 64);
    }

    fn vibrato(&mut self, random: &mut u32) {
        self.vibrato_add =
            (waveform(self.vibrato_phase, self.vibrato_type, random) * i32::from(self.vibrato_depth)) >> 7;
    }

    fn tremolo(&mut self, random: &mut u32) {
        self.tremolo_add =
            (waveform(self.tremolo_phase, self.tremolo_type, random) * i32::from(self.tremolo_depth)) >> 6;
    }

    /// Add `frames` stereo frames of this voice into `out` (interleaved L/R).
    pub fn resample(&mut self, samples: &[Sample], out: &mut [i32]) {
        let Some(sample) = samples.get(self.sample).filter(|_| self.sample > 0) else {
            return;
        };
        let amplitude = if self.muted { 0 } else { self.amplitude };
        let left = (amplitude * (127 - self.panning)) >> 5;
        let right = (amplitude * self.panning) >> 5;
        let end = sample.end() << FP_SHIFT;
        let loop_length = sample.loop_length << FP_SHIFT;

        for frame in out.chunks_exact_mut(2) {
            if self.position >= end {
                if loop_length == 0 {
                    self.position = end;
                    return;
                }
                while self.position >= end {
                    self.position -= loop_length;
                }
            }
            let value = sample
                .data
                .get(self.position >> FP_SHIFT)
                .map_or(0, |&v| i32::from(v));
            frame[0] += (value * left) >> 2;
            frame[1] += (value * right) >> 2;
            self.position += self.step;
        }
    }
}

fn waveform(phase: u8, kind: u8, random: &mut u32) -> i32 {
    let phase = i32::from(phase);
    match kind & 3 {
        0 => {
            let amplitude = SINE_TABLE[(phase & 0x1f) as usize];
            if phase & 0x20 > 0 { -amplitude } else { amplitude }
        }
        1 => 255 - (((phase + 0x20) & 0x3f) << 3),
        2 => 255 - ((phase & 0x20) << 4),
        _ => {
            let amplitude = (*random >> 20) as i32 - 255;
            *random = (random.wrapping_mul(65).wrapping_add(17)) & 0x1fff_ffff;
            amplitude
        }
    }
}
