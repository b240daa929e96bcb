//! Song position tracking: speed, tempo, row advance and order jumps.

use crate::channel::{Channel, MixParams};
use crate::effect::Effect;
use crate::format::{Module, ROWS_PER_PATTERN};

const DEFAULT_SPEED: u32 = 6;
const DEFAULT_TEMPO: u32 = 125;
const RANDOM_SEED: u32 = 0x00ab_cdef;

/// Sequencer state captured when an order position is first entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OrderMark {
    pub elapsed_ms: u64,
    pub speed: u32,
    pub tempo: u32,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TickOutcome {
    /// Playback wrapped to an order it had already played.
    pub looped: bool,
    /// An order position was entered, with the state before its first row.
    pub entered: Option<(usize, OrderMark)>,
}

pub(crate) struct Sequencer {
    pub channels: Vec<Channel>,
    params: MixParams,
    pub order: usize,
    pub row: usize,
    next_row: Option<usize>,
    break_order: Option<usize>,
    /// `(owning channel, loops remaining)` of an active `E6x` loop.
    pattern_loop: Option<(usize, u8)>,
    tick: u32,
    pub speed: u32,
    pub tempo: u32,
    pub tick_len: usize,
    pub elapsed_samples: u64,
    pub loop_count: u32,
    visited: Vec<bool>,
    random: u32,
}

impl Sequencer {
    pub fn new(module: &Module, sample_rate: u32) -> Self {
        let channels = module.channels;
        let mut sequencer = Sequencer {
            channels: (0..channels).map(Channel::new).collect(),
            params: MixParams {
                sample_rate,
                c2_rate: if channels > 4 { 8363 } else { 8287 },
                gain: match channels {
                    0..=4 => 64,
                    5..=8 => 32,
                    _ => 16,
                },
                panning_enabled: channels != 4,
            },
            order: 0,
            row: 0,
            next_row: Some(0),
            break_order: None,
            pattern_loop: None,
            tick: 1,
            speed: DEFAULT_SPEED,
            tempo: DEFAULT_TEMPO,
            tick_len: 0,
            elapsed_samples: 0,
            loop_count: 0,
            visited: vec![false; module.song_length()],
            random: RANDOM_SEED,
        };
        sequencer.jump_to(0, None, module);
        sequencer
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    /// Elapsed song time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_samples * 1000 / u64::from(self.sample_rate().max(1))
    }

    fn set_tempo(&mut self, tempo: u32) {
        self.tempo = tempo;
        let rate = self.params.sample_rate as usize;
        self.tick_len = (rate * 2 + rate / 2) / tempo.max(1) as usize;
    }

    /// Relocate to the first row of `order`, silencing every voice.
    ///
    /// A `mark` restores the speed, tempo and clock that order had in a
    /// straight play-through.
    pub fn jump_to(&mut self, order: usize, mark: Option<OrderMark>, module: &Module) {
        let order = if order < module.song_length() { order } else { 0 };
        let (speed, tempo) = mark.map_or((DEFAULT_SPEED, DEFAULT_TEMPO), |m| (m.speed, m.tempo));
        self.speed = speed;
        self.set_tempo(tempo);
        if let Some(mark) = mark {
            self.elapsed_samples = mark.elapsed_ms * u64::from(self.sample_rate()) / 1000;
        }
        self.order = order;
        self.break_order = Some(order);
        self.next_row = Some(0);
        self.pattern_loop = None;
        self.tick = 1;
        self.random = RANDOM_SEED;
        self.visited.fill(false);
        for (id, channel) in self.channels.iter_mut().enumerate() {
            let muted = channel.muted;
            *channel = Channel::new(id);
            channel.muted = muted;
        }
    }

    /// Advance one tick: a new row every `speed` ticks, effects otherwise.
    pub fn tick(&mut self, module: &Module) -> TickOutcome {
        self.tick = self.tick.saturating_sub(1);
        if self.tick == 0 {
            self.tick = self.speed;
            self.sequence_row(module)
        } else {
            let Sequencer {
                channels,
                params,
                random,
                ..
            } = self;
            for channel in channels.iter_mut() {
                channel.tick(&module.samples, params, random);
            }
            TickOutcome::default()
        }
    }

    fn sequence_row(&mut self, module: &Module) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.next_row.is_none() {
            self.break_order = Some(self.order + 1);
            self.next_row = Some(0);
        }
        if let Some(mut target) = self.break_order.take() {
            if target >= module.song_length() {
                target = if module.restart_position < module.song_length() {
                    module.restart_position
                } else {
                    0
                };
                self.next_row = Some(0);
                outcome.looped = true;
            }
            if self.visited[target] {
                outcome.looped = true;
            }
            if outcome.looped {
                self.loop_count += 1;
                self.visited.fill(false);
            }
            self.visited[target] = true;
            self.order = target;
            for channel in &mut self.channels {
                channel.loop_row = 0;
            }
            outcome.entered = Some((
                target,
                OrderMark {
                    elapsed_ms: self.elapsed_ms(),
                    speed: self.speed,
                    tempo: self.tempo,
                },
            ));
        }

        self.row = self.next_row.unwrap_or(0);
        self.next_row = Some(self.row + 1).filter(|&r| r < ROWS_PER_PATTERN);

        let pattern = module.orders[self.order];
        for index in 0..self.channels.len() {
            let note = module.note(pattern, self.row, index);
            {
                let Sequencer {
                    channels,
                    params,
                    random,
                    ..
                } = self;
                channels[index].start_row(note, &module.samples, params, random);
            }
            self.apply_row_effect(index);
        }
        outcome
    }

    fn apply_row_effect(&mut self, index: usize) {
        match self.channels[index].effect {
            Effect::PositionJump(order) if self.pattern_loop.is_none() => {
                self.break_order = Some(usize::from(order));
                self.next_row = Some(0);
            }
            Effect::PatternBreak(param) if self.pattern_loop.is_none() => {
                if self.break_order.is_none() {
                    self.break_order = Some(self.order + 1);
                }
                let row = usize::from(param >> 4) * 10 + usize::from(param & 0x0f);
                self.next_row = Some(if row < ROWS_PER_PATTERN { row } else { 0 });
            }
            Effect::SetSpeed(value) if value > 0 => {
                if value < 32 {
                    self.speed = u32::from(value);
                    self.tick = self.speed;
                } else {
                    self.set_tempo(u32::from(value));
                }
            }
            Effect::PatternDelay(rows) => {
                self.tick = self.speed + self.speed * u32::from(rows);
            }
            Effect::PatternLoop(count) => self.pattern_loop_row(index, count),
            _ => {}
        }
    }

    fn pattern_loop_row(&mut self, index: usize, count: u8) {
        let row = self.row;
        let channel = &mut self.channels[index];
        if count == 0 {
            channel.loop_row = row;
            return;
        }
        if channel.loop_row >= row || self.break_order.is_some() {
            return;
        }
        let (owner, remaining) = *self.pattern_loop.get_or_insert((channel.id, count));
        if owner != channel.id {
            return;
        }
        if remaining == 0 {
            channel.loop_row = row + 1;
            self.pattern_loop = None;
        } else {
            self.next_row = Some(channel.loop_row);
            self.pattern_loop = Some((owner, remaining - 1));
        }
    }
}

/// Result of a silent play-through from order 0 to the first loop.
#[derive(Debug, Clone)]
pub(crate) struct ScanResult {
    pub duration_ms: u64,
    pub marks: Vec<Option<OrderMark>>,
    pub initial_speed: u32,
    pub initial_tempo: u32,
}

/// Upper bound on scanned song length.
const MAX_SCAN_MS: u64 = 2 * 60 * 60 * 1000;

/// Walk the song without mixing to find its length and order start times.
pub(crate) fn scan(module: &Module, sample_rate: u32) -> ScanResult {
    let mut sequencer = Sequencer::new(module, sample_rate);
    let mut marks = vec![None; module.song_length()];
    let mut initial = None;
    loop {
        let outcome = sequencer.tick(module);
        if outcome.looped || sequencer.elapsed_ms() >= MAX_SCAN_MS {
            break;
        }
        if let Some((order, mark)) = outcome.entered {
            marks[order].get_or_insert(mark);
        }
        initial.get_or_insert((sequencer.speed, sequencer.tempo));
        sequencer.elapsed_samples += sequencer.tick_len as u64;
    }
    let (initial_speed, initial_tempo) = initial.unwrap_or((DEFAULT_SPEED, DEFAULT_TEMPO));
    ScanResult {
        duration_ms: sequencer.elapsed_ms(),
        marks,
        initial_speed,
        initial_tempo,
    }
}
