//! MOD file layout and parsing.
//!
//! Layout of a 31-instrument module:
//!
//! | Offset | Size | Content |
//! |---|---|---|
//! | 0 | 20 | song title |
//! | 20 | 31 × 30 | sample headers |
//! | 950 | 1 | song length (order count) |
//! | 951 | 1 | restart position |
//! | 952 | 128 | order list |
//! | 1080 | 4 | format signature |
//! | 1084 | patterns × 64 × channels × 4 | pattern data |
//! | ... | | sample data, 8-bit signed |

use crate::effect::Effect;
use crate::tables::{C1_NOTE, C1_PERIOD};
use modplay_common::{LoadError, ModuleInfo, NO_RESTART, PatternCell, PatternGrid};

/// Rows in every pattern.
pub const ROWS_PER_PATTERN: usize = 64;

/// Sample slots, including the unused slot 0.
pub const SAMPLE_SLOTS: usize = 32;

/// Maximum channel count accepted from `xCHN`/`xxCH` signatures.
pub const MAX_CHANNELS: usize = 32;

const HEADER_LEN: usize = 1084;
const SAMPLE_HEADER_LEN: usize = 30;
const SONG_LENGTH_OFFSET: usize = 950;
const RESTART_OFFSET: usize = 951;
const ORDER_OFFSET: usize = 952;
const ORDER_SLOTS: usize = 128;
const SIGNATURE_OFFSET: usize = 1080;

/// An 8-bit sample with its loop points, all in sample units.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// Sample name (doubles as the song message on most modules).
    pub name: String,
    /// Signed 8-bit PCM.
    pub data: Vec<i8>,
    /// Default volume 0..=64.
    pub volume: u8,
    /// Fine tune index 0..=15, 8 = untuned.
    pub fine_tune: u8,
    /// Loop start.
    pub loop_start: usize,
    /// Loop length; 0 = one-shot.
    pub loop_length: usize,
}

impl Sample {
    /// End of the playable region: loop end for looped samples, data end otherwise.
    pub fn end(&self) -> usize {
        if self.loop_length > 0 {
            self.loop_start + self.loop_length
        } else {
            self.data.len()
        }
    }
}

/// One pattern event as stored in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Note {
    /// Amiga period, 0 = no note.
    pub period: u16,
    /// Sample number, 0 = keep current.
    pub instrument: u8,
    /// Raw effect nibble.
    pub effect: u8,
    /// Raw effect parameter.
    pub param: u8,
}

impl Note {
    fn from_bytes(b: &[u8]) -> Self {
        Note {
            period: (u16::from(b[0] & 0x0f) << 8) | u16::from(b[1]),
            instrument: (b[0] & 0xf0) | (b[2] >> 4),
            effect: b[2] & 0x0f,
            param: b[3],
        }
    }

    /// Decoded effect command.
    pub fn command(&self) -> Effect {
        Effect::decode(self.effect, self.param)
    }

    /// Printable form for the pattern table.
    pub fn cell(&self) -> PatternCell {
        PatternCell {
            note: period_to_note(self.period),
            instrument: self.instrument,
            volume: 0,
            effect: self.effect,
            param: self.param,
        }
    }
}

/// Map an Amiga period to a 1-based note number (C-1 = 37).
pub fn period_to_note(period: u16) -> u8 {
    if period == 0 {
        return 0;
    }
    let semitones = (12.0 * (C1_PERIOD / f64::from(period)).log2()).round() as i32;
    (C1_NOTE + semitones).clamp(1, 128) as u8
}

/// A parsed module. Immutable after loading.
#[derive(Debug, Clone)]
pub struct Module {
    /// Song title.
    pub title: String,
    /// Format signature.
    pub signature: String,
    /// Number of channels.
    pub channels: usize,
    /// Sample slots; slot 0 is always empty.
    pub samples: Vec<Sample>,
    /// Play sequence.
    pub orders: Vec<usize>,
    /// Order position to loop back to, or [`NO_RESTART`].
    pub restart_position: usize,
    /// Number of stored patterns.
    pub pattern_count: usize,
    pattern_data: Vec<u8>,
}

impl Module {
    /// Parse a module image.
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < HEADER_LEN {
            return Err(LoadError::UnrecognizedFormat);
        }
        let signature = &data[SIGNATURE_OFFSET..HEADER_LEN];
        let channels = channel_count(signature).ok_or(LoadError::UnrecognizedFormat)?;

        let song_length = usize::from(data[SONG_LENGTH_OFFSET]);
        if song_length == 0 || song_length > ORDER_SLOTS {
            return Err(LoadError::corrupt(format!("song length {song_length}")));
        }
        let order_table = &data[ORDER_OFFSET..ORDER_OFFSET + ORDER_SLOTS];
        let pattern_count = order_table
            .iter()
            .map(|&p| usize::from(p & 0x7f) + 1)
            .max()
            .unwrap_or(1);
        let orders: Vec<usize> = order_table[..song_length]
            .iter()
            .map(|&p| usize::from(p & 0x7f))
            .collect();

        let restart = usize::from(data[RESTART_OFFSET]);
        let restart_position = if restart < song_length { restart } else { NO_RESTART };

        let pattern_bytes = pattern_count * ROWS_PER_PATTERN * channels * 4;
        let pattern_end = HEADER_LEN + pattern_bytes;
        if data.len() < pattern_end {
            return Err(LoadError::corrupt(format!(
                "pattern data truncated: need {pattern_end} bytes, have {}",
                data.len()
            )));
        }
        let pattern_data = data[HEADER_LEN..pattern_end].to_vec();

        let mut samples = Vec::with_capacity(SAMPLE_SLOTS);
        samples.push(Sample::default());
        let mut offset = pattern_end;
        for slot in 1..SAMPLE_SLOTS {
            let header = &data[20 + (slot - 1) * SAMPLE_HEADER_LEN..][..SAMPLE_HEADER_LEN];
            let (sample, len) = parse_sample(header, &data[offset.min(data.len())..], slot)?;
            offset += len;
            samples.push(sample);
        }

        Ok(Module {
            title: text(&data[..20]),
            signature: String::from_utf8_lossy(signature).into_owned(),
            channels,
            samples,
            orders,
            restart_position,
            pattern_count,
            pattern_data,
        })
    }

    /// Number of entries in the play sequence.
    pub fn song_length(&self) -> usize {
        self.orders.len()
    }

    /// Pattern event at `(pattern, row, channel)`.
    pub fn note(&self, pattern: usize, row: usize, channel: usize) -> Note {
        let offset = ((pattern * ROWS_PER_PATTERN + row) * self.channels + channel) * 4;
        self.pattern_data
            .get(offset..offset + 4)
            .map(Note::from_bytes)
            .unwrap_or_default()
    }

    /// Decoded cell grid of one pattern.
    pub fn pattern_grid(&self, pattern: usize) -> PatternGrid {
        (0..ROWS_PER_PATTERN)
            .map(|row| {
                (0..self.channels)
                    .map(|channel| self.note(pattern, row, channel).cell())
                    .collect()
            })
            .collect()
    }

    /// Module information without timing fields (filled in by the pre-scan).
    pub fn info(&self) -> ModuleInfo {
        let comment = self
            .samples
            .iter()
            .skip(1)
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        ModuleInfo {
            title: self.title.clone(),
            format: self.signature.clone(),
            comment,
            channel_count: self.channels,
            instrument_count: SAMPLE_SLOTS - 1,
            sample_count: self.samples.iter().filter(|s| !s.data.is_empty()).count(),
            pattern_count: self.pattern_count,
            sequence_length: self.song_length(),
            orders: self.orders.clone(),
            restart_position: self.restart_position,
            initial_speed: 6,
            initial_bpm: 125,
            global_volume: 64,
            volume_base: 64,
            sequence_count: 1,
            duration_ms: 0,
            duration_seconds: 0,
            patterns: (0..self.pattern_count)
                .map(|p| self.pattern_grid(p))
                .collect(),
        }
    }
}

fn channel_count(signature: &[u8]) -> Option<usize> {
    let digit = |b: u8| b.is_ascii_digit().then(|| usize::from(b - b'0'));
    let channels = match signature {
        b"M.K." | b"M!K!" | b"FLT4" => 4,
        [n, b'C', b'H', b'N'] => digit(*n)?,
        [a, b, b'C', b'H'] => digit(*a)? * 10 + digit(*b)?,
        _ => return None,
    };
    (1..=MAX_CHANNELS).contains(&channels).then_some(channels)
}

fn parse_sample(header: &[u8], body: &[u8], slot: usize) -> Result<(Sample, usize), LoadError> {
    let word = |at: usize| usize::from(u16::from_be_bytes([header[at], header[at + 1]])) * 2;
    let length = word(22);
    if body.len() < length {
        return Err(LoadError::corrupt(format!(
            "sample {slot} truncated: need {length} bytes, have {}",
            body.len()
        )));
    }

    let tune = header[24] & 0x0f;
    let fine_tune = ((tune & 0x07) as i8 - (tune & 0x08) as i8 + 8) as u8;
    let volume = (header[25] & 0x7f).min(64);

    let mut loop_start = word(26);
    let mut loop_length = word(28);
    if loop_start + loop_length > length {
        // some trackers store the loop start in words
        if loop_start / 2 + loop_length <= length {
            loop_start /= 2;
        } else {
            loop_length = length.saturating_sub(loop_start);
        }
    }
    if loop_length < 4 {
        loop_start = length;
        loop_length = 0;
    }

    let sample = Sample {
        name: text(&header[..22]),
        data: body[..length].iter().map(|&b| b as i8).collect(),
        volume,
        fine_tune,
        loop_start,
        loop_length,
    };
    Ok((sample, length))
}

fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
        .trim_end()
        .to_string()
}
