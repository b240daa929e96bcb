//! Module information snapshot and pattern table formatting.

use crate::NO_RESTART;

/// Pitch class names indexed by `(note - 1) % 12`.
const NOTE_NAMES: [&str; 12] = [
    "C ", "C#", "D ", "D#", "E ", "F ", "F#", "G ", "G#", "A ", "A#", "B ",
];

/// One decoded pattern event. Printable, not replayable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternCell {
    /// 1-based note number; `0` = empty, above 128 = note off.
    pub note: u8,
    /// Instrument number; `0` = none.
    pub instrument: u8,
    /// Volume column; `0` = none.
    pub volume: u8,
    /// Effect type.
    pub effect: u8,
    /// Effect parameter.
    pub param: u8,
}

/// Rows of one pattern, each holding one cell per channel.
pub type PatternGrid = Vec<Vec<PatternCell>>;

/// Immutable snapshot of a loaded module, taken right after load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleInfo {
    /// Song title.
    pub title: String,
    /// Format tag (e.g. "M.K.").
    pub format: String,
    /// Free-form comment (instrument names for formats without a comment block).
    pub comment: String,
    /// Number of channels.
    pub channel_count: usize,
    /// Number of instruments.
    pub instrument_count: usize,
    /// Number of samples.
    pub sample_count: usize,
    /// Number of stored patterns.
    pub pattern_count: usize,
    /// Number of entries in the play sequence.
    pub sequence_length: usize,
    /// The play sequence: pattern index per order position.
    pub orders: Vec<usize>,
    /// Order position to loop back to; `>= 127` means no restart.
    pub restart_position: usize,
    /// Ticks per row at song start.
    pub initial_speed: u32,
    /// Tempo at song start.
    pub initial_bpm: u32,
    /// Global volume at song start.
    pub global_volume: u32,
    /// Full-scale value of `global_volume`.
    pub volume_base: u32,
    /// Number of sub-songs.
    pub sequence_count: usize,
    /// Song length in milliseconds.
    pub duration_ms: u64,
    /// Song length in whole seconds.
    pub duration_seconds: u64,
    /// Decoded pattern grids, indexed by pattern number.
    pub patterns: Vec<PatternGrid>,
}

impl ModuleInfo {
    /// Pattern index played at order `position`.
    pub fn pattern_in_order(&self, position: usize) -> Option<usize> {
        self.orders.get(position).copied()
    }

    /// Highest valid order position.
    pub fn last_order_index(&self) -> usize {
        self.sequence_length.saturating_sub(1)
    }

    /// Whether the module loops back to its restart position at the end.
    pub fn loops(&self) -> bool {
        self.restart_position < NO_RESTART
    }

    /// Formatted rows of pattern `index`, or `None` if it does not exist.
    pub fn pattern_rows(&self, index: usize) -> Option<Vec<String>> {
        self.patterns.get(index).map(|grid| {
            grid.iter()
                .enumerate()
                .map(|(row, cells)| format_row(row, cells))
                .collect()
        })
    }
}

/// Render a note number as pitch class and octave.
fn note_name(note: u8) -> String {
    match note {
        0 => "---".to_string(),
        n if n > 128 => "===".to_string(),
        n => {
            let n = usize::from(n - 1);
            format!("{}{}", NOTE_NAMES[n % 12], n / 12)
        }
    }
}

fn hex_or_dashes(value: u8) -> String {
    if value == 0 {
        "--".to_string()
    } else {
        format!("{value:02x}")
    }
}

fn effect_field(effect: u8, param: u8) -> String {
    if effect == 0 && param == 0 {
        " ---".to_string()
    } else if effect > 0x0f {
        format!("{effect:02x}{param:02x}")
    } else {
        format!(" {effect:x}{param:02x}")
    }
}

/// Format one cell as `"{note} {instrument} {volume}{effect}"`.
pub fn format_cell(cell: &PatternCell) -> String {
    format!(
        "{} {} {}{}",
        note_name(cell.note),
        hex_or_dashes(cell.instrument),
        hex_or_dashes(cell.volume),
        effect_field(cell.effect, cell.param)
    )
}

/// Format one pattern row as `"{row:02x}|"` followed by `"{cell}|"` per channel.
pub fn format_row(row: usize, cells: &[PatternCell]) -> String {
    let mut line = format!("{row:02x}|");
    for cell in cells {
        line.push_str(&format_cell(cell));
        line.push('|');
    }
    line
}
