//! Command-line argument parsing for the module player.

use clap::Parser;
use modplay_engine::EngineConfig;
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "modplay",
    version,
    about = "Play ProTracker modules with a live position display",
    after_help = "Keys:\n  space  pause/resume    s  stop    p  play    q  quit\n  n/b    next/previous position\n  1-9,0  toggle channel mute\n  +/-    volume"
)]
pub struct CliArgs {
    /// Module file to play
    pub file: PathBuf,

    /// Print module information and exit
    #[arg(long)]
    pub info: bool,

    /// Print module information and every pattern, then exit
    #[arg(long)]
    pub patterns: bool,

    /// Output volume, 0.0 to 1.0
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Mute a channel before playback (numbered from 1); repeatable
    #[arg(long = "mute", value_name = "CHANNEL")]
    pub mute: Vec<usize>,

    /// Number of output buffers
    #[arg(long, default_value_t = 3)]
    pub buffers: usize,

    /// Capacity of each output buffer in bytes
    #[arg(long, default_value_t = 16_384)]
    pub buffer_bytes: usize,

    /// Events queued before new ones are dropped
    #[arg(long, default_value_t = 256)]
    pub events: usize,
}

impl CliArgs {
    /// Whether to print module information instead of playing.
    pub fn info_only(&self) -> bool {
        self.info || self.patterns
    }

    /// Engine settings from the buffer flags.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            buffer_count: self.buffers,
            buffer_bytes: self.buffer_bytes,
            event_capacity: self.events,
            initial_volume: self.volume.clamp(0.0, 1.0),
            ..EngineConfig::default()
        }
    }
}
