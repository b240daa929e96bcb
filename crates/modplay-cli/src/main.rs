//! ProTracker module player
//!
//! Command-line player featuring:
//! - Real-time audio streaming through the playback engine
//! - Live order/pattern/row/time display
//! - Interactive playback control and channel muting
//! - Module information and pattern table dumps

mod args;
mod ui;

use anyhow::Context;
use clap::Parser;
use modplay_common::{Decoder, ModuleInfo, ModuleSource};
use modplay_engine::{PlaybackEngine, PlayerController, RodioOutput};
use modplay_protracker::ProTrackerDecoder;
use tracing_subscriber::EnvFilter;

use args::CliArgs;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_info(info: &ModuleInfo) {
    println!("File Information:");
    println!("  Title:        {}", info.title);
    println!("  Format:       {}", info.format);
    println!("  Channels:     {}", info.channel_count);
    println!(
        "  Instruments:  {} ({} samples)",
        info.instrument_count, info.sample_count
    );
    println!("  Patterns:     {}", info.pattern_count);
    println!("  Positions:    {}", info.sequence_length);
    if info.loops() {
        println!("  Restart:      {}", info.restart_position);
    } else {
        println!("  Restart:      none");
    }
    println!(
        "  Speed/BPM:    {}/{}",
        info.initial_speed, info.initial_bpm
    );
    println!(
        "  Duration:     {}:{:02} ({} ms)",
        info.duration_seconds / 60,
        info.duration_seconds % 60,
        info.duration_ms
    );
    if !info.comment.is_empty() {
        println!("  Comment:");
        for line in info.comment.lines() {
            println!("    {line}");
        }
    }
    println!();
}

fn print_patterns(info: &ModuleInfo) {
    for index in 0..info.pattern_count {
        let Some(rows) = info.pattern_rows(index) else {
            continue;
        };
        println!("Pattern {index:02}:");
        for row in rows {
            println!("{row}");
        }
        println!();
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = CliArgs::parse();

    if args.info_only() {
        let mut decoder = ProTrackerDecoder::new();
        decoder
            .load(ModuleSource::Path(&args.file))
            .with_context(|| format!("loading {}", args.file.display()))?;
        let info = decoder
            .module_info()
            .context("decoder reported no module")?;
        print_info(&info);
        if args.patterns {
            print_patterns(&info);
        }
        return Ok(());
    }

    let config = args.engine_config();
    let engine = PlaybackEngine::new(ProTrackerDecoder::new(), RodioOutput::new(), config)?;
    let mut player = PlayerController::new(engine);

    let info = player
        .load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;
    print_info(&info);
    println!(
        "Streaming: {} Hz, {} x {} bytes ({:.1} ms latency)\n",
        config.sample_rate,
        config.buffer_count,
        config.buffer_bytes,
        config.latency_ms()
    );

    for &channel in &args.mute {
        let index = channel
            .checked_sub(1)
            .context("channels are numbered from 1")?;
        player.mute_track(index, true)?;
    }

    player.play().context("starting playback")?;
    ui::run(&mut player, &info)?;
    player.stop();

    let dropped = player.engine().dropped_events();
    if dropped > 0 {
        tracing::info!(dropped, "events dropped during playback");
    }
    Ok(())
}
