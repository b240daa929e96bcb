mod common;

use approx::assert_relative_eq;
use common::{MockDecoder, MockOutput, at, engine, mod_image, module, rows};
use modplay_common::{FrameError, FrameInfo, LoadError};
use modplay_engine::{EngineError, PlayerEvent, StartError, StopMode};
use modplay_protracker::ProTrackerDecoder;
use std::path::Path;

fn count_finished(events: &[PlayerEvent]) -> usize {
    events
        .iter()
        .filter(|e| **e == PlayerEvent::PlaybackFinished)
        .count()
}

#[test]
fn test_start_prefills_every_buffer() {
    let output = MockOutput::default();
    let mut engine = engine(ProTrackerDecoder::new(), output.clone(), 3);

    let info = engine.load_bytes(&mod_image(4, 2)).expect("load");
    assert_eq!(info.channel_count, 4);
    assert_eq!(info.pattern_count, 2);
    assert_eq!(engine.module_info().expect("info").channel_count, 4);

    engine.start().expect("start");
    assert!(engine.is_running());
    {
        let log = output.log.lock();
        assert_eq!(log.enqueued, 3);
        assert_eq!(log.queued.len(), 3);
        assert_eq!(log.starts, 1);
        // one tick at 125 BPM: 882 stereo frames
        assert!(log.queued.iter().all(|b| b.len() == 882 * 4));
    }
    // pre-fill happens before the running flag is set
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_playback_streams_protracker_rows() {
    let output = MockOutput::default();
    let mut engine = engine(ProTrackerDecoder::new(), output.clone(), 3);
    engine.load_bytes(&mod_image(4, 2)).expect("load");
    engine.start().expect("start");

    // six ticks per row; ticks 0..=2 were pre-filled
    for _ in 0..10 {
        assert!(output.complete());
    }
    let events = engine.drain_events();
    assert_eq!(
        events,
        vec![
            PlayerEvent::RowChanged { row: 1 },
            PlayerEvent::RowChanged { row: 2 }
        ]
    );
    let position = engine.position();
    assert_eq!(position.row, 2);
    assert_eq!(position.order, 0);
    assert!(position.running);
}

#[test]
fn test_restart_reclaims_buffers() {
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(32)), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");
    output.complete();
    engine.start().expect("restart");

    let log = output.log.lock();
    assert_eq!(log.queued.len(), 3);
    assert_eq!(log.enqueued, 6);
    assert_eq!(log.opens, 1);
    assert!(log.stops.contains(&StopMode::Immediate));
}

#[test]
fn test_end_of_stream_finishes_once() {
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(5)), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(output.complete());
    assert!(output.complete());
    assert!(!output.complete());
    assert!(!engine.is_running());
    assert_eq!(output.log.lock().end_of_stream, 1);

    // the two buffers still queued keep playing
    assert_eq!(output.queued(), 2);
    assert_eq!(
        engine.drain_events(),
        vec![
            PlayerEvent::RowChanged { row: 3 },
            PlayerEvent::RowChanged { row: 4 }
        ]
    );

    assert!(!output.complete());
    assert!(engine.drain_events().is_empty());
    assert!(!output.complete());
    assert_eq!(output.log.lock().end_of_stream, 3);
    assert_eq!(engine.drain_events(), vec![PlayerEvent::PlaybackFinished]);

    // nothing left to announce
    assert!(!output.complete());
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_stop_while_draining_does_not_finish() {
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(3)), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(!output.complete());
    engine.stop();
    assert_eq!(output.queued(), 0);
    assert!(engine.drain_events().is_empty());

    // a fresh start drains and finishes normally
    engine.start().expect("restart");
    assert_eq!(output.queued(), 3);
    for _ in 0..3 {
        assert!(!output.complete());
    }
    assert_eq!(count_finished(&engine.drain_events()), 1);
}

#[test]
fn test_wrap_without_restart_ends_song() {
    let mut script = rows(4);
    script.push(Ok(FrameInfo {
        order: 0,
        pattern: 0,
        row: 0,
        elapsed_ms: 80,
        loop_count: 1,
    }));
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), script), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(output.complete());
    assert!(!output.complete());
    assert!(!engine.is_running());
    assert_eq!(output.log.lock().end_of_stream, 1);
    assert_eq!(count_finished(&engine.drain_events()), 0);

    assert!(!output.complete());
    assert!(!output.complete());
    assert_eq!(count_finished(&engine.drain_events()), 1);
}

#[test]
fn test_wrap_with_restart_keeps_playing() {
    let mut script = rows(4);
    script.push(Ok(FrameInfo {
        order: 0,
        pattern: 0,
        row: 0,
        elapsed_ms: 80,
        loop_count: 1,
    }));
    script.push(at(0, 0, 1, 100));
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 0), script), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(output.complete());
    assert!(output.complete());
    assert!(output.complete());
    assert!(engine.is_running());
    assert_eq!(
        engine.drain_events(),
        vec![
            PlayerEvent::RowChanged { row: 3 },
            PlayerEvent::RowChanged { row: 0 },
            PlayerEvent::RowChanged { row: 1 }
        ]
    );
}

#[test]
fn test_events_in_row_pattern_time_order() {
    let script = vec![at(0, 2, 0, 0), at(1, 5, 1, 1_000)];
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![2, 5], 127), script), output.clone(), 1);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(output.complete());
    assert_eq!(
        engine.drain_events(),
        vec![
            PlayerEvent::RowChanged { row: 1 },
            PlayerEvent::PatternChanged {
                pattern: 5,
                position: 1
            },
            PlayerEvent::TimeChanged { seconds: 1 }
        ]
    );
    let position = engine.position();
    assert_eq!((position.order, position.pattern, position.seconds), (1, 5, 1));
}

#[test]
fn test_decoder_fault_ends_playback() {
    let mut script = rows(2);
    script.push(Err(FrameError::Fault(-7)));
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 0), script), output.clone(), 2);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");

    assert!(!output.complete());
    assert!(!engine.is_running());
    assert!(engine.drain_events().is_empty());
    assert!(!output.complete());
    assert_eq!(engine.drain_events(), vec![PlayerEvent::PlaybackFinished]);
}

#[test]
fn test_load_failure_leaves_nothing_loaded() {
    let output = MockOutput::default();
    let decoder = MockDecoder::new(module(4, vec![0], 127), rows(4)).failing_load(-3);
    let mut engine = engine(decoder, output, 3);

    let err = engine.load(Path::new("bad.xm")).unwrap_err();
    assert!(matches!(err, EngineError::Load(LoadError::UnrecognizedFormat)));
    assert!(!engine.is_loaded());
    assert!(engine.module_info().is_none());
    assert!(matches!(engine.start(), Err(EngineError::NotLoaded)));
}

#[test]
fn test_reload_replaces_mute_bitmap() {
    let decoder = MockDecoder::new(module(4, vec![0], 127), rows(4))
        .then_load(module(8, vec![0, 1], 127));
    let mut engine = engine(decoder, MockOutput::default(), 3);

    engine.load(Path::new("a.mod")).expect("first");
    engine.mute_channel(2, true).expect("mute");
    assert_eq!(engine.channel_mutes(), vec![false, false, true, false]);

    let info = engine.load(Path::new("b.mod")).expect("second");
    assert_eq!(info.channel_count, 8);
    assert_eq!(engine.channel_mutes(), vec![false; 8]);
}

#[test]
fn test_mute_channel_checks_range() {
    let mut engine = engine(
        MockDecoder::new(module(4, vec![0], 127), rows(4)),
        MockOutput::default(),
        3,
    );
    assert!(matches!(engine.mute_channel(0, true), Err(EngineError::NotLoaded)));

    engine.load(Path::new("a.mod")).expect("load");
    let err = engine.mute_channel(9, true).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidChannel {
            channel: 9,
            count: 4
        }
    ));
}

#[test]
fn test_device_init_failure_allows_retry() {
    let output = MockOutput::default();
    output.log.lock().fail_open = true;
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(8)), output.clone(), 3);
    engine.load(Path::new("a.mod")).expect("load");

    assert!(matches!(engine.start(), Err(EngineError::DeviceInit(_))));
    assert!(!engine.is_running());

    output.log.lock().fail_open = false;
    engine.start().expect("retry");
    assert!(engine.is_running());
    assert_eq!(output.queued(), 3);
}

#[test]
fn test_device_start_failure_leaves_device_stopped() {
    let output = MockOutput::default();
    output.log.lock().fail_start = true;
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(8)), output.clone(), 3);
    engine.load(Path::new("a.mod")).expect("load");

    let err = engine.start().unwrap_err();
    assert!(matches!(err, EngineError::PlaybackStart(StartError::Device(_))));
    assert!(!engine.is_running());
    assert_eq!(output.queued(), 0);

    output.log.lock().fail_start = false;
    engine.start().expect("start");
    assert_eq!(output.queued(), 3);
}

#[test]
fn test_prefill_failure() {
    let mut engine = engine(
        MockDecoder::new(module(4, vec![0], 127), Vec::new()),
        MockOutput::default(),
        3,
    );
    engine.load(Path::new("a.mod")).expect("load");
    let err = engine.start().unwrap_err();
    assert!(matches!(
        err,
        EngineError::PlaybackStart(StartError::Prefill(FrameError::EndOfStream))
    ));
    assert!(!engine.is_running());
}

#[test]
fn test_short_song_partially_prefills() {
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0], 127), rows(2)), output.clone(), 3);
    engine.load(Path::new("a.mod")).expect("load");
    engine.start().expect("start");
    assert_eq!(output.queued(), 2);

    assert!(!output.complete());
    assert!(!output.complete());
    assert_eq!(engine.drain_events(), vec![PlayerEvent::PlaybackFinished]);
}

#[test]
fn test_prefill_leaves_position_to_played_frames() {
    let mut script: Vec<_> = (0..6).map(|row| at(0, 0, row, row as u64 * 20)).collect();
    script.push(at(1, 1, 0, 1_000));
    script.push(at(2, 2, 0, 2_000));
    let output = MockOutput::default();
    let mut engine = engine(MockDecoder::new(module(4, vec![0, 1, 2], 127), script), output.clone(), 3);
    engine.load(Path::new("song.mod")).expect("load");
    engine.start().expect("start");
    for _ in 0..5 {
        assert!(output.complete());
    }
    assert_eq!(engine.position().order, 2);
    engine.stop();
    engine.drain_events();

    // pre-filled frames at order 0 do not touch the position
    engine.start().expect("restart");
    assert_eq!(engine.position().order, 2);
    assert!(engine.drain_events().is_empty());

    assert!(output.complete());
    assert_eq!(
        engine.drain_events(),
        vec![
            PlayerEvent::RowChanged { row: 3 },
            PlayerEvent::PatternChanged {
                pattern: 0,
                position: 0
            },
            PlayerEvent::TimeChanged { seconds: 0 }
        ]
    );
}

#[test]
fn test_stop_is_idempotent() {
    let output = MockOutput::default();
    let decoder = MockDecoder::new(module(4, vec![0], 127), rows(8));
    let log = decoder.log.clone();
    let mut engine = engine(decoder, output.clone(), 3);
    engine.load(Path::new("a.mod")).expect("load");
    engine.start().expect("start");

    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
    assert_eq!(output.queued(), 0);
    assert!(log.lock().stops >= 2);
    // a stray callback after stop produces nothing
    assert!(!output.complete());
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_set_order_position_defers_to_next_frame() {
    let decoder = MockDecoder::new(module(4, vec![0, 1, 2], 127), rows(8));
    let log = decoder.log.clone();
    let mut engine = engine(decoder, MockOutput::default(), 3);
    engine.load(Path::new("a.mod")).expect("load");

    engine.set_order_position(2);
    assert_eq!(log.lock().positions, vec![2]);
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.position().order, 0);
}

#[test]
fn test_volume_is_clamped() {
    let output = MockOutput::default();
    let mut engine = engine(
        MockDecoder::new(module(4, vec![0], 127), rows(1)),
        output.clone(),
        3,
    );
    assert_relative_eq!(engine.volume(), 1.0);
    engine.set_volume(1.8);
    assert_relative_eq!(engine.volume(), 1.0);
    engine.set_volume(-0.5);
    assert_relative_eq!(engine.volume(), 0.0);
    engine.set_volume(0.25);
    assert_relative_eq!(output.log.lock().volume, 0.25);
}

#[test]
fn test_close_releases_decoder_after_output() {
    let output = MockOutput::default();
    let decoder = MockDecoder::new(module(4, vec![0], 127), rows(8));
    let log = decoder.log.clone();
    let mut engine = engine(decoder, output.clone(), 3);
    engine.load(Path::new("a.mod")).expect("load");
    engine.start().expect("start");

    engine.close();
    assert!(output.log.lock().closed);
    assert!(output.log.lock().handler.is_none());
    assert!(!engine.is_loaded());
    assert!(log.lock().releases >= 1);
}

#[test]
fn test_full_event_queue_counts_drops() {
    let output = MockOutput::default();
    let decoder = MockDecoder::new(module(4, vec![0], 127), rows(16));
    let config = modplay_engine::EngineConfig {
        buffer_count: 1,
        buffer_bytes: 4096,
        event_capacity: 2,
        ..Default::default()
    };
    let mut engine = modplay_engine::PlaybackEngine::new(decoder, output.clone(), config).expect("engine");
    engine.load(Path::new("a.mod")).expect("load");
    engine.start().expect("start");
    for _ in 0..5 {
        output.complete();
    }
    assert_eq!(engine.drain_events().len(), 2);
    assert_eq!(engine.dropped_events(), 3);
}
