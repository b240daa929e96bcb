//! Interactive playback: key handling and the status line.

use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    style::Print,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use modplay_common::{Decoder, ModuleInfo, PlayerState};
use modplay_engine::{AudioOutput, PlayerController, PlayerEvent};
use std::io::{self, Write};
use std::time::Duration;
use tracing::warn;

/// How often events are drained and the status line redrawn.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const VOLUME_STEP: f32 = 0.05;

/// Playback position as last reported by events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub state: PlayerState,
    pub position: usize,
    pub pattern: usize,
    pub row: usize,
    pub seconds: u64,
    pub last_position: usize,
    pub duration_seconds: u64,
}

impl Status {
    pub fn new(info: &ModuleInfo) -> Self {
        Status {
            pattern: info.pattern_in_order(0).unwrap_or(0),
            last_position: info.last_order_index(),
            duration_seconds: info.duration_seconds,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::PatternChanged { pattern, position } => {
                self.pattern = pattern;
                self.position = position;
            }
            PlayerEvent::RowChanged { row } => self.row = row,
            PlayerEvent::TimeChanged { seconds } => self.seconds = seconds,
            PlayerEvent::StateChanged(state) => self.state = state,
            PlayerEvent::PlaybackFinished => {}
        }
    }

    /// One-line rendering; muted channels show as `.`.
    pub fn line(&self, volume: f32, mutes: &[bool]) -> String {
        let channels: String = mutes
            .iter()
            .enumerate()
            .map(|(i, &muted)| {
                if muted {
                    '.'
                } else {
                    char::from_digit(((i + 1) % 10) as u32, 10).unwrap_or('?')
                }
            })
            .collect();
        format!(
            "[{:<8}] pos {:03}/{:03} pat {:02} row {:02}  {}/{}  vol {:3.0}%  ch {}",
            self.state.as_str(),
            self.position,
            self.last_position,
            self.pattern,
            self.row,
            clock(self.seconds),
            clock(self.duration_seconds),
            volume * 100.0,
            channels
        )
    }
}

fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Restore terminal to normal state.
fn restore_terminal() {
    let _ = disable_raw_mode();
}

/// Run the key loop until the user quits or the song finishes.
pub fn run<D, O>(player: &mut PlayerController<D, O>, info: &ModuleInfo) -> anyhow::Result<()>
where
    D: Decoder + 'static,
    O: AudioOutput,
{
    enable_raw_mode()?;
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    let result = event_loop(player, info);
    restore_terminal();
    println!();
    result
}

fn event_loop<D, O>(player: &mut PlayerController<D, O>, info: &ModuleInfo) -> anyhow::Result<()>
where
    D: Decoder + 'static,
    O: AudioOutput,
{
    let mut status = Status::new(info);
    status.state = player.state();
    let mut stdout = io::stdout();

    loop {
        let mut finished = false;
        for event in player.poll_events() {
            finished |= event == PlayerEvent::PlaybackFinished;
            status.apply(event);
        }
        let line = status.line(player.volume(), &player.track_mutes());
        execute!(stdout, MoveToColumn(0), Clear(ClearType::UntilNewLine), Print(line))?;
        stdout.flush()?;
        if finished && player.state() == PlayerState::Stopped {
            return Ok(());
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char(' ') => {
                if let Err(err) = player.pause() {
                    warn!(%err, "pause failed");
                }
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                if let Err(err) = player.play() {
                    warn!(%err, "play failed");
                }
            }
            KeyCode::Char('s') | KeyCode::Char('S') => player.stop(),
            KeyCode::Char('n') | KeyCode::Right => player.next_position(),
            KeyCode::Char('b') | KeyCode::Left => player.previous_position(),
            KeyCode::Char(c @ '0'..='9') => {
                let channel = match c {
                    '0' => 9,
                    c => c as usize - '1' as usize,
                };
                toggle_mute(player, channel);
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                player.set_volume(player.volume() + VOLUME_STEP);
            }
            KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Down => {
                player.set_volume(player.volume() - VOLUME_STEP);
            }
            _ => {}
        }
    }
}

fn toggle_mute<D, O>(player: &mut PlayerController<D, O>, channel: usize)
where
    D: Decoder + 'static,
    O: AudioOutput,
{
    let Some(muted) = player.track_mutes().get(channel).copied() else {
        return;
    };
    if let Err(err) = player.mute_track(channel, !muted) {
        warn!(%err, channel, "mute failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ModuleInfo {
        ModuleInfo {
            orders: vec![4, 2, 7],
            sequence_length: 3,
            duration_seconds: 95,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_follows_events() {
        let mut status = Status::new(&info());
        assert_eq!(status.pattern, 4);
        assert_eq!(status.last_position, 2);

        status.apply(PlayerEvent::StateChanged(PlayerState::Playing));
        status.apply(PlayerEvent::PatternChanged {
            pattern: 7,
            position: 2,
        });
        status.apply(PlayerEvent::RowChanged { row: 17 });
        status.apply(PlayerEvent::TimeChanged { seconds: 61 });
        status.apply(PlayerEvent::PlaybackFinished);

        assert_eq!(status.state, PlayerState::Playing);
        assert_eq!((status.position, status.pattern, status.row), (2, 7, 17));
        assert_eq!(status.seconds, 61);
    }

    #[test]
    fn test_status_line() {
        let mut status = Status::new(&info());
        status.state = PlayerState::Paused;
        status.row = 9;
        status.seconds = 61;
        let line = status.line(0.5, &[false, true, false, false]);
        assert_eq!(
            line,
            "[Paused  ] pos 000/002 pat 04 row 09  01:01/01:35  vol  50%  ch 1.34"
        );
    }
}
