//! User-facing player state machine.
//!
//! [`PlayerController`] sequences load/play/pause/stop on top of a
//! [`PlaybackEngine`]. Which engine action a command triggers is decided by
//! [`transition`] alone; the controller performs the action and announces the
//! state it ends up in.

use crate::engine::{PlaybackEngine, PositionSnapshot};
use crate::error::Result;
use crate::events::PlayerEvent;
use crate::output::AudioOutput;
use modplay_common::{Decoder, ModuleInfo, ModuleSource, PlayerState};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A user command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load a module.
    Load,
    /// Start or resume playback.
    Play,
    /// Toggle pause.
    Pause,
    /// Stop playback.
    Stop,
}

/// Engine action chosen for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Replace the loaded module.
    Load,
    /// Pre-fill and start the device from the top of the song.
    Start,
    /// Suspend the device.
    Pause,
    /// Continue the device.
    Resume,
    /// Stop decoding and the device.
    Halt,
    /// Nothing to do in this state.
    Ignore,
}

/// The transition table.
///
/// | state      | load | play   | pause  | stop |
/// |------------|------|--------|--------|------|
/// | Unloaded   | load | -      | -      | -    |
/// | Loaded     | load | start  | -      | -    |
/// | FailedLoad | load | -      | -      | -    |
/// | Playing    | load | -      | pause  | halt |
/// | Paused     | load | resume | resume | halt |
/// | Stopped    | load | start  | -      | -    |
/// | Error      | load | -      | -      | -    |
pub fn transition(state: PlayerState, command: Command) -> Action {
    use PlayerState::*;
    match (state, command) {
        (_, Command::Load) => Action::Load,
        (Loaded | Stopped, Command::Play) => Action::Start,
        (Paused, Command::Play | Command::Pause) => Action::Resume,
        (Playing, Command::Pause) => Action::Pause,
        (Playing | Paused, Command::Stop) => Action::Halt,
        _ => Action::Ignore,
    }
}

/// Drives a [`PlaybackEngine`] through the player states.
pub struct PlayerController<D: Decoder + 'static, O: AudioOutput> {
    engine: PlaybackEngine<D, O>,
    state: PlayerState,
    requested_position: usize,
    /// Order position last shown to observers while not playing.
    position: usize,
}

impl<D: Decoder + 'static, O: AudioOutput> PlayerController<D, O> {
    /// Wrap an engine; starts out `Unloaded`.
    pub fn new(engine: PlaybackEngine<D, O>) -> Self {
        PlayerController {
            engine,
            state: PlayerState::Unloaded,
            requested_position: 0,
            position: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &PlaybackEngine<D, O> {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut PlaybackEngine<D, O> {
        &mut self.engine
    }

    /// Order position last asked for with next/previous.
    pub fn requested_position(&self) -> usize {
        self.requested_position
    }

    /// The loaded module's snapshot.
    pub fn module_info(&self) -> Option<Arc<ModuleInfo>> {
        self.engine.module_info()
    }

    /// Current engine position.
    pub fn position(&self) -> PositionSnapshot {
        self.engine.position()
    }

    fn enter(&mut self, state: PlayerState) {
        info!("state change {} -> {}", self.state, state);
        self.state = state;
        self.engine.publish(PlayerEvent::StateChanged(state));
    }

    /// Load a module file. Allowed in every state.
    pub fn load(&mut self, path: &Path) -> Result<Arc<ModuleInfo>> {
        self.load_source(ModuleSource::Path(path))
    }

    /// Load a module held in memory.
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<Arc<ModuleInfo>> {
        self.load_source(ModuleSource::Bytes(data))
    }

    fn load_source(&mut self, source: ModuleSource<'_>) -> Result<Arc<ModuleInfo>> {
        debug_assert_eq!(transition(self.state, Command::Load), Action::Load);
        match self.engine.load_source(source) {
            Ok(info) => {
                self.requested_position = 0;
                self.position = 0;
                self.enter(PlayerState::Loaded);
                self.engine.publish(PlayerEvent::PatternChanged {
                    pattern: info.pattern_in_order(0).unwrap_or(0),
                    position: 0,
                });
                Ok(info)
            }
            Err(err) => {
                self.enter(PlayerState::FailedLoad);
                Err(err)
            }
        }
    }

    /// Start playback, or resume it when paused.
    pub fn play(&mut self) -> Result<()> {
        match transition(self.state, Command::Play) {
            Action::Start => {
                if let Err(err) = self.engine.start() {
                    warn!(%err, "playback start failed");
                    self.enter(PlayerState::Error);
                    return Err(err);
                }
                self.engine.reapply_mutes();
                if self.requested_position != 0 {
                    self.engine.set_order_position(self.requested_position);
                }
                self.enter(PlayerState::Playing);
            }
            Action::Resume => {
                self.engine.resume()?;
                self.enter(PlayerState::Playing);
            }
            _ => {}
        }
        Ok(())
    }

    /// Toggle between playing and paused.
    pub fn pause(&mut self) -> Result<()> {
        match transition(self.state, Command::Pause) {
            Action::Pause => {
                self.engine.pause()?;
                self.position = self.engine.position().order;
                self.enter(PlayerState::Paused);
            }
            Action::Resume => {
                self.engine.resume()?;
                self.enter(PlayerState::Playing);
            }
            _ => {}
        }
        Ok(())
    }

    /// Stop playback.
    ///
    /// The time/row reset pair is published on every call, whatever the state.
    pub fn stop(&mut self) {
        if transition(self.state, Command::Stop) == Action::Halt {
            if self.state == PlayerState::Playing {
                self.position = self.engine.position().order;
            }
            self.engine.stop();
            self.enter(PlayerState::Stopped);
        }
        self.engine.publish(PlayerEvent::TimeChanged { seconds: 0 });
        self.engine.publish(PlayerEvent::RowChanged { row: 0 });
    }

    /// Whether seeking is possible; time seeking itself is not supported.
    pub fn seek(&self) -> bool {
        self.state.is_active()
    }

    /// Move to the next order position, clamped to the last one.
    pub fn next_position(&mut self) {
        let current = self.current_order();
        self.relocate(current.saturating_add(1));
    }

    /// Move to the previous order position, clamped to the first one.
    pub fn previous_position(&mut self) {
        let current = self.current_order();
        self.relocate(current.saturating_sub(1));
    }

    /// Where next/previous step from: the live order while playing,
    /// otherwise the position observers were last shown.
    fn current_order(&self) -> usize {
        if self.state == PlayerState::Playing {
            self.engine.position().order
        } else {
            self.position
        }
    }

    fn relocate(&mut self, target: usize) {
        let Some(info) = self.engine.module_info() else {
            return;
        };
        let target = target.min(info.last_order_index());
        self.requested_position = target;
        self.position = target;
        self.engine.set_order_position(target);
        if self.state != PlayerState::Playing {
            self.engine.publish(PlayerEvent::PatternChanged {
                pattern: info.pattern_in_order(target).unwrap_or(0),
                position: target,
            });
        }
    }

    /// Mute or unmute one channel. The flag survives stop and replay.
    pub fn mute_track(&mut self, channel: usize, mute: bool) -> Result<()> {
        self.engine.mute_channel(channel, mute)
    }

    /// Mute flag of every channel.
    pub fn track_mutes(&self) -> Vec<bool> {
        self.engine.channel_mutes()
    }

    /// Set the output volume, clamped to 0.0..=1.0.
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Current output volume.
    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    /// Take every pending event.
    ///
    /// A finished song moves a playing controller to `Stopped`; the events
    /// that causes are included in the returned batch.
    pub fn poll_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = self.engine.drain_events();
        if self.state == PlayerState::Playing && events.contains(&PlayerEvent::PlaybackFinished) {
            self.stop();
            events.extend(self.engine.drain_events());
        }
        events
    }
}
