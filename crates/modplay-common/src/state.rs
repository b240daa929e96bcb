//! Player state machine states.

use std::fmt;

/// State of the user-facing player.
///
/// Transitions are enforced by the player controller; see its transition
/// table for the legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerState {
    /// No module has been loaded yet.
    #[default]
    Unloaded,
    /// A module is loaded and ready to play.
    Loaded,
    /// The last load attempt failed.
    FailedLoad,
    /// Playback could not be started.
    Error,
    /// Audio is streaming.
    Playing,
    /// Streaming is suspended and can be resumed.
    Paused,
    /// Playback was stopped or the song finished.
    Stopped,
}

impl PlayerState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Unloaded => "Unloaded",
            PlayerState::Loaded => "Loaded",
            PlayerState::FailedLoad => "FailedLoad",
            PlayerState::Error => "Error",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Stopped => "Stopped",
        }
    }

    /// Whether a module is loaded and usable in this state.
    pub fn has_module(&self) -> bool {
        matches!(
            self,
            PlayerState::Loaded | PlayerState::Playing | PlayerState::Paused | PlayerState::Stopped
        )
    }

    /// Whether the device stream is live (playing or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
