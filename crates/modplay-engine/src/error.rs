//! Error types for the playback engine.

use modplay_common::{FrameError, LoadError};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Audio device failures.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The output stream could not be created.
    #[error("Failed to create audio stream: {0}")]
    Stream(String),

    /// The playback sink could not be created.
    #[error("Failed to create audio sink: {0}")]
    Sink(String),

    /// The requested stream format is not supported by this output.
    #[error("Unsupported stream format: {0}")]
    Format(String),

    /// An operation needed an open stream.
    #[error("Audio output is not open")]
    NotOpen,

    /// Buffer memory could not be reserved.
    #[error("Buffer allocation failed: {0}")]
    Allocation(String),
}

/// Reasons [`start`](crate::PlaybackEngine::start) could not begin playback.
#[derive(Error, Debug)]
pub enum StartError {
    /// The decoder refused to rewind.
    #[error("decoder restart failed: {0}")]
    Restart(FrameError),

    /// The decoder produced no audio while pre-filling.
    #[error("pre-fill failed: {0}")]
    Prefill(FrameError),

    /// Fewer free buffers than the pool size.
    #[error("buffer pool exhausted")]
    PoolExhausted,

    /// The device refused a buffer or would not start.
    #[error("device start failed: {0}")]
    Device(#[from] DeviceError),
}

/// Errors surfaced by [`PlaybackEngine`](crate::PlaybackEngine) and
/// [`PlayerController`](crate::PlayerController).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Module load failed.
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// Output stream or buffer pool allocation failed; nothing was left allocated.
    #[error("Device initialization failed: {0}")]
    DeviceInit(DeviceError),

    /// Runtime device failure (pause/resume).
    #[error("Audio device error: {0}")]
    Device(#[from] DeviceError),

    /// Playback could not be started; the device is left stopped.
    #[error("Playback start failed: {0}")]
    PlaybackStart(#[from] StartError),

    /// The operation needs a loaded module.
    #[error("No module loaded")]
    NotLoaded,

    /// Channel index out of range.
    #[error("Channel {channel} out of range (0..{count})")]
    InvalidChannel {
        /// Requested channel.
        channel: usize,
        /// Channels in the module.
        count: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for EngineError {
    /// Converts a String into `EngineError::Other`.
    ///
    /// Prefer the specific variants; this exists for ad-hoc messages.
    fn from(msg: String) -> Self {
        EngineError::Other(msg)
    }
}

impl From<&str> for EngineError {
    fn from(msg: &str) -> Self {
        EngineError::Other(msg.to_string())
    }
}
