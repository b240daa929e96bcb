//! Error types shared by decoders and players.

use thiserror::Error;

/// Failure to load a module.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The data is not a module format the decoder understands.
    #[error("Unrecognized module format")]
    UnrecognizedFormat,

    /// The module header was recognized but the data is truncated or inconsistent.
    #[error("Error loading module (corrupt file?): {0}")]
    CorruptFile(String),

    /// The module file could not be read.
    #[error("Failed to read module: {0}")]
    Io(#[from] std::io::Error),

    /// Any other decoder status code.
    #[error("Decoder error code {0}")]
    Other(i32),
}

impl LoadError {
    /// Status code reported by decoders for unrecognized formats.
    pub const STATUS_FORMAT: i32 = -3;
    /// Status code reported by decoders for corrupt or unreadable data.
    pub const STATUS_LOAD: i32 = -4;

    /// Map a raw decoder status code onto the error taxonomy.
    ///
    /// Returns `None` for `0` (success).
    pub fn from_status(code: i32) -> Option<Self> {
        match code {
            0 => None,
            Self::STATUS_FORMAT => Some(LoadError::UnrecognizedFormat),
            Self::STATUS_LOAD => Some(LoadError::CorruptFile(format!("status {code}"))),
            other => Some(LoadError::Other(other)),
        }
    }

    /// Creates a corrupt file error
    pub fn corrupt(reason: impl Into<String>) -> Self {
        LoadError::CorruptFile(reason.into())
    }
}

/// Reasons a decoder produced no frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The song reached its end.
    #[error("End of module")]
    EndOfStream,

    /// Playback was halted with `stop()`.
    #[error("Playback stopped")]
    Stopped,

    /// No module is loaded.
    #[error("No module loaded")]
    NotLoaded,

    /// Decoder-specific failure.
    #[error("Decoder fault {0}")]
    Fault(i32),
}
