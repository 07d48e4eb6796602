use thiserror::Error;

/// Hard failures surfaced to the MCP caller as tool errors.
///
/// Expected non-error conditions (engine not yet initialized, nothing
/// playing, already paused) are *not* represented here; transport
/// operations return those as statuses instead.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("audio file not found: {0}")]
    NotFound(String),

    /// The resolved path lies outside the music directory. Always fatal
    /// to the call; guards against `..` and absolute-path injection.
    #[error("path escapes the music directory: {0}")]
    PathEscape(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine still reported non-playing after the grace period.
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    #[error("no audio files available")]
    EmptyLibrary,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Failures originating in the playback engine backend.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open audio output: {0}")]
    Output(String),

    #[error("failed to load media: {0}")]
    Load(String),

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("engine thread stopped")]
    Disconnected,
}
