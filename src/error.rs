use thiserror::Error;

/// Errors surfaced by the engine's host-facing capabilities.
///
/// Gameplay itself never fails; these come from storage and audio.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("leaderboard data error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audio unavailable: {0}")]
    Audio(String),

    #[error("WAV export failed: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
