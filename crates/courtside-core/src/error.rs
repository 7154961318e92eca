// Error taxonomy for processing a game-fact change event.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::facts::IngestError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The fact's date is outside every known season.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// The fact was rejected at the ingestion boundary.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("no game fact stored for {player} on {game_date}")]
    UnknownGameFact { player: String, game_date: NaiveDate },

    /// The stored fact's season tag disagrees with the calendar.
    #[error("game fact for {player} on {game_date} is tagged {stored} but the date falls in {resolved}")]
    SeasonMismatch {
        player: String,
        game_date: NaiveDate,
        stored: String,
        resolved: String,
    },

    /// A second recompute for the same player started while one was running.
    /// Never raised when events are routed through the sharded pool.
    #[error("recompute already in progress for {player}")]
    RecomputeConflict { player: String },

    #[error("failed to commit averages after {attempts} attempts: {message}")]
    WriteFailure { attempts: u32, message: String },

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Rejections are data problems; retrying the same event cannot help.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::Calendar(_)
                | EngineError::Ingest(_)
                | EngineError::UnknownGameFact { .. }
                | EngineError::SeasonMismatch { .. }
        )
    }
}
