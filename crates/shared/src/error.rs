use thiserror::Error;

use crate::domain::Score;

/// Rejections raised while constructing entities at the input boundary.
///
/// The state store never sees these: a value that fails validation is never
/// turned into an action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("participant name must not be empty")]
    EmptyName,
    #[error("goal text must not be empty")]
    EmptyGoalText,
    #[error("score {0} is outside {min}..={max}", min = Score::MIN, max = Score::MAX)]
    ScoreOutOfRange(u8),
    #[error("position ({x}, {y}) is outside the board")]
    PositionOutOfRange { x: f64, y: f64 },
    #[error("board size {width}x{height} cannot hold a marker")]
    InvalidBoardSize { width: f64, height: f64 },
}
