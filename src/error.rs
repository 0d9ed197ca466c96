//! Typed failures surfaced by the rules engine.
//!
//! Every failure is local and recoverable: an operation that returns an error
//! leaves the value it was called on untouched.

use thiserror::Error;

use crate::move_tree::PositionId;
use crate::point::Point;

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMoveReason {
    /// Point is not empty
    Occupied,
    /// Move leaves its own chain without liberties and self-capture is not allowed
    Suicide,
    /// Move retakes a ko (recreates the grid from two plies back)
    Ko,
    /// Move recreates an earlier whole-board position
    Superko,
}

impl std::fmt::Display for IllegalMoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IllegalMoveReason::Occupied => write!(f, "point not empty"),
            IllegalMoveReason::Suicide => write!(f, "suicide"),
            IllegalMoveReason::Ko => write!(f, "retakes ko"),
            IllegalMoveReason::Superko => write!(f, "repeats an earlier position"),
        }
    }
}

/// Malformed position string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("position string has odd length {0}")]
    OddLength(usize),
    #[error("invalid character {character:?} at index {index}")]
    InvalidCharacter { index: usize, character: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("point {point} is outside the {width}x{height} board")]
    OutOfBounds {
        point: Point,
        width: usize,
        height: usize,
    },

    #[error("illegal move: {0}")]
    IllegalMove(IllegalMoveReason),

    #[error("out of sequence: expected move {expected}, found {found}")]
    OutOfSequence { expected: usize, found: usize },

    #[error("cannot decode position string: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported board size {width}x{height}")]
    InvalidBoardSize { width: usize, height: usize },

    #[error("invalid handicap {count} for a {width}x{height} board")]
    InvalidHandicap {
        count: usize,
        width: usize,
        height: usize,
    },

    #[error("position {0:?} is not registered in the move tree")]
    UnknownPosition(PositionId),
}

pub type Result<T> = std::result::Result<T, EngineError>;
