//! Coordinates, stone colors, moves, and the compact position-string codec.
//!
//! A position string packs a set of points two letters per point, column
//! first, so `"dc"` is row 2, column 3. The empty set is the empty string.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{POSITION_STRING_BASE, POSITION_STRING_RADIX};
use crate::error::{DecodeError, EngineError};

/// A point on the board, 0-indexed from the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Black,
    White,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Index into per-color arrays (black first).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Content of a single cell: empty, black or white.
pub type Stone = Option<Color>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Place(Point),
    Pass,
}

impl Move {
    /// Build a move from a server `[column, row]` pair; negative coordinates mean pass.
    pub fn from_record(column: i32, row: i32) -> Self {
        if column < 0 || row < 0 {
            Move::Pass
        } else {
            Move::Place(Point::new(row as usize, column as usize))
        }
    }

    pub fn point(self) -> Option<Point> {
        match self {
            Move::Place(point) => Some(point),
            Move::Pass => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place(point) => write!(f, "{point}"),
            Move::Pass => write!(f, "pass"),
        }
    }
}

/// Decode a position string into the set of points it lists.
pub fn points_from_position_string(s: &str) -> Result<BTreeSet<Point>, DecodeError> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    if chars.len() % 2 != 0 {
        return Err(DecodeError::OddLength(chars.len()));
    }

    let mut points = BTreeSet::new();
    for pair in chars.chunks_exact(2) {
        let column = decode_letter(pair[0])?;
        let row = decode_letter(pair[1])?;
        points.insert(Point::new(row, column));
    }
    Ok(points)
}

fn decode_letter((index, character): (usize, char)) -> Result<usize, DecodeError> {
    if character.is_ascii_lowercase() {
        Ok((character as u8 - POSITION_STRING_BASE) as usize)
    } else {
        Err(DecodeError::InvalidCharacter { index, character })
    }
}

/// Encode a set of points as a position string, in row-major order.
///
/// Fails with `OutOfBounds` for a row or column past the 26-letter alphabet.
pub fn position_string<'a>(points: impl IntoIterator<Item = &'a Point>) -> Result<String, EngineError> {
    let sorted: BTreeSet<&Point> = points.into_iter().collect();
    let mut s = String::with_capacity(sorted.len() * 2);
    for &point in sorted {
        if point.row >= POSITION_STRING_RADIX || point.column >= POSITION_STRING_RADIX {
            return Err(EngineError::OutOfBounds {
                point,
                width: POSITION_STRING_RADIX,
                height: POSITION_STRING_RADIX,
            });
        }
        s.push((POSITION_STRING_BASE + point.column as u8) as char);
        s.push((POSITION_STRING_BASE + point.row as u8) as char);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_column_first() {
        let points = points_from_position_string("dcaa").unwrap();
        assert_eq!(
            points,
            BTreeSet::from([Point::new(2, 3), Point::new(0, 0)])
        );
    }

    #[test]
    fn test_empty_string_is_empty_set() {
        assert!(points_from_position_string("").unwrap().is_empty());
        assert_eq!(position_string(&BTreeSet::new()).unwrap(), "");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            points_from_position_string("abc"),
            Err(DecodeError::OddLength(3))
        );
        assert_eq!(
            points_from_position_string("aB"),
            Err(DecodeError::InvalidCharacter {
                index: 1,
                character: 'B'
            })
        );
    }

    #[test]
    fn test_encode_is_row_major() {
        let points = [Point::new(1, 0), Point::new(0, 2)];
        assert_eq!(position_string(&points).unwrap(), "caab");
    }

    #[test]
    fn test_encode_rejects_points_past_alphabet() {
        let last = Point::new(25, 25);
        assert_eq!(position_string(&[last]).unwrap(), "zz");
        assert!(matches!(
            position_string(&[Point::new(0, 26)]),
            Err(EngineError::OutOfBounds { width: 26, height: 26, .. })
        ));
        assert!(position_string(&[Point::new(26, 3), Point::new(0, 0)]).is_err());
    }

    #[test]
    fn test_move_from_record() {
        assert_eq!(Move::from_record(-1, -1), Move::Pass);
        assert_eq!(Move::from_record(3, 2), Move::Place(Point::new(2, 3)));
    }
}
