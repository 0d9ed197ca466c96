//! Go position representation and move execution.
//!
//! This module provides the core game logic for Go, including:
//! - `BoardPosition`, an immutable-per-move snapshot of the board
//! - Stone placement, capture resolution and self-capture handling
//! - Ko and positional superko enforcement
//! - Handicap placement and initial-position setup
//!
//! A position never mutates its grid after construction. Successors are new
//! values that share the ancestor grids through a reference-counted lineage,
//! which is what the ko and superko checks walk. Only the annotation fields
//! (removed stones, scores, estimates) change in place.

use std::collections::BTreeSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;

use crate::board::Board;
use crate::error::{EngineError, IllegalMoveReason, Result};
use crate::estimator::{self, EstimatorConfig};
use crate::move_tree::PositionId;
use crate::point::{Color, Move, Point, Stone};
use crate::rules::MoveRules;
use crate::scoring::GameScores;
use crate::territory::{TerritoryGroup, construct_territory_groups};

/// Color that places handicap stones.
pub const HANDICAP_COLOR: Color = Color::Black;

/// A grid together with the grids of every ancestor.
#[derive(Clone, Debug)]
struct Snapshot {
    board: Board,
    hash: u64,
    previous: Option<Arc<Snapshot>>,
}

impl Snapshot {
    fn new(board: Board, previous: Option<Arc<Snapshot>>) -> Self {
        let hash = board_hash(&board);
        Self {
            board,
            hash,
            previous,
        }
    }

    /// This grid followed by every ancestor grid, newest first.
    fn lineage(&self) -> impl Iterator<Item = &Snapshot> {
        std::iter::successors(Some(self), |s| s.previous.as_deref())
    }

    fn matches(&self, board: &Board, hash: u64) -> bool {
        self.hash == hash && self.board == *board
    }
}

fn board_hash(board: &Board) -> u64 {
    let mut hasher = DefaultHasher::new();
    board.hash(&mut hasher);
    hasher.finish()
}

/// A Go position (board state plus the move that led to it).
#[derive(Clone, Debug)]
pub struct BoardPosition {
    snapshot: Arc<Snapshot>,
    /// Move number (0 = initial position)
    last_move_number: usize,
    /// Move that produced this position; `None` for the initial position
    last_move: Option<Move>,
    next_to_move: Color,
    /// Cumulative prisoners taken by each color (black first)
    captures: [usize; 2],
    /// Parent handle, set when the position is registered in a `MoveTree`
    previous: Option<PositionId>,
    /// Dead stones (and marked dame points) agreed or estimated during scoring
    pub removed_stones: Option<BTreeSet<Point>>,
    pub game_scores: Option<GameScores>,
    /// Ownership projection from the estimator
    pub estimated_scores: Option<Board>,
    /// Bumped whenever the annotations are invalidated; stamps estimation tasks
    generation: u64,
}

impl BoardPosition {
    /// Empty initial position with Black to move.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            snapshot: Arc::new(Snapshot::new(Board::new(width, height), None)),
            last_move_number: 0,
            last_move: None,
            next_to_move: Color::Black,
            captures: [0; 2],
            previous: None,
            removed_stones: None,
            game_scores: None,
            estimated_scores: None,
            generation: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.snapshot.board
    }

    pub fn width(&self) -> usize {
        self.snapshot.board.width()
    }

    pub fn height(&self) -> usize {
        self.snapshot.board.height()
    }

    pub fn last_move_number(&self) -> usize {
        self.last_move_number
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn next_to_move(&self) -> Color {
        self.next_to_move
    }

    /// Override the side to move of an initial position.
    pub fn set_next_to_move(&mut self, color: Color) {
        self.next_to_move = color;
    }

    /// Prisoners taken so far by `color`.
    pub fn captures(&self, color: Color) -> usize {
        self.captures[color.index()]
    }

    pub fn previous(&self) -> Option<PositionId> {
        self.previous
    }

    pub(crate) fn set_previous(&mut self, previous: Option<PositionId>) {
        self.previous = previous;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate anything computed from the current annotations.
    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    pub fn is_removed(&self, point: Point) -> bool {
        self.removed_stones
            .as_ref()
            .is_some_and(|removed| removed.contains(&point))
    }

    fn check_bounds(&self, point: Point) -> Result<()> {
        if self.board().contains(point) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds {
                point,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Place a stone directly, without any legality check but bounds.
    ///
    /// Only meant for building initial (pre-placed or fixed handicap) positions.
    pub fn put_stone(&mut self, point: Point, color: Color) -> Result<()> {
        self.check_bounds(point)?;
        let snapshot = Arc::make_mut(&mut self.snapshot);
        snapshot.board.set(point, Some(color));
        snapshot.hash = board_hash(&snapshot.board);
        Ok(())
    }

    fn successor(&self, board: Board, last_move: Move, next_to_move: Color, captures: [usize; 2]) -> Self {
        Self {
            snapshot: Arc::new(Snapshot::new(board, Some(Arc::clone(&self.snapshot)))),
            last_move_number: self.last_move_number + 1,
            last_move: Some(last_move),
            next_to_move,
            captures,
            previous: None,
            removed_stones: None,
            game_scores: None,
            estimated_scores: None,
            generation: 0,
        }
    }

    /// Play a move for the side to move and return the resulting position.
    ///
    /// Opposing chains left without liberties are removed first; only then is
    /// the placed chain checked for self-capture.
    ///
    /// # Errors
    /// - `OutOfBounds` if the point is off the board
    /// - `IllegalMove(Occupied)` if the point holds a stone
    /// - `IllegalMove(Suicide)` if the placed chain has no liberties and self-capture is off
    /// - `IllegalMove(Ko)` / `IllegalMove(Superko)` if the resulting grid repeats
    pub fn make_move(&self, mv: Move, rules: &MoveRules) -> Result<BoardPosition> {
        let point = match mv {
            Move::Pass => {
                return Ok(self.successor(
                    self.board().clone(),
                    Move::Pass,
                    self.next_to_move.opposite(),
                    self.captures,
                ));
            }
            Move::Place(point) => point,
        };
        self.check_bounds(point)?;
        if self.board().get(point).is_some() {
            return Err(EngineError::IllegalMove(IllegalMoveReason::Occupied));
        }

        let color = self.next_to_move;
        let opponent = color.opposite();
        let mut board = self.board().clone();
        let mut captures = self.captures;
        board.set(point, Some(color));

        let neighbors: Vec<Point> = board.neighbors(point).collect();
        for n in neighbors {
            if board.get(n) == Some(opponent) && board.liberties(n) == 0 {
                for stone in board.chain(n) {
                    board.set(stone, None);
                    captures[color.index()] += 1;
                }
            }
        }

        if board.liberties(point) == 0 {
            if !rules.allow_self_capture {
                return Err(EngineError::IllegalMove(IllegalMoveReason::Suicide));
            }
            for stone in board.chain(point) {
                board.set(stone, None);
                captures[opponent.index()] += 1;
            }
        }

        let hash = board_hash(&board);
        if !rules.allow_superko {
            if self.snapshot.lineage().any(|s| s.matches(&board, hash)) {
                return Err(EngineError::IllegalMove(IllegalMoveReason::Superko));
            }
        } else if !rules.allow_ko
            && self
                .snapshot
                .previous
                .as_deref()
                .is_some_and(|s| s.matches(&board, hash))
        {
            return Err(EngineError::IllegalMove(IllegalMoveReason::Ko));
        }

        Ok(self.successor(board, mv, opponent, captures))
    }

    /// Place a free handicap stone.
    ///
    /// Consumes a move number but does not pass the turn: Black keeps the move.
    pub fn make_handicap_placement(&self, point: Point) -> Result<BoardPosition> {
        self.check_bounds(point)?;
        if self.board().get(point).is_some() {
            return Err(EngineError::IllegalMove(IllegalMoveReason::Occupied));
        }
        let mut board = self.board().clone();
        board.set(point, Some(HANDICAP_COLOR));
        Ok(self.successor(board, Move::Place(point), HANDICAP_COLOR, self.captures))
    }

    /// Structural equality of the grids, ignoring lineage and annotations.
    pub fn has_the_same_position(&self, other: &BoardPosition) -> bool {
        self.snapshot.hash == other.snapshot.hash && self.snapshot.board == other.snapshot.board
    }

    /// Partition the empty and removed points into territory regions.
    pub fn construct_territory_groups(&self) -> Vec<TerritoryGroup> {
        let empty = BTreeSet::new();
        construct_territory_groups(self.board(), self.removed_stones.as_ref().unwrap_or(&empty))
    }

    /// Best-guess final owner of every point (empty when neutral).
    pub fn estimate_territory(&self) -> Board {
        estimator::estimate_territory(self.board(), &EstimatorConfig::default())
    }
}

impl Index<Point> for BoardPosition {
    type Output = Stone;

    fn index(&self, point: Point) -> &Stone {
        static EMPTY: Stone = None;
        if self.board().contains(point) {
            &self.snapshot.board[point]
        } else {
            &EMPTY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAPANESE: MoveRules = MoveRules {
        allow_self_capture: false,
        allow_ko: false,
        allow_superko: true,
    };

    const CHINESE: MoveRules = MoveRules {
        allow_self_capture: false,
        allow_ko: false,
        allow_superko: false,
    };

    fn place(row: usize, column: usize) -> Move {
        Move::Place(Point::new(row, column))
    }

    /// Classic ko shape; Black to move can capture at (1, 2).
    fn ko_position() -> BoardPosition {
        let mut pos = BoardPosition::new(9, 9);
        for (r, c) in [(0, 1), (1, 0), (2, 1)] {
            pos.put_stone(Point::new(r, c), Color::Black).unwrap();
        }
        for (r, c) in [(0, 2), (1, 1), (2, 2), (1, 3)] {
            pos.put_stone(Point::new(r, c), Color::White).unwrap();
        }
        pos
    }

    #[test]
    fn test_empty_position() {
        let pos = BoardPosition::new(9, 9);
        assert_eq!(pos[Point::new(4, 4)], None);
        assert_eq!(pos.last_move_number(), 0);
        assert_eq!(pos.last_move(), None);
        assert_eq!(pos.next_to_move(), Color::Black);
    }

    #[test]
    fn test_play_move_basic() {
        let pos = BoardPosition::new(9, 9);
        let next = pos.make_move(place(3, 3), &CHINESE).unwrap();
        assert_eq!(next.last_move_number(), 1);
        assert_eq!(next.last_move(), Some(place(3, 3)));
        assert_eq!(next.next_to_move(), Color::White);
        assert_eq!(next[Point::new(3, 3)], Some(Color::Black));
        // The parent is untouched
        assert_eq!(pos[Point::new(3, 3)], None);
    }

    #[test]
    fn test_occupied_and_out_of_bounds() {
        let pos = BoardPosition::new(9, 9).make_move(place(3, 3), &CHINESE).unwrap();
        assert_eq!(
            pos.make_move(place(3, 3), &CHINESE).unwrap_err(),
            EngineError::IllegalMove(IllegalMoveReason::Occupied)
        );
        assert!(matches!(
            pos.make_move(place(9, 0), &CHINESE),
            Err(EngineError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_pass_keeps_stones() {
        let pos = BoardPosition::new(9, 9).make_move(place(3, 3), &CHINESE).unwrap();
        let passed = pos.make_move(Move::Pass, &CHINESE).unwrap();
        assert!(passed.has_the_same_position(&pos));
        assert_eq!(passed.next_to_move(), Color::Black);
        assert_eq!(passed.last_move(), Some(Move::Pass));
        assert_eq!(passed.last_move_number(), 2);
    }

    #[test]
    fn test_capture_counts_prisoners() {
        let pos = ko_position();
        let next = pos.make_move(place(1, 2), &JAPANESE).unwrap();
        assert_eq!(next[Point::new(1, 1)], None);
        assert_eq!(next.captures(Color::Black), 1);
        assert_eq!(next.captures(Color::White), 0);
    }

    #[test]
    fn test_ko_recapture_rejected() {
        let pos = ko_position().make_move(place(1, 2), &JAPANESE).unwrap();
        assert_eq!(
            pos.make_move(place(1, 1), &JAPANESE).unwrap_err(),
            EngineError::IllegalMove(IllegalMoveReason::Ko)
        );

        let pos = ko_position().make_move(place(1, 2), &CHINESE).unwrap();
        assert_eq!(
            pos.make_move(place(1, 1), &CHINESE).unwrap_err(),
            EngineError::IllegalMove(IllegalMoveReason::Superko)
        );

        let anything_goes = MoveRules {
            allow_self_capture: false,
            allow_ko: true,
            allow_superko: true,
        };
        let pos = ko_position().make_move(place(1, 2), &anything_goes).unwrap();
        assert!(pos.make_move(place(1, 1), &anything_goes).is_ok());
    }

    #[test]
    fn test_suicide() {
        let mut pos = BoardPosition::new(9, 9);
        pos.put_stone(Point::new(0, 1), Color::Black).unwrap();
        pos.put_stone(Point::new(1, 0), Color::Black).unwrap();
        pos.set_next_to_move(Color::White);

        assert_eq!(
            pos.make_move(place(0, 0), &CHINESE).unwrap_err(),
            EngineError::IllegalMove(IllegalMoveReason::Suicide)
        );

        let self_capture = MoveRules {
            allow_self_capture: true,
            allow_ko: true,
            allow_superko: true,
        };
        let next = pos.make_move(place(0, 0), &self_capture).unwrap();
        assert_eq!(next[Point::new(0, 0)], None);
        assert_eq!(next.captures(Color::Black), 1);
        assert_eq!(next.next_to_move(), Color::Black);
    }

    #[test]
    fn test_capture_resolved_before_self_capture() {
        // White (0,1) is in atari; Black filling (0,0) has no liberty until it captures.
        let mut pos = BoardPosition::new(9, 9);
        pos.put_stone(Point::new(0, 1), Color::White).unwrap();
        pos.put_stone(Point::new(1, 0), Color::White).unwrap();
        pos.put_stone(Point::new(0, 2), Color::Black).unwrap();
        pos.put_stone(Point::new(1, 1), Color::Black).unwrap();

        let next = pos.make_move(place(0, 0), &CHINESE).unwrap();
        assert_eq!(next[Point::new(0, 1)], None);
        assert_eq!(next[Point::new(0, 0)], Some(Color::Black));
        assert_eq!(next.captures(Color::Black), 1);
    }

    #[test]
    fn test_handicap_placement_keeps_turn() {
        let pos = BoardPosition::new(9, 9);
        let h1 = pos.make_handicap_placement(Point::new(2, 2)).unwrap();
        assert_eq!(h1.next_to_move(), Color::Black);
        assert_eq!(h1.last_move_number(), 1);
        assert_eq!(h1[Point::new(2, 2)], Some(Color::Black));
        assert!(h1.make_handicap_placement(Point::new(2, 2)).is_err());
    }

    #[test]
    fn test_same_position_ignores_lineage() {
        let a = BoardPosition::new(9, 9)
            .make_move(place(2, 2), &CHINESE)
            .unwrap()
            .make_move(Move::Pass, &CHINESE)
            .unwrap();
        let mut b = BoardPosition::new(9, 9);
        b.put_stone(Point::new(2, 2), Color::Black).unwrap();
        assert!(a.has_the_same_position(&b));
        assert!(!a.has_the_same_position(&BoardPosition::new(9, 9)));
        assert!(!BoardPosition::new(9, 9).has_the_same_position(&BoardPosition::new(9, 13)));
    }

    #[test]
    fn test_put_stone_out_of_bounds() {
        let mut pos = BoardPosition::new(9, 9);
        assert!(matches!(
            pos.put_stone(Point::new(0, 9), Color::White),
            Err(EngineError::OutOfBounds { width: 9, height: 9, .. })
        ));
    }
}
