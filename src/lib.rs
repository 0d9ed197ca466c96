//! goban-rules: a Go rules engine.
//!
//! This crate derives successive board positions from moves, keeps the
//! branching history of a game (one main line plus analysis variations) and
//! scores finished games under the common rulesets, including an automatic
//! dead-stone estimate for the stone-removal phase.
//!
//! ## Modules
//!
//! - [`constants`] - Board limits and estimator parameters
//! - [`point`] - Coordinates, colors, moves and the position-string codec
//! - [`board`] - Fixed-size stone grid with chain and liberty queries
//! - [`rules`] - Ruleset presets, move and scoring switches, fixed handicap
//! - [`position`] - `BoardPosition`: move execution, captures, ko and superko
//! - [`move_tree`] - Arena-backed history tree with stable handles
//! - [`territory`] - Territory region flood fill
//! - [`scoring`] - Score tally per ruleset
//! - [`estimator`] - Ownership and dead-stone estimation
//! - [`estimation`] - Background, cancellable estimation tasks
//! - [`game`] - Phase machine, record loading and stone removal
//! - [`gtp`] - Go Text Protocol referee
//!
//! ## Example
//!
//! ```
//! use goban_rules::point::{Move, Point};
//! use goban_rules::position::BoardPosition;
//! use goban_rules::rules::Ruleset;
//! use goban_rules::scoring::compute_score;
//!
//! let rules = Ruleset::Chinese;
//! let pos = BoardPosition::new(9, 9)
//!     .make_move(Move::Place(Point::new(4, 4)), &rules.move_rules())
//!     .unwrap();
//!
//! let score = compute_score(&pos, &rules.scoring_rules(), rules.default_komi(), 0);
//! assert_eq!(score.result_string(), "B+73.5");
//! ```

pub mod board;
pub mod constants;
pub mod error;
pub mod estimation;
pub mod estimator;
pub mod game;
pub mod gtp;
pub mod move_tree;
pub mod point;
pub mod position;
pub mod rules;
pub mod scoring;
pub mod territory;

pub use error::{EngineError, IllegalMoveReason, Result};
