//! Game orchestration: the current position, the phase machine and the
//! stone-removal workflow built on top of the rules engine.
//!
//! A `Game` owns one `MoveTree` and a handle to the current main-line
//! position. It is the single writer of both; background work (ownership
//! estimation) only ever reads a copy of a board and hands its result back
//! through `poll_estimation` / `wait_estimation`.
//!
//! Phases:
//! - `Play`: moves extend the main line, analysis moves become variations
//! - `StoneRemoval`: dead stones are proposed (estimated) or scored directly
//! - `Finished`: the final score is kept on the current position

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::constants::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::error::{EngineError, IllegalMoveReason, Result};
use crate::estimation::EstimationTask;
use crate::estimator::{EstimatorConfig, removed_from_estimate};
use crate::move_tree::{MoveTree, PositionId};
use crate::point::{Color, Move, Point, points_from_position_string};
use crate::position::{BoardPosition, HANDICAP_COLOR};
use crate::rules::{MoveRules, Ruleset, ScoringRules, fixed_handicap_points};
use crate::scoring::{GameScores, compute_score};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "stone removal")]
    StoneRemoval,
    #[serde(rename = "finished")]
    Finished,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Play => write!(f, "play"),
            GamePhase::StoneRemoval => write!(f, "stone removal"),
            GamePhase::Finished => write!(f, "finished"),
        }
    }
}

/// Black and white point sets, as position strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StonesByColor {
    #[serde(default)]
    pub black: String,
    #[serde(default)]
    pub white: String,
}

/// One entry of a record's move list. Extra fields after the coordinates
/// (timings) are ignored; negative coordinates mean a pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "[i32; 2]")]
pub struct RecordMove {
    pub column: i32,
    pub row: i32,
}

impl From<Vec<f64>> for RecordMove {
    fn from(values: Vec<f64>) -> Self {
        let at = |i: usize| values.get(i).map_or(-1, |&v| v as i32);
        Self {
            column: at(0),
            row: at(1),
        }
    }
}

impl From<RecordMove> for [i32; 2] {
    fn from(mv: RecordMove) -> Self {
        [mv.column, mv.row]
    }
}

impl From<RecordMove> for Move {
    fn from(mv: RecordMove) -> Self {
        Move::from_record(mv.column, mv.row)
    }
}

/// Game record as delivered by a game server.
///
/// Rule flags left out fall back to the preset of `rules`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub rules: Ruleset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub komi: Option<f64>,
    #[serde(default)]
    pub handicap: usize,
    #[serde(default)]
    pub free_handicap_placement: bool,
    #[serde(default)]
    pub initial_player: Color,
    #[serde(default)]
    pub initial_state: StonesByColor,
    #[serde(default)]
    pub moves: Vec<RecordMove>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_stones: Option<StonesByColor>,
    #[serde(default)]
    pub phase: GamePhase,
    #[serde(default)]
    pub auto_scoring_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_requested: Option<usize>,
    /// Final score as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<GameScores>,
    /// How the game ended ("Resignation", "Timeout", or a point margin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_self_capture: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ko: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_superko: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_territory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_stones: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_prisoners: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_handicap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aga_handicap_scoring: Option<bool>,
}

impl GameRecord {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Everything about a game that is fixed before the first move.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSettings {
    pub width: usize,
    pub height: usize,
    pub ruleset: Ruleset,
    pub komi: f64,
    pub handicap: usize,
    pub free_handicap_placement: bool,
    pub move_rules: MoveRules,
    pub scoring_rules: ScoringRules,
}

impl GameSettings {
    pub fn new(width: usize, height: usize, ruleset: Ruleset) -> Result<Self> {
        let size = MIN_BOARD_SIZE..=MAX_BOARD_SIZE;
        if !size.contains(&width) || !size.contains(&height) {
            return Err(EngineError::InvalidBoardSize { width, height });
        }
        Ok(Self {
            width,
            height,
            ruleset,
            komi: ruleset.default_komi(),
            handicap: 0,
            free_handicap_placement: false,
            move_rules: ruleset.move_rules(),
            scoring_rules: ruleset.scoring_rules(),
        })
    }

    pub fn from_record(record: &GameRecord) -> Result<Self> {
        let mut settings = Self::new(record.width, record.height, record.rules)?;
        settings.komi = record.komi.unwrap_or(settings.komi);
        settings.handicap = record.handicap;
        settings.free_handicap_placement = record.free_handicap_placement;

        let moves = &mut settings.move_rules;
        moves.allow_self_capture = record.allow_self_capture.unwrap_or(moves.allow_self_capture);
        moves.allow_ko = record.allow_ko.unwrap_or(moves.allow_ko);
        moves.allow_superko = record.allow_superko.unwrap_or(moves.allow_superko);

        let scoring = &mut settings.scoring_rules;
        scoring.score_territory = record.score_territory.unwrap_or(scoring.score_territory);
        scoring.score_stones = record.score_stones.unwrap_or(scoring.score_stones);
        scoring.score_prisoners = record.score_prisoners.unwrap_or(scoring.score_prisoners);
        scoring.score_handicap = record.score_handicap.unwrap_or(scoring.score_handicap);
        scoring.aga_handicap_scoring = record.aga_handicap_scoring.unwrap_or(scoring.aga_handicap_scoring);
        Ok(settings)
    }

    /// Moves still consumed by free handicap placement.
    fn handicap_moves(&self) -> usize {
        if self.free_handicap_placement {
            self.handicap.saturating_sub(1)
        } else {
            0
        }
    }
}

#[derive(Debug)]
pub struct Game {
    settings: GameSettings,
    move_tree: MoveTree,
    current: PositionId,
    phase: GamePhase,
    auto_scoring_done: bool,
    /// The local viewer is one of the players
    user_playing: bool,
    undo_requested: Option<usize>,
    /// Server-decided result; overrides the local tally when present
    outcome: Option<(Option<Color>, String)>,
    removed_stones_accepted: [Option<BTreeSet<Point>>; 2],
    estimator: EstimatorConfig,
    estimation: Option<EstimationTask>,
}

impl Game {
    pub fn new(settings: GameSettings) -> Self {
        let tree = MoveTree::new(BoardPosition::new(settings.width, settings.height));
        Self {
            settings,
            current: tree.root(),
            move_tree: tree,
            phase: GamePhase::Play,
            auto_scoring_done: false,
            user_playing: true,
            undo_requested: None,
            outcome: None,
            removed_stones_accepted: [None, None],
            estimator: EstimatorConfig::default(),
            estimation: None,
        }
    }

    pub fn from_record(record: &GameRecord) -> Result<Self> {
        let mut game = Self::new(GameSettings::from_record(record)?);
        game.load_record(record)?;
        Ok(game)
    }

    /// Bring the game in line with `record`.
    ///
    /// The existing tree is kept when the record starts from the same initial
    /// position, so analysis variations survive a resync. Moves are replayed
    /// as main-line registrations. On error the game is left untouched.
    pub fn load_record(&mut self, record: &GameRecord) -> Result<()> {
        self.try_load_record(record).inspect_err(|error| {
            warn!(%error, moves = record.moves.len(), "failed to load game record");
        })
    }

    fn try_load_record(&mut self, record: &GameRecord) -> Result<()> {
        let settings = GameSettings::from_record(record)?;

        let mut initial = BoardPosition::new(settings.width, settings.height);
        let black = points_from_position_string(&record.initial_state.black)?;
        let white = points_from_position_string(&record.initial_state.white)?;
        if !black.is_empty() || !white.is_empty() {
            for &point in &black {
                initial.put_stone(point, Color::Black)?;
            }
            for &point in &white {
                initial.put_stone(point, Color::White)?;
            }
            initial.set_next_to_move(record.initial_player);
        }

        let root = self.move_tree.initial_position();
        let mut tree = if root.width() == initial.width()
            && root.height() == initial.height()
            && root.next_to_move() == initial.next_to_move()
            && root.has_the_same_position(&initial)
        {
            self.move_tree.clone()
        } else {
            debug!(
                width = settings.width,
                height = settings.height,
                "initial position changed, rebuilding move tree"
            );
            MoveTree::new(initial)
        };

        let mut current = tree.root();
        for &record_move in &record.moves {
            let next = Self::next_position(&settings, tree.position(current)?, record_move.into())?;
            current = tree.register(next, current, true)?;
        }

        let removed = record.removed.as_deref().map(points_from_position_string).transpose()?;
        let accepted = match &record.accepted_stones {
            Some(accepted) => [
                Some(points_from_position_string(&accepted.black)?),
                Some(points_from_position_string(&accepted.white)?),
            ],
            None => [None, None],
        };

        let position = tree.position_mut(current)?;
        if let Some(removed) = removed {
            position.removed_stones = Some(removed);
        }
        if let Some(score) = &record.score {
            position.game_scores = Some(score.clone());
        }
        self.cancel_estimation();
        self.settings = settings;
        self.move_tree = tree;
        self.current = current;
        self.removed_stones_accepted = accepted;
        self.undo_requested = record.undo_requested;
        self.auto_scoring_done = record.auto_scoring_done;
        self.outcome = record.outcome.clone().map(|outcome| (record.winner, outcome));
        info!(moves = record.moves.len(), phase = %record.phase, "game record loaded");
        self.set_phase(record.phase)
    }

    fn next_position(settings: &GameSettings, from: &BoardPosition, mv: Move) -> Result<BoardPosition> {
        if from.last_move_number() < settings.handicap_moves() {
            if let Move::Place(point) = mv {
                return from.make_handicap_placement(point);
            }
        }
        from.make_move(mv, &settings.move_rules)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn set_komi(&mut self, komi: f64) {
        self.settings.komi = komi;
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn move_tree(&self) -> &MoveTree {
        &self.move_tree
    }

    pub fn current_id(&self) -> PositionId {
        self.current
    }

    /// The current main-line position. Falls back to the initial position
    /// should the handle ever go stale.
    pub fn current_position(&self) -> &BoardPosition {
        self.move_tree
            .get(self.current)
            .unwrap_or_else(|| self.move_tree.initial_position())
    }

    fn current_position_mut(&mut self) -> Result<&mut BoardPosition> {
        self.move_tree.position_mut(self.current)
    }

    pub fn is_user_playing(&self) -> bool {
        self.user_playing
    }

    pub fn set_user_playing(&mut self, user_playing: bool) {
        self.user_playing = user_playing;
    }

    pub fn auto_scoring_done(&self) -> bool {
        self.auto_scoring_done
    }

    pub fn set_estimator_config(&mut self, config: EstimatorConfig) {
        self.estimator = config;
    }

    /// Replace the initial position with `black` stones already placed and
    /// `next_to_move` to play. Only allowed before the first move.
    fn reset_initial_position(&mut self, black: &[Point], next_to_move: Color) -> Result<()> {
        let current = self.current_position().last_move_number();
        if current != 0 {
            return Err(EngineError::OutOfSequence {
                expected: 0,
                found: current,
            });
        }
        let mut initial = BoardPosition::new(self.settings.width, self.settings.height);
        for &point in black {
            if initial.board().get(point).is_some() {
                return Err(EngineError::IllegalMove(IllegalMoveReason::Occupied));
            }
            initial.put_stone(point, HANDICAP_COLOR)?;
        }
        initial.set_next_to_move(next_to_move);

        self.cancel_estimation();
        self.move_tree = MoveTree::new(initial);
        self.current = self.move_tree.root();
        Ok(())
    }

    /// Set up a fixed handicap on the star points; White moves first.
    pub fn place_fixed_handicap(&mut self, count: usize) -> Result<Vec<Point>> {
        let points = fixed_handicap_points(self.settings.width, self.settings.height, count)?;
        self.reset_initial_position(&points, Color::White)?;
        self.settings.handicap = count;
        self.settings.free_handicap_placement = false;
        Ok(points)
    }

    /// Set up handicap stones chosen by Black all at once; White moves first.
    pub fn place_free_handicap(&mut self, points: &[Point]) -> Result<()> {
        if points.len() < 2 {
            return Err(EngineError::InvalidHandicap {
                count: points.len(),
                width: self.settings.width,
                height: self.settings.height,
            });
        }
        self.reset_initial_position(points, Color::White)?;
        self.settings.handicap = points.len();
        self.settings.free_handicap_placement = false;
        Ok(())
    }

    /// Play `mv` on the main line, or as an analysis variation when
    /// `from_analysis` names the position to branch from.
    ///
    /// Returns the handle of the resulting position. Free handicap stones are
    /// placed (without passing the turn) while the handicap is incomplete.
    pub fn make_move(&mut self, mv: Move, from_analysis: Option<PositionId>) -> Result<PositionId> {
        let from = from_analysis.unwrap_or(self.current);
        let next = Self::next_position(&self.settings, self.move_tree.position(from)?, mv)?;
        let main_branch = from_analysis.is_none();
        let id = self.move_tree.register(next, from, main_branch)?;
        if main_branch {
            self.current = id;
            self.undo_requested = None;
        }
        Ok(id)
    }

    /// Retract the main line back to the position before `move_number`,
    /// dropping the retracted positions from the tree.
    pub fn undo_move(&mut self, move_number: usize) -> Result<()> {
        let current = self.current_position().last_move_number();
        let root = self.move_tree.initial_position().last_move_number();
        if move_number <= root || move_number > current {
            return Err(EngineError::OutOfSequence {
                expected: current,
                found: move_number,
            });
        }

        let retracted = self
            .move_tree
            .ancestors(self.current)
            .find(|&id| self.move_tree.get(id).is_some_and(|p| p.last_move_number() == move_number))
            .ok_or(EngineError::UnknownPosition(self.current))?;
        let parent = self
            .move_tree
            .parent(retracted)
            .ok_or(EngineError::UnknownPosition(retracted))?;

        self.move_tree.remove_data(retracted)?;
        self.current = parent;
        self.undo_requested = None;
        info!(move_number, "move undone");
        Ok(())
    }

    pub fn request_undo(&mut self, move_number: usize) {
        self.undo_requested = Some(move_number);
    }

    pub fn undo_requested(&self) -> Option<usize> {
        self.undo_requested
    }

    /// Whether the local player may ask for an undo right now.
    pub fn undoable(&self) -> bool {
        let minimum = if self.settings.free_handicap_placement {
            self.settings.handicap
        } else {
            0
        };
        self.user_playing
            && self.phase == GamePhase::Play
            && self.outcome.is_none()
            && self.undo_requested.is_none()
            && self.current_position().last_move_number() > minimum
    }

    /// A pending undo request targets the move just played.
    pub fn undo_acceptable(&self) -> bool {
        self.user_playing && self.undo_requested == Some(self.current_position().last_move_number())
    }

    /// Still early enough that the game can be cancelled instead of resigned.
    pub fn can_be_cancelled(&self) -> bool {
        self.phase == GamePhase::Play
            && self.current_position().last_move_number() < 2 + self.settings.handicap_moves()
    }

    /// Enter `phase` and run its side effects.
    ///
    /// Entering stone removal starts an ownership estimate when nothing was
    /// auto-scored yet and the local viewer plays; otherwise the position is
    /// scored right away. Going back to play drops scores and removed stones.
    /// Any in-flight estimate is invalidated either way.
    pub fn set_phase(&mut self, phase: GamePhase) -> Result<()> {
        info!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
        self.cancel_estimation();
        self.current_position_mut()?.bump_generation();

        match phase {
            GamePhase::StoneRemoval => {
                if !self.auto_scoring_done && self.user_playing {
                    self.start_estimation();
                } else {
                    self.compute_scores_and_update()?;
                }
            }
            GamePhase::Play => {
                self.auto_scoring_done = false;
                let position = self.current_position_mut()?;
                position.game_scores = None;
                position.removed_stones = None;
                position.estimated_scores = None;
            }
            GamePhase::Finished => {
                if self.current_position().game_scores.is_none() {
                    self.compute_scores_and_update()?;
                }
            }
        }
        Ok(())
    }

    fn start_estimation(&mut self) {
        let task = EstimationTask::spawn(self.current_position(), self.current, self.estimator.clone());
        self.estimation = Some(task);
    }

    fn cancel_estimation(&mut self) {
        if let Some(task) = self.estimation.take() {
            task.cancel();
        }
    }

    pub fn estimation_pending(&self) -> bool {
        self.estimation.is_some()
    }

    /// Collect a finished estimate without blocking.
    ///
    /// Returns the proposed removal set (dead stones plus dame) when a fresh
    /// estimate arrived; the ownership map is kept on the position.
    pub fn poll_estimation(&mut self) -> Option<BTreeSet<Point>> {
        let estimate = self.estimation.as_ref()?.try_result()?;
        let task = self.estimation.take()?;
        self.apply_stamped_estimate(task.position_id(), task.generation(), estimate)
    }

    /// Block until the running estimate (if any) finishes.
    pub fn wait_estimation(&mut self) -> Option<BTreeSet<Point>> {
        let task = self.estimation.take()?;
        let (id, generation) = (task.position_id(), task.generation());
        let estimate = task.wait()?;
        self.apply_stamped_estimate(id, generation, estimate)
    }

    fn apply_stamped_estimate(&mut self, id: PositionId, generation: u64, estimate: Board) -> Option<BTreeSet<Point>> {
        let fresh = self.phase == GamePhase::StoneRemoval
            && id == self.current
            && self.move_tree.get(id).is_some_and(|p| p.generation() == generation);
        if !fresh {
            warn!(?id, generation, "discarding stale estimate");
            return None;
        }

        let position = self.move_tree.position_mut(id).ok()?;
        let removed = removed_from_estimate(position.board(), &estimate);
        position.estimated_scores = Some(estimate);
        self.auto_scoring_done = true;
        Some(removed)
    }

    pub fn compute_score(&self) -> GameScores {
        compute_score(
            self.current_position(),
            &self.settings.scoring_rules,
            self.settings.komi,
            self.settings.handicap,
        )
    }

    /// Score the current position and keep the result on it.
    pub fn compute_scores_and_update(&mut self) -> Result<()> {
        let scores = self.compute_score();
        self.current_position_mut()?.game_scores = Some(scores);
        Ok(())
    }

    /// Replace the removed set from a position string.
    pub fn set_removed_stones(&mut self, removed: &str) -> Result<()> {
        let points = points_from_position_string(removed)?;
        self.set_removed_points(points)
    }

    pub fn set_removed_points(&mut self, points: BTreeSet<Point>) -> Result<()> {
        let position = self.current_position_mut()?;
        for &point in &points {
            if !position.board().contains(point) {
                return Err(EngineError::OutOfBounds {
                    point,
                    width: position.width(),
                    height: position.height(),
                });
            }
        }
        position.removed_stones = Some(points);
        if self.phase == GamePhase::StoneRemoval {
            self.compute_scores_and_update()?;
        }
        Ok(())
    }

    /// Flip the removed state of the chain at `point` (or of the single
    /// point, when it is empty).
    pub fn toggle_removed_chain(&mut self, point: Point) -> Result<()> {
        let position = self.current_position();
        if !position.board().contains(point) {
            return Err(EngineError::OutOfBounds {
                point,
                width: position.width(),
                height: position.height(),
            });
        }
        let mut chain = position.board().chain(point);
        if chain.is_empty() {
            chain.push(point);
        }

        let mut removed = position.removed_stones.clone().unwrap_or_default();
        if chain.iter().all(|p| removed.contains(p)) {
            for p in &chain {
                removed.remove(p);
            }
        } else {
            removed.extend(chain);
        }
        self.set_removed_points(removed)
    }

    /// Record that `color` accepts the current removed set.
    pub fn accept_removed_stones(&mut self, color: Color) {
        let removed = self.current_position().removed_stones.clone().unwrap_or_default();
        self.removed_stones_accepted[color.index()] = Some(removed);
    }

    pub fn accepted_removed_stones(&self, color: Color) -> Option<&BTreeSet<Point>> {
        self.removed_stones_accepted[color.index()].as_ref()
    }

    /// Both colors accepted exactly the current removed set.
    pub fn removal_accepted(&self) -> bool {
        let empty = BTreeSet::new();
        let current = self.current_position().removed_stones.as_ref().unwrap_or(&empty);
        self.removed_stones_accepted
            .iter()
            .all(|accepted| accepted.as_ref() == Some(current))
    }

    /// One-line summary of the game state.
    pub fn status(&self) -> String {
        if let Some((winner, outcome)) = &self.outcome {
            let winner = if *winner == Some(Color::Black) { Color::Black } else { Color::White };
            return format!("{winner} wins by {outcome}");
        }

        let position = self.current_position();
        if self.phase == GamePhase::Finished {
            if let Some(scores) = &position.game_scores {
                return match scores.winner() {
                    Some(color) => format!("{color} wins by {}", scores.margin()),
                    None => "Jigo".to_string(),
                };
            }
        }

        if let Some(estimate) = &position.estimated_scores {
            let black = estimate.count(Color::Black) as f64;
            let white = estimate.count(Color::White) as f64;
            let difference = white + self.settings.komi - black;
            return if difference > 0.0 {
                format!("White by {difference:.1}")
            } else {
                format!("Black by {:.1}", -difference)
            };
        }

        if self.phase == GamePhase::StoneRemoval {
            return "Stone Removal Phase".to_string();
        }
        if self.undo_requested.is_some() {
            return "Undo requested".to_string();
        }
        match position.last_move() {
            Some(Move::Pass) => format!("{} passed", position.next_to_move().opposite()),
            _ => format!("{} to move", position.next_to_move()),
        }
    }
}
