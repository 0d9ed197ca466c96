//! Playout-free ownership estimation.
//!
//! Each trial repeatedly:
//! - spreads influence from every live stone through empty points
//! - keeps chains that own two eyes (or one large eye space) alive
//! - kills the chain that controls the smallest share of its reachable space,
//!   provided the share is below a jittered threshold
//!
//! until no chain qualifies. Trials run with consecutive seeds and vote on the
//! owner of every point, so the result is deterministic for a given config.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::board::Board;
use crate::constants::{
    DEAD_AREA_JITTER, DEAD_AREA_RATIO, ESTIMATOR_SEED, ESTIMATOR_TRIALS, INFLUENCE_RADIUS,
    LARGE_EYE_AREA, NEUTRAL_INFLUENCE,
};
use crate::point::{Color, Point, Stone};
use crate::territory::{TerritoryGroup, construct_territory_groups};

#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
    pub trials: usize,
    pub seed: u64,
    pub influence_radius: usize,
    pub dead_area_ratio: f64,
    pub dead_area_jitter: f64,
    pub large_eye_area: usize,
    pub neutral_influence: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            trials: ESTIMATOR_TRIALS,
            seed: ESTIMATOR_SEED,
            influence_radius: INFLUENCE_RADIUS,
            dead_area_ratio: DEAD_AREA_RATIO,
            dead_area_jitter: DEAD_AREA_JITTER,
            large_eye_area: LARGE_EYE_AREA,
            neutral_influence: NEUTRAL_INFLUENCE,
        }
    }
}

#[inline]
fn index(board: &Board, point: Point) -> usize {
    point.row * board.width() + point.column
}

/// Best-guess final owner of every point; `None` marks neutral points.
pub fn estimate_territory(board: &Board, config: &EstimatorConfig) -> Board {
    let never = AtomicBool::new(false);
    estimate_territory_cancellable(board, config, &never).unwrap_or_else(|| board.clone())
}

/// Same as `estimate_territory`, but gives up with `None` as soon as `cancel`
/// is raised. The flag is checked between estimator rounds.
pub fn estimate_territory_cancellable(board: &Board, config: &EstimatorConfig, cancel: &AtomicBool) -> Option<Board> {
    let cells = board.width() * board.height();
    // Votes per point: neutral, black, white
    let mut votes = vec![[0usize; 3]; cells];

    for trial in 0..config.trials.max(1) {
        let mut rng = fastrand::Rng::with_seed(config.seed.wrapping_add(trial as u64));
        let ownership = run_trial(board, config, &mut rng, cancel)?;
        for (vote, owner) in votes.iter_mut().zip(ownership) {
            vote[owner.map_or(0, |c| c.index() + 1)] += 1;
        }
    }

    let mut estimate = Board::new(board.width(), board.height());
    for point in board.points() {
        let vote = votes[index(board, point)];
        // Ties keep what is on the board
        let mut owner = board.get(point);
        let mut best = vote[owner.map_or(0, |c| c.index() + 1)];
        for (slot, candidate) in [None, Some(Color::Black), Some(Color::White)].into_iter().enumerate() {
            if vote[slot] > best {
                best = vote[slot];
                owner = candidate;
            }
        }
        estimate.set(point, owner);
    }
    Some(estimate)
}

fn run_trial(board: &Board, config: &EstimatorConfig, rng: &mut fastrand::Rng, cancel: &AtomicBool) -> Option<Vec<Stone>> {
    let mut dead: BTreeSet<Point> = BTreeSet::new();

    for round in 0.. {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        let live = without_stones(board, &dead);
        let influence = influence_map(&live, config.influence_radius);
        let regions = construct_territory_groups(&live, &BTreeSet::new());
        let region_of = region_index(&live, &regions);

        let mut seen = vec![false; live.width() * live.height()];
        let mut candidates: Vec<(f64, Vec<Point>)> = Vec::new();
        for point in live.points() {
            let Some(color) = live.get(point) else {
                continue;
            };
            if seen[index(&live, point)] {
                continue;
            }
            let chain = live.chain(point);
            for &stone in &chain {
                seen[index(&live, stone)] = true;
            }
            if has_eye_space(&live, &chain, color, &regions, &region_of, config.large_eye_area) {
                continue;
            }

            let share = controlled_share(&live, &chain, color, &influence);
            let threshold = config.dead_area_ratio + (rng.f64() * 2.0 - 1.0) * config.dead_area_jitter;
            if share < threshold {
                candidates.push((share, chain));
            }
        }

        rng.shuffle(&mut candidates);
        let Some((share, chain)) = candidates.into_iter().min_by(|a, b| a.0.total_cmp(&b.0)) else {
            trace!(round, dead = dead.len(), "estimator trial settled");
            break;
        };
        trace!(round, share, stones = chain.len(), "chain marked dead");
        dead.extend(chain);
    }

    Some(ownership(board, &dead, config))
}

fn without_stones(board: &Board, dead: &BTreeSet<Point>) -> Board {
    let mut live = board.clone();
    for &point in dead {
        live.set(point, None);
    }
    live
}

/// Signed influence per point: positive favours Black, negative White.
///
/// Every stone contributes `1 / (1 + d)^2` at empty points `d` steps away,
/// walking through empty points only.
fn influence_map(board: &Board, radius: usize) -> Vec<f64> {
    let cells = board.width() * board.height();
    let mut influence = vec![0.0; cells];
    let mut distance = vec![usize::MAX; cells];
    let mut queue = VecDeque::new();

    for source in board.points() {
        let Some(color) = board.get(source) else {
            continue;
        };
        let sign = match color {
            Color::Black => 1.0,
            Color::White => -1.0,
        };
        distance.fill(usize::MAX);
        distance[index(board, source)] = 0;
        queue.push_back(source);

        while let Some(point) = queue.pop_front() {
            let d = distance[index(board, point)];
            influence[index(board, point)] += sign / ((1 + d) as f64).powi(2);
            if d == radius {
                continue;
            }
            for n in board.neighbors(point) {
                let ni = index(board, n);
                if board.get(n).is_none() && distance[ni] == usize::MAX {
                    distance[ni] = d + 1;
                    queue.push_back(n);
                }
            }
        }
    }
    influence
}

fn region_index(board: &Board, regions: &[TerritoryGroup]) -> Vec<Option<usize>> {
    let mut region_of = vec![None; board.width() * board.height()];
    for (i, region) in regions.iter().enumerate() {
        for &point in &region.points {
            region_of[index(board, point)] = Some(i);
        }
    }
    region_of
}

/// Two distinct eye regions of the chain's color, or one big enough to make two.
fn has_eye_space(
    board: &Board,
    chain: &[Point],
    color: Color,
    regions: &[TerritoryGroup],
    region_of: &[Option<usize>],
    large_eye_area: usize,
) -> bool {
    let eyes: BTreeSet<usize> = chain
        .iter()
        .flat_map(|&stone| board.neighbors(stone))
        .filter_map(|n| region_of[index(board, n)])
        .filter(|&r| regions[r].territory_color == Some(color))
        .collect();
    eyes.len() >= 2 || eyes.iter().any(|&r| regions[r].len() >= large_eye_area)
}

/// Share of the points reachable from `chain` (through empty points and
/// friendly stones) where the influence favours `color`.
fn controlled_share(board: &Board, chain: &[Point], color: Color, influence: &[f64]) -> f64 {
    let mut visited = vec![false; board.width() * board.height()];
    let mut stack: Vec<Point> = chain.to_vec();
    for &stone in chain {
        visited[index(board, stone)] = true;
    }

    let mut space = 0usize;
    let mut controlled = 0usize;
    while let Some(point) = stack.pop() {
        space += 1;
        let value = influence[index(board, point)];
        let favoured = match color {
            Color::Black => value > 0.0,
            Color::White => value < 0.0,
        };
        if favoured {
            controlled += 1;
        }
        for n in board.neighbors(point) {
            let ni = index(board, n);
            if !visited[ni] && board.get(n).is_none_or(|c| c == color) {
                visited[ni] = true;
                stack.push(n);
            }
        }
    }
    controlled as f64 / space as f64
}

fn ownership(board: &Board, dead: &BTreeSet<Point>, config: &EstimatorConfig) -> Vec<Stone> {
    let live = without_stones(board, dead);
    let influence = influence_map(&live, config.influence_radius);
    let regions = construct_territory_groups(&live, &BTreeSet::new());
    let region_of = region_index(&live, &regions);

    board
        .points()
        .map(|point| {
            if dead.contains(&point) {
                return board.get(point).map(Color::opposite);
            }
            if let Some(color) = live.get(point) {
                return Some(color);
            }
            if let Some(owner) = region_of[index(board, point)].and_then(|r| regions[r].territory_color) {
                return Some(owner);
            }
            let value = influence[index(board, point)];
            if value > config.neutral_influence {
                Some(Color::Black)
            } else if value < -config.neutral_influence {
                Some(Color::White)
            } else {
                None
            }
        })
        .collect()
}

/// Points the removal workflow should propose given an ownership estimate:
/// stones whose estimated owner differs from their color, plus empty points
/// the estimate leaves neutral (dame).
pub fn removed_from_estimate(board: &Board, estimate: &Board) -> BTreeSet<Point> {
    board
        .points()
        .filter(|&point| {
            let cell = board.get(point);
            let owner = estimate.get(point);
            match cell {
                Some(_) => owner != cell,
                None => owner.is_none(),
            }
        })
        .collect()
}

/// Only the stones of `removed_from_estimate`.
pub fn dead_stones_from_estimate(board: &Board, estimate: &Board) -> BTreeSet<Point> {
    removed_from_estimate(board, estimate)
        .into_iter()
        .filter(|&point| board.get(point).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(black: &[(usize, usize)], white: &[(usize, usize)]) -> Board {
        let mut board = Board::new(9, 9);
        for &(r, c) in black {
            board.set(Point::new(r, c), Some(Color::Black));
        }
        for &(r, c) in white {
            board.set(Point::new(r, c), Some(Color::White));
        }
        board
    }

    /// Black wall on column 4, White wall on column 5, a lone White stone
    /// inside Black's area.
    fn split_board() -> Board {
        let black: Vec<_> = (0..9).map(|r| (r, 4)).collect();
        let mut white: Vec<_> = (0..9).map(|r| (r, 5)).collect();
        white.push((2, 1));
        board_with(&black, &white)
    }

    #[test]
    fn test_empty_board_is_neutral() {
        let board = Board::new(9, 9);
        let estimate = estimate_territory(&board, &EstimatorConfig::default());
        assert!(estimate.is_empty());
    }

    #[test]
    fn test_single_stone_owns_everything() {
        let board = board_with(&[(4, 4)], &[]);
        let estimate = estimate_territory(&board, &EstimatorConfig::default());
        assert_eq!(estimate.count(Color::Black), 81);
        assert!(dead_stones_from_estimate(&board, &estimate).is_empty());
        assert!(removed_from_estimate(&board, &estimate).is_empty());
    }

    #[test]
    fn test_invading_stone_is_dead() {
        let board = split_board();
        let estimate = estimate_territory(&board, &EstimatorConfig::default());
        assert_eq!(estimate.get(Point::new(2, 1)), Some(Color::Black));
        assert_eq!(estimate.count(Color::Black), 45);
        assert_eq!(estimate.count(Color::White), 36);
        assert_eq!(
            dead_stones_from_estimate(&board, &estimate),
            BTreeSet::from([Point::new(2, 1)])
        );
        assert_eq!(
            removed_from_estimate(&board, &estimate),
            BTreeSet::from([Point::new(2, 1)])
        );
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let board = split_board();
        let config = EstimatorConfig::default();
        assert_eq!(estimate_territory(&board, &config), estimate_territory(&board, &config));
    }

    #[test]
    fn test_colors_are_symmetric() {
        let board = split_board();
        let config = EstimatorConfig::default();
        let estimate = estimate_territory(&board, &config);
        let mirrored = estimate_territory(&board.inverted(), &config);
        assert_eq!(mirrored, estimate.inverted());
    }

    #[test]
    fn test_cancelled_estimate_returns_none() {
        let cancel = AtomicBool::new(true);
        let board = split_board();
        assert!(estimate_territory_cancellable(&board, &EstimatorConfig::default(), &cancel).is_none());
    }

    #[test]
    fn test_neutral_points_are_proposed_as_dame() {
        let mut estimate = Board::new(9, 9);
        let board = Board::new(9, 9);
        estimate.set(Point::new(0, 0), Some(Color::Black));
        let removed = removed_from_estimate(&board, &estimate);
        assert_eq!(removed.len(), 80);
        assert!(!removed.contains(&Point::new(0, 0)));
    }
}
