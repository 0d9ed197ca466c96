//! Territory regions: maximal 4-connected sets of empty or removed points.
//!
//! A region belongs to a color when every live stone touching it has that
//! color. The board edge counts as no color at all, so a region that touches
//! nothing but the edge is neutral.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::point::{Color, Point};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerritoryGroup {
    pub points: BTreeSet<Point>,
    /// Bordered by live stones of exactly one color
    pub is_territory: bool,
    pub territory_color: Option<Color>,
    /// Neutral: bordered by both colors or by none, or explicitly marked as dame
    pub is_dame: bool,
}

impl TerritoryGroup {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Flood-fill every empty or removed point of `board` into territory groups.
///
/// Stones listed in `removed` are treated as captured. Empty points listed in
/// `removed` mark their group as dame without changing its owner.
pub fn construct_territory_groups(board: &Board, removed: &BTreeSet<Point>) -> Vec<TerritoryGroup> {
    let is_open = |pt: Point| board.get(pt).is_none() || removed.contains(&pt);
    let mut visited = vec![false; board.width() * board.height()];
    let index = |pt: Point| pt.row * board.width() + pt.column;
    let mut groups = Vec::new();

    for start in board.points() {
        if visited[index(start)] || !is_open(start) {
            continue;
        }

        let mut points = BTreeSet::new();
        let mut borders = [false; 2];
        let mut marked_dame = false;
        let mut stack = vec![start];
        visited[index(start)] = true;

        while let Some(pt) = stack.pop() {
            points.insert(pt);
            if board.get(pt).is_none() && removed.contains(&pt) {
                marked_dame = true;
            }
            for n in board.neighbors(pt) {
                if is_open(n) {
                    if !visited[index(n)] {
                        visited[index(n)] = true;
                        stack.push(n);
                    }
                } else if let Some(color) = board.get(n) {
                    borders[color.index()] = true;
                }
            }
        }

        let territory_color = match borders {
            [true, false] => Some(Color::Black),
            [false, true] => Some(Color::White),
            _ => None,
        };
        groups.push(TerritoryGroup {
            points,
            is_territory: territory_color.is_some(),
            territory_color,
            is_dame: territory_color.is_none() || marked_dame,
        });
    }

    groups
}
