//! Rule-parameterised score tally.
//!
//! `compute_score` is a pure function of the position (including its removed
//! stones) and the scoring switches, so it can be called again on every
//! phase change and always produces the same result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::point::{Color, Point};
use crate::position::BoardPosition;
use crate::rules::ScoringRules;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerScore {
    pub handicap: usize,
    pub komi: f64,
    /// Territory and stones counted for this color, for display
    #[serde(with = "position_string_set")]
    pub scoring_positions: BTreeSet<Point>,
    pub stones: usize,
    pub territory: usize,
    pub prisoners: usize,
    pub total: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameScores {
    pub black: PlayerScore,
    pub white: PlayerScore,
}

impl GameScores {
    pub fn player(&self, color: Color) -> &PlayerScore {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    fn player_mut(&mut self, color: Color) -> &mut PlayerScore {
        match color {
            Color::Black => &mut self.black,
            Color::White => &mut self.white,
        }
    }

    /// `None` on a tie.
    pub fn winner(&self) -> Option<Color> {
        if self.black.total > self.white.total {
            Some(Color::Black)
        } else if self.white.total > self.black.total {
            Some(Color::White)
        } else {
            None
        }
    }

    pub fn margin(&self) -> f64 {
        (self.black.total - self.white.total).abs()
    }

    /// Result in the usual `B+3.5` / `W+0.5` / `0` notation.
    pub fn result_string(&self) -> String {
        match self.winner() {
            Some(Color::Black) => format!("B+{}", self.margin()),
            Some(Color::White) => format!("W+{}", self.margin()),
            None => "0".to_string(),
        }
    }
}

/// Score `position` under `rules`.
///
/// White receives komi and the handicap compensation; the latter only counts
/// toward the total when `score_handicap` is set.
pub fn compute_score(position: &BoardPosition, rules: &ScoringRules, komi: f64, handicap: usize) -> GameScores {
    let mut score = GameScores {
        black: PlayerScore::default(),
        white: PlayerScore {
            handicap,
            komi,
            ..PlayerScore::default()
        },
    };

    if rules.aga_handicap_scoring && score.white.handicap > 0 {
        score.white.handicap -= 1;
    }

    if rules.score_territory {
        for group in position.construct_territory_groups() {
            let Some(color) = group.territory_color else {
                continue;
            };
            let player = score.player_mut(color);
            if !group.is_dame {
                player.territory += group.len();
            }
            player.scoring_positions.extend(group.points);
        }
    }

    for point in position.board().points() {
        let Some(color) = position[point] else {
            continue;
        };
        let removed = position.is_removed(point);
        if !removed && rules.score_stones {
            let player = score.player_mut(color);
            player.stones += 1;
            player.scoring_positions.insert(point);
        }
        if removed && rules.score_prisoners {
            score.player_mut(color.opposite()).prisoners += 1;
        }
    }

    if rules.score_prisoners {
        for color in [Color::Black, Color::White] {
            score.player_mut(color).prisoners += position.captures(color);
        }
    }

    for color in [Color::Black, Color::White] {
        let player = score.player_mut(color);
        player.total = (player.stones + player.territory + player.prisoners) as f64 + player.komi;
        if rules.score_handicap {
            player.total += player.handicap as f64;
        }
    }

    score
}

/// Serde adapter storing a point set as a position string.
mod position_string_set {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::point::{Point, points_from_position_string, position_string};

    pub fn serialize<S: Serializer>(points: &BTreeSet<Point>, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = position_string(points).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<Point>, D::Error> {
        let s = String::deserialize(deserializer)?;
        points_from_position_string(&s).map_err(serde::de::Error::custom)
    }
}
