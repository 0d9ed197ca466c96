//! Ruleset presets and the independent rule switches derived from them.
//!
//! A game carries a `Ruleset` name, but everything downstream only looks at
//! the flags in `MoveRules` and `ScoringRules`. Game records may override any
//! single flag, so presets are just defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_FIXED_HANDICAP, MIN_HANDICAP_BOARD_SIZE};
use crate::error::{EngineError, Result};
use crate::point::Point;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    #[default]
    Chinese,
    Aga,
    Japanese,
    Korean,
    Ing,
    Nz,
}

impl Ruleset {
    pub fn full_name(self) -> &'static str {
        match self {
            Ruleset::Chinese => "Chinese",
            Ruleset::Aga => "AGA",
            Ruleset::Japanese => "Japanese",
            Ruleset::Korean => "Korean",
            Ruleset::Ing => "Ing SST",
            Ruleset::Nz => "New Zealand",
        }
    }

    pub fn default_komi(self) -> f64 {
        match self {
            Ruleset::Chinese | Ruleset::Aga => 7.5,
            Ruleset::Japanese | Ruleset::Korean => 6.5,
            Ruleset::Ing => 8.0,
            Ruleset::Nz => 7.0,
        }
    }

    /// Look up a ruleset by its short or full name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        [
            Ruleset::Chinese,
            Ruleset::Aga,
            Ruleset::Japanese,
            Ruleset::Korean,
            Ruleset::Ing,
            Ruleset::Nz,
        ]
        .into_iter()
        .find(|r| r.short_name() == name || r.full_name().to_ascii_lowercase() == name)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Ruleset::Chinese => "chinese",
            Ruleset::Aga => "aga",
            Ruleset::Japanese => "japanese",
            Ruleset::Korean => "korean",
            Ruleset::Ing => "ing",
            Ruleset::Nz => "nz",
        }
    }

    pub fn scoring_rules(self) -> ScoringRules {
        match self {
            Ruleset::Japanese | Ruleset::Korean => ScoringRules {
                score_territory: true,
                score_stones: false,
                score_prisoners: true,
                score_handicap: false,
                aga_handicap_scoring: false,
            },
            Ruleset::Aga => ScoringRules {
                score_territory: true,
                score_stones: true,
                score_prisoners: false,
                score_handicap: true,
                aga_handicap_scoring: true,
            },
            Ruleset::Chinese | Ruleset::Ing => ScoringRules {
                score_territory: true,
                score_stones: true,
                score_prisoners: false,
                score_handicap: true,
                aga_handicap_scoring: false,
            },
            Ruleset::Nz => ScoringRules {
                score_territory: true,
                score_stones: true,
                score_prisoners: false,
                score_handicap: false,
                aga_handicap_scoring: false,
            },
        }
    }

    pub fn move_rules(self) -> MoveRules {
        match self {
            Ruleset::Japanese | Ruleset::Korean => MoveRules {
                allow_self_capture: false,
                allow_ko: false,
                allow_superko: true,
            },
            Ruleset::Chinese | Ruleset::Aga => MoveRules {
                allow_self_capture: false,
                allow_ko: false,
                allow_superko: false,
            },
            Ruleset::Ing | Ruleset::Nz => MoveRules {
                allow_self_capture: true,
                allow_ko: false,
                allow_superko: false,
            },
        }
    }
}

/// Switches consulted when validating a move.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRules {
    pub allow_self_capture: bool,
    /// Simple ko retakes are allowed (only consulted when superko is off).
    pub allow_ko: bool,
    /// Whole-board repetition is allowed, i.e. positional superko is off.
    pub allow_superko: bool,
}

impl Default for MoveRules {
    fn default() -> Self {
        Ruleset::default().move_rules()
    }
}

/// Switches consulted by the score tally.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub score_territory: bool,
    pub score_stones: bool,
    pub score_prisoners: bool,
    pub score_handicap: bool,
    pub aga_handicap_scoring: bool,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Ruleset::default().scoring_rules()
    }
}

/// Standard star-point placement for a fixed handicap.
///
/// Stones go to the corners first (lower-left, upper-right, upper-left,
/// lower-right), then the side midpoints and tengen on odd-sized boards.
pub fn fixed_handicap_points(width: usize, height: usize, count: usize) -> Result<Vec<Point>> {
    let both_odd = width % 2 == 1 && height % 2 == 1;
    let max = if both_odd { MAX_FIXED_HANDICAP } else { 4 };
    if width.min(height) < MIN_HANDICAP_BOARD_SIZE || !(2..=max).contains(&count) {
        return Err(EngineError::InvalidHandicap {
            count,
            width,
            height,
        });
    }

    let edge = |side: usize| if side >= 13 { 3 } else { 2 };
    let (top, bottom) = (edge(height), height - 1 - edge(height));
    let (left, right) = (edge(width), width - 1 - edge(width));
    let (middle_row, middle_column) = (height / 2, width / 2);

    let mut points = vec![
        Point::new(bottom, left),
        Point::new(top, right),
        Point::new(top, left),
        Point::new(bottom, right),
    ];
    let tengen = Point::new(middle_row, middle_column);
    let left_right = [Point::new(middle_row, left), Point::new(middle_row, right)];
    let top_bottom = [Point::new(bottom, middle_column), Point::new(top, middle_column)];

    match count {
        2..=4 => points.truncate(count),
        5 => points.push(tengen),
        6 => points.extend(left_right),
        7 => {
            points.extend(left_right);
            points.push(tengen);
        }
        _ => {
            points.extend(left_right);
            points.extend(top_bottom);
            if count == 9 {
                points.push(tengen);
            }
        }
    }
    Ok(points)
}
