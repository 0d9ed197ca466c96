//! Constants for board geometry, rule defaults, and estimator tuning.
//!
//! Board dimensions are runtime values (a game record decides them), so this
//! module only fixes the limits a board must respect along with the knobs of
//! the dead-stone estimator.

// =============================================================================
// Board Geometry
// =============================================================================

/// Smallest accepted board side.
pub const MIN_BOARD_SIZE: usize = 2;

/// Largest accepted board side. Position strings use one letter per axis.
pub const MAX_BOARD_SIZE: usize = 25;

/// Default board side used by the GTP front end and the demo.
pub const DEFAULT_BOARD_SIZE: usize = 19;

/// Smallest board that has star points for fixed handicap placement.
pub const MIN_HANDICAP_BOARD_SIZE: usize = 7;

/// Largest fixed handicap (corners, sides and tengen).
pub const MAX_FIXED_HANDICAP: usize = 9;

// =============================================================================
// Position String Codec
// =============================================================================

/// First letter of the two-letters-per-point encoding.
pub const POSITION_STRING_BASE: u8 = b'a';

/// Number of letters available per axis (`a..=z`).
pub const POSITION_STRING_RADIX: usize = 26;

// =============================================================================
// GTP Vertex Letters
// =============================================================================

/// Column letters for GTP vertices. 'I' is skipped to avoid confusion with 'J'.
pub const GTP_COLUMNS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

// =============================================================================
// Estimator Parameters
// =============================================================================

/// Number of independent seeded trials voted over per estimate.
pub const ESTIMATOR_TRIALS: usize = 9;

/// Seed of the first trial; trial `t` uses `ESTIMATOR_SEED + t`.
pub const ESTIMATOR_SEED: u64 = 0x5EED_60BA;

/// Influence does not travel further than this many empty points.
pub const INFLUENCE_RADIUS: usize = 8;

/// A chain controlling less than this share of its reachable space is dead.
pub const DEAD_AREA_RATIO: f64 = 0.3;

/// Maximum random shift applied to `DEAD_AREA_RATIO` per chain and trial.
pub const DEAD_AREA_JITTER: f64 = 0.04;

/// Single-color eye region size that counts as enough space for two eyes.
pub const LARGE_EYE_AREA: usize = 7;

/// Influence below this magnitude leaves an empty point neutral.
pub const NEUTRAL_INFLUENCE: f64 = 0.05;
