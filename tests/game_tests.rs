//! Integration tests for scoring, estimation and the game shell.

use std::collections::BTreeSet;

use goban_rules::EngineError;
use goban_rules::game::{Game, GamePhase, GameRecord, GameSettings};
use goban_rules::gtp::GtpEngine;
use goban_rules::point::{Color, Move, Point};
use goban_rules::position::BoardPosition;
use goban_rules::rules::{Ruleset, ScoringRules};
use goban_rules::scoring::compute_score;

// =============================================================================
// Helper functions
// =============================================================================

fn place(row: usize, column: usize) -> Move {
    Move::Place(Point::new(row, column))
}

/// Random stones (and a random removed subset) on a 9x9 board, plus the
/// same setup with colors swapped.
fn random_pair(rng: &mut fastrand::Rng) -> (BoardPosition, BoardPosition) {
    let mut pos = BoardPosition::new(9, 9);
    let mut mirrored = BoardPosition::new(9, 9);
    let mut removed = BTreeSet::new();
    for row in 0..9 {
        for column in 0..9 {
            let point = Point::new(row, column);
            let color = match rng.u8(0..4) {
                0 => Color::Black,
                1 => Color::White,
                _ => continue,
            };
            pos.put_stone(point, color).unwrap();
            mirrored.put_stone(point, color.opposite()).unwrap();
            if rng.u8(0..5) == 0 {
                removed.insert(point);
            }
        }
    }
    pos.removed_stones = Some(removed.clone());
    mirrored.removed_stones = Some(removed);
    (pos, mirrored)
}

/// A Black wall on column 4 and a White wall on column 5.
fn walled_record() -> GameRecord {
    GameRecord::from_json(
        r#"{
            "width": 9,
            "height": 9,
            "rules": "chinese",
            "initial_state": {
                "black": "eaebecedeeefegehei",
                "white": "fafbfcfdfefffgfhfi"
            },
            "initial_player": "black",
            "moves": []
        }"#,
    )
    .unwrap()
}

// =============================================================================
// Scoring
// =============================================================================

#[test]
fn test_empty_board_after_two_passes() {
    let mut game = Game::new(GameSettings::new(9, 9, Ruleset::Chinese).unwrap());
    game.make_move(Move::Pass, None).unwrap();
    game.make_move(Move::Pass, None).unwrap();

    let scores = game.compute_score();
    assert_eq!(scores.black.territory, 0);
    assert_eq!(scores.white.territory, 0);
    assert_eq!(scores.black.total, 0.0);
    assert_eq!(scores.white.total, 7.5);
    assert_eq!(scores.result_string(), "W+7.5");
}

#[test]
fn test_single_stone_owns_the_board() {
    let pos = BoardPosition::new(9, 9)
        .make_move(place(4, 4), &Ruleset::Chinese.move_rules())
        .unwrap();
    let groups = pos.construct_territory_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].territory_color, Some(Color::Black));
    assert!(!groups[0].is_dame);

    let scores = compute_score(&pos, &Ruleset::Chinese.scoring_rules(), 7.5, 0);
    assert_eq!(scores.black.stones, 1);
    assert_eq!(scores.black.territory, 80);
    assert_eq!(scores.white.territory, 0);
}

#[test]
fn test_scoring_is_symmetric_under_color_swap() {
    let mut rng = fastrand::Rng::with_seed(2024);
    let all_rules = [
        Ruleset::Chinese.scoring_rules(),
        Ruleset::Japanese.scoring_rules(),
        ScoringRules {
            score_territory: true,
            score_stones: true,
            score_prisoners: true,
            score_handicap: false,
            aga_handicap_scoring: false,
        },
    ];
    for _ in 0..50 {
        let (pos, mirrored) = random_pair(&mut rng);
        for rules in &all_rules {
            let a = compute_score(&pos, rules, 0.0, 0);
            let b = compute_score(&mirrored, rules, 0.0, 0);
            assert_eq!(a.black.total, b.white.total);
            assert_eq!(a.white.total, b.black.total);
            assert_eq!(a.black.scoring_positions, b.white.scoring_positions);
        }
    }
}

#[test]
fn test_compute_score_is_idempotent() {
    let mut rng = fastrand::Rng::with_seed(5);
    let (pos, _) = random_pair(&mut rng);
    let rules = Ruleset::Aga.scoring_rules();
    assert_eq!(compute_score(&pos, &rules, 7.5, 3), compute_score(&pos, &rules, 7.5, 3));
}

// =============================================================================
// Game records
// =============================================================================

#[test]
fn test_record_replays_moves_and_removed_stones() {
    let record = GameRecord::from_json(
        r#"{
            "width": 9,
            "height": 9,
            "rules": "japanese",
            "moves": [[4, 4], [0, 0], [-1, -1], [-1, -1]],
            "removed": "aa",
            "phase": "stone removal",
            "auto_scoring_done": true
        }"#,
    )
    .unwrap();
    let game = Game::from_record(&record).unwrap();

    assert_eq!(game.phase(), GamePhase::StoneRemoval);
    assert!(!game.estimation_pending());
    let position = game.current_position();
    assert_eq!(position.last_move_number(), 4);
    assert_eq!(position.removed_stones, Some(BTreeSet::from([Point::new(0, 0)])));

    let scores = position.game_scores.as_ref().unwrap();
    assert_eq!(scores.black.territory, 80);
    assert_eq!(scores.black.prisoners, 1);
    assert_eq!(scores.white.total, 6.5);
}

#[test]
fn test_resync_keeps_analysis_variations() {
    let mut record = GameRecord::from_json(r#"{"width": 9, "height": 9, "moves": [[2, 2], [6, 6]]}"#).unwrap();
    let mut game = Game::from_record(&record).unwrap();
    let first = game.move_tree().main_line_position(1).unwrap();
    let analysis = game.make_move(place(4, 4), Some(first)).unwrap();

    record.moves = GameRecord::from_json(r#"{"width": 9, "height": 9, "moves": [[2, 2], [6, 6], [2, 6]]}"#)
        .unwrap()
        .moves;
    game.load_record(&record).unwrap();
    assert_eq!(game.current_position().last_move_number(), 3);
    assert!(game.move_tree().contains(analysis));
    assert_eq!(game.move_tree().main_line_position(1), Some(first));
}

#[test]
fn test_failed_resync_leaves_game_untouched() {
    let record = GameRecord::from_json(r#"{"width": 9, "height": 9, "moves": [[2, 2], [6, 6]]}"#).unwrap();
    let mut game = Game::from_record(&record).unwrap();
    let current = game.current_id();
    let size = game.move_tree().len();

    let bad = GameRecord::from_json(r#"{"width": 9, "height": 9, "moves": [[2, 2], [6, 6], [2, 2]]}"#).unwrap();
    assert!(matches!(game.load_record(&bad), Err(EngineError::IllegalMove(_))));
    assert_eq!(game.current_id(), current);
    assert_eq!(game.move_tree().len(), size);
}

#[test]
fn test_free_handicap_record() {
    let record = GameRecord::from_json(
        r#"{
            "width": 9,
            "height": 9,
            "rules": "aga",
            "handicap": 3,
            "free_handicap_placement": true,
            "moves": [[2, 2], [6, 6], [2, 6], [4, 4]]
        }"#,
    )
    .unwrap();
    let game = Game::from_record(&record).unwrap();
    let position = game.current_position();
    assert_eq!(position.board().count(Color::Black), 3);
    assert_eq!(position.board().count(Color::White), 1);
    assert_eq!(position.next_to_move(), Color::Black);

    let scores = game.compute_score();
    assert_eq!(scores.white.handicap, 2);
}

#[test]
fn test_finished_record_keeps_server_result() {
    let record = GameRecord::from_json(
        r#"{
            "width": 9,
            "height": 9,
            "rules": "japanese",
            "moves": [[4, 4], [2, 2]],
            "phase": "finished",
            "score": {
                "black": {"territory": 3, "total": 3.0},
                "white": {"komi": 6.5, "territory": 93, "total": 99.5}
            },
            "outcome": "Resignation",
            "winner": "white"
        }"#,
    )
    .unwrap();
    let game = Game::from_record(&record).unwrap();

    let scores = game.current_position().game_scores.as_ref().unwrap();
    assert_eq!(scores.white.total, 99.5);
    assert_eq!(scores.black.territory, 3);
    assert_eq!(game.status(), "White wins by Resignation");
    assert!(!game.undoable());
}

#[test]
fn test_finished_record_score_without_outcome() {
    let record = GameRecord::from_json(
        r#"{
            "width": 9,
            "height": 9,
            "rules": "chinese",
            "moves": [[4, 4], [-1, -1], [-1, -1]],
            "phase": "finished",
            "score": {"black": {"total": 20.0}, "white": {"total": 10.5}}
        }"#,
    )
    .unwrap();
    let game = Game::from_record(&record).unwrap();
    assert_eq!(game.status(), "Black wins by 9.5");
}

#[test]
fn test_invalid_initial_state_is_rejected() {
    let record = GameRecord::from_json(r#"{"width": 9, "height": 9, "initial_state": {"black": "abc"}}"#).unwrap();
    assert!(matches!(Game::from_record(&record), Err(EngineError::Decode(_))));
}

// =============================================================================
// Stone removal with estimation
// =============================================================================

#[test]
fn test_estimated_removal_finds_invader() {
    // A lone White stone inside Black's area
    let mut record = walled_record();
    record.initial_state.white.push_str("bc");
    let mut game = Game::from_record(&record).unwrap();

    game.set_phase(GamePhase::StoneRemoval).unwrap();
    let removed = game.wait_estimation().unwrap();
    assert!(removed.contains(&Point::new(2, 1)));
    assert!(!removed.contains(&Point::new(0, 4)));

    game.set_removed_points(removed).unwrap();
    game.accept_removed_stones(Color::Black);
    game.accept_removed_stones(Color::White);
    assert!(game.removal_accepted());

    game.set_phase(GamePhase::Finished).unwrap();
    let scores = game.current_position().game_scores.clone().unwrap();
    assert_eq!(scores.black.total, 45.0);
    assert_eq!(scores.white.total, 36.0 + 7.5);
    assert_eq!(game.status(), "Black wins by 1.5");
}

#[test]
fn test_moving_on_invalidates_estimate() {
    let mut game = Game::from_record(&walled_record()).unwrap();
    game.set_phase(GamePhase::StoneRemoval).unwrap();
    assert!(game.estimation_pending());
    game.set_phase(GamePhase::Play).unwrap();
    assert!(!game.estimation_pending());
    assert_eq!(game.wait_estimation(), None);
    assert!(game.current_position().estimated_scores.is_none());
}

// =============================================================================
// GTP session
// =============================================================================

#[test]
fn test_gtp_session_scores_game() {
    let mut engine = GtpEngine::new(GameSettings::new(9, 9, Ruleset::Chinese).unwrap());
    let mut input = String::new();
    for row in 1..=9 {
        input.push_str(&format!("play b E{row}\nplay w F{row}\n"));
    }
    input.push_str("10 final_score\n11 final_status_list dead\n12 rules\nquit\n");

    let mut output = Vec::new();
    engine.run_with(input.as_bytes(), &mut output).unwrap();
    let text = String::from_utf8(output).unwrap();

    assert!(!text.contains('?'), "{text}");
    // Black: 5 columns, White: 4 columns, komi 7.5
    assert!(text.contains("=10 B+1.5\n"));
    assert!(text.contains("=11 \n"));
    assert!(text.contains("=12 Chinese\n"));
}
