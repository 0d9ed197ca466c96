//! Go Text Protocol (GTP) front end.
//!
//! Exposes the rules engine to GTP controllers (GoGui, Sabaki, twogtp) as a
//! referee: it keeps the game, validates moves and scores the final
//! position, but never generates moves of its own.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`
//! - `list_commands`, `known_command <cmd>`, `quit`
//! - `boardsize <size>` - Any size from 2 to 25, clears the board
//! - `clear_board` - Reset to an empty board
//! - `komi <value>`
//! - `rules [name]` - Show or switch the ruleset (clears the board)
//! - `play <color> <vertex>` - Play a move (`pass` allowed)
//! - `undo` - Take back the last move
//! - `fixed_handicap <n>` / `set_free_handicap <vertex>...`
//! - `showboard`
//! - `final_score` - Score with estimated dead stones removed
//! - `final_status_list <dead|alive|seki>`
//!
//! Vertices use the usual letters (skipping `I`) with row 1 at the bottom.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use crate::constants::GTP_COLUMNS;
use crate::estimator::{dead_stones_from_estimate, removed_from_estimate};
use crate::game::{Game, GameSettings};
use crate::point::{Color, Move, Point};
use crate::rules::Ruleset;
use crate::scoring::compute_score;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "final_score",
    "final_status_list",
    "fixed_handicap",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "rules",
    "set_free_handicap",
    "showboard",
    "undo",
    "version",
];

/// Parse a GTP vertex such as `D4` on a `width` x `height` board.
///
/// Returns `Some(Move::Pass)` for `pass` and `None` for anything off the board.
pub fn parse_vertex(vertex: &str, width: usize, height: usize) -> Option<Move> {
    let vertex = vertex.to_ascii_uppercase();
    if vertex == "PASS" {
        return Some(Move::Pass);
    }
    let mut chars = vertex.chars();
    let letter = chars.next()?;
    let column = GTP_COLUMNS.iter().position(|&c| c as char == letter)?;
    let number: usize = chars.as_str().parse().ok()?;
    if column >= width || number == 0 || number > height {
        return None;
    }
    Some(Move::Place(Point::new(height - number, column)))
}

/// Format a point as a GTP vertex.
pub fn format_vertex(point: Point, height: usize) -> String {
    let letter = GTP_COLUMNS.get(point.column).map_or('?', |&c| c as char);
    format!("{letter}{}", height - point.row)
}

fn parse_color(arg: &str) -> Option<Color> {
    match arg.to_ascii_lowercase().as_str() {
        "b" | "black" => Some(Color::Black),
        "w" | "white" => Some(Color::White),
        _ => None,
    }
}

/// GTP engine state.
pub struct GtpEngine {
    game: Game,
}

impl GtpEngine {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            game: Game::new(settings),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Run the GTP command loop on stdin/stdout.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        self.run_with(stdin.lock(), io::stdout())
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            let command = parts[0].to_lowercase();
            let args = &parts[1..];
            let (success, message) = self.execute(&command, args);

            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }
        (None, trimmed)
    }

    fn reset(&mut self, settings: GameSettings) {
        self.game = Game::new(settings);
    }

    fn settings(&self) -> GameSettings {
        let mut settings = self.game.settings().clone();
        settings.handicap = 0;
        settings.free_handicap_placement = false;
        settings
    }

    /// Execute a GTP command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "2".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let Some(name) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let known = KNOWN_COMMANDS.contains(&name.to_lowercase().as_str());
                (true, known.to_string())
            }

            "quit" => (true, String::new()),

            "boardsize" => {
                let Some(arg) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let Ok(size) = arg.parse::<usize>() else {
                    return (false, "invalid size".to_string());
                };
                let current = self.settings();
                match GameSettings::new(size, size, current.ruleset) {
                    Ok(mut settings) => {
                        settings.komi = current.komi;
                        self.reset(settings);
                        (true, String::new())
                    }
                    Err(_) => (false, "unacceptable size".to_string()),
                }
            }

            "clear_board" => {
                let settings = self.settings();
                self.reset(settings);
                (true, String::new())
            }

            "komi" => {
                let Some(Ok(komi)) = args.first().map(|a| a.parse::<f64>()) else {
                    return (false, "invalid komi".to_string());
                };
                self.game.set_komi(komi);
                (true, String::new())
            }

            "rules" => {
                let Some(name) = args.first() else {
                    return (true, self.game.settings().ruleset.full_name().to_string());
                };
                let Some(ruleset) = Ruleset::from_name(name) else {
                    return (false, format!("unknown rules: {name}"));
                };
                let current = self.settings();
                match GameSettings::new(current.width, current.height, ruleset) {
                    Ok(settings) => {
                        self.reset(settings);
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "play" => {
                if args.len() < 2 {
                    return (false, "missing arguments".to_string());
                }
                let Some(color) = parse_color(args[0]) else {
                    return (false, "invalid color".to_string());
                };
                let (width, height) = (self.game.settings().width, self.game.settings().height);
                let Some(mv) = parse_vertex(args[1], width, height) else {
                    return (false, "invalid vertex".to_string());
                };
                if color != self.game.current_position().next_to_move() {
                    return (false, "illegal move: wrong color".to_string());
                }
                match self.game.make_move(mv, None) {
                    Ok(_) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                }
            }

            "undo" => {
                let last = self.game.current_position().last_move_number();
                match self.game.undo_move(last) {
                    Ok(()) => (true, String::new()),
                    Err(_) => (false, "cannot undo".to_string()),
                }
            }

            "fixed_handicap" => {
                let Some(Ok(count)) = args.first().map(|a| a.parse::<usize>()) else {
                    return (false, "invalid handicap".to_string());
                };
                if !self.game.current_position().board().is_empty() {
                    return (false, "board not empty".to_string());
                }
                match self.game.place_fixed_handicap(count) {
                    Ok(points) => (true, self.format_points(points)),
                    Err(e) => (false, e.to_string()),
                }
            }

            "set_free_handicap" => {
                if !self.game.current_position().board().is_empty() {
                    return (false, "board not empty".to_string());
                }
                let (width, height) = (self.game.settings().width, self.game.settings().height);
                let mut points = Vec::with_capacity(args.len());
                for arg in args {
                    match parse_vertex(arg, width, height) {
                        Some(Move::Place(point)) => points.push(point),
                        _ => return (false, format!("invalid vertex: {arg}")),
                    }
                }
                match self.game.place_free_handicap(&points) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                }
            }

            "showboard" => (true, format!("\n{}", self.render_board())),

            "final_score" => {
                let position = self.game.current_position();
                let estimate = position.estimate_territory();
                let mut scored = position.clone();
                scored.removed_stones = Some(removed_from_estimate(position.board(), &estimate));
                let settings = self.game.settings();
                let scores = compute_score(&scored, &settings.scoring_rules, settings.komi, settings.handicap);
                (true, scores.result_string())
            }

            "final_status_list" => {
                let Some(status) = args.first().map(|a| a.to_lowercase()) else {
                    return (false, "missing argument".to_string());
                };
                let position = self.game.current_position();
                let board = position.board();
                let dead = dead_stones_from_estimate(board, &position.estimate_territory());
                let points: BTreeSet<Point> = match status.as_str() {
                    "dead" => dead,
                    "alive" => board
                        .points()
                        .filter(|&p| board.get(p).is_some() && !dead.contains(&p))
                        .collect(),
                    "seki" => BTreeSet::new(),
                    _ => return (false, format!("invalid status: {status}")),
                };
                (true, self.format_points(points))
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn format_points(&self, points: impl IntoIterator<Item = Point>) -> String {
        let height = self.game.settings().height;
        points
            .into_iter()
            .map(|p| format_vertex(p, height))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Board with GTP coordinates around it and the prisoner counts.
    fn render_board(&self) -> String {
        let position = self.game.current_position();
        let (width, height) = (position.width(), position.height());
        let letters: String = GTP_COLUMNS[..width]
            .iter()
            .map(|&c| format!(" {}", c as char))
            .collect();

        let mut out = format!("  {letters}\n");
        for row in 0..height {
            out.push_str(&format!("{:>2}", height - row));
            for column in 0..width {
                let ch = match position[Point::new(row, column)] {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                out.push(' ');
                out.push(ch);
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "captures X: {} O: {}",
            position.captures(Color::Black),
            position.captures(Color::White)
        ));
        out
    }
}
