//! Fixed-size 2D grid of stones.
//!
//! `Board` is the snapshot a `BoardPosition` owns. It knows nothing about
//! turns or history, only cells, neighbours, chains and liberties.

use std::fmt;
use std::ops::Index;

use crate::point::{Color, Point, Stone};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Stone>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn idx(&self, point: Point) -> usize {
        point.row * self.width + point.column
    }

    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.row < self.height && point.column < self.width
    }

    /// Stone at `point`; out-of-bounds points read as empty.
    pub fn get(&self, point: Point) -> Stone {
        if !self.contains(point) {
            return None;
        }
        self.cells[self.idx(point)]
    }

    pub(crate) fn set(&mut self, point: Point, stone: Stone) {
        let i = self.idx(point);
        self.cells[i] = stone;
    }

    /// All points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |column| Point::new(row, column)))
    }

    /// Orthogonal neighbours that lie on the board.
    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> + '_ {
        let Point { row, column } = point;
        let mut v = Vec::with_capacity(4);
        if row > 0 {
            v.push(Point::new(row - 1, column));
        }
        if column + 1 < self.width {
            v.push(Point::new(row, column + 1));
        }
        if row + 1 < self.height {
            v.push(Point::new(row + 1, column));
        }
        if column > 0 {
            v.push(Point::new(row, column - 1));
        }
        v.into_iter()
    }

    /// Collect the chain of same-colored stones containing `start`.
    ///
    /// Returns an empty vector when `start` is empty.
    pub fn chain(&self, start: Point) -> Vec<Point> {
        let Some(color) = self.get(start) else {
            return Vec::new();
        };
        let mut stack = vec![start];
        let mut visited = vec![false; self.cells.len()];
        let mut out = Vec::new();
        while let Some(pt) = stack.pop() {
            let i = self.idx(pt);
            if visited[i] {
                continue;
            }
            visited[i] = true;
            out.push(pt);
            for n in self.neighbors(pt) {
                if !visited[self.idx(n)] && self.get(n) == Some(color) {
                    stack.push(n);
                }
            }
        }
        out
    }

    /// Count the distinct empty points adjacent to the chain containing `start`.
    pub fn liberties(&self, start: Point) -> usize {
        let Some(color) = self.get(start) else {
            return 0;
        };
        let mut stack = vec![start];
        let mut visited = vec![false; self.cells.len()];
        let mut liberty_visited = vec![false; self.cells.len()];
        let mut libs = 0;
        while let Some(pt) = stack.pop() {
            let i = self.idx(pt);
            if visited[i] {
                continue;
            }
            visited[i] = true;
            for n in self.neighbors(pt) {
                let ni = self.idx(n);
                match self.get(n) {
                    None => {
                        if !liberty_visited[ni] {
                            liberty_visited[ni] = true;
                            libs += 1;
                        }
                    }
                    Some(c) if c == color && !visited[ni] => stack.push(n),
                    _ => {}
                }
            }
        }
        libs
    }

    pub fn count(&self, color: Color) -> usize {
        self.cells.iter().filter(|&&c| c == Some(color)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Same board with black and white swapped.
    pub fn inverted(&self) -> Board {
        Board {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|c| c.map(Color::opposite)).collect(),
        }
    }
}

impl Index<Point> for Board {
    type Output = Stone;

    /// Panics when `point` is off the board; use `get` for a total lookup.
    fn index(&self, point: Point) -> &Stone {
        assert!(self.contains(point), "point {point} outside the board");
        &self.cells[self.idx(point)]
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            for column in 0..self.width {
                let ch = match self.get(Point::new(row, column)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
