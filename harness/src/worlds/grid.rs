//! `GridWorld`: a 4-connected grid with walls and terrain weights, parsed
//! from ASCII art.
//!
//! | tile      | meaning                         |
//! |-----------|---------------------------------|
//! | `#`       | wall                            |
//! | `.`       | open, entering costs 1          |
//! | `1`..`9`  | open, entering costs the digit  |
//! | `S`       | the start (exactly one), cost 1 |
//! | `G`       | a goal (at least one), cost 1   |
//!
//! The Manhattan distance to the nearest goal is an admissible and
//! consistent heuristic because every step costs at least 1.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use serde::Serialize;
use wayfinder_search::{Expansion, GeneratorError, GraphGenerator};

use super::{Costed, Heuristic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    North,
    East,
    South,
    West,
}

impl Move {
    /// Successor generation order.
    pub const ALL: [Move; 4] = [Move::North, Move::East, Move::South, Move::West];

    fn delta(self) -> (i32, i32) {
        match self {
            Move::North => (0, -1),
            Move::East => (1, 0),
            Move::South => (0, 1),
            Move::West => (-1, 0),
        }
    }
}

/// Grid position plus the cost of the path to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    pub x: u16,
    pub y: u16,
    pub cost: u64,
}

impl Costed for Cell {
    fn cost(&self) -> u64 {
        self.cost
    }
}

/// Why an ASCII grid was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridParseError {
    #[error("grid is empty")]
    Empty,
    #[error("row {row} has width {width}, expected {expected}")]
    Ragged { row: usize, width: usize, expected: usize },
    #[error("unknown tile {tile:?} at ({x}, {y})")]
    UnknownTile { tile: char, x: usize, y: usize },
    #[error("grid has no start tile")]
    MissingStart,
    #[error("grid has more than one start tile")]
    DuplicateStart,
    #[error("grid has no goal tile")]
    MissingGoal,
    #[error("grid exceeds {max}x{max} cells", max = u16::MAX)]
    TooLarge,
}

#[derive(Debug, Clone)]
pub struct GridWorld {
    id: String,
    width: u16,
    height: u16,
    /// Row-major; `None` is a wall, `Some(w)` the cost of entering.
    tiles: Vec<Option<u64>>,
    start: (u16, u16),
    goals: BTreeSet<(u16, u16)>,
}

impl GridWorld {
    /// Parse a grid. Blank lines and surrounding whitespace are ignored.
    ///
    /// # Errors
    ///
    /// [`GridParseError`] for malformed art.
    #[allow(clippy::cast_possible_truncation)]
    pub fn parse(id: &str, art: &str) -> Result<Self, GridParseError> {
        let rows: Vec<&str> = art.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let expected = rows.first().map(|r| r.chars().count()).ok_or(GridParseError::Empty)?;
        let width = u16::try_from(expected).map_err(|_| GridParseError::TooLarge)?;
        let height = u16::try_from(rows.len()).map_err(|_| GridParseError::TooLarge)?;

        let mut tiles = Vec::with_capacity(expected * rows.len());
        let mut start = None;
        let mut goals = BTreeSet::new();
        for (y, row) in rows.iter().enumerate() {
            let w = row.chars().count();
            if w != expected {
                return Err(GridParseError::Ragged {
                    row: y,
                    width: w,
                    expected,
                });
            }
            for (x, tile) in row.chars().enumerate() {
                // x < width and y < height, both already known to fit u16.
                let pos = (x as u16, y as u16);
                let weight = match tile {
                    '#' => None,
                    '.' => Some(1),
                    'S' => {
                        if start.replace(pos).is_some() {
                            return Err(GridParseError::DuplicateStart);
                        }
                        Some(1)
                    }
                    'G' => {
                        goals.insert(pos);
                        Some(1)
                    }
                    d @ '1'..='9' => d.to_digit(10).map(u64::from),
                    other => return Err(GridParseError::UnknownTile { tile: other, x, y }),
                };
                tiles.push(weight);
            }
        }
        let start = start.ok_or(GridParseError::MissingStart)?;
        if goals.is_empty() {
            return Err(GridParseError::MissingGoal);
        }
        Ok(Self {
            id: id.to_string(),
            width,
            height,
            tiles,
            start,
            goals,
        })
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Cost of entering `(x, y)`; `None` for walls and positions off the grid.
    #[must_use]
    pub fn weight(&self, x: u16, y: u16) -> Option<u64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
            .flatten()
    }

    fn step(&self, x: u16, y: u16, mv: Move) -> Option<(u16, u16, u64)> {
        let (dx, dy) = mv.delta();
        let nx = u16::try_from(i32::from(x) + dx).ok()?;
        let ny = u16::try_from(i32::from(y) + dy).ok()?;
        self.weight(nx, ny).map(|w| (nx, ny, w))
    }

    /// Cheapest start-to-goal cost by Dijkstra, as a test oracle. `None`
    /// when no goal is reachable.
    #[must_use]
    pub fn reference_cost(&self) -> Option<u64> {
        let cells = usize::from(self.width) * usize::from(self.height);
        let mut best = vec![u64::MAX; cells];
        let index = |x: u16, y: u16| usize::from(y) * usize::from(self.width) + usize::from(x);
        let mut heap = BinaryHeap::new();
        best[index(self.start.0, self.start.1)] = 0;
        heap.push(Reverse((0u64, self.start.0, self.start.1)));
        while let Some(Reverse((cost, x, y))) = heap.pop() {
            if self.goals.contains(&(x, y)) {
                return Some(cost);
            }
            if cost > best[index(x, y)] {
                continue;
            }
            for mv in Move::ALL {
                if let Some((nx, ny, w)) = self.step(x, y, mv) {
                    let next = cost + w;
                    if next < best[index(nx, ny)] {
                        best[index(nx, ny)] = next;
                        heap.push(Reverse((next, nx, ny)));
                    }
                }
            }
        }
        None
    }
}

impl GraphGenerator for GridWorld {
    type State = Cell;
    type Action = Move;

    fn generator_id(&self) -> &str {
        &self.id
    }

    fn roots(&self) -> Result<Vec<Cell>, GeneratorError> {
        Ok(vec![Cell {
            x: self.start.0,
            y: self.start.1,
            cost: 0,
        }])
    }

    fn successors(&self, state: &Cell) -> Result<Vec<Expansion<Cell, Move>>, GeneratorError> {
        Ok(Move::ALL
            .into_iter()
            .filter_map(|mv| {
                let (x, y, w) = self.step(state.x, state.y, mv)?;
                let cell = Cell {
                    x,
                    y,
                    cost: state.cost.saturating_add(w),
                };
                Some(Expansion::new(cell, mv))
            })
            .collect())
    }

    fn is_goal(&self, state: &Cell) -> bool {
        self.goals.contains(&(state.x, state.y))
    }
}

impl Heuristic<Cell> for GridWorld {
    fn estimate(&self, state: &Cell) -> u64 {
        self.goals
            .iter()
            .map(|(gx, gy)| u64::from(state.x.abs_diff(*gx)) + u64::from(state.y.abs_diff(*gy)))
            .min()
            .unwrap_or(0)
    }
}
