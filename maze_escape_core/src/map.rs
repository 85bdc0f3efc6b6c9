use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Position, error::MapError};

/// Character marking a wall cell in a maze source.
pub const WALL_MARKER: char = '*';
/// Character marking the exit cell in a maze source.
pub const EXIT_MARKER: char = 'L';

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Provides methods for accessing and modifying elements via (x, y) coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator function `f` takes `(x, y)` coordinates and returns the value for that cell.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a position to a flat vector index, or `None` when out of bounds.
    #[inline]
    fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.y * self.width + position.x)
        } else {
            None
        }
    }

    /// Checks if the given position lies within the grid boundaries.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    /// Gets a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.index_of(position).map(move |index| &mut self.cells[index])
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Position::new(index % width, index / width), cell))
    }
}

/// Indexing using Position coordinates for access
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.width, self.height
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, width, height
            ),
        }
    }
}

/// Terrain of a single maze cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Open,
    Wall,
}

/// The maze surface: walls and open cells plus the single exit coordinate.
///
/// The only mutation is [`MazeMap::remove_wall`], which turns a wall into an open
/// cell. The exit cell is always open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeMap {
    cells: Grid<Cell>,
    exit: Position,
}

impl MazeMap {
    /// Parses a rectangular text maze.
    ///
    /// `*` is a wall, `L` is the exit (stored as open terrain), anything else is
    /// open. The width is the longest line; shorter lines are padded with walls.
    pub fn parse(source: &str) -> Result<Self, MapError> {
        let rows: Vec<Vec<char>> = source.lines().map(|line| line.chars().collect()).collect();
        if rows.is_empty() {
            return Err(MapError::Empty);
        }

        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(MapError::Empty);
        }

        let mut exit: Option<Position> = None;
        for (y, row) in rows.iter().enumerate() {
            for (x, &ch) in row.iter().enumerate() {
                if ch != EXIT_MARKER {
                    continue;
                }
                let pos = Position::new(x, y);
                if let Some(first) = exit {
                    return Err(MapError::MultipleExits { first, second: pos });
                }
                exit = Some(pos);
            }
        }
        let exit = exit.ok_or(MapError::MissingExit {
            marker: EXIT_MARKER,
        })?;

        let cells = Grid::from_generator(width, height, |x, y| match rows[y].get(x) {
            Some(&WALL_MARKER) | None => Cell::Wall,
            Some(_) => Cell::Open,
        });

        Ok(MazeMap { cells, exit })
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    /// Terrain at `position`; anything outside the grid reads as a wall.
    pub fn cell_at(&self, position: Position) -> Cell {
        self.cells.get(position).copied().unwrap_or(Cell::Wall)
    }

    pub fn is_wall(&self, position: Position) -> bool {
        self.cell_at(position) == Cell::Wall
    }

    pub fn is_open(&self, position: Position) -> bool {
        self.cell_at(position) == Cell::Open
    }

    pub fn is_valid_position(&self, position: Position) -> bool {
        self.cells.contains(position)
    }

    /// Opens a wall cell. Returns whether anything changed.
    pub fn remove_wall(&mut self, position: Position) -> bool {
        match self.cells.get_mut(position) {
            Some(cell) if *cell == Cell::Wall => {
                *cell = Cell::Open;
                true
            }
            _ => false,
        }
    }

    /// Every wall coordinate in row-major order.
    pub fn wall_positions(&self) -> Vec<Position> {
        self.cells
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Wall)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell == Cell::Wall).count()
    }

    /// Open, non-exit cells strictly inside the outer border.
    pub fn interior_free_positions(&self) -> Vec<Position> {
        self.cells
            .enumerate()
            .filter(|(pos, cell)| {
                **cell == Cell::Open
                    && *pos != self.exit
                    && pos.x > 0
                    && pos.y > 0
                    && pos.x + 1 < self.width()
                    && pos.y + 1 < self.height()
            })
            .map(|(pos, _)| pos)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "*****\n*  L*\n* *\n*****";

    #[test]
    fn parse_pads_short_rows_with_walls() {
        let maze = MazeMap::parse(SMALL).expect("maze");
        assert_eq!(maze.width(), 5);
        assert_eq!(maze.height(), 4);
        assert_eq!(maze.exit(), Position::new(3, 1));
        assert!(maze.is_open(maze.exit()));
        assert!(maze.is_open(Position::new(1, 2)));
        assert!(maze.is_wall(Position::new(3, 2)));
        assert!(maze.is_wall(Position::new(4, 2)));
    }

    #[test]
    fn parse_requires_exactly_one_exit() {
        assert_eq!(
            MazeMap::parse("***\n* *\n***"),
            Err(MapError::MissingExit { marker: 'L' })
        );
        assert_eq!(
            MazeMap::parse("*L*\n*L*"),
            Err(MapError::MultipleExits {
                first: Position::new(1, 0),
                second: Position::new(1, 1),
            })
        );
        assert_eq!(MazeMap::parse(""), Err(MapError::Empty));
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let maze = MazeMap::parse(SMALL).expect("maze");
        assert_eq!(maze.cell_at(Position::new(50, 1)), Cell::Wall);
        assert!(!maze.is_valid_position(Position::new(5, 0)));
        assert!(maze.is_valid_position(Position::new(4, 3)));
    }

    #[test]
    fn remove_wall_only_opens_walls() {
        let mut maze = MazeMap::parse(SMALL).expect("maze");
        let walls = maze.wall_count();
        assert!(maze.remove_wall(Position::new(0, 0)));
        assert!(!maze.remove_wall(Position::new(0, 0)));
        assert!(!maze.remove_wall(Position::new(1, 1)));
        assert!(!maze.remove_wall(Position::new(9, 9)));
        assert_eq!(maze.wall_count(), walls - 1);
    }

    #[test]
    fn wall_positions_are_row_major() {
        let maze = MazeMap::parse("*L*\n* *").expect("maze");
        assert_eq!(
            maze.wall_positions(),
            vec![
                Position::new(0, 0),
                Position::new(2, 0),
                Position::new(0, 1),
                Position::new(2, 1),
            ]
        );
    }

    #[test]
    fn interior_free_positions_skip_border_and_exit() {
        let maze = MazeMap::parse("     \n L   \n     ").expect("maze");
        assert_eq!(
            maze.interior_free_positions(),
            vec![Position::new(2, 1), Position::new(3, 1)]
        );
    }
}
