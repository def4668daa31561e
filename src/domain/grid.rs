/// Grid coordinates, directions and wall handling.
///
/// All positions are whole cells. `Cell` is signed so a candidate head one
/// step past the border can be represented before the wall rule decides
/// whether it terminates the run or wraps.

pub const GRID_WIDTH: i32 = 25;
pub const GRID_HEIGHT: i32 = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Cell {
        Cell { x: self.x + dx, y: self.y + dy }
    }

    #[inline]
    pub fn step(self, dir: Dir) -> Cell {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn reverse(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// How the border behaves for the organism head this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WallMode {
    /// Leaving the grid ends the run.
    Bounded,
    /// Coordinates fold back with true modulo.
    Wrapping,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid must have at least one cell");
        Grid { width, height }
    }

    #[inline]
    pub fn contains(&self, c: Cell) -> bool {
        c.x >= 0 && c.x < self.width && c.y >= 0 && c.y < self.height
    }

    /// Fold a cell back onto the grid. `rem_euclid` keeps -1 → width-1.
    #[inline]
    pub fn wrap(&self, c: Cell) -> Cell {
        Cell { x: c.x.rem_euclid(self.width), y: c.y.rem_euclid(self.height) }
    }

    #[inline]
    pub fn clamp(&self, c: Cell) -> Cell {
        Cell {
            x: c.x.clamp(0, self.width - 1),
            y: c.y.clamp(0, self.height - 1),
        }
    }

    /// Apply the wall mode to a candidate. `None` = off-grid in bounded mode.
    pub fn resolve_wall(&self, c: Cell, mode: WallMode) -> Option<Cell> {
        match mode {
            WallMode::Wrapping => Some(self.wrap(c)),
            WallMode::Bounded if self.contains(c) => Some(c),
            WallMode::Bounded => None,
        }
    }

    /// Row-major iteration over every cell.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell { x, y }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wrap_right_edge_lands_on_zero() {
        let g = Grid::default();
        let head = Cell::new(g.width - 1, 5);
        assert_eq!(g.resolve_wall(head.step(Dir::Right), WallMode::Wrapping), Some(Cell::new(0, 5)));
    }

    #[test]
    fn wrap_left_edge_lands_on_last_column() {
        let g = Grid::default();
        let head = Cell::new(0, 5);
        assert_eq!(
            g.resolve_wall(head.step(Dir::Left), WallMode::Wrapping),
            Some(Cell::new(g.width - 1, 5))
        );
    }

    #[test]
    fn wrap_vertical_edges() {
        let g = Grid::default();
        assert_eq!(g.wrap(Cell::new(3, -1)), Cell::new(3, g.height - 1));
        assert_eq!(g.wrap(Cell::new(3, g.height)), Cell::new(3, 0));
    }

    #[test]
    fn bounded_rejects_off_grid() {
        let g = Grid::default();
        assert_eq!(g.resolve_wall(Cell::new(-1, 0), WallMode::Bounded), None);
        assert_eq!(g.resolve_wall(Cell::new(0, g.height), WallMode::Bounded), None);
        assert_eq!(g.resolve_wall(Cell::new(4, 4), WallMode::Bounded), Some(Cell::new(4, 4)));
    }

    #[test]
    fn reverse_is_involution() {
        for d in Dir::ALL {
            assert_eq!(d.reverse().reverse(), d);
            assert_ne!(d.reverse(), d);
        }
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(Cell::new(0, 0).manhattan(Cell::new(3, -2)), 5);
        assert_eq!(Cell::new(4, 4).manhattan(Cell::new(4, 4)), 0);
    }

    proptest! {
        #[test]
        fn wrapped_cells_are_always_on_grid(
            x in -200i32..200,
            y in -200i32..200,
            w in 1i32..40,
            h in 1i32..40,
        ) {
            let g = Grid::new(w, h);
            let c = g.wrap(Cell::new(x, y));
            prop_assert!(g.contains(c));
            prop_assert_eq!((c.x - x).rem_euclid(w), 0);
            prop_assert_eq!((c.y - y).rem_euclid(h), 0);
        }

        #[test]
        fn one_step_wrap_is_neighbour_modulo(x in 0i32..25, y in 0i32..20, d in 0usize..4) {
            let g = Grid::default();
            let dir = Dir::ALL[d];
            let next = g.wrap(Cell::new(x, y).step(dir));
            let (dx, dy) = dir.delta();
            prop_assert_eq!(next.x, (x + dx).rem_euclid(g.width));
            prop_assert_eq!(next.y, (y + dy).rem_euclid(g.height));
        }
    }
}
