//! Playfield geometry: the fixed cell grid and cardinal directions.

pub const COLS: i32 = 16;
pub const ROWS: i32 = 24;

/// One of the four cardinal facings, encoded 0–3 clockwise from Up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(n: u8) -> Option<Direction> {
        Self::ALL.get(n as usize).copied()
    }

    /// Single-cell movement delta `(dx, dy)`; y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }
}

pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..COLS).contains(&x) && (0..ROWS).contains(&y)
}

/// The cell one step from `(x, y)` along `dir`. May lie outside the grid.
pub fn step(x: i32, y: i32, dir: Direction) -> (i32, i32) {
    let (dx, dy) = dir.delta();
    (x + dx, y + dy)
}

/// Centre of a cell in a pixel space where each cell is `cell_px` wide.
pub fn cell_center(x: i32, y: i32, cell_px: f32) -> (f32, f32) {
    (
        x as f32 * cell_px + cell_px / 2.0,
        y as f32 * cell_px + cell_px / 2.0,
    )
}

/// Inverse of [`cell_center`]: which cell a pixel falls into, if any.
pub fn cell_at(px: f32, py: f32, cell_px: f32) -> Option<(i32, i32)> {
    if px < 0.0 || py < 0.0 {
        return None;
    }
    let x = (px / cell_px).floor() as i32;
    let y = (py / cell_px).floor() as i32;
    in_bounds(x, y).then_some((x, y))
}
