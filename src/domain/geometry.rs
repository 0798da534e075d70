/// Grid geometry: cells, bounds, diagonal facings and world-space points.
///
/// World convention: +x is right, +y is up. A cell (x, y) covers the unit
/// square [x, x+1) × [y, y+1); its centre is (x + 0.5, y + 0.5).

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
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

    /// World-space centre of this cell.
    pub fn center(self) -> WorldPoint {
        WorldPoint { x: self.x as f32 + 0.5, y: self.y as f32 + 0.5 }
    }

    /// Chebyshev (king-move) distance.
    pub fn ring_distance(self, other: Cell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Orthogonal neighbour order used by occupant resolution: right, left, up, down.
pub const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Diagonal neighbour order: up-right, up-left, down-right, down-left.
pub const DIAGONAL: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// Orthogonal movement direction (player / enemy steps).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, 1),
            MoveDir::Down => (0, -1),
        }
    }
}

/// Mirror facing. Beams only travel along the four diagonals.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Diagonal {
    UpRight,
    DownRight,
    DownLeft,
    UpLeft,
}

impl Diagonal {
    /// Unit step for one beam cell.
    pub fn step(self) -> (i32, i32) {
        match self {
            Diagonal::UpRight => (1, 1),
            Diagonal::DownRight => (1, -1),
            Diagonal::DownLeft => (-1, -1),
            Diagonal::UpLeft => (-1, 1),
        }
    }

    /// Next facing in clockwise order (one mirror interaction).
    pub fn rotated_cw(self) -> Diagonal {
        match self {
            Diagonal::UpRight => Diagonal::DownRight,
            Diagonal::DownRight => Diagonal::DownLeft,
            Diagonal::DownLeft => Diagonal::UpLeft,
            Diagonal::UpLeft => Diagonal::UpRight,
        }
    }
}

/// Rectangular region of cells: `origin` is the bottom-left cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Bounds {
    pub origin: Cell,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds { origin: Cell::new(0, 0), width: 0, height: 0 };

    /// Smallest bounds enclosing every cell. Empty input gives `EMPTY`.
    pub fn enclosing<I: IntoIterator<Item = Cell>>(cells: I) -> Bounds {
        let mut iter = cells.into_iter();
        let first = match iter.next() {
            Some(c) => c,
            None => return Bounds::EMPTY,
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for c in iter {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        Bounds {
            origin: Cell::new(min_x, min_y),
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.origin.x
            && cell.y >= self.origin.y
            && cell.x < self.origin.x + self.width
            && cell.y < self.origin.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> Cell {
        Cell::new(self.origin.x + self.width / 2, self.origin.y + self.height / 2)
    }

    /// Inclusive top row (highest y).
    pub fn max_y(&self) -> i32 {
        self.origin.y + self.height - 1
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::EMPTY
    }
}

/// Continuous world-space position handed to the renderer.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    pub fn offset(self, dx: f32, dy: f32) -> WorldPoint {
        WorldPoint { x: self.x + dx, y: self.y + dy }
    }
}
