/// Obstacles: entities bound to exactly one cell.
///
/// A tagged variant (`Obstacle`) dispatched through the small capability
/// trait `ObstacleBehavior`. Interaction does not mutate the grid itself;
/// it reports an `Interaction` that the session applies (rebuild beams,
/// toggle cells), so obstacle code never reaches into shared state.

use super::geometry::{Cell, Diagonal};

/// Arena handle for an obstacle. Allocated by the grid, never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ObstacleId(pub u32);

/// What an interaction did, for the caller to apply.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Interaction {
    Nothing,
    MirrorRotated { facing: Diagonal },
    LeverPulled { targets: Vec<Cell> },
}

pub trait ObstacleBehavior {
    fn cell(&self) -> Cell;
    fn blocks_movement(&self) -> bool;
    fn blocks_shape_placement(&self) -> bool;
    fn interact(&mut self) -> Interaction;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mirror {
    pub cell: Cell,
    pub facing: Diagonal,
    /// Originates a beam on rebuild (otherwise only relays when hit).
    pub is_emitter: bool,
    /// A switched-off emitter casts nothing.
    pub beam_active: bool,
}

impl Mirror {
    pub fn new(cell: Cell, facing: Diagonal) -> Self {
        Mirror { cell, facing, is_emitter: false, beam_active: true }
    }

    pub fn emitter(cell: Cell, facing: Diagonal) -> Self {
        Mirror { cell, facing, is_emitter: true, beam_active: true }
    }
}

impl ObstacleBehavior for Mirror {
    fn cell(&self) -> Cell {
        self.cell
    }

    fn blocks_movement(&self) -> bool {
        true
    }

    fn blocks_shape_placement(&self) -> bool {
        true
    }

    fn interact(&mut self) -> Interaction {
        self.facing = self.facing.rotated_cw();
        Interaction::MirrorRotated { facing: self.facing }
    }
}

/// Flips its target cells between Floor and Void each pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lever {
    pub cell: Cell,
    pub targets: Vec<Cell>,
    pub pulled: bool,
}

impl Lever {
    pub fn new(cell: Cell, targets: Vec<Cell>) -> Self {
        Lever { cell, targets, pulled: false }
    }
}

impl ObstacleBehavior for Lever {
    fn cell(&self) -> Cell {
        self.cell
    }

    fn blocks_movement(&self) -> bool {
        true
    }

    fn blocks_shape_placement(&self) -> bool {
        true
    }

    fn interact(&mut self) -> Interaction {
        self.pulled = !self.pulled;
        Interaction::LeverPulled { targets: self.targets.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Obstacle {
    Mirror(Mirror),
    Lever(Lever),
}

impl Obstacle {
    fn behavior(&self) -> &dyn ObstacleBehavior {
        match self {
            Obstacle::Mirror(m) => m,
            Obstacle::Lever(l) => l,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn ObstacleBehavior {
        match self {
            Obstacle::Mirror(m) => m,
            Obstacle::Lever(l) => l,
        }
    }

    pub fn as_mirror(&self) -> Option<&Mirror> {
        match self {
            Obstacle::Mirror(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mirror_mut(&mut self) -> Option<&mut Mirror> {
        match self {
            Obstacle::Mirror(m) => Some(m),
            _ => None,
        }
    }
}

impl ObstacleBehavior for Obstacle {
    fn cell(&self) -> Cell {
        self.behavior().cell()
    }

    fn blocks_movement(&self) -> bool {
        self.behavior().blocks_movement()
    }

    fn blocks_shape_placement(&self) -> bool {
        self.behavior().blocks_shape_placement()
    }

    fn interact(&mut self) -> Interaction {
        self.behavior_mut().interact()
    }
}
