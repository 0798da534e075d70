/// Occupants: tracked entities whose cell must never stay hazardous.
/// State machines are minimal: the player can be falling, an enemy can be gone.

use super::geometry::Cell;

/// Ticks the player spends in the fall animation before reappearing at start.
pub const FALL_TICKS: u32 = 6;

/// Which entry rule applies to an occupant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OccupantKind {
    Player,
    Enemy,
}

pub trait Occupant {
    fn kind(&self) -> OccupantKind;
    fn cell(&self) -> Cell;
    /// Teleport without any enter effect.
    fn warp_to(&mut self, cell: Cell);
    fn reset_to_start(&mut self);
    /// Hazard fallback: player falls and resets, enemy is eliminated.
    fn fall(&mut self);
    /// Still on the board and subject to resolution?
    fn is_active(&self) -> bool;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Standing,
    Falling { ticks_left: u32 },
}

#[derive(Clone, Debug)]
pub struct Player {
    pub cell: Cell,
    pub start: Cell,
    pub state: PlayerState,
    pub falls: u32,
}

impl Player {
    pub fn new(start: Cell) -> Self {
        Player { cell: start, start, state: PlayerState::Standing, falls: 0 }
    }

    pub fn is_falling(&self) -> bool {
        matches!(self.state, PlayerState::Falling { .. })
    }

    /// Advance the fall sequence. Returns true on the tick the player lands at start.
    pub fn tick(&mut self) -> bool {
        match self.state {
            PlayerState::Standing => false,
            PlayerState::Falling { ticks_left } if ticks_left > 1 => {
                self.state = PlayerState::Falling { ticks_left: ticks_left - 1 };
                false
            }
            PlayerState::Falling { .. } => {
                self.state = PlayerState::Standing;
                self.cell = self.start;
                true
            }
        }
    }
}

impl Occupant for Player {
    fn kind(&self) -> OccupantKind {
        OccupantKind::Player
    }

    fn cell(&self) -> Cell {
        self.cell
    }

    fn warp_to(&mut self, cell: Cell) {
        self.cell = cell;
    }

    fn reset_to_start(&mut self) {
        self.cell = self.start;
        self.state = PlayerState::Standing;
    }

    fn fall(&mut self) {
        if self.is_falling() {
            return;
        }
        self.falls += 1;
        self.state = PlayerState::Falling { ticks_left: FALL_TICKS };
    }

    fn is_active(&self) -> bool {
        !self.is_falling()
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub cell: Cell,
    pub spawn: Cell, // original position for reset
    pub alive: bool,
}

impl Enemy {
    pub fn new(id: usize, cell: Cell) -> Self {
        Enemy { id, cell, spawn: cell, alive: true }
    }
}

impl Occupant for Enemy {
    fn kind(&self) -> OccupantKind {
        OccupantKind::Enemy
    }

    fn cell(&self) -> Cell {
        self.cell
    }

    fn warp_to(&mut self, cell: Cell) {
        self.cell = cell;
    }

    fn reset_to_start(&mut self) {
        self.cell = self.spawn;
    }

    fn fall(&mut self) {
        self.alive = false;
    }

    fn is_active(&self) -> bool {
        self.alive
    }
}
