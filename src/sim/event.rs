/// Events emitted by session operations.
/// The presentation layer consumes these for drawing and status messages.

use crate::domain::geometry::{Cell, Diagonal, WorldPoint};
use crate::domain::obstacle::ObstacleId;
use crate::domain::occupant::OccupantKind;
use crate::domain::tile::TileKind;
use super::grid::UnlockError;
use super::ownership::OwnerId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BeamCleared { owner: OwnerId },
    BeamDrawn { owner: OwnerId, start: WorldPoint, end: WorldPoint },
    BeamCapped { mirror: ObstacleId },
    MirrorRotated { mirror: ObstacleId, facing: Diagonal },
    MirrorToggled { mirror: ObstacleId, enabled: bool },
    OccupantRelocated { kind: OccupantKind, from: Cell, to: Cell },
    PlayerMoved { to: Cell },
    PlayerReset,
    PlayerFellReset { from: Cell },
    PlayerLanded { at: Cell },
    EnemyMoved { id: usize, to: Cell },
    EnemyEliminated { id: usize, at: Cell },
    GateUnlocked { at: Cell },
    GateRefused { at: Cell, reason: UnlockError },
    CellsToggled { cells: Vec<(Cell, TileKind)> },
    ShapePlaced { cells: Vec<Cell> },
    ShapeRejected { origin: Cell },
    PreviewCleared { owner: OwnerId },
    OverlayCleared { owner: OwnerId },
}
