/// GridState: the single source of truth for "can X happen at cell C".
///
/// ## Layers
///
/// Two tile layers, composed at query time:
///   - `ground`   : Floor / Void / Start. A cell with no entry is unpainted
///                  and is never enterable or placeable.
///   - `blocking` : Wall / Gate. Overrides ground for kind resolution. An
///                  entry whose metadata is missing (`None`) reads as Wall.
///
/// ## Occupancy
///
///   - `obstacles` : arena of every obstacle ever added (`ObstacleId` handles).
///   - `occupancy` : cell → obstacle for *registered* obstacles only.
///                   At most one obstacle per cell; registering overwrites.
///   - `beams`     : owner-keyed beam cells; their union is the
///                   "beam-blocked" set.
///
/// All queries fail closed: an empty grid (no ground) answers "no" to
/// everything.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::info;

use crate::domain::geometry::{Bounds, Cell};
use crate::domain::inventory::KeyInventory;
use crate::domain::obstacle::{Mirror, Obstacle, ObstacleBehavior, ObstacleId};
use crate::domain::occupant::Occupant;
use crate::domain::tile::{EnterEffect, TileKind, TileMeta};
use super::ownership::{OwnerId, OwnershipRegistry};

/// Why a gate unlock was refused. Nothing is mutated on any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnlockError {
    #[error("cell ({}, {}) is not a gate", .0.x, .0.y)]
    NotAGate(Cell),
    #[error("gate has no key id and cannot be unlocked")]
    NoKeyId,
    #[error("no `{0}` key in inventory")]
    MissingKey(String),
}

#[derive(Clone, Debug, Default)]
pub struct GridState {
    // ── Tile layers ──
    ground: HashMap<Cell, TileMeta>,
    blocking: HashMap<Cell, Option<TileMeta>>,
    bounds: Bounds,
    start: Cell,

    // ── Obstacles ──
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    occupancy: HashMap<Cell, ObstacleId>,
    next_obstacle: u32,

    // ── Beams ──
    beams: OwnershipRegistry<()>,
    beam_owners: BTreeMap<ObstacleId, OwnerId>,
}

// ── Construction ──

impl GridState {
    /// Uninitialized grid: every query fails closed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from authored layers. Bounds come from the ground footprint;
    /// start is the lowest Start cell, or the bounds centre if none.
    pub fn new(ground: HashMap<Cell, TileMeta>, blocking: HashMap<Cell, Option<TileMeta>>) -> Self {
        let bounds = Bounds::enclosing(ground.keys().copied());
        let start = ground
            .iter()
            .filter(|(_, m)| m.kind == TileKind::Start)
            .map(|(&c, _)| c)
            .min()
            .unwrap_or_else(|| bounds.center());
        GridState { ground, blocking, bounds, start, ..Self::default() }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn start(&self) -> Cell {
        self.start
    }
}

// ── Tile queries ──

impl GridState {
    #[inline]
    pub fn is_in_bounds(&self, cell: Cell) -> bool {
        self.bounds.contains(cell)
    }

    /// Blocking layer wins; otherwise the ground kind, Void if unpainted.
    pub fn tile_kind(&self, cell: Cell) -> TileKind {
        if let Some(meta) = self.blocking.get(&cell) {
            return meta.as_ref().map_or(TileKind::Wall, |m| m.kind);
        }
        self.ground.get(&cell).map_or(TileKind::Void, |m| m.kind)
    }

    pub fn ground_meta(&self, cell: Cell) -> Option<&TileMeta> {
        self.ground.get(&cell)
    }

    pub fn has_blocking(&self, cell: Cell) -> bool {
        self.blocking.contains_key(&cell)
    }

    #[inline]
    pub fn is_beam_blocked(&self, cell: Cell) -> bool {
        self.beams.contains(cell)
    }

    pub fn is_gate_cell(&self, cell: Cell) -> bool {
        matches!(self.blocking.get(&cell), Some(Some(m)) if m.kind == TileKind::Gate)
    }

    fn obstacle_blocks_movement(&self, cell: Cell) -> bool {
        self.try_get_obstacle(cell).is_some_and(|(_, o)| o.blocks_movement())
    }

    fn obstacle_blocks_placement(&self, cell: Cell) -> bool {
        self.try_get_obstacle(cell).is_some_and(|(_, o)| o.blocks_shape_placement())
    }
}

// ── Movement ──

impl GridState {
    /// Entry rule shared by every mover.
    ///
    /// Denied: out of bounds, blocking layer, beam, blocking obstacle,
    /// unpainted. Void needs `allow_void` *and* a walkable void tile;
    /// anything else follows its `walkable_by_default`.
    pub fn can_enter_cell(&self, cell: Cell, allow_void: bool) -> bool {
        if !self.is_in_bounds(cell) { return false; }
        if self.has_blocking(cell) { return false; }
        if self.is_beam_blocked(cell) { return false; }
        if self.obstacle_blocks_movement(cell) { return false; }

        let meta = match self.ground.get(&cell) {
            Some(m) => m,
            None => return false,
        };
        if meta.kind == TileKind::Void {
            return allow_void && meta.walkable_by_default;
        }
        meta.walkable_by_default
    }

    /// Enemies never step onto void.
    pub fn can_enemy_enter_cell(&self, cell: Cell) -> bool {
        self.can_enter_cell(cell, false)
    }

    /// Apply the entered tile's effect. Returns true if the occupant was reset.
    pub fn handle_entered_cell(&self, cell: Cell, occupant: &mut dyn Occupant) -> bool {
        match self.ground.get(&cell) {
            Some(m) if m.enter_effect == EnterEffect::ResetToStart => {
                occupant.reset_to_start();
                true
            }
            _ => false,
        }
    }
}

// ── Gates ──

impl GridState {
    /// Check key, spend key, open the cell. All or nothing.
    pub fn try_unlock_gate_at(
        &mut self,
        cell: Cell,
        inventory: &mut dyn KeyInventory,
    ) -> Result<(), UnlockError> {
        let (key_id, consumes) = match self.blocking.get(&cell) {
            Some(Some(m)) if m.kind == TileKind::Gate => (m.gate_key_id.clone(), m.consumes_key),
            _ => return Err(UnlockError::NotAGate(cell)),
        };
        if key_id.is_empty() {
            return Err(UnlockError::NoKeyId);
        }
        if inventory.key_count(&key_id) == 0 {
            return Err(UnlockError::MissingKey(key_id));
        }
        if consumes && !inventory.consume_key(&key_id) {
            return Err(UnlockError::MissingKey(key_id));
        }

        self.blocking.remove(&cell);
        self.ground.insert(cell, TileMeta::floor());
        info!(x = cell.x, y = cell.y, key = %key_id, consumed = consumes, "gate unlocked");
        Ok(())
    }
}

// ── Obstacle occupancy ──

impl GridState {
    /// Add to the arena and register at its cell. Mirrors get a beam owner.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> ObstacleId {
        let id = ObstacleId(self.next_obstacle);
        self.next_obstacle += 1;
        if obstacle.as_mirror().is_some() {
            let owner = self.beams.allocate();
            self.beam_owners.insert(id, owner);
        }
        self.obstacles.insert(id, obstacle);
        self.register_obstacle(id);
        id
    }

    /// Occupy the obstacle's cell, overwriting any previous occupant.
    /// Unknown ids are ignored.
    pub fn register_obstacle(&mut self, id: ObstacleId) {
        let cell = match self.obstacles.get(&id) {
            Some(o) => o.cell(),
            None => return,
        };
        self.occupancy.insert(cell, id);
    }

    /// Remove every cell entry pointing at this obstacle, wherever it is.
    pub fn unregister_obstacle(&mut self, id: ObstacleId) {
        self.occupancy.retain(|_, occupant| *occupant != id);
    }

    pub fn is_registered(&self, id: ObstacleId) -> bool {
        self.occupancy.values().any(|&o| o == id)
    }

    pub fn try_get_obstacle(&self, cell: Cell) -> Option<(ObstacleId, &Obstacle)> {
        let id = *self.occupancy.get(&cell)?;
        self.obstacles.get(&id).map(|o| (id, o))
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    pub fn obstacle_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.obstacles.get_mut(&id)
    }

    /// Registered mirrors in id order.
    pub fn active_mirrors(&self) -> Vec<(ObstacleId, &Mirror)> {
        self.obstacles
            .iter()
            .filter(|(id, _)| self.is_registered(**id))
            .filter_map(|(&id, o)| o.as_mirror().map(|m| (id, m)))
            .collect()
    }

    /// Every mirror in the arena, registered or not.
    pub fn all_mirror_ids(&self) -> Vec<ObstacleId> {
        self.beam_owners.keys().copied().collect()
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles.iter().map(|(&id, o)| (id, o))
    }
}

// ── Beam ownership ──

impl GridState {
    pub fn beam_owner(&self, mirror: ObstacleId) -> Option<OwnerId> {
        self.beam_owners.get(&mirror).copied()
    }

    /// Owner handle for a beam producer that is not a mirror.
    pub fn allocate_beam_owner(&mut self) -> OwnerId {
        self.beams.allocate()
    }

    pub fn set_beam_cells_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>) {
        self.beams.set_for_owner(owner, cells, ());
    }

    pub fn clear_beam_cells_for_owner(&mut self, owner: OwnerId) {
        self.beams.clear_for_owner(owner);
    }

    pub fn beam_cells_of(&self, owner: OwnerId) -> &[Cell] {
        self.beams.cells_of(owner)
    }

    pub fn beams(&self) -> &OwnershipRegistry<()> {
        &self.beams
    }

    /// Take over `old`'s beam registry when the level is rebuilt. Cells are
    /// dropped, but the allocator keeps counting from where `old` stopped and
    /// each mirror keeps the handle it had, so no handle is issued twice.
    pub fn carry_beam_owners_from(&mut self, old: &mut GridState) {
        let mut beams = std::mem::take(&mut old.beams);
        beams.clear_all();
        let mut owners = BTreeMap::new();
        for &id in self.beam_owners.keys() {
            let owner = match old.beam_owners.get(&id) {
                Some(&o) => o,
                None => beams.allocate(),
            };
            owners.insert(id, owner);
        }
        self.beams = beams;
        self.beam_owners = owners;
    }
}

// ── Shape placement / tile toggles ──

impl GridState {
    /// Every footprint cell must be in-bounds painted Void, free of walls,
    /// beams and placement-blocking obstacles; the footprint must not
    /// cover the occupant.
    pub fn can_place_shape_on_void(
        &self,
        origin: Cell,
        offsets: &[(i32, i32)],
        occupant_cell: Cell,
    ) -> bool {
        if offsets.is_empty() { return false; }
        offsets.iter().all(|&(dx, dy)| {
            let c = origin.offset(dx, dy);
            c != occupant_cell
                && self.is_in_bounds(c)
                && !self.has_blocking(c)
                && !self.is_beam_blocked(c)
                && !self.obstacle_blocks_placement(c)
                && self.ground.get(&c).is_some_and(|m| m.kind == TileKind::Void)
        })
    }

    /// Turn the footprint's Void cells into Floor. Returns the converted cells.
    pub fn apply_shape_to_void(&mut self, origin: Cell, offsets: &[(i32, i32)]) -> Vec<Cell> {
        let mut converted = Vec::new();
        for &(dx, dy) in offsets {
            let c = origin.offset(dx, dy);
            if let Some(meta) = self.ground.get_mut(&c) {
                if meta.kind == TileKind::Void {
                    *meta = TileMeta::floor();
                    converted.push(c);
                }
            }
        }
        converted
    }

    /// Lever toggle. Returns the new kind, or None if nothing changed.
    pub fn toggle_floor_void_at(&mut self, cell: Cell) -> Option<TileKind> {
        if self.occupancy.contains_key(&cell) { return None; }
        if self.has_blocking(cell) { return None; }
        let meta = self.ground.get_mut(&cell)?;
        let next = match meta.kind {
            TileKind::Floor => TileMeta::void(),
            TileKind::Void => TileMeta::floor(),
            _ => return None,
        };
        let kind = next.kind;
        *meta = next;
        Some(kind)
    }
}
