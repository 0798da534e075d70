/// Session: the context object for one loaded level.
///
/// Owns the grid, the occupants, the key inventory, the preview and overlay
/// registries, the schedule and the last computed beam segments. Every
/// collaborator goes through it; nothing here is global.
///
/// ## Timeline
///
///   - `start()` queues the first beam rebuild for the next tick, so every
///     obstacle is registered before any ray is cast.
///   - `flash_*` sets cells now and queues a clear carrying the owner's
///     token. The clear only lands if no newer set happened in between.
///   - `advance(dt)` fires whatever is due, in schedule order.
///
/// Every mutating operation returns the `GameEvent`s it produced.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::geometry::{Cell, MoveDir};
use crate::domain::inventory::Inventory;
use crate::domain::obstacle::{Interaction, ObstacleBehavior, ObstacleId};
use crate::domain::occupant::{Enemy, Occupant, Player};
use crate::domain::shape::Shape;
use crate::domain::tile::TileKind;
use super::beam::{self, BeamSegment, RayStop};
use super::event::GameEvent;
use super::grid::GridState;
use super::level::LevelDef;
use super::ownership::{OwnerId, OwnershipRegistry};
use super::resolve::{resolve_enemy, resolve_occupants, resolve_player, ResolveRules};
use super::schedule::Schedule;

/// Colour handed to the renderer with preview / overlay cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    pub const REJECT: Tint = Tint { r: 220, g: 60, b: 60 };
    pub const PLACED: Tint = Tint { r: 90, g: 200, b: 120 };
    pub const HINT: Tint = Tint { r: 240, g: 200, b: 80 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Tint { r, g, b }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionRules {
    pub max_beam_steps: u32,
    pub resolve: ResolveRules,
    pub flash: Duration,
}

impl Default for SessionRules {
    fn default() -> Self {
        SessionRules {
            max_beam_steps: 256,
            resolve: ResolveRules::default(),
            flash: Duration::from_millis(300),
        }
    }
}

impl SessionRules {
    pub fn from_config(cfg: &GameConfig) -> Self {
        SessionRules {
            max_beam_steps: cfg.beam.max_steps,
            resolve: cfg.resolve,
            flash: cfg.timing.flash(),
        }
    }
}

/// Continuations queued on the session timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scheduled {
    RebuildBeams,
    ClearPreview { owner: OwnerId, token: u64 },
    ClearOverlay { owner: OwnerId, token: u64 },
}

pub struct Session {
    def: LevelDef,
    rules: SessionRules,
    grid: GridState,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub inventory: Inventory,
    /// Last movement direction; interaction targets the cell in front.
    pub facing: MoveDir,
    previews: OwnershipRegistry<Tint>,
    overlays: OwnershipRegistry<Tint>,
    schedule: Schedule<Scheduled>,
    segments: Vec<BeamSegment>,
    placement_preview: OwnerId,
}

// ══════════════════════════════════════════════════════════════
// Lifecycle
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Build the grid from a parsed level. Beams are not cast until the
    /// first tick after `start()`.
    pub fn from_level(def: LevelDef, rules: SessionRules) -> Self {
        let mut previews = OwnershipRegistry::new();
        let placement_preview = previews.allocate();
        let (grid, player, enemies, inventory) = build(&def);
        info!(
            name = %def.name,
            obstacles = def.obstacles.len(),
            enemies = enemies.len(),
            "session created"
        );
        Session {
            def,
            rules,
            grid,
            player,
            enemies,
            inventory,
            facing: MoveDir::Right,
            previews,
            overlays: OwnershipRegistry::new(),
            schedule: Schedule::new(),
            segments: Vec::new(),
            placement_preview,
        }
    }

    /// Queue the initial beam rebuild for the next tick.
    pub fn start(&mut self) {
        self.schedule.next_tick(Scheduled::RebuildBeams);
    }

    /// Move the timeline forward and apply everything that fell due.
    pub fn advance(&mut self, dt: Duration) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for action in self.schedule.advance(dt) {
            match action {
                Scheduled::RebuildBeams => events.extend(self.rebuild_all_beams()),
                Scheduled::ClearPreview { owner, token } => {
                    if self.previews.clear_if_current(owner, token) {
                        events.push(GameEvent::PreviewCleared { owner });
                    }
                }
                Scheduled::ClearOverlay { owner, token } => {
                    if self.overlays.clear_if_current(owner, token) {
                        events.push(GameEvent::OverlayCleared { owner });
                    }
                }
            }
        }
        events
    }

    /// Recast every beam from a cleared state, then push occupants off
    /// the new hazard cells.
    pub fn rebuild_all_beams(&mut self) -> Vec<GameEvent> {
        let report = beam::rebuild_all_beams(&mut self.grid, self.rules.max_beam_steps);

        let mut events: Vec<GameEvent> = report
            .cleared
            .iter()
            .map(|&owner| GameEvent::BeamCleared { owner })
            .collect();
        for seg in &report.segments {
            events.push(GameEvent::BeamDrawn { owner: seg.owner, start: seg.start, end: seg.end });
            if seg.stop == RayStop::Capped {
                events.push(GameEvent::BeamCapped { mirror: seg.mirror });
            }
        }
        self.segments = report.segments;

        events.extend(resolve_occupants(
            &self.grid,
            &mut self.player,
            &mut self.enemies,
            self.rules.resolve,
        ));
        events
    }

    /// Restore the level as loaded. Pending continuations are dropped;
    /// beam, preview and overlay handles stay valid and are never reissued.
    pub fn restart(&mut self) {
        let (mut grid, player, enemies, inventory) = build(&self.def);
        grid.carry_beam_owners_from(&mut self.grid);
        self.grid = grid;
        self.player = player;
        self.enemies = enemies;
        self.inventory = inventory;
        self.facing = MoveDir::Right;
        self.previews.clear_all();
        self.overlays.clear_all();
        self.schedule.clear();
        self.segments.clear();
        info!(name = %self.def.name, "level restarted");
        self.start();
    }
}

fn build(def: &LevelDef) -> (GridState, Player, Vec<Enemy>, Inventory) {
    let mut grid = GridState::new(def.ground.clone(), def.blocking.clone());
    for obstacle in &def.obstacles {
        grid.add_obstacle(obstacle.clone());
    }
    let player = Player::new(grid.start());
    let enemies = def
        .enemies
        .iter()
        .enumerate()
        .map(|(i, &c)| Enemy::new(i, c))
        .collect();
    let mut inventory = Inventory::new();
    for (key, n) in &def.keys {
        inventory.add_keys(key, *n);
    }
    (grid, player, enemies, inventory)
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

impl Session {
    /// One step. Bumping a gate tries to unlock it instead of moving.
    pub fn try_move_player(&mut self, dir: MoveDir) -> Vec<GameEvent> {
        if !self.player.is_active() { return vec![]; }
        self.facing = dir;

        let (dx, dy) = dir.delta();
        let dest = self.player.cell.offset(dx, dy);

        if self.grid.is_gate_cell(dest) {
            return match self.grid.try_unlock_gate_at(dest, &mut self.inventory) {
                Ok(()) => {
                    let mut events = vec![GameEvent::GateUnlocked { at: dest }];
                    // The opened cell may let beams through now.
                    events.extend(self.rebuild_all_beams());
                    events
                }
                Err(reason) => {
                    debug!(x = dest.x, y = dest.y, %reason, "gate stays shut");
                    vec![GameEvent::GateRefused { at: dest, reason }]
                }
            };
        }

        if !self.grid.can_enter_cell(dest, self.rules.resolve.player_allow_void) {
            return vec![];
        }
        self.player.warp_to(dest);
        let mut events = vec![GameEvent::PlayerMoved { to: dest }];
        if self.grid.handle_entered_cell(dest, &mut self.player) {
            events.push(GameEvent::PlayerReset);
            events.extend(resolve_player(&self.grid, &mut self.player, self.rules.resolve));
        }
        events
    }

    pub fn try_move_enemy(&mut self, index: usize, dir: MoveDir) -> Vec<GameEvent> {
        let Some(enemy) = self.enemies.get_mut(index) else { return vec![] };
        if !enemy.is_active() { return vec![]; }

        let (dx, dy) = dir.delta();
        let dest = enemy.cell.offset(dx, dy);
        if !self.grid.can_enemy_enter_cell(dest) { return vec![]; }

        enemy.warp_to(dest);
        let reset = self.grid.handle_entered_cell(dest, &mut *enemy);
        let mut events = vec![GameEvent::EnemyMoved { id: enemy.id, to: enemy.cell }];
        if reset {
            events.extend(resolve_enemy(&self.grid, enemy, self.rules.resolve));
        }
        events
    }

    /// Advance the fall sequence. A landing at start is checked against
    /// the beams like any other arrival.
    pub fn tick_fall(&mut self) -> Vec<GameEvent> {
        if !self.player.tick() { return vec![]; }
        let mut events = vec![GameEvent::PlayerLanded { at: self.player.cell }];
        events.extend(resolve_player(&self.grid, &mut self.player, self.rules.resolve));
        events
    }

    /// The cell the player is facing.
    pub fn cell_in_front(&self) -> Cell {
        let (dx, dy) = self.facing.delta();
        self.player.cell.offset(dx, dy)
    }
}

// ══════════════════════════════════════════════════════════════
// Obstacles
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Interact with whatever obstacle stands on `cell`.
    pub fn interact_at(&mut self, cell: Cell) -> Vec<GameEvent> {
        let Some((id, _)) = self.grid.try_get_obstacle(cell) else { return vec![] };
        let interaction = match self.grid.obstacle_mut(id) {
            Some(o) => o.interact(),
            None => return vec![],
        };

        match interaction {
            Interaction::Nothing => vec![],
            Interaction::MirrorRotated { facing } => {
                let mut events = vec![GameEvent::MirrorRotated { mirror: id, facing }];
                events.extend(self.rebuild_all_beams());
                events
            }
            Interaction::LeverPulled { targets } => {
                let cells: Vec<(Cell, TileKind)> = targets
                    .into_iter()
                    .filter_map(|c| self.grid.toggle_floor_void_at(c).map(|k| (c, k)))
                    .collect();
                if cells.is_empty() { return vec![]; }
                let mut events = vec![GameEvent::CellsToggled { cells }];
                self.drop_unsupported_occupants(&mut events);
                events
            }
        }
    }

    /// Switch a mirror's beam on or off, then rebuild.
    pub fn set_mirror_enabled(&mut self, id: ObstacleId, enabled: bool) -> Vec<GameEvent> {
        let Some(mirror) = self.grid.obstacle_mut(id).and_then(|o| o.as_mirror_mut()) else {
            return vec![];
        };
        if mirror.beam_active == enabled { return vec![]; }
        mirror.beam_active = enabled;

        let mut events = vec![GameEvent::MirrorToggled { mirror: id, enabled }];
        events.extend(self.rebuild_all_beams());
        events
    }

    /// Put the obstacle back on its cell. Mirrors trigger a rebuild.
    pub fn register_obstacle(&mut self, id: ObstacleId) -> Vec<GameEvent> {
        self.grid.register_obstacle(id);
        self.rebuild_if_mirror(id)
    }

    /// Take the obstacle off the board. Mirrors trigger a rebuild.
    pub fn unregister_obstacle(&mut self, id: ObstacleId) -> Vec<GameEvent> {
        self.grid.unregister_obstacle(id);
        self.rebuild_if_mirror(id)
    }

    fn rebuild_if_mirror(&mut self, id: ObstacleId) -> Vec<GameEvent> {
        match self.grid.obstacle(id) {
            Some(o) if o.as_mirror().is_some() => self.rebuild_all_beams(),
            _ => vec![],
        }
    }

    /// Anyone left standing on void by a lever falls.
    fn drop_unsupported_occupants(&mut self, events: &mut Vec<GameEvent>) {
        let allow_void = self.rules.resolve.player_allow_void;

        let at = self.player.cell;
        if self.player.is_active()
            && self.grid.tile_kind(at) == TileKind::Void
            && !self.grid.can_enter_cell(at, allow_void)
        {
            self.player.fall();
            info!(x = at.x, y = at.y, "floor removed under player");
            events.push(GameEvent::PlayerFellReset { from: at });
        }

        for enemy in self.enemies.iter_mut().filter(|e| e.is_active()) {
            let at = enemy.cell;
            if self.grid.tile_kind(at) == TileKind::Void {
                enemy.fall();
                info!(id = enemy.id, x = at.x, y = at.y, "floor removed under enemy");
                events.push(GameEvent::EnemyEliminated { id: enemy.id, at });
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Shape placement
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Fill void with a shape. A refused placement flashes its footprint.
    pub fn try_place_shape(&mut self, origin: Cell, shape: &Shape) -> Vec<GameEvent> {
        let owner = self.placement_preview;
        let flash = self.rules.flash;

        if !self.grid.can_place_shape_on_void(origin, &shape.offsets, self.player.cell) {
            self.flash_preview_cells_for_owner(owner, shape.footprint(origin), Tint::REJECT, flash);
            return vec![GameEvent::ShapeRejected { origin }];
        }

        let cells = self.grid.apply_shape_to_void(origin, &shape.offsets);
        self.flash_preview_cells_for_owner(owner, cells.clone(), Tint::PLACED, flash);
        info!(shape = shape.name, x = origin.x, y = origin.y, "shape placed");
        vec![GameEvent::ShapePlaced { cells }]
    }
}

// ══════════════════════════════════════════════════════════════
// Ownership: beams, previews, overlays
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Hazard cells from a producer other than a mirror. Occupants are
    /// resolved against the new union right away.
    pub fn set_beam_cells_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>) -> Vec<GameEvent> {
        self.grid.set_beam_cells_for_owner(owner, cells);
        resolve_occupants(&self.grid, &mut self.player, &mut self.enemies, self.rules.resolve)
    }

    pub fn clear_beam_cells_for_owner(&mut self, owner: OwnerId) {
        self.grid.clear_beam_cells_for_owner(owner);
    }

    pub fn allocate_beam_owner(&mut self) -> OwnerId {
        self.grid.allocate_beam_owner()
    }

    pub fn allocate_preview_owner(&mut self) -> OwnerId {
        self.previews.allocate()
    }

    pub fn set_preview_cells_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>, tint: Tint) {
        self.previews.set_for_owner(owner, cells, tint);
    }

    /// Show cells now, clear them after `duration` unless re-set meanwhile.
    pub fn flash_preview_cells_for_owner(
        &mut self,
        owner: OwnerId,
        cells: Vec<Cell>,
        tint: Tint,
        duration: Duration,
    ) {
        let token = self.previews.flash_for_owner(owner, cells, tint);
        self.schedule.after(duration, Scheduled::ClearPreview { owner, token });
    }

    pub fn clear_preview_for_owner(&mut self, owner: OwnerId) -> bool {
        self.previews.clear_for_owner(owner)
    }

    pub fn allocate_overlay_owner(&mut self) -> OwnerId {
        self.overlays.allocate()
    }

    pub fn set_overlay_cells_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>, tint: Tint) {
        self.overlays.set_for_owner(owner, cells, tint);
    }

    pub fn flash_overlay_cells_for_owner(
        &mut self,
        owner: OwnerId,
        cells: Vec<Cell>,
        tint: Tint,
        duration: Duration,
    ) {
        let token = self.overlays.flash_for_owner(owner, cells, tint);
        self.schedule.after(duration, Scheduled::ClearOverlay { owner, token });
    }

    pub fn clear_overlay_for_owner(&mut self, owner: OwnerId) -> bool {
        self.overlays.clear_for_owner(owner)
    }
}

// ── Read-only views ──

impl Session {
    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn segments(&self) -> &[BeamSegment] {
        &self.segments
    }

    pub fn previews(&self) -> &OwnershipRegistry<Tint> {
        &self.previews
    }

    pub fn overlays(&self) -> &OwnershipRegistry<Tint> {
        &self.overlays
    }

    pub fn now(&self) -> Duration {
        self.schedule.now()
    }

    pub fn pending(&self) -> usize {
        self.schedule.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Diagonal;
    use crate::domain::inventory::KeyInventory;
    use crate::domain::occupant::{OccupantKind, FALL_TICKS};
    use crate::sim::grid::UnlockError;
    use crate::sim::level::parse_level;

    fn session(text: &str) -> Session {
        let def = parse_level(text).expect("test level parses");
        Session::from_level(def, SessionRules::default())
    }

    fn started(text: &str) -> Session {
        let mut s = session(text);
        s.start();
        s.advance(Duration::ZERO);
        s
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn c(x: i32, y: i32) -> Cell {
        Cell::new(x, y)
    }

    // ── timeline ──

    #[test]
    fn first_rebuild_waits_one_tick() {
        let mut s = session("...S\n....\nE...\n");
        s.start();
        assert!(!s.grid().is_beam_blocked(c(1, 1)));

        let events = s.advance(Duration::ZERO);
        assert!(events.iter().any(|e| matches!(e, GameEvent::BeamDrawn { .. })));
        assert!(s.grid().is_beam_blocked(c(1, 1)));
        assert!(s.grid().is_beam_blocked(c(2, 2)));
        assert_eq!(s.segments().len(), 1);
    }

    #[test]
    fn second_flash_outlives_first_deadline() {
        let mut s = session("S...\n");
        let owner = s.allocate_preview_owner();

        s.flash_preview_cells_for_owner(owner, vec![c(1, 0)], Tint::HINT, ms(300));
        assert!(s.advance(ms(100)).is_empty());
        s.flash_preview_cells_for_owner(owner, vec![c(2, 0)], Tint::HINT, ms(300));

        // First clear fires at 300ms with a stale token.
        assert!(s.advance(ms(250)).is_empty());
        assert_eq!(s.previews().cells_of(owner), &[c(2, 0)]);

        let events = s.advance(ms(100));
        assert_eq!(events, vec![GameEvent::PreviewCleared { owner }]);
        assert!(s.previews().cells_of(owner).is_empty());
    }

    #[test]
    fn persistent_set_survives_pending_flash_clear() {
        let mut s = session("S...\n");
        let owner = s.allocate_overlay_owner();
        s.flash_overlay_cells_for_owner(owner, vec![c(1, 0)], Tint::HINT, ms(300));
        s.set_overlay_cells_for_owner(owner, vec![c(3, 0)], Tint::rgb(1, 2, 3));
        assert!(s.advance(ms(500)).is_empty());
        assert_eq!(s.overlays().cells_of(owner), &[c(3, 0)]);
        assert_eq!(s.overlays().style_of(owner), Some(&Tint::rgb(1, 2, 3)));
    }

    // ── movement ──

    #[test]
    fn gate_bump_unlocks_then_walk_through() {
        let mut s = started("@gate 2,0 key=gold consume\n@keys gold=1\nS.G.\n");
        assert_eq!(s.try_move_player(MoveDir::Right), vec![GameEvent::PlayerMoved { to: c(1, 0) }]);

        let events = s.try_move_player(MoveDir::Right);
        assert_eq!(events[0], GameEvent::GateUnlocked { at: c(2, 0) });
        assert_eq!(s.player.cell, c(1, 0));
        assert_eq!(s.inventory.key_count("gold"), 0);
        assert_eq!(s.grid().tile_kind(c(2, 0)), TileKind::Floor);

        assert_eq!(s.try_move_player(MoveDir::Right), vec![GameEvent::PlayerMoved { to: c(2, 0) }]);
    }

    #[test]
    fn gate_without_key_is_refused() {
        let mut s = started("@gate 1,0 key=gold\nSG.\n");
        let events = s.try_move_player(MoveDir::Right);
        assert_eq!(
            events,
            vec![GameEvent::GateRefused { at: c(1, 0), reason: UnlockError::MissingKey("gold".into()) }]
        );
        assert!(s.grid().is_gate_cell(c(1, 0)));
        assert_eq!(s.player.cell, c(0, 0));
    }

    #[test]
    fn reset_tile_sends_player_home() {
        let mut s = started("@reset 2,0\nS..\n");
        s.try_move_player(MoveDir::Right);
        let events = s.try_move_player(MoveDir::Right);
        assert_eq!(events, vec![GameEvent::PlayerMoved { to: c(2, 0) }, GameEvent::PlayerReset]);
        assert_eq!(s.player.cell, c(0, 0));
    }

    #[test]
    fn reset_onto_beam_is_resolved() {
        let mut s = started("@reset 3,1\n....\n.S..\nE...\n");
        assert_eq!(s.player.cell, c(2, 1));

        let events = s.try_move_player(MoveDir::Right);
        assert_eq!(
            events,
            vec![
                GameEvent::PlayerMoved { to: c(3, 1) },
                GameEvent::PlayerReset,
                GameEvent::OccupantRelocated { kind: OccupantKind::Player, from: c(1, 1), to: c(2, 1) },
            ]
        );
        assert!(!s.grid().is_beam_blocked(s.player.cell));
    }

    #[test]
    fn enemy_reset_onto_beam_is_resolved() {
        let mut s = started("@reset 3,1\n...S\n.x..\nE...\n");
        assert_eq!(s.enemies[0].cell, c(2, 1));

        let events = s.try_move_enemy(0, MoveDir::Right);
        assert_eq!(
            events,
            vec![
                GameEvent::EnemyMoved { id: 0, to: c(1, 1) },
                GameEvent::OccupantRelocated { kind: OccupantKind::Enemy, from: c(1, 1), to: c(2, 1) },
            ]
        );
    }

    #[test]
    fn enemy_never_steps_on_void() {
        let mut s = started("S.x_\n");
        assert!(s.try_move_enemy(0, MoveDir::Right).is_empty());
        assert_eq!(
            s.try_move_enemy(0, MoveDir::Left),
            vec![GameEvent::EnemyMoved { id: 0, to: c(1, 0) }]
        );
        assert!(s.try_move_enemy(5, MoveDir::Left).is_empty());
    }

    // ── obstacles ──

    #[test]
    fn rotating_emitter_recasts() {
        let mut s = started("...S\n....\nE...\n");
        let events = s.interact_at(c(0, 0));
        assert_eq!(events[0], GameEvent::MirrorRotated { mirror: ObstacleId(0), facing: Diagonal::DownRight });
        // Facing down-right from the bottom row leaves the map at once.
        assert!(!s.grid().is_beam_blocked(c(1, 1)));
        assert_eq!(s.grid().beams().covered_len(), 0);
    }

    #[test]
    fn switching_mirror_off_and_on() {
        let mut s = started("...S\n....\nE...\n");
        let id = ObstacleId(0);

        let events = s.set_mirror_enabled(id, false);
        assert_eq!(events[0], GameEvent::MirrorToggled { mirror: id, enabled: false });
        assert!(!s.grid().is_beam_blocked(c(1, 1)));
        assert!(s.set_mirror_enabled(id, false).is_empty());

        s.set_mirror_enabled(id, true);
        assert!(s.grid().is_beam_blocked(c(2, 2)));
    }

    #[test]
    fn unregistered_mirror_stops_casting() {
        let mut s = started("...S\n....\nE...\n");
        s.unregister_obstacle(ObstacleId(0));
        assert_eq!(s.grid().beams().covered_len(), 0);
        s.register_obstacle(ObstacleId(0));
        assert!(s.grid().is_beam_blocked(c(1, 1)));
    }

    #[test]
    fn beam_pushes_player_aside() {
        let mut s = session("....\n.S..\nE...\n");
        s.start();
        let events = s.advance(Duration::ZERO);
        assert!(events.contains(&GameEvent::OccupantRelocated {
            kind: OccupantKind::Player,
            from: c(1, 1),
            to: c(2, 1),
        }));
        assert_eq!(s.player.cell, c(2, 1));
    }

    #[test]
    fn lever_drops_floor_under_player() {
        let mut s = started("@lever 1,0 -> 2,1\n....\nSL..\n");
        s.try_move_player(MoveDir::Up);
        s.try_move_player(MoveDir::Right);
        s.try_move_player(MoveDir::Right);
        assert_eq!(s.player.cell, c(2, 1));

        let events = s.interact_at(c(1, 0));
        assert_eq!(
            events,
            vec![
                GameEvent::CellsToggled { cells: vec![(c(2, 1), TileKind::Void)] },
                GameEvent::PlayerFellReset { from: c(2, 1) },
            ]
        );
        assert!(s.player.is_falling());
        assert!(s.try_move_player(MoveDir::Left).is_empty());

        let landed: Vec<GameEvent> = (0..FALL_TICKS).flat_map(|_| s.tick_fall()).collect();
        assert_eq!(landed, vec![GameEvent::PlayerLanded { at: c(0, 0) }]);
        assert_eq!(s.player.cell, c(0, 0));

        let back = s.interact_at(c(1, 0));
        assert_eq!(back, vec![GameEvent::CellsToggled { cells: vec![(c(2, 1), TileKind::Floor)] }]);
    }

    #[test]
    fn lever_eliminates_enemy_on_target() {
        let mut s = started("@lever 1,0 -> 3,0\nSL.x\n");
        let events = s.interact_at(c(1, 0));
        assert!(events.contains(&GameEvent::EnemyEliminated { id: 0, at: c(3, 0) }));
        assert!(!s.enemies[0].alive);
    }

    // ── placement ──

    #[test]
    fn shape_fills_void_or_flashes_rejection() {
        let mut s = started("S__.\n");
        let single = Shape::new("single", &[(0, 0)]);

        assert_eq!(s.try_place_shape(c(1, 0), &single), vec![GameEvent::ShapePlaced { cells: vec![c(1, 0)] }]);
        assert_eq!(s.grid().tile_kind(c(1, 0)), TileKind::Floor);

        let bar = Shape::new("bar", &[(0, 0), (1, 0)]);
        assert_eq!(s.try_place_shape(c(1, 0), &bar), vec![GameEvent::ShapeRejected { origin: c(1, 0) }]);
        assert_eq!(s.grid().tile_kind(c(2, 0)), TileKind::Void);
        assert!(s.previews().contains(c(2, 0)));

        let events = s.advance(s.rules().flash);
        assert_eq!(events.len(), 1);
        assert!(!s.previews().contains(c(2, 0)));
    }

    #[test]
    fn restart_restores_layout() {
        let mut s = started("@keys gold=2\nS__.\n");
        s.try_place_shape(c(1, 0), &Shape::new("single", &[(0, 0)]));
        s.try_move_player(MoveDir::Right);
        s.inventory.consume_key("gold");

        s.restart();
        assert_eq!(s.grid().tile_kind(c(1, 0)), TileKind::Void);
        assert_eq!(s.player.cell, c(0, 0));
        assert_eq!(s.inventory.key_count("gold"), 2);
        assert!(s.previews().entries().is_empty());
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn beam_handles_survive_restart() {
        let mut s = started("...S\n....\nE...\n");
        let mirror = s.grid().beam_owner(ObstacleId(0));
        let before = s.allocate_beam_owner();

        s.restart();
        s.advance(Duration::ZERO);
        let after = s.allocate_beam_owner();
        assert_ne!(before, after);
        assert_eq!(s.grid().beam_owner(ObstacleId(0)), mirror);

        s.set_beam_cells_for_owner(before, vec![c(3, 0)]);
        s.set_beam_cells_for_owner(after, vec![c(3, 1)]);
        assert!(s.grid().is_beam_blocked(c(1, 1)));
        assert!(s.grid().is_beam_blocked(c(2, 2)));
    }
}
