/// Occupant resolution: nobody may stay on a beam-blocked cell.
///
/// Search order for a displaced occupant:
///   1. the four orthogonal neighbours (right, left, up, down)
///   2. the four diagonal neighbours (up-right, up-left, down-right, down-left)
///   3. breadth-first over the 8-neighbourhood, at most `search_radius` rings
///   4. nothing found → fallback: player falls and resets, enemy is eliminated
///
/// The first cell the occupant's entry rule accepts wins. Running out of
/// radius is the defined trigger for the fallback, not an error.

use std::collections::{HashSet, VecDeque};

use tracing::info;

use crate::domain::geometry::{Cell, DIAGONAL, ORTHOGONAL};
use crate::domain::occupant::{Enemy, Occupant, OccupantKind, Player};
use super::event::GameEvent;
use super::grid::GridState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveRules {
    pub search_radius: u32,
    pub player_allow_void: bool,
}

impl Default for ResolveRules {
    fn default() -> Self {
        ResolveRules { search_radius: 4, player_allow_void: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Safe,
    Relocated { from: Cell, to: Cell },
    FellBack { from: Cell },
}

/// Can an occupant of this kind stand on `cell`?
pub fn occupant_can_enter(grid: &GridState, kind: OccupantKind, cell: Cell, rules: ResolveRules) -> bool {
    match kind {
        OccupantKind::Player => grid.can_enter_cell(cell, rules.player_allow_void),
        OccupantKind::Enemy => grid.can_enemy_enter_cell(cell),
    }
}

/// Nearest enterable cell around `from`, in the fixed search order.
pub fn find_safe_cell(grid: &GridState, from: Cell, kind: OccupantKind, rules: ResolveRules) -> Option<Cell> {
    let ok = |c: Cell| occupant_can_enter(grid, kind, c, rules);

    if let Some(c) = ORTHOGONAL.iter().map(|&(dx, dy)| from.offset(dx, dy)).find(|&c| ok(c)) {
        return Some(c);
    }
    if let Some(c) = DIAGONAL.iter().map(|&(dx, dy)| from.offset(dx, dy)).find(|&c| ok(c)) {
        return Some(c);
    }

    let radius = rules.search_radius as i32;
    let mut seen: HashSet<Cell> = HashSet::from([from]);
    let mut queue: VecDeque<Cell> = VecDeque::from([from]);
    while let Some(c) = queue.pop_front() {
        for &(dx, dy) in ORTHOGONAL.iter().chain(DIAGONAL.iter()) {
            let n = c.offset(dx, dy);
            if n.ring_distance(from) > radius { continue; }
            if !grid.is_in_bounds(n) { continue; }
            if !seen.insert(n) { continue; }
            if ok(n) { return Some(n); }
            queue.push_back(n);
        }
    }
    None
}

/// Relocate or fail one occupant if its cell is hazardous.
pub fn resolve_occupant(grid: &GridState, occupant: &mut dyn Occupant, rules: ResolveRules) -> Resolution {
    let from = occupant.cell();
    if !occupant.is_active() || !grid.is_beam_blocked(from) {
        return Resolution::Safe;
    }
    match find_safe_cell(grid, from, occupant.kind(), rules) {
        Some(to) => {
            occupant.warp_to(to);
            info!(kind = ?occupant.kind(), from = ?from, to = ?to, "occupant pushed off beam");
            Resolution::Relocated { from, to }
        }
        None => {
            occupant.fall();
            info!(kind = ?occupant.kind(), at = ?from, "no safe cell within radius, falling");
            Resolution::FellBack { from }
        }
    }
}

/// Resolve the player against the current beams.
pub fn resolve_player(grid: &GridState, player: &mut Player, rules: ResolveRules) -> Option<GameEvent> {
    match resolve_occupant(grid, player, rules) {
        Resolution::Safe => None,
        Resolution::Relocated { from, to } => {
            Some(GameEvent::OccupantRelocated { kind: OccupantKind::Player, from, to })
        }
        Resolution::FellBack { from } => Some(GameEvent::PlayerFellReset { from }),
    }
}

pub fn resolve_enemy(grid: &GridState, enemy: &mut Enemy, rules: ResolveRules) -> Option<GameEvent> {
    match resolve_occupant(grid, enemy, rules) {
        Resolution::Safe => None,
        Resolution::Relocated { from, to } => {
            Some(GameEvent::OccupantRelocated { kind: OccupantKind::Enemy, from, to })
        }
        Resolution::FellBack { from } => Some(GameEvent::EnemyEliminated { id: enemy.id, at: from }),
    }
}

/// Resolve the player, then every enemy in order.
pub fn resolve_occupants(
    grid: &GridState,
    player: &mut Player,
    enemies: &mut [Enemy],
    rules: ResolveRules,
) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = resolve_player(grid, player, rules).into_iter().collect();
    events.extend(enemies.iter_mut().filter_map(|e| resolve_enemy(grid, e, rules)));
    events
}
