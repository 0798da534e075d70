/// ASCII map fixtures shared by the sim unit tests.

use std::collections::HashMap;

use crate::domain::geometry::{Cell, Diagonal};
use crate::domain::obstacle::{Mirror, Obstacle, ObstacleId};
use crate::domain::tile::{EnterEffect, TileKind, TileMeta};
use super::grid::GridState;

/// Rows top-first; row r is y = height-1-r.
///
/// '.' floor, '_' void, 'w' walkable void, 'S' start, 'R' reset floor,
/// '#' wall, 'G' gate(gold, consumes), 'g' gate(no key), 'X' blocking w/o metadata,
/// ' ' unpainted.
pub fn grid_from(rows: &[&str]) -> GridState {
    let h = rows.len() as i32;
    let mut ground = HashMap::new();
    let mut blocking = HashMap::new();
    for (r, row) in rows.iter().enumerate() {
        let y = h - 1 - r as i32;
        for (x, ch) in row.chars().enumerate() {
            let c = Cell::new(x as i32, y);
            let (g, b) = match ch {
                '.' => (Some(TileMeta::floor()), None),
                '_' => (Some(TileMeta::void()), None),
                'w' => (Some(TileMeta::void().with_walkable(true)), None),
                'S' => (Some(TileMeta::of(TileKind::Start)), None),
                'R' => (Some(TileMeta::floor().with_enter_effect(EnterEffect::ResetToStart)), None),
                '#' => (Some(TileMeta::floor()), Some(Some(TileMeta::of(TileKind::Wall)))),
                'G' => (Some(TileMeta::floor()), Some(Some(TileMeta::gate("gold", true)))),
                'g' => (Some(TileMeta::floor()), Some(Some(TileMeta::gate("", true)))),
                'X' => (Some(TileMeta::floor()), Some(None)),
                _ => (None, None),
            };
            if let Some(meta) = g {
                ground.insert(c, meta);
            }
            if let Some(meta) = b {
                blocking.insert(c, meta);
            }
        }
    }
    GridState::new(ground, blocking)
}

pub fn add_mirror(grid: &mut GridState, x: i32, y: i32, facing: Diagonal, emitter: bool) -> ObstacleId {
    let cell = Cell::new(x, y);
    let mirror = if emitter { Mirror::emitter(cell, facing) } else { Mirror::new(cell, facing) };
    grid.add_obstacle(Obstacle::Mirror(mirror))
}

/// `n` rows of `w` floor cells.
pub fn open_floor(w: usize, n: usize) -> GridState {
    let row = ".".repeat(w);
    let rows: Vec<&str> = (0..n).map(|_| row.as_str()).collect();
    grid_from(&rows)
}
